use super::{FieldReconciler, ReconcileContext};
use crate::split::{self, LINK_TITLE_SEPARATOR};
use crate::validate::validate_link_value;
use crate::warning::FieldWarning;
use workbench_types::{FieldKind, FieldState, SubValue};

/// `source%%uri%%title` authority link fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorityLinkField;

impl FieldReconciler for AuthorityLinkField {
    fn kind(&self) -> FieldKind {
        FieldKind::AuthorityLink
    }

    fn parse(
        &self,
        ctx: &ReconcileContext<'_>,
        raw: &str,
        warnings: &mut Vec<FieldWarning>,
    ) -> Vec<SubValue> {
        let sources = &ctx.definition.authority_sources;
        split::split_authority_link(ctx.subdelimiter, raw)
            .into_iter()
            .filter(|sub| {
                let SubValue::AuthorityLink { source, uri, .. } = sub else {
                    return false;
                };
                if !sources.is_empty() && !sources.contains(source) {
                    ctx.invalid(warnings, source, "unknown authority source");
                    return false;
                }
                if !validate_link_value(uri) {
                    ctx.invalid(warnings, uri, "authority URI must start with http:// or https://");
                    return false;
                }
                true
            })
            .collect()
    }

    fn serialize(&self, state: &FieldState, subdelimiter: &str) -> String {
        state
            .iter()
            .filter_map(|sub| match sub {
                SubValue::AuthorityLink { source, uri, title } if title.is_empty() => {
                    Some(format!("{source}{LINK_TITLE_SEPARATOR}{uri}"))
                }
                SubValue::AuthorityLink { source, uri, title } => Some(format!(
                    "{source}{LINK_TITLE_SEPARATOR}{uri}{LINK_TITLE_SEPARATOR}{title}"
                )),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(subdelimiter)
    }
}
