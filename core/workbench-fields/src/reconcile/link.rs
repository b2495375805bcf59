use super::{FieldReconciler, ReconcileContext};
use crate::split::{self, LINK_TITLE_SEPARATOR};
use crate::validate::validate_link_value;
use crate::warning::FieldWarning;
use workbench_types::{FieldKind, FieldState, SubValue};

/// `uri%%title` link fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkField;

impl FieldReconciler for LinkField {
    fn kind(&self) -> FieldKind {
        FieldKind::Link
    }

    fn parse(
        &self,
        ctx: &ReconcileContext<'_>,
        raw: &str,
        warnings: &mut Vec<FieldWarning>,
    ) -> Vec<SubValue> {
        split::split_link(ctx.subdelimiter, raw)
            .into_iter()
            .filter(|sub| match sub {
                SubValue::Link { uri, .. } if !validate_link_value(uri) => {
                    ctx.invalid(warnings, uri, "link URI must start with http:// or https://");
                    false
                }
                _ => true,
            })
            .collect()
    }

    /// A title equal to the URI is omitted, matching how `split_link` fills it in.
    fn serialize(&self, state: &FieldState, subdelimiter: &str) -> String {
        state
            .iter()
            .filter_map(|sub| match sub {
                SubValue::Link { uri, title } if title == uri => Some(uri.clone()),
                SubValue::Link { uri, title } => Some(format!("{uri}{LINK_TITLE_SEPARATOR}{title}")),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(subdelimiter)
    }
}
