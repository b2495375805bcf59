use super::entity_reference::resolve_target;
use super::{FieldReconciler, ReconcileContext};
use crate::split;
use crate::warning::FieldWarning;
use workbench_types::{FieldKind, FieldState, SubValue};

/// `namespace:predicate:target` relations, e.g. `relators:pht:42`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypedRelationField;

impl FieldReconciler for TypedRelationField {
    fn kind(&self) -> FieldKind {
        FieldKind::TypedRelation
    }

    fn parse(
        &self,
        ctx: &ReconcileContext<'_>,
        raw: &str,
        warnings: &mut Vec<FieldWarning>,
    ) -> Vec<SubValue> {
        let target_type = ctx.definition.target_type.payload_name().to_string();
        split::split_typed_relation(ctx.subdelimiter, raw)
            .into_iter()
            .filter_map(|sub| {
                let SubValue::TypedRelation {
                    target_id,
                    rel_type,
                    ..
                } = sub
                else {
                    return None;
                };
                let target_id = resolve_target(ctx, target_id, warnings)?;
                Some(SubValue::TypedRelation {
                    target_id,
                    rel_type,
                    target_type: target_type.clone(),
                })
            })
            .collect()
    }

    fn serialize(&self, state: &FieldState, subdelimiter: &str) -> String {
        state
            .iter()
            .filter_map(|sub| match sub {
                SubValue::TypedRelation {
                    target_id,
                    rel_type,
                    ..
                } => Some(format!("{rel_type}:{target_id}")),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(subdelimiter)
    }
}
