use super::{FieldReconciler, ReconcileContext};
use crate::split;
use crate::warning::FieldWarning;
use workbench_types::{FieldKind, FieldState, SubValue, TargetId, TargetType};

/// References to other entities (terms, nodes, media).
///
/// Taxonomy references accept term names, `vocabulary:name` pairs and term
/// URIs besides numeric ids; those go through the [`TermResolver`]. Values
/// that do not resolve are dropped with a warning.
///
/// [`TermResolver`]: crate::TermResolver
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityReferenceField;

impl FieldReconciler for EntityReferenceField {
    fn kind(&self) -> FieldKind {
        FieldKind::EntityReference
    }

    fn parse(
        &self,
        ctx: &ReconcileContext<'_>,
        raw: &str,
        warnings: &mut Vec<FieldWarning>,
    ) -> Vec<SubValue> {
        let def = ctx.definition;
        split::split_values(ctx.subdelimiter, raw)
            .filter_map(|part| {
                let id = match (part.parse::<u64>(), def.target_type) {
                    (Ok(id), _) => id,
                    (Err(_), TargetType::TaxonomyTerm) => {
                        match ctx.terms.resolve_or_create_term(&def.vocabularies, part) {
                            Some(id) => id,
                            None => {
                                ctx.unresolved_term(warnings, part);
                                return None;
                            }
                        }
                    }
                    (Err(_), _) => {
                        ctx.invalid(warnings, part, "entity reference must be a numeric id");
                        return None;
                    }
                };
                Some(SubValue::reference(id, def.target_type))
            })
            .collect()
    }

    fn serialize(&self, state: &FieldState, subdelimiter: &str) -> String {
        state
            .iter()
            .filter_map(|sub| match sub {
                SubValue::Reference { target_id, .. } => Some(target_id.to_string()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(subdelimiter)
    }
}

/// Resolves a typed-relation or reference target to a numeric id.
pub(super) fn resolve_target(
    ctx: &ReconcileContext<'_>,
    target: TargetId,
    warnings: &mut Vec<FieldWarning>,
) -> Option<TargetId> {
    let name = match target {
        TargetId::Id(_) => return Some(target),
        TargetId::Name(name) => name,
    };
    if ctx.definition.target_type != TargetType::TaxonomyTerm {
        ctx.invalid(warnings, &name, "relation target must be a numeric id");
        return None;
    }
    match ctx
        .terms
        .resolve_or_create_term(&ctx.definition.vocabularies, &name)
    {
        Some(id) => Some(TargetId::Id(id)),
        None => {
            ctx.unresolved_term(warnings, &name);
            None
        }
    }
}
