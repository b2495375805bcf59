//! Plain scalar fields: strings, text, numbers, list keys. Also the title.

use super::{FieldReconciler, ReconcileContext};
use crate::split;
use crate::warning::FieldWarning;
use serde_json::{Number, Value};
use workbench_types::{FieldKind, FieldState, SubValue};

#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleField;

impl SimpleField {
    fn typed_value(
        ctx: &ReconcileContext<'_>,
        text: &str,
        warnings: &mut Vec<FieldWarning>,
    ) -> Option<SubValue> {
        let def = ctx.definition;
        if def.field_type.starts_with("list_")
            && !def.allowed_values.is_empty()
            && !def.allowed_values.iter().any(|v| v == text)
        {
            ctx.invalid(warnings, text, "not one of the field's allowed values");
            return None;
        }

        let value = match def.field_type.as_str() {
            "integer" | "list_integer" => match text.parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => {
                    ctx.invalid(warnings, text, "not an integer");
                    return None;
                }
            },
            "decimal" | "float" | "list_float" => {
                match text.parse::<f64>().ok().and_then(Number::from_f64) {
                    Some(n) => Value::Number(n),
                    None => {
                        ctx.invalid(warnings, text, "not a number");
                        return None;
                    }
                }
            }
            _ => Value::String(ctx.truncate(warnings, text)),
        };

        let format = def.formatted_text.then(|| ctx.text_format.to_string());
        Some(SubValue::Scalar { value, format })
    }
}

impl FieldReconciler for SimpleField {
    fn kind(&self) -> FieldKind {
        FieldKind::Simple
    }

    fn parse(
        &self,
        ctx: &ReconcileContext<'_>,
        raw: &str,
        warnings: &mut Vec<FieldWarning>,
    ) -> Vec<SubValue> {
        split::split_values(ctx.subdelimiter, raw)
            .filter_map(|text| Self::typed_value(ctx, text, warnings))
            .collect()
    }

    fn serialize(&self, state: &FieldState, subdelimiter: &str) -> String {
        state
            .iter()
            .filter_map(|sub| match sub {
                SubValue::Scalar {
                    value: Value::String(s),
                    ..
                } => Some(s.clone()),
                SubValue::Scalar { value, .. } => Some(value.to_string()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(subdelimiter)
    }
}
