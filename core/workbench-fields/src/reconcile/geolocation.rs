use super::{FieldReconciler, ReconcileContext};
use crate::split;
use crate::validate::validate_latlong_value;
use crate::warning::FieldWarning;
use workbench_types::{FieldKind, FieldState, SubValue};

/// `lat,lng` point fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeolocationField;

impl FieldReconciler for GeolocationField {
    fn kind(&self) -> FieldKind {
        FieldKind::Geolocation
    }

    fn parse(
        &self,
        ctx: &ReconcileContext<'_>,
        raw: &str,
        warnings: &mut Vec<FieldWarning>,
    ) -> Vec<SubValue> {
        let mut points = Vec::new();
        for part in split::split_values(ctx.subdelimiter, raw) {
            if validate_latlong_value(part) {
                points.extend(split::split_geolocation(ctx.subdelimiter, part));
            } else {
                ctx.invalid(warnings, part, "not a valid lat,lng pair");
            }
        }
        points
    }

    fn serialize(&self, state: &FieldState, subdelimiter: &str) -> String {
        state
            .iter()
            .filter_map(|sub| match sub {
                SubValue::GeoPoint { lat, lng } => Some(format!("{lat},{lng}")),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(subdelimiter)
    }
}
