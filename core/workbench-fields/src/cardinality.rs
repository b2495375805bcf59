//! Cardinality enforcement shared by every reconciler.

use crate::warning::FieldWarning;
use tracing::warn;
use workbench_types::Cardinality;

/// Returns (and logs) a warning when `actual` values exceed `limit`.
/// Never fails: truncation is the caller's recovery action.
pub fn warn_if_exceeds(
    field: &str,
    row_id: &str,
    limit: usize,
    actual: usize,
) -> Option<FieldWarning> {
    if actual <= limit {
        return None;
    }
    let warning = FieldWarning::CardinalityViolation {
        field: field.to_string(),
        row_id: row_id.to_string(),
        limit,
        actual,
    };
    warn!(field, row_id, limit, actual, "{warning}");
    Some(warning)
}

/// Truncates `values` to the field's bound, recording a warning if any
/// value was dropped.
pub fn enforce<T>(
    mut values: Vec<T>,
    cardinality: Cardinality,
    field: &str,
    row_id: &str,
    warnings: &mut Vec<FieldWarning>,
) -> Vec<T> {
    if let Some(limit) = cardinality.limit() {
        if let Some(warning) = warn_if_exceeds(field, row_id, limit, values.len()) {
            warnings.push(warning);
            values.truncate(limit);
        }
    }
    values
}
