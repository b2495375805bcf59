//! Soft, non-fatal problems raised while reconciling a field.

use thiserror::Error;

/// A problem that changed a field's value without failing the row.
///
/// Every message names the field and the row so a log line is actionable on
/// its own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldWarning {
    /// More values than the field allows; extras were dropped.
    #[error(
        "Adding all values in field {field} for record {row_id} would exceed maximum number of allowed values ({limit}). Skipping adding extra values."
    )]
    CardinalityViolation {
        field: String,
        row_id: String,
        limit: usize,
        actual: usize,
    },

    /// A taxonomy reference could not be resolved to a term id; it was dropped.
    #[error("Unable to resolve term '{value}' in field {field} for record {row_id}; value skipped.")]
    TermResolution {
        field: String,
        row_id: String,
        value: String,
    },

    /// A value was longer than the field's maximum length and was truncated.
    #[error("Value in field {field} for record {row_id} truncated to {max_length} characters.")]
    ValueTruncated {
        field: String,
        row_id: String,
        max_length: usize,
    },

    /// A value was not valid for the field and was dropped.
    #[error("Invalid value '{value}' in field {field} for record {row_id} ({reason}); value skipped.")]
    InvalidValue {
        field: String,
        row_id: String,
        value: String,
        reason: String,
    },
}
