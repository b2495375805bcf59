//! Error types for the identity map.

use thiserror::Error;

/// Result type for identity map operations.
pub type IdMapResult<T> = Result<T, IdMapError>;

/// Errors reading or writing the identity map. Any of these aborts a run.
#[derive(Debug, Error)]
pub enum IdMapError {
    /// Storage error.
    #[error("identity map storage error: {0}")]
    Storage(String),

    /// Timestamp argument is not a (possibly truncated) `YYYY-MM-DD hh:mm:ss`.
    #[error("invalid timestamp '{0}', expected YYYY-MM-DD hh:mm:ss or a leading part of it")]
    InvalidTimestamp(String),

    /// CSV export error.
    #[error("csv export error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors scoped to a single row during a (possibly resumed) run.
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// The row's parent has no mapping, so the row cannot be linked.
    #[error("record {row_id}: parent record {parent_row_id} has no node id")]
    ParentLookup {
        row_id: String,
        parent_row_id: String,
    },

    /// Underlying store failure.
    #[error(transparent)]
    IdMap(#[from] IdMapError),
}
