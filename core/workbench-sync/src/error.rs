//! Error types for a batch run.

use thiserror::Error;
use workbench_client::ClientError;
use workbench_idmap::{IdMapError, RecoveryError};
use workbench_types::TypesError;

/// Result type for batch operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that stop a run, or (for row-scoped variants) a single row.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Input file could not be opened.
    #[error("cannot read input file {path}: {source}")]
    InputIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed CSV.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Input is well-formed CSV but unusable (missing column, duplicate id, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Identity map failure. Aborts the run.
    #[error(transparent)]
    IdMap(#[from] IdMapError),

    /// The row's parent could not be resolved.
    #[error(transparent)]
    Recovery(#[from] RecoveryError),

    /// Remote call failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Remote data did not fit the field definitions.
    #[error(transparent)]
    Types(#[from] TypesError),

    /// A row cannot be processed.
    #[error("record {row_id}: {reason}")]
    Row { row_id: String, reason: String },
}

impl SyncError {
    pub(crate) fn row(row_id: &str, reason: impl Into<String>) -> Self {
        Self::Row {
            row_id: row_id.to_string(),
            reason: reason.into(),
        }
    }
}
