//! Error types for the data model.

use thiserror::Error;

/// Result type for model operations.
pub type TypesResult<T> = Result<T, TypesError>;

/// Errors that can occur while building or loading model types.
#[derive(Debug, Error)]
pub enum TypesError {
    /// Config file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid YAML for the expected shape.
    #[error("invalid config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// A required config option is missing or empty.
    #[error("config option '{0}' is required")]
    MissingOption(&'static str),

    /// Unrecognized update mode string.
    #[error("invalid update mode: {0}")]
    InvalidUpdateMode(String),

    /// Existing remote field value does not match the field shape.
    #[error("unexpected field JSON: {0}")]
    UnexpectedJson(String),
}
