//! Error types for remote calls.

use thiserror::Error;

/// Result type for remote calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors talking to the remote system.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request could not be sent or the response could not be read.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with an unexpected status.
    #[error("HTTP {status} from {method} {path}: {body}")]
    Status {
        method: String,
        path: String,
        status: u16,
        body: String,
    },

    /// Response body was not the expected JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Response JSON was valid but not the expected shape.
    #[error("unexpected response from {path}: {reason}")]
    UnexpectedResponse { path: String, reason: String },
}
