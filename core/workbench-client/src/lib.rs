//! HTTP collaborators: transport, schema, taxonomy and node endpoints.
//!
//! Everything goes through the [`HttpTransport`] trait so that the rest of
//! the system (and its tests) never depends on a live server. The transport
//! performs no retries; a failed request is reported to the caller as is.

mod error;
mod nodes;
mod schema;
mod terms;
mod transport;

pub use error::{ClientError, ClientResult};
pub use nodes::NodeClient;
pub use schema::get_field_definitions;
pub use terms::RemoteTermResolver;
pub use transport::{HttpResponse, HttpTransport, Method, ReqwestTransport};
