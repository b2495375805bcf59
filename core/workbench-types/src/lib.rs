//! Core type definitions for the workbench batch synchronizer.
//!
//! This crate defines the plain data model shared by every other crate:
//! - Remote entity identifiers and input rows
//! - Field definitions as reported by the remote schema endpoints
//! - Structured subvalues and per-field state
//! - The run configuration loaded from YAML
//!
//! Nothing here performs I/O beyond reading a config file.

mod config;
mod error;
mod field;
mod ids;
mod row;
mod value;

pub use config::{Task, WorkbenchConfig, PASSWORD_ENV_VAR};
pub use error::{TypesError, TypesResult};
pub use field::{Cardinality, FieldDefinition, FieldKind, TargetType};
pub use ids::RemoteId;
pub use row::{Row, UpdateMode};
pub use value::{FieldState, SubValue, TargetId};
