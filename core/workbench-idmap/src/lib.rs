//! Identity map and recovery for batch runs.
//!
//! A batch create run records, for every entity it creates, which input row
//! (and which parent row) it came from. The record lives in a single SQLite
//! file that outlives the process, so an interrupted run can be resumed
//! without creating anything twice.
//!
//! # Components
//!
//! - **Store** ([`IdentityMapStore`]): append-only table of
//!   `(timestamp, config_file, parent_csv_id, parent_node_id, csv_id, node_id)`
//!   records plus operator maintenance (pruning by time, config file, or
//!   remote existence).
//! - **Recovery** ([`RecoveryController`]): decides, row by row, whether a
//!   resumed run must skip a row because it was already materialized, and
//!   resolves parent linkage from the store.
//! - **Export** ([`export`]): CSV dump of map records.
//!
//! The store assumes a single writer. Two processes sharing one map file at
//! the same time is not supported.

mod error;
pub mod export;
mod recovery;
mod store;

pub use error::{IdMapError, IdMapResult, RecoveryError};
pub use recovery::{RecoveryController, RecoveryState, RowDisposition};
pub use store::{DumpFilter, IdentityMapRecord, IdentityMapStore, NonUniqueColumn, TIMESTAMP_FORMAT};
