//! Batch driver for the workbench synchronizer.
//!
//! Ties the pieces together for one run:
//!
//! - [`csv_input`] turns the input CSV into ordered [`Row`](workbench_types::Row)s.
//! - [`BatchDriver`] walks the rows for the configured task (create, update
//!   or delete), reconciles each field column, issues one node request per
//!   row and records new identity mappings.
//! - Create runs can resume an interrupted batch via
//!   [`RecoveryController`](workbench_idmap::RecoveryController).
//!
//! Soft problems (dropped or truncated values) are collected in the
//! [`RunSummary`]. A failed row is logged and counted; an identity map
//! failure aborts the run.

pub mod csv_input;
mod driver;
mod error;
mod payload;

pub use csv_input::{NODE_ID_COLUMN, read_rows, read_rows_from};
pub use driver::{BatchDriver, RowOutcome, RunSummary};
pub use error::{SyncError, SyncResult};
