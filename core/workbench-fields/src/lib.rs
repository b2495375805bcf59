//! Field-value reconciliation engine.
//!
//! Translates raw tabular cell values into the structured, per-field
//! representation the remote API accepts, honoring each field's cardinality
//! and the run's update mode.
//!
//! # Components
//!
//! - **Splitter** ([`split`]): pure parsing of a cell into subvalues. Never fails;
//!   malformed parts are skipped.
//! - **Validators** ([`validate`]): pre-flight checks that report malformed
//!   values before any network call.
//! - **Cardinality enforcer** ([`cardinality`]): truncates and warns when a
//!   field would hold more values than it allows.
//! - **Reconcilers** ([`reconcile`]): one per field shape, sharing the
//!   create/update merge rules.
//!
//! # Merge rules
//!
//! 1. `delete` empties the field.
//! 2. Singular fields keep the first incoming value and are always replaced.
//! 3. Multi-valued fields are replaced, or appended to existing values under
//!    `append`, then truncated to the bound.
//!
//! Soft problems never fail a call: they come back as [`FieldWarning`]s next
//! to the new state.

pub mod cardinality;
pub mod reconcile;
pub mod split;
mod terms;
pub mod validate;
mod warning;

pub use cardinality::warn_if_exceeds;
pub use reconcile::{reconciler_for, FieldReconciler, ReconcileContext, Reconciled};
pub use split::{split, LINK_TITLE_SEPARATOR};
pub use terms::{NoTermLookup, TermResolver};
pub use validate::{RowValidator, ValidationIssue};
pub use warning::FieldWarning;
