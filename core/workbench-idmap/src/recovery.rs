//! Resuming an interrupted create run.
//!
//! The controller is rebuilt on every invocation from the operator's
//! "resume from node id X" directive and the current store contents; nothing
//! about recovery is persisted.

use crate::error::{IdMapResult, RecoveryError};
use crate::store::IdentityMapStore;
use tracing::{debug, info, warn};
use workbench_types::RemoteId;

/// Whether the run is still skipping rows materialized by an earlier run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryState {
    Normal,
    Recovering { resume_from: RemoteId },
}

/// What the driver should do with a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowDisposition {
    /// Create the entity.
    Process,
    /// Already created as `remote_id`; make no request and record nothing.
    Skip { remote_id: RemoteId },
}

/// Decides which rows of a resumed run were already materialized.
///
/// While recovering, every row that already has a mapping under this config
/// file is skipped. Rows mapped to ids up to the resume anchor are the
/// expected case; a mapping past the anchor means the previous run got
/// further than the operator said, and the row is skipped all the same. The
/// first row with no mapping switches the controller to normal processing
/// for the rest of the run.
///
/// This relies on the remote system assigning ids in creation order.
pub struct RecoveryController<'a> {
    store: &'a IdentityMapStore,
    config_file: String,
    state: RecoveryState,
    skipped: usize,
}

impl<'a> RecoveryController<'a> {
    /// A controller for a fresh run.
    pub fn normal(store: &'a IdentityMapStore, config_file: impl Into<String>) -> Self {
        Self {
            store,
            config_file: config_file.into(),
            state: RecoveryState::Normal,
            skipped: 0,
        }
    }

    /// A controller resuming from `resume_from`.
    pub fn resuming(
        store: &'a IdentityMapStore,
        config_file: impl Into<String>,
        resume_from: RemoteId,
    ) -> IdMapResult<Self> {
        let config_file = config_file.into();
        if store.contains_remote_id(&config_file, &resume_from)? {
            info!(%resume_from, config_file = %config_file, "recovery mode: skipping rows already in the identity map");
        } else {
            warn!(
                %resume_from,
                config_file = %config_file,
                "recovery mode: node id is not in the identity map for this config file"
            );
        }
        Ok(Self {
            store,
            config_file,
            state: RecoveryState::Recovering { resume_from },
            skipped: 0,
        })
    }

    pub fn state(&self) -> &RecoveryState {
        &self.state
    }

    pub fn is_recovering(&self) -> bool {
        matches!(self.state, RecoveryState::Recovering { .. })
    }

    /// Rows skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Classifies the next row of the input, in input order.
    pub fn check_row(&mut self, csv_id: &str) -> IdMapResult<RowDisposition> {
        let RecoveryState::Recovering { resume_from } = &self.state else {
            return Ok(RowDisposition::Process);
        };

        match self.store.lookup_remote_id(&self.config_file, csv_id)? {
            Some(remote_id) => {
                if remote_id <= *resume_from {
                    debug!(csv_id, %remote_id, "skipping row created before the resume point");
                } else {
                    info!(
                        csv_id,
                        %remote_id,
                        %resume_from,
                        "skipping row created after the resume point"
                    );
                }
                self.skipped += 1;
                Ok(RowDisposition::Skip { remote_id })
            }
            None => {
                info!(
                    csv_id,
                    skipped = self.skipped,
                    "recovery complete; resuming normal processing"
                );
                self.state = RecoveryState::Normal;
                Ok(RowDisposition::Process)
            }
        }
    }

    /// Remote id of a row's parent, read from the store. Used for parents
    /// created by an earlier run under this config file.
    pub fn resolve_parent(&self, csv_id: &str, parent_csv_id: &str) -> Result<RemoteId, RecoveryError> {
        self.store
            .lookup_remote_id(&self.config_file, parent_csv_id)?
            .ok_or_else(|| RecoveryError::ParentLookup {
                row_id: csv_id.to_string(),
                parent_row_id: parent_csv_id.to_string(),
            })
    }
}
