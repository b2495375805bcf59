//! Per-row batch driver.
//!
//! Rows are processed strictly in input order, one request at a time.
//! Row-scoped failures are logged and counted; only identity map failures
//! stop the run.

use crate::csv_input::NODE_ID_COLUMN;
use crate::error::{SyncError, SyncResult};
use crate::payload;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{error, info, warn};
use workbench_client::{HttpTransport, NodeClient};
use workbench_fields::{FieldWarning, RowValidator, TermResolver, ValidationIssue};
use workbench_idmap::{IdentityMapStore, RecoveryController, RecoveryError, RowDisposition};
use workbench_types::{FieldDefinition, RemoteId, Row, Task, WorkbenchConfig};

/// What happened to one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Created { row_id: String, remote_id: RemoteId },
    Updated { row_id: String, remote_id: RemoteId },
    Deleted { row_id: String, remote_id: RemoteId },
    /// Already materialized by an earlier, interrupted run.
    Skipped { row_id: String, remote_id: RemoteId },
    Failed { row_id: String, reason: String },
}

/// Totals for a run plus every row's outcome, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub warnings: Vec<FieldWarning>,
    pub outcomes: Vec<RowOutcome>,
}

impl RunSummary {
    fn record(&mut self, outcome: RowOutcome) {
        match &outcome {
            RowOutcome::Created { .. } => self.created += 1,
            RowOutcome::Updated { .. } => self.updated += 1,
            RowOutcome::Deleted { .. } => self.deleted += 1,
            RowOutcome::Skipped { .. } => self.skipped += 1,
            RowOutcome::Failed { .. } => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }

    fn fail(&mut self, err: &SyncError, row_id: &str) {
        error!(row_id, "{err}");
        self.record(RowOutcome::Failed {
            row_id: row_id.to_string(),
            reason: err.to_string(),
        });
    }
}

/// Runs one configured task over a sequence of rows.
pub struct BatchDriver<'a> {
    config: &'a WorkbenchConfig,
    definitions: &'a BTreeMap<String, FieldDefinition>,
    nodes: NodeClient<'a>,
    terms: &'a dyn TermResolver,
    store: &'a IdentityMapStore,
}

impl<'a> BatchDriver<'a> {
    pub fn new(
        config: &'a WorkbenchConfig,
        definitions: &'a BTreeMap<String, FieldDefinition>,
        transport: &'a dyn HttpTransport,
        terms: &'a dyn TermResolver,
        store: &'a IdentityMapStore,
    ) -> Self {
        Self {
            config,
            definitions,
            nodes: NodeClient::new(transport),
            terms,
            store,
        }
    }

    /// Columns that carry bookkeeping rather than field values.
    pub fn reserved_columns(&self) -> Vec<String> {
        vec![
            self.config.id_field.clone(),
            self.config.parent_id_field.clone(),
            NODE_ID_COLUMN.to_string(),
        ]
    }

    /// Pre-flight validation. Makes no requests.
    pub fn check(&self, rows: &[Row]) -> Vec<ValidationIssue> {
        let validator = RowValidator::new(self.definitions, &self.config.subdelimiter)
            .with_reserved(self.reserved_columns());
        match self.config.task {
            Task::Create => validator.require_required_fields().validate(rows),
            // Update and delete rows only need the columns they change.
            Task::Update => validator.validate(rows),
            Task::Delete => Vec::new(),
        }
    }

    /// Runs the configured task. `resume_from` puts a create run in
    /// recovery mode; other tasks ignore it.
    pub fn run(&self, rows: &[Row], resume_from: Option<RemoteId>) -> SyncResult<RunSummary> {
        info!(
            task = ?self.config.task,
            rows = rows.len(),
            config_file = %self.config.config_file,
            "starting run"
        );
        let summary = match self.config.task {
            Task::Create => self.run_create(rows, resume_from)?,
            Task::Update => self.run_each(rows, |row, summary| self.update_row(row, summary)),
            Task::Delete => self.run_each(rows, |row, summary| self.delete_row(row, summary)),
        };
        info!(
            created = summary.created,
            updated = summary.updated,
            deleted = summary.deleted,
            skipped = summary.skipped,
            failed = summary.failed,
            warnings = summary.warnings.len(),
            "run finished"
        );
        Ok(summary)
    }

    fn run_each<F>(&self, rows: &[Row], mut process: F) -> RunSummary
    where
        F: FnMut(&Row, &mut RunSummary) -> SyncResult<RowOutcome>,
    {
        let mut summary = RunSummary::default();
        for row in rows {
            match process(row, &mut summary) {
                Ok(outcome) => summary.record(outcome),
                Err(e) => summary.fail(&e, &row.id),
            }
        }
        summary
    }

    // ── create ───────────────────────────────────────────────────────

    fn run_create(&self, rows: &[Row], resume_from: Option<RemoteId>) -> SyncResult<RunSummary> {
        let config_file = self.config.config_file.as_str();
        let mut recovery = match resume_from {
            Some(anchor) => RecoveryController::resuming(self.store, config_file, anchor)?,
            None => RecoveryController::normal(self.store, config_file),
        };
        let input_ids: HashSet<&str> = rows.iter().map(|row| row.id.as_str()).collect();
        // Remote ids of rows created or skipped during this run.
        let mut known: HashMap<String, RemoteId> = HashMap::new();
        let mut summary = RunSummary::default();

        for row in rows {
            if let RowDisposition::Skip { remote_id } = recovery.check_row(&row.id)? {
                known.insert(row.id.clone(), remote_id.clone());
                summary.record(RowOutcome::Skipped {
                    row_id: row.id.clone(),
                    remote_id,
                });
                continue;
            }

            let parent = match self.parent_of(row, &input_ids, &known, &recovery) {
                Ok(parent) => parent,
                Err(RecoveryError::IdMap(e)) => return Err(e.into()),
                Err(e) => {
                    summary.fail(&e.into(), &row.id);
                    continue;
                }
            };

            match self.create_row(row, parent.as_ref(), &mut summary) {
                Ok(remote_id) => {
                    self.store.insert(
                        config_file,
                        &row.id,
                        &remote_id,
                        parent.as_ref().map(|(csv_id, _)| csv_id.as_str()),
                        parent.as_ref().map(|(_, node_id)| node_id),
                    )?;
                    known.insert(row.id.clone(), remote_id.clone());
                    summary.record(RowOutcome::Created {
                        row_id: row.id.clone(),
                        remote_id,
                    });
                }
                Err(e) => summary.fail(&e, &row.id),
            }
        }

        if recovery.is_recovering() {
            warn!(
                skipped = recovery.skipped(),
                "every row was already in the identity map; nothing was created"
            );
        }
        Ok(summary)
    }

    /// The row's parent as (parent row id, parent remote id), if it names one.
    ///
    /// A parent in this input must have been created or skipped earlier in
    /// the run; one that failed or comes later fails the child. Parents
    /// outside the input are read from the identity map only when
    /// `query_csv_id_to_node_id_map_for_parents` is set.
    fn parent_of(
        &self,
        row: &Row,
        input_ids: &HashSet<&str>,
        known: &HashMap<String, RemoteId>,
        recovery: &RecoveryController<'_>,
    ) -> Result<Option<(String, RemoteId)>, RecoveryError> {
        let Some(parent_id) = row.get_non_blank(&self.config.parent_id_field) else {
            return Ok(None);
        };
        let remote_id = match known.get(parent_id) {
            Some(remote_id) => remote_id.clone(),
            None if !input_ids.contains(parent_id)
                && self.config.query_csv_id_to_node_id_map_for_parents =>
            {
                recovery.resolve_parent(&row.id, parent_id)?
            }
            None => {
                return Err(RecoveryError::ParentLookup {
                    row_id: row.id.clone(),
                    parent_row_id: parent_id.to_string(),
                });
            }
        };
        Ok(Some((parent_id.to_string(), remote_id)))
    }

    fn create_row(
        &self,
        row: &Row,
        parent: Option<&(String, RemoteId)>,
        summary: &mut RunSummary,
    ) -> SyncResult<RemoteId> {
        let mut body = payload::node_base(self.config);
        let mut warnings = Vec::new();
        for (name, def) in self.field_columns(row) {
            let reconciled = payload::reconcile_create(self.config, name, def, row, self.terms);
            warnings.extend(reconciled.warnings);
            if !reconciled.state.is_empty() {
                body.insert(name.to_string(), reconciled.state.to_json());
            }
        }
        summary.warnings.extend(warnings);

        if !body.contains_key("title") {
            return Err(SyncError::row(&row.id, "title is missing or blank"));
        }
        if let Some((_, parent_remote_id)) = parent {
            payload::link_parent(&mut body, &self.config.parent_field, parent_remote_id);
        }
        Ok(self.nodes.create_node(&Value::Object(body))?)
    }

    // ── update / delete ──────────────────────────────────────────────

    fn update_row(&self, row: &Row, summary: &mut RunSummary) -> SyncResult<RowOutcome> {
        let remote_id = self.remote_id_of(row)?;
        let existing = self.nodes.get_node(&remote_id)?;

        let mut body = payload::node_base_for_update(self.config);
        let mut warnings = Vec::new();
        for (name, def) in self.field_columns(row) {
            let Some(reconciled) =
                payload::reconcile_update(self.config, name, def, row, &existing, self.terms)?
            else {
                continue;
            };
            warnings.extend(reconciled.warnings);
            body.insert(name.to_string(), reconciled.state.to_json());
        }
        summary.warnings.extend(warnings);

        self.nodes.patch_node(&remote_id, &Value::Object(body))?;
        Ok(RowOutcome::Updated {
            row_id: row.id.clone(),
            remote_id,
        })
    }

    fn delete_row(&self, row: &Row, _summary: &mut RunSummary) -> SyncResult<RowOutcome> {
        let remote_id = self.remote_id_of(row)?;
        self.nodes.delete_node(&remote_id)?;
        Ok(RowOutcome::Deleted {
            row_id: row.id.clone(),
            remote_id,
        })
    }

    fn remote_id_of(&self, row: &Row) -> SyncResult<RemoteId> {
        row.remote_id
            .clone()
            .ok_or_else(|| SyncError::row(&row.id, format!("no value in '{NODE_ID_COLUMN}' column")))
    }

    /// Columns of `row` that name a known field, in column order.
    fn field_columns<'r>(&self, row: &'r Row) -> Vec<(&'r str, &'a FieldDefinition)> {
        let reserved = self.reserved_columns();
        let definitions = self.definitions;
        row.columns()
            .filter(|(name, _)| !reserved.iter().any(|r| r == name))
            .filter_map(|(name, _)| definitions.get(name).map(|def| (name, def)))
            .collect()
    }
}
