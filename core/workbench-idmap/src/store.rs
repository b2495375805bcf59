//! SQLite-backed identity map.
//!
//! Records are only ever appended by a run. Deletion happens solely through
//! the explicit maintenance operations below.

use crate::error::{IdMapError, IdMapResult};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};
use workbench_types::RemoteId;

/// Format of the `timestamp` column. Lexical order is chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const COLUMNS: &str = "timestamp, config_file, parent_csv_id, parent_node_id, csv_id, node_id";

/// One row of the identity map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityMapRecord {
    pub timestamp: String,
    pub config_file: String,
    pub parent_csv_id: Option<String>,
    pub parent_node_id: Option<RemoteId>,
    pub csv_id: String,
    pub node_id: RemoteId,
}

/// Column whose values must repeat for a record to be dumped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonUniqueColumn {
    CsvId,
    NodeId,
}

impl NonUniqueColumn {
    fn column(self) -> &'static str {
        match self {
            Self::CsvId => "csv_id",
            Self::NodeId => "node_id",
        }
    }
}

impl fmt::Display for NonUniqueColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Selects records for [`IdentityMapStore::dump`]. All criteria combine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpFilter {
    pub config_file: Option<String>,
    pub csv_id: Option<String>,
    pub node_id: Option<RemoteId>,
    pub nonunique: Option<NonUniqueColumn>,
}

impl DumpFilter {
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn config_file(mut self, config_file: impl Into<String>) -> Self {
        self.config_file = Some(config_file.into());
        self
    }

    #[must_use]
    pub fn csv_id(mut self, csv_id: impl Into<String>) -> Self {
        self.csv_id = Some(csv_id.into());
        self
    }

    #[must_use]
    pub fn node_id(mut self, node_id: impl Into<RemoteId>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    #[must_use]
    pub fn nonunique(mut self, column: NonUniqueColumn) -> Self {
        self.nonunique = Some(column);
        self
    }
}

/// Persistent store correlating input rows with created remote entities.
pub struct IdentityMapStore {
    conn: Mutex<Connection>,
}

impl IdentityMapStore {
    /// Opens (or creates) the map at the given path.
    pub fn open(path: impl AsRef<Path>) -> IdMapResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            IdMapError::Storage(format!("failed to open identity map {}: {e}", path.display()))
        })?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        debug!(path = %path.display(), "opened identity map");
        Ok(store)
    }

    /// Opens an in-memory map (for testing).
    pub fn open_in_memory() -> IdMapResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| IdMapError::Storage(format!("failed to open in-memory identity map: {e}")))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> IdMapResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS csv_id_to_node_id_map (
                timestamp TEXT,
                config_file TEXT,
                parent_csv_id TEXT,
                parent_node_id TEXT,
                csv_id TEXT,
                node_id TEXT
            );
            CREATE INDEX IF NOT EXISTS csv_id_to_node_id_map_csv_id
                ON csv_id_to_node_id_map (config_file, csv_id);
            ",
        )
        .map_err(|e| IdMapError::Storage(format!("failed to init identity map schema: {e}")))?;
        Ok(())
    }

    fn conn(&self) -> IdMapResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| IdMapError::Storage("identity map lock poisoned".to_string()))
    }

    // ── Writes ───────────────────────────────────────────────────

    /// Appends a mapping stamped with the current local time.
    pub fn insert(
        &self,
        config_file: &str,
        csv_id: &str,
        node_id: &RemoteId,
        parent_csv_id: Option<&str>,
        parent_node_id: Option<&RemoteId>,
    ) -> IdMapResult<()> {
        self.insert_record(&IdentityMapRecord {
            timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
            config_file: config_file.to_string(),
            parent_csv_id: parent_csv_id.map(str::to_string),
            parent_node_id: parent_node_id.cloned(),
            csv_id: csv_id.to_string(),
            node_id: node_id.clone(),
        })
    }

    /// Appends a fully specified record. Existing records are never touched.
    pub fn insert_record(&self, record: &IdentityMapRecord) -> IdMapResult<()> {
        let conn = self.conn()?;
        conn.execute(
            &format!("INSERT INTO csv_id_to_node_id_map ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
            params![
                record.timestamp,
                record.config_file,
                record.parent_csv_id,
                record.parent_node_id.as_ref().map(RemoteId::as_str),
                record.csv_id,
                record.node_id.as_str(),
            ],
        )
        .map_err(|e| IdMapError::Storage(format!("failed to insert identity map record: {e}")))?;
        debug!(
            config_file = %record.config_file,
            csv_id = %record.csv_id,
            node_id = %record.node_id,
            "recorded identity mapping"
        );
        Ok(())
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Most recent remote id recorded for a row under a config file.
    ///
    /// Duplicates are expected across runs; the latest timestamp wins, and
    /// insertion order breaks ties within one second.
    pub fn lookup_remote_id(&self, config_file: &str, csv_id: &str) -> IdMapResult<Option<RemoteId>> {
        let conn = self.conn()?;
        let node_id: Option<String> = conn
            .query_row(
                "SELECT node_id FROM csv_id_to_node_id_map
                 WHERE config_file = ?1 AND csv_id = ?2
                 ORDER BY timestamp DESC, rowid DESC LIMIT 1",
                params![config_file, csv_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| IdMapError::Storage(format!("failed to look up csv id {csv_id}: {e}")))?;
        Ok(node_id.map(RemoteId::new))
    }

    /// Whether any record under `config_file` points at `node_id`.
    pub fn contains_remote_id(&self, config_file: &str, node_id: &RemoteId) -> IdMapResult<bool> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM csv_id_to_node_id_map WHERE config_file = ?1 AND node_id = ?2",
                params![config_file, node_id.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| IdMapError::Storage(format!("failed to look up node id {node_id}: {e}")))?;
        Ok(count > 0)
    }

    /// Total number of records.
    pub fn count(&self) -> IdMapResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM csv_id_to_node_id_map", [], |row| row.get(0))
            .map_err(|e| IdMapError::Storage(format!("failed to count identity map: {e}")))?;
        Ok(count as usize)
    }

    /// Records matching `filter`, oldest first.
    pub fn dump(&self, filter: &DumpFilter) -> IdMapResult<Vec<IdentityMapRecord>> {
        let mut clauses = Vec::new();
        let mut values: Vec<String> = Vec::new();
        if let Some(config_file) = &filter.config_file {
            values.push(config_file.clone());
            clauses.push(format!("config_file = ?{}", values.len()));
        }
        if let Some(csv_id) = &filter.csv_id {
            values.push(csv_id.clone());
            clauses.push(format!("csv_id = ?{}", values.len()));
        }
        if let Some(node_id) = &filter.node_id {
            values.push(node_id.as_str().to_string());
            clauses.push(format!("node_id = ?{}", values.len()));
        }
        if let Some(column) = filter.nonunique {
            let column = column.column();
            clauses.push(format!(
                "{column} IN (SELECT {column} FROM csv_id_to_node_id_map GROUP BY {column} HAVING COUNT({column}) > 1)"
            ));
        }
        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let sql = format!(
            "SELECT {COLUMNS} FROM csv_id_to_node_id_map {where_clause} ORDER BY timestamp, rowid"
        );

        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| IdMapError::Storage(format!("failed to prepare dump query: {e}")))?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                let parent_csv_id: Option<String> = row.get(2)?;
                let parent_node_id: Option<String> = row.get(3)?;
                Ok(IdentityMapRecord {
                    timestamp: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    config_file: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    parent_csv_id: parent_csv_id.filter(|s| !s.is_empty()),
                    parent_node_id: parent_node_id.filter(|s| !s.is_empty()).map(RemoteId::new),
                    csv_id: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    node_id: RemoteId::new(row.get::<_, Option<String>>(5)?.unwrap_or_default()),
                })
            })
            .map_err(|e| IdMapError::Storage(format!("failed to query identity map: {e}")))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(
                row.map_err(|e| IdMapError::Storage(format!("failed to read identity map row: {e}")))?,
            );
        }
        Ok(records)
    }

    // ── Maintenance ──────────────────────────────────────────────

    /// Deletes records stamped before `timestamp`. Truncated timestamps
    /// (`2024-05`, `2024-05-01 10`) compare as string prefixes.
    pub fn delete_before(&self, timestamp: &str) -> IdMapResult<usize> {
        validate_timestamp(timestamp)?;
        let deleted = self.execute_delete(
            "DELETE FROM csv_id_to_node_id_map WHERE timestamp < ?1",
            &[timestamp],
        )?;
        info!(timestamp, deleted, "removed identity map records before timestamp");
        Ok(deleted)
    }

    /// Deletes records stamped after `timestamp`.
    pub fn delete_after(&self, timestamp: &str) -> IdMapResult<usize> {
        validate_timestamp(timestamp)?;
        let deleted = self.execute_delete(
            "DELETE FROM csv_id_to_node_id_map WHERE timestamp > ?1",
            &[timestamp],
        )?;
        info!(timestamp, deleted, "removed identity map records after timestamp");
        Ok(deleted)
    }

    /// Deletes every record created under any of the given config files.
    pub fn delete_for_config_files(&self, config_files: &[&str]) -> IdMapResult<usize> {
        if config_files.is_empty() {
            return Ok(0);
        }
        let placeholders = (1..=config_files.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let deleted = self.execute_delete(
            &format!("DELETE FROM csv_id_to_node_id_map WHERE config_file IN ({placeholders})"),
            config_files,
        )?;
        info!(?config_files, deleted, "removed identity map records for config files");
        Ok(deleted)
    }

    /// Deletes records whose remote entity no longer exists.
    ///
    /// `probe` is asked once per distinct node id. A probe error leaves that
    /// id's records in place.
    pub fn delete_for_missing_remote_entities<F, E>(&self, mut probe: F) -> IdMapResult<usize>
    where
        F: FnMut(&RemoteId) -> Result<bool, E>,
        E: fmt::Display,
    {
        let node_ids = self.distinct_node_ids()?;
        let mut deleted = 0;
        for node_id in node_ids {
            match probe(&node_id) {
                Ok(true) => {}
                Ok(false) => {
                    deleted += self.execute_delete(
                        "DELETE FROM csv_id_to_node_id_map WHERE node_id = ?1",
                        &[node_id.as_str()],
                    )?;
                    debug!(%node_id, "removed records for missing remote entity");
                }
                Err(e) => warn!(%node_id, error = %e, "could not check remote entity; keeping records"),
            }
        }
        info!(deleted, "removed identity map records for missing remote entities");
        Ok(deleted)
    }

    fn distinct_node_ids(&self) -> IdMapResult<Vec<RemoteId>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT node_id FROM csv_id_to_node_id_map WHERE node_id IS NOT NULL")
            .map_err(|e| IdMapError::Storage(format!("failed to prepare node id query: {e}")))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| IdMapError::Storage(format!("failed to query node ids: {e}")))?;
        let mut ids = Vec::new();
        for row in rows {
            let id = row.map_err(|e| IdMapError::Storage(format!("failed to read node id: {e}")))?;
            ids.push(RemoteId::new(id));
        }
        ids.sort();
        Ok(ids)
    }

    fn execute_delete(&self, sql: &str, values: &[&str]) -> IdMapResult<usize> {
        let conn = self.conn()?;
        conn.execute(sql, params_from_iter(values.iter()))
            .map_err(|e| IdMapError::Storage(format!("failed to delete identity map records: {e}")))
    }
}

/// Accepts `YYYY-MM-DD hh:mm:ss` or any leading part of it ending on a
/// field boundary (`YYYY`, `YYYY-MM`, `YYYY-MM-DD`, `YYYY-MM-DD hh`, ...).
fn validate_timestamp(timestamp: &str) -> IdMapResult<()> {
    const TEMPLATE: &[u8] = b"0000-00-00 00:00:00";
    let bytes = timestamp.as_bytes();
    let boundary = matches!(bytes.len(), 4 | 7 | 10 | 13 | 16 | 19);
    let shaped = bytes.iter().zip(TEMPLATE).all(|(b, t)| match t {
        b'0' => b.is_ascii_digit(),
        sep => b == sep,
    });
    if boundary && shaped {
        Ok(())
    } else {
        Err(IdMapError::InvalidTimestamp(timestamp.to_string()))
    }
}
