//! Reading input rows from CSV.

use crate::error::{SyncError, SyncResult};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use tracing::{debug, info};
use workbench_types::{Row, Task, WorkbenchConfig};

/// Column holding the remote id of the entity to update or delete.
pub const NODE_ID_COLUMN: &str = "node_id";

/// Reads `input_dir/input_csv` into ordered rows.
pub fn read_rows(config: &WorkbenchConfig) -> SyncResult<Vec<Row>> {
    let path = config.input_csv_path();
    let file = File::open(&path).map_err(|source| SyncError::InputIo {
        path: path.display().to_string(),
        source,
    })?;
    let rows = read_rows_from(file, config)?;
    info!(path = %path.display(), rows = rows.len(), "read input rows");
    Ok(rows)
}

/// Reads rows from any CSV source.
///
/// Cells are trimmed and typographic quotes are straightened. Lines starting
/// with `#` are comments. Columns listed in `ignore_csv_columns` are dropped.
/// Every row needs a unique, non-blank `id_field`; update and delete tasks
/// also need a `node_id` column.
pub fn read_rows_from<R: Read>(reader: R, config: &WorkbenchConfig) -> SyncResult<Vec<Row>> {
    let delimiter = u8::try_from(config.delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| {
            SyncError::InvalidInput(format!("delimiter '{}' is not a single ASCII character", config.delimiter))
        })?;

    let mut csv = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);
    let headers: Vec<String> = csv.headers()?.iter().map(straighten_quotes).collect();

    let id_index = column_index(&headers, &config.id_field)?;
    let node_id_index = match config.task {
        Task::Create => None,
        Task::Update | Task::Delete => Some(column_index(&headers, NODE_ID_COLUMN)?),
    };

    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    for record in csv.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        let id = record.get(id_index).unwrap_or_default();
        if id.is_empty() {
            return Err(SyncError::InvalidInput(format!(
                "line {line}: blank value in id column '{}'",
                config.id_field
            )));
        }
        if !seen.insert(id.to_string()) {
            return Err(SyncError::InvalidInput(format!(
                "line {line}: duplicate id '{id}' in column '{}'",
                config.id_field
            )));
        }

        let mut row = Row::new(id);
        if let Some(remote) = node_id_index.and_then(|i| record.get(i)).filter(|v| !v.is_empty()) {
            row = row.with_remote_id(remote);
        }
        for (header, value) in headers.iter().zip(record.iter()) {
            if config.ignore_csv_columns.iter().any(|c| c == header) {
                continue;
            }
            row.push_column(header.as_str(), straighten_quotes(value));
        }
        rows.push(row);
    }
    debug!(rows = rows.len(), "parsed csv");
    Ok(rows)
}

fn column_index(headers: &[String], name: &str) -> SyncResult<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| SyncError::InvalidInput(format!("input has no '{name}' column")))
}

fn straighten_quotes(value: &str) -> String {
    value
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}
