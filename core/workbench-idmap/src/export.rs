//! CSV export of identity map records.

use crate::error::IdMapResult;
use crate::store::{DumpFilter, IdentityMapRecord, IdentityMapStore};
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Header row of a dump.
pub const HEADERS: [&str; 6] = [
    "Timestamp",
    "Config file",
    "Parent CSV ID",
    "Parent node ID",
    "CSV ID",
    "Node ID",
];

/// Writes records as CSV, header first.
pub fn write_csv<W: Write>(records: &[IdentityMapRecord], writer: W) -> IdMapResult<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(HEADERS)?;
    for record in records {
        csv.write_record([
            record.timestamp.as_str(),
            record.config_file.as_str(),
            record.parent_csv_id.as_deref().unwrap_or_default(),
            record.parent_node_id.as_ref().map_or("", |id| id.as_str()),
            record.csv_id.as_str(),
            record.node_id.as_str(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Dumps the records matching `filter` to a CSV file. Returns the number of
/// records written.
pub fn dump_to_csv(store: &IdentityMapStore, filter: &DumpFilter, path: impl AsRef<Path>) -> IdMapResult<usize> {
    let records = store.dump(filter)?;
    let file = std::fs::File::create(path.as_ref())?;
    write_csv(&records, file)?;
    info!(path = %path.as_ref().display(), records = records.len(), "dumped identity map");
    Ok(records.len())
}
