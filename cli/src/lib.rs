//! Command-line front end for the workbench batch synchronizer.
//!
//! Usage:
//!   workbench --config create.yml [--check] [--recovery-mode-starting-from-node-id 105]
//!   workbench id-map --db-path map.db dump --csv-path out.csv [--nonunique csv_id]
//!   workbench id-map --db-path map.db remove-before "2024-01-01"
//!   workbench --config create.yml id-map --db-path map.db remove-deleted-nodes
//!
//! The argument types and the command bodies live here so they can be
//! exercised without spawning the binary.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use workbench_client::{HttpTransport, NodeClient, RemoteTermResolver, get_field_definitions};
use workbench_idmap::{DumpFilter, IdentityMapStore, NonUniqueColumn, export};
use workbench_sync::{BatchDriver, RunSummary, read_rows};
use workbench_types::{RemoteId, WorkbenchConfig};

#[derive(Parser, Debug)]
#[command(name = "workbench")]
#[command(about = "Batch create, update and delete remote content from CSV")]
pub struct Args {
    /// Path to the YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Validate the input against the remote field definitions and exit
    #[arg(long)]
    pub check: bool,

    /// Resume an interrupted create run; rows already in the identity map are skipped
    #[arg(long, value_name = "NODE_ID")]
    pub recovery_mode_starting_from_node_id: Option<String>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect or prune the CSV id to node id map
    IdMap(IdMapArgs),
}

#[derive(clap::Args, Debug)]
pub struct IdMapArgs {
    /// Path to the identity map database
    #[arg(long)]
    pub db_path: PathBuf,

    #[command(subcommand)]
    pub action: IdMapAction,
}

#[derive(Subcommand, Debug)]
pub enum IdMapAction {
    /// Write matching records to a CSV file
    Dump {
        #[arg(long)]
        csv_path: PathBuf,

        /// Only rows whose value in this column appears more than once
        #[arg(long, value_enum)]
        nonunique: Option<NonUniqueArg>,

        #[arg(long)]
        config_file: Option<String>,

        #[arg(long)]
        csv_id: Option<String>,

        #[arg(long)]
        node_id: Option<String>,
    },
    /// Delete records older than a (possibly partial) timestamp
    RemoveBefore { timestamp: String },
    /// Delete records newer than a (possibly partial) timestamp
    RemoveAfter { timestamp: String },
    /// Delete records written by the given config files
    RemoveConfigFiles {
        #[arg(value_delimiter = ',', required = true)]
        config_files: Vec<String>,
    },
    /// Delete records whose node no longer exists (needs --config)
    RemoveDeletedNodes,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum NonUniqueArg {
    #[value(name = "csv_id")]
    CsvId,
    #[value(name = "node_id")]
    NodeId,
}

impl From<NonUniqueArg> for NonUniqueColumn {
    fn from(arg: NonUniqueArg) -> Self {
        match arg {
            NonUniqueArg::CsvId => Self::CsvId,
            NonUniqueArg::NodeId => Self::NodeId,
        }
    }
}

// ── logging ──────────────────────────────────────────────────────

/// Compact log output to stderr.
pub fn init_console_logging(level: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(filter(level)?)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install logger: {e}"))
}

/// Log output appended to `path`.
pub fn init_file_logging(level: &str, path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter(level)?)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install logger: {e}"))
}

/// `RUST_LOG` wins over the configured level.
fn filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level '{level}'"))
}

// ── batch runs ───────────────────────────────────────────────────

/// Result of [`run_batch`].
#[derive(Debug)]
pub enum BatchOutcome {
    /// `--check` found no problems.
    Checked { rows: usize },
    Ran(RunSummary),
}

/// Runs (or with `check_only`, validates) the configured task.
pub fn run_batch(
    config: &WorkbenchConfig,
    transport: &dyn HttpTransport,
    check_only: bool,
    resume_from: Option<RemoteId>,
) -> Result<BatchOutcome> {
    let definitions = get_field_definitions(transport, config, "node")
        .with_context(|| format!("cannot fetch field definitions for '{}'", config.content_type))?;
    let rows = read_rows(config)?;

    let id_map_path = config.id_map_path();
    let store = IdentityMapStore::open(&id_map_path)
        .with_context(|| format!("cannot open identity map {}", id_map_path.display()))?;
    let terms = RemoteTermResolver::new(transport, config.allow_adding_terms);
    let driver = BatchDriver::new(config, &definitions, transport, &terms, &store);

    let issues = driver.check(&rows);
    if check_only {
        if issues.is_empty() {
            return Ok(BatchOutcome::Checked { rows: rows.len() });
        }
        for issue in &issues {
            warn!("{issue}");
        }
        let listed: Vec<String> = issues.iter().map(ToString::to_string).collect();
        bail!("{} problem(s) found:\n{}", issues.len(), listed.join("\n"));
    }
    for issue in &issues {
        warn!("{issue}");
    }

    Ok(BatchOutcome::Ran(driver.run(&rows, resume_from)?))
}

// ── identity map maintenance ─────────────────────────────────────

/// Runs an `id-map` action and returns a one-line report.
///
/// `transport` is only needed by `remove-deleted-nodes`.
pub fn run_id_map(args: &IdMapArgs, transport: Option<&dyn HttpTransport>) -> Result<String> {
    let store = IdentityMapStore::open(&args.db_path)
        .with_context(|| format!("cannot open identity map {}", args.db_path.display()))?;

    let report = match &args.action {
        IdMapAction::Dump {
            csv_path,
            nonunique,
            config_file,
            csv_id,
            node_id,
        } => {
            let mut filter = DumpFilter::all();
            if let Some(config_file) = config_file {
                filter = filter.config_file(config_file.as_str());
            }
            if let Some(csv_id) = csv_id {
                filter = filter.csv_id(csv_id.as_str());
            }
            if let Some(node_id) = node_id {
                filter = filter.node_id(node_id.as_str());
            }
            if let Some(column) = nonunique {
                filter = filter.nonunique((*column).into());
            }
            let written = export::dump_to_csv(&store, &filter, csv_path)?;
            format!("Wrote {written} record(s) to {}", csv_path.display())
        }
        IdMapAction::RemoveBefore { timestamp } => {
            let removed = store.delete_before(timestamp)?;
            format!("Removed {removed} record(s) older than {timestamp}")
        }
        IdMapAction::RemoveAfter { timestamp } => {
            let removed = store.delete_after(timestamp)?;
            format!("Removed {removed} record(s) newer than {timestamp}")
        }
        IdMapAction::RemoveConfigFiles { config_files } => {
            let names: Vec<&str> = config_files.iter().map(|s| s.trim()).collect();
            let removed = store.delete_for_config_files(&names)?;
            format!("Removed {removed} record(s) for {}", names.join(", "))
        }
        IdMapAction::RemoveDeletedNodes => {
            let Some(transport) = transport else {
                bail!("remove-deleted-nodes needs --config to reach the remote host");
            };
            let nodes = NodeClient::new(transport);
            let removed = store.delete_for_missing_remote_entities(|id| nodes.node_exists(id))?;
            format!("Removed {removed} record(s) for nodes that no longer exist")
        }
    };
    info!("{report}");
    Ok(report)
}

/// One-line description of a finished run.
pub fn describe(summary: &RunSummary) -> String {
    format!(
        "created {}, updated {}, deleted {}, skipped {}, failed {}, {} warning(s)",
        summary.created,
        summary.updated,
        summary.deleted,
        summary.skipped,
        summary.failed,
        summary.warnings.len()
    )
}
