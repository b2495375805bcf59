//! `workbench` binary.

use anyhow::{Context, Result, bail};
use clap::Parser;
use workbench_cli::{
    Args, BatchOutcome, Command, describe, init_console_logging, init_file_logging, run_batch,
    run_id_map,
};
use workbench_client::{HttpTransport, ReqwestTransport};
use workbench_types::{RemoteId, WorkbenchConfig};

fn main() -> Result<()> {
    let args = Args::parse();

    let config = args
        .config
        .as_ref()
        .map(|path| {
            WorkbenchConfig::load(path)
                .with_context(|| format!("cannot load config {}", path.display()))
        })
        .transpose()?;
    let level = match (&config, args.verbose) {
        (_, true) => "debug".to_string(),
        (Some(config), false) => config.log_level.clone(),
        (None, false) => "info".to_string(),
    };

    if let Some(Command::IdMap(id_map)) = &args.command {
        init_console_logging(&level)?;
        let transport = config.as_ref().map(ReqwestTransport::new).transpose()?;
        let report = run_id_map(id_map, transport.as_ref().map(|t| t as &dyn HttpTransport))?;
        println!("{report}");
        return Ok(());
    }

    let Some(config) = config else {
        bail!("--config is required");
    };
    init_file_logging(&level, &config.log_file_path)?;

    let transport = ReqwestTransport::new(&config)?;
    let resume_from = args
        .recovery_mode_starting_from_node_id
        .as_deref()
        .map(RemoteId::new);

    match run_batch(&config, &transport, args.check, resume_from)? {
        BatchOutcome::Checked { rows } => {
            println!("Configuration and input data ({rows} rows) appear to be valid.");
        }
        BatchOutcome::Ran(summary) => {
            println!("{}", describe(&summary));
            if summary.failed > 0 {
                bail!(
                    "{} row(s) failed; see {}",
                    summary.failed,
                    config.log_file_path.display()
                );
            }
        }
    }
    Ok(())
}
