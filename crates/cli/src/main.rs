//! `serving` command-line tool
//!
//! Usage:
//!   serving --host cache.internal inventory
//!   serving write iris v2 rows.jsonl && serving rotate iris v2
//!   serving read iris --sorted

mod cli;
mod rows;

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::process::ExitCode;

use clap::Parser;
use servingstore::{ServeError, ServingStore};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::{Cli, Command};

/// Failures surfaced by the binary.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Serve(#[from] ServeError),
    #[error("{path}: {source}")]
    RowFile {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("writing output: {0}")]
    Output(#[from] io::Error),
    #[error("refusing to flush without --yes")]
    FlushNotConfirmed,
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.resolve_config()?;
    tracing::debug!(
        target: "serving::cli",
        backend = ?config.store.backend,
        host = %config.store.host,
        port = config.store.port,
        "resolved configuration"
    );
    let store = ServingStore::open(&config)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Inventory => {
            let inventory = store.inventory();
            writeln!(out, "keys: {}", inventory.get_db_size()?)?;
            for (dataset, entry) in inventory.get_dataset_info()? {
                writeln!(
                    out,
                    "{}\trecords={}\tfirst_observed_version={}",
                    dataset, entry.total_records, entry.first_observed_version
                )?;
            }
        }
        Command::Read {
            dataset,
            version,
            sorted,
        } => {
            let reader = store.reader();
            let version = match version {
                Some(v) => v,
                None => reader.resolve_current_version(&dataset)?,
            };
            let records = if sorted {
                reader.fetch_sorted(&dataset, &version)?
            } else {
                reader.fetch_records(&dataset, &version)?
            };
            for record in &records {
                let line = serde_json::to_string(record).map_err(ServeError::from)?;
                writeln!(out, "{}", line)?;
            }
        }
        Command::Write {
            dataset,
            version,
            rows: path,
        } => {
            let file = File::open(&path).map_err(|source| CliError::RowFile {
                path: path.display().to_string(),
                source,
            })?;
            let rows = rows::read_rows(BufReader::new(file))?;
            let written = store.writer().write_version(&dataset, &version, rows)?;
            writeln!(out, "wrote {} records to {}:{}", written, dataset, version)?;
        }
        Command::Promote { dataset, version } => {
            store.writer().promote(&dataset, &version)?;
        }
        Command::Rotate { dataset, version } => {
            if let Some(old) = store.writer().rotate(&dataset, &version)? {
                writeln!(out, "retired {}", old)?;
            }
        }
        Command::DeleteVersion { dataset, version } => {
            let deleted = store.writer().delete_version(&dataset, &version)?;
            writeln!(out, "deleted {} keys", deleted)?;
        }
        Command::Current { dataset } => {
            writeln!(out, "{}", store.reader().resolve_current_version(&dataset)?)?;
        }
        Command::Flush { yes } => {
            if !yes {
                return Err(CliError::FlushNotConfirmed);
            }
            store.inventory().delete_all()?;
        }
    }
    Ok(())
}
