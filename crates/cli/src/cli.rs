use std::path::PathBuf;

use clap::{Parser, Subcommand};
use servingstore::{Backend, ServeConfig, ServeResult};

/// Manage versioned datasets in a key-value store.
#[derive(Parser, Debug)]
#[command(name = "serving", version)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, env = "SERVING_CONFIG")]
    pub config: Option<PathBuf>,

    /// Store backend: redis or memory
    #[arg(long)]
    pub backend: Option<Backend>,

    /// Store host
    #[arg(long, env = "SERVING_HOST")]
    pub host: Option<String>,

    /// Store port
    #[arg(long, env = "SERVING_PORT")]
    pub port: Option<u16>,

    /// Logical database index
    #[arg(long)]
    pub db: Option<u32>,

    /// Keys requested per scan round-trip
    #[arg(long)]
    pub scan_count: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Show the store size and every dataset with its record count
    Inventory,
    /// Print a dataset's records as JSON lines
    Read {
        dataset: String,
        /// Read this version instead of the current one
        #[arg(long)]
        version: Option<String>,
        /// Order records by index
        #[arg(long)]
        sorted: bool,
    },
    /// Write a new version from a file of JSON objects, one per line
    Write {
        dataset: String,
        version: String,
        rows: PathBuf,
    },
    /// Point a dataset at a version
    Promote { dataset: String, version: String },
    /// Promote a version and delete the one it replaces (refused if the
    /// new version has no records)
    Rotate { dataset: String, version: String },
    /// Delete every record of a version
    DeleteVersion { dataset: String, version: String },
    /// Print a dataset's current version
    Current { dataset: String },
    /// Delete every key in the store
    Flush {
        /// Confirm the flush
        #[arg(long)]
        yes: bool,
    },
}

impl Cli {
    /// Configuration file (or defaults) with command-line overrides applied.
    pub fn resolve_config(&self) -> ServeResult<ServeConfig> {
        let mut config = match &self.config {
            Some(path) => ServeConfig::from_file(path)?,
            None => ServeConfig::default(),
        };
        if let Some(backend) = self.backend {
            config.store.backend = backend;
        }
        if let Some(host) = &self.host {
            config.store.host = host.clone();
        }
        if let Some(port) = self.port {
            config.store.port = port;
        }
        if let Some(db) = self.db {
            config.store.db = db;
        }
        if let Some(count) = self.scan_count {
            config.scan.count = count;
        }
        config.validate()?;
        Ok(config)
    }
}
