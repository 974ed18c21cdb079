//! Dataset engine for the serving store
//!
//! Versioned datasets over a [`KvStore`](serving_storage::KvStore):
//! - [`DatasetWriter`]: write a version, promote it, delete old versions
//! - [`DatasetReader`]: resolve the current version and fetch its records
//! - [`InventoryReporter`]: store-wide counts and flush
//! - [`ServeConfig`]: TOML configuration
//!
//! Readers never observe a version switch half-done: the pointer is a single
//! key. Nothing else is coordinated; see [`writer`] for the races that remain.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod inventory;
pub mod keys;
pub mod reader;
pub mod writer;

pub use config::{Backend, ScanConfig, ServeConfig, StoreConfig};
pub use inventory::{InventoryEntry, InventoryReporter};
pub use reader::DatasetReader;
pub use writer::DatasetWriter;
