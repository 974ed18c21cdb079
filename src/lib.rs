//! # servingstore
//!
//! Versioned dataset serving over a key-value store.
//!
//! A dataset is published in versions. Each version is a set of rows stored
//! one key per row; a per-dataset pointer names the version readers see.
//! Switching versions is a single pointer write, so readers never see a mix
//! of two versions through the pointer.
//!
//! ```
//! use servingstore::{row, FieldValue, ServingStore};
//!
//! let store = ServingStore::in_memory();
//! let writer = store.writer();
//! writer.write_version("iris", "v1", vec![row([("petal_length", FieldValue::Float(1.4))])])?;
//! writer.promote("iris", "v1")?;
//!
//! let (version, records) = store.reader().fetch_current("iris")?;
//! assert_eq!(version, "v1");
//! assert_eq!(records.len(), 1);
//! # Ok::<(), servingstore::ServeError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod types;

use std::sync::Arc;

pub use types::*;

/// Entry point tying a store to its reader, writer and inventory handles.
///
/// Cheap to clone; all handles share one store.
#[derive(Clone)]
pub struct ServingStore {
    store: Arc<dyn KvStore>,
    scan_count: usize,
}

impl ServingStore {
    /// Open the backend named by `config`.
    ///
    /// The redis backend connects eagerly, so an unreachable server fails
    /// here with `StoreUnavailable`.
    pub fn open(config: &ServeConfig) -> ServeResult<Self> {
        config.validate()?;
        let store: Arc<dyn KvStore> = match config.store.backend {
            Backend::Memory => Arc::new(MemoryStore::new()),
            Backend::Redis => {
                let resp =
                    RespStore::connect(&config.store.host, config.store.port, config.store.db)?;
                tracing::info!(target: "serving::store", addr = resp.addr(), "connected to redis");
                Arc::new(resp)
            }
        };
        tracing::debug!(
            target: "serving::store",
            backend = ?config.store.backend,
            scan_count = config.scan.count,
            "opened store"
        );
        Ok(Self::from_store(store, config.scan.count))
    }

    /// Fresh in-process store with default settings.
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(MemoryStore::new()), DEFAULT_SCAN_COUNT)
    }

    /// Wrap an existing store.
    pub fn from_store(store: Arc<dyn KvStore>, scan_count: usize) -> Self {
        Self {
            store,
            scan_count: scan_count.max(1),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// Read-side handle.
    pub fn reader(&self) -> DatasetReader {
        DatasetReader::with_scan_count(self.store.clone(), self.scan_count)
    }

    /// Write-side handle.
    pub fn writer(&self) -> DatasetWriter {
        DatasetWriter::with_scan_count(self.store.clone(), self.scan_count)
    }

    /// Inventory and maintenance handle.
    pub fn inventory(&self) -> InventoryReporter {
        InventoryReporter::with_scan_count(self.store.clone(), self.scan_count)
    }
}

impl std::fmt::Debug for ServingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServingStore")
            .field("scan_count", &self.scan_count)
            .finish()
    }
}
