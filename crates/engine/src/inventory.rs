//! Store-wide inventory and maintenance.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serving_core::ServeResult;
use serving_storage::{KeyScan, KvStore, DEFAULT_SCAN_COUNT};

use crate::keys;

/// Per-dataset summary produced by [`InventoryReporter::get_dataset_info`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryEntry {
    /// Record keys seen for the dataset, across all versions
    pub total_records: u64,
    /// Version taken from the first record key the scan returned
    pub first_observed_version: String,
}

/// Reports on everything in the store.
#[derive(Clone)]
pub struct InventoryReporter {
    store: Arc<dyn KvStore>,
    scan_count: usize,
}

impl InventoryReporter {
    /// Create a reporter using the default scan batch size.
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_scan_count(store, DEFAULT_SCAN_COUNT)
    }

    /// Create a reporter requesting `scan_count` keys per scan round-trip.
    pub fn with_scan_count(store: Arc<dyn KvStore>, scan_count: usize) -> Self {
        Self {
            store,
            scan_count: scan_count.max(1),
        }
    }

    /// Total number of keys in the store, pointers included.
    pub fn get_db_size(&self) -> ServeResult<u64> {
        self.store.dbsize()
    }

    /// Summarize every dataset that has at least one record key.
    ///
    /// Counts are per key occurrence in the scan, so a key reported twice
    /// is counted twice. `first_observed_version` is whichever version the
    /// scan happened to reach first, not the current or newest one. A record
    /// key that does not parse aborts the whole report.
    pub fn get_dataset_info(&self) -> ServeResult<BTreeMap<String, InventoryEntry>> {
        let mut info: BTreeMap<String, InventoryEntry> = BTreeMap::new();
        let scan = KeyScan::with_count(
            self.store.as_ref(),
            keys::all_records_pattern(),
            self.scan_count,
        );
        for page in scan {
            for key in page? {
                let (dataset, version, _) = keys::decode_record_key(&key)?;
                info.entry(dataset)
                    .or_insert_with(|| InventoryEntry {
                        total_records: 0,
                        first_observed_version: version,
                    })
                    .total_records += 1;
            }
        }
        tracing::debug!(target: "serving::inventory", datasets = info.len(), "built inventory");
        Ok(info)
    }

    /// Remove every key in the store, including keys this crate did not write.
    pub fn delete_all(&self) -> ServeResult<()> {
        self.store.flushdb()?;
        tracing::warn!(target: "serving::inventory", "flushed all keys");
        Ok(())
    }
}

impl std::fmt::Debug for InventoryReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryReporter")
            .field("scan_count", &self.scan_count)
            .finish()
    }
}
