//! Dataset writes, promotion and retirement.
//!
//! # Lifecycle
//!
//! 1. `write_version` persists rows under a fresh version, indices `0..N`.
//! 2. `promote` points the dataset at that version (single-key, atomic).
//! 3. `delete_version` reclaims a superseded version's records.
//!
//! # Races
//!
//! - The write guard in `write_version` is read-then-write, not atomic. Two
//!   writers targeting the same (dataset, version) can both pass the check
//!   and interleave their records.
//! - `promote` and `delete_version` are not coordinated with readers. A
//!   reader that resolved a version just before it was deleted sees a
//!   partial or empty record set. Only delete a version once no reader can
//!   still be holding it; there is no reference counting.

use std::sync::Arc;

use serving_core::{encode_payload, Row, ServeError, ServeResult};
use serving_storage::{KeyScan, KvStore, WriteBatch, DEFAULT_SCAN_COUNT};

use crate::keys;
use crate::reader::DatasetReader;

/// Write-side handle over a shared store.
#[derive(Clone)]
pub struct DatasetWriter {
    store: Arc<dyn KvStore>,
    reader: DatasetReader,
}

impl DatasetWriter {
    /// Create a writer using the default scan batch size.
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_scan_count(store, DEFAULT_SCAN_COUNT)
    }

    /// Create a writer requesting `scan_count` keys per scan round-trip.
    pub fn with_scan_count(store: Arc<dyn KvStore>, scan_count: usize) -> Self {
        Self {
            reader: DatasetReader::with_scan_count(store.clone(), scan_count),
            store,
        }
    }

    /// The reader this writer uses for its existence checks.
    pub fn reader(&self) -> &DatasetReader {
        &self.reader
    }

    /// Persist `rows` as version `version` of `dataset`.
    ///
    /// Row `i` is stored under index `i`. Fails with `VersionAlreadyExists`
    /// if any record of the version is already present. All records go out
    /// in one pipeline; concurrent readers may see a prefix of them. Zero
    /// rows write nothing. Returns the number of records written.
    pub fn write_version<I>(&self, dataset: &str, version: &str, rows: I) -> ServeResult<usize>
    where
        I: IntoIterator<Item = Row>,
    {
        keys::validate_dataset_name(dataset)?;
        keys::validate_version(version)?;

        if !self.reader.fetch_records(dataset, version)?.is_empty() {
            return Err(ServeError::version_exists(dataset, version));
        }

        let rows = rows.into_iter();
        let mut batch = WriteBatch::with_capacity(rows.size_hint().0);
        for (index, row) in rows.enumerate() {
            batch.set(
                keys::record_key(dataset, version, index as u64),
                encode_payload(&row)?,
            );
        }

        let written = batch.len();
        if written == 0 {
            tracing::warn!(target: "serving::writer", dataset, version, "no rows to write");
            return Ok(0);
        }
        self.store.apply_batch(batch)?;
        tracing::info!(
            target: "serving::writer",
            dataset,
            version,
            records = written,
            "wrote version"
        );
        Ok(written)
    }

    /// Point `dataset` at `version`, overwriting the previous pointer.
    ///
    /// Does not check that the version has records.
    pub fn promote(&self, dataset: &str, version: &str) -> ServeResult<()> {
        keys::validate_dataset_name(dataset)?;
        keys::validate_version(version)?;
        self.store
            .set(&keys::version_pointer_key(dataset), version)?;
        tracing::info!(target: "serving::writer", dataset, version, "promoted version");
        Ok(())
    }

    /// Delete every record of `(dataset, version)`, returning how many keys
    /// were removed. Deleting an absent version is a no-op.
    ///
    /// The pointer is left untouched, even if it names this version.
    pub fn delete_version(&self, dataset: &str, version: &str) -> ServeResult<u64> {
        keys::validate_dataset_name(dataset)?;
        keys::validate_version(version)?;

        let pattern = keys::record_scan_pattern(dataset, Some(version));
        let mut deleted = 0;
        for page in KeyScan::with_count(self.store.as_ref(), pattern, self.reader.scan_count()) {
            let page = page?;
            if !page.is_empty() {
                deleted += self.store.delete(&page)?;
            }
        }
        tracing::info!(
            target: "serving::writer",
            dataset,
            version,
            keys = deleted,
            "deleted version"
        );
        Ok(deleted)
    }

    /// Version the dataset's pointer currently names.
    pub fn get_current_version(&self, dataset: &str) -> ServeResult<String> {
        self.reader.resolve_current_version(dataset)
    }

    /// Promote `new_version`, then delete the records of the version it
    /// replaced.
    ///
    /// Fails with `InvalidInput` before touching the pointer if
    /// `new_version` has no records, so a mistyped version cannot retire the
    /// live one. Returns the retired version, or `None` if the pointer was
    /// unset or already named `new_version`.
    pub fn rotate(&self, dataset: &str, new_version: &str) -> ServeResult<Option<String>> {
        if !self.version_has_records(dataset, new_version)? {
            return Err(ServeError::invalid_input(format!(
                "refusing to rotate '{}' to version '{}': it has no records",
                dataset, new_version
            )));
        }
        let old = match self.get_current_version(dataset) {
            Ok(v) => Some(v),
            Err(ServeError::NoCurrentVersion { .. }) => None,
            Err(e) => return Err(e),
        };
        self.promote(dataset, new_version)?;

        match old {
            Some(old) if old != new_version => {
                self.delete_version(dataset, &old)?;
                tracing::info!(
                    target: "serving::writer",
                    dataset,
                    old_version = %old,
                    new_version,
                    "rotated version"
                );
                Ok(Some(old))
            }
            _ => Ok(None),
        }
    }
}

impl DatasetWriter {
    /// True once any page of the version's scan returns a key.
    fn version_has_records(&self, dataset: &str, version: &str) -> ServeResult<bool> {
        keys::validate_dataset_name(dataset)?;
        keys::validate_version(version)?;
        let pattern = keys::record_scan_pattern(dataset, Some(version));
        for page in KeyScan::with_count(self.store.as_ref(), pattern, self.reader.scan_count()) {
            if !page?.is_empty() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl std::fmt::Debug for DatasetWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetWriter")
            .field("reader", &self.reader)
            .finish()
    }
}
