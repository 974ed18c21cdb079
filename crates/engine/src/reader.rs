//! Dataset reads.
//!
//! Resolves a dataset's current version and fetches the records of a
//! (dataset, version) pair by prefix scan.
//!
//! # Consistency
//!
//! The pointer is read from the store on every call; nothing is cached. A
//! version deleted while it is being fetched yields a partial or empty
//! result with no error, so callers must treat "resolved but incomplete" as
//! a possible outcome.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use serving_core::{decode_payload, Record, ServeError, ServeResult};
use serving_storage::{KeyScan, KvStore, DEFAULT_SCAN_COUNT};

use crate::keys;

/// Read-side handle over a shared store.
#[derive(Clone)]
pub struct DatasetReader {
    store: Arc<dyn KvStore>,
    scan_count: usize,
}

impl DatasetReader {
    /// Create a reader using the default scan batch size.
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_scan_count(store, DEFAULT_SCAN_COUNT)
    }

    /// Create a reader requesting `scan_count` keys per scan round-trip.
    pub fn with_scan_count(store: Arc<dyn KvStore>, scan_count: usize) -> Self {
        Self {
            store,
            scan_count: scan_count.max(1),
        }
    }

    /// Keys requested per scan round-trip.
    pub fn scan_count(&self) -> usize {
        self.scan_count
    }

    /// Version the dataset's pointer currently names.
    ///
    /// Fails with `NoCurrentVersion` when the pointer is unset.
    pub fn resolve_current_version(&self, dataset: &str) -> ServeResult<String> {
        keys::validate_dataset_name(dataset)?;
        self.store
            .get(&keys::version_pointer_key(dataset))?
            .ok_or_else(|| ServeError::no_current_version(dataset))
    }

    /// Every record stored for `(dataset, version)`, in store enumeration
    /// order. Never written versions give an empty vector.
    ///
    /// Keys repeated across scan pages are fetched once. Keys that vanish
    /// between the scan and the read are skipped.
    pub fn fetch_records(&self, dataset: &str, version: &str) -> ServeResult<Vec<Record>> {
        keys::validate_dataset_name(dataset)?;
        keys::validate_version(version)?;

        let pattern = keys::record_scan_pattern(dataset, Some(version));
        let mut seen = FxHashSet::default();
        let mut records = Vec::new();

        for page in KeyScan::with_count(self.store.as_ref(), pattern, self.scan_count) {
            for key in page? {
                if !seen.insert(key.clone()) {
                    continue;
                }
                let (_, _, index) = keys::decode_record_key(&key)?;
                let Some(payload) = self.store.get(&key)? else {
                    tracing::debug!(
                        target: "serving::reader",
                        dataset,
                        version,
                        key = %key,
                        "record vanished during fetch"
                    );
                    continue;
                };
                let fields = decode_payload(&payload)?;
                records.push(Record::new(dataset, version, index, fields));
            }
        }

        tracing::debug!(
            target: "serving::reader",
            dataset,
            version,
            records = records.len(),
            "fetched records"
        );
        Ok(records)
    }

    /// [`fetch_records`](Self::fetch_records) sorted by index.
    pub fn fetch_sorted(&self, dataset: &str, version: &str) -> ServeResult<Vec<Record>> {
        let mut records = self.fetch_records(dataset, version)?;
        records.sort_by_key(|r| r.index);
        Ok(records)
    }

    /// Resolve the current version, then fetch its records.
    pub fn fetch_current(&self, dataset: &str) -> ServeResult<(String, Vec<Record>)> {
        let version = self.resolve_current_version(dataset)?;
        let records = self.fetch_records(dataset, &version)?;
        Ok((version, records))
    }
}

impl std::fmt::Debug for DatasetReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetReader")
            .field("scan_count", &self.scan_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serving_core::{encode_payload, row, FieldValue};
    use serving_storage::MemoryStore;

    fn setup() -> (Arc<MemoryStore>, DatasetReader) {
        let store = Arc::new(MemoryStore::new());
        let reader = DatasetReader::with_scan_count(store.clone(), 2);
        (store, reader)
    }

    fn put_record(store: &MemoryStore, dataset: &str, version: &str, index: u64, a: i64) {
        let payload = encode_payload(&row([("a", FieldValue::Int(a))])).unwrap();
        store
            .set(&keys::record_key(dataset, version, index), &payload)
            .unwrap();
    }

    #[test]
    fn unset_pointer_is_no_current_version() {
        let (_store, reader) = setup();
        let err = reader.resolve_current_version("iris").unwrap_err();
        assert!(matches!(err, ServeError::NoCurrentVersion { ref dataset } if dataset == "iris"));
    }

    #[test]
    fn pointer_value_is_returned_verbatim() {
        let (store, reader) = setup();
        store.set("current_version:iris", "version_2").unwrap();
        assert_eq!(reader.resolve_current_version("iris").unwrap(), "version_2");
    }

    #[test]
    fn unwritten_version_is_empty_not_error() {
        let (_store, reader) = setup();
        assert!(reader.fetch_records("iris", "v9").unwrap().is_empty());
    }

    #[test]
    fn fetch_returns_only_the_requested_version() {
        let (store, reader) = setup();
        for i in 0..5 {
            put_record(&store, "iris", "v1", i, i as i64);
        }
        put_record(&store, "iris", "v10", 0, 100);
        put_record(&store, "wine", "v1", 0, 200);
        store.set("current_version:iris", "v1").unwrap();

        let records = reader.fetch_sorted("iris", "v1").unwrap();
        assert_eq!(records.len(), 5);
        for (i, r) in records.iter().enumerate() {
            assert_eq!(r.index, i as u64);
            assert_eq!(r.dataset, "iris");
            assert_eq!(r.version, "v1");
            assert_eq!(r.fields["a"], FieldValue::Int(i as i64));
        }
    }

    #[test]
    fn fetch_current_follows_the_pointer() {
        let (store, reader) = setup();
        put_record(&store, "iris", "v1", 0, 1);
        put_record(&store, "iris", "v2", 0, 2);
        store.set("current_version:iris", "v2").unwrap();

        let (version, records) = reader.fetch_current("iris").unwrap();
        assert_eq!(version, "v2");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fields["a"], FieldValue::Int(2));
    }

    #[test]
    fn fetch_current_without_pointer_fails() {
        let (store, reader) = setup();
        put_record(&store, "iris", "v1", 0, 1);
        assert!(matches!(
            reader.fetch_current("iris"),
            Err(ServeError::NoCurrentVersion { .. })
        ));
    }

    #[test]
    fn corrupt_payload_is_serialization_error() {
        let (store, reader) = setup();
        store.set("serving_data:iris:v1:0", "not json").unwrap();
        let err = reader.fetch_records("iris", "v1").unwrap_err();
        assert!(matches!(err, ServeError::Serialization { .. }));
    }

    #[test]
    fn malformed_matching_key_aborts_fetch() {
        let (store, reader) = setup();
        store.set("serving_data:iris:v1:zero", "{}").unwrap();
        let err = reader.fetch_records("iris", "v1").unwrap_err();
        assert!(matches!(err, ServeError::MalformedKey { .. }));
    }

    #[test]
    fn invalid_identifiers_are_rejected_before_scanning() {
        let (_store, reader) = setup();
        assert!(matches!(
            reader.fetch_records("ir:is", "v1"),
            Err(ServeError::InvalidInput { .. })
        ));
        assert!(matches!(
            reader.fetch_records("iris", "v*"),
            Err(ServeError::InvalidInput { .. })
        ));
        assert!(reader.resolve_current_version("").is_err());
    }

    /// Scans repeat every key and report one key that has no value.
    struct FlakyScanStore {
        inner: MemoryStore,
        ghost: String,
    }

    impl KvStore for FlakyScanStore {
        fn get(&self, key: &str) -> ServeResult<Option<String>> {
            self.inner.get(key)
        }
        fn set(&self, key: &str, value: &str) -> ServeResult<()> {
            self.inner.set(key, value)
        }
        fn delete(&self, keys: &[String]) -> ServeResult<u64> {
            self.inner.delete(keys)
        }
        fn scan(
            &self,
            cursor: u64,
            pattern: &str,
            count: usize,
        ) -> ServeResult<serving_storage::ScanPage> {
            let mut page = self.inner.scan(cursor, pattern, count)?;
            let repeated = page.keys.clone();
            page.keys.extend(repeated);
            if cursor == 0 {
                page.keys.push(self.ghost.clone());
            }
            Ok(page)
        }
        fn dbsize(&self) -> ServeResult<u64> {
            self.inner.dbsize()
        }
        fn flushdb(&self) -> ServeResult<()> {
            self.inner.flushdb()
        }
        fn apply_batch(&self, batch: serving_storage::WriteBatch) -> ServeResult<()> {
            self.inner.apply_batch(batch)
        }
    }

    #[test]
    fn duplicate_and_vanished_keys_are_tolerated() {
        let store = Arc::new(FlakyScanStore {
            inner: MemoryStore::new(),
            ghost: keys::record_key("iris", "v1", 99),
        });
        for i in 0..3 {
            put_record(&store.inner, "iris", "v1", i, i as i64);
        }
        let reader = DatasetReader::with_scan_count(store, 2);

        let records = reader.fetch_sorted("iris", "v1").unwrap();
        let indices: Vec<u64> = records.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn zero_scan_count_is_clamped() {
        let store = Arc::new(MemoryStore::new());
        let reader = DatasetReader::with_scan_count(store, 0);
        assert_eq!(reader.scan_count(), 1);
    }
}
