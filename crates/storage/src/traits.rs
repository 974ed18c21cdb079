//! The store primitive
//!
//! Everything above the storage layer talks to the store through [`KvStore`].
//! The contract mirrors a Redis-style keyspace: single-key `get`/`set` are
//! atomic, multi-key batches are not, and `scan` is cursor based and weakly
//! consistent.

use serving_core::ServeResult;

/// Cursor value that starts a scan and, when returned, marks it exhausted.
pub const SCAN_START: u64 = 0;

/// One round-trip of a cursor scan.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanPage {
    /// Cursor to pass to the next call; [`SCAN_START`] when exhausted
    pub cursor: u64,
    /// Keys matched in this round-trip (may repeat keys from earlier pages)
    pub keys: Vec<String>,
}

impl ScanPage {
    /// True when this page ends the scan.
    pub fn is_last(&self) -> bool {
        self.cursor == SCAN_START
    }
}

/// A batch of `SET` operations delivered to the store in one pipeline.
///
/// Delivery is all-or-nothing at the network layer only. Concurrent readers
/// can observe a partially applied batch.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    sets: Vec<(String, String)>,
}

impl WriteBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty batch sized for `n` operations.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            sets: Vec::with_capacity(n),
        }
    }

    /// Stage a `SET key value`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.sets.push((key.into(), value.into()));
    }

    /// Number of staged operations.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// True when nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Staged operations in staging order.
    pub fn sets(&self) -> &[(String, String)] {
        &self.sets
    }

    /// Consume the batch.
    pub fn into_sets(self) -> Vec<(String, String)> {
        self.sets
    }
}

/// Key-value store primitive.
///
/// Implementations must be safe to share across threads; callers hold them
/// as `Arc<dyn KvStore>`.
pub trait KvStore: Send + Sync {
    /// Value stored under `key`, if any.
    fn get(&self, key: &str) -> ServeResult<Option<String>>;

    /// Store `value` under `key`, overwriting any previous value.
    fn set(&self, key: &str, value: &str) -> ServeResult<()>;

    /// Delete `keys`, returning how many existed.
    fn delete(&self, keys: &[String]) -> ServeResult<u64>;

    /// One scan round-trip: examine roughly `count` keys from `cursor` and
    /// return those matching the glob `pattern`.
    fn scan(&self, cursor: u64, pattern: &str, count: usize) -> ServeResult<ScanPage>;

    /// Total number of keys in the store.
    fn dbsize(&self) -> ServeResult<u64>;

    /// Remove every key.
    fn flushdb(&self) -> ServeResult<()>;

    /// Apply every staged `SET` in one non-transactional pipeline.
    fn apply_batch(&self, batch: WriteBatch) -> ServeResult<()>;
}
