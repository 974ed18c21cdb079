//! Cursor scans as an explicit iterator.
//!
//! [`KeyScan`] threads the scan cursor through its own state instead of a
//! hidden loop. Callers pick the batch size and can inspect the cursor
//! between round-trips.
//!
//! The scan is not a snapshot. Keys created or deleted while it runs may or
//! may not be seen, and a key can appear in more than one page.

use serving_core::ServeResult;

use crate::traits::{KvStore, SCAN_START};

/// Default number of keys requested per round-trip.
pub const DEFAULT_SCAN_COUNT: usize = 1000;

/// Lazy, restartable cursor scan over keys matching a glob pattern.
///
/// Iterates pages: each item is the key list from one round-trip. Pages may
/// be empty while the cursor is still live.
pub struct KeyScan<'a> {
    store: &'a dyn KvStore,
    pattern: String,
    count: usize,
    cursor: u64,
    finished: bool,
}

impl<'a> KeyScan<'a> {
    /// Start a scan of `pattern` with the default batch size.
    pub fn new(store: &'a dyn KvStore, pattern: impl Into<String>) -> Self {
        Self::with_count(store, pattern, DEFAULT_SCAN_COUNT)
    }

    /// Start a scan of `pattern` requesting `count` keys per round-trip.
    pub fn with_count(store: &'a dyn KvStore, pattern: impl Into<String>, count: usize) -> Self {
        Self {
            store,
            pattern: pattern.into(),
            count: count.max(1),
            cursor: SCAN_START,
            finished: false,
        }
    }

    /// Pattern being scanned.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Keys requested per round-trip.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Cursor the next round-trip will send.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// True once the store has returned the exhaustion sentinel.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Perform one round-trip, or return `None` if the scan already ended.
    ///
    /// A failed round-trip ends the scan; the cursor is not reused.
    pub fn next_page(&mut self) -> ServeResult<Option<Vec<String>>> {
        if self.finished {
            return Ok(None);
        }
        let page = match self.store.scan(self.cursor, &self.pattern, self.count) {
            Ok(page) => page,
            Err(e) => {
                self.finished = true;
                return Err(e);
            }
        };
        tracing::debug!(
            target: "serving::store",
            pattern = %self.pattern,
            cursor = self.cursor,
            next = page.cursor,
            keys = page.keys.len(),
            "scan page"
        );
        self.cursor = page.cursor;
        self.finished = page.is_last();
        Ok(Some(page.keys))
    }

}

impl Iterator for KeyScan<'_> {
    type Item = ServeResult<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_page().transpose()
    }
}
