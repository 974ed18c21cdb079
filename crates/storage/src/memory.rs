//! In-process store backend.
//!
//! # Design
//!
//! - Every key owns a slot in a slot table; the scan cursor is a slot
//!   offset tagged with the table's compaction epoch (high 32 bits).
//! - Overwriting a key keeps its slot. Deleting leaves a tombstone.
//! - Trailing tombstones are popped on delete. Once tombstones outnumber
//!   live keys (and the table is past [`COMPACT_MIN_SLOTS`]) the table is
//!   compacted and the epoch advances.
//! - A scan never skips a key that exists for the whole scan. A cursor from
//!   an older epoch restarts at slot 0, so keys may repeat after a
//!   compaction. A key deleted and re-created mid-scan gets a new slot and
//!   may also be returned twice. This is the same weak guarantee a Redis
//!   `SCAN` gives.
//!
//! # Thread Safety
//!
//! One `RwLock` guards the table. Single-key operations are atomic; a
//! [`WriteBatch`] is applied key by key and readers may observe it half done.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serving_core::ServeResult;

use crate::glob::glob_match;
use crate::traits::{KvStore, ScanPage, WriteBatch, SCAN_START};

/// Tables smaller than this are never compacted.
pub const COMPACT_MIN_SLOTS: usize = 64;

const OFFSET_BITS: u32 = 32;
const OFFSET_MASK: u64 = (1 << OFFSET_BITS) - 1;

#[derive(Debug, Default)]
struct Inner {
    /// key -> slot
    index: FxHashMap<String, usize>,
    /// slot -> live entry, `None` once deleted
    slots: Vec<Option<(String, String)>>,
    /// tombstones currently in `slots`
    dead: usize,
    /// bumped on every compaction; stale cursors restart
    epoch: u32,
}

impl Inner {
    fn set(&mut self, key: &str, value: &str) {
        match self.index.get(key) {
            Some(&slot) => {
                if let Some(entry) = self.slots[slot].as_mut() {
                    entry.1 = value.to_string();
                }
            }
            None => {
                self.index.insert(key.to_string(), self.slots.len());
                self.slots.push(Some((key.to_string(), value.to_string())));
            }
        }
    }

    fn remove(&mut self, key: &str) -> bool {
        match self.index.remove(key) {
            Some(slot) => {
                self.slots[slot] = None;
                self.dead += 1;
                true
            }
            None => false,
        }
    }

    /// Drop trailing tombstones, then compact if tombstones dominate.
    fn reclaim(&mut self) {
        while matches!(self.slots.last(), Some(None)) {
            self.slots.pop();
            self.dead -= 1;
        }
        if self.slots.len() < COMPACT_MIN_SLOTS || self.dead <= self.index.len() {
            return;
        }
        self.slots.retain(Option::is_some);
        for (slot, entry) in self.slots.iter().enumerate() {
            if let Some((key, _)) = entry {
                if let Some(s) = self.index.get_mut(key) {
                    *s = slot;
                }
            }
        }
        self.dead = 0;
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Slot offset a cursor resumes from in the current epoch.
    fn resume_offset(&self, cursor: u64) -> usize {
        if cursor == SCAN_START || (cursor >> OFFSET_BITS) as u32 != self.epoch {
            return 0;
        }
        ((cursor & OFFSET_MASK) as usize).min(self.slots.len())
    }

    fn cursor_at(&self, offset: usize) -> u64 {
        ((self.epoch as u64) << OFFSET_BITS) | (offset as u64 & OFFSET_MASK)
    }
}

/// In-memory [`KvStore`] implementation.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots, live and tombstoned. Bounds the cursor range.
    pub fn slot_count(&self) -> usize {
        self.inner.read().slots.len()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> ServeResult<Option<String>> {
        let inner = self.inner.read();
        Ok(inner
            .index
            .get(key)
            .and_then(|&slot| inner.slots[slot].as_ref())
            .map(|(_, v)| v.clone()))
    }

    fn set(&self, key: &str, value: &str) -> ServeResult<()> {
        self.inner.write().set(key, value);
        Ok(())
    }

    fn delete(&self, keys: &[String]) -> ServeResult<u64> {
        let mut inner = self.inner.write();
        let removed = keys.iter().filter(|k| inner.remove(k)).count();
        if removed > 0 {
            inner.reclaim();
        }
        Ok(removed as u64)
    }

    fn scan(&self, cursor: u64, pattern: &str, count: usize) -> ServeResult<ScanPage> {
        let inner = self.inner.read();
        let start = inner.resume_offset(cursor);
        let end = start.saturating_add(count.max(1)).min(inner.slots.len());

        let keys = inner.slots[start..end]
            .iter()
            .flatten()
            .filter(|(k, _)| glob_match(pattern, k))
            .map(|(k, _)| k.clone())
            .collect();

        let next = if end >= inner.slots.len() {
            SCAN_START
        } else {
            inner.cursor_at(end)
        };
        Ok(ScanPage { cursor: next, keys })
    }

    fn dbsize(&self) -> ServeResult<u64> {
        Ok(self.inner.read().index.len() as u64)
    }

    fn flushdb(&self) -> ServeResult<()> {
        *self.inner.write() = Inner::default();
        Ok(())
    }

    fn apply_batch(&self, batch: WriteBatch) -> ServeResult<()> {
        for (key, value) in batch.into_sets() {
            self.inner.write().set(&key, &value);
        }
        Ok(())
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("MemoryStore")
            .field("keys", &inner.index.len())
            .field("slots", &inner.slots.len())
            .finish()
    }
}
