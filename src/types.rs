//! Public types for the serving store.
//!
//! Re-exports from the internal crates with one flat namespace.

// ============================================================================
// Values and records
// ============================================================================

pub use serving_core::{decode_payload, encode_payload, row, FieldValue, Record, Row};

// ============================================================================
// Errors
// ============================================================================

pub use serving_core::{ServeError, ServeResult};

// ============================================================================
// Storage backends
// ============================================================================

pub use serving_storage::{
    KeyScan, KvStore, MemoryStore, RespStore, ScanPage, WriteBatch, DEFAULT_SCAN_COUNT,
};

// ============================================================================
// Dataset operations and configuration
// ============================================================================

pub use serving_engine::keys;
pub use serving_engine::{
    Backend, DatasetReader, DatasetWriter, InventoryEntry, InventoryReporter, ScanConfig,
    ServeConfig, StoreConfig,
};
