//! Storage layer for the serving store
//!
//! This crate provides the key-value store primitive the dataset engine is
//! built on:
//! - [`KvStore`]: get/set/delete, cursor scans, dbsize, flushdb, batched writes
//! - [`KeyScan`]: cursor scans as an explicit page iterator
//! - [`MemoryStore`]: in-process backend
//! - [`RespStore`]: Redis backend over RESP2
//! - [`glob_match`]: Redis-style glob matching for scan patterns

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod glob;
pub mod memory;
pub mod resp;
pub mod scan;
pub mod traits;

pub use glob::{contains_glob_meta, glob_match};
pub use memory::MemoryStore;
pub use resp::RespStore;
pub use scan::{KeyScan, DEFAULT_SCAN_COUNT};
pub use traits::{KvStore, ScanPage, WriteBatch, SCAN_START};
