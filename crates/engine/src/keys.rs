//! Key construction and parsing for dataset storage.
//!
//! Two key families live in the store:
//! - records: `serving_data:{dataset}:{version}:{index}`, value is the row as JSON
//! - version pointers: `current_version:{dataset}`, value is the version label
//!
//! Decoding splits on `:` positionally, so dataset names and versions must
//! never contain it. They must not contain glob metacharacters either, or a
//! scan pattern built from them would match other datasets.

use serving_core::{ServeError, ServeResult};
use serving_storage::contains_glob_meta;

/// Separator used between key segments.
pub const SEP: char = ':';

/// Leading segment of every record key.
pub const RECORD_PREFIX: &str = "serving_data";

/// Leading segment of every version-pointer key.
pub const POINTER_PREFIX: &str = "current_version";

// =============================================================================
// Validation
// =============================================================================

fn validate_segment(kind: &str, value: &str) -> ServeResult<()> {
    if value.is_empty() {
        return Err(ServeError::invalid_input(format!(
            "{} must not be empty",
            kind
        )));
    }
    if value.contains(SEP) {
        return Err(ServeError::invalid_input(format!(
            "{} must not contain '{}': {}",
            kind, SEP, value
        )));
    }
    if contains_glob_meta(value) {
        return Err(ServeError::invalid_input(format!(
            "{} must not contain glob metacharacters: {}",
            kind, value
        )));
    }
    Ok(())
}

/// Validate a dataset name.
pub fn validate_dataset_name(name: &str) -> ServeResult<()> {
    validate_segment("Dataset name", name)
}

/// Validate a version label.
pub fn validate_version(version: &str) -> ServeResult<()> {
    validate_segment("Version", version)
}

// =============================================================================
// Key Construction
// =============================================================================

/// Key for one record: `serving_data:{dataset}:{version}:{index}`
pub fn record_key(dataset: &str, version: &str, index: u64) -> String {
    format!("{RECORD_PREFIX}{SEP}{}{SEP}{}{SEP}{}", dataset, version, index)
}

/// Key for a dataset's version pointer: `current_version:{dataset}`
pub fn version_pointer_key(dataset: &str) -> String {
    format!("{POINTER_PREFIX}{SEP}{}", dataset)
}

/// Scan pattern for a dataset's records: one version, or every version when
/// `version` is `None`.
pub fn record_scan_pattern(dataset: &str, version: Option<&str>) -> String {
    format!(
        "{RECORD_PREFIX}{SEP}{}{SEP}{}{SEP}*",
        dataset,
        version.unwrap_or("*")
    )
}

/// Scan pattern for every record of every dataset: `serving_data:*`
pub fn all_records_pattern() -> String {
    format!("{RECORD_PREFIX}{SEP}*")
}

// =============================================================================
// Key Parsing
// =============================================================================

/// Parse a record key back into `(dataset, version, index)`.
pub fn decode_record_key(key: &str) -> ServeResult<(String, String, u64)> {
    let parts: Vec<&str> = key.split(SEP).collect();
    if parts.len() != 4 {
        return Err(ServeError::malformed_key(
            key,
            format!("expected 4 '{}'-separated segments, found {}", SEP, parts.len()),
        ));
    }
    if parts[0] != RECORD_PREFIX {
        return Err(ServeError::malformed_key(
            key,
            format!("expected prefix '{}'", RECORD_PREFIX),
        ));
    }
    if parts[1].is_empty() || parts[2].is_empty() {
        return Err(ServeError::malformed_key(key, "empty dataset or version"));
    }
    let index = parts[3]
        .parse::<u64>()
        .map_err(|_| ServeError::malformed_key(key, "index is not a non-negative integer"))?;
    Ok((parts[1].to_string(), parts[2].to_string(), index))
}
