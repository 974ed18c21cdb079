//! Dataset records
//!
//! A [`Record`] is one row of one dataset version. Its identity lives in the
//! store key; only the field mapping is stored as the value payload.

use serde::{Deserialize, Serialize};

use crate::error::{ServeError, ServeResult};
use crate::value::{FieldValue, Row};

/// One row of a dataset version, as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Dataset identifier
    pub dataset: String,
    /// Opaque version label
    pub version: String,
    /// Position within the version, dense in `0..N`
    pub index: u64,
    /// Field name to value
    pub fields: Row,
}

impl Record {
    /// Assemble a record from its decoded key parts and payload.
    pub fn new(
        dataset: impl Into<String>,
        version: impl Into<String>,
        index: u64,
        fields: Row,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            version: version.into(),
            index,
            fields,
        }
    }
}

/// Encode a row as the JSON object stored under a record key.
///
/// Fails on NaN or infinite floats, which JSON cannot carry and would
/// otherwise be written as `null`.
pub fn encode_payload(row: &Row) -> ServeResult<String> {
    for (name, value) in row {
        if let FieldValue::Float(x) = value {
            if !x.is_finite() {
                return Err(ServeError::serialization(format!(
                    "field '{}' holds non-finite float {}",
                    name, x
                )));
            }
        }
    }
    Ok(serde_json::to_string(row)?)
}

/// Decode a stored JSON object back into a row.
pub fn decode_payload(payload: &str) -> ServeResult<Row> {
    serde_json::from_str(payload)
        .map_err(|e| ServeError::serialization(format!("record payload: {}", e)))
}
