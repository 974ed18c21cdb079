//! Row value model
//!
//! Rows are dynamically shaped: a mapping from field name to a scalar.
//! `FieldValue` is the tagged scalar union; on the wire it is plain JSON
//! (`null`, `true`, `3`, `0.5`, `"setosa"`) so payloads stay readable by any
//! other consumer of the store.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One row of a dataset version: field name to scalar value.
pub type Row = BTreeMap<String, FieldValue>;

/// Scalar stored in a row field.
///
/// Integers that fit in `i64` decode as [`FieldValue::Int`], larger
/// non-negative ones as [`FieldValue::UInt`]; everything else numeric decodes
/// as [`FieldValue::Float`]. Non-finite floats have no JSON form and are
/// refused by [`encode_payload`](crate::encode_payload).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// JSON `null`
    Null,
    /// JSON boolean
    Bool(bool),
    /// Integral number
    Int(i64),
    /// Integral number above `i64::MAX`
    UInt(u64),
    /// Floating point number
    Float(f64),
    /// UTF-8 string
    String(String),
}

impl FieldValue {
    /// Returns true for [`FieldValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(n) => write!(f, "{}", n),
            FieldValue::UInt(n) => write!(f, "{}", n),
            FieldValue::Float(x) => write!(f, "{}", x),
            FieldValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Int(n)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        FieldValue::Int(n as i64)
    }
}

impl From<u64> for FieldValue {
    fn from(n: u64) -> Self {
        i64::try_from(n).map_or(FieldValue::UInt(n), FieldValue::Int)
    }
}

impl From<f64> for FieldValue {
    fn from(x: f64) -> Self {
        FieldValue::Float(x)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// Build a [`Row`] from `(name, value)` pairs.
///
/// ```
/// use serving_core::{row, FieldValue};
///
/// let r = row([("a", FieldValue::from(1)), ("label", "setosa".into())]);
/// assert_eq!(r["a"], FieldValue::Int(1));
/// ```
pub fn row<K, I>(fields: I) -> Row
where
    K: Into<String>,
    I: IntoIterator<Item = (K, FieldValue)>,
{
    fields.into_iter().map(|(k, v)| (k.into(), v)).collect()
}
