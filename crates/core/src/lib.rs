//! Core types for the serving store
//!
//! - [`ServeError`] / [`ServeResult`]: error taxonomy shared by every layer
//! - [`FieldValue`] / [`Row`]: dynamically shaped row payloads
//! - [`Record`]: one row of one dataset version

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod record;
pub mod value;

pub use error::{ServeError, ServeResult};
pub use record::{decode_payload, encode_payload, Record};
pub use value::{row, FieldValue, Row};
