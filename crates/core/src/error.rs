//! Error taxonomy for the serving store.
//!
//! Every fallible operation in the workspace returns [`ServeResult`]. Store
//! transport failures propagate unchanged: nothing here is retried locally.

use std::io;
use thiserror::Error;

/// Result alias used throughout the workspace.
pub type ServeResult<T> = Result<T, ServeError>;

/// Canonical error type for dataset reads, writes and inventory scans.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The dataset has no version pointer set.
    #[error("no current version set for dataset '{dataset}'")]
    NoCurrentVersion {
        /// Dataset whose pointer was looked up
        dataset: String,
    },

    /// The write guard found records already present for this version.
    #[error("data already exists for dataset '{dataset}' with version '{version}'")]
    VersionAlreadyExists {
        /// Dataset being written
        dataset: String,
        /// Version that already has records
        version: String,
    },

    /// A store key did not decode into the expected record shape.
    #[error("malformed key '{key}': {reason}")]
    MalformedKey {
        /// The offending key, verbatim
        key: String,
        /// What was wrong with it
        reason: String,
    },

    /// A dataset name or version label cannot be encoded into a key.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Validation failure detail
        message: String,
    },

    /// A record payload could not be encoded or decoded.
    #[error("serialization error: {message}")]
    Serialization {
        /// Encoder/decoder detail
        message: String,
    },

    /// The store could not be reached or the connection broke.
    #[error("store unavailable: {message}")]
    StoreUnavailable {
        /// What was being attempted
        message: String,
        /// Underlying transport error
        #[source]
        source: Option<io::Error>,
    },

    /// The store answered with an error reply or an unexpected reply shape.
    #[error("store protocol error: {message}")]
    Protocol {
        /// Reply detail
        message: String,
    },

    /// Configuration could not be loaded or failed validation.
    #[error("configuration error: {message}")]
    Config {
        /// Load or validation detail
        message: String,
    },
}

impl ServeError {
    /// Pointer-unset helper.
    pub fn no_current_version(dataset: impl Into<String>) -> Self {
        ServeError::NoCurrentVersion {
            dataset: dataset.into(),
        }
    }

    /// Write-guard helper.
    pub fn version_exists(dataset: impl Into<String>, version: impl Into<String>) -> Self {
        ServeError::VersionAlreadyExists {
            dataset: dataset.into(),
            version: version.into(),
        }
    }

    /// Key decode helper.
    pub fn malformed_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        ServeError::MalformedKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Validation helper.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        ServeError::InvalidInput {
            message: message.into(),
        }
    }

    /// Payload encode/decode helper.
    pub fn serialization(message: impl Into<String>) -> Self {
        ServeError::Serialization {
            message: message.into(),
        }
    }

    /// Transport failure helper.
    pub fn unavailable(message: impl Into<String>, source: io::Error) -> Self {
        ServeError::StoreUnavailable {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Error-reply helper.
    pub fn protocol(message: impl Into<String>) -> Self {
        ServeError::Protocol {
            message: message.into(),
        }
    }

    /// Configuration helper.
    pub fn config(message: impl Into<String>) -> Self {
        ServeError::Config {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ServeError {
    fn from(err: serde_json::Error) -> Self {
        ServeError::serialization(err.to_string())
    }
}
