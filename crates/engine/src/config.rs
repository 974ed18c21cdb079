//! Serving configuration.
//!
//! Loaded from a TOML file, every field optional:
//!
//! ```toml
//! [store]
//! backend = "redis"   # or "memory"
//! host = "localhost"
//! port = 6379
//! db = 0
//!
//! [scan]
//! count = 1000
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use serving_core::{ServeError, ServeResult};
use serving_storage::DEFAULT_SCAN_COUNT;

/// Which store implementation to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Redis server over RESP2 (default).
    #[default]
    Redis,
    /// In-process store; contents are lost when the process exits.
    Memory,
}

impl std::str::FromStr for Backend {
    type Err = ServeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(Backend::Redis),
            "memory" => Ok(Backend::Memory),
            other => Err(ServeError::config(format!(
                "unknown backend '{}', expected 'redis' or 'memory'",
                other
            ))),
        }
    }
}

/// Store connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend to open
    pub backend: Backend,
    /// Server host (redis backend)
    pub host: String,
    /// Server port (redis backend)
    pub port: u16,
    /// Logical database index, selected on connect when non-zero
    pub db: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Redis,
            host: "localhost".to_string(),
            port: 6379,
            db: 0,
        }
    }
}

/// Scan settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Keys requested per scan round-trip
    pub count: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_SCAN_COUNT,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Store connection
    pub store: StoreConfig,
    /// Scan batching
    pub scan: ScanConfig,
}

impl ServeConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> ServeResult<Self> {
        let cfg: ServeConfig =
            toml::from_str(s).map_err(|e| ServeError::config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> ServeResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServeError::config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> ServeResult<String> {
        toml::to_string(self).map_err(|e| ServeError::config(e.to_string()))
    }

    /// Reject settings no store can work with.
    pub fn validate(&self) -> ServeResult<()> {
        if self.scan.count == 0 {
            return Err(ServeError::config("scan.count must be greater than 0"));
        }
        if self.store.backend == Backend::Redis && self.store.host.trim().is_empty() {
            return Err(ServeError::config("store.host must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_a_local_redis() {
        let cfg = ServeConfig::default();
        assert_eq!(cfg.store.backend, Backend::Redis);
        assert_eq!(cfg.store.host, "localhost");
        assert_eq!(cfg.store.port, 6379);
        assert_eq!(cfg.store.db, 0);
        assert_eq!(cfg.scan.count, 1000);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn empty_document_is_all_defaults() {
        assert_eq!(ServeConfig::from_toml_str("").unwrap(), ServeConfig::default());
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let cfg = ServeConfig::from_toml_str("[store]\nport = 6380\n\n[scan]\ncount = 50\n").unwrap();
        assert_eq!(cfg.store.port, 6380);
        assert_eq!(cfg.store.host, "localhost");
        assert_eq!(cfg.scan.count, 50);
    }

    #[test]
    fn backend_names() {
        let cfg = ServeConfig::from_toml_str("[store]\nbackend = \"memory\"\n").unwrap();
        assert_eq!(cfg.store.backend, Backend::Memory);
        assert_eq!("REDIS".parse::<Backend>().unwrap(), Backend::Redis);
        assert!("sqlite".parse::<Backend>().is_err());
        assert!(ServeConfig::from_toml_str("[store]\nbackend = \"sqlite\"\n").is_err());
    }

    #[test]
    fn zero_scan_count_is_rejected() {
        let err = ServeConfig::from_toml_str("[scan]\ncount = 0\n").unwrap_err();
        assert!(matches!(err, ServeError::Config { .. }));
    }

    #[test]
    fn empty_host_is_rejected_for_redis_only() {
        assert!(ServeConfig::from_toml_str("[store]\nhost = \"\"\n").is_err());
        assert!(
            ServeConfig::from_toml_str("[store]\nhost = \"\"\nbackend = \"memory\"\n").is_ok()
        );
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[store]\nhost = \"cache.internal\"\ndb = 3").unwrap();
        let cfg = ServeConfig::from_file(file.path()).unwrap();
        assert_eq!(cfg.store.host, "cache.internal");
        assert_eq!(cfg.store.db, 3);
    }

    #[test]
    fn missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ServeConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ServeError::Config { .. }));
    }

    #[test]
    fn toml_roundtrip() {
        let mut cfg = ServeConfig::default();
        cfg.store.backend = Backend::Memory;
        cfg.scan.count = 10;
        let text = cfg.to_toml_string().unwrap();
        assert_eq!(ServeConfig::from_toml_str(&text).unwrap(), cfg);
    }
}
