//! API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stockbook_db::DbConfig;

/// Accepted range for the per-call storage deadline, in milliseconds.
pub const STORAGE_TIMEOUT_RANGE_MS: std::ops::RangeInclusive<u64> = 3000..=6000;

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Interface to bind the HTTP listener to
    pub bind_addr: String,

    /// HTTP port
    pub port: u16,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub db_max_connections: u32,

    /// Deadline applied to every storage call
    pub storage_timeout_ms: u64,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup (environment, test map).
    pub fn from_source<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = ApiConfig {
            bind_addr: get("STOCKBOOK_BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()),

            port: get("STOCKBOOK_PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("STOCKBOOK_PORT".to_string()))?,

            database_path: get("STOCKBOOK_DATABASE_PATH")
                .unwrap_or_else(|| "./stockbook.db".to_string())
                .into(),

            db_max_connections: get("STOCKBOOK_DB_MAX_CONNECTIONS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("STOCKBOOK_DB_MAX_CONNECTIONS".to_string()))?,

            storage_timeout_ms: get("STOCKBOOK_STORAGE_TIMEOUT_MS")
                .unwrap_or_else(|| "5000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("STOCKBOOK_STORAGE_TIMEOUT_MS".to_string()))?,
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "STOCKBOOK_DB_MAX_CONNECTIONS".to_string(),
            ));
        }

        if !STORAGE_TIMEOUT_RANGE_MS.contains(&config.storage_timeout_ms) {
            return Err(ConfigError::OutOfRange {
                key: "STOCKBOOK_STORAGE_TIMEOUT_MS".to_string(),
                min: *STORAGE_TIMEOUT_RANGE_MS.start(),
                max: *STORAGE_TIMEOUT_RANGE_MS.end(),
            });
        }

        Ok(config)
    }

    /// `host:port` for the TCP listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_millis(self.storage_timeout_ms)
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone())
            .max_connections(self.db_max_connections)
            .storage_timeout(self.storage_timeout())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("{key} must be between {min} and {max}")]
    OutOfRange { key: String, min: u64, max: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_source(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
        assert_eq!(config.database_path, PathBuf::from("./stockbook.db"));
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.storage_timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("STOCKBOOK_BIND_ADDR", "127.0.0.1"),
            ("STOCKBOOK_PORT", "9000"),
            ("STOCKBOOK_STORAGE_TIMEOUT_MS", "3000"),
        ])
        .unwrap();
        assert_eq!(config.listen_addr(), "127.0.0.1:9000");
        assert_eq!(config.db_config().storage_timeout, Duration::from_millis(3000));
    }

    #[test]
    fn test_invalid_port() {
        let err = load(&[("STOCKBOOK_PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(key) if key == "STOCKBOOK_PORT"));
    }

    #[test]
    fn test_timeout_out_of_range() {
        let err = load(&[("STOCKBOOK_STORAGE_TIMEOUT_MS", "10000")]).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { .. }));
        assert!(load(&[("STOCKBOOK_STORAGE_TIMEOUT_MS", "2999")]).is_err());
        assert!(load(&[("STOCKBOOK_STORAGE_TIMEOUT_MS", "6000")]).is_ok());
    }

    #[test]
    fn test_zero_connections_rejected() {
        assert!(load(&[("STOCKBOOK_DB_MAX_CONNECTIONS", "0")]).is_err());
    }
}
