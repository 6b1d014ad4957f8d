//! Tool server configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use sw_03_search_sessions::{SessionConfig, SessionConfigError};
use thiserror::Error;

/// `top_k` applied to similarity searches that do not set one.
pub const DEFAULT_TOP_K: usize = 100;
/// How long index statistics are served from cache.
pub const DEFAULT_STATS_CACHE_TTL: Duration = Duration::from_secs(30);
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServerConfigError {
    #[error("server_name cannot be empty")]
    EmptyName,

    #[error("default_top_k must be at least 1")]
    ZeroTopK,

    #[error("outbound_capacity must be at least 1")]
    ZeroCapacity,

    #[error("Invalid session configuration: {0}")]
    Sessions(#[from] SessionConfigError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Reported in `initialize` and `health_check`
    pub server_name: String,
    pub server_version: String,
    /// Relative tool paths are resolved against this directory
    pub root: PathBuf,
    pub default_top_k: usize,
    #[serde(with = "humantime_serde")]
    pub stats_cache_ttl: Duration,
    /// Responses and notifications waiting for the writer
    pub outbound_capacity: usize,
    pub sessions: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_name: "seekwire".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            root: PathBuf::from("."),
            default_top_k: DEFAULT_TOP_K,
            stats_cache_ttl: DEFAULT_STATS_CACHE_TTL,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            sessions: SessionConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ServerConfigError> {
        if self.server_name.is_empty() {
            return Err(ServerConfigError::EmptyName);
        }
        if self.default_top_k == 0 {
            return Err(ServerConfigError::ZeroTopK);
        }
        if self.outbound_capacity == 0 {
            return Err(ServerConfigError::ZeroCapacity);
        }
        Ok(self.sessions.validate()?)
    }

    /// `path` as the filesystem sees it.
    #[must_use]
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_top_k, 100);
        assert_eq!(config.stats_cache_ttl, Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_values() {
        let config = ServerConfig {
            default_top_k: 0,
            ..ServerConfig::default()
        };
        assert_eq!(config.validate(), Err(ServerConfigError::ZeroTopK));

        let config = ServerConfig {
            server_name: String::new(),
            ..ServerConfig::default()
        };
        assert_eq!(config.validate(), Err(ServerConfigError::EmptyName));
    }

    #[test]
    fn test_resolve_relative_paths() {
        let config = ServerConfig {
            root: PathBuf::from("/work"),
            ..ServerConfig::default()
        };
        assert_eq!(config.resolve("src"), PathBuf::from("/work/src"));
        assert_eq!(config.resolve("/etc"), PathBuf::from("/etc"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ServerConfig =
            serde_json::from_str(r#"{"stats_cache_ttl": "5s", "sessions": {"max_sessions": 3}}"#)
                .unwrap();
        assert_eq!(config.stats_cache_ttl, Duration::from_secs(5));
        assert_eq!(config.sessions.max_sessions, 3);
        assert_eq!(config.server_name, "seekwire");
    }
}
