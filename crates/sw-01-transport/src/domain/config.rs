//! Transport configuration with validation.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// How to start and talk to the subprocess.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Executable to run
    pub program: PathBuf,
    /// Arguments that put it into protocol-server mode
    pub args: Vec<String>,
    /// Working directory (inherits the caller's when unset)
    pub working_dir: Option<PathBuf>,
    /// Extra environment variables
    pub env: BTreeMap<String, String>,
    /// Name sent as `clientInfo.name`
    pub client_name: String,
    /// Version sent as `clientInfo.version`
    pub client_version: String,
    /// Version offered in `initialize`
    pub protocol_version: String,
    /// Frames queued for the writer before senders wait
    pub outbound_capacity: usize,
    /// Upper bound on spawn + `initialize` round trip
    #[serde(with = "humantime_serde")]
    pub handshake_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ck"),
            args: vec!["--serve".to_string()],
            working_dir: None,
            env: BTreeMap::new(),
            client_name: "seekwire".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: shared_types::PROTOCOL_VERSION.to_string(),
            outbound_capacity: 256,
            handshake_timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Config for `program args...` with everything else defaulted.
    pub fn for_command(program: impl Into<PathBuf>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
            ..Self::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.program.as_os_str().is_empty() {
            return Err(ConfigError::EmptyProgram);
        }

        if self.protocol_version.is_empty() {
            return Err(ConfigError::EmptyProtocolVersion);
        }

        if self.outbound_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }

        if self.handshake_timeout.is_zero() {
            return Err(ConfigError::ZeroHandshakeTimeout);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TransportConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.protocol_version, "2024-11-05");
        assert_eq!(config.args, vec!["--serve"]);
    }

    #[test]
    fn test_validation_rejects_zero_capacity() {
        let config = TransportConfig {
            outbound_capacity: 0,
            ..TransportConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroCapacity));
    }

    #[test]
    fn test_validation_rejects_empty_program() {
        let config = TransportConfig::for_command("", &[]);
        assert_eq!(config.validate(), Err(ConfigError::EmptyProgram));
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: TransportConfig = serde_json::from_str(
            r#"{"program": "/opt/ck/bin/ck", "handshake_timeout": "5s"}"#,
        )
        .unwrap();
        assert_eq!(config.program, PathBuf::from("/opt/ck/bin/ck"));
        assert_eq!(config.handshake_timeout, Duration::from_secs(5));
        assert_eq!(config.outbound_capacity, 256);
    }
}
