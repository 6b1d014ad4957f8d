//! Error types for the transport.

use thiserror::Error;

/// Errors surfaced by [`crate::Transport`].
///
/// Everything except [`TransportError::Rpc`] is fatal to every call in flight
/// on the affected process; the next `ensure()` starts a fresh one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Failed to spawn subprocess: {0}")]
    Spawn(String),

    #[error("Subprocess exited ({reason})")]
    Exited { generation: u64, reason: String },

    #[error("Write to subprocess failed: {0}")]
    Write(String),

    #[error("Transport closed: {0}")]
    Closed(String),

    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// The subprocess answered the call with an error object.
    #[error("{message}")]
    Rpc { code: i64, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl TransportError {
    /// Whether the error came from the remote side rather than the channel.
    #[must_use]
    pub fn is_call_scoped(&self) -> bool {
        matches!(self, Self::Rpc { .. })
    }

    pub(crate) fn outcome_label(&self) -> &'static str {
        if self.is_call_scoped() {
            "rpc_error"
        } else {
            "transport_error"
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("program cannot be empty")]
    EmptyProgram,

    #[error("protocol_version cannot be empty")]
    EmptyProtocolVersion,

    #[error("outbound_capacity must be at least 1")]
    ZeroCapacity,

    #[error("handshake_timeout cannot be 0")]
    ZeroHandshakeTimeout,
}
