//! Error types for the capability client.

use shared_types::codes;
use sw_01_transport::TransportError;
use sw_03_search_sessions::ValidationError;
use thiserror::Error;

/// Errors surfaced by [`crate::SearchClient`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClientError {
    /// The tool ran and reported failure (`isError: true`).
    #[error("Tool error: {message}")]
    Tool { message: String },

    /// The server answered with a JSON-RPC error object. Scoped to this
    /// call; the process is still up.
    #[error("Request rejected ({code}): {message}")]
    Rpc { code: i64, message: String },

    /// Spawn, exit, write or handshake failure.
    #[error(transparent)]
    Transport(TransportError),

    /// Rejected locally before anything was sent.
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// The reply could not be turned into the expected record.
    #[error("Unexpected tool payload: {0}")]
    Payload(String),
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Rpc { code, message } => Self::Rpc { code, message },
            other => Self::Transport(other),
        }
    }
}

impl ClientError {
    /// Whether the failure came from the process or its pipes rather than
    /// from the server's answer.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// The server refused the arguments: a stale or foreign cursor, or a
    /// bound the server enforces. Retrying needs different arguments,
    /// usually the same search without a cursor.
    #[must_use]
    pub fn is_invalid_params(&self) -> bool {
        matches!(self, Self::Rpc { code, .. } if *code == codes::INVALID_PARAMS)
    }
}
