//! Error types for the tool server.

use crate::domain::ServerConfigError;
use shared_types::ProtocolError;
use sw_03_search_sessions::SessionConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ServerConfigError),

    #[error("Invalid session configuration: {0}")]
    Sessions(#[from] SessionConfigError),

    #[error("Failed to encode outbound message: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
