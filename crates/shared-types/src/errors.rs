//! # Error Types
//!
//! Protocol-level errors. These are never fatal to a channel: the reader that
//! hits one logs it and moves on to the next line.

use thiserror::Error;

/// A line or envelope that could not be turned into a [`crate::Message`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The line is not valid JSON.
    #[error("Unparsable line: {0}")]
    Unparsable(String),

    /// Valid JSON that matches none of request, response or notification.
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Serialization produced a raw line break, which the framing cannot carry.
    #[error("Serialized message contains a raw line break")]
    EmbeddedLineBreak,

    /// Serialization failed outright.
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl ProtocolError {
    /// Label for the protocol error metric.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unparsable(_) => "unparsable",
            Self::MalformedEnvelope(_) => "malformed_envelope",
            Self::EmbeddedLineBreak | Self::Serialization(_) => "encode",
        }
    }
}
