//! # Shared Types Crate
//!
//! Wire-level data model for the seekwire control protocol.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every type that crosses the process boundary
//!   is defined here, so the client and the tool server cannot drift apart.
//! - **One Message Per Line**: [`framing`] serializes each [`Message`] to a
//!   single compact JSON line. Compact JSON escapes control characters inside
//!   strings, so a well-formed message never contains a raw line break.
//! - **Permissive Records**: search records carry plain values; the client is
//!   responsible for filling defaults when the server omits optional fields.

pub mod errors;
pub mod framing;
pub mod jsonrpc;
pub mod search;
pub mod tool;

pub use errors::ProtocolError;
pub use jsonrpc::{codes, Message, Notification, Request, RequestId, Response, RpcError};
pub use search::{
    IndexStatus, ProgressEvent, ReindexOutcome, SearchMode, SearchResponse, SearchResult, Span,
};
pub use tool::{
    methods, tools, Implementation, InitializeParams, InitializeResult, LogMessageParams,
    ProgressParams, ToolCallParams, ToolContent, ToolDescriptor, ToolResult,
};

/// JSON-RPC protocol version string carried by every message.
pub const JSONRPC_VERSION: &str = "2.0";

/// Handshake protocol version offered in `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";
