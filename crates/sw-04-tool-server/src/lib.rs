//! # Tool Server
//!
//! Server half of the seekwire protocol. Hosts the search tools behind
//! line-framed JSON-RPC and pages their results through the session layer.
//!
//! ## Architecture
//!
//! ```text
//! stdin ──► serve() ──► ToolServer ──► SessionStore ──► SearchBackend
//!                           │                               (port)
//! stdout ◄── writer task ◄──┴── responses + notifications/progress
//! ```
//!
//! - `domain/`: configuration, tool arguments, catalog, payloads, stats cache
//! - `ports/`: the [`SearchBackend`] engine port and [`ProgressSink`]
//! - `adapters/`: [`DirectoryBackend`], a filesystem engine
//! - `service`: [`ToolServer`], one request at a time
//! - `server`: [`serve`], the connection loop
//!
//! ## Usage
//!
//! ```ignore
//! let backend = Arc::new(DirectoryBackend::new("/repo"));
//! let server = Arc::new(ToolServer::new(ServerConfig::default(), backend)?);
//! serve(server, tokio::io::stdin(), tokio::io::stdout()).await?;
//! ```

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod server;
pub mod service;

pub use adapters::{default_exclude_patterns, DirectoryBackend};
pub use domain::{tool_catalog, ServerConfig, ServerConfigError, StatsCache, INSTRUCTIONS};
pub use error::ServerError;
pub use ports::{BackendError, ProgressSink, SearchBackend};
pub use server::serve;
pub use service::{ToolServer, RESTART_HINT};
