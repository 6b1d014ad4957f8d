//! # SW-01 Transport
//!
//! Subprocess lifecycle, line-framed channel and request correlation for a
//! tool server that speaks JSON-RPC over its stdin/stdout.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): no I/O
//!   - `TransportConfig`: how to start the subprocess, with validation
//!   - `TransportState` / `GenerationHandle`: lifecycle and per-spawn liveness
//!   - `PendingCalls`: id allocation and the id → waiter table
//!
//! - **Ports Layer** (`ports/`)
//!   - `Launcher`: Driven port that starts a process
//!
//! - **Adapters Layer** (`adapters/`)
//!   - `ProcessLauncher`: `tokio::process` with piped stdio
//!   - `MemoryLauncher`: scripted in-memory peer over `tokio::io::duplex`
//!   - `channel`: writer, reader and stderr tasks for one process
//!
//! - **Service Layer** (`service.rs`)
//!   - `Transport`: `ensure` / `call` / `notify` / `shutdown`
//!
//! ## Lifecycle
//!
//! ```text
//! Unstarted ──ensure()──→ Starting ──initialize ok──→ Ready
//!                            ▲                          │ exit, write failure, shutdown
//!                            └────────ensure()───── Down ◄┘
//! ```
//!
//! Every spawn gets a new generation number. Calls are tagged with the
//! generation they were written to, and a dying generation rejects exactly
//! its own calls with one error carrying the exit code or signal.
//!
//! ## Framing
//!
//! One compact JSON document per line. `serde_json` escapes control
//! characters inside strings, so an encoded message never contains a raw
//! line break. A peer that needs to carry arbitrary bytes would have to move
//! to length-prefixed framing.
//!
//! ## Usage Example
//!
//! ```ignore
//! use sw_01_transport::{Transport, TransportConfig};
//! use serde_json::json;
//!
//! let transport = Transport::with_process(TransportConfig::default())?;
//! let tools = transport.call("tools/list", json!({})).await?;
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::{MemoryLauncher, ProcessLauncher, ScriptedPeer};
pub use domain::{
    rpc_error_message, GenerationHandle, PendingCalls, PendingStats, TransportConfig,
    TransportState, UNKNOWN_ERROR,
};
pub use error::{ConfigError, TransportError};
pub use ports::{ExitReason, KillSwitch, LaunchedProcess, Launcher};
pub use service::Transport;
