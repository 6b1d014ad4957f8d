//! Adapters layer.
//!
//! - `channel`: reader and writer tasks for one spawned process
//! - `process`: real subprocesses via `tokio::process`
//! - `memory`: scripted in-memory peers over `tokio::io::duplex`

pub mod channel;
pub mod memory;
pub mod process;

pub use memory::{MemoryLauncher, ScriptedPeer};
pub use process::ProcessLauncher;
