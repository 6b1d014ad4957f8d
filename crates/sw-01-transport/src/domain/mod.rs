//! Domain layer: configuration, lifecycle state and the correlator.

pub mod config;
pub mod pending;
pub mod state;

pub use config::TransportConfig;
pub use pending::{rpc_error_message, CallOutcome, PendingCalls, PendingStats, UNKNOWN_ERROR};
pub use state::{GenerationHandle, TransportState};
