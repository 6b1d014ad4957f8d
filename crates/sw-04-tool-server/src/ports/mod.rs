//! Ports for the tool server.

pub mod backend;

pub use backend::{BackendError, ProgressSink, SearchBackend};
