//! Adapters binding the client ports to concrete peers.

pub mod transport;
