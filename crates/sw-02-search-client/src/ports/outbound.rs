//! Outbound (Driven) ports.

use async_trait::async_trait;
use serde_json::Value;
use sw_01_transport::TransportError;

/// A JSON-RPC peer that can be started on demand.
///
/// Implemented by [`sw_01_transport::Transport`]; tests substitute a fake.
#[async_trait]
pub trait RpcCaller: Send + Sync {
    /// Make sure the peer is running and has completed its handshake.
    async fn ensure(&self) -> Result<(), TransportError>;

    /// Send one request and wait for its result.
    async fn call(&self, method: &str, params: Value) -> Result<Value, TransportError>;
}
