//! [`RpcCaller`] over the subprocess transport.

use crate::ports::RpcCaller;
use async_trait::async_trait;
use serde_json::Value;
use sw_01_transport::{Transport, TransportError};

#[async_trait]
impl RpcCaller for Transport {
    async fn ensure(&self) -> Result<(), TransportError> {
        Transport::ensure(self).await
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        Transport::call(self, method, params).await
    }
}
