//! Capability client service.

use crate::domain::transform::{self, HealthStatus};
use crate::domain::SearchOptions;
use crate::error::ClientError;
use crate::ports::{RpcCaller, SearchApi};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use shared_types::{methods, tools, IndexStatus, ReindexOutcome, SearchResponse, ToolCallParams};
use tracing::{debug, instrument, warn};

/// Typed operations over a JSON-RPC peer.
///
/// Every operation starts the peer if needed, so the first call on a fresh
/// client pays for the spawn and handshake.
pub struct SearchClient<C> {
    caller: C,
}

impl<C: RpcCaller> SearchClient<C> {
    pub fn new(caller: C) -> Self {
        Self { caller }
    }

    /// The underlying peer.
    pub fn caller(&self) -> &C {
        &self.caller
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
        meta: Option<Value>,
    ) -> Result<Value, ClientError> {
        self.caller.ensure().await?;

        let mut params = ToolCallParams::new(name, arguments);
        params.meta = meta;
        let params =
            serde_json::to_value(&params).map_err(|e| ClientError::Payload(e.to_string()))?;

        debug!(tool = name, "Calling tool");
        Ok(self.caller.call(methods::TOOLS_CALL, params).await?)
    }

    async fn call_payload(
        &self,
        name: &str,
        arguments: Map<String, Value>,
        meta: Option<Value>,
    ) -> Result<Value, ClientError> {
        let raw = self.call_tool(name, arguments, meta).await?;
        log_tool_error(name, transform::unwrap_envelope(raw))
    }
}

fn log_tool_error<T>(tool: &str, result: Result<T, ClientError>) -> Result<T, ClientError> {
    if let Err(ClientError::Tool { message }) = &result {
        warn!(tool, %message, "Tool reported an error");
    }
    result
}

fn path_argument(path: &str) -> Map<String, Value> {
    let mut args = Map::new();
    args.insert("path".into(), path.into());
    args
}

#[async_trait]
impl<C: RpcCaller> SearchApi for SearchClient<C> {
    #[instrument(skip_all, fields(mode = %options.mode))]
    async fn search(&self, options: &SearchOptions) -> Result<SearchResponse, ClientError> {
        options.validate()?;
        let payload = self
            .call_payload(options.mode.tool_name(), options.to_arguments(), None)
            .await?;
        Ok(transform::search_response(&payload))
    }

    async fn index_status(&self, path: &str) -> Result<IndexStatus, ClientError> {
        let payload = self
            .call_payload(tools::INDEX_STATUS, path_argument(path), None)
            .await?;
        transform::index_status(&payload)
    }

    async fn reindex(
        &self,
        path: &str,
        force: bool,
        progress_token: Option<Value>,
    ) -> Result<ReindexOutcome, ClientError> {
        let mut args = path_argument(path);
        args.insert("force".into(), force.into());
        let meta = progress_token.map(|token| json!({ "progressToken": token }));

        let payload = self.call_payload(tools::REINDEX, args, meta).await?;
        transform::reindex_outcome(&payload)
    }

    async fn default_ignore_content(&self) -> Result<String, ClientError> {
        let raw = self
            .call_tool(tools::DEFAULT_IGNORE_CONTENT, Map::new(), None)
            .await?;
        log_tool_error(tools::DEFAULT_IGNORE_CONTENT, transform::ignore_content(raw))
    }

    async fn health_check(&self) -> Result<HealthStatus, ClientError> {
        let payload = self
            .call_payload(tools::HEALTH_CHECK, Map::new(), None)
            .await?;
        transform::health_status(&payload)
    }
}
