//! Inbound (Driving) ports: the typed operations the client offers.

use crate::domain::{HealthStatus, SearchOptions};
use crate::error::ClientError;
use async_trait::async_trait;
use serde_json::Value;
use shared_types::{IndexStatus, ReindexOutcome, SearchResponse};

/// Typed search surface of a seekwire subprocess.
#[async_trait]
pub trait SearchApi: Send + Sync {
    /// Run a search, or fetch the page after `options.cursor`.
    ///
    /// ## Errors
    ///
    /// - `Validation`: page size or threshold out of range (nothing is sent)
    /// - `Tool`: the server rejected the search
    /// - `Transport`: the subprocess could not be reached or died
    async fn search(&self, options: &SearchOptions) -> Result<SearchResponse, ClientError>;

    async fn index_status(&self, path: &str) -> Result<IndexStatus, ClientError>;

    /// Rebuild the index for `path`. `progress_token`, when given, asks the
    /// server to report progress tagged with it.
    async fn reindex(
        &self,
        path: &str,
        force: bool,
        progress_token: Option<Value>,
    ) -> Result<ReindexOutcome, ClientError>;

    /// Default ignore-file text the server would write for a new project.
    async fn default_ignore_content(&self) -> Result<String, ClientError>;

    async fn health_check(&self) -> Result<HealthStatus, ClientError>;
}
