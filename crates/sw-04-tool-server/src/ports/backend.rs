//! Outbound (Driven) port to the search engine.

use async_trait::async_trait;
use shared_types::{IndexStatus, ProgressEvent, SearchResult};
use sw_03_search_sessions::SearchParams;
use thiserror::Error;
use tokio::sync::mpsc;

/// Engine failures. Reported to the caller as failed tool results.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("Path does not exist: {0}")]
    PathNotFound(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("{0}")]
    Failed(String),
}

/// The search engine behind the tool server.
///
/// `search` returns the complete ranked list, best first; the session layer
/// does the paging.
#[async_trait]
pub trait SearchBackend: Send + Sync + 'static {
    async fn search(&self, params: &SearchParams) -> Result<Vec<SearchResult>, BackendError>;

    /// Statistics for the index rooted at `path`. Never cached here.
    async fn index_stats(&self, path: &str) -> Result<IndexStatus, BackendError>;

    /// Rebuild the index rooted at `path`, reporting through `progress`.
    async fn reindex(
        &self,
        path: &str,
        force: bool,
        progress: &ProgressSink,
    ) -> Result<(), BackendError>;

    /// Patterns excluded from indexing unless the project overrides them.
    fn default_ignore_patterns(&self) -> Vec<String>;
}

/// Where a backend reports progress. Disabled when the caller asked for none.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressSink {
    /// A sink that drops every report.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// A sink and the receiver its reports arrive on.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    pub fn report(&self, progress: f64, total: Option<f64>, message: impl Into<String>) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(ProgressEvent {
                message: Some(message.into()),
                progress,
                total,
            });
        }
    }
}
