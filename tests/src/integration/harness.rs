//! Shared fixtures: a client stack wired to an in-process tool server.

use async_trait::async_trait;
use shared_bus::{InMemoryEventBus, NotificationRouter};
use shared_types::{IndexStatus, SearchResult, Span};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use sw_01_transport::{ExitReason, MemoryLauncher, ScriptedPeer, Transport, TransportConfig};
use sw_02_search_client::SearchClient;
use sw_03_search_sessions::SearchParams;
use sw_04_tool_server::{serve, BackendError, ProgressSink, SearchBackend, ServerConfig, ToolServer};

/// Directory every relative tool path resolves against.
#[must_use]
pub fn crate_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

/// Run a fresh tool server on the peer's pipes until the client hangs up.
pub async fn run_tool_server<B: SearchBackend>(
    peer: ScriptedPeer,
    backend: Arc<B>,
    root: PathBuf,
) -> ExitReason {
    let config = ServerConfig {
        root,
        ..ServerConfig::default()
    };
    let Ok(server) = ToolServer::new(config, backend) else {
        return ExitReason::Code(2);
    };
    let (stdin, stdout) = peer.into_pipes();
    match serve(Arc::new(server), stdin, stdout).await {
        Ok(()) => ExitReason::Code(0),
        Err(_) => ExitReason::Code(1),
    }
}

/// Launcher whose every generation is a tool server over `backend`.
pub fn tool_server_launcher<B: SearchBackend>(backend: Arc<B>, root: PathBuf) -> Arc<MemoryLauncher> {
    Arc::new(MemoryLauncher::new(move |_, peer| {
        run_tool_server(peer, Arc::clone(&backend), root.clone())
    }))
}

/// Client over a transport that launches through `launcher`.
pub fn client(launcher: Arc<MemoryLauncher>) -> SearchClient<Transport> {
    let router = Arc::new(NotificationRouter::new(Arc::new(InMemoryEventBus::new())));
    let transport = Transport::new(TransportConfig::default(), launcher, router)
        .expect("default transport config is valid");
    SearchClient::new(transport)
}

/// `n` results, best first, in `src/file{i}.rs`.
#[must_use]
pub fn numbered_results(n: usize) -> Vec<SearchResult> {
    (0..n)
        .map(|i| SearchResult {
            path: format!("src/file{i}.rs"),
            span: Span {
                byte_start: i * 100,
                byte_end: i * 100 + 40,
                line_start: i * 10 + 1,
                line_end: i * 10 + 3,
            },
            language: "rust".to_string(),
            snippet: format!("fn handler_{i}() {{}}"),
            score: 1.0 - i as f32 * 0.1,
        })
        .collect()
}

/// Backend returning the same ranked list for every search.
#[derive(Default)]
pub struct FixedBackend {
    results: Vec<SearchResult>,
    searches: AtomicUsize,
}

impl FixedBackend {
    #[must_use]
    pub fn new(results: Vec<SearchResult>) -> Self {
        Self {
            results,
            searches: AtomicUsize::new(0),
        }
    }

    /// Searches actually run (cursor pages do not count).
    #[must_use]
    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchBackend for FixedBackend {
    async fn search(&self, _params: &SearchParams) -> Result<Vec<SearchResult>, BackendError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        Ok(self.results.clone())
    }

    async fn index_stats(&self, path: &str) -> Result<IndexStatus, BackendError> {
        Ok(IndexStatus {
            path: path.to_string(),
            ..IndexStatus::default()
        })
    }

    async fn reindex(
        &self,
        _path: &str,
        _force: bool,
        _progress: &ProgressSink,
    ) -> Result<(), BackendError> {
        Ok(())
    }

    fn default_ignore_patterns(&self) -> Vec<String> {
        Vec::new()
    }
}
