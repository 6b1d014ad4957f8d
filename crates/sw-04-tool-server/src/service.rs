//! # Tool Server
//!
//! Answers the requests of one client connection.
//!
//! ## Error reporting
//!
//! - Malformed arguments, missing paths and rejected cursors are JSON-RPC
//!   `-32602` errors. Cursor rejections ask the caller to start over.
//! - Engine failures are successful responses carrying an `isError` result.
//!
//! ## Progress
//!
//! `reindex` forwards the engine's progress reports as
//! `notifications/progress` when the request carries `_meta.progressToken`.
//! Every notification is queued before the response.

use crate::domain::args::{parse, PathArgs, RegexArgs, ReindexArgs, SimilarityArgs};
use crate::domain::payload::{
    ignore_file, index_status_summary, path_type, search_page, search_summary, timestamp,
};
use crate::domain::{tool_catalog, ServerConfig, StatsCache, INSTRUCTIONS};
use crate::error::ServerError;
use crate::ports::{ProgressSink, SearchBackend};
use serde_json::{json, Map, Value};
use shared_types::{
    methods, tools, Implementation, InitializeParams, InitializeResult, Message, Notification,
    ProgressEvent, ProgressParams, ReindexOutcome, Request, Response, RpcError, SearchMode,
    ToolCallParams, ToolResult, PROTOCOL_VERSION,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use sw_03_search_sessions::{PaginateError, SessionError, SessionStore};
use sw_telemetry::metrics::{TOOL_CALLS, TOOL_DURATION};
use sw_telemetry::HistogramTimer;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Appended to every cursor rejection.
pub const RESTART_HINT: &str = "Restart the search without a cursor.";

fn session_error(error: &SessionError) -> RpcError {
    match error {
        SessionError::Validation(e) => RpcError::invalid_params(e),
        other => RpcError::invalid_params(format!("{other}. {RESTART_HINT}")),
    }
}

fn missing_path(path: &str) -> RpcError {
    RpcError::invalid_params(format!("Path does not exist: {path}"))
}

/// Request handler shared by every task of a connection.
pub struct ToolServer<B: SearchBackend> {
    config: ServerConfig,
    backend: Arc<B>,
    sessions: Arc<SessionStore>,
    stats: StatsCache,
    initialized: AtomicBool,
}

impl<B: SearchBackend> ToolServer<B> {
    pub fn new(config: ServerConfig, backend: Arc<B>) -> Result<Self, ServerError> {
        config.validate()?;
        let sessions = Arc::new(SessionStore::new(config.sessions.clone())?);
        let stats = StatsCache::new(config.stats_cache_ttl);
        Ok(Self {
            config,
            backend,
            sessions,
            stats,
            initialized: AtomicBool::new(false),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Answer one request. Notifications it produces go to `outbound`.
    pub async fn handle_request(
        &self,
        request: Request,
        outbound: &mpsc::Sender<Message>,
    ) -> Response {
        let id = request.id.clone();
        match self.dispatch(request, outbound).await {
            Ok(result) => Response::success(id, result),
            Err(error) => {
                debug!(id = %id, code = error.code, message = %error.message, "Request failed");
                Response::failure(id, error)
            }
        }
    }

    /// Notifications are never answered.
    pub fn handle_notification(&self, notification: &Notification) {
        match notification.method.as_str() {
            methods::INITIALIZED => info!("Client completed the handshake"),
            other => debug!(method = %other, "Ignoring notification"),
        }
    }

    async fn dispatch(
        &self,
        request: Request,
        outbound: &mpsc::Sender<Message>,
    ) -> Result<Value, RpcError> {
        match request.method.as_str() {
            methods::INITIALIZE => self.initialize(request.params),
            methods::PING => Ok(json!({})),
            methods::TOOLS_LIST | methods::TOOLS_CALL if !self.is_initialized() => {
                Err(RpcError::not_initialized())
            }
            methods::TOOLS_LIST => Ok(json!({ "tools": tool_catalog() })),
            methods::TOOLS_CALL => {
                let params: ToolCallParams = serde_json::from_value(request.params)
                    .map_err(|e| RpcError::invalid_params(format!("Invalid tools/call parameters: {e}")))?;
                let result = self.call_tool(params, outbound).await?;
                serde_json::to_value(result).map_err(RpcError::internal)
            }
            other => Err(RpcError::method_not_found(other)),
        }
    }

    fn initialize(&self, params: Value) -> Result<Value, RpcError> {
        let params: InitializeParams = serde_json::from_value(params)
            .map_err(|e| RpcError::invalid_params(format!("Invalid initialize parameters: {e}")))?;
        info!(
            client = %params.client_info.name,
            client_version = %params.client_info.version,
            protocol = %params.protocol_version,
            "Client connected"
        );
        if params.protocol_version != PROTOCOL_VERSION {
            warn!(
                requested = %params.protocol_version,
                served = PROTOCOL_VERSION,
                "Client asked for a different protocol version"
            );
        }

        self.initialized.store(true, Ordering::Release);
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: json!({ "tools": { "listChanged": false } }),
            server_info: Implementation::new(&self.config.server_name, &self.config.server_version),
            instructions: Some(INSTRUCTIONS.to_string()),
        };
        serde_json::to_value(result).map_err(RpcError::internal)
    }

    #[instrument(skip_all, fields(tool = %params.name))]
    async fn call_tool(
        &self,
        params: ToolCallParams,
        outbound: &mpsc::Sender<Message>,
    ) -> Result<ToolResult, RpcError> {
        let _timer = HistogramTimer::new(&TOOL_DURATION);
        let token = params.progress_token().cloned();
        let arguments = params.arguments;

        let (label, outcome) = match params.name.as_str() {
            tools::SEMANTIC_SEARCH | tools::REGEX_SEARCH | tools::HYBRID_SEARCH => {
                let mode = SearchMode::from_tool_name(&params.name).unwrap_or(SearchMode::Semantic);
                (mode.tool_name(), self.search(mode, arguments).await)
            }
            tools::INDEX_STATUS => (tools::INDEX_STATUS, self.index_status(arguments).await),
            tools::REINDEX => (tools::REINDEX, self.reindex(arguments, token, outbound).await),
            tools::DEFAULT_IGNORE_CONTENT => {
                (tools::DEFAULT_IGNORE_CONTENT, Ok(self.default_ignore_content()))
            }
            tools::HEALTH_CHECK => (tools::HEALTH_CHECK, Ok(self.health_check())),
            other => (
                "unknown",
                Err(RpcError::invalid_params(format!("Unknown tool: {other}"))),
            ),
        };

        let result_label = match &outcome {
            Ok(result) if result.is_error() => "tool_error",
            Ok(_) => "ok",
            Err(_) => "invalid_params",
        };
        TOOL_CALLS.with_label_values(&[label, result_label]).inc();
        outcome
    }

    async fn search(
        &self,
        mode: SearchMode,
        arguments: Map<String, Value>,
    ) -> Result<ToolResult, RpcError> {
        let (params, request) = match mode {
            SearchMode::Regex => parse::<RegexArgs>(arguments)
                .map_err(RpcError::invalid_params)?
                .into_parts(),
            SearchMode::Semantic | SearchMode::Hybrid => parse::<SimilarityArgs>(arguments)
                .map_err(RpcError::invalid_params)?
                .into_parts(mode, self.config.default_top_k),
        };

        let from_cursor = request.cursor.is_some();
        if !from_cursor && !self.config.resolve(&params.path).exists() {
            return Err(missing_path(&params.path));
        }

        let started = Instant::now();
        let backend = Arc::clone(&self.backend);
        let page = self
            .sessions
            .paginate(params.clone(), &request, move |params| async move {
                backend.search(&params).await
            })
            .await;

        let page = match page {
            Ok(page) => page,
            Err(PaginateError::Session(e)) => {
                debug!(reason = e.kind(), "Rejected page request");
                return Err(session_error(&e));
            }
            Err(PaginateError::Search(e)) => {
                warn!(mode = %mode, error = %e, "Search failed");
                return Ok(ToolResult::failure(format!("Search failed: {e}")));
            }
        };

        let elapsed = started.elapsed().as_millis() as u64;
        debug!(
            session_id = %page.session_id,
            page = page.current_page,
            count = page.count,
            total = page.total_count,
            "Served search page"
        );
        Ok(ToolResult::success(
            search_summary(&page, &params, from_cursor),
            search_page(&page, &params, elapsed),
        ))
    }

    async fn index_status(&self, arguments: Map<String, Value>) -> Result<ToolResult, RpcError> {
        let args: PathArgs = parse(arguments).map_err(RpcError::invalid_params)?;
        let resolved = self.config.resolve(&args.path);
        if !resolved.exists() {
            return Err(missing_path(&args.path));
        }

        let status = match self.stats.get(&args.path) {
            Some(status) => status,
            None => match self.backend.index_stats(&args.path).await {
                Ok(status) => {
                    self.stats.insert(&args.path, status.clone());
                    status
                }
                Err(e) => {
                    warn!(path = %args.path, error = %e, "Index statistics unavailable");
                    return Ok(ToolResult::failure(format!("Failed to get index status: {e}")));
                }
            },
        };

        let payload = json!({
            "index_status": status,
            "metadata": {
                "checked_at": timestamp(),
                "path_type": path_type(&resolved)
            }
        });
        Ok(ToolResult::success(index_status_summary(&status), payload))
    }

    async fn reindex(
        &self,
        arguments: Map<String, Value>,
        token: Option<Value>,
        outbound: &mpsc::Sender<Message>,
    ) -> Result<ToolResult, RpcError> {
        let args: ReindexArgs = parse(arguments).map_err(RpcError::invalid_params)?;
        let resolved = self.config.resolve(&args.path);
        if !resolved.exists() {
            return Err(missing_path(&args.path));
        }

        let (sink, forwarder) = match token {
            Some(token) => {
                let (sink, events) = ProgressSink::channel();
                let forwarder = tokio::spawn(forward_progress(token, events, outbound.clone()));
                (sink, Some(forwarder))
            }
            None => (ProgressSink::disabled(), None),
        };

        info!(path = %args.path, force = args.force, "Reindexing");
        let started = Instant::now();
        let outcome = self.backend.reindex(&args.path, args.force, &sink).await;

        // Closing the sink ends the forwarder once it has queued every report.
        drop(sink);
        if let Some(forwarder) = forwarder {
            let _ = forwarder.await;
        }
        self.stats.invalidate(&args.path);

        match outcome {
            Ok(()) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                let result = ReindexOutcome {
                    status: "success".to_string(),
                    duration_ms,
                    path: args.path.clone(),
                    force: args.force,
                };
                let payload = json!({
                    "reindex_result": result,
                    "metadata": {
                        "completed_at": timestamp(),
                        "path_type": path_type(&resolved)
                    }
                });
                Ok(ToolResult::success(
                    format!("Successfully reindexed {} in {}ms", args.path, duration_ms),
                    payload,
                ))
            }
            Err(e) => {
                warn!(path = %args.path, error = %e, "Reindex failed");
                Ok(ToolResult::failure(format!("Reindexing failed: {e}")))
            }
        }
    }

    fn default_ignore_content(&self) -> ToolResult {
        let patterns = self.backend.default_ignore_patterns();
        let content = ignore_file(&patterns);
        ToolResult::success(
            format!("Default ignore file with {} patterns", patterns.len()),
            json!({ "content": content, "patterns": patterns }),
        )
    }

    fn health_check(&self) -> ToolResult {
        let cwd = self.config.root.display().to_string();
        let payload = json!({
            "status": "healthy",
            "server": self.config.server_name,
            "version": self.config.server_version,
            "protocol": PROTOCOL_VERSION,
            "timestamp": timestamp(),
            "cwd": cwd
        });
        ToolResult::success(
            format!(
                "{} v{} is healthy and ready (working directory: {})",
                self.config.server_name, self.config.server_version, cwd
            ),
            payload,
        )
    }
}

/// Relay backend progress reports as `notifications/progress` tagged with
/// `token`, until the sink is dropped or the writer goes away.
async fn forward_progress(
    token: Value,
    mut events: mpsc::UnboundedReceiver<ProgressEvent>,
    outbound: mpsc::Sender<Message>,
) {
    while let Some(event) = events.recv().await {
        let params = ProgressParams {
            progress_token: token.clone(),
            progress: event.progress,
            total: event.total,
            message: event.message,
        };
        let Ok(params) = serde_json::to_value(params) else {
            continue;
        };
        let notification = Notification::new(methods::PROGRESS, params);
        if outbound.send(notification.into()).await.is_err() {
            debug!("Writer closed; dropping progress reports");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::BackendError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use shared_types::{codes, IndexStatus, SearchResult, Span};
    use std::sync::atomic::AtomicUsize;
    use sw_03_search_sessions::SearchParams;

    #[derive(Default)]
    struct FakeBackend {
        results: Vec<SearchResult>,
        searches: AtomicUsize,
        stats_calls: AtomicUsize,
        fail_search: bool,
        seen: Mutex<Vec<SearchParams>>,
    }

    #[async_trait]
    impl SearchBackend for FakeBackend {
        async fn search(&self, params: &SearchParams) -> Result<Vec<SearchResult>, BackendError> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().push(params.clone());
            if self.fail_search {
                return Err(BackendError::Failed("engine crashed".into()));
            }
            Ok(self.results.clone())
        }

        async fn index_stats(&self, path: &str) -> Result<IndexStatus, BackendError> {
            self.stats_calls.fetch_add(1, Ordering::SeqCst);
            Ok(IndexStatus {
                path: path.to_string(),
                index_exists: true,
                total_files: Some(4),
                total_chunks: Some(10),
                ..IndexStatus::default()
            })
        }

        async fn reindex(
            &self,
            _path: &str,
            _force: bool,
            progress: &ProgressSink,
        ) -> Result<(), BackendError> {
            progress.report(1.0, Some(2.0), "Indexed a.rs");
            progress.report(2.0, Some(2.0), "Indexed b.rs");
            Ok(())
        }

        fn default_ignore_patterns(&self) -> Vec<String> {
            vec![".git".into(), "target".into()]
        }
    }

    fn results(n: usize) -> Vec<SearchResult> {
        (0..n)
            .map(|i| SearchResult {
                path: format!("src/file{i}.rs"),
                span: Span {
                    line_start: i + 1,
                    line_end: i + 1,
                    ..Span::default()
                },
                language: "rust".into(),
                snippet: format!("fn item{i}() {{}}"),
                score: 1.0 - i as f32 * 0.01,
            })
            .collect()
    }

    fn server(backend: FakeBackend) -> ToolServer<FakeBackend> {
        ToolServer::new(ServerConfig::default(), Arc::new(backend)).unwrap()
    }

    fn outbound() -> (mpsc::Sender<Message>, mpsc::Receiver<Message>) {
        mpsc::channel(64)
    }

    async fn request(
        server: &ToolServer<FakeBackend>,
        method: &str,
        params: Value,
        tx: &mpsc::Sender<Message>,
    ) -> Response {
        server.handle_request(Request::new(1u64, method, params), tx).await
    }

    async fn initialize(server: &ToolServer<FakeBackend>, tx: &mpsc::Sender<Message>) {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {"name": "test", "version": "0"}
        });
        let response = request(server, methods::INITIALIZE, params, tx).await;
        assert!(response.error.is_none());
    }

    async fn call(
        server: &ToolServer<FakeBackend>,
        name: &str,
        arguments: Value,
        tx: &mpsc::Sender<Message>,
    ) -> Result<ToolResult, RpcError> {
        let params = json!({"name": name, "arguments": arguments});
        let response = request(server, methods::TOOLS_CALL, params, tx).await;
        response
            .into_result()
            .map(|value| serde_json::from_value(value).unwrap())
    }

    #[tokio::test]
    async fn test_initialize_reports_server_and_capabilities() {
        let server = server(FakeBackend::default());
        let (tx, _rx) = outbound();
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "clientInfo": {"name": "test", "version": "0"}
        });
        let result = request(&server, methods::INITIALIZE, params, &tx)
            .await
            .into_result()
            .unwrap();

        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "seekwire");
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
        assert!(server.is_initialized());
    }

    #[tokio::test]
    async fn test_tools_rejected_before_initialize() {
        let server = server(FakeBackend::default());
        let (tx, _rx) = outbound();

        let err = call(&server, tools::HEALTH_CHECK, json!({}), &tx).await.unwrap_err();
        assert_eq!(err.code, codes::SERVER_NOT_INITIALIZED);

        let response = request(&server, methods::PING, Value::Null, &tx).await;
        assert_eq!(response.into_result().unwrap(), json!({}));
    }

    #[tokio::test]
    async fn test_unknown_method_and_tool() {
        let server = server(FakeBackend::default());
        let (tx, _rx) = outbound();
        initialize(&server, &tx).await;

        let response = request(&server, "resources/list", json!({}), &tx).await;
        assert_eq!(response.error.unwrap().code, codes::METHOD_NOT_FOUND);

        let err = call(&server, "delete_everything", json!({}), &tx).await.unwrap_err();
        assert_eq!(err.code, codes::INVALID_PARAMS);
        assert!(err.message.contains("Unknown tool"));
    }

    #[tokio::test]
    async fn test_tools_list_serves_catalog() {
        let server = server(FakeBackend::default());
        let (tx, _rx) = outbound();
        initialize(&server, &tx).await;

        let result = request(&server, methods::TOOLS_LIST, json!({}), &tx)
            .await
            .into_result()
            .unwrap();
        assert_eq!(result["tools"].as_array().unwrap().len(), 7);
        assert!(result["tools"][0]["inputSchema"].is_object());
    }

    #[tokio::test]
    async fn test_search_pages_through_session() {
        let server = server(FakeBackend {
            results: results(5),
            ..FakeBackend::default()
        });
        let (tx, _rx) = outbound();
        initialize(&server, &tx).await;

        let args = json!({"pattern": "fn", "path": ".", "page_size": 2});
        let first = call(&server, tools::REGEX_SEARCH, args, &tx).await.unwrap();
        let payload = first.structured_content.unwrap();
        assert_eq!(payload["results"]["count"], 2);
        assert_eq!(payload["results"]["total_count"], 5);
        assert_eq!(payload["results"]["has_more"], true);
        let cursor = payload["pagination"]["next_cursor"].as_str().unwrap().to_string();

        let args = json!({"pattern": "fn", "path": ".", "cursor": cursor});
        let second = call(&server, tools::REGEX_SEARCH, args, &tx).await.unwrap();
        let payload = second.structured_content.clone().unwrap();
        assert_eq!(payload["pagination"]["current_page"], 2);
        assert_eq!(
            payload["results"]["matches"][0]["file"]["path"],
            "src/file2.rs"
        );
        assert!(second
            .texts()
            .next()
            .unwrap()
            .starts_with("Retrieved page 2 of regex search results"));

        // One search, the second page came from the session.
        assert_eq!(server.backend.searches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_similarity_defaults_reach_backend() {
        let server = server(FakeBackend::default());
        let (tx, _rx) = outbound();
        initialize(&server, &tx).await;

        call(&server, tools::HYBRID_SEARCH, json!({"query": "retry", "path": "."}), &tx)
            .await
            .unwrap();
        let seen = server.backend.seen.lock();
        assert_eq!(seen[0].mode, SearchMode::Hybrid);
        assert_eq!(seen[0].top_k, Some(100));
        assert_eq!(seen[0].threshold, Some(0.02));
    }

    #[tokio::test]
    async fn test_changed_params_reject_cursor() {
        let server = server(FakeBackend {
            results: results(5),
            ..FakeBackend::default()
        });
        let (tx, _rx) = outbound();
        initialize(&server, &tx).await;

        let args = json!({"query": "retry", "path": ".", "page_size": 2});
        let first = call(&server, tools::SEMANTIC_SEARCH, args, &tx).await.unwrap();
        let cursor = first.structured_content.unwrap()["pagination"]["next_cursor"].clone();

        let args = json!({"query": "backoff", "path": ".", "cursor": cursor});
        let err = call(&server, tools::SEMANTIC_SEARCH, args, &tx).await.unwrap_err();
        assert_eq!(err.code, codes::INVALID_PARAMS);
        assert!(err.message.ends_with(RESTART_HINT));

        let args = json!({"query": "retry", "path": ".", "cursor": "garbage"});
        let err = call(&server, tools::SEMANTIC_SEARCH, args, &tx).await.unwrap_err();
        assert!(err.message.contains(RESTART_HINT));
    }

    #[tokio::test]
    async fn test_invalid_arguments_and_paths() {
        let server = server(FakeBackend::default());
        let (tx, _rx) = outbound();
        initialize(&server, &tx).await;

        let err = call(&server, tools::SEMANTIC_SEARCH, json!({"query": 5}), &tx)
            .await
            .unwrap_err();
        assert!(err.message.starts_with("Invalid parameters:"));

        let args = json!({"query": "q", "path": "/definitely/not/here"});
        let err = call(&server, tools::SEMANTIC_SEARCH, args, &tx).await.unwrap_err();
        assert_eq!(err.message, "Path does not exist: /definitely/not/here");

        let args = json!({"query": "q", "path": ".", "page_size": 100000});
        let err = call(&server, tools::SEMANTIC_SEARCH, args, &tx).await.unwrap_err();
        assert!(err.message.contains("page_size"));
        assert!(!err.message.contains(RESTART_HINT));
        assert_eq!(server.backend.searches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_backend_failure_is_tool_error() {
        let server = server(FakeBackend {
            fail_search: true,
            ..FakeBackend::default()
        });
        let (tx, _rx) = outbound();
        initialize(&server, &tx).await;

        let result = call(&server, tools::REGEX_SEARCH, json!({"pattern": "x", "path": "."}), &tx)
            .await
            .unwrap();
        assert!(result.is_error());
        assert_eq!(
            result.texts().next(),
            Some("Search failed: engine crashed")
        );
    }

    #[tokio::test]
    async fn test_index_status_is_cached_until_reindex() {
        let server = server(FakeBackend::default());
        let (tx, _rx) = outbound();
        initialize(&server, &tx).await;

        let first = call(&server, tools::INDEX_STATUS, json!({"path": "."}), &tx).await.unwrap();
        let payload = first.structured_content.unwrap();
        assert_eq!(payload["index_status"]["cache_hit"], false);
        assert_eq!(payload["metadata"]["path_type"], "directory");

        let second = call(&server, tools::INDEX_STATUS, json!({"path": "."}), &tx).await.unwrap();
        assert_eq!(second.structured_content.unwrap()["index_status"]["cache_hit"], true);
        assert_eq!(server.backend.stats_calls.load(Ordering::SeqCst), 1);

        call(&server, tools::REINDEX, json!({"path": "."}), &tx).await.unwrap();
        call(&server, tools::INDEX_STATUS, json!({"path": "."}), &tx).await.unwrap();
        assert_eq!(server.backend.stats_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_reindex_forwards_progress_before_response() {
        let server = server(FakeBackend::default());
        let (tx, mut rx) = outbound();
        initialize(&server, &tx).await;

        let params = json!({
            "name": tools::REINDEX,
            "arguments": {"path": ".", "force": true},
            "_meta": {"progressToken": "tok-1"}
        });
        let response = request(&server, methods::TOOLS_CALL, params, &tx).await;
        let result: ToolResult = serde_json::from_value(response.into_result().unwrap()).unwrap();
        let payload = result.structured_content.unwrap();
        assert_eq!(payload["reindex_result"]["status"], "success");
        assert_eq!(payload["reindex_result"]["force"], true);

        let mut progress = Vec::new();
        while let Ok(Message::Notification(n)) = rx.try_recv() {
            assert_eq!(n.method, methods::PROGRESS);
            progress.push(n.params);
        }
        assert_eq!(progress.len(), 2);
        assert_eq!(progress[0]["progressToken"], "tok-1");
        assert_eq!(progress[1]["progress"], 2.0);
        assert_eq!(progress[1]["message"], "Indexed b.rs");
    }

    #[tokio::test]
    async fn test_reindex_without_token_sends_nothing() {
        let server = server(FakeBackend::default());
        let (tx, mut rx) = outbound();
        initialize(&server, &tx).await;

        call(&server, tools::REINDEX, json!({"path": "."}), &tx).await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_ignore_content_and_health() {
        let server = server(FakeBackend::default());
        let (tx, _rx) = outbound();
        initialize(&server, &tx).await;

        let ignore = call(&server, tools::DEFAULT_IGNORE_CONTENT, json!({}), &tx).await.unwrap();
        let payload = ignore.structured_content.unwrap();
        assert!(payload["content"].as_str().unwrap().ends_with(".git\ntarget\n"));
        assert_eq!(payload["patterns"], json!([".git", "target"]));

        let health = call(&server, tools::HEALTH_CHECK, json!({}), &tx).await.unwrap();
        let payload = health.structured_content.unwrap();
        assert_eq!(payload["status"], "healthy");
        assert_eq!(payload["protocol"], PROTOCOL_VERSION);
    }
}
