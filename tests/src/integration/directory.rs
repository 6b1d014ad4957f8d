//! # Filesystem backend through the client
//!
//! The directory engine behind the real server, driven by the typed client.

use super::harness::{client, tool_server_launcher};
use serde_json::json;
use shared_bus::{EventFilter, EventTopic, ProtocolEvent};
use std::fs;
use std::sync::Arc;
use sw_02_search_client::{SearchApi, SearchOptions};
use sw_04_tool_server::DirectoryBackend;
use tempfile::TempDir;

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::create_dir_all(dir.path().join("node_modules/dep")).unwrap();
    fs::write(
        dir.path().join("src/net.rs"),
        "use std::time::Duration;\n\npub fn retry_request(attempts: u32) {\n    // retry the request with exponential backoff\n}\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("src/auth.py"),
        "def login(user):\n    return check_password(user)\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("node_modules/dep/index.js"),
        "function retry_request() {}\n",
    )
    .unwrap();
    dir
}

fn directory_client(dir: &TempDir) -> sw_02_search_client::SearchClient<sw_01_transport::Transport> {
    let backend = Arc::new(DirectoryBackend::new(dir.path()));
    client(tool_server_launcher(backend, dir.path().to_path_buf()))
}

#[tokio::test]
async fn test_regex_search_over_directory() {
    let dir = project();
    let client = directory_client(&dir);

    let page = client
        .search(&SearchOptions::regex(r"fn \w+", "src"))
        .await
        .unwrap();
    assert_eq!(page.total_count, 1);
    let hit = &page.results[0];
    assert_eq!(hit.path, "src/net.rs");
    assert_eq!(hit.span.line_start, 3);
    assert_eq!(hit.language, "rust");
}

#[tokio::test]
async fn test_semantic_search_indexes_on_first_use() {
    let dir = project();
    let client = directory_client(&dir);

    let before = client.index_status(".").await.unwrap();
    assert!(!before.index_exists);
    assert_eq!(before.estimated_file_count, Some(2));

    let page = client
        .search(&SearchOptions::semantic("retry request backoff", "."))
        .await
        .unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.results[0].path, "src/net.rs");

    // The first status call was cached before the index existed.
    let cached = client.index_status(".").await.unwrap();
    assert!(cached.cache_hit);
    assert!(!cached.index_exists);
}

#[tokio::test]
async fn test_reindex_reports_progress_and_refreshes_status() {
    let dir = project();
    let client = directory_client(&dir);
    let mut progress = client
        .caller()
        .subscribe(EventFilter::topics(vec![EventTopic::Progress]));

    client.index_status(".").await.unwrap();
    let outcome = client.reindex(".", true, Some(json!("reindex-1"))).await.unwrap();
    assert_eq!(outcome.status, "success");
    assert!(outcome.force);

    let mut reports = Vec::new();
    while let Ok(Some(event)) = progress.try_recv() {
        if let ProtocolEvent::Progress { token, event } = event {
            assert_eq!(token, json!("reindex-1"));
            reports.push(event);
        }
    }
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[1].progress, 2.0);
    assert_eq!(reports[1].total, Some(2.0));

    let status = client.index_status(".").await.unwrap();
    assert!(!status.cache_hit);
    assert!(status.index_exists);
    assert_eq!(status.total_files, Some(2));
}

#[tokio::test]
async fn test_health_and_ignore_content() {
    let dir = project();
    let client = directory_client(&dir);

    let health = client.health_check().await.unwrap();
    assert!(health.is_healthy());
    assert_eq!(health.server, "seekwire");

    let ignore = client.default_ignore_content().await.unwrap();
    assert!(ignore.lines().any(|line| line == "node_modules"));
    assert!(ignore.lines().any(|line| line == ".git"));
}
