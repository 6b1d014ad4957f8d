//! # Paging across the wire
//!
//! A search is run once on the server; every later page comes from its
//! session, addressed by the cursor the client echoes back.

use super::harness::{client, crate_root, numbered_results, tool_server_launcher, FixedBackend};
use shared_types::codes;
use std::sync::Arc;
use sw_02_search_client::{ClientError, SearchApi, SearchOptions};
use sw_04_tool_server::RESTART_HINT;

fn fixed(n: usize) -> Arc<FixedBackend> {
    Arc::new(FixedBackend::new(numbered_results(n)))
}

#[tokio::test]
async fn test_five_results_in_pages_of_two() {
    let backend = fixed(5);
    let client = client(tool_server_launcher(Arc::clone(&backend), crate_root()));
    let options = SearchOptions::regex("handler", ".").with_page_size(2);

    let first = client.search(&options).await.unwrap();
    assert_eq!(first.count, 2);
    assert_eq!(first.total_count, 5);
    assert!(first.has_more);
    assert_eq!(first.current_page, Some(1));
    let cursor = first.next_cursor.clone().unwrap();

    let second = client.search(&options.next_page(cursor)).await.unwrap();
    assert_eq!(second.count, 2);
    assert!(second.has_more);
    assert_eq!(second.current_page, Some(2));
    let cursor = second.next_cursor.clone().unwrap();

    let third = client.search(&options.next_page(cursor)).await.unwrap();
    assert_eq!(third.count, 1);
    assert!(!third.has_more);
    assert_eq!(third.next_cursor, None);

    let paths: Vec<String> = [first, second, third]
        .into_iter()
        .flat_map(|page| page.results)
        .map(|result| result.path)
        .collect();
    let expected: Vec<String> = (0..5).map(|i| format!("src/file{i}.rs")).collect();
    assert_eq!(paths, expected);

    assert_eq!(backend.searches(), 1);
}

#[tokio::test]
async fn test_cursor_keeps_first_page_size() {
    let backend = fixed(5);
    let client = client(tool_server_launcher(backend, crate_root()));
    let options = SearchOptions::semantic("request handler", ".").with_page_size(2);

    let first = client.search(&options).await.unwrap();
    let cursor = first.next_cursor.unwrap();

    let second = client
        .search(&options.next_page(cursor).with_page_size(4))
        .await
        .unwrap();
    assert_eq!(second.count, 2);
    assert_eq!(second.page_size, Some(2));
}

#[tokio::test]
async fn test_cursor_with_changed_query_is_rejected() {
    let backend = fixed(5);
    let client = client(tool_server_launcher(Arc::clone(&backend), crate_root()));

    let first = client
        .search(&SearchOptions::hybrid("retry", ".").with_page_size(2))
        .await
        .unwrap();
    let cursor = first.next_cursor.unwrap();

    let err = client
        .search(&SearchOptions::hybrid("backoff", ".").with_page_size(2).with_cursor(cursor))
        .await
        .unwrap_err();
    assert!(!err.is_transport());
    assert!(err.is_invalid_params());
    match err {
        ClientError::Rpc { code, message } => {
            assert_eq!(code, codes::INVALID_PARAMS);
            assert!(message.contains(RESTART_HINT), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // Starting over without the cursor works and runs a new search.
    let again = client
        .search(&SearchOptions::hybrid("backoff", ".").with_page_size(2))
        .await
        .unwrap();
    assert_eq!(again.total_count, 5);
    assert_eq!(backend.searches(), 2);
}

#[tokio::test]
async fn test_missing_path_is_invalid_params() {
    let client = client(tool_server_launcher(fixed(1), crate_root()));

    let err = client
        .search(&SearchOptions::regex("x", "no/such/dir"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Rpc { code, ref message }
            if code == codes::INVALID_PARAMS && message == "Path does not exist: no/such/dir"
    ));
}

#[tokio::test]
async fn test_oversized_page_is_rejected_before_sending() {
    let backend = fixed(1);
    let client = client(tool_server_launcher(Arc::clone(&backend), crate_root()));

    let err = client
        .search(&SearchOptions::regex("x", ".").with_page_size(10_000))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(client.caller().generation(), 0);
}
