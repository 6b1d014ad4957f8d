//! # Process lifecycle under load
//!
//! Spawning is lazy and shared, a dying server fails its calls with the exit
//! reason, and the next call brings up a fresh one.

use super::harness::{client, crate_root, numbered_results, run_tool_server, tool_server_launcher, FixedBackend};
use std::sync::Arc;
use sw_01_transport::{ExitReason, MemoryLauncher, ScriptedPeer, TransportError, TransportState};
use sw_02_search_client::{ClientError, SearchApi, SearchOptions};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_searches_share_one_spawn() {
    let backend = Arc::new(FixedBackend::new(numbered_results(3)));
    let launcher = tool_server_launcher(Arc::clone(&backend), crate_root());
    let client = Arc::new(client(Arc::clone(&launcher)));

    let searches: Vec<_> = ["alpha", "beta"]
        .into_iter()
        .map(|query| {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.search(&SearchOptions::semantic(query, ".")).await })
        })
        .collect();

    for search in searches {
        let page = search.await.unwrap().unwrap();
        assert_eq!(page.total_count, 3);
    }
    assert_eq!(launcher.spawn_count(), 1);
    assert_eq!(client.caller().handshake_count(), 1);
    assert_eq!(backend.searches(), 2);
}

#[tokio::test]
async fn test_exit_mid_call_then_respawn() {
    let backend = Arc::new(FixedBackend::new(numbered_results(2)));
    let root = crate_root();
    let launcher = Arc::new(MemoryLauncher::new(move |generation, mut peer: ScriptedPeer| {
        let backend = Arc::clone(&backend);
        let root = root.clone();
        async move {
            if generation == 1 {
                // Completes the handshake, takes one request and dies.
                if peer.accept_handshake().await.is_none() {
                    return ExitReason::Code(1);
                }
                let _ = peer.recv_request().await;
                return ExitReason::Code(137);
            }
            run_tool_server(peer, backend, root).await
        }
    }));
    let client = client(Arc::clone(&launcher));
    let options = SearchOptions::regex("fn", ".");

    let err = client.search(&options).await.unwrap_err();
    match &err {
        ClientError::Transport(TransportError::Exited { generation, reason }) => {
            assert_eq!(*generation, 1);
            assert_eq!(reason, "exit code 137");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_transport());

    let page = client.search(&options).await.unwrap();
    assert_eq!(page.total_count, 2);
    assert_eq!(launcher.spawn_count(), 2);
    assert_eq!(client.caller().generation(), 2);
    assert_eq!(client.caller().state(), TransportState::Ready);
}

#[tokio::test]
async fn test_sessions_do_not_survive_a_respawn() {
    let backend = Arc::new(FixedBackend::new(numbered_results(4)));
    let launcher = tool_server_launcher(Arc::clone(&backend), crate_root());
    let client = client(Arc::clone(&launcher));
    let options = SearchOptions::regex("fn", ".").with_page_size(2);

    let first = client.search(&options).await.unwrap();
    let cursor = first.next_cursor.unwrap();

    client.caller().shutdown().await;
    let err = client.search(&options.next_page(cursor)).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Rpc { ref message, .. } if message.contains("not found")
    ));
    assert_eq!(launcher.spawn_count(), 2);
}
