//! Cached searches and the pages cut from them.

use super::params::SearchParams;
use shared_types::{SearchResponse, SearchResult};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// One completed search held for paging.
#[derive(Debug, Clone)]
pub struct SearchSession {
    pub id: Uuid,
    pub params: SearchParams,
    /// Full ranked list, best first
    pub results: Vec<SearchResult>,
    pub created_at: Instant,
    pub last_accessed: Instant,
    pub total_count: usize,
    /// The backend returned its full list (no streaming)
    pub completed: bool,
    pub params_hash: String,
}

impl SearchSession {
    #[must_use]
    pub fn new(params: SearchParams, results: Vec<SearchResult>, now: Instant) -> Self {
        let params_hash = params.params_hash();
        Self {
            id: Uuid::new_v4(),
            total_count: results.len(),
            params,
            results,
            created_at: now,
            last_accessed: now,
            completed: true,
            params_hash,
        }
    }

    /// Idle for longer than `ttl` at `now`.
    #[must_use]
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_accessed) > ttl
    }
}

/// One page of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub session_id: Uuid,
    pub matches: Vec<SearchResult>,
    /// Matches on this page
    pub count: usize,
    pub total_count: usize,
    pub has_more: bool,
    /// Snippets were shortened or dropped to fit the byte ceiling
    pub truncated: bool,
    pub next_cursor: Option<String>,
    /// 1-based
    pub current_page: usize,
    pub page_size: usize,
    pub offset: usize,
}

impl SearchPage {
    #[must_use]
    pub fn into_response(self, search_time_ms: u64) -> SearchResponse {
        SearchResponse {
            results: self.matches,
            count: self.count,
            total_count: self.total_count,
            has_more: self.has_more,
            next_cursor: self.next_cursor,
            search_time_ms,
            truncated: self.truncated,
            page_size: Some(self.page_size),
            current_page: Some(self.current_page),
        }
    }
}

/// Snapshot of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStats {
    pub total_sessions: usize,
    /// Past their TTL but not yet swept
    pub expired_sessions: usize,
    pub total_cached_results: usize,
}
