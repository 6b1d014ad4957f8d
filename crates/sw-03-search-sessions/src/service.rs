//! # Session Store
//!
//! Holds completed searches so later pages are cut from memory instead of
//! re-running the search.
//!
//! ## Concurrency
//!
//! One `parking_lot::Mutex` guards the whole session map. Page requests and
//! the sweep take it briefly and never await while holding it; the search
//! itself runs before the lock is taken.
//!
//! ## Limits
//!
//! - Sessions idle longer than the TTL are removed by the sweep, or on access.
//! - Admitting a session at the cap evicts the least recently accessed one.

use crate::domain::snippet::{fit_to_budget, shape_snippets};
use crate::domain::{
    Cursor, PageOptions, PageRequest, SearchPage, SearchParams, SearchSession, SessionConfig,
    SessionConfigError, SessionStats,
};
use crate::error::SessionError;
use parking_lot::Mutex;
use shared_types::SearchResult;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};
use sw_telemetry::metrics::{PAGES_SERVED, SESSIONS_ACTIVE, SESSION_EVICTIONS};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Failure of [`SessionStore::paginate`].
#[derive(Debug)]
pub enum PaginateError<E> {
    /// Rejected by the store (cursor, expiry, validation).
    Session(SessionError),
    /// The search itself failed.
    Search(E),
}

impl<E: fmt::Display> fmt::Display for PaginateError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session(e) => write!(f, "{}", e),
            Self::Search(e) => write!(f, "Search failed: {}", e),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for PaginateError<E> {}

impl<E> From<SessionError> for PaginateError<E> {
    fn from(e: SessionError) -> Self {
        Self::Session(e)
    }
}

/// Server-side cache of ranked search results.
pub struct SessionStore {
    config: SessionConfig,
    sessions: Mutex<HashMap<Uuid, SearchSession>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self {
            config: SessionConfig::default(),
            sessions: Mutex::new(HashMap::new()),
        }
    }
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Result<Self, SessionConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            sessions: Mutex::new(HashMap::new()),
        })
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Serve one page: from the cache when `request` carries a cursor,
    /// otherwise by running `search` and caching its full result list.
    ///
    /// Options are validated before `search` runs.
    pub async fn paginate<F, Fut, E>(
        &self,
        params: SearchParams,
        request: &PageRequest,
        search: F,
    ) -> Result<SearchPage, PaginateError<E>>
    where
        F: FnOnce(SearchParams) -> Fut,
        Fut: Future<Output = Result<Vec<SearchResult>, E>>,
    {
        if let Some(cursor) = &request.cursor {
            return Ok(self.page_by_cursor(cursor, &params, request)?);
        }

        request.resolve(&self.config).map_err(SessionError::from)?;
        params.validate().map_err(SessionError::from)?;

        let results = search(params.clone())
            .await
            .map_err(PaginateError::Search)?;
        Ok(self.first_page(params, results, request)?)
    }

    /// Cache `results` as a new session and return its first page.
    pub fn first_page(
        &self,
        params: SearchParams,
        results: Vec<SearchResult>,
        request: &PageRequest,
    ) -> Result<SearchPage, SessionError> {
        let options = request.resolve(&self.config)?;
        params.validate()?;

        let session_id = self.create_session(params, results);
        let page = self.page(session_id, 0, options, None)?;
        PAGES_SERVED.with_label_values(&["fresh"]).inc();
        Ok(page)
    }

    /// Serve the page a cursor points at.
    ///
    /// `params` are the parameters of the current request; they must hash to
    /// the value embedded in the cursor. The page size is the one the first
    /// page was served with, whatever `request` says.
    pub fn page_by_cursor(
        &self,
        cursor: &str,
        params: &SearchParams,
        request: &PageRequest,
    ) -> Result<SearchPage, SessionError> {
        let mut options = request.resolve(&self.config)?;
        let cursor = Cursor::decode(cursor)?;

        if cursor.age_secs() > self.config.ttl.as_secs() {
            return Err(SessionError::CursorExpired);
        }
        if cursor.search_params_hash != params.params_hash() {
            debug!(session_id = %cursor.session_id, "Cursor used with different parameters");
            return Err(SessionError::ParamsMismatch);
        }

        options.page_size = cursor.original_page_size;
        let page = self.page(
            cursor.session_id,
            cursor.offset,
            options,
            Some(&cursor.search_params_hash),
        )?;
        PAGES_SERVED.with_label_values(&["cursor"]).inc();
        Ok(page)
    }

    /// Store a finished search. Evicts the least recently used session first
    /// when the store is full.
    pub fn create_session(&self, params: SearchParams, results: Vec<SearchResult>) -> Uuid {
        let session = SearchSession::new(params, results, Instant::now());
        let id = session.id;
        let total = session.total_count;

        let mut sessions = self.sessions.lock();
        while sessions.len() >= self.config.max_sessions {
            let Some(oldest) = sessions
                .values()
                .min_by_key(|s| s.last_accessed)
                .map(|s| s.id)
            else {
                break;
            };
            sessions.remove(&oldest);
            SESSION_EVICTIONS.with_label_values(&["capacity"]).inc();
            debug!(session_id = %oldest, "Evicted least recently used session");
        }
        sessions.insert(id, session);
        SESSIONS_ACTIVE.set(sessions.len() as f64);
        drop(sessions);

        debug!(session_id = %id, results = total, "Created search session");
        id
    }

    fn page(
        &self,
        session_id: Uuid,
        offset: usize,
        options: PageOptions,
        expected_hash: Option<&str>,
    ) -> Result<SearchPage, SessionError> {
        let now = Instant::now();
        let mut sessions = self.sessions.lock();

        let Some(session) = sessions.get_mut(&session_id) else {
            return Err(SessionError::NotFound(session_id));
        };

        if session.is_expired(now, self.config.ttl) {
            sessions.remove(&session_id);
            SESSION_EVICTIONS.with_label_values(&["ttl"]).inc();
            SESSIONS_ACTIVE.set(sessions.len() as f64);
            return Err(SessionError::Expired(session_id));
        }

        if let Some(expected) = expected_hash {
            if expected != session.params_hash {
                return Err(SessionError::ParamsMismatch);
            }
        }

        session.last_accessed = now;

        let total = session.results.len();
        let page_size = options.page_size;
        let current_page = offset / page_size + 1;

        if offset >= total {
            return Ok(SearchPage {
                session_id,
                matches: Vec::new(),
                count: 0,
                total_count: total,
                has_more: false,
                truncated: false,
                next_cursor: None,
                current_page,
                page_size,
                offset,
            });
        }

        let end = offset.saturating_add(page_size).min(total);
        let mut matches = session.results[offset..end].to_vec();
        let params_hash = session.params_hash.clone();
        drop(sessions);

        shape_snippets(&mut matches, &options);
        let fit = fit_to_budget(&mut matches, self.config.max_page_bytes);
        if !fit.is_within_budget() {
            warn!(
                %session_id,
                offset,
                ceiling = self.config.max_page_bytes,
                "Page exceeds the byte ceiling with snippets omitted"
            );
        }
        let truncated = fit.is_truncated();

        let has_more = end < total;
        let next_cursor = if has_more {
            Some(Cursor::new(session_id, end, params_hash, page_size).encode()?)
        } else {
            None
        };

        Ok(SearchPage {
            session_id,
            count: matches.len(),
            matches,
            total_count: total,
            has_more,
            truncated,
            next_cursor,
            current_page,
            page_size,
            offset,
        })
    }

    /// Remove every session past its TTL. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let ttl = self.config.ttl;
        let mut sessions = self.sessions.lock();

        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now, ttl));
        let removed = before - sessions.len();
        SESSIONS_ACTIVE.set(sessions.len() as f64);
        drop(sessions);

        if removed > 0 {
            SESSION_EVICTIONS
                .with_label_values(&["ttl"])
                .inc_by(removed as f64);
            debug!(removed = removed, "Swept expired sessions");
        }
        removed
    }

    /// Run [`SessionStore::sweep_expired`] every `sweep_interval` until the
    /// store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);
        let period = self.config.sweep_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                store.sweep_expired();
            }
            info!("Session sweeper stopped");
        })
    }

    /// Drop a session explicitly.
    pub fn remove(&self, session_id: &Uuid) -> bool {
        let mut sessions = self.sessions.lock();
        let removed = sessions.remove(session_id).is_some();
        SESSIONS_ACTIVE.set(sessions.len() as f64);
        removed
    }

    #[must_use]
    pub fn stats(&self) -> SessionStats {
        let now = Instant::now();
        let sessions = self.sessions.lock();

        SessionStats {
            total_sessions: sessions.len(),
            expired_sessions: sessions
                .values()
                .filter(|s| s.is_expired(now, self.config.ttl))
                .count(),
            total_cached_results: sessions.values().map(|s| s.total_count).sum(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    #[must_use]
    pub fn contains(&self, session_id: &Uuid) -> bool {
        self.sessions.lock().contains_key(session_id)
    }
}
