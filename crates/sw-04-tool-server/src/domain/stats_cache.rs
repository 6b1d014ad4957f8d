//! Short-lived cache of index statistics, keyed by path.

use parking_lot::Mutex;
use shared_types::IndexStatus;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct StatsCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, IndexStatus)>>,
}

impl StatsCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cached statistics younger than the TTL, marked as a cache hit.
    pub fn get(&self, path: &str) -> Option<IndexStatus> {
        let mut entries = self.entries.lock();
        match entries.get(path) {
            Some((stored, status)) if stored.elapsed() <= self.ttl => Some(IndexStatus {
                cache_hit: true,
                ..status.clone()
            }),
            Some(_) => {
                entries.remove(path);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, path: &str, status: IndexStatus) {
        self.entries
            .lock()
            .insert(path.to_string(), (Instant::now(), status));
    }

    /// Drop the entry for `path`; returns whether there was one.
    pub fn invalidate(&self, path: &str) -> bool {
        self.entries.lock().remove(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
