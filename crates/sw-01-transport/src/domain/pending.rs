//! Request correlator.
//!
//! Maps request ids to the callers waiting on them. Ids come from one
//! counter that starts at 1 and survives re-spawns, so an id is never reused
//! for the lifetime of the transport and a late reply from a dead process can
//! never resolve a call made to its successor.

use crate::error::TransportError;
use dashmap::DashMap;
use serde_json::Value;
use shared_types::{Response, RpcError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use sw_telemetry::metrics::{PROTOCOL_ERRORS, RPC_PENDING};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// What a waiting caller eventually receives.
pub type CallOutcome = Result<Value, TransportError>;

/// Fallback when an error reply carries no usable text.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// A call waiting for its reply
struct PendingCall {
    /// Channel to deliver the outcome
    sender: oneshot::Sender<CallOutcome>,
    /// Method name (for logging)
    method: String,
    /// When the call was registered
    created_at: Instant,
    /// Process the request was written to
    generation: u64,
}

/// Statistics for the correlator
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Total calls registered
    pub total_registered: AtomicU64,
    /// Calls resolved with a reply (success or error object)
    pub total_completed: AtomicU64,
    /// Calls rejected by the transport (exit, write failure, shutdown)
    pub total_rejected: AtomicU64,
    /// Replies with no matching call
    pub total_stale: AtomicU64,
    /// Outcomes nobody was waiting for anymore
    pub total_cancelled: AtomicU64,
}

/// Pending call table.
pub struct PendingCalls {
    pending: DashMap<u64, PendingCall>,
    next_id: AtomicU64,
    stats: PendingStats,
}

impl Default for PendingCalls {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingCalls {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
            next_id: AtomicU64::new(1),
            stats: PendingStats::default(),
        }
    }

    /// Allocate an id and register a waiter for it.
    pub fn register(&self, method: &str, generation: u64) -> (u64, oneshot::Receiver<CallOutcome>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();

        self.pending.insert(
            id,
            PendingCall {
                sender: tx,
                method: method.to_string(),
                created_at: Instant::now(),
                generation,
            },
        );
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);
        self.update_gauge();

        debug!(id = id, method = method, generation = generation, "Registered pending call");

        (id, rx)
    }

    /// Resolve the call a reply belongs to.
    ///
    /// Returns false for replies nobody is waiting on; those are logged and
    /// otherwise ignored.
    pub fn complete(&self, response: Response) -> bool {
        let Some(id) = response.id.as_number() else {
            self.note_stale(&response.id.to_string());
            return false;
        };

        let Some((_, call)) = self.pending.remove(&id) else {
            self.note_stale(&id.to_string());
            return false;
        };
        self.update_gauge();

        let outcome = response.into_result().map_err(|error| TransportError::Rpc {
            code: error.code,
            message: rpc_error_message(&error),
        });

        debug!(
            id = id,
            method = %call.method,
            ok = outcome.is_ok(),
            elapsed_ms = call.created_at.elapsed().as_millis() as u64,
            "Completed pending call"
        );

        self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
        self.deliver(id, call, outcome)
    }

    /// Reject one call, e.g. when its request could not be queued.
    pub fn fail(&self, id: u64, error: TransportError) -> bool {
        let Some((_, call)) = self.pending.remove(&id) else {
            return false;
        };
        self.update_gauge();
        self.stats.total_rejected.fetch_add(1, Ordering::Relaxed);
        self.deliver(id, call, Err(error))
    }

    /// Reject every call sent to `generation` with the same error.
    ///
    /// Returns how many calls were rejected.
    pub fn reject_generation(&self, generation: u64, error: &TransportError) -> usize {
        let ids: Vec<u64> = self
            .pending
            .iter()
            .filter(|entry| entry.value().generation == generation)
            .map(|entry| *entry.key())
            .collect();

        self.reject_ids(ids, error)
    }

    /// Reject every call regardless of generation.
    pub fn reject_all(&self, error: &TransportError) -> usize {
        let ids: Vec<u64> = self.pending.iter().map(|entry| *entry.key()).collect();
        self.reject_ids(ids, error)
    }

    fn reject_ids(&self, ids: Vec<u64>, error: &TransportError) -> usize {
        let mut rejected = 0;
        for id in ids {
            if let Some((_, call)) = self.pending.remove(&id) {
                self.stats.total_rejected.fetch_add(1, Ordering::Relaxed);
                self.deliver(id, call, Err(error.clone()));
                rejected += 1;
            }
        }
        self.update_gauge();
        rejected
    }

    fn deliver(&self, id: u64, call: PendingCall, outcome: CallOutcome) -> bool {
        if call.sender.send(outcome).is_err() {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            debug!(id = id, method = %call.method, "Caller stopped waiting");
            return false;
        }
        true
    }

    fn note_stale(&self, id: &str) {
        self.stats.total_stale.fetch_add(1, Ordering::Relaxed);
        PROTOCOL_ERRORS.with_label_values(&["stale_reply"]).inc();
        warn!(id = id, "Reply for unknown or already settled call");
    }

    fn update_gauge(&self) {
        RPC_PENDING.set(self.pending.len() as f64);
    }

    /// Get number of calls awaiting a reply
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Check if an id is still pending
    #[must_use]
    pub fn is_pending(&self, id: u64) -> bool {
        self.pending.contains_key(&id)
    }

    /// Get statistics
    #[must_use]
    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}

/// Human-readable text of an error reply.
///
/// Priority: a string `data`, then a string `data.details`, then `message`,
/// then [`UNKNOWN_ERROR`].
#[must_use]
pub fn rpc_error_message(error: &RpcError) -> String {
    let from_data = error.data.as_ref().and_then(|data| match data {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => map
            .get("details")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        _ => None,
    });

    from_data
        .or_else(|| (!error.message.is_empty()).then(|| error.message.clone()))
        .unwrap_or_else(|| UNKNOWN_ERROR.to_string())
}
