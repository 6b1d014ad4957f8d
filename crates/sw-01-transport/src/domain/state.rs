//! Lifecycle state of the managed subprocess.

use crate::error::TransportError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// ```text
/// Unstarted ──ensure()──→ Starting ──handshake ok──→ Ready
///                            │                         │
///                            └──spawn/handshake err──┐ │ exit / write failure / shutdown
///                                                    ▼ ▼
///                         Starting ←──ensure()──── Down
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportState {
    Unstarted,
    Starting,
    Ready,
    Down,
}

impl TransportState {
    /// A call issued now would need a spawn first.
    #[must_use]
    pub fn needs_spawn(self) -> bool {
        matches!(self, Self::Unstarted | Self::Down)
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unstarted => "unstarted",
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Down => "down",
        };
        f.write_str(s)
    }
}

/// Liveness of one spawned process, shared by its tasks and by callers
/// holding a connection to it.
///
/// `mark_down` records the cause before flipping the flag, so a caller that
/// observes `!is_alive()` always finds a reason.
#[derive(Debug)]
pub struct GenerationHandle {
    generation: u64,
    alive: AtomicBool,
    down_reason: Mutex<Option<TransportError>>,
}

impl GenerationHandle {
    #[must_use]
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            alive: AtomicBool::new(true),
            down_reason: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Record why this generation died. The first cause wins.
    pub fn mark_down(&self, reason: TransportError) {
        {
            let mut slot = self.down_reason.lock();
            if slot.is_none() {
                *slot = Some(reason);
            }
        }
        self.alive.store(false, Ordering::SeqCst);
    }

    /// The recorded cause, or a generic closed error.
    #[must_use]
    pub fn down_error(&self) -> TransportError {
        self.down_reason.lock().clone().unwrap_or_else(|| {
            TransportError::Closed(format!("generation {} is gone", self.generation))
        })
    }
}
