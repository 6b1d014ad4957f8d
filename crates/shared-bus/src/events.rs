//! # Protocol Events
//!
//! Everything the subprocess says that is not a reply to a call, plus the
//! transport's own lifecycle transitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::ProgressEvent;

/// All events that can be published to the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProtocolEvent {
    // =========================================================================
    // SUBPROCESS NOTIFICATIONS
    // =========================================================================
    /// `notifications/progress` from the subprocess.
    Progress {
        /// Token the originating call attached, `null` if none.
        token: Value,
        event: ProgressEvent,
    },

    /// `notifications/message` from the subprocess.
    Log {
        level: String,
        logger: Option<String>,
        data: Value,
    },

    // =========================================================================
    // SIDE CHANNEL
    // =========================================================================
    /// One line written by the subprocess to stderr.
    Diagnostic { generation: u64, line: String },

    // =========================================================================
    // TRANSPORT LIFECYCLE
    // =========================================================================
    /// Handshake completed for a freshly spawned process.
    TransportReady { generation: u64 },

    /// The process for `generation` is gone.
    TransportDown { generation: u64, reason: String },
}

impl ProtocolEvent {
    /// Get the topic for this event.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::Progress { .. } => EventTopic::Progress,
            Self::Log { .. } => EventTopic::Log,
            Self::Diagnostic { .. } => EventTopic::Diagnostics,
            Self::TransportReady { .. } | Self::TransportDown { .. } => EventTopic::Lifecycle,
        }
    }

    /// Where the event came from, for log fields.
    #[must_use]
    pub fn origin(&self) -> &'static str {
        match self {
            Self::Progress { .. } | Self::Log { .. } => "notification",
            Self::Diagnostic { .. } => "stderr",
            Self::TransportReady { .. } | Self::TransportDown { .. } => "transport",
        }
    }
}

/// Topics for filtering subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    Progress,
    Log,
    Diagnostics,
    Lifecycle,
    /// Matches every topic.
    All,
}

/// Filter for event subscriptions.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &ProtocolEvent) -> bool {
        self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic())
    }
}
