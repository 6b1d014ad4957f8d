//! # Shared Bus - Out-of-Band Event Delivery
//!
//! Publish/subscribe bus for everything the subprocess says outside of call
//! replies: progress, log messages, stderr diagnostics, and the transport's
//! own lifecycle transitions.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐  notification   ┌────────────────────┐
//! │ Channel      │ ──────────────→ │ NotificationRouter │
//! │ reader task  │                 └─────────┬──────────┘
//! └──────────────┘                           │ publish()
//!                                            ▼
//!                                    ┌──────────────┐
//!                                    │  Event Bus   │ ──→ Subscription / EventStream
//!                                    └──────────────┘        (any number)
//! ```
//!
//! Subscribers attach by calling `subscribe()` and detach by dropping the
//! handle; the router never needs to know who is listening.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod router;
pub mod subscriber;

// Re-export main types
pub use events::{EventFilter, EventTopic, ProtocolEvent};
pub use publisher::{BusStats, EventPublisher, InMemoryEventBus};
pub use router::{NotificationRouter, RouteOutcome};
pub use subscriber::{EventStream, EventSubscriber, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
