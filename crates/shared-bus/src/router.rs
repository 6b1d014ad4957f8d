//! # Notification Router
//!
//! Turns id-less messages from the subprocess into bus events. Notifications
//! are one-way: nothing here ever produces a reply, and a notification the
//! router does not recognize is logged and counted, never treated as an error.

use crate::events::ProtocolEvent;
use crate::publisher::{EventPublisher, InMemoryEventBus};
use shared_types::{methods, LogMessageParams, Notification, ProgressEvent, ProgressParams};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// How a notification was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Published as an event.
    Delivered,
    /// Known method whose params could not be read.
    Malformed,
    /// No handler for the method.
    Unhandled,
}

/// Dispatches notifications by method name onto the shared bus.
pub struct NotificationRouter {
    bus: Arc<InMemoryEventBus>,
    unhandled: AtomicU64,
}

impl NotificationRouter {
    #[must_use]
    pub fn new(bus: Arc<InMemoryEventBus>) -> Self {
        Self {
            bus,
            unhandled: AtomicU64::new(0),
        }
    }

    /// The bus events are published on.
    #[must_use]
    pub fn bus(&self) -> &Arc<InMemoryEventBus> {
        &self.bus
    }

    /// Route one notification.
    pub async fn route(&self, notification: Notification) -> RouteOutcome {
        match notification.method.as_str() {
            methods::PROGRESS => {
                match serde_json::from_value::<ProgressParams>(notification.params) {
                    Ok(params) => {
                        self.bus
                            .publish(ProtocolEvent::Progress {
                                token: params.progress_token,
                                event: ProgressEvent {
                                    message: params.message,
                                    progress: params.progress,
                                    total: params.total,
                                },
                            })
                            .await;
                        RouteOutcome::Delivered
                    }
                    Err(e) => {
                        warn!(method = methods::PROGRESS, error = %e, "Dropping malformed notification");
                        RouteOutcome::Malformed
                    }
                }
            }
            methods::LOG_MESSAGE => {
                match serde_json::from_value::<LogMessageParams>(notification.params) {
                    Ok(params) => {
                        self.bus
                            .publish(ProtocolEvent::Log {
                                level: params.level,
                                logger: params.logger,
                                data: params.data,
                            })
                            .await;
                        RouteOutcome::Delivered
                    }
                    Err(e) => {
                        warn!(method = methods::LOG_MESSAGE, error = %e, "Dropping malformed notification");
                        RouteOutcome::Malformed
                    }
                }
            }
            other => {
                self.unhandled.fetch_add(1, Ordering::Relaxed);
                debug!(method = other, "No handler for notification");
                RouteOutcome::Unhandled
            }
        }
    }

    /// Forward one stderr line.
    pub async fn diagnostic(&self, generation: u64, line: String) {
        self.bus
            .publish(ProtocolEvent::Diagnostic { generation, line })
            .await;
    }

    /// Publish a transport lifecycle transition.
    pub async fn lifecycle(&self, event: ProtocolEvent) {
        self.bus.publish(event).await;
    }

    /// Notifications dropped for lack of a handler.
    #[must_use]
    pub fn unhandled_count(&self) -> u64 {
        self.unhandled.load(Ordering::Relaxed)
    }
}
