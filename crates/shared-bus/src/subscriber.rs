//! # Event Subscriber
//!
//! Receiving handles. Every handle sees the whole broadcast and drops what
//! its filter rejects; its interest is withdrawn from the bus on drop.

use crate::events::{EventFilter, ProtocolEvent};
use crate::publisher::SharedInterest;
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::{debug, warn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("Event bus closed")]
    Closed,
}

/// Anything that hands out subscriptions.
pub trait EventSubscriber: Send + Sync {
    fn subscribe(&self, filter: EventFilter) -> Subscription;
}

/// Withdraws a handle's topic interest when it goes away.
struct Registration {
    interest: SharedInterest,
    filter: EventFilter,
}

impl Registration {
    fn admits(&self, event: &ProtocolEvent) -> bool {
        self.filter.matches(event)
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.interest.lock().release(&self.filter);
        debug!(topics = ?self.filter.topics, "Subscriber detached");
    }
}

/// Pull-style handle. Lagging skips ahead to the oldest retained event.
pub struct Subscription {
    receiver: broadcast::Receiver<ProtocolEvent>,
    registration: Registration,
}

impl Subscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<ProtocolEvent>,
        filter: EventFilter,
        interest: SharedInterest,
    ) -> Self {
        Self {
            receiver,
            registration: Registration { interest, filter },
        }
    }

    /// Next matching event, or `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<ProtocolEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.registration.admits(&event) => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(missed)) => warn!(missed, "Subscriber fell behind"),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching event already queued. `Ok(None)` when there is none.
    pub fn try_recv(&mut self) -> Result<Option<ProtocolEvent>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.registration.admits(&event) => return Ok(Some(event)),
                Ok(_) | Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Closed) => return Err(SubscriptionError::Closed),
            }
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.registration.filter
    }
}

/// Push-style handle for stream combinators.
pub struct EventStream {
    inner: BroadcastStream<ProtocolEvent>,
    registration: Registration,
}

impl EventStream {
    #[must_use]
    pub fn new(subscription: Subscription) -> Self {
        let Subscription {
            receiver,
            registration,
        } = subscription;
        Self {
            inner: BroadcastStream::new(receiver),
            registration,
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.registration.filter
    }
}

impl Stream for EventStream {
    type Item = ProtocolEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            let next = match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(next) => next,
                Poll::Pending => return Poll::Pending,
            };
            match next {
                Some(Ok(event)) if self.registration.admits(&event) => {
                    return Poll::Ready(Some(event))
                }
                Some(Ok(_)) => {}
                Some(Err(BroadcastStreamRecvError::Lagged(missed))) => {
                    warn!(missed, "Event stream fell behind");
                }
                None => return Poll::Ready(None),
            }
        }
    }
}
