//! # Event Publisher
//!
//! The sending half of the bus. Publishing is topic-aware: when no live
//! handle asked for an event's topic the event is counted and discarded
//! without touching the channel.

use crate::events::{EventFilter, EventTopic, ProtocolEvent};
use crate::subscriber::{EventStream, EventSubscriber, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Sink for out-of-band events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Deliver an event, returning how many handles it reached.
    async fn publish(&self, event: ProtocolEvent) -> usize;

    /// Events handed to `publish` so far, delivered or not.
    fn events_published(&self) -> u64;
}

/// Which topics the live handles are listening for.
#[derive(Debug, Default)]
pub(crate) struct Interest {
    wildcard: usize,
    by_topic: HashMap<EventTopic, usize>,
}

impl Interest {
    fn is_wildcard(filter: &EventFilter) -> bool {
        filter.topics.is_empty() || filter.topics.contains(&EventTopic::All)
    }

    pub(crate) fn register(&mut self, filter: &EventFilter) {
        if Self::is_wildcard(filter) {
            self.wildcard += 1;
            return;
        }
        for topic in &filter.topics {
            *self.by_topic.entry(*topic).or_insert(0) += 1;
        }
    }

    pub(crate) fn release(&mut self, filter: &EventFilter) {
        if Self::is_wildcard(filter) {
            self.wildcard = self.wildcard.saturating_sub(1);
            return;
        }
        for topic in &filter.topics {
            if let Some(count) = self.by_topic.get_mut(topic) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    self.by_topic.remove(topic);
                }
            }
        }
    }

    fn wants(&self, topic: EventTopic) -> bool {
        self.wildcard > 0 || self.by_topic.contains_key(&topic)
    }

    fn listeners(&self, topic: EventTopic) -> usize {
        self.wildcard + self.by_topic.get(&topic).copied().unwrap_or(0)
    }
}

pub(crate) type SharedInterest = Arc<Mutex<Interest>>;

/// Counters for a bus, taken at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    pub published: u64,
    /// Published events nobody was listening for.
    pub unheard: u64,
    pub subscribers: usize,
}

/// Bus backed by `tokio::sync::broadcast`.
///
/// A slow handle loses only its own oldest events once `capacity` is
/// exceeded; the publisher never waits.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<ProtocolEvent>,
    interest: SharedInterest,
    published: AtomicU64,
    unheard: AtomicU64,
    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            interest: Arc::new(Mutex::new(Interest::default())),
            published: AtomicU64::new(0),
            unheard: AtomicU64::new(0),
            capacity,
        }
    }

    /// Attach a handle for events matching `filter`. Dropping it detaches.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        self.interest.lock().register(&filter);
        debug!(topics = ?filter.topics, "Subscriber attached");
        Subscription::new(self.sender.subscribe(), filter, Arc::clone(&self.interest))
    }

    /// Same as [`subscribe`](Self::subscribe), as a `Stream`.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.subscribe(filter))
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Live handles whose filter admits `topic`.
    #[must_use]
    pub fn listeners(&self, topic: EventTopic) -> usize {
        self.interest.lock().listeners(topic)
    }

    #[must_use]
    pub fn stats(&self) -> BusStats {
        BusStats {
            published: self.published.load(Ordering::Relaxed),
            unheard: self.unheard.load(Ordering::Relaxed),
            subscribers: self.subscriber_count(),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, filter: EventFilter) -> Subscription {
        InMemoryEventBus::subscribe(self, filter)
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: ProtocolEvent) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);
        let topic = event.topic();

        if !self.interest.lock().wants(topic) {
            // A headless client has no listeners at all.
            self.unheard.fetch_add(1, Ordering::Relaxed);
            trace!(?topic, origin = event.origin(), "No listener for event");
            return 0;
        }

        let origin = event.origin();
        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(?topic, origin, receivers, "Event published");
                receivers
            }
            Err(_) => {
                self.unheard.fetch_add(1, Ordering::Relaxed);
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}
