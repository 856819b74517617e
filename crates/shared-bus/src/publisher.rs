//! # Event Publisher
//!
//! Defines the publishing side of the event bus.

use crate::events::{EventFilter, VrfEvent};
use crate::subscriber::{EventSubscriber, Subscription};
use crate::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_HISTORY_CAPACITY};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::RequestId;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Trait for publishing lifecycle events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event to the bus.
    ///
    /// # Returns
    ///
    /// The number of active subscribers that received the event.
    async fn publish(&self, event: VrfEvent) -> usize;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;
}

/// In-memory implementation of the event bus.
///
/// Uses `tokio::sync::broadcast` for multi-producer, multi-consumer semantics
/// and keeps a bounded history so that audits can replay what happened to a
/// request after the fact.
pub struct InMemoryEventBus {
    /// Broadcast sender for events.
    sender: broadcast::Sender<VrfEvent>,

    /// Most recent events, oldest first.
    history: RwLock<VecDeque<VrfEvent>>,

    /// Maximum retained history.
    history_capacity: usize,

    /// Total events published.
    events_published: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl InMemoryEventBus {
    /// Create a new in-memory event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory event bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            history: RwLock::new(VecDeque::new()),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to events matching a filter.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(topics = ?filter.topics, "New subscription created");
        Subscription::new(self.sender.subscribe(), filter)
    }

    /// Live subscriptions. Dropped subscriptions stop counting immediately.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Retained events matching `filter`, oldest first.
    #[must_use]
    pub fn history(&self, filter: &EventFilter) -> Vec<VrfEvent> {
        self.history
            .read()
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect()
    }

    /// Retained events about one request, oldest first.
    #[must_use]
    pub fn history_for(&self, request_id: RequestId) -> Vec<VrfEvent> {
        self.history(&EventFilter::request(request_id))
    }

    fn record(&self, event: &VrfEvent) {
        let mut history = self.history.write();
        if history.len() == self.history_capacity {
            history.pop_front();
        }
        history.push_back(event.clone());
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
    async fn publish(&self, event: VrfEvent) -> usize {
        let topic = event.topic();

        self.events_published.fetch_add(1, Ordering::Relaxed);
        self.record(&event);

        match self.sender.send(event) {
            Ok(receiver_count) => {
                debug!(topic = ?topic, receivers = receiver_count, "Event published");
                receiver_count
            }
            Err(_) => {
                // No live subscribers; the event is still in history
                trace!(topic = ?topic, "Event published without subscribers");
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
