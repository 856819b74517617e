//! # Event Subscriptions
//!
//! Filtered receivers on the event bus. Publishers never wait for a slow
//! subscriber: once it falls `capacity` events behind, the oldest events are
//! dropped for it and counted in [`Subscription::missed`].

use crate::events::{EventFilter, VrfEvent};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::warn;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The event bus was dropped.
    #[error("Event bus closed")]
    Closed,
}

/// Anything that hands out filtered subscriptions.
pub trait EventSubscriber: Send + Sync {
    /// Subscribe to events matching `filter`, starting from the next publish.
    fn subscribe(&self, filter: EventFilter) -> Subscription;
}

/// A live, filtered view of the bus.
pub struct Subscription {
    receiver: broadcast::Receiver<VrfEvent>,
    filter: EventFilter,
    missed: u64,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<VrfEvent>, filter: EventFilter) -> Self {
        Self {
            receiver,
            filter,
            missed: 0,
        }
    }

    /// Next matching event, or `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<VrfEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(count)) => self.lagged(count),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching event if one is already queued.
    pub fn try_recv(&mut self) -> Result<Option<VrfEvent>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Ok(Some(event)),
                Ok(_) => {}
                Err(TryRecvError::Lagged(count)) => self.lagged(count),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Closed) => return Err(SubscriptionError::Closed),
            }
        }
    }

    /// Events dropped because this subscriber fell behind.
    ///
    /// Counts every overflowed event, matching or not.
    pub fn missed(&self) -> u64 {
        self.missed
    }

    /// The filter this subscription applies.
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    fn lagged(&mut self, count: u64) {
        self.missed = self.missed.saturating_add(count);
        warn!(dropped = count, topics = ?self.filter.topics, "Subscriber lagged; events dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventTopic;
    use crate::publisher::InMemoryEventBus;
    use crate::EventPublisher;
    use shared_types::U256;
    use std::time::Duration;
    use tokio::time::timeout;

    fn redeemed(id: u64) -> VrfEvent {
        VrfEvent::CredentialRedeemed {
            credential_id: id,
            owner: [1; 20],
            source_request_id: U256::from(id),
            timestamp: 0,
        }
    }

    fn suppressed(id: u64) -> VrfEvent {
        VrfEvent::DuplicateInboundSuppressed {
            request_id: U256::from(id),
            timestamp: 0,
        }
    }

    #[tokio::test]
    async fn test_subscription_recv() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());

        bus.publish(redeemed(1)).await;

        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("channel closed");
        assert_eq!(received, redeemed(1));
    }

    #[tokio::test]
    async fn test_subscription_filters_topics() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::topics(vec![EventTopic::Compensation]));

        bus.publish(suppressed(1)).await;
        bus.publish(redeemed(2)).await;

        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("channel closed");
        assert_eq!(received, redeemed(2));
        assert_eq!(sub.try_recv(), Ok(None));
    }

    #[tokio::test]
    async fn test_lagging_subscriber_counts_missed_events() {
        let bus = InMemoryEventBus::with_capacity(4);
        let mut sub = bus.subscribe(EventFilter::all());

        for id in 0..10 {
            bus.publish(redeemed(id)).await;
        }

        // The four newest survive; the rest are reported as missed
        assert_eq!(sub.try_recv(), Ok(Some(redeemed(6))));
        assert_eq!(sub.missed(), 6);
        let mut rest = 0;
        while let Ok(Some(_)) = sub.try_recv() {
            rest += 1;
        }
        assert_eq!(rest, 3);
    }

    #[tokio::test]
    async fn test_closed_after_bus_dropped() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());
        drop(bus);
        assert_eq!(sub.try_recv(), Err(SubscriptionError::Closed));
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn test_subscribe_through_trait_object() {
        let bus = InMemoryEventBus::new();
        let subscriber: &dyn EventSubscriber = &bus;
        let mut sub = subscriber.subscribe(EventFilter::topics(vec![EventTopic::Source]));
        assert_eq!(sub.filter().topics, vec![EventTopic::Source]);

        bus.publish(suppressed(7)).await;
        assert_eq!(sub.try_recv(), Ok(Some(suppressed(7))));
    }
}
