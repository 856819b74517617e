//! # Recording Consumer
//!
//! A consumer that remembers every delivery. Its behaviour can be switched
//! to failing or panicking to exercise callback isolation.

use crate::ports::{ConsumerError, RandomnessConsumer};
use parking_lot::Mutex;
use shared_types::{Address, RequestId, U256};

/// How the consumer responds to a delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ConsumerBehavior {
    /// Accept the value.
    #[default]
    Accept,
    /// Return an error.
    Fail,
    /// Panic inside the callback.
    Panic,
}

/// Consumer that records deliveries in order.
#[derive(Default)]
pub struct RecordingConsumer {
    deliveries: Mutex<Vec<(RequestId, Address, U256)>>,
    behavior: Mutex<ConsumerBehavior>,
}

impl RecordingConsumer {
    /// Accepting consumer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumer with a fixed behaviour.
    pub fn with_behavior(behavior: ConsumerBehavior) -> Self {
        let consumer = Self::default();
        consumer.set_behavior(behavior);
        consumer
    }

    /// Change behaviour for subsequent deliveries.
    pub fn set_behavior(&self, behavior: ConsumerBehavior) {
        *self.behavior.lock() = behavior;
    }

    /// Every delivery seen, including failed ones.
    pub fn deliveries(&self) -> Vec<(RequestId, Address, U256)> {
        self.deliveries.lock().clone()
    }

    /// Number of deliveries for one request.
    pub fn deliveries_for(&self, request_id: RequestId) -> usize {
        self.deliveries
            .lock()
            .iter()
            .filter(|(id, _, _)| *id == request_id)
            .count()
    }
}

impl RandomnessConsumer for RecordingConsumer {
    fn on_randomness_fulfilled(
        &self,
        request_id: RequestId,
        requester: Address,
        random_value: U256,
    ) -> Result<(), ConsumerError> {
        self.deliveries
            .lock()
            .push((request_id, requester, random_value));
        // Copy out so the lock is not held while panicking
        let behavior = *self.behavior.lock();
        match behavior {
            ConsumerBehavior::Accept => Ok(()),
            ConsumerBehavior::Fail => Err(ConsumerError(format!(
                "consumer refused request {request_id}"
            ))),
            ConsumerBehavior::Panic => panic!("consumer panicked on request {request_id}"),
        }
    }
}
