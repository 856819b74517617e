//! # Outbound Ports
//!
//! Dependencies the ledger calls out to. The message channel and event
//! publisher ports come from `shared-bus`.

use shared_types::{Address, RequestId, U256};
use thiserror::Error;

/// Failure reported by a consumer callback.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ConsumerError(pub String);

/// Application that receives delivered randomness.
///
/// Called synchronously after the request is already `Fulfilled`. Errors and
/// panics are caught and reported; they never undo the fulfillment.
pub trait RandomnessConsumer: Send + Sync {
    /// Randomness for `request_id` has arrived.
    fn on_randomness_fulfilled(
        &self,
        request_id: RequestId,
        requester: Address,
        random_value: U256,
    ) -> Result<(), ConsumerError>;
}
