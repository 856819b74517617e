//! # Value Objects

use serde::{Deserialize, Serialize};

/// Lifecycle of a randomness request.
///
/// ```text
///            ┌──► Fulfilled
/// Pending ───┼──► Compensated
///            └──► Rejected
/// ```
///
/// Exactly one terminal transition happens per request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RequestStatus {
    /// Awaiting randomness or timeout.
    #[default]
    Pending,
    /// Randomness delivered.
    Fulfilled,
    /// Timed out; a credential was minted.
    Compensated,
    /// Rejected by an administrator.
    Rejected,
}

impl RequestStatus {
    /// Check if transition is valid.
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (
                RequestStatus::Pending,
                RequestStatus::Fulfilled | RequestStatus::Compensated | RequestStatus::Rejected
            )
        )
    }

    /// Is this a terminal state?
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}
