//! # Domain Invariants
//!
//! Checks that must hold for every request and credential.

use super::entities::{CompensationCredential, RandomnessRequest};
use super::errors::LedgerError;
use super::value_objects::RequestStatus;
use shared_types::RequestId;

/// Only `Pending` may move, and only to a terminal state.
pub fn invariant_single_terminal_transition(
    id: RequestId,
    current: RequestStatus,
    next: RequestStatus,
) -> Result<(), LedgerError> {
    if current.can_transition_to(next) {
        Ok(())
    } else {
        Err(LedgerError::AlreadyTerminal {
            id,
            status: current,
        })
    }
}

/// Strictly older than the timeout.
pub fn invariant_timed_out(created_at: u64, now: u64, timeout_secs: u64) -> bool {
    now.saturating_sub(created_at) > timeout_secs
}

/// Terminal payloads are present exactly for their own status.
pub fn invariant_outcome_matches_status(request: &RandomnessRequest) -> bool {
    let fulfilled = request.status == RequestStatus::Fulfilled;
    let compensated = request.status == RequestStatus::Compensated;
    let rejected = request.status == RequestStatus::Rejected;
    request.random_value.is_some() == fulfilled
        && request.credential_id.is_some() == compensated
        && request.rejection_reason.is_some() == rejected
        && request.resolved_at.is_some() == request.status.is_terminal()
}

/// A credential points back at a compensated request it was minted for.
pub fn invariant_credential_matches_request(
    credential: &CompensationCredential,
    request: &RandomnessRequest,
) -> bool {
    request.status == RequestStatus::Compensated
        && request.credential_id == Some(credential.id)
        && credential.source_request_id == request.id
        && credential.original_requester == request.requester
}
