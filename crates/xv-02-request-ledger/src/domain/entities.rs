//! # Domain Entities
//!
//! Requests tracked by the ledger and the credentials minted for the ones
//! that time out.

use super::errors::LedgerError;
use super::invariants::{invariant_single_terminal_transition, invariant_timed_out};
use super::value_objects::RequestStatus;
use serde::{Deserialize, Serialize};
use shared_types::{Address, ChainId, CredentialId, RequestId, U256};

/// A randomness request recorded on the destination chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomnessRequest {
    /// Correlation id, unique and never reused.
    pub id: RequestId,
    /// Who receives the randomness (or the credential).
    pub requester: Address,
    /// Chain the request was created on.
    pub origin_chain: ChainId,
    /// Chain the randomness comes from.
    pub dest_chain: ChainId,
    /// Creation time.
    pub created_at: u64,
    /// Current status.
    pub status: RequestStatus,
    /// Present iff `status == Fulfilled`.
    pub random_value: Option<U256>,
    /// Proof bytes delivered with the randomness.
    pub proof: Option<Vec<u8>>,
    /// Time of the terminal transition.
    pub resolved_at: Option<u64>,
    /// Present iff `status == Compensated`.
    pub credential_id: Option<CredentialId>,
    /// Present iff `status == Rejected`.
    pub rejection_reason: Option<String>,
}

impl RandomnessRequest {
    /// New pending request.
    pub fn new(
        id: RequestId,
        requester: Address,
        origin_chain: ChainId,
        dest_chain: ChainId,
        created_at: u64,
    ) -> Self {
        Self {
            id,
            requester,
            origin_chain,
            dest_chain,
            created_at,
            status: RequestStatus::Pending,
            random_value: None,
            proof: None,
            resolved_at: None,
            credential_id: None,
            rejection_reason: None,
        }
    }

    /// Strictly older than `timeout_secs` at `now`.
    pub fn is_timed_out(&self, now: u64, timeout_secs: u64) -> bool {
        invariant_timed_out(self.created_at, now, timeout_secs)
    }

    /// Seconds since creation.
    pub fn age(&self, now: u64) -> u64 {
        now.saturating_sub(self.created_at)
    }

    fn transition(&mut self, next: RequestStatus, now: u64) -> Result<(), LedgerError> {
        invariant_single_terminal_transition(self.id, self.status, next)?;
        self.status = next;
        self.resolved_at = Some(now);
        Ok(())
    }

    /// Pending -> Fulfilled.
    pub fn mark_fulfilled(
        &mut self,
        random_value: U256,
        proof: Vec<u8>,
        now: u64,
    ) -> Result<(), LedgerError> {
        self.transition(RequestStatus::Fulfilled, now)?;
        self.random_value = Some(random_value);
        self.proof = Some(proof);
        Ok(())
    }

    /// Pending -> Compensated.
    pub fn mark_compensated(
        &mut self,
        credential_id: CredentialId,
        now: u64,
    ) -> Result<(), LedgerError> {
        self.transition(RequestStatus::Compensated, now)?;
        self.credential_id = Some(credential_id);
        Ok(())
    }

    /// Pending -> Rejected.
    pub fn mark_rejected(&mut self, reason: String, now: u64) -> Result<(), LedgerError> {
        self.transition(RequestStatus::Rejected, now)?;
        self.rejection_reason = Some(reason);
        Ok(())
    }
}

/// Redeemable token minted for a timed-out request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationCredential {
    /// Sequential id.
    pub id: CredentialId,
    /// Current holder.
    pub owner: Address,
    /// Requester of the timed-out request.
    pub original_requester: Address,
    /// The timed-out request.
    pub source_request_id: RequestId,
    /// Amount the holder is owed, fixed at mint.
    pub value: u64,
    /// Redeemed flag, set exactly once.
    pub redeemed: bool,
    /// Mint time.
    pub minted_at: u64,
    /// Redemption time.
    pub redeemed_at: Option<u64>,
}

impl CompensationCredential {
    /// Mint a credential worth `value`, owned by the request's requester.
    pub fn mint(id: CredentialId, request: &RandomnessRequest, value: u64, now: u64) -> Self {
        Self {
            id,
            owner: request.requester,
            original_requester: request.requester,
            source_request_id: request.id,
            value,
            redeemed: false,
            minted_at: now,
            redeemed_at: None,
        }
    }
}

/// Proof of a successful redemption.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionReceipt {
    /// Redeemed credential.
    pub credential_id: CredentialId,
    /// Who redeemed it.
    pub owner: Address,
    /// Request it compensated.
    pub source_request_id: RequestId,
    /// Value recorded at mint.
    pub value: u64,
    /// Redemption time.
    pub redeemed_at: u64,
}

/// One request compensated by a sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensatedRequest {
    /// The timed-out request.
    pub request_id: RequestId,
    /// Its requester.
    pub requester: Address,
    /// Credential minted for it.
    pub credential_id: CredentialId,
}

/// Result of a timeout sweep.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Requests compensated, in ascending id order.
    pub compensated: Vec<CompensatedRequest>,
    /// Pending requests still left after the sweep.
    pub still_pending: usize,
    /// True if more timed-out requests remain beyond the batch limit.
    pub batch_limited: bool,
}

impl SweepReport {
    /// Number of requests compensated.
    pub fn count(&self) -> usize {
        self.compensated.len()
    }
}

/// Ledger counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    /// All requests ever created.
    pub total: u64,
    /// Awaiting randomness or timeout.
    pub pending: u64,
    /// Randomness delivered.
    pub fulfilled: u64,
    /// Timed out and compensated.
    pub compensated: u64,
    /// Rejected by an administrator.
    pub rejected: u64,
}

impl LedgerStats {
    /// Share of resolved requests that were compensated.
    pub fn compensation_rate(&self) -> f64 {
        let resolved = self.fulfilled + self.compensated + self.rejected;
        if resolved == 0 {
            return 0.0;
        }
        self.compensated as f64 / resolved as f64
    }

    pub(crate) fn record(&mut self, status: RequestStatus) {
        match status {
            RequestStatus::Pending => {
                self.total += 1;
                self.pending += 1;
                return;
            }
            RequestStatus::Fulfilled => self.fulfilled += 1,
            RequestStatus::Compensated => self.compensated += 1,
            RequestStatus::Rejected => self.rejected += 1,
        }
        self.pending = self.pending.saturating_sub(1);
    }
}
