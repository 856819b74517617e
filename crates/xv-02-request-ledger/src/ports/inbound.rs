//! # Inbound Ports
//!
//! API traits for the three destination-chain components.

use crate::domain::{
    CompensatedRequest, CompensationCredential, LedgerError, LedgerStats, RandomnessRequest, RedemptionReceipt,
    RequestStatus, SweepReport,
};
use async_trait::async_trait;
use shared_types::{Address, Caller, ChannelMessage, CredentialId, RequestId, VrfConfig};

/// Request ledger API - inbound port.
///
/// Fulfillment is deliberately absent: it is only reachable through
/// [`AccessValidatorApi::verify_and_forward`].
#[async_trait]
pub trait RequestLedgerApi: Send + Sync {
    /// Record a new pending request and send it to the source chain.
    async fn create_request(&self, requester: Address, now: u64)
        -> Result<RequestId, LedgerError>;

    /// Create a request on behalf of `requester`, if `trigger` is allowed to.
    async fn create_request_for(
        &self,
        trigger: &Caller,
        requester: Address,
        now: u64,
    ) -> Result<RequestId, LedgerError>;

    /// Administratively move a pending request to `Rejected`.
    async fn reject(
        &self,
        admin: &Caller,
        id: RequestId,
        reason: String,
        now: u64,
    ) -> Result<(), LedgerError>;

    /// Look up a request.
    fn get_request(&self, id: RequestId) -> Option<RandomnessRequest>;

    /// All requests in `status`, ascending by id.
    fn requests_by_status(&self, status: RequestStatus) -> Vec<RandomnessRequest>;

    /// All requests made by `requester`, ascending by id.
    fn requests_of(&self, requester: &Address) -> Vec<RandomnessRequest>;

    /// Number of pending requests.
    fn pending_count(&self) -> usize;

    /// Counts per status.
    fn stats(&self) -> LedgerStats;

    /// Compensated share of resolved requests.
    fn compensation_rate(&self) -> f64 {
        self.stats().compensation_rate()
    }
}

/// Access validator API - inbound port.
#[async_trait]
pub trait AccessValidatorApi: Send + Sync {
    /// Authenticate a delivered fulfillment and hand it to the ledger.
    async fn verify_and_forward(
        &self,
        caller: &Caller,
        msg: &ChannelMessage,
        now: u64,
    ) -> Result<RequestId, LedgerError>;

    /// Currently pinned VRF configuration.
    fn vrf_config(&self) -> VrfConfig;

    /// Privileged: replace the VRF configuration (and the pinned coordinator).
    async fn update_vrf_config(
        &self,
        admin: &Caller,
        config: VrfConfig,
        now: u64,
    ) -> Result<(), LedgerError>;
}

/// Compensation engine API - inbound port.
#[async_trait]
pub trait CompensationApi: Send + Sync {
    /// Compensate pending requests that have timed out.
    async fn sweep_timeouts(&self, now: u64) -> SweepReport;

    /// Privileged: record a compensated entry worth `value` for `holder`
    /// and mint its credential.
    async fn register_entry(
        &self,
        admin: &Caller,
        holder: Address,
        value: u64,
        now: u64,
    ) -> Result<CompensatedRequest, LedgerError>;

    /// Redeem a credential held by `caller`.
    async fn redeem(
        &self,
        credential_id: CredentialId,
        caller: &Caller,
        now: u64,
    ) -> Result<RedemptionReceipt, LedgerError>;

    /// Move an unredeemed credential to another holder.
    async fn transfer(
        &self,
        credential_id: CredentialId,
        from: &Caller,
        to: Address,
        now: u64,
    ) -> Result<(), LedgerError>;

    /// Look up a credential.
    fn credential(&self, id: CredentialId) -> Option<CompensationCredential>;

    /// Credentials currently held by `owner`, ascending by id.
    fn credentials_of(&self, owner: &Address) -> Vec<CompensationCredential>;

    /// Number of credentials currently held by `owner`.
    fn credential_count_of(&self, owner: &Address) -> usize;

    /// Total value of the unredeemed credentials held by `owner`.
    fn outstanding_value_of(&self, owner: &Address) -> u64;

    /// Credential minted for a request, if it was compensated.
    fn credential_for_request(&self, request_id: RequestId) -> Option<CompensationCredential>;

    /// Metadata URI for a credential.
    fn token_uri(&self, id: CredentialId) -> Result<String, LedgerError>;

    /// Privileged: change the metadata URI prefix.
    async fn set_base_uri(&self, admin: &Caller, uri: String, now: u64)
        -> Result<(), LedgerError>;
}
