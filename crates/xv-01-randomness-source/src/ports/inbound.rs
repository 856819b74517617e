//! # Inbound Ports
//!
//! API trait defining what the Randomness Source Adapter can do.

use crate::domain::{
    ForwardOutcome, InboundOutcome, RequestMapping, SourceError, SourceMessage, SourceOutcome,
    TrustedPeer, VrfStateSnapshot,
};
use async_trait::async_trait;
use shared_types::{
    Caller, ChannelMessage, LocalVrfRequestId, MessageReceipt, RequestId, VrfConfig, U256,
};

/// Randomness source API - inbound port.
#[async_trait]
pub trait RandomnessSourceApi: Send + Sync {
    /// Handle a request delivered by the channel. Idempotent per request id.
    async fn on_inbound_request(
        &self,
        msg: ChannelMessage,
        now: u64,
    ) -> Result<InboundOutcome, SourceError>;

    /// Handle the local provider's callback and forward the first word.
    async fn on_local_vrf_fulfilled(
        &self,
        local_id: LocalVrfRequestId,
        random_words: Vec<U256>,
        now: u64,
    ) -> Result<ForwardOutcome, SourceError>;

    /// Re-send the stored fulfillment for a request.
    async fn resend(&self, request_id: RequestId, now: u64)
        -> Result<MessageReceipt, SourceError>;

    /// Dispatch any adapter input.
    async fn handle(&self, message: SourceMessage, now: u64)
        -> Result<SourceOutcome, SourceError>;

    /// Evict mappings older than the GC horizon. Returns how many were removed.
    fn collect_garbage(&self, now: u64) -> usize;

    /// Current configuration and in-flight counts.
    fn vrf_state(&self) -> VrfStateSnapshot;

    /// Mapping for a correlation id, if one exists.
    fn mapping_for(&self, request_id: RequestId) -> Option<RequestMapping>;

    /// Privileged: replace the VRF provider configuration.
    async fn update_vrf_config(
        &self,
        caller: &Caller,
        config: VrfConfig,
        now: u64,
    ) -> Result<(), SourceError>;

    /// Privileged: replace the trusted requester endpoint.
    async fn update_trusted_peer(
        &self,
        caller: &Caller,
        peer: TrustedPeer,
        now: u64,
    ) -> Result<(), SourceError>;
}
