//! # Domain Entities
//!
//! The adapter's only durable state: which local VRF request serves which
//! relay request, and what happened to it.

use super::config::TrustedPeer;
use serde::{Deserialize, Serialize};
use shared_types::{
    Address, ChainId, ChannelMessage, LocalVrfRequestId, MessageReceipt, RequestId, VrfConfig,
    U256,
};

/// Progress of one mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MappingStatus {
    /// Submitted to the local provider, waiting for its callback.
    AwaitingVrf,
    /// Randomness received; the fulfillment payload is stored for re-sends.
    Fulfilled,
}

/// Link between a relay request and a local VRF request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMapping {
    /// Correlation id from the destination chain.
    pub request_id: RequestId,
    /// Requester to echo back.
    pub requester: Address,
    /// Id issued by the local provider.
    pub local_vrf_id: LocalVrfRequestId,
    /// Chain to send the fulfillment to.
    pub reply_chain: ChainId,
    /// Application to send the fulfillment to.
    pub reply_to: Address,
    /// When the inbound request was accepted.
    pub received_at: u64,
    /// Current status.
    pub status: MappingStatus,
    /// First random word, once known.
    pub random_value: Option<U256>,
    /// Encoded fulfillment, once built.
    pub fulfillment_payload: Option<Vec<u8>>,
    /// Successful channel sends of the fulfillment.
    pub sends: u32,
    /// When randomness arrived.
    pub fulfilled_at: Option<u64>,
}

impl RequestMapping {
    /// New mapping awaiting the provider.
    pub fn new(
        request_id: RequestId,
        requester: Address,
        local_vrf_id: LocalVrfRequestId,
        reply_chain: ChainId,
        reply_to: Address,
        received_at: u64,
    ) -> Self {
        Self {
            request_id,
            requester,
            local_vrf_id,
            reply_chain,
            reply_to,
            received_at,
            status: MappingStatus::AwaitingVrf,
            random_value: None,
            fulfillment_payload: None,
            sends: 0,
            fulfilled_at: None,
        }
    }

    /// Record the randomness and its encoded fulfillment.
    pub fn record_fulfillment(&mut self, random_value: U256, payload: Vec<u8>, now: u64) {
        self.status = MappingStatus::Fulfilled;
        self.random_value = Some(random_value);
        self.fulfillment_payload = Some(payload);
        self.fulfilled_at = Some(now);
    }

    /// True once the mapping is older than `horizon_secs`.
    pub fn is_expired(&self, now: u64, horizon_secs: u64) -> bool {
        now.saturating_sub(self.received_at) > horizon_secs
    }
}

/// Result of handling an inbound request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InboundOutcome {
    /// A new local VRF request was submitted.
    Submitted(LocalVrfRequestId),
    /// The correlation id was already known; nothing was submitted.
    Duplicate,
}

/// Result of forwarding randomness.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// The channel accepted the fulfillment.
    Sent(MessageReceipt),
    /// The channel refused; the payload is retained for `resend`.
    Deferred {
        /// Why the send failed.
        reason: String,
    },
}

/// Inputs the adapter reacts to.
#[derive(Clone, Debug)]
pub enum SourceMessage {
    /// A message delivered by the cross-chain channel.
    Inbound(ChannelMessage),
    /// The local provider's callback.
    VrfFulfilled {
        /// Local request id.
        local_id: LocalVrfRequestId,
        /// Random words produced.
        random_words: Vec<U256>,
    },
}

/// What `handle` did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceOutcome {
    /// An inbound request was processed.
    Inbound(InboundOutcome),
    /// A provider callback was processed.
    Forward(ForwardOutcome),
}

/// Read-only view of the adapter's VRF state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VrfStateSnapshot {
    /// Active provider configuration.
    pub config: VrfConfig,
    /// Requester endpoint being served.
    pub trusted_peer: TrustedPeer,
    /// Requests currently being submitted to the provider.
    pub submitting: usize,
    /// Mappings waiting for the provider callback.
    pub awaiting_vrf: usize,
    /// Mappings whose randomness has been received.
    pub fulfilled: usize,
}
