//! Randomness Source Service
//!
//! Orchestrates the adapter: authenticates channel peers, deduplicates
//! redelivered requests, drives the local VRF provider and sends fulfillments
//! back over the channel.
//!
//! ## Idempotency
//!
//! The request index holds a `Submitting` slot for the duration of the
//! provider call. A redelivery that arrives while the first copy is still
//! awaiting the provider sees the slot and is suppressed, so at most one
//! provider request exists per correlation id. A failed submission releases
//! the slot so that a later redelivery can try again. So does a submission
//! whose future is dropped before the provider answers.

use crate::domain::{
    ForwardOutcome, InboundOutcome, MappingStatus, RequestMapping, SourceConfig, SourceError,
    SourceMessage, SourceOutcome, TrustedPeer, VrfStateSnapshot,
};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::ports::{RandomnessSourceApi, VrfProvider, VrfRequestParams};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_bus::{EventPublisher, MessageChannel, VrfEvent};
use shared_types::{
    address_hex, sign_fulfillment, Caller, ChannelMessage, ConfigError, FulfillmentPayload,
    LocalVrfRequestId, ManagedConfig, MessageReceipt, RequestId, RequestPayload, Validate,
    VrfConfig, U256,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug)]
enum Slot {
    Submitting,
    Mapped(LocalVrfRequestId),
}

#[derive(Default)]
struct SourceState {
    by_request: HashMap<RequestId, Slot>,
    mappings: HashMap<LocalVrfRequestId, RequestMapping>,
}

/// A held `Submitting` slot. Dropping it without `complete` frees the slot.
struct Reservation<'a> {
    state: &'a RwLock<SourceState>,
    request_id: RequestId,
    held: bool,
}

impl Reservation<'_> {
    fn complete(mut self) {
        self.held = false;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.held {
            return;
        }
        let mut state = self.state.write();
        if matches!(state.by_request.get(&self.request_id), Some(Slot::Submitting)) {
            state.by_request.remove(&self.request_id);
            debug!(request_id = %self.request_id, "[xv-01] Released unfinished submission slot");
        }
    }
}

/// Randomness Source Adapter implementation.
pub struct RandomnessSourceService<P: VrfProvider, C: MessageChannel> {
    provider: Arc<P>,
    channel: Arc<C>,
    events: Arc<dyn EventPublisher>,
    config: SourceConfig,
    vrf_config: ManagedConfig<VrfConfig>,
    trusted_peer: ManagedConfig<TrustedPeer>,
    state: RwLock<SourceState>,
    metrics: Metrics,
}

impl<P: VrfProvider, C: MessageChannel> RandomnessSourceService<P, C> {
    /// Create a new service. Both configs are validated.
    pub fn new(
        provider: Arc<P>,
        channel: Arc<C>,
        events: Arc<dyn EventPublisher>,
        config: SourceConfig,
        vrf_config: VrfConfig,
    ) -> Result<Self, SourceError> {
        config.validate()?;
        let vrf_config = ManagedConfig::new(vrf_config, config.admin)?;
        let trusted_peer = ManagedConfig::new(config.trusted_peer, config.admin)?;
        Ok(Self {
            provider,
            channel,
            events,
            config,
            vrf_config,
            trusted_peer,
            state: RwLock::new(SourceState::default()),
            metrics: Metrics::new(),
        })
    }

    /// Metrics snapshot.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Static configuration.
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn reject_peer(&self, msg: &ChannelMessage, err: SourceError, now: u64) -> SourceError {
        Metrics::inc(&self.metrics.auth_failures);
        warn!(
            target: "xv::security",
            src_chain = %msg.src_chain,
            sender = %address_hex(&msg.sender),
            reason = %err,
            "[xv-01] Rejected inbound message from untrusted peer"
        );
        self.events
            .publish(VrfEvent::AuthorizationFailed {
                component: "randomness-source".into(),
                caller: msg.sender,
                src_chain: Some(msg.src_chain),
                reason: err.to_string(),
                timestamp: now,
            })
            .await;
        err
    }

    fn check_peer(&self, msg: &ChannelMessage) -> Result<(), SourceError> {
        let peer = self.trusted_peer.get();
        if msg.src_chain != peer.chain {
            return Err(SourceError::UntrustedChain {
                expected: peer.chain,
                actual: msg.src_chain,
            });
        }
        if msg.sender != peer.address {
            return Err(SourceError::UntrustedPeer {
                sender: address_hex(&msg.sender),
            });
        }
        Ok(())
    }

    /// Reserve the request id. `None` if it is already known.
    fn reserve(&self, request_id: RequestId) -> Option<Reservation<'_>> {
        let mut state = self.state.write();
        if state.by_request.contains_key(&request_id) {
            return None;
        }
        state.by_request.insert(request_id, Slot::Submitting);
        Some(Reservation {
            state: &self.state,
            request_id,
            held: true,
        })
    }

    async fn send_fulfillment(
        &self,
        mapping: &RequestMapping,
        payload: Vec<u8>,
    ) -> Result<MessageReceipt, SourceError> {
        let receipt = self
            .channel
            .send(mapping.reply_chain, mapping.reply_to, payload)
            .await?;
        if let Some(m) = self.state.write().mappings.get_mut(&mapping.local_vrf_id) {
            m.sends += 1;
        }
        Ok(receipt)
    }

    async fn publish_config_update(&self, caller: &Caller, now: u64) {
        self.events
            .publish(VrfEvent::ConfigUpdated {
                component: "randomness-source".into(),
                admin: caller.address,
                timestamp: now,
            })
            .await;
    }
}

#[async_trait]
impl<P, C> RandomnessSourceApi for RandomnessSourceService<P, C>
where
    P: VrfProvider + 'static,
    C: MessageChannel + 'static,
{
    async fn on_inbound_request(
        &self,
        msg: ChannelMessage,
        now: u64,
    ) -> Result<InboundOutcome, SourceError> {
        if let Err(e) = self.check_peer(&msg) {
            return Err(self.reject_peer(&msg, e, now).await);
        }
        let request = RequestPayload::decode(&msg.payload)?;
        Metrics::inc(&self.metrics.inbound_accepted);

        let Some(reservation) = self.reserve(request.id) else {
            Metrics::inc(&self.metrics.duplicates_suppressed);
            debug!(request_id = %request.id, guid = %msg.guid, "[xv-01] Duplicate inbound request suppressed");
            self.events
                .publish(VrfEvent::DuplicateInboundSuppressed {
                    request_id: request.id,
                    timestamp: now,
                })
                .await;
            return Ok(InboundOutcome::Duplicate);
        };

        let params = self.vrf_config.with(|c| VrfRequestParams::from(c));
        let local_id = match self.provider.request_random_words(params).await {
            Ok(id) => id,
            Err(e) => {
                drop(reservation);
                Metrics::inc(&self.metrics.provider_failures);
                warn!(request_id = %request.id, error = %e, "[xv-01] VRF submission failed; awaiting redelivery");
                return Err(e.into());
            }
        };

        {
            let mut state = self.state.write();
            state.by_request.insert(request.id, Slot::Mapped(local_id));
            state.mappings.insert(
                local_id,
                RequestMapping::new(
                    request.id,
                    request.requester,
                    local_id,
                    msg.src_chain,
                    msg.sender,
                    now,
                ),
            );
        }
        reservation.complete();
        Metrics::inc(&self.metrics.vrf_submissions);

        info!(request_id = %request.id, local_vrf_id = %local_id, "[xv-01] Submitted VRF request");
        self.events
            .publish(VrfEvent::InboundRequestAccepted {
                request_id: request.id,
                local_vrf_id: local_id,
                timestamp: now,
            })
            .await;
        Ok(InboundOutcome::Submitted(local_id))
    }

    async fn on_local_vrf_fulfilled(
        &self,
        local_id: LocalVrfRequestId,
        random_words: Vec<U256>,
        now: u64,
    ) -> Result<ForwardOutcome, SourceError> {
        let mapping = {
            let state = self.state.read();
            match state.mappings.get(&local_id) {
                Some(m) => m.clone(),
                None => {
                    Metrics::inc(&self.metrics.unknown_callbacks);
                    warn!(local_vrf_id = %local_id, "[xv-01] Provider callback for unknown local request");
                    return Err(SourceError::UnknownLocalRequest(local_id));
                }
            }
        };
        if mapping.status == MappingStatus::Fulfilled {
            return Err(SourceError::AlreadyForwarded(mapping.request_id));
        }
        let random_value = *random_words
            .first()
            .ok_or(SourceError::EmptyRandomWords(local_id))?;

        let proof = sign_fulfillment(
            &self.config.proof_key,
            mapping.request_id,
            &mapping.requester,
            random_value,
        )
        .map_err(|e| SourceError::Proof(e.to_string()))?;
        let payload = FulfillmentPayload {
            id: mapping.request_id,
            requester: mapping.requester,
            random_value,
            proof: proof.to_vec(),
        }
        .encode()?;

        // Record before sending so that a failed send can be retried
        {
            let mut state = self.state.write();
            match state.mappings.get_mut(&local_id) {
                Some(m) if m.status == MappingStatus::AwaitingVrf => {
                    m.record_fulfillment(random_value, payload.clone(), now);
                }
                Some(m) => return Err(SourceError::AlreadyForwarded(m.request_id)),
                None => return Err(SourceError::UnknownLocalRequest(local_id)),
            }
        }

        match self.send_fulfillment(&mapping, payload).await {
            Ok(receipt) => {
                Metrics::inc(&self.metrics.fulfillments_forwarded);
                info!(
                    request_id = %mapping.request_id,
                    local_vrf_id = %local_id,
                    nonce = receipt.nonce,
                    "[xv-01] Fulfillment forwarded"
                );
                self.events
                    .publish(VrfEvent::FulfillmentForwarded {
                        request_id: mapping.request_id,
                        local_vrf_id: local_id,
                        timestamp: now,
                    })
                    .await;
                Ok(ForwardOutcome::Sent(receipt))
            }
            Err(e) => {
                Metrics::inc(&self.metrics.forward_failures);
                warn!(
                    request_id = %mapping.request_id,
                    error = %e,
                    "[xv-01] Fulfillment send failed; retained for resend"
                );
                Ok(ForwardOutcome::Deferred {
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn resend(&self, request_id: RequestId, now: u64) -> Result<MessageReceipt, SourceError> {
        let (mapping, payload) = {
            let state = self.state.read();
            let local_id = match state.by_request.get(&request_id) {
                Some(Slot::Mapped(id)) => *id,
                Some(Slot::Submitting) => return Err(SourceError::NotYetFulfilled(request_id)),
                None => return Err(SourceError::UnknownRequest(request_id)),
            };
            let mapping = state
                .mappings
                .get(&local_id)
                .cloned()
                .ok_or(SourceError::UnknownRequest(request_id))?;
            let payload = mapping
                .fulfillment_payload
                .clone()
                .ok_or(SourceError::NotYetFulfilled(request_id))?;
            (mapping, payload)
        };

        let receipt = self.send_fulfillment(&mapping, payload).await?;
        Metrics::inc(&self.metrics.resends);
        info!(request_id = %request_id, nonce = receipt.nonce, "[xv-01] Fulfillment re-sent");
        self.events
            .publish(VrfEvent::FulfillmentForwarded {
                request_id,
                local_vrf_id: mapping.local_vrf_id,
                timestamp: now,
            })
            .await;
        Ok(receipt)
    }

    async fn handle(&self, message: SourceMessage, now: u64) -> Result<SourceOutcome, SourceError> {
        match message {
            SourceMessage::Inbound(msg) => self
                .on_inbound_request(msg, now)
                .await
                .map(SourceOutcome::Inbound),
            SourceMessage::VrfFulfilled {
                local_id,
                random_words,
            } => self
                .on_local_vrf_fulfilled(local_id, random_words, now)
                .await
                .map(SourceOutcome::Forward),
        }
    }

    fn collect_garbage(&self, now: u64) -> usize {
        let horizon = self.config.gc_horizon_secs;
        let mut state = self.state.write();
        let expired: Vec<_> = state
            .mappings
            .values()
            .filter(|m| m.is_expired(now, horizon))
            .map(|m| (m.local_vrf_id, m.request_id))
            .collect();
        for (local_id, request_id) in &expired {
            state.mappings.remove(local_id);
            state.by_request.remove(request_id);
        }
        drop(state);

        if !expired.is_empty() {
            self.metrics.record_collected(expired.len());
            info!(evicted = expired.len(), "[xv-01] Collected expired mappings");
        }
        expired.len()
    }

    fn vrf_state(&self) -> VrfStateSnapshot {
        let state = self.state.read();
        let submitting = state
            .by_request
            .values()
            .filter(|s| matches!(s, Slot::Submitting))
            .count();
        let fulfilled = state
            .mappings
            .values()
            .filter(|m| m.status == MappingStatus::Fulfilled)
            .count();
        VrfStateSnapshot {
            config: self.vrf_config.get(),
            trusted_peer: self.trusted_peer.get(),
            submitting,
            awaiting_vrf: state.mappings.len() - fulfilled,
            fulfilled,
        }
    }

    fn mapping_for(&self, request_id: RequestId) -> Option<RequestMapping> {
        let state = self.state.read();
        match state.by_request.get(&request_id)? {
            Slot::Mapped(local_id) => state.mappings.get(local_id).cloned(),
            Slot::Submitting => None,
        }
    }

    async fn update_vrf_config(
        &self,
        caller: &Caller,
        config: VrfConfig,
        now: u64,
    ) -> Result<(), SourceError> {
        self.vrf_config.update(caller, config).map_err(|e| {
            if matches!(e, ConfigError::NotAdmin { .. }) {
                warn!(target: "xv::security", caller = %address_hex(&caller.address), "[xv-01] Unauthorized VRF config update");
            }
            SourceError::from(e)
        })?;
        self.publish_config_update(caller, now).await;
        Ok(())
    }

    async fn update_trusted_peer(
        &self,
        caller: &Caller,
        peer: TrustedPeer,
        now: u64,
    ) -> Result<(), SourceError> {
        if peer.chain == self.config.local_chain {
            return Err(ConfigError::Invalid {
                field: "trusted_peer.chain",
                reason: "must differ from local_chain".into(),
            }
            .into());
        }
        self.trusted_peer.update(caller, peer).map_err(|e| {
            if matches!(e, ConfigError::NotAdmin { .. }) {
                warn!(target: "xv::security", caller = %address_hex(&caller.address), "[xv-01] Unauthorized trusted peer update");
            }
            SourceError::from(e)
        })?;
        info!(chain = %peer.chain, address = %address_hex(&peer.address), "[xv-01] Trusted peer updated");
        self.publish_config_update(caller, now).await;
        Ok(())
    }
}
