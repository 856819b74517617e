//! # Access Validator
//!
//! The only path to [`RequestLedger::fulfill`]. A delivered fulfillment must
//! pass, in order:
//!
//! 1. the invoker is an externally owned account,
//! 2. the message came from the configured source chain,
//! 3. the message sender is the pinned coordinator,
//! 4. the payload decodes.
//!
//! Authorization failures are logged on the `xv::security` target and never
//! reach the ledger.

use crate::domain::{AuthFailure, LedgerError};
use crate::metrics::Metrics;
use crate::ports::AccessValidatorApi;
use crate::service::RequestLedger;
use async_trait::async_trait;
use shared_bus::{EventPublisher, MessageChannel, VrfEvent};
use shared_types::{
    address_hex, Caller, ChainId, ChannelMessage, ConfigError, FulfillmentPayload, ManagedConfig,
    RequestId, VrfConfig,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Access Validator implementation.
pub struct AccessValidator<C: MessageChannel> {
    ledger: Arc<RequestLedger<C>>,
    vrf_config: ManagedConfig<VrfConfig>,
    source_chain: ChainId,
    events: Arc<dyn EventPublisher>,
    metrics: Arc<Metrics>,
}

impl<C: MessageChannel> AccessValidator<C> {
    /// Create a validator in front of `ledger`. The ledger admin also
    /// administers the VRF config.
    pub fn new(ledger: Arc<RequestLedger<C>>, vrf_config: VrfConfig) -> Result<Self, LedgerError> {
        let admin = ledger.config().admin;
        let source_chain = ledger.config().source_chain;
        Ok(Self {
            vrf_config: ManagedConfig::new(vrf_config, admin)?,
            source_chain,
            events: ledger.events(),
            metrics: ledger.shared_metrics(),
            ledger,
        })
    }

    /// Validator whose coordinator is the ledger's configured source adapter.
    pub fn for_ledger(ledger: Arc<RequestLedger<C>>) -> Result<Self, LedgerError> {
        let vrf_config = VrfConfig {
            coordinator: ledger.config().source_adapter,
            ..VrfConfig::default()
        };
        Self::new(ledger, vrf_config)
    }

    fn authorize(&self, caller: &Caller, msg: &ChannelMessage) -> Result<(), AuthFailure> {
        if !caller.is_account() {
            return Err(AuthFailure::ContractCaller);
        }
        if msg.src_chain != self.source_chain {
            return Err(AuthFailure::UntrustedChain {
                expected: self.source_chain,
                actual: msg.src_chain,
            });
        }
        let coordinator = self.vrf_config.with(|c| c.coordinator);
        if msg.sender != coordinator {
            return Err(AuthFailure::CoordinatorMismatch {
                expected: address_hex(&coordinator),
                actual: address_hex(&msg.sender),
            });
        }
        Ok(())
    }

    async fn deny(
        &self,
        caller: &Caller,
        msg: &ChannelMessage,
        failure: AuthFailure,
        now: u64,
    ) -> LedgerError {
        Metrics::inc(&self.metrics.auth_failures);
        warn!(
            target: "xv::security",
            caller = %address_hex(&caller.address),
            src_chain = %msg.src_chain,
            sender = %address_hex(&msg.sender),
            reason = %failure,
            "[xv-02] Fulfillment authorization failed"
        );
        self.events
            .publish(VrfEvent::AuthorizationFailed {
                component: "access-validator".into(),
                caller: caller.address,
                src_chain: Some(msg.src_chain),
                reason: failure.to_string(),
                timestamp: now,
            })
            .await;
        LedgerError::UnauthorizedCaller(failure)
    }
}

#[async_trait]
impl<C> AccessValidatorApi for AccessValidator<C>
where
    C: MessageChannel + 'static,
{
    async fn verify_and_forward(
        &self,
        caller: &Caller,
        msg: &ChannelMessage,
        now: u64,
    ) -> Result<RequestId, LedgerError> {
        if let Err(failure) = self.authorize(caller, msg) {
            return Err(self.deny(caller, msg, failure, now).await);
        }

        let payload = FulfillmentPayload::decode(&msg.payload).map_err(|e| {
            Metrics::inc(&self.metrics.bad_encodings);
            debug!(guid = %msg.guid, error = %e, "[xv-02] Undecodable fulfillment");
            LedgerError::BadEncoding(e)
        })?;

        self.ledger
            .fulfill(
                payload.id,
                payload.requester,
                payload.random_value,
                payload.proof,
                now,
            )
            .await?;
        Ok(payload.id)
    }

    fn vrf_config(&self) -> VrfConfig {
        self.vrf_config.get()
    }

    async fn update_vrf_config(
        &self,
        admin: &Caller,
        config: VrfConfig,
        now: u64,
    ) -> Result<(), LedgerError> {
        self.vrf_config.update(admin, config).map_err(|e| {
            if matches!(e, ConfigError::NotAdmin { .. }) {
                Metrics::inc(&self.metrics.auth_failures);
                warn!(target: "xv::security", caller = %address_hex(&admin.address), "[xv-02] Unauthorized VRF config update");
            }
            LedgerError::from(e)
        })?;
        self.events
            .publish(VrfEvent::ConfigUpdated {
                component: "access-validator".into(),
                admin: admin.address,
                timestamp: now,
            })
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LedgerConfig, RequestStatus};
    use crate::ports::RequestLedgerApi;
    use shared_bus::{ChannelEndpoint, EventFilter, EventTopic, InMemoryEventBus, InMemoryTransport};
    use shared_types::{CodecError, U256};

    const DEST: ChainId = ChainId(30332);
    const SOURCE: ChainId = ChainId(30110);
    const LEDGER: [u8; 20] = [0x1E; 20];
    const ADAPTER: [u8; 20] = [0xAD; 20];
    const ADMIN: [u8; 20] = [0xA0; 20];
    const ALICE: [u8; 20] = [0x11; 20];
    const RELAYER: [u8; 20] = [0x77; 20];

    struct Fixture {
        transport: InMemoryTransport,
        bus: Arc<InMemoryEventBus>,
        ledger: Arc<RequestLedger<ChannelEndpoint>>,
        validator: AccessValidator<ChannelEndpoint>,
    }

    fn fixture() -> Fixture {
        let transport = InMemoryTransport::new();
        let bus = Arc::new(InMemoryEventBus::new());
        let ledger = Arc::new(
            RequestLedger::new(
                Arc::new(transport.endpoint(DEST, LEDGER)),
                bus.clone(),
                LedgerConfig {
                    local_chain: DEST,
                    source_chain: SOURCE,
                    source_adapter: ADAPTER,
                    authorized_triggers: Vec::new(),
                    admin: ADMIN,
                },
            )
            .unwrap(),
        );
        let validator = AccessValidator::for_ledger(ledger.clone()).unwrap();
        Fixture {
            transport,
            bus,
            ledger,
            validator,
        }
    }

    /// Send a fulfillment from `(chain, sender)` and take it off the wire.
    async fn delivered(
        f: &Fixture,
        chain: ChainId,
        sender: [u8; 20],
        payload: Vec<u8>,
    ) -> ChannelMessage {
        f.transport
            .endpoint(chain, sender)
            .send(DEST, LEDGER, payload)
            .await
            .unwrap();
        f.transport.take_for(DEST).pop().unwrap()
    }

    fn fulfillment(id: RequestId, value: u64) -> Vec<u8> {
        FulfillmentPayload {
            id,
            requester: ALICE,
            random_value: U256::from(value),
            proof: vec![0xAB; 32],
        }
        .encode()
        .unwrap()
    }

    #[tokio::test]
    async fn test_valid_fulfillment_forwarded() {
        let f = fixture();
        let id = f.ledger.create_request(ALICE, 0).await.unwrap();
        let msg = delivered(&f, SOURCE, ADAPTER, fulfillment(id, 42)).await;

        let got = f
            .validator
            .verify_and_forward(&Caller::account(RELAYER), &msg, 10)
            .await
            .unwrap();
        assert_eq!(got, id);
        let req = f.ledger.get_request(id).unwrap();
        assert_eq!(req.status, RequestStatus::Fulfilled);
        assert_eq!(req.proof, Some(vec![0xAB; 32]));
    }

    #[tokio::test]
    async fn test_contract_caller_rejected() {
        let f = fixture();
        let id = f.ledger.create_request(ALICE, 0).await.unwrap();
        let msg = delivered(&f, SOURCE, ADAPTER, fulfillment(id, 42)).await;

        let err = f
            .validator
            .verify_and_forward(&Caller::contract(RELAYER), &msg, 10)
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::UnauthorizedCaller(AuthFailure::ContractCaller));
        assert_eq!(f.ledger.get_request(id).unwrap().status, RequestStatus::Pending);
    }

    #[tokio::test]
    async fn test_wrong_chain_rejected() {
        let f = fixture();
        let id = f.ledger.create_request(ALICE, 0).await.unwrap();
        let msg = delivered(&f, ChainId(999), ADAPTER, fulfillment(id, 42)).await;

        let err = f
            .validator
            .verify_and_forward(&Caller::account(RELAYER), &msg, 10)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::UnauthorizedCaller(AuthFailure::UntrustedChain { .. })
        ));
    }

    #[tokio::test]
    async fn test_coordinator_mismatch_rejected_and_audited() {
        let f = fixture();
        let id = f.ledger.create_request(ALICE, 0).await.unwrap();
        let msg = delivered(&f, SOURCE, [0x66; 20], fulfillment(id, 42)).await;

        let err = f
            .validator
            .verify_and_forward(&Caller::account(RELAYER), &msg, 10)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::UnauthorizedCaller(AuthFailure::CoordinatorMismatch { .. })
        ));
        assert_eq!(f.ledger.get_request(id).unwrap().status, RequestStatus::Pending);
        assert_eq!(f.ledger.metrics().auth_failures, 1);
        let security = f.bus.history(&EventFilter::topics(vec![EventTopic::Security]));
        assert_eq!(security.len(), 1);
    }

    #[tokio::test]
    async fn test_bad_encoding_surfaced() {
        let f = fixture();
        let msg = delivered(&f, SOURCE, ADAPTER, vec![1, 2, 3]).await;

        let err = f
            .validator
            .verify_and_forward(&Caller::account(RELAYER), &msg, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::BadEncoding(CodecError::Truncated { .. })));
        assert_eq!(f.ledger.metrics().bad_encodings, 1);
    }

    #[tokio::test]
    async fn test_duplicate_delivery_is_terminal() {
        let f = fixture();
        let id = f.ledger.create_request(ALICE, 0).await.unwrap();
        let msg = delivered(&f, SOURCE, ADAPTER, fulfillment(id, 42)).await;
        let relayer = Caller::account(RELAYER);

        f.validator.verify_and_forward(&relayer, &msg, 10).await.unwrap();
        let err = f
            .validator
            .verify_and_forward(&relayer, &msg, 11)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyTerminal { .. }));
        assert_eq!(
            f.ledger.get_request(id).unwrap().random_value,
            Some(U256::from(42u64))
        );
    }

    #[tokio::test]
    async fn test_update_vrf_config_repins_coordinator() {
        let f = fixture();
        let id = f.ledger.create_request(ALICE, 0).await.unwrap();
        let new_coordinator = [0x99; 20];
        let config = VrfConfig {
            coordinator: new_coordinator,
            ..f.validator.vrf_config()
        };

        let err = f
            .validator
            .update_vrf_config(&Caller::account(ALICE), config.clone(), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Config(ConfigError::NotAdmin { .. })));

        f.validator
            .update_vrf_config(&Caller::account(ADMIN), config, 5)
            .await
            .unwrap();

        let old = delivered(&f, SOURCE, ADAPTER, fulfillment(id, 1)).await;
        assert!(f
            .validator
            .verify_and_forward(&Caller::account(RELAYER), &old, 10)
            .await
            .is_err());
        let new = delivered(&f, SOURCE, new_coordinator, fulfillment(id, 1)).await;
        assert!(f
            .validator
            .verify_and_forward(&Caller::account(RELAYER), &new, 10)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_invalid_vrf_config_not_stored() {
        let f = fixture();
        let before = f.validator.vrf_config();
        let bad = VrfConfig {
            request_confirmations: 1,
            ..before.clone()
        };
        assert!(f
            .validator
            .update_vrf_config(&Caller::account(ADMIN), bad, 5)
            .await
            .is_err());
        assert_eq!(f.validator.vrf_config(), before);
    }
}
