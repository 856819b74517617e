//! Shared test harness.

use std::sync::Arc;

use node_runtime::{NodeConfig, RelayContainer, RelayDriver};
use shared_types::{Address, Caller, ChainId, ChannelMessage, FulfillmentPayload, RequestId};
use xv_02_request_ledger::{
    AccessValidatorApi, LedgerError, RecordingConsumer, RequestLedgerApi, RequestStatus,
};

pub const ALICE: Address = [0xA1; 20];
pub const BOB: Address = [0xB0; 20];
pub const CAROL: Address = [0xC0; 20];

/// Timeout used by the lifecycle scenarios.
pub const TIMEOUT: u64 = 100;

/// The captured fulfillment carrying `id`.
pub fn fulfillment_for(messages: &[ChannelMessage], id: RequestId) -> &ChannelMessage {
    messages
        .iter()
        .find(|m| {
            FulfillmentPayload::decode(&m.payload)
                .map(|p| p.id == id)
                .unwrap_or(false)
        })
        .expect("fulfillment for request")
}

/// Both chains wired over one transport, with a recording consumer.
pub struct Harness {
    pub container: Arc<RelayContainer>,
    pub driver: RelayDriver,
    pub consumer: Arc<RecordingConsumer>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_timeout(TIMEOUT)
    }

    pub fn with_timeout(timeout_secs: u64) -> Self {
        let mut config = NodeConfig::default();
        config.compensation.timeout_secs = timeout_secs;
        config.source = config.source.with_destination_timeout(timeout_secs);
        Self::from_config(config)
    }

    pub fn from_config(config: NodeConfig) -> Self {
        let container = Arc::new(RelayContainer::new(config).expect("valid test config"));
        let consumer = Arc::new(RecordingConsumer::new());
        container.ledger.set_consumer(consumer.clone());
        let driver = RelayDriver::new(container.clone());
        Self {
            container,
            driver,
            consumer,
        }
    }

    pub fn relayer(&self) -> Caller {
        Caller::account(self.container.config.relayer)
    }

    pub fn source_chain(&self) -> ChainId {
        self.container.config.source.local_chain
    }

    pub fn dest_chain(&self) -> ChainId {
        self.container.config.ledger.local_chain
    }

    pub async fn create(&self, requester: Address, now: u64) -> RequestId {
        self.container
            .ledger
            .create_request(requester, now)
            .await
            .expect("request created")
    }

    pub fn status(&self, id: RequestId) -> RequestStatus {
        self.container
            .ledger
            .get_request(id)
            .expect("request exists")
            .status
    }

    /// Run the source side for everything in flight and return the
    /// fulfillments it produced without delivering them.
    pub async fn capture_fulfillments(&self, now: u64) -> Vec<ChannelMessage> {
        self.driver.deliver_to_source(now).await;
        self.driver.fulfill_vrf(now).await;
        self.container.transport.take_for(self.dest_chain())
    }

    /// Deliver one fulfillment to the destination chain as the relayer.
    pub async fn submit(&self, msg: &ChannelMessage, now: u64) -> Result<RequestId, LedgerError> {
        self.submit_as(&self.relayer(), msg, now).await
    }

    /// Deliver one fulfillment to the destination chain as `caller`.
    pub async fn submit_as(
        &self,
        caller: &Caller,
        msg: &ChannelMessage,
        now: u64,
    ) -> Result<RequestId, LedgerError> {
        self.container
            .validator
            .verify_and_forward(caller, msg, now)
            .await
    }
}
