//! # Demo Workload
//!
//! Synthetic requesters for local runs: creates requests, logs delivered
//! randomness and redeems any credentials the requesters receive.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use shared_types::{address_hex, Address, Caller, RequestId, U256};
use xv_02_request_ledger::{
    CompensationApi, ConsumerError, RandomnessConsumer, RequestLedgerApi, RequestStatus,
};

use crate::container::RelayContainer;

/// Consumer that logs every delivery.
pub struct LoggingConsumer;

impl RandomnessConsumer for LoggingConsumer {
    fn on_randomness_fulfilled(
        &self,
        request_id: RequestId,
        requester: Address,
        random_value: U256,
    ) -> Result<(), ConsumerError> {
        info!(
            request_id = %request_id,
            requester = %address_hex(&requester),
            random_value = %random_value,
            "[demo] Randomness delivered"
        );
        Ok(())
    }
}

/// Rotating set of synthetic requesters.
pub struct DemoWorkload {
    container: Arc<RelayContainer>,
    counter: AtomicU64,
}

impl DemoWorkload {
    /// Workload over `container`. Registers the logging consumer.
    pub fn new(container: Arc<RelayContainer>) -> Self {
        container.ledger.set_consumer(Arc::new(LoggingConsumer));
        Self {
            container,
            counter: AtomicU64::new(0),
        }
    }

    fn next_requester(&self) -> Address {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let mut address = [0xD0; 20];
        address[12..].copy_from_slice(&n.to_be_bytes());
        address
    }

    /// Create `count` requests. Returns the ids created.
    pub async fn create_requests(&self, count: u32, now: u64) -> Vec<RequestId> {
        let mut ids = Vec::with_capacity(count as usize);
        for _ in 0..count {
            match self.container.ledger.create_request(self.next_requester(), now).await {
                Ok(id) => ids.push(id),
                Err(e) => warn!(error = %e, "[demo] Request creation failed"),
            }
        }
        ids
    }

    /// Redeem every unredeemed credential minted for a compensated request.
    pub async fn redeem_outstanding(&self, now: u64) -> usize {
        let c = &self.container;
        let mut redeemed = 0;
        for request in c.ledger.requests_by_status(RequestStatus::Compensated) {
            let Some(credential) = c.compensation.credential_for_request(request.id) else {
                continue;
            };
            if credential.redeemed {
                continue;
            }
            let owner = Caller::account(credential.owner);
            match c.compensation.redeem(credential.id, &owner, now).await {
                Ok(_) => redeemed += 1,
                Err(e) => warn!(credential_id = credential.id, error = %e, "[demo] Redemption failed"),
            }
        }
        redeemed
    }
}
