//! Request Ledger Service
//!
//! Owns every randomness request on the destination chain and its lifecycle.
//! All transitions happen under one write lock, so fulfillment, rejection and
//! compensation race safely: whichever takes the lock first wins and the
//! others see `AlreadyTerminal`.

use crate::domain::{
    CompensatedRequest, LedgerConfig, LedgerError, LedgerStats, RandomnessRequest, RequestStatus,
};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::ports::{RandomnessConsumer, RequestLedgerApi};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_bus::{EventPublisher, MessageChannel, VrfEvent};
use shared_types::{
    address_hex, Address, Caller, CredentialId, RequestId, RequestPayload, Validate, U256,
};
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

struct RequestStore {
    next_id: U256,
    requests: BTreeMap<RequestId, RandomnessRequest>,
    pending: BTreeSet<RequestId>,
    by_requester: HashMap<Address, Vec<RequestId>>,
    stats: LedgerStats,
}

impl RequestStore {
    fn new() -> Self {
        Self {
            next_id: U256::one(),
            requests: BTreeMap::new(),
            pending: BTreeSet::new(),
            by_requester: HashMap::new(),
            stats: LedgerStats::default(),
        }
    }

    fn allocate_id(&mut self) -> RequestId {
        let id = self.next_id;
        self.next_id = id.saturating_add(U256::one());
        id
    }

    fn insert(&mut self, request: RandomnessRequest) -> Result<(), LedgerError> {
        if self.requests.contains_key(&request.id) {
            return Err(LedgerError::DuplicateId(request.id));
        }
        self.pending.insert(request.id);
        self.by_requester
            .entry(request.requester)
            .or_default()
            .push(request.id);
        self.stats.record(RequestStatus::Pending);
        self.requests.insert(request.id, request);
        Ok(())
    }

    fn fulfill(
        &mut self,
        id: RequestId,
        requester: Address,
        random_value: U256,
        proof: Vec<u8>,
        now: u64,
    ) -> Result<(), LedgerError> {
        let request = self
            .requests
            .get_mut(&id)
            .ok_or(LedgerError::UnknownRequest(id))?;
        if request.status.is_terminal() {
            return Err(LedgerError::AlreadyTerminal {
                id,
                status: request.status,
            });
        }
        if request.requester != requester {
            return Err(LedgerError::RequesterMismatch(id));
        }
        request.mark_fulfilled(random_value, proof, now)?;
        self.resolved(id, RequestStatus::Fulfilled);
        Ok(())
    }

    fn resolved(&mut self, id: RequestId, status: RequestStatus) {
        self.pending.remove(&id);
        self.stats.record(status);
    }
}

/// Outcome of one compensation pass, before events are published.
pub(crate) struct CompensationPass {
    pub compensated: Vec<CompensatedRequest>,
    pub still_pending: usize,
    pub batch_limited: bool,
}

/// Request Ledger implementation.
pub struct RequestLedger<C: MessageChannel> {
    channel: Arc<C>,
    events: Arc<dyn EventPublisher>,
    config: LedgerConfig,
    store: RwLock<RequestStore>,
    consumer: RwLock<Option<Arc<dyn RandomnessConsumer>>>,
    metrics: Arc<Metrics>,
}

impl<C: MessageChannel> RequestLedger<C> {
    /// Create a new ledger. The config is validated.
    pub fn new(
        channel: Arc<C>,
        events: Arc<dyn EventPublisher>,
        config: LedgerConfig,
    ) -> Result<Self, LedgerError> {
        config.validate()?;
        Ok(Self {
            channel,
            events,
            config,
            store: RwLock::new(RequestStore::new()),
            consumer: RwLock::new(None),
            metrics: Arc::new(Metrics::new()),
        })
    }

    /// Register the application that receives delivered randomness.
    pub fn set_consumer(&self, consumer: Arc<dyn RandomnessConsumer>) {
        *self.consumer.write() = Some(consumer);
    }

    /// Static configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Metrics snapshot (shared with the validator and compensation engine).
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub(crate) fn shared_metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    pub(crate) fn events(&self) -> Arc<dyn EventPublisher> {
        self.events.clone()
    }

    /// Pending -> Fulfilled. Only the access validator calls this.
    ///
    /// Every check runs before any mutation. The consumer is notified after
    /// the lock is released; its failure does not undo the transition.
    pub(crate) async fn fulfill(
        &self,
        id: RequestId,
        requester: Address,
        random_value: U256,
        proof: Vec<u8>,
        now: u64,
    ) -> Result<(), LedgerError> {
        let result = self
            .store
            .write()
            .fulfill(id, requester, random_value, proof, now);
        if let Err(e) = result {
            Metrics::inc(&self.metrics.protocol_rejections);
            debug!(request_id = %id, error = %e, "[xv-02] Fulfillment refused");
            return Err(e);
        }
        Metrics::inc(&self.metrics.fulfilled);

        info!(request_id = %id, requester = %address_hex(&requester), "[xv-02] Request fulfilled");
        self.events
            .publish(VrfEvent::RequestFulfilled {
                request_id: id,
                requester,
                random_value,
                timestamp: now,
            })
            .await;

        self.notify_consumer(id, requester, random_value, now).await;
        Ok(())
    }

    async fn notify_consumer(&self, id: RequestId, requester: Address, random_value: U256, now: u64) {
        let Some(consumer) = self.consumer.read().clone() else {
            return;
        };
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            consumer.on_randomness_fulfilled(id, requester, random_value)
        }));
        let reason = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(panic) => panic_message(panic),
        };

        Metrics::inc(&self.metrics.consumer_failures);
        warn!(request_id = %id, reason = %reason, "[xv-02] Consumer callback failed; fulfillment stands");
        self.events
            .publish(VrfEvent::ConsumerCallbackFailed {
                request_id: id,
                reason,
                timestamp: now,
            })
            .await;
    }

    /// Compensate timed-out pending requests in ascending id order.
    ///
    /// `mint` runs under the ledger write lock for each request and must
    /// return the credential minted for it. Callers take their own locks
    /// inside `mint`, which fixes the lock order as ledger then credentials.
    pub(crate) fn compensate_expired<F>(
        &self,
        now: u64,
        timeout_secs: u64,
        max_batch: usize,
        mut mint: F,
    ) -> CompensationPass
    where
        F: FnMut(&RandomnessRequest) -> CredentialId,
    {
        let mut guard = self.store.write();
        let store = &mut *guard;

        let mut expired = Vec::new();
        let mut batch_limited = false;
        for id in &store.pending {
            let timed_out = store
                .requests
                .get(id)
                .is_some_and(|r| r.is_timed_out(now, timeout_secs));
            if !timed_out {
                continue;
            }
            if expired.len() == max_batch {
                batch_limited = true;
                break;
            }
            expired.push(*id);
        }

        let mut compensated = Vec::with_capacity(expired.len());
        for id in expired {
            let Some(request) = store.requests.get_mut(&id) else {
                continue;
            };
            if request.status != RequestStatus::Pending {
                continue;
            }
            let credential_id = mint(&*request);
            if let Err(e) = request.mark_compensated(credential_id, now) {
                error!(request_id = %id, credential_id, error = %e, "[xv-02] Compensation transition failed");
                continue;
            }
            compensated.push(CompensatedRequest {
                request_id: id,
                requester: request.requester,
                credential_id,
            });
            store.resolved(id, RequestStatus::Compensated);
        }

        CompensationPass {
            compensated,
            still_pending: store.pending.len(),
            batch_limited,
        }
    }

    /// Record an entry for `holder` that is compensated on arrival.
    ///
    /// The entry is never sent to the source chain. It takes a fresh request
    /// id and goes through the same transition and `mint` guard as a swept
    /// timeout, under the same lock order.
    pub(crate) fn record_compensated_entry<F>(
        &self,
        holder: Address,
        now: u64,
        mint: F,
    ) -> Result<CompensatedRequest, LedgerError>
    where
        F: FnOnce(&RandomnessRequest) -> CredentialId,
    {
        let mut guard = self.store.write();
        let store = &mut *guard;
        let id = store.allocate_id();
        store.insert(RandomnessRequest::new(
            id,
            holder,
            self.config.local_chain,
            self.config.source_chain,
            now,
        ))?;
        let request = store
            .requests
            .get_mut(&id)
            .ok_or(LedgerError::UnknownRequest(id))?;
        let credential_id = mint(&*request);
        request.mark_compensated(credential_id, now)?;
        store.resolved(id, RequestStatus::Compensated);
        Ok(CompensatedRequest {
            request_id: id,
            requester: holder,
            credential_id,
        })
    }

    fn deny_trigger(&self, trigger: &Caller) -> LedgerError {
        Metrics::inc(&self.metrics.auth_failures);
        warn!(
            target: "xv::security",
            trigger = %address_hex(&trigger.address),
            "[xv-02] Unauthorized request trigger"
        );
        LedgerError::UnauthorizedTrigger(address_hex(&trigger.address))
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "consumer panicked".into()
    }
}

#[async_trait]
impl<C> RequestLedgerApi for RequestLedger<C>
where
    C: MessageChannel + 'static,
{
    async fn create_request(&self, requester: Address, now: u64) -> Result<RequestId, LedgerError> {
        let id = {
            let mut store = self.store.write();
            let id = store.allocate_id();
            store.insert(RandomnessRequest::new(
                id,
                requester,
                self.config.local_chain,
                self.config.source_chain,
                now,
            ))?;
            id
        };
        Metrics::inc(&self.metrics.requests_created);

        let payload = RequestPayload { id, requester }.encode();
        match self
            .channel
            .send(self.config.source_chain, self.config.source_adapter, payload)
            .await
        {
            Ok(receipt) => {
                info!(
                    request_id = %id,
                    requester = %address_hex(&requester),
                    nonce = receipt.nonce,
                    "[xv-02] Request created and sent"
                );
            }
            Err(e) => {
                Metrics::inc(&self.metrics.request_send_failures);
                warn!(request_id = %id, error = %e, "[xv-02] Request send failed; left pending for compensation");
            }
        }

        self.events
            .publish(VrfEvent::RequestCreated {
                request_id: id,
                requester,
                dest_chain: self.config.source_chain,
                timestamp: now,
            })
            .await;
        Ok(id)
    }

    async fn create_request_for(
        &self,
        trigger: &Caller,
        requester: Address,
        now: u64,
    ) -> Result<RequestId, LedgerError> {
        if !self.config.is_authorized_trigger(&trigger.address) {
            let err = self.deny_trigger(trigger);
            self.events
                .publish(VrfEvent::AuthorizationFailed {
                    component: "request-ledger".into(),
                    caller: trigger.address,
                    src_chain: None,
                    reason: err.to_string(),
                    timestamp: now,
                })
                .await;
            return Err(err);
        }
        self.create_request(requester, now).await
    }

    async fn reject(
        &self,
        admin: &Caller,
        id: RequestId,
        reason: String,
        now: u64,
    ) -> Result<(), LedgerError> {
        if admin.address != self.config.admin {
            warn!(target: "xv::security", caller = %address_hex(&admin.address), "[xv-02] Unauthorized reject");
            Metrics::inc(&self.metrics.auth_failures);
            return Err(LedgerError::NotAdmin(address_hex(&admin.address)));
        }
        {
            let mut guard = self.store.write();
            let store = &mut *guard;
            let request = store
                .requests
                .get_mut(&id)
                .ok_or(LedgerError::UnknownRequest(id))?;
            request.mark_rejected(reason.clone(), now)?;
            store.resolved(id, RequestStatus::Rejected);
        }
        Metrics::inc(&self.metrics.rejected);

        info!(request_id = %id, reason = %reason, "[xv-02] Request rejected");
        self.events
            .publish(VrfEvent::RequestRejected {
                request_id: id,
                reason,
                timestamp: now,
            })
            .await;
        Ok(())
    }

    fn get_request(&self, id: RequestId) -> Option<RandomnessRequest> {
        self.store.read().requests.get(&id).cloned()
    }

    fn requests_by_status(&self, status: RequestStatus) -> Vec<RandomnessRequest> {
        self.store
            .read()
            .requests
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect()
    }

    fn requests_of(&self, requester: &Address) -> Vec<RandomnessRequest> {
        let store = self.store.read();
        store
            .by_requester
            .get(requester)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| store.requests.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn pending_count(&self) -> usize {
        self.store.read().pending.len()
    }

    fn stats(&self) -> LedgerStats {
        self.store.read().stats
    }
}
