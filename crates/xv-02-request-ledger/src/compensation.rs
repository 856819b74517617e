//! # Compensation Engine
//!
//! Converts requests that never received randomness into redeemable
//! credentials. A sweep holds the ledger lock and then the credential lock
//! for every transition, so a request is compensated and credited
//! atomically and a racing fulfillment sees `AlreadyTerminal`.

use crate::domain::{
    CompensatedRequest, CompensationConfig, CompensationCredential, LedgerError, RandomnessRequest, RedemptionReceipt,
    SweepReport,
};
use crate::metrics::Metrics;
use crate::ports::CompensationApi;
use crate::service::RequestLedger;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_bus::{EventPublisher, MessageChannel, VrfEvent};
use shared_types::{
    address_hex, Address, Caller, CredentialId, RequestId, Validate, ZERO_ADDRESS,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

struct CredentialStore {
    next_id: CredentialId,
    credentials: BTreeMap<CredentialId, CompensationCredential>,
    by_request: HashMap<RequestId, CredentialId>,
    by_owner: HashMap<Address, BTreeSet<CredentialId>>,
}

impl CredentialStore {
    fn new() -> Self {
        Self {
            next_id: 1,
            credentials: BTreeMap::new(),
            by_request: HashMap::new(),
            by_owner: HashMap::new(),
        }
    }

    /// At most one credential per request: a second mint returns the first.
    fn mint(&mut self, request: &RandomnessRequest, value: u64, now: u64) -> CredentialId {
        if let Some(existing) = self.by_request.get(&request.id) {
            return *existing;
        }
        let id = self.next_id;
        self.next_id += 1;
        let credential = CompensationCredential::mint(id, request, value, now);
        self.by_request.insert(request.id, id);
        self.by_owner.entry(credential.owner).or_default().insert(id);
        self.credentials.insert(id, credential);
        id
    }

    fn owned_unredeemed(
        &mut self,
        id: CredentialId,
        caller: &Address,
    ) -> Result<&mut CompensationCredential, LedgerError> {
        let credential = self
            .credentials
            .get_mut(&id)
            .ok_or(LedgerError::UnknownCredential(id))?;
        if credential.owner != *caller {
            return Err(LedgerError::NotOwner(id));
        }
        if credential.redeemed {
            return Err(LedgerError::AlreadyRedeemed(id));
        }
        Ok(credential)
    }

    fn held_by(&self, owner: &Address) -> impl Iterator<Item = &CompensationCredential> {
        self.by_owner
            .get(owner)
            .into_iter()
            .flatten()
            .filter_map(|id| self.credentials.get(id))
    }
}

/// Compensation Engine implementation.
pub struct CompensationEngine<C: MessageChannel> {
    ledger: Arc<RequestLedger<C>>,
    config: CompensationConfig,
    base_uri: RwLock<String>,
    credentials: RwLock<CredentialStore>,
    events: Arc<dyn EventPublisher>,
    metrics: Arc<Metrics>,
}

impl<C: MessageChannel> CompensationEngine<C> {
    /// Create an engine for `ledger`. The config is validated.
    pub fn new(ledger: Arc<RequestLedger<C>>, config: CompensationConfig) -> Result<Self, LedgerError> {
        config.validate()?;
        Ok(Self {
            base_uri: RwLock::new(config.base_uri.clone()),
            config,
            credentials: RwLock::new(CredentialStore::new()),
            events: ledger.events(),
            metrics: ledger.shared_metrics(),
            ledger,
        })
    }

    /// Static configuration.
    pub fn config(&self) -> &CompensationConfig {
        &self.config
    }

    /// Number of credentials minted so far.
    pub fn credential_count(&self) -> usize {
        self.credentials.read().credentials.len()
    }
}

#[async_trait]
impl<C> CompensationApi for CompensationEngine<C>
where
    C: MessageChannel + 'static,
{
    async fn sweep_timeouts(&self, now: u64) -> SweepReport {
        let started = Instant::now();
        let value = self.config.credential_value;
        let pass = self.ledger.compensate_expired(
            now,
            self.config.timeout_secs,
            self.config.max_sweep_batch,
            |request| self.credentials.write().mint(request, value, now),
        );
        Metrics::inc(&self.metrics.sweeps);

        let count = pass.compensated.len();
        Metrics::add(&self.metrics.compensated, count);
        Metrics::add(&self.metrics.credentials_minted, count);

        for c in &pass.compensated {
            info!(
                request_id = %c.request_id,
                credential_id = c.credential_id,
                requester = %address_hex(&c.requester),
                "[xv-02] Request timed out; credential minted"
            );
            self.events
                .publish(VrfEvent::RequestCompensated {
                    request_id: c.request_id,
                    requester: c.requester,
                    credential_id: c.credential_id,
                    timestamp: now,
                })
                .await;
        }

        if pass.batch_limited {
            warn!(
                compensated = count,
                still_pending = pass.still_pending,
                "[xv-02] Sweep hit batch limit; more timed-out requests remain"
            );
        } else {
            debug!(
                compensated = count,
                still_pending = pass.still_pending,
                elapsed_us = started.elapsed().as_micros() as u64,
                "[xv-02] Sweep complete"
            );
        }

        SweepReport {
            compensated: pass.compensated,
            still_pending: pass.still_pending,
            batch_limited: pass.batch_limited,
        }
    }

    async fn register_entry(
        &self,
        admin: &Caller,
        holder: Address,
        value: u64,
        now: u64,
    ) -> Result<CompensatedRequest, LedgerError> {
        if admin.address != self.ledger.config().admin {
            Metrics::inc(&self.metrics.auth_failures);
            warn!(target: "xv::security", caller = %address_hex(&admin.address), "[xv-02] Unauthorized entry registration");
            let err = LedgerError::NotAdmin(address_hex(&admin.address));
            self.events
                .publish(VrfEvent::AuthorizationFailed {
                    component: "compensation-engine".into(),
                    caller: admin.address,
                    src_chain: None,
                    reason: err.to_string(),
                    timestamp: now,
                })
                .await;
            return Err(err);
        }
        if holder == ZERO_ADDRESS {
            return Err(LedgerError::ZeroHolder);
        }

        let entry = self.ledger.record_compensated_entry(holder, now, |request| {
            self.credentials.write().mint(request, value, now)
        })?;
        Metrics::inc(&self.metrics.entries_registered);
        Metrics::inc(&self.metrics.compensated);
        Metrics::inc(&self.metrics.credentials_minted);

        info!(
            request_id = %entry.request_id,
            credential_id = entry.credential_id,
            holder = %address_hex(&holder),
            value,
            "[xv-02] Entry registered; credential minted"
        );
        self.events
            .publish(VrfEvent::RequestCompensated {
                request_id: entry.request_id,
                requester: holder,
                credential_id: entry.credential_id,
                timestamp: now,
            })
            .await;
        Ok(entry)
    }

    async fn redeem(
        &self,
        credential_id: CredentialId,
        caller: &Caller,
        now: u64,
    ) -> Result<RedemptionReceipt, LedgerError> {
        let receipt = {
            let mut store = self.credentials.write();
            let credential = store.owned_unredeemed(credential_id, &caller.address)?;
            credential.redeemed = true;
            credential.redeemed_at = Some(now);
            RedemptionReceipt {
                credential_id,
                owner: credential.owner,
                source_request_id: credential.source_request_id,
                value: credential.value,
                redeemed_at: now,
            }
        };
        Metrics::inc(&self.metrics.credentials_redeemed);

        info!(
            credential_id,
            owner = %address_hex(&receipt.owner),
            request_id = %receipt.source_request_id,
            value = receipt.value,
            "[xv-02] Credential redeemed"
        );
        self.events
            .publish(VrfEvent::CredentialRedeemed {
                credential_id,
                owner: receipt.owner,
                source_request_id: receipt.source_request_id,
                timestamp: now,
            })
            .await;
        Ok(receipt)
    }

    async fn transfer(
        &self,
        credential_id: CredentialId,
        from: &Caller,
        to: Address,
        now: u64,
    ) -> Result<(), LedgerError> {
        if to == ZERO_ADDRESS {
            return Err(LedgerError::InvalidRecipient(credential_id));
        }
        {
            let mut store = self.credentials.write();
            let credential = store.owned_unredeemed(credential_id, &from.address)?;
            credential.owner = to;
            if let Some(owned) = store.by_owner.get_mut(&from.address) {
                owned.remove(&credential_id);
            }
            store.by_owner.entry(to).or_default().insert(credential_id);
        }
        Metrics::inc(&self.metrics.credentials_transferred);

        info!(
            credential_id,
            from = %address_hex(&from.address),
            to = %address_hex(&to),
            "[xv-02] Credential transferred"
        );
        self.events
            .publish(VrfEvent::CredentialTransferred {
                credential_id,
                from: from.address,
                to,
                timestamp: now,
            })
            .await;
        Ok(())
    }

    fn credential(&self, id: CredentialId) -> Option<CompensationCredential> {
        self.credentials.read().credentials.get(&id).cloned()
    }

    fn credentials_of(&self, owner: &Address) -> Vec<CompensationCredential> {
        self.credentials.read().held_by(owner).cloned().collect()
    }

    fn credential_count_of(&self, owner: &Address) -> usize {
        self.credentials
            .read()
            .by_owner
            .get(owner)
            .map_or(0, |ids| ids.len())
    }

    fn outstanding_value_of(&self, owner: &Address) -> u64 {
        self.credentials
            .read()
            .held_by(owner)
            .filter(|c| !c.redeemed)
            .fold(0u64, |total, c| total.saturating_add(c.value))
    }

    fn credential_for_request(&self, request_id: RequestId) -> Option<CompensationCredential> {
        let store = self.credentials.read();
        let id = store.by_request.get(&request_id)?;
        store.credentials.get(id).cloned()
    }

    fn token_uri(&self, id: CredentialId) -> Result<String, LedgerError> {
        if !self.credentials.read().credentials.contains_key(&id) {
            return Err(LedgerError::UnknownCredential(id));
        }
        Ok(format!("{}{}", self.base_uri.read(), id))
    }

    async fn set_base_uri(&self, admin: &Caller, uri: String, now: u64) -> Result<(), LedgerError> {
        if admin.address != self.ledger.config().admin {
            Metrics::inc(&self.metrics.auth_failures);
            warn!(target: "xv::security", caller = %address_hex(&admin.address), "[xv-02] Unauthorized base URI update");
            return Err(LedgerError::NotAdmin(address_hex(&admin.address)));
        }
        info!(uri = %uri, "[xv-02] Credential base URI updated");
        *self.base_uri.write() = uri;
        self.events
            .publish(VrfEvent::ConfigUpdated {
                component: "compensation-engine".into(),
                admin: admin.address,
                timestamp: now,
            })
            .await;
        Ok(())
    }
}
