//! # In-Memory VRF Provider
//!
//! Simulates a subscription-billed VRF coordinator. Requests are queued until a
//! driver calls `fulfill_pending` (or `fulfill`), which produces words as
//!
//! ```text
//! word[i] = HMAC-SHA256(seed_key, local_id_be || i_be)
//! ```
//!
//! so outputs are deterministic per key and unpredictable without it.

use crate::ports::{ProviderError, VrfProvider, VrfRequestParams};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use parking_lot::Mutex;
use sha2::Sha256;
use shared_types::{LocalVrfRequestId, U256};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

type HmacSha256 = Hmac<Sha256>;

/// Default fee charged per request.
pub const DEFAULT_REQUEST_FEE: u64 = 1;

struct ProviderState {
    next_id: u64,
    balance: u64,
    submissions: u64,
    pending: BTreeMap<LocalVrfRequestId, VrfRequestParams>,
}

/// In-memory VRF provider with a single funded subscription.
pub struct InMemoryVrfProvider {
    seed_key: Vec<u8>,
    subscription_id: u64,
    fee_per_request: u64,
    state: Mutex<ProviderState>,
    unavailable: AtomicBool,
}

impl InMemoryVrfProvider {
    /// Provider for `subscription_id` funded with `balance`.
    pub fn new(seed_key: impl Into<Vec<u8>>, subscription_id: u64, balance: u64) -> Self {
        Self {
            seed_key: seed_key.into(),
            subscription_id,
            fee_per_request: DEFAULT_REQUEST_FEE,
            state: Mutex::new(ProviderState {
                next_id: 1,
                balance,
                submissions: 0,
                pending: BTreeMap::new(),
            }),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Override the per-request fee.
    pub fn with_fee(mut self, fee: u64) -> Self {
        self.fee_per_request = fee;
        self
    }

    /// Add funds to the subscription.
    pub fn fund(&self, amount: u64) {
        let mut state = self.state.lock();
        state.balance = state.balance.saturating_add(amount);
        info!(subscription_id = self.subscription_id, balance = state.balance, "[xv-01] Subscription funded");
    }

    /// Remaining subscription balance.
    pub fn balance(&self) -> u64 {
        self.state.lock().balance
    }

    /// Requests accepted so far.
    pub fn submissions(&self) -> u64 {
        self.state.lock().submissions
    }

    /// Local ids still waiting for randomness.
    pub fn pending_ids(&self) -> Vec<LocalVrfRequestId> {
        self.state.lock().pending.keys().copied().collect()
    }

    /// Simulate an outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Produce words for one pending request, removing it from the queue.
    pub fn fulfill(&self, local_id: LocalVrfRequestId) -> Result<Option<Vec<U256>>, ProviderError> {
        let params = self.state.lock().pending.remove(&local_id);
        match params {
            Some(params) => Ok(Some(self.derive_words(local_id, params.num_words)?)),
            None => Ok(None),
        }
    }

    /// Produce words for every pending request, in local id order.
    pub fn fulfill_pending(&self) -> Result<Vec<(LocalVrfRequestId, Vec<U256>)>, ProviderError> {
        let drained = std::mem::take(&mut self.state.lock().pending);
        drained
            .into_iter()
            .map(|(id, params)| Ok((id, self.derive_words(id, params.num_words)?)))
            .collect()
    }

    fn derive_words(&self, local_id: LocalVrfRequestId, num_words: u32) -> Result<Vec<U256>, ProviderError> {
        let mut id_bytes = [0u8; 32];
        local_id.to_big_endian(&mut id_bytes);

        (0..num_words)
            .map(|i| {
                let mut mac = HmacSha256::new_from_slice(&self.seed_key)
                    .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
                mac.update(&id_bytes);
                mac.update(&i.to_be_bytes());
                Ok(U256::from_big_endian(&mac.finalize().into_bytes()))
            })
            .collect()
    }
}

#[async_trait]
impl VrfProvider for InMemoryVrfProvider {
    async fn request_random_words(
        &self,
        params: VrfRequestParams,
    ) -> Result<LocalVrfRequestId, ProviderError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable("coordinator offline".into()));
        }
        if params.subscription_id != self.subscription_id {
            return Err(ProviderError::UnknownSubscription(params.subscription_id));
        }

        let mut state = self.state.lock();
        let required = self.fee_per_request.saturating_mul(u64::from(params.num_words));
        if state.balance < required {
            warn!(
                subscription_id = self.subscription_id,
                balance = state.balance,
                required,
                "[xv-01] Subscription underfunded"
            );
            return Err(ProviderError::InsufficientBalance {
                subscription_id: self.subscription_id,
                balance: state.balance,
                required,
            });
        }
        state.balance -= required;

        let local_id = U256::from(state.next_id);
        state.next_id += 1;
        state.submissions += 1;
        state.pending.insert(local_id, params);

        debug!(local_vrf_id = %local_id, "[xv-01] VRF request queued");
        Ok(local_id)
    }
}
