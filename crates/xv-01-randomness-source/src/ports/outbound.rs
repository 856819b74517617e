//! # Outbound Ports
//!
//! The local VRF provider. The message channel port lives in `shared-bus`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::{Hash, LocalVrfRequestId, VrfConfig};
use thiserror::Error;

/// Parameters for one provider request, taken from the pinned `VrfConfig`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VrfRequestParams {
    /// Provider key hash (gas lane).
    pub key_hash: Hash,
    /// Billing subscription.
    pub subscription_id: u64,
    /// Block confirmations before fulfillment.
    pub request_confirmations: u16,
    /// Gas budget for the callback.
    pub callback_gas_limit: u32,
    /// Words to produce.
    pub num_words: u32,
}

impl From<&VrfConfig> for VrfRequestParams {
    fn from(config: &VrfConfig) -> Self {
        Self {
            key_hash: config.key_hash,
            subscription_id: config.subscription_id,
            request_confirmations: config.request_confirmations,
            callback_gas_limit: config.callback_gas_limit,
            num_words: config.num_words,
        }
    }
}

/// Errors from the local VRF provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Subscription cannot pay for the request.
    #[error("Insufficient balance on subscription {subscription_id}: have {balance}, need {required}")]
    InsufficientBalance {
        subscription_id: u64,
        balance: u64,
        required: u64,
    },

    /// Subscription id not known to the provider.
    #[error("Unknown subscription: {0}")]
    UnknownSubscription(u64),

    /// Provider could not be reached.
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

/// Local VRF provider - outbound port.
///
/// Randomness is delivered later, out of band, through the adapter's
/// `on_local_vrf_fulfilled`.
#[async_trait]
pub trait VrfProvider: Send + Sync {
    /// Submit a request and return the provider's local id.
    async fn request_random_words(
        &self,
        params: VrfRequestParams,
    ) -> Result<LocalVrfRequestId, ProviderError>;
}
