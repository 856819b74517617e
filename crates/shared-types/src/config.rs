//! # Managed Configuration
//!
//! `VrfConfig` is the provider configuration pinned on both chains. The source
//! chain uses it to parameterise provider requests; the destination chain uses
//! `coordinator` to authenticate fulfillments.
//!
//! `ManagedConfig<T>` wraps any validated config behind an admin guard. Updates
//! are the only mutation path and are validated before they are stored.

use crate::entities::{address_hex, Address, Caller, Hash, ZERO_ADDRESS};
use crate::errors::ConfigError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Minimum block confirmations a provider accepts.
pub const MIN_REQUEST_CONFIRMATIONS: u16 = 3;

/// Maximum block confirmations a provider accepts.
pub const MAX_REQUEST_CONFIRMATIONS: u16 = 200;

/// Upper bound on the callback gas limit.
pub const MAX_CALLBACK_GAS_LIMIT: u32 = 2_500_000;

/// Upper bound on random words per request.
pub const MAX_NUM_WORDS: u32 = 500;

/// Configuration values that can check themselves.
pub trait Validate {
    /// Returns the first invalid field, if any.
    fn validate(&self) -> Result<(), ConfigError>;
}

/// VRF provider configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VrfConfig {
    /// Address of the provider coordinator. Fulfillments must originate here.
    pub coordinator: Address,
    /// Provider key hash (gas lane).
    pub key_hash: Hash,
    /// Billing subscription.
    pub subscription_id: u64,
    /// Gas budget for the provider callback.
    pub callback_gas_limit: u32,
    /// Block confirmations before the provider responds.
    pub request_confirmations: u16,
    /// Random words per request. Only the first word is relayed.
    pub num_words: u32,
}

impl Default for VrfConfig {
    fn default() -> Self {
        Self {
            coordinator: [0xC0; 20],
            key_hash: [0u8; 32],
            subscription_id: 1,
            callback_gas_limit: 2_500_000,
            request_confirmations: 3,
            num_words: 1,
        }
    }
}

impl Validate for VrfConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.coordinator == ZERO_ADDRESS {
            return Err(ConfigError::Invalid {
                field: "coordinator",
                reason: "must not be the zero address".into(),
            });
        }
        if !(MIN_REQUEST_CONFIRMATIONS..=MAX_REQUEST_CONFIRMATIONS)
            .contains(&self.request_confirmations)
        {
            return Err(ConfigError::Invalid {
                field: "request_confirmations",
                reason: format!(
                    "{} outside {}..={}",
                    self.request_confirmations, MIN_REQUEST_CONFIRMATIONS, MAX_REQUEST_CONFIRMATIONS
                ),
            });
        }
        if self.callback_gas_limit == 0 || self.callback_gas_limit > MAX_CALLBACK_GAS_LIMIT {
            return Err(ConfigError::Invalid {
                field: "callback_gas_limit",
                reason: format!("{} outside 1..={}", self.callback_gas_limit, MAX_CALLBACK_GAS_LIMIT),
            });
        }
        if self.num_words == 0 || self.num_words > MAX_NUM_WORDS {
            return Err(ConfigError::Invalid {
                field: "num_words",
                reason: format!("{} outside 1..={}", self.num_words, MAX_NUM_WORDS),
            });
        }
        Ok(())
    }
}

/// Admin-guarded configuration cell.
#[derive(Debug)]
pub struct ManagedConfig<T> {
    value: RwLock<T>,
    admin: Address,
}

impl<T: Validate + Clone> ManagedConfig<T> {
    /// Wrap a value. The initial value is validated like any update.
    pub fn new(value: T, admin: Address) -> Result<Self, ConfigError> {
        value.validate()?;
        Ok(Self {
            value: RwLock::new(value),
            admin,
        })
    }

    /// Snapshot of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Read a projection without cloning the whole value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.read())
    }

    /// The address allowed to update this config.
    #[must_use]
    pub fn admin(&self) -> Address {
        self.admin
    }

    /// Replace the value. Only the admin may do this.
    pub fn update(&self, caller: &Caller, value: T) -> Result<(), ConfigError> {
        if caller.address != self.admin {
            return Err(ConfigError::NotAdmin {
                caller: address_hex(&caller.address),
            });
        }
        value.validate()?;
        *self.value.write() = value;
        info!(admin = %address_hex(&caller.address), "Configuration updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIN: Address = [0xAD; 20];

    #[test]
    fn test_default_vrf_config_is_valid() {
        assert!(VrfConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_coordinator_rejected() {
        let config = VrfConfig {
            coordinator: ZERO_ADDRESS,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "coordinator", .. }));
    }

    #[test]
    fn test_confirmation_bounds() {
        let low = VrfConfig {
            request_confirmations: 2,
            ..Default::default()
        };
        let high = VrfConfig {
            request_confirmations: 201,
            ..Default::default()
        };
        assert!(low.validate().is_err());
        assert!(high.validate().is_err());
    }

    #[test]
    fn test_num_words_bounds() {
        let zero = VrfConfig {
            num_words: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_managed_update_by_admin() {
        let managed = ManagedConfig::new(VrfConfig::default(), ADMIN).unwrap();
        let updated = VrfConfig {
            callback_gas_limit: 500_000,
            ..Default::default()
        };
        managed.update(&Caller::account(ADMIN), updated.clone()).unwrap();
        assert_eq!(managed.get(), updated);
    }

    #[test]
    fn test_managed_update_by_stranger_rejected() {
        let managed = ManagedConfig::new(VrfConfig::default(), ADMIN).unwrap();
        let result = managed.update(&Caller::account([1u8; 20]), VrfConfig::default());
        assert!(matches!(result, Err(ConfigError::NotAdmin { .. })));
    }

    #[test]
    fn test_invalid_update_leaves_value_untouched() {
        let managed = ManagedConfig::new(VrfConfig::default(), ADMIN).unwrap();
        let bad = VrfConfig {
            num_words: 0,
            ..Default::default()
        };
        assert!(managed.update(&Caller::account(ADMIN), bad).is_err());
        assert_eq!(managed.get(), VrfConfig::default());
    }
}
