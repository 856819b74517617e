//! # Destination-Chain Configuration

use serde::{Deserialize, Serialize};
use shared_types::{Address, ChainId, ConfigError, Validate, ZERO_ADDRESS};

/// Default request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 3600;

/// Default value recorded on credentials minted by a sweep.
pub const DEFAULT_CREDENTIAL_VALUE: u64 = 1;

/// Default upper bound on requests compensated per sweep.
pub const DEFAULT_MAX_SWEEP_BATCH: usize = 256;

/// Request Ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Chain the ledger runs on.
    pub local_chain: ChainId,
    /// Chain the randomness source adapter runs on.
    pub source_chain: ChainId,
    /// Address of the randomness source adapter on `source_chain`.
    pub source_adapter: Address,
    /// Callers allowed to create requests on behalf of others.
    /// Empty means anyone may.
    pub authorized_triggers: Vec<Address>,
    /// Address allowed to reject requests and update configuration.
    pub admin: Address,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            local_chain: ChainId(30332),
            source_chain: ChainId(30110),
            source_adapter: [0xAD; 20],
            authorized_triggers: Vec::new(),
            admin: [0xAD; 20],
        }
    }
}

impl LedgerConfig {
    /// Is `address` allowed to create requests for someone else?
    pub fn is_authorized_trigger(&self, address: &Address) -> bool {
        self.authorized_triggers.is_empty() || self.authorized_triggers.contains(address)
    }
}

impl Validate for LedgerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.source_chain == self.local_chain {
            return Err(ConfigError::Invalid {
                field: "source_chain",
                reason: "must differ from local_chain".into(),
            });
        }
        if self.source_adapter == ZERO_ADDRESS {
            return Err(ConfigError::Invalid {
                field: "source_adapter",
                reason: "must not be the zero address".into(),
            });
        }
        if self.admin == ZERO_ADDRESS {
            return Err(ConfigError::Invalid {
                field: "admin",
                reason: "must not be the zero address".into(),
            });
        }
        Ok(())
    }
}

/// Compensation Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompensationConfig {
    /// A pending request older than this (strictly) is compensated.
    pub timeout_secs: u64,
    /// Max requests compensated per sweep.
    pub max_sweep_batch: usize,
    /// Prefix for credential metadata URIs.
    pub base_uri: String,
    /// Value recorded on credentials minted for timed-out requests.
    pub credential_value: u64,
}

impl Default for CompensationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_sweep_batch: DEFAULT_MAX_SWEEP_BATCH,
            base_uri: "https://xvrf.local/credentials/".into(),
            credential_value: DEFAULT_CREDENTIAL_VALUE,
        }
    }
}

impl Validate for CompensationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "timeout_secs",
                reason: "must be positive".into(),
            });
        }
        if self.max_sweep_batch == 0 {
            return Err(ConfigError::Invalid {
                field: "max_sweep_batch",
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }
}
