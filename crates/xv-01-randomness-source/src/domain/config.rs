//! # Adapter Configuration

use serde::{Deserialize, Serialize};
use shared_types::{Address, ChainId, ConfigError, Validate, ZERO_ADDRESS};

/// Default destination-chain request timeout, in seconds.
pub const DEFAULT_DESTINATION_TIMEOUT_SECS: u64 = 3600;

/// Mappings are retained for this many destination timeouts.
pub const GC_HORIZON_MULTIPLIER: u64 = 4;

/// The one channel peer whose requests the adapter serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedPeer {
    /// Chain the request ledger lives on.
    pub chain: ChainId,
    /// Address of the request ledger on that chain.
    pub address: Address,
}

impl Validate for TrustedPeer {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.address == ZERO_ADDRESS {
            return Err(ConfigError::Invalid {
                field: "trusted_peer.address",
                reason: "must not be the zero address".into(),
            });
        }
        Ok(())
    }
}

/// Randomness Source Adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Chain the adapter runs on.
    pub local_chain: ChainId,
    /// Trusted requester endpoint.
    pub trusted_peer: TrustedPeer,
    /// Key for fulfillment proofs.
    pub proof_key: Vec<u8>,
    /// Age after which mappings are garbage-collected.
    pub gc_horizon_secs: u64,
    /// Address allowed to update VRF config and trusted peer.
    pub admin: Address,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            local_chain: ChainId(30110),
            trusted_peer: TrustedPeer {
                chain: ChainId(30332),
                address: [0x1E; 20],
            },
            proof_key: b"xvrf-dev-proof-key".to_vec(),
            gc_horizon_secs: GC_HORIZON_MULTIPLIER * DEFAULT_DESTINATION_TIMEOUT_SECS,
            admin: [0xAD; 20],
        }
    }
}

impl SourceConfig {
    /// Derive the GC horizon from the destination chain's timeout.
    pub fn with_destination_timeout(mut self, timeout_secs: u64) -> Self {
        self.gc_horizon_secs = GC_HORIZON_MULTIPLIER * timeout_secs;
        self
    }
}

impl Validate for SourceConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.trusted_peer.validate()?;
        if self.trusted_peer.chain == self.local_chain {
            return Err(ConfigError::Invalid {
                field: "trusted_peer.chain",
                reason: "must differ from local_chain".into(),
            });
        }
        if self.proof_key.is_empty() {
            return Err(ConfigError::Invalid {
                field: "proof_key",
                reason: "must not be empty".into(),
            });
        }
        if self.gc_horizon_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "gc_horizon_secs",
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }
}
