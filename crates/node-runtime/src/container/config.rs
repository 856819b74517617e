//! # Node Configuration
//!
//! Unified configuration for both chains and the runtime loops.
//!
//! ## Security Requirements
//!
//! - `proof_key` MUST NOT be all zeros or the development key in production
//! - the request timeout MUST exceed the worst-case channel latency, or
//!   healthy requests get compensated

use serde::{Deserialize, Serialize};
use shared_types::{parse_address, Address, ChainId, Validate, VrfConfig};
use thiserror::Error;
use xv_01_randomness_source::{SourceConfig, TrustedPeer};
use xv_02_request_ledger::{CompensationConfig, LedgerConfig};

/// Key shipped in `SourceConfig::default()`. Rejected in production.
pub const DEV_PROOF_KEY: &[u8] = b"xvrf-dev-proof-key";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("invalid {var}: {reason}")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Parse failure.
        reason: String,
    },

    /// Proof key is all zeros or the development default.
    #[error(
        "SECURITY VIOLATION: proof key is a default value. \
         Set XV_PROOF_KEY to a secret shared by the adapter and consumers."
    )]
    InsecureProofKey,

    /// Timeout does not cover the channel latency bound.
    #[error("timeout of {timeout_secs}s must exceed the channel latency bound of {latency_secs}s")]
    TimeoutTooShort {
        /// Configured request timeout.
        timeout_secs: u64,
        /// Worst-case channel latency.
        latency_secs: u64,
    },

    /// A component config failed validation.
    #[error(transparent)]
    Component(#[from] shared_types::ConfigError),
}

/// Loop periods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Channel delivery period.
    pub relay_interval_ms: u64,
    /// VRF provider poll period.
    pub vrf_interval_ms: u64,
    /// Timeout sweep period.
    pub sweep_interval_secs: u64,
    /// Prometheus mirroring period.
    pub metrics_interval_secs: u64,
    /// Age after which a pending request's fulfillment is re-sent.
    pub retry_after_secs: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            relay_interval_ms: 200,
            vrf_interval_ms: 500,
            sweep_interval_secs: 30,
            metrics_interval_secs: 5,
            retry_after_secs: 300,
        }
    }
}

/// Simulated VRF provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Key the simulated provider derives words from.
    pub seed_key: Vec<u8>,
    /// Initial subscription balance.
    pub balance: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            seed_key: b"xvrf-simulated-provider".to_vec(),
            balance: 10_000,
        }
    }
}

/// Synthetic workload for local runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Requests created per demo tick; 0 disables the workload.
    pub requests_per_tick: u32,
    /// Demo tick period.
    pub interval_secs: u64,
}

/// Thresholds for the security and compensation alert path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Authorization failures from one caller before it is flagged.
    pub auth_failures_per_caller: u32,
    /// Compensations observed before a timeout-rate alert is raised.
    pub compensation_burst: u32,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            auth_failures_per_caller: 5,
            compensation_burst: 50,
        }
    }
}

/// Complete node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Source chain adapter.
    pub source: SourceConfig,
    /// VRF parameters used by the adapter.
    pub vrf: VrfConfig,
    /// Destination chain ledger.
    pub ledger: LedgerConfig,
    /// Compensation engine.
    pub compensation: CompensationConfig,
    /// Account that delivers channel messages to the destination chain.
    pub relayer: Address,
    /// Worst-case channel delivery latency.
    pub max_channel_latency_secs: u64,
    /// Simulated provider.
    pub provider: ProviderConfig,
    /// Loop periods.
    pub loops: LoopConfig,
    /// Synthetic workload.
    pub demo: DemoConfig,
    /// Alert thresholds.
    pub alerts: AlertConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let ledger = LedgerConfig::default();
        let compensation = CompensationConfig::default();
        let source = SourceConfig {
            local_chain: ledger.source_chain,
            trusted_peer: TrustedPeer {
                chain: ledger.local_chain,
                address: [0x1E; 20],
            },
            ..SourceConfig::default()
        }
        .with_destination_timeout(compensation.timeout_secs);
        Self {
            source,
            vrf: VrfConfig::default(),
            ledger,
            compensation,
            relayer: [0x7E; 20],
            max_channel_latency_secs: 600,
            provider: ProviderConfig::default(),
            loops: LoopConfig::default(),
            demo: DemoConfig::default(),
            alerts: AlertConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from `XV_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration using `lookup` for variable values.
    ///
    /// Both chains are kept consistent: the adapter trusts the ledger's
    /// chain and address, and the ledger sends to the adapter's.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("XV_SOURCE_CHAIN") {
            config.ledger.source_chain = ChainId(parse_num("XV_SOURCE_CHAIN", &v)?);
        }
        if let Some(v) = lookup("XV_DEST_CHAIN") {
            config.ledger.local_chain = ChainId(parse_num("XV_DEST_CHAIN", &v)?);
        }
        if let Some(v) = lookup("XV_ADAPTER_ADDRESS") {
            config.ledger.source_adapter = parse_addr("XV_ADAPTER_ADDRESS", &v)?;
        }
        if let Some(v) = lookup("XV_LEDGER_ADDRESS") {
            config.source.trusted_peer.address = parse_addr("XV_LEDGER_ADDRESS", &v)?;
        }
        if let Some(v) = lookup("XV_ADMIN") {
            let admin = parse_addr("XV_ADMIN", &v)?;
            config.ledger.admin = admin;
            config.source.admin = admin;
        }
        if let Some(v) = lookup("XV_RELAYER") {
            config.relayer = parse_addr("XV_RELAYER", &v)?;
        }
        if let Some(v) = lookup("XV_TRIGGERS") {
            config.ledger.authorized_triggers = v
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| parse_addr("XV_TRIGGERS", s.trim()))
                .collect::<Result<_, _>>()?;
        }
        if let Some(v) = lookup("XV_PROOF_KEY") {
            config.source.proof_key = hex::decode(v.trim_start_matches("0x")).map_err(|e| {
                ConfigError::InvalidEnv {
                    var: "XV_PROOF_KEY",
                    reason: e.to_string(),
                }
            })?;
        }
        if let Some(v) = lookup("XV_TIMEOUT_SECS") {
            config.compensation.timeout_secs = parse_num("XV_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("XV_MAX_SWEEP_BATCH") {
            config.compensation.max_sweep_batch = parse_num("XV_MAX_SWEEP_BATCH", &v)?;
        }
        if let Some(v) = lookup("XV_BASE_URI") {
            config.compensation.base_uri = v;
        }
        if let Some(v) = lookup("XV_CREDENTIAL_VALUE") {
            config.compensation.credential_value = parse_num("XV_CREDENTIAL_VALUE", &v)?;
        }
        if let Some(v) = lookup("XV_ALERT_AUTH_FAILURES") {
            config.alerts.auth_failures_per_caller = parse_num("XV_ALERT_AUTH_FAILURES", &v)?;
        }
        if let Some(v) = lookup("XV_MAX_CHANNEL_LATENCY_SECS") {
            config.max_channel_latency_secs = parse_num("XV_MAX_CHANNEL_LATENCY_SECS", &v)?;
        }
        if let Some(v) = lookup("XV_SUBSCRIPTION_BALANCE") {
            config.provider.balance = parse_num("XV_SUBSCRIPTION_BALANCE", &v)?;
        }
        if let Some(v) = lookup("XV_SWEEP_INTERVAL_SECS") {
            config.loops.sweep_interval_secs = parse_num("XV_SWEEP_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = lookup("XV_DEMO_REQUESTS") {
            config.demo.requests_per_tick = parse_num("XV_DEMO_REQUESTS", &v)?;
        }
        if let Some(v) = lookup("XV_DEMO_INTERVAL_SECS") {
            config.demo.interval_secs = parse_num("XV_DEMO_INTERVAL_SECS", &v)?;
        }

        config.source.local_chain = config.ledger.source_chain;
        config.source.trusted_peer.chain = config.ledger.local_chain;
        config.source = config
            .source
            .with_destination_timeout(config.compensation.timeout_secs);

        config.validate()?;
        Ok(config)
    }

    /// Validate every component config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.source.validate()?;
        self.vrf.validate()?;
        self.ledger.validate()?;
        self.compensation.validate()?;
        Ok(())
    }

    /// Validate configuration for production readiness.
    ///
    /// # Returns
    ///
    /// Returns `Err` if:
    /// - the proof key is all zeros or the development key
    /// - the timeout does not exceed the channel latency bound
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        self.validate()?;
        let key = &self.source.proof_key;
        if key.iter().all(|b| *b == 0) || key.as_slice() == DEV_PROOF_KEY {
            return Err(ConfigError::InsecureProofKey);
        }
        if self.compensation.timeout_secs <= self.max_channel_latency_secs {
            return Err(ConfigError::TimeoutTooShort {
                timeout_secs: self.compensation.timeout_secs,
                latency_secs: self.max_channel_latency_secs,
            });
        }
        Ok(())
    }

    /// Address the ledger is bound to on the destination chain.
    pub fn ledger_address(&self) -> Address {
        self.source.trusted_peer.address
    }
}

fn parse_num<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
        var,
        reason: e.to_string(),
    })
}

fn parse_addr(var: &'static str, value: &str) -> Result<Address, ConfigError> {
    parse_address(value.trim()).map_err(|e| ConfigError::InvalidEnv {
        var,
        reason: e.to_string(),
    })
}
