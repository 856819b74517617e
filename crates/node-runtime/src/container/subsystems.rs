//! # Relay Container
//!
//! Holds both chains' components and the shared infrastructure.
//!
//! ## Initialization Order
//!
//! ```text
//! 1. Shared: in-memory transport, event bus
//! 2. Source chain: VRF provider, Randomness Source Adapter
//! 3. Destination chain: Request Ledger, then Access Validator and
//!    Compensation Engine (both hold the ledger)
//! ```
//!
//! Each component is bound to its own channel endpoint, so the transport
//! stamps the correct `(chain, address)` on everything it sends.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use shared_bus::{ChannelEndpoint, InMemoryEventBus, InMemoryTransport};
use shared_types::address_hex;
use xv_01_randomness_source::{InMemoryVrfProvider, RandomnessSourceService};
use xv_02_request_ledger::{AccessValidator, CompensationEngine, RequestLedger};

use crate::container::config::NodeConfig;

/// Concrete Randomness Source Adapter.
pub type SourceService = RandomnessSourceService<InMemoryVrfProvider, ChannelEndpoint>;

/// Central container holding every component instance.
pub struct RelayContainer {
    /// Configuration the container was built from.
    pub config: NodeConfig,

    // =========================================================================
    // SHARED INFRASTRUCTURE
    // =========================================================================
    /// Message channel between the chains.
    pub transport: InMemoryTransport,
    /// Lifecycle event bus.
    pub bus: Arc<InMemoryEventBus>,

    // =========================================================================
    // SOURCE CHAIN
    // =========================================================================
    /// Simulated VRF provider.
    pub provider: Arc<InMemoryVrfProvider>,
    /// Randomness Source Adapter.
    pub source: Arc<SourceService>,

    // =========================================================================
    // DESTINATION CHAIN
    // =========================================================================
    /// Request Ledger.
    pub ledger: Arc<RequestLedger<ChannelEndpoint>>,
    /// Access Validator.
    pub validator: Arc<AccessValidator<ChannelEndpoint>>,
    /// Compensation Engine.
    pub compensation: Arc<CompensationEngine<ChannelEndpoint>>,
}

impl RelayContainer {
    /// Build every component from `config`.
    pub fn new(config: NodeConfig) -> Result<Self> {
        config.validate().context("invalid node configuration")?;

        let transport = InMemoryTransport::new();
        let bus = Arc::new(InMemoryEventBus::new());

        let provider = Arc::new(InMemoryVrfProvider::new(
            config.provider.seed_key.clone(),
            config.vrf.subscription_id,
            config.provider.balance,
        ));
        let source_endpoint =
            transport.endpoint(config.source.local_chain, config.ledger.source_adapter);
        let source = Arc::new(
            RandomnessSourceService::new(
                provider.clone(),
                Arc::new(source_endpoint),
                bus.clone(),
                config.source.clone(),
                config.vrf.clone(),
            )
            .context("failed to build randomness source adapter")?,
        );
        info!(
            chain = %config.source.local_chain,
            address = %address_hex(&config.ledger.source_adapter),
            "[xv-01] Randomness source adapter ready"
        );

        let ledger_endpoint = transport.endpoint(config.ledger.local_chain, config.ledger_address());
        let ledger = Arc::new(
            RequestLedger::new(Arc::new(ledger_endpoint), bus.clone(), config.ledger.clone())
                .context("failed to build request ledger")?,
        );
        let validator = Arc::new(
            AccessValidator::for_ledger(ledger.clone()).context("failed to build access validator")?,
        );
        let compensation = Arc::new(
            CompensationEngine::new(ledger.clone(), config.compensation.clone())
                .context("failed to build compensation engine")?,
        );
        info!(
            chain = %config.ledger.local_chain,
            address = %address_hex(&config.ledger_address()),
            timeout_secs = config.compensation.timeout_secs,
            "[xv-02] Request ledger ready"
        );

        Ok(Self {
            config,
            transport,
            bus,
            provider,
            source,
            ledger,
            validator,
            compensation,
        })
    }
}
