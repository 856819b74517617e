//! # XV-01 Randomness Source Adapter
//!
//! Runs on the source chain. Turns authenticated relay requests into local VRF
//! provider requests and sends the resulting randomness back over the channel.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Flow
//!
//! ```text
//! channel ──► on_inbound_request ──► VrfProvider::request_random_words
//!                 │ (peer check, decode,        │
//!                 │  dedupe by request id)      ▼ (later, out of band)
//!                 │                    on_local_vrf_fulfilled
//!                 ▼                             │ (first word + HMAC proof)
//!         local_vrf_id -> mapping               ▼
//!                                       channel.send(fulfillment)
//! ```
//!
//! ## Guarantees
//!
//! | Property | How |
//! |----------|-----|
//! | One provider request per correlation id | Reservation slot taken before the provider call |
//! | Only the trusted ledger is served | `src_chain` and `sender` checked against `TrustedPeer` |
//! | Lost fulfillments are recoverable | Encoded payload retained; `resend` re-sends it |
//! | Bounded state | Mappings evicted after the GC horizon |
//!
//! ## Module Structure
//!
//! ```text
//! xv-01-randomness-source/
//! ├── domain/      # RequestMapping, SourceConfig, SourceError
//! ├── ports/       # RandomnessSourceApi, VrfProvider
//! ├── adapters/    # InMemoryVrfProvider
//! └── service/     # RandomnessSourceService
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::InMemoryVrfProvider;
pub use domain::{
    ForwardOutcome, InboundOutcome, MappingStatus, RequestMapping, SourceConfig, SourceError,
    SourceMessage, SourceOutcome, TrustedPeer, VrfStateSnapshot,
};
pub use metrics::MetricsSnapshot;
pub use ports::{ProviderError, RandomnessSourceApi, VrfProvider, VrfRequestParams};
pub use service::RandomnessSourceService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
