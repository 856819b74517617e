//! # XV-02 Request Ledger
//!
//! Destination-chain side of the relay: the request ledger, the access
//! validator that guards fulfillment, and the compensation engine that
//! credits requests whose randomness never arrived.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Lifecycle
//!
//! ```text
//! create_request ──► Pending ──┬── verify_and_forward ──► Fulfilled ──► consumer
//!      │                       ├── sweep_timeouts ──────► Compensated ─► credential
//!      ▼                       └── reject (admin) ──────► Rejected
//!  channel.send(request)
//! ```
//!
//! ## Guarantees
//!
//! | Property | How |
//! |----------|-----|
//! | One terminal transition per request | Status checked and set under the ledger write lock |
//! | Only the coordinator can fulfill | `fulfill` is crate-private; `AccessValidator` is the only caller |
//! | One credential per timed-out request | Minted inside the compensation transition; indexed by request id |
//! | Consumer failures are isolated | Callback runs after the lock, under `catch_unwind` |
//!
//! ## Module Structure
//!
//! ```text
//! xv-02-request-ledger/
//! ├── domain/        # RandomnessRequest, CompensationCredential, LedgerError
//! ├── ports/         # RequestLedgerApi, AccessValidatorApi, CompensationApi, RandomnessConsumer
//! ├── adapters/      # RecordingConsumer
//! ├── service/       # RequestLedger
//! ├── validator.rs   # AccessValidator
//! └── compensation.rs # CompensationEngine
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod compensation;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;
pub mod validator;

// Re-exports
pub use adapters::{ConsumerBehavior, RecordingConsumer};
pub use compensation::CompensationEngine;
pub use domain::{
    AuthFailure, CompensatedRequest, CompensationConfig, CompensationCredential, LedgerConfig,
    LedgerError, LedgerStats, RandomnessRequest, RedemptionReceipt, RequestStatus, SweepReport,
};
pub use metrics::MetricsSnapshot;
pub use ports::{
    AccessValidatorApi, CompensationApi, ConsumerError, RandomnessConsumer, RequestLedgerApi,
};
pub use service::RequestLedger;
pub use validator::AccessValidator;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
