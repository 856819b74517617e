//! # Relay Wiring
//!
//! Connects the two chains and exposes one step of each runtime loop.
//!
//! ```text
//!  ┌──────────────── destination chain ────────────────┐
//!  │  RequestLedger ◄── AccessValidator   Compensation │
//!  └──────┬───────────────────▲────────────────▲───────┘
//!         │ request           │ fulfillment    │ sweep
//!         ▼                   │                │
//!  ┌──────────── InMemoryTransport ────────────┐    RelayDriver
//!  └──────┬───────────────────▲────────────────┘
//!         ▼                   │
//!  ┌──────────────── source chain ─────────────────────┐
//!  │  RandomnessSourceService ──► InMemoryVrfProvider  │
//!  └───────────────────────────────────────────────────┘
//! ```

pub mod alerts;
pub mod metrics_bridge;
pub mod relay;
pub mod workload;

pub use alerts::{Alert, AlertSnapshot, AlertWatcher};
pub use metrics_bridge::sync_metrics;
pub use relay::{RelayDriver, RoundReport};
pub use workload::{DemoWorkload, LoggingConsumer};
