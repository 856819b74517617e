//! # Relay Container
//!
//! Central container holding both chains' components with proper lifetime
//! management and dependency injection.
//!
//! - Components initialized in dependency order (shared, source, destination)
//! - Chains communicate only through the message channel
//! - Lifecycle events flow through the shared event bus

pub mod config;
pub mod subsystems;

pub use config::{AlertConfig, ConfigError, NodeConfig};
pub use subsystems::{RelayContainer, SourceService};
