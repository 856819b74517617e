//! # Node Runtime Library
//!
//! Hosts both chains of the cross-chain VRF relay in one process and
//! drives the message channel between them. The main entry point is the
//! `xv-node` binary.
//!
//! ## Layout
//!
//! - `container/` - configuration and component construction
//! - `wiring/` - one step of each relay loop, with an explicit clock
//! - `runtime` - spawns the loops and handles shutdown

#![warn(missing_docs)]
#![allow(clippy::type_complexity)]

pub mod container;
pub mod runtime;
pub mod wiring;

pub use container::{AlertConfig, ConfigError, NodeConfig, RelayContainer};
pub use runtime::{unix_now, NodeRuntime};
pub use wiring::{AlertSnapshot, AlertWatcher, DemoWorkload, RelayDriver, RoundReport};
