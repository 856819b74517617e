//! # Adapters Module
//!
//! In-memory implementations of outbound ports.

pub mod vrf_provider;

pub use vrf_provider::{InMemoryVrfProvider, DEFAULT_REQUEST_FEE};
