//! # Domain Module
//!
//! Core domain types for the Randomness Source Adapter.

pub mod config;
pub mod entities;
pub mod errors;

pub use config::*;
pub use entities::*;
pub use errors::*;
