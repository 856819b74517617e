//! # Integration Tests
//!
//! Every test drives the relay with an explicit clock through
//! [`node_runtime::RelayDriver`] or by hand, so outcomes are deterministic.

#[cfg(test)]
mod fixtures;

#[cfg(test)]
mod compensation;
#[cfg(test)]
mod delivery;
#[cfg(test)]
mod scenarios;
