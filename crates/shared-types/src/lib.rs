//! # Shared Types Crate
//!
//! Types shared by both ends of the cross-chain VRF relay: the
//! destination chain (request ledger, access validator, compensation)
//! and the source chain (randomness source adapter).
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Anything that crosses the message channel is
//!   defined here, including the wire codec.
//! - **Envelope Authority**: `ChannelMessage::src_chain` and
//!   `ChannelMessage::sender` are stamped by the channel. Payloads never carry
//!   a claimed sender.
//! - **Fixed-Width Codec**: Payloads are versioned, big-endian and fixed-width
//!   so that both chains agree byte-for-byte.

pub mod codec;
pub mod config;
pub mod entities;
pub mod envelope;
pub mod errors;
pub mod proof;

pub use codec::{FulfillmentPayload, PayloadKind, RequestPayload, MAX_PROOF_LEN, WIRE_VERSION};
pub use config::{ManagedConfig, Validate, VrfConfig};
pub use entities::*;
pub use envelope::{ChannelMessage, MessageReceipt};
pub use errors::*;
pub use proof::{sign_fulfillment, verify_fulfillment};
