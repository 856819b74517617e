//! # `ChannelMessage` Envelope
//!
//! The wrapper for everything delivered by the cross-chain message channel.
//!
//! ## Security Properties
//!
//! - **Channel Authority**: `src_chain`, `sender` and `nonce` are stamped by the
//!   channel from the sending endpoint's identity. Receivers trust these fields
//!   and nothing inside `payload`.
//! - **Uniqueness**: `guid` identifies one logical send. Redeliveries of the same
//!   send share a guid; an explicit re-send gets a new one.

use crate::entities::{Address, ChainId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A message as delivered to a receiving endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// Identifier of the logical send.
    pub guid: Uuid,
    /// Chain the message was sent from.
    pub src_chain: ChainId,
    /// Application that sent the message on `src_chain`.
    pub sender: Address,
    /// Chain the message is addressed to.
    pub dst_chain: ChainId,
    /// Application the message is addressed to on `dst_chain`.
    pub receiver: Address,
    /// Per-sender outbound counter.
    pub nonce: u64,
    /// Encoded payload (see `codec`).
    pub payload: Vec<u8>,
}

/// Acknowledgement that the channel accepted a send.
///
/// Acceptance is not delivery: the receiver may see the message zero or more
/// times, in any order relative to other sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReceipt {
    /// Identifier of the logical send.
    pub guid: Uuid,
    /// Sender-side nonce.
    pub nonce: u64,
}
