//! # Message Channel Port
//!
//! The only way the two chains talk. Implementations stamp the envelope with
//! the sending endpoint's identity, so receivers can trust `src_chain` and
//! `sender` on every `ChannelMessage`.
//!
//! Guarantees a caller may rely on:
//!
//! - A successful `send` means the channel accepted the message, not that it
//!   was delivered.
//! - Delivery is at-least-once when it happens at all, with no ordering
//!   between sends.
//! - Nothing is acknowledged back. Retries are explicit re-sends.

use async_trait::async_trait;
use shared_types::{Address, ChainId, MessageReceipt};
use thiserror::Error;

/// Errors a channel may return from `send`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// The channel refused the send (outage, fees, rate limit).
    #[error("Channel unavailable: {0}")]
    Unavailable(String),

    /// Payload is over the channel's size limit.
    #[error("Payload too large: {len} bytes exceeds limit of {max}")]
    PayloadTooLarge { len: usize, max: usize },
}

/// A bound sending endpoint on the cross-chain channel.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Send `payload` to `receiver` on `dst_chain`.
    async fn send(
        &self,
        dst_chain: ChainId,
        receiver: Address,
        payload: Vec<u8>,
    ) -> Result<MessageReceipt, ChannelError>;

    /// Chain this endpoint sends from.
    fn local_chain(&self) -> ChainId;

    /// Address this endpoint sends as.
    fn local_address(&self) -> Address;
}
