//! # Domain Errors
//!
//! Error types for the Randomness Source Adapter.

use crate::ports::ProviderError;
use shared_bus::ChannelError;
use shared_types::{ChainId, CodecError, ConfigError, LocalVrfRequestId, RequestId};
use thiserror::Error;

/// Randomness Source Adapter errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// Inbound message came from a chain other than the trusted peer chain.
    #[error("Untrusted chain: expected {expected}, got {actual}")]
    UntrustedChain { expected: ChainId, actual: ChainId },

    /// Inbound message came from an application other than the trusted peer.
    #[error("Untrusted peer: {sender}")]
    UntrustedPeer { sender: String },

    /// Payload failed to decode.
    #[error("Bad encoding: {0}")]
    BadEncoding(#[from] CodecError),

    /// Local VRF provider refused the request.
    #[error("VRF provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Provider callback for a local id we never issued (or already collected).
    #[error("Unknown local VRF request: {0}")]
    UnknownLocalRequest(LocalVrfRequestId),

    /// Provider callback arrived twice for the same local id.
    #[error("Already forwarded: request {0}")]
    AlreadyForwarded(RequestId),

    /// Provider callback carried no words.
    #[error("Empty random words for local VRF request {0}")]
    EmptyRandomWords(LocalVrfRequestId),

    /// No mapping exists for this correlation id.
    #[error("Unknown request: {0}")]
    UnknownRequest(RequestId),

    /// The mapping exists but randomness has not arrived yet.
    #[error("Not yet fulfilled: request {0}")]
    NotYetFulfilled(RequestId),

    /// The channel refused a send.
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Privileged update rejected.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Proof could not be produced.
    #[error("Proof error: {0}")]
    Proof(String),
}

impl SourceError {
    /// True for failures caused by an unauthenticated peer.
    pub fn is_authorization_failure(&self) -> bool {
        matches!(self, Self::UntrustedChain { .. } | Self::UntrustedPeer { .. })
    }
}
