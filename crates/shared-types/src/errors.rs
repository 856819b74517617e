//! # Error Types
//!
//! Errors shared across crates.

use thiserror::Error;

/// Errors from decoding or encoding channel payloads.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Input ended before the fixed-width layout was complete.
    #[error("Truncated payload: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// Payload version not supported.
    #[error("Unsupported version: received {received}, supported {supported}")]
    UnsupportedVersion { received: u8, supported: u8 },

    /// Payload kind byte does not match the expected message.
    #[error("Unexpected payload kind: expected {expected:#04x}, got {actual:#04x}")]
    UnexpectedKind { expected: u8, actual: u8 },

    /// Bytes left over after the declared layout.
    #[error("Trailing bytes: {0} unexpected byte(s) after payload")]
    TrailingBytes(usize),

    /// Proof exceeds the wire limit.
    #[error("Proof too large: {len} bytes exceeds limit of {max}")]
    ProofTooLarge { len: usize, max: usize },
}

/// Errors from privileged configuration updates.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Caller is not the configuration admin.
    #[error("Not admin: {caller} may not update configuration")]
    NotAdmin { caller: String },

    /// A field failed validation.
    #[error("Invalid config field '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}
