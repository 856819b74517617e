//! # Core Primitives
//!
//! Identifiers and caller capabilities used on both chains.

use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export U256 from primitive-types for use across all crates
pub use primitive_types::U256;

/// A 32-byte hash (key hashes, proofs).
pub type Hash = [u8; 32];

/// A 20-byte Ethereum-style address.
pub type Address = [u8; 20];

/// Correlation identifier of a randomness request, assigned by the ledger.
pub type RequestId = U256;

/// Identifier assigned by the local VRF provider on the source chain.
pub type LocalVrfRequestId = U256;

/// Identifier of a compensation credential. Starts at 1.
pub type CredentialId = u64;

/// The all-zero address. Never a valid coordinator or owner.
pub const ZERO_ADDRESS: Address = [0u8; 20];

/// Logical endpoint identifier of a chain on the message channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct ChainId(pub u32);

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chain-{}", self.0)
    }
}

/// Whether an invoker is an externally owned account or a contract.
///
/// The runtime boundary resolves this once; components never inspect code
/// size or call stacks themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallerKind {
    /// Externally owned account.
    Account,
    /// Contract account.
    Contract,
}

/// Identity of whoever invokes an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Caller {
    /// Caller address.
    pub address: Address,
    /// Capability resolved by the runtime.
    pub kind: CallerKind,
}

impl Caller {
    /// An externally owned account.
    #[must_use]
    pub fn account(address: Address) -> Self {
        Self {
            address,
            kind: CallerKind::Account,
        }
    }

    /// A contract.
    #[must_use]
    pub fn contract(address: Address) -> Self {
        Self {
            address,
            kind: CallerKind::Contract,
        }
    }

    /// True if the caller is an externally owned account.
    #[must_use]
    pub fn is_account(&self) -> bool {
        self.kind == CallerKind::Account
    }
}

/// Hex rendering of an address for logs and error messages.
#[must_use]
pub fn address_hex(address: &Address) -> String {
    format!("0x{}", hex::encode(address))
}

/// Parse a `0x`-prefixed (or bare) hex address.
pub fn parse_address(s: &str) -> Result<Address, hex::FromHexError> {
    let raw = s.strip_prefix("0x").unwrap_or(s);
    let mut out = [0u8; 20];
    hex::decode_to_slice(raw, &mut out)?;
    Ok(out)
}
