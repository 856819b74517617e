//! # Domain Errors
//!
//! Error types for the destination-chain components.

use super::value_objects::RequestStatus;
use shared_types::{ChainId, CodecError, ConfigError, CredentialId, RequestId};
use thiserror::Error;

/// Why a caller or channel message failed authorization.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthFailure {
    /// Invoker is a contract, not an externally owned account.
    #[error("caller is a contract")]
    ContractCaller,

    /// Message arrived from a chain other than the configured source chain.
    #[error("untrusted source chain: expected {expected}, got {actual}")]
    UntrustedChain { expected: ChainId, actual: ChainId },

    /// Message sender is not the pinned coordinator.
    #[error("coordinator mismatch: expected {expected}, got {actual}")]
    CoordinatorMismatch { expected: String, actual: String },
}

impl AuthFailure {
    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ContractCaller => "contract_caller",
            Self::UntrustedChain { .. } => "untrusted_chain",
            Self::CoordinatorMismatch { .. } => "coordinator_mismatch",
        }
    }
}

/// Destination-chain errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// Allocated id already present in the ledger.
    #[error("Duplicate request id: {0}")]
    DuplicateId(RequestId),

    /// No request with this id.
    #[error("Unknown request: {0}")]
    UnknownRequest(RequestId),

    /// Request already left `Pending`.
    #[error("Request {id} already terminal: {status:?}")]
    AlreadyTerminal { id: RequestId, status: RequestStatus },

    /// Fulfillment echoed a different requester than the one recorded.
    #[error("Requester mismatch for request {0}")]
    RequesterMismatch(RequestId),

    /// Access validator rejected the caller or message.
    #[error("Unauthorized caller: {0}")]
    UnauthorizedCaller(AuthFailure),

    /// Caller may not create requests.
    #[error("Unauthorized trigger: {0}")]
    UnauthorizedTrigger(String),

    /// Fulfillment payload failed to decode.
    #[error("Bad encoding: {0}")]
    BadEncoding(#[from] CodecError),

    /// No credential with this id.
    #[error("Unknown credential: {0}")]
    UnknownCredential(CredentialId),

    /// Caller does not own the credential.
    #[error("Not owner of credential {0}")]
    NotOwner(CredentialId),

    /// Credential already redeemed.
    #[error("Credential {0} already redeemed")]
    AlreadyRedeemed(CredentialId),

    /// Transfer to the zero address.
    #[error("Invalid recipient for credential {0}")]
    InvalidRecipient(CredentialId),

    /// Entry registered for the zero address.
    #[error("Entry holder must not be the zero address")]
    ZeroHolder,

    /// Caller is not the administrator.
    #[error("Not admin: {0}")]
    NotAdmin(String),

    /// Privileged update rejected.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl LedgerError {
    /// True for authorization failures (logged on the security target).
    pub fn is_authorization_failure(&self) -> bool {
        matches!(
            self,
            Self::UnauthorizedCaller(_) | Self::UnauthorizedTrigger(_) | Self::NotAdmin(_)
        )
    }
}
