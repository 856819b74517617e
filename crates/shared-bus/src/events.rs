//! # Lifecycle Events
//!
//! Every externally observable step of a request's life, published by the
//! component that performed it. Events are informational: nothing in the
//! protocol depends on them being delivered.

use serde::{Deserialize, Serialize};
use shared_types::{Address, ChainId, CredentialId, LocalVrfRequestId, RequestId, U256};

/// All events that can be published to the event bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VrfEvent {
    // =========================================================================
    // DESTINATION CHAIN: REQUEST LEDGER
    // =========================================================================
    /// A request was recorded as pending and handed to the channel.
    RequestCreated {
        request_id: RequestId,
        requester: Address,
        dest_chain: ChainId,
        timestamp: u64,
    },

    /// A pending request received its randomness.
    RequestFulfilled {
        request_id: RequestId,
        requester: Address,
        random_value: U256,
        timestamp: u64,
    },

    /// An administrator rejected a pending request.
    RequestRejected {
        request_id: RequestId,
        reason: String,
        timestamp: u64,
    },

    /// The consumer callback failed after a fulfillment was committed.
    ConsumerCallbackFailed {
        request_id: RequestId,
        reason: String,
        timestamp: u64,
    },

    // =========================================================================
    // DESTINATION CHAIN: COMPENSATION
    // =========================================================================
    /// A timed-out request was compensated with a credential.
    RequestCompensated {
        request_id: RequestId,
        requester: Address,
        credential_id: CredentialId,
        timestamp: u64,
    },

    /// A credential was redeemed by its owner.
    CredentialRedeemed {
        credential_id: CredentialId,
        owner: Address,
        source_request_id: RequestId,
        timestamp: u64,
    },

    /// A credential changed owner.
    CredentialTransferred {
        credential_id: CredentialId,
        from: Address,
        to: Address,
        timestamp: u64,
    },

    // =========================================================================
    // SOURCE CHAIN: RANDOMNESS SOURCE ADAPTER
    // =========================================================================
    /// An inbound request was submitted to the local VRF provider.
    InboundRequestAccepted {
        request_id: RequestId,
        local_vrf_id: LocalVrfRequestId,
        timestamp: u64,
    },

    /// A redelivered inbound request was ignored.
    DuplicateInboundSuppressed {
        request_id: RequestId,
        timestamp: u64,
    },

    /// Randomness was sent back to the destination chain.
    FulfillmentForwarded {
        request_id: RequestId,
        local_vrf_id: LocalVrfRequestId,
        timestamp: u64,
    },

    // =========================================================================
    // SECURITY
    // =========================================================================
    /// A caller or channel peer failed authorization.
    AuthorizationFailed {
        component: String,
        caller: Address,
        src_chain: Option<ChainId>,
        reason: String,
        timestamp: u64,
    },

    /// A privileged configuration update was applied.
    ConfigUpdated {
        component: String,
        admin: Address,
        timestamp: u64,
    },
}

impl VrfEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::RequestCreated { .. }
            | Self::RequestFulfilled { .. }
            | Self::RequestRejected { .. }
            | Self::ConsumerCallbackFailed { .. } => EventTopic::Ledger,
            Self::RequestCompensated { .. }
            | Self::CredentialRedeemed { .. }
            | Self::CredentialTransferred { .. } => EventTopic::Compensation,
            Self::InboundRequestAccepted { .. }
            | Self::DuplicateInboundSuppressed { .. }
            | Self::FulfillmentForwarded { .. } => EventTopic::Source,
            Self::AuthorizationFailed { .. } | Self::ConfigUpdated { .. } => EventTopic::Security,
        }
    }

    /// The request this event concerns, if any.
    #[must_use]
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Self::RequestCreated { request_id, .. }
            | Self::RequestFulfilled { request_id, .. }
            | Self::RequestRejected { request_id, .. }
            | Self::ConsumerCallbackFailed { request_id, .. }
            | Self::RequestCompensated { request_id, .. }
            | Self::InboundRequestAccepted { request_id, .. }
            | Self::DuplicateInboundSuppressed { request_id, .. }
            | Self::FulfillmentForwarded { request_id, .. } => Some(*request_id),
            Self::CredentialRedeemed {
                source_request_id, ..
            } => Some(*source_request_id),
            Self::CredentialTransferred { .. }
            | Self::AuthorizationFailed { .. }
            | Self::ConfigUpdated { .. } => None,
        }
    }

    /// When the event happened.
    #[must_use]
    pub fn timestamp(&self) -> u64 {
        match self {
            Self::RequestCreated { timestamp, .. }
            | Self::RequestFulfilled { timestamp, .. }
            | Self::RequestRejected { timestamp, .. }
            | Self::ConsumerCallbackFailed { timestamp, .. }
            | Self::RequestCompensated { timestamp, .. }
            | Self::CredentialRedeemed { timestamp, .. }
            | Self::CredentialTransferred { timestamp, .. }
            | Self::InboundRequestAccepted { timestamp, .. }
            | Self::DuplicateInboundSuppressed { timestamp, .. }
            | Self::FulfillmentForwarded { timestamp, .. }
            | Self::AuthorizationFailed { timestamp, .. }
            | Self::ConfigUpdated { timestamp, .. } => *timestamp,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Request ledger transitions.
    Ledger,
    /// Source adapter activity.
    Source,
    /// Credential minting, redemption and transfer.
    Compensation,
    /// Authorization failures and privileged updates.
    Security,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Only events about this request. `None` means any.
    pub request_id: Option<RequestId>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            request_id: None,
        }
    }

    /// Create a filter for a single request.
    #[must_use]
    pub fn request(request_id: RequestId) -> Self {
        Self {
            topics: Vec::new(),
            request_id: Some(request_id),
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &VrfEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let request_match = match self.request_id {
            None => true,
            Some(id) => event.request_id() == Some(id),
        };

        topic_match && request_match
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created(id: u64) -> VrfEvent {
        VrfEvent::RequestCreated {
            request_id: U256::from(id),
            requester: [1; 20],
            dest_chain: ChainId(2),
            timestamp: 10,
        }
    }

    #[test]
    fn test_event_topic_mapping() {
        assert_eq!(created(1).topic(), EventTopic::Ledger);
        let event = VrfEvent::DuplicateInboundSuppressed {
            request_id: U256::one(),
            timestamp: 0,
        };
        assert_eq!(event.topic(), EventTopic::Source);
        let event = VrfEvent::AuthorizationFailed {
            component: "validator".into(),
            caller: [0; 20],
            src_chain: None,
            reason: "contract caller".into(),
            timestamp: 0,
        };
        assert_eq!(event.topic(), EventTopic::Security);
        assert_eq!(event.request_id(), None);
    }

    #[test]
    fn test_filter_all() {
        assert!(EventFilter::all().matches(&created(1)));
    }

    #[test]
    fn test_filter_by_topic() {
        let filter = EventFilter::topics(vec![EventTopic::Compensation]);
        assert!(!filter.matches(&created(1)));

        let event = VrfEvent::RequestCompensated {
            request_id: U256::one(),
            requester: [1; 20],
            credential_id: 1,
            timestamp: 0,
        };
        assert!(filter.matches(&event));
    }

    #[test]
    fn test_filter_by_request() {
        let filter = EventFilter::request(U256::from(2u64));
        assert!(!filter.matches(&created(1)));
        assert!(filter.matches(&created(2)));
    }

    #[test]
    fn test_redeemed_event_links_request() {
        let event = VrfEvent::CredentialRedeemed {
            credential_id: 3,
            owner: [1; 20],
            source_request_id: U256::from(9u64),
            timestamp: 5,
        };
        assert_eq!(event.request_id(), Some(U256::from(9u64)));
        assert_eq!(event.timestamp(), 5);
    }
}
