//! # Shared Bus - Channel and Events
//!
//! Two kinds of plumbing used by both chains:
//!
//! - **Message Channel** (`channel`, `transport`): the cross-chain transport.
//!   Delivery is at-least-once and unordered. The channel authenticates the
//!   sending endpoint (`src_chain`, `sender`) and nothing else.
//! - **Event Bus** (`events`, `publisher`, `subscriber`): lifecycle events for
//!   observability and audit.
//!
//! ```text
//! ┌──────────────────┐   send()    ┌───────────────┐   deliver   ┌──────────────────┐
//! │ Destination chain│ ──────────► │ MessageChannel│ ──────────► │   Source chain   │
//! │ (ledger)         │ ◄────────── │ (any order,   │ ◄────────── │   (adapter)      │
//! └──────────────────┘   deliver   │  dupes, loss) │   send()    └──────────────────┘
//!          │                       └───────────────┘                      │
//!          └──────────── publish(VrfEvent) ──► Event Bus ◄── publish ─────┘
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod channel;
pub mod events;
pub mod publisher;
pub mod subscriber;
pub mod transport;

// Re-export main types
pub use channel::{ChannelError, MessageChannel};
pub use events::{EventFilter, EventTopic, VrfEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventSubscriber, Subscription, SubscriptionError};
pub use transport::{ChannelEndpoint, InMemoryTransport};

/// Maximum events to buffer per subscriber before backpressure.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Events retained by the bus for audit queries.
pub const DEFAULT_HISTORY_CAPACITY: usize = 4096;

/// Largest payload the channel accepts.
pub const MAX_MESSAGE_SIZE: usize = 10_000;
