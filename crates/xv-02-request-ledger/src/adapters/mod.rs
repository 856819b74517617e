//! # Adapters
//!
//! In-memory implementations of the outbound ports.

pub mod consumer;

pub use consumer::{ConsumerBehavior, RecordingConsumer};
