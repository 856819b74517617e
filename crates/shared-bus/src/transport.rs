//! # In-Memory Transport
//!
//! A `MessageChannel` implementation for tests, simulation and the single-process
//! node. Sent messages land in a shared in-flight pool. A driver then decides
//! what the receiving side sees:
//!
//! - `take_for` delivers in send order.
//! - `take_shuffled` delivers in a seeded random order.
//! - `duplicate_in_flight` models at-least-once redelivery.
//! - `drop_in_flight` models loss.
//! - `set_unavailable` / `fail_next_sends` make `send` fail.

use crate::channel::{ChannelError, MessageChannel};
use crate::MAX_MESSAGE_SIZE;
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use shared_types::{address_hex, Address, ChainId, ChannelMessage, MessageReceipt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Default)]
struct TransportState {
    in_flight: Mutex<Vec<ChannelMessage>>,
    nonces: Mutex<HashMap<(ChainId, Address), u64>>,
    unavailable: AtomicBool,
    fail_next: AtomicUsize,
    sent: AtomicU64,
    delivered: AtomicU64,
}

/// Shared in-memory channel. Clone to share between chains and drivers.
#[derive(Clone, Default)]
pub struct InMemoryTransport {
    state: Arc<TransportState>,
}

impl InMemoryTransport {
    /// Create an empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a sending endpoint to `(chain, address)`.
    #[must_use]
    pub fn endpoint(&self, chain: ChainId, address: Address) -> ChannelEndpoint {
        ChannelEndpoint {
            state: self.state.clone(),
            chain,
            address,
        }
    }

    /// Remove and return every message addressed to `chain`, in send order.
    pub fn take_for(&self, chain: ChainId) -> Vec<ChannelMessage> {
        let mut pool = self.state.in_flight.lock();
        let (taken, kept): (Vec<_>, Vec<_>) = pool.drain(..).partition(|m| m.dst_chain == chain);
        *pool = kept;
        self.state
            .delivered
            .fetch_add(taken.len() as u64, Ordering::Relaxed);
        taken
    }

    /// Remove and return every message addressed to `chain`, in an order
    /// determined by `seed`.
    pub fn take_shuffled(&self, chain: ChainId, seed: u64) -> Vec<ChannelMessage> {
        let mut taken = self.take_for(chain);
        let mut rng = StdRng::seed_from_u64(seed);
        taken.shuffle(&mut rng);
        taken
    }

    /// Duplicate every in-flight message (same guid). Returns how many copies
    /// were added.
    pub fn duplicate_in_flight(&self) -> usize {
        let mut pool = self.state.in_flight.lock();
        let copies: Vec<_> = pool.clone();
        let n = copies.len();
        pool.extend(copies);
        debug!(copies = n, "[bus] Duplicated in-flight messages");
        n
    }

    /// Discard every in-flight message addressed to `chain`.
    pub fn drop_in_flight(&self, chain: ChainId) -> usize {
        let mut pool = self.state.in_flight.lock();
        let before = pool.len();
        pool.retain(|m| m.dst_chain != chain);
        let dropped = before - pool.len();
        warn!(chain = %chain, dropped, "[bus] Dropped in-flight messages");
        dropped
    }

    /// Put a message back in flight, e.g. to replay an observed delivery.
    pub fn inject(&self, message: ChannelMessage) {
        self.state.in_flight.lock().push(message);
    }

    /// While set, every send fails with `ChannelError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fail the next `n` sends.
    pub fn fail_next_sends(&self, n: usize) {
        self.state.fail_next.store(n, Ordering::SeqCst);
    }

    /// Messages currently in flight to `chain`.
    #[must_use]
    pub fn in_flight_for(&self, chain: ChainId) -> usize {
        self.state
            .in_flight
            .lock()
            .iter()
            .filter(|m| m.dst_chain == chain)
            .count()
    }

    /// All messages currently in flight.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.state.in_flight.lock().len()
    }

    /// Sends accepted so far.
    #[must_use]
    pub fn sent_count(&self) -> u64 {
        self.state.sent.load(Ordering::Relaxed)
    }

    /// Messages handed to receivers so far.
    #[must_use]
    pub fn delivered_count(&self) -> u64 {
        self.state.delivered.load(Ordering::Relaxed)
    }

    fn should_fail(&self) -> bool {
        if self.state.unavailable.load(Ordering::SeqCst) {
            return true;
        }
        self.state
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// A sending endpoint bound to one `(chain, address)` identity.
#[derive(Clone)]
pub struct ChannelEndpoint {
    state: Arc<TransportState>,
    chain: ChainId,
    address: Address,
}

impl ChannelEndpoint {
    fn transport(&self) -> InMemoryTransport {
        InMemoryTransport {
            state: self.state.clone(),
        }
    }
}

#[async_trait]
impl MessageChannel for ChannelEndpoint {
    async fn send(
        &self,
        dst_chain: ChainId,
        receiver: Address,
        payload: Vec<u8>,
    ) -> Result<MessageReceipt, ChannelError> {
        if payload.len() > MAX_MESSAGE_SIZE {
            return Err(ChannelError::PayloadTooLarge {
                len: payload.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }
        if self.transport().should_fail() {
            return Err(ChannelError::Unavailable(format!(
                "send from {} to {} refused",
                self.chain, dst_chain
            )));
        }

        let nonce = {
            let mut nonces = self.state.nonces.lock();
            let n = nonces.entry((self.chain, self.address)).or_insert(0);
            *n += 1;
            *n
        };
        let message = ChannelMessage {
            guid: Uuid::new_v4(),
            src_chain: self.chain,
            sender: self.address,
            dst_chain,
            receiver,
            nonce,
            payload,
        };
        let receipt = MessageReceipt {
            guid: message.guid,
            nonce,
        };

        debug!(
            src = %self.chain,
            dst = %dst_chain,
            sender = %address_hex(&self.address),
            nonce,
            "[bus] Message accepted"
        );
        self.state.in_flight.lock().push(message);
        self.state.sent.fetch_add(1, Ordering::Relaxed);
        Ok(receipt)
    }

    fn local_chain(&self) -> ChainId {
        self.chain
    }

    fn local_address(&self) -> Address {
        self.address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ChainId = ChainId(1);
    const B: ChainId = ChainId(2);

    #[tokio::test]
    async fn test_send_stamps_identity() {
        let transport = InMemoryTransport::new();
        let ep = transport.endpoint(A, [0xAA; 20]);

        let receipt = ep.send(B, [0xBB; 20], vec![1, 2, 3]).await.unwrap();
        let delivered = transport.take_for(B);

        assert_eq!(delivered.len(), 1);
        let msg = &delivered[0];
        assert_eq!(msg.src_chain, A);
        assert_eq!(msg.sender, [0xAA; 20]);
        assert_eq!(msg.receiver, [0xBB; 20]);
        assert_eq!(msg.guid, receipt.guid);
        assert_eq!(msg.nonce, 1);
    }

    #[tokio::test]
    async fn test_nonce_per_endpoint() {
        let transport = InMemoryTransport::new();
        let ep1 = transport.endpoint(A, [1; 20]);
        let ep2 = transport.endpoint(A, [2; 20]);

        assert_eq!(ep1.send(B, [0; 20], vec![]).await.unwrap().nonce, 1);
        assert_eq!(ep1.send(B, [0; 20], vec![]).await.unwrap().nonce, 2);
        assert_eq!(ep2.send(B, [0; 20], vec![]).await.unwrap().nonce, 1);
    }

    #[tokio::test]
    async fn test_take_for_only_matching_chain() {
        let transport = InMemoryTransport::new();
        let ep = transport.endpoint(A, [1; 20]);
        ep.send(B, [0; 20], vec![1]).await.unwrap();
        ep.send(A, [0; 20], vec![2]).await.unwrap();

        assert_eq!(transport.take_for(B).len(), 1);
        assert_eq!(transport.in_flight_for(A), 1);
        assert_eq!(transport.delivered_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_keeps_guid() {
        let transport = InMemoryTransport::new();
        let ep = transport.endpoint(A, [1; 20]);
        ep.send(B, [0; 20], vec![9]).await.unwrap();

        assert_eq!(transport.duplicate_in_flight(), 1);
        let delivered = transport.take_for(B);
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].guid, delivered[1].guid);
    }

    #[tokio::test]
    async fn test_shuffle_is_deterministic_per_seed() {
        let transport = InMemoryTransport::new();
        let ep = transport.endpoint(A, [1; 20]);
        for i in 0..16u8 {
            ep.send(B, [0; 20], vec![i]).await.unwrap();
        }
        let first: Vec<_> = transport
            .take_shuffled(B, 42)
            .into_iter()
            .map(|m| m.payload[0])
            .collect();

        for i in 0..16u8 {
            ep.send(B, [0; 20], vec![i]).await.unwrap();
        }
        let second: Vec<_> = transport
            .take_shuffled(B, 42)
            .into_iter()
            .map(|m| m.payload[0])
            .collect();

        assert_eq!(first, second);
        let mut sorted = first.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..16u8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_unavailable_and_fail_next() {
        let transport = InMemoryTransport::new();
        let ep = transport.endpoint(A, [1; 20]);

        transport.set_unavailable(true);
        assert!(matches!(
            ep.send(B, [0; 20], vec![]).await,
            Err(ChannelError::Unavailable(_))
        ));
        transport.set_unavailable(false);

        transport.fail_next_sends(1);
        assert!(ep.send(B, [0; 20], vec![]).await.is_err());
        assert!(ep.send(B, [0; 20], vec![]).await.is_ok());
        assert_eq!(transport.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_oversized_payload_rejected() {
        let transport = InMemoryTransport::new();
        let ep = transport.endpoint(A, [1; 20]);
        let result = ep.send(B, [0; 20], vec![0; MAX_MESSAGE_SIZE + 1]).await;
        assert!(matches!(result, Err(ChannelError::PayloadTooLarge { .. })));
    }

    #[tokio::test]
    async fn test_drop_in_flight() {
        let transport = InMemoryTransport::new();
        let ep = transport.endpoint(A, [1; 20]);
        ep.send(B, [0; 20], vec![]).await.unwrap();
        ep.send(B, [0; 20], vec![]).await.unwrap();
        assert_eq!(transport.drop_in_flight(B), 2);
        assert!(transport.take_for(B).is_empty());
    }
}
