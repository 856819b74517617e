//! Metrics for the destination-chain components
//!
//! One collector is shared by the ledger, validator and compensation engine.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for destination-chain operations
#[derive(Default)]
pub struct Metrics {
    /// Requests created
    pub requests_created: AtomicU64,
    /// Request sends refused by the channel
    pub request_send_failures: AtomicU64,
    /// Requests fulfilled
    pub fulfilled: AtomicU64,
    /// Requests compensated
    pub compensated: AtomicU64,
    /// Requests rejected by the admin
    pub rejected: AtomicU64,
    /// Fulfillments refused for protocol reasons (unknown, terminal, mismatch)
    pub protocol_rejections: AtomicU64,
    /// Caller or message authorization failures
    pub auth_failures: AtomicU64,
    /// Fulfillment payloads that failed to decode
    pub bad_encodings: AtomicU64,
    /// Consumer callbacks that errored or panicked
    pub consumer_failures: AtomicU64,
    /// Credentials minted
    pub credentials_minted: AtomicU64,
    /// Credentials redeemed
    pub credentials_redeemed: AtomicU64,
    /// Credential transfers
    pub credentials_transferred: AtomicU64,
    /// Entries registered by the admin
    pub entries_registered: AtomicU64,
    /// Timeout sweeps run
    pub sweeps: AtomicU64,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_created: self.requests_created.load(Ordering::Relaxed),
            request_send_failures: self.request_send_failures.load(Ordering::Relaxed),
            fulfilled: self.fulfilled.load(Ordering::Relaxed),
            compensated: self.compensated.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            protocol_rejections: self.protocol_rejections.load(Ordering::Relaxed),
            auth_failures: self.auth_failures.load(Ordering::Relaxed),
            bad_encodings: self.bad_encodings.load(Ordering::Relaxed),
            consumer_failures: self.consumer_failures.load(Ordering::Relaxed),
            credentials_minted: self.credentials_minted.load(Ordering::Relaxed),
            credentials_redeemed: self.credentials_redeemed.load(Ordering::Relaxed),
            credentials_transferred: self.credentials_transferred.load(Ordering::Relaxed),
            entries_registered: self.entries_registered.load(Ordering::Relaxed),
            sweeps: self.sweeps.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of destination-chain metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Requests created
    pub requests_created: u64,
    /// Request sends refused by the channel
    pub request_send_failures: u64,
    /// Requests fulfilled
    pub fulfilled: u64,
    /// Requests compensated
    pub compensated: u64,
    /// Requests rejected by the admin
    pub rejected: u64,
    /// Fulfillments refused for protocol reasons
    pub protocol_rejections: u64,
    /// Caller or message authorization failures
    pub auth_failures: u64,
    /// Fulfillment payloads that failed to decode
    pub bad_encodings: u64,
    /// Consumer callbacks that errored or panicked
    pub consumer_failures: u64,
    /// Credentials minted
    pub credentials_minted: u64,
    /// Credentials redeemed
    pub credentials_redeemed: u64,
    /// Credential transfers
    pub credentials_transferred: u64,
    /// Entries registered by the admin
    pub entries_registered: u64,
    /// Timeout sweeps run
    pub sweeps: u64,
}

impl MetricsSnapshot {
    /// Compensated share of resolved requests
    pub fn compensation_rate(&self) -> f64 {
        let resolved = self.fulfilled + self.compensated + self.rejected;
        if resolved == 0 {
            return 0.0;
        }
        self.compensated as f64 / resolved as f64
    }
}
