//! Metrics for the Randomness Source Adapter
//!
//! Lock-free counters; the runtime mirrors them into Prometheus.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for adapter operations
#[derive(Default)]
pub struct Metrics {
    /// Inbound messages that passed peer authentication
    pub inbound_accepted: AtomicU64,
    /// Inbound messages rejected by peer authentication
    pub auth_failures: AtomicU64,
    /// Redelivered requests that were ignored
    pub duplicates_suppressed: AtomicU64,
    /// Requests submitted to the local provider
    pub vrf_submissions: AtomicU64,
    /// Provider submissions that failed
    pub provider_failures: AtomicU64,
    /// Fulfillments accepted by the channel
    pub fulfillments_forwarded: AtomicU64,
    /// Fulfillment sends refused by the channel
    pub forward_failures: AtomicU64,
    /// Explicit re-sends
    pub resends: AtomicU64,
    /// Provider callbacks for unknown local ids
    pub unknown_callbacks: AtomicU64,
    /// Mappings evicted by garbage collection
    pub mappings_collected: AtomicU64,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record garbage collection
    pub fn record_collected(&self, n: usize) {
        self.mappings_collected
            .fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            inbound_accepted: self.inbound_accepted.load(Ordering::Relaxed),
            auth_failures: self.auth_failures.load(Ordering::Relaxed),
            duplicates_suppressed: self.duplicates_suppressed.load(Ordering::Relaxed),
            vrf_submissions: self.vrf_submissions.load(Ordering::Relaxed),
            provider_failures: self.provider_failures.load(Ordering::Relaxed),
            fulfillments_forwarded: self.fulfillments_forwarded.load(Ordering::Relaxed),
            forward_failures: self.forward_failures.load(Ordering::Relaxed),
            resends: self.resends.load(Ordering::Relaxed),
            unknown_callbacks: self.unknown_callbacks.load(Ordering::Relaxed),
            mappings_collected: self.mappings_collected.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of adapter metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Inbound messages that passed peer authentication
    pub inbound_accepted: u64,
    /// Inbound messages rejected by peer authentication
    pub auth_failures: u64,
    /// Redelivered requests that were ignored
    pub duplicates_suppressed: u64,
    /// Requests submitted to the local provider
    pub vrf_submissions: u64,
    /// Provider submissions that failed
    pub provider_failures: u64,
    /// Fulfillments accepted by the channel
    pub fulfillments_forwarded: u64,
    /// Fulfillment sends refused by the channel
    pub forward_failures: u64,
    /// Explicit re-sends
    pub resends: u64,
    /// Provider callbacks for unknown local ids
    pub unknown_callbacks: u64,
    /// Mappings evicted by garbage collection
    pub mappings_collected: u64,
}
