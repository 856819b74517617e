//! # Relay Driver
//!
//! One step of each runtime loop, callable with an explicit clock so that
//! tests can drive the relay deterministically.
//!
//! ```text
//! ledger ──send──► [transport] ──deliver_to_source──► adapter ──► provider
//!                                                                    │
//! ledger ◄──deliver_to_ledger── [transport] ◄──send── adapter ◄──fulfill_vrf
//! ```

use std::sync::Arc;

use tracing::{debug, info, warn};

use shared_types::Caller;
use xv_01_randomness_source::{InboundOutcome, MappingStatus, RandomnessSourceApi};
use xv_02_request_ledger::{
    AccessValidatorApi, CompensationApi, LedgerError, RequestLedgerApi, RequestStatus, SweepReport,
};
use xv_telemetry::metrics::SWEEP_DURATION;

use crate::container::RelayContainer;

/// What one relay round did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RoundReport {
    /// Requests the adapter submitted to the provider.
    pub submitted: usize,
    /// Redelivered requests the adapter ignored.
    pub duplicates: usize,
    /// Fulfillments the ledger accepted.
    pub fulfilled: usize,
    /// Messages refused by either side.
    pub refused: usize,
}

/// Drives messages between the chains.
pub struct RelayDriver {
    container: Arc<RelayContainer>,
    relayer: Caller,
}

impl RelayDriver {
    /// Driver delivering as the configured relayer account.
    pub fn new(container: Arc<RelayContainer>) -> Self {
        let relayer = Caller::account(container.config.relayer);
        Self { container, relayer }
    }

    /// Deliver every in-flight message addressed to the source chain.
    pub async fn deliver_to_source(&self, now: u64) -> RoundReport {
        let c = &self.container;
        let mut report = RoundReport::default();
        for msg in c.transport.take_for(c.config.source.local_chain) {
            let guid = msg.guid;
            match c.source.on_inbound_request(msg, now).await {
                Ok(InboundOutcome::Submitted(_)) => report.submitted += 1,
                Ok(InboundOutcome::Duplicate) => report.duplicates += 1,
                Err(e) => {
                    report.refused += 1;
                    debug!(%guid, error = %e, "[xv-01] Inbound message refused");
                }
            }
        }
        report
    }

    /// Deliver every in-flight message addressed to the destination chain.
    pub async fn deliver_to_ledger(&self, now: u64) -> RoundReport {
        let c = &self.container;
        let mut report = RoundReport::default();
        for msg in c.transport.take_for(c.config.ledger.local_chain) {
            match c.validator.verify_and_forward(&self.relayer, &msg, now).await {
                Ok(_) => report.fulfilled += 1,
                Err(LedgerError::AlreadyTerminal { id, status }) => {
                    report.duplicates += 1;
                    debug!(request_id = %id, ?status, "[xv-02] Late or duplicate fulfillment ignored");
                }
                Err(e) => {
                    report.refused += 1;
                    debug!(guid = %msg.guid, error = %e, "[xv-02] Fulfillment refused");
                }
            }
        }
        report
    }

    /// Collect provider callbacks and hand them to the adapter.
    pub async fn fulfill_vrf(&self, now: u64) -> usize {
        let c = &self.container;
        let ready = match c.provider.fulfill_pending() {
            Ok(ready) => ready,
            Err(e) => {
                warn!(error = %e, "[xv-01] VRF provider unavailable");
                return 0;
            }
        };
        let mut forwarded = 0;
        for (local_id, words) in ready {
            match c.source.on_local_vrf_fulfilled(local_id, words, now).await {
                Ok(_) => forwarded += 1,
                Err(e) => debug!(local_vrf_id = %local_id, error = %e, "[xv-01] Provider callback refused"),
            }
        }
        forwarded
    }

    /// Both directions plus provider callbacks, in causal order.
    pub async fn relay_round(&self, now: u64) -> RoundReport {
        let inbound = self.deliver_to_source(now).await;
        self.fulfill_vrf(now).await;
        let outbound = self.deliver_to_ledger(now).await;
        RoundReport {
            submitted: inbound.submitted,
            duplicates: inbound.duplicates + outbound.duplicates,
            fulfilled: outbound.fulfilled,
            refused: inbound.refused + outbound.refused,
        }
    }

    /// Compensate timed-out requests and evict stale adapter mappings.
    pub async fn sweep(&self, now: u64) -> SweepReport {
        let c = &self.container;
        let report = {
            let _timer = xv_telemetry::time_histogram!(SWEEP_DURATION);
            c.compensation.sweep_timeouts(now).await
        };
        let evicted = c.source.collect_garbage(now);
        if report.count() > 0 || evicted > 0 {
            info!(
                compensated = report.count(),
                still_pending = report.still_pending,
                evicted,
                "[xv-02] Sweep finished"
            );
        }
        report
    }

    /// Re-send fulfillments for requests still pending after `min_age_secs`
    /// although the adapter already has their randomness.
    pub async fn retry_stalled(&self, now: u64, min_age_secs: u64) -> usize {
        let c = &self.container;
        let mut resent = 0;
        for request in c.ledger.requests_by_status(RequestStatus::Pending) {
            if request.age(now) <= min_age_secs {
                continue;
            }
            let forwarded = c
                .source
                .mapping_for(request.id)
                .is_some_and(|m| m.status == MappingStatus::Fulfilled);
            if !forwarded {
                continue;
            }
            match c.source.resend(request.id, now).await {
                Ok(_) => resent += 1,
                Err(e) => warn!(request_id = %request.id, error = %e, "[xv-01] Resend failed"),
            }
        }
        resent
    }
}
