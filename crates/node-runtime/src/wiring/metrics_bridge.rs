//! # Metrics Bridge
//!
//! Mirrors the components' lock-free counters into the Prometheus registry.

use xv_02_request_ledger::RequestLedgerApi;
use xv_telemetry::metrics::{
    AUTH_FAILURES, COMPENSATION_RATE, CONSUMER_CALLBACK_FAILURES, CREDENTIALS_MINTED,
    CREDENTIALS_REDEEMED, DUPLICATES_SUPPRESSED, FULFILLMENTS_FORWARDED, REQUESTS_CREATED,
    REQUESTS_PENDING, REQUESTS_RESOLVED, VRF_SUBMISSIONS,
};
use xv_telemetry::sync_counter;

use crate::container::RelayContainer;

/// Copy current component totals into the Prometheus metrics.
pub fn sync_metrics(container: &RelayContainer) {
    let ledger = container.ledger.metrics();
    let source = container.source.metrics();
    let stats = container.ledger.stats();

    sync_counter(&REQUESTS_CREATED, ledger.requests_created);
    sync_counter(&REQUESTS_RESOLVED.with_label_values(&["fulfilled"]), ledger.fulfilled);
    sync_counter(&REQUESTS_RESOLVED.with_label_values(&["compensated"]), ledger.compensated);
    sync_counter(&REQUESTS_RESOLVED.with_label_values(&["rejected"]), ledger.rejected);
    REQUESTS_PENDING.set(stats.pending as i64);
    sync_counter(&CONSUMER_CALLBACK_FAILURES, ledger.consumer_failures);

    sync_counter(
        &AUTH_FAILURES.with_label_values(&["request-ledger", "unauthorized"]),
        ledger.auth_failures,
    );
    sync_counter(
        &AUTH_FAILURES.with_label_values(&["randomness-source", "untrusted_peer"]),
        source.auth_failures,
    );

    sync_counter(&VRF_SUBMISSIONS, source.vrf_submissions);
    sync_counter(&DUPLICATES_SUPPRESSED, source.duplicates_suppressed);
    sync_counter(&FULFILLMENTS_FORWARDED, source.fulfillments_forwarded + source.resends);

    sync_counter(&CREDENTIALS_MINTED, ledger.credentials_minted);
    sync_counter(&CREDENTIALS_REDEEMED, ledger.credentials_redeemed);
    COMPENSATION_RATE.set(stats.compensation_rate());
}
