//! Prometheus metrics for the relay.
//!
//! All metrics follow the naming convention: `xv_<component>_<metric>_<unit>`
//!
//! Components keep their own lock-free counters; the runtime mirrors those
//! into the counters here with `sync_counter`, so the domain crates do not
//! depend on Prometheus.

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec,
    IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // REQUEST LEDGER
    // =========================================================================

    /// Requests created on the destination chain
    pub static ref REQUESTS_CREATED: IntCounter = IntCounter::new(
        "xv_ledger_requests_created_total",
        "Total randomness requests created"
    ).expect("metric creation failed");

    /// Requests resolved, by terminal outcome
    pub static ref REQUESTS_RESOLVED: IntCounterVec = IntCounterVec::new(
        Opts::new("xv_ledger_requests_resolved_total", "Total requests reaching a terminal state"),
        &["outcome"]  // fulfilled / compensated / rejected
    ).expect("metric creation failed");

    /// Requests currently pending
    pub static ref REQUESTS_PENDING: IntGauge = IntGauge::new(
        "xv_ledger_requests_pending",
        "Requests awaiting fulfillment or compensation"
    ).expect("metric creation failed");

    /// Consumer callbacks that failed after commit
    pub static ref CONSUMER_CALLBACK_FAILURES: IntCounter = IntCounter::new(
        "xv_ledger_consumer_callback_failures_total",
        "Consumer callbacks that returned an error or panicked"
    ).expect("metric creation failed");

    // =========================================================================
    // ACCESS VALIDATOR
    // =========================================================================

    /// Authorization failures by reason
    pub static ref AUTH_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("xv_security_authorization_failures_total", "Rejected callers and channel peers"),
        &["component", "reason"]
    ).expect("metric creation failed");

    /// Alerts raised by the runtime's event watcher
    pub static ref ALERTS_RAISED: IntCounterVec = IntCounterVec::new(
        Opts::new("xv_security_alerts_raised_total", "Alerts raised from security and compensation events"),
        &["kind"]  // flagged_caller / compensation_burst / events_missed
    ).expect("metric creation failed");

    // =========================================================================
    // RANDOMNESS SOURCE
    // =========================================================================

    /// Local VRF submissions
    pub static ref VRF_SUBMISSIONS: IntCounter = IntCounter::new(
        "xv_source_vrf_submissions_total",
        "Requests submitted to the local VRF provider"
    ).expect("metric creation failed");

    /// Redelivered inbound requests that were ignored
    pub static ref DUPLICATES_SUPPRESSED: IntCounter = IntCounter::new(
        "xv_source_duplicates_suppressed_total",
        "Duplicate inbound requests suppressed"
    ).expect("metric creation failed");

    /// Fulfillments sent back over the channel
    pub static ref FULFILLMENTS_FORWARDED: IntCounter = IntCounter::new(
        "xv_source_fulfillments_forwarded_total",
        "Fulfillments forwarded to the destination chain"
    ).expect("metric creation failed");

    // =========================================================================
    // COMPENSATION
    // =========================================================================

    /// Credentials minted
    pub static ref CREDENTIALS_MINTED: IntCounter = IntCounter::new(
        "xv_compensation_credentials_minted_total",
        "Compensation credentials minted"
    ).expect("metric creation failed");

    /// Credentials redeemed
    pub static ref CREDENTIALS_REDEEMED: IntCounter = IntCounter::new(
        "xv_compensation_credentials_redeemed_total",
        "Compensation credentials redeemed"
    ).expect("metric creation failed");

    /// Fraction of resolved requests that ended in compensation
    pub static ref COMPENSATION_RATE: Gauge = Gauge::new(
        "xv_compensation_rate_ratio",
        "Compensated / resolved requests; a high value means the relay is degraded"
    ).expect("metric creation failed");

    /// Timeout sweep duration
    pub static ref SWEEP_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "xv_compensation_sweep_duration_seconds",
            "Time spent in one timeout sweep"
        ).buckets(exponential_buckets(0.0001, 2.0, 14).expect("valid buckets"))
    ).expect("metric creation failed");
}

/// Handle to the registered metrics.
#[derive(Clone)]
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Ledger
        Box::new(REQUESTS_CREATED.clone()),
        Box::new(REQUESTS_RESOLVED.clone()),
        Box::new(REQUESTS_PENDING.clone()),
        Box::new(CONSUMER_CALLBACK_FAILURES.clone()),
        // Security
        Box::new(AUTH_FAILURES.clone()),
        Box::new(ALERTS_RAISED.clone()),
        // Source
        Box::new(VRF_SUBMISSIONS.clone()),
        Box::new(DUPLICATES_SUPPRESSED.clone()),
        Box::new(FULFILLMENTS_FORWARDED.clone()),
        // Compensation
        Box::new(CREDENTIALS_MINTED.clone()),
        Box::new(CREDENTIALS_REDEEMED.clone()),
        Box::new(COMPENSATION_RATE.clone()),
        Box::new(SWEEP_DURATION.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Advance `counter` to `total`. Counters never move backwards.
pub fn sync_counter(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
