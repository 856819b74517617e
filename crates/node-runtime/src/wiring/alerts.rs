//! # Alert Watcher
//!
//! Subscribes to the `Security` and `Compensation` topics and turns the
//! event flow into operator alerts.
//!
//! | Alert | Raised when |
//! |-------|-------------|
//! | `flagged_caller` | one caller reaches `auth_failures_per_caller` authorization failures (once per caller) |
//! | `compensation_burst` | every `compensation_burst` compensations |
//! | `events_missed` | the watcher fell behind and the bus dropped events for it |

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use shared_bus::{EventFilter, EventSubscriber, EventTopic, Subscription, VrfEvent};
use shared_types::{address_hex, Address};
use xv_telemetry::metrics::ALERTS_RAISED;

use crate::container::AlertConfig;

/// An alert raised by the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    /// A caller kept failing authorization.
    FlaggedCaller {
        /// Component that refused it most recently.
        component: String,
        /// The caller.
        caller: Address,
        /// Failures seen so far.
        failures: u32,
    },
    /// Compensations crossed another multiple of the burst size.
    CompensationBurst {
        /// Compensations seen so far.
        total: u64,
    },
    /// Events dropped because the watcher lagged.
    EventsMissed {
        /// Newly dropped events.
        count: u64,
    },
}

impl Alert {
    /// Metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FlaggedCaller { .. } => "flagged_caller",
            Self::CompensationBurst { .. } => "compensation_burst",
            Self::EventsMissed { .. } => "events_missed",
        }
    }
}

/// Totals observed by the watcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlertSnapshot {
    /// Authorization failures per refusing component.
    pub auth_failures_by_component: BTreeMap<String, u64>,
    /// Callers that reached the failure threshold, hex encoded.
    pub flagged_callers: Vec<String>,
    /// Requests compensated or entries registered.
    pub compensations: u64,
    /// Credentials redeemed.
    pub redemptions: u64,
    /// Credentials transferred.
    pub transfers: u64,
    /// Privileged configuration changes.
    pub config_updates: u64,
    /// Events dropped by the bus before the watcher saw them.
    pub events_missed: u64,
    /// Alerts raised.
    pub alerts_raised: u64,
}

#[derive(Default)]
struct WatchState {
    failures_by_caller: HashMap<Address, u32>,
    failures_by_component: BTreeMap<String, u64>,
    flagged: BTreeSet<Address>,
    compensations: u64,
    redemptions: u64,
    transfers: u64,
    config_updates: u64,
    missed: u64,
    alerts_raised: u64,
}

/// Security and compensation event watcher.
pub struct AlertWatcher {
    config: AlertConfig,
    state: Mutex<WatchState>,
}

impl AlertWatcher {
    /// Watcher with the given thresholds.
    pub fn new(config: AlertConfig) -> Self {
        Self {
            config,
            state: Mutex::new(WatchState::default()),
        }
    }

    /// Topics the watcher consumes.
    pub fn filter() -> EventFilter {
        EventFilter::topics(vec![EventTopic::Security, EventTopic::Compensation])
    }

    /// Open the watcher's subscription on `bus`.
    pub fn subscribe(bus: &dyn EventSubscriber) -> Subscription {
        bus.subscribe(Self::filter())
    }

    /// Consume `subscription` until the bus closes or shutdown is signalled,
    /// then drain whatever is already queued.
    pub async fn run(self: Arc<Self>, mut subscription: Subscription, mut shutdown: watch::Receiver<bool>) {
        info!("[alerts] Watching security and compensation events");
        loop {
            tokio::select! {
                event = subscription.recv() => match event {
                    Some(event) => {
                        self.note_missed(subscription.missed());
                        self.observe(&event);
                    }
                    None => {
                        warn!("[alerts] Event bus closed");
                        break;
                    }
                },
                _ = shutdown.changed() => {
                    info!("[alerts] Shutdown signal received");
                    break;
                }
            }
        }
        while let Ok(Some(event)) = subscription.try_recv() {
            self.observe(&event);
        }
        self.note_missed(subscription.missed());
    }

    /// Account for one event. Returns the alert it raised, if any.
    pub fn observe(&self, event: &VrfEvent) -> Option<Alert> {
        let alert = {
            let mut state = self.state.lock();
            match event {
                VrfEvent::AuthorizationFailed {
                    component,
                    caller,
                    reason,
                    ..
                } => {
                    *state
                        .failures_by_component
                        .entry(component.clone())
                        .or_default() += 1;
                    let failures = {
                        let count = state.failures_by_caller.entry(*caller).or_default();
                        *count = count.saturating_add(1);
                        *count
                    };
                    debug!(component = %component, caller = %address_hex(caller), reason = %reason, failures, "[alerts] Authorization failure");
                    let threshold = self.config.auth_failures_per_caller;
                    (threshold > 0 && failures >= threshold && state.flagged.insert(*caller)).then(
                        || Alert::FlaggedCaller {
                            component: component.clone(),
                            caller: *caller,
                            failures,
                        },
                    )
                }
                VrfEvent::ConfigUpdated {
                    component, admin, ..
                } => {
                    state.config_updates += 1;
                    info!(target: "xv::security", component = %component, admin = %address_hex(admin), "[alerts] Configuration changed");
                    None
                }
                VrfEvent::RequestCompensated { .. } => {
                    state.compensations += 1;
                    let burst = u64::from(self.config.compensation_burst);
                    (burst > 0 && state.compensations % burst == 0).then_some(
                        Alert::CompensationBurst {
                            total: state.compensations,
                        },
                    )
                }
                VrfEvent::CredentialRedeemed { .. } => {
                    state.redemptions += 1;
                    None
                }
                VrfEvent::CredentialTransferred { .. } => {
                    state.transfers += 1;
                    None
                }
                _ => None,
            }
        };
        if let Some(alert) = &alert {
            self.raise(alert);
        }
        alert
    }

    /// Current totals.
    pub fn snapshot(&self) -> AlertSnapshot {
        let state = self.state.lock();
        AlertSnapshot {
            auth_failures_by_component: state.failures_by_component.clone(),
            flagged_callers: state.flagged.iter().map(address_hex).collect(),
            compensations: state.compensations,
            redemptions: state.redemptions,
            transfers: state.transfers,
            config_updates: state.config_updates,
            events_missed: state.missed,
            alerts_raised: state.alerts_raised,
        }
    }

    fn note_missed(&self, total: u64) {
        let count = {
            let mut state = self.state.lock();
            let count = total.saturating_sub(state.missed);
            state.missed = state.missed.max(total);
            count
        };
        if count > 0 {
            self.raise(&Alert::EventsMissed { count });
        }
    }

    fn raise(&self, alert: &Alert) {
        self.state.lock().alerts_raised += 1;
        ALERTS_RAISED.with_label_values(&[alert.kind()]).inc();
        match alert {
            Alert::FlaggedCaller {
                component,
                caller,
                failures,
            } => error!(
                target: "xv::security",
                component = %component,
                caller = %address_hex(caller),
                failures,
                "[alerts] Caller flagged after repeated authorization failures"
            ),
            Alert::CompensationBurst { total } => warn!(
                total,
                "[alerts] Compensation count crossed burst threshold; relay may be degraded"
            ),
            Alert::EventsMissed { count } => {
                warn!(count, "[alerts] Watcher lagged; events dropped")
            }
        }
    }
}
