//! # Node Runtime
//!
//! Spawns the relay loops and coordinates shutdown.
//!
//! ## Loops
//!
//! | Loop | Period | Work |
//! |------|--------|------|
//! | relay | `relay_interval_ms` | deliver both directions |
//! | vrf | `vrf_interval_ms` | collect provider callbacks |
//! | sweep | `sweep_interval_secs` | compensate timeouts, re-send stalled fulfillments, GC |
//! | metrics | `metrics_interval_secs` | mirror counters into Prometheus |
//! | demo | `demo.interval_secs` | synthetic requests (only if enabled) |
//!
//! The alert watcher runs alongside the loops. It is event driven rather
//! than periodic: it consumes the bus's security and compensation topics.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Result;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use xv_02_request_ledger::RequestLedgerApi;

use crate::container::{NodeConfig, RelayContainer};
use crate::wiring::{sync_metrics, AlertWatcher, DemoWorkload, RelayDriver};

/// Time allowed for each loop to stop after shutdown is signalled.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// The relay runtime orchestrating both chains.
pub struct NodeRuntime {
    /// Component container.
    container: Arc<RelayContainer>,
    /// Loop step functions.
    driver: Arc<RelayDriver>,
    /// Security and compensation alerting.
    alerts: Arc<AlertWatcher>,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver.
    shutdown_rx: watch::Receiver<bool>,
    /// Spawned loops.
    handles: Mutex<Vec<(&'static str, JoinHandle<()>)>>,
}

impl NodeRuntime {
    /// Create a new runtime from configuration.
    pub fn new(config: NodeConfig) -> Result<Self> {
        info!("Creating XVRF relay runtime");
        let container = Arc::new(RelayContainer::new(config)?);
        let driver = Arc::new(RelayDriver::new(container.clone()));
        let alerts = Arc::new(AlertWatcher::new(container.config.alerts.clone()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(Self {
            container,
            driver,
            alerts,
            shutdown_tx,
            shutdown_rx,
            handles: Mutex::new(Vec::new()),
        })
    }

    /// Start every loop.
    pub fn start(&self) {
        let config = &self.container.config;
        info!("===========================================");
        info!("  XVRF Relay Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("  Source chain:      {}", config.source.local_chain);
        info!("  Destination chain: {}", config.ledger.local_chain);
        info!("  Timeout:           {}s", config.compensation.timeout_secs);
        info!("===========================================");

        let subscription = AlertWatcher::subscribe(&*self.container.bus);
        let watcher = tokio::spawn(self.alerts.clone().run(subscription, self.shutdown_rx.clone()));
        self.handles.lock().push(("alerts", watcher));

        let driver = self.driver.clone();
        self.spawn_loop("relay", millis(config.loops.relay_interval_ms), move || {
            let driver = driver.clone();
            async move {
                driver.relay_round(unix_now()).await;
            }
        });

        let driver = self.driver.clone();
        self.spawn_loop("vrf", millis(config.loops.vrf_interval_ms), move || {
            let driver = driver.clone();
            async move {
                driver.fulfill_vrf(unix_now()).await;
            }
        });

        let driver = self.driver.clone();
        let retry_after = config.loops.retry_after_secs;
        self.spawn_loop("sweep", secs(config.loops.sweep_interval_secs), move || {
            let driver = driver.clone();
            async move {
                let now = unix_now();
                driver.retry_stalled(now, retry_after).await;
                driver.sweep(now).await;
            }
        });

        let container = self.container.clone();
        self.spawn_loop("metrics", secs(config.loops.metrics_interval_secs), move || {
            sync_metrics(&container);
            async {}
        });

        if config.demo.requests_per_tick > 0 {
            let workload = Arc::new(DemoWorkload::new(self.container.clone()));
            let count = config.demo.requests_per_tick;
            info!(requests_per_tick = count, "[demo] Synthetic workload enabled");
            self.spawn_loop("demo", secs(config.demo.interval_secs), move || {
                let workload = workload.clone();
                async move {
                    let now = unix_now();
                    workload.redeem_outstanding(now).await;
                    workload.create_requests(count, now).await;
                }
            });
        }

        info!("All relay loops running");
    }

    fn spawn_loop<F, Fut>(&self, name: &'static str, period: Duration, mut step: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut shutdown = self.shutdown_rx.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => step().await,
                    _ = shutdown.changed() => {
                        info!("[{}] Shutdown signal received", name);
                        break;
                    }
                }
            }
        });
        self.handles.lock().push((name, handle));
    }

    /// Shutdown the runtime gracefully.
    ///
    /// ## Shutdown Sequence
    ///
    /// 1. Signal shutdown to all loops
    /// 2. Wait for each loop (bounded)
    /// 3. Log final ledger statistics
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        for (name, handle) in handles {
            match tokio::time::timeout(SHUTDOWN_GRACE, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("[{}] Loop ended abnormally: {}", name, e),
                Err(_) => warn!("[{}] Loop did not stop in time", name),
            }
        }

        sync_metrics(&self.container);
        let stats = self.container.ledger.stats();
        match serde_json::to_string(&stats) {
            Ok(json) => info!(stats = %json, "Final ledger statistics"),
            Err(e) => warn!("Could not encode ledger statistics: {}", e),
        }
        match serde_json::to_string(&self.alerts.snapshot()) {
            Ok(json) => info!(alerts = %json, "Final alert summary"),
            Err(e) => warn!("Could not encode alert summary: {}", e),
        }
        info!("Shutdown complete");
    }

    /// Get a reference to the component container.
    pub fn container(&self) -> Arc<RelayContainer> {
        Arc::clone(&self.container)
    }

    /// Get the loop driver.
    pub fn driver(&self) -> Arc<RelayDriver> {
        Arc::clone(&self.driver)
    }

    /// Get the alert watcher.
    pub fn alerts(&self) -> Arc<AlertWatcher> {
        Arc::clone(&self.alerts)
    }
}

fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms.max(1))
}

fn secs(s: u64) -> Duration {
    Duration::from_secs(s.max(1))
}
