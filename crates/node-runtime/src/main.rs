//! # XVRF Relay Node
//!
//! Runs the Randomness Source Adapter and the Request Ledger side by side
//! over an in-memory channel.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging and metrics
//! 2. Load configuration from the environment
//! 3. Check production settings (enforced when `XV_PRODUCTION=true`)
//! 4. Build components and start the relay loops
//! 5. Wait for Ctrl+C, then shut down gracefully

use anyhow::{Context, Result};
use tracing::{info, warn};

use node_runtime::{NodeConfig, NodeRuntime};
use xv_telemetry::{init_telemetry, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = TelemetryConfig::from_env();
    let _guard = init_telemetry(&telemetry).context("failed to initialize telemetry")?;

    let config = NodeConfig::from_env().context("failed to load configuration")?;

    let production = std::env::var("XV_PRODUCTION")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if let Err(e) = config.validate_for_production() {
        if production {
            return Err(e).context("configuration is not fit for production");
        }
        warn!(target: "xv::security", error = %e, "Running with development settings");
    }

    let runtime = NodeRuntime::new(config)?;
    runtime.start();

    info!("Press Ctrl+C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    runtime.shutdown().await;
    Ok(())
}
