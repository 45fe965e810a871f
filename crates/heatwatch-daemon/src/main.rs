//! Simulation daemon for the Heatwatch risk dashboard.
//!
//! This is the entry point that wires configuration, the worker
//! registry, the risk oracle, and the simulation loop together, then
//! drives one run and relays its published events to the log.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `heatwatch-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Seed the worker registry from the configured roster
//! 4. Construct the HTTP risk oracle
//! 5. Start a heat-up run on the first seeded worker
//! 6. Relay broadcast events until the run ends (or Ctrl-C)

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use heatwatch_core::config::SimulationConfig;
use heatwatch_engine::driver::{DriverConfig, Simulator};
use heatwatch_engine::observer::{BroadcastObserver, RunEvent};
use heatwatch_engine::roster::WorkerRegistry;
use heatwatch_oracle::{HttpRiskOracle, RiskOracle};
use heatwatch_types::{SimMode, StopCause};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Default configuration file path, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "heatwatch-config.yaml";

/// Application entry point for the simulation daemon.
///
/// # Errors
///
/// Returns an error if any initialization step fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration.
    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = load_config(&config_path)?;

    // 2. Initialize structured logging. `RUST_LOG` wins over the config.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .with_target(true)
        .init();

    info!(config_path = %config_path.display(), "heatwatch-daemon starting");
    info!(
        tick_interval_ms = config.simulation.tick_interval_ms,
        max_steps = config.simulation.max_steps,
        oracle_url = %config.oracle.base_url,
        oracle_timeout_ms = config.oracle.timeout_ms,
        "Configuration loaded"
    );

    // 3. Seed the worker registry.
    let registry = Arc::new(WorkerRegistry::new());
    let mut rng = StdRng::seed_from_u64(config.roster.seed);
    let ids = registry.seed(config.roster.initial_workers, &mut rng, &config.bounds);
    info!(workers = ids.len(), seed = config.roster.seed, "Worker registry seeded");

    // 4. Construct the risk oracle.
    let oracle = HttpRiskOracle::new(
        &config.oracle.base_url,
        Duration::from_millis(config.oracle.timeout_ms),
    )?;
    let oracle = Arc::new(RiskOracle::Http(oracle));
    info!(backend = oracle.name(), "Risk oracle ready");

    // 5. Start a run on the first seeded worker.
    let subject = registry
        .workers()
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("roster seeding produced no workers"))?;
    let simulator = Simulator::new(
        Arc::clone(&registry),
        oracle,
        DriverConfig::from_simulation(&config),
    );

    let (observer, mut events) = BroadcastObserver::channel();
    let run_id = simulator
        .start(&subject.name, SimMode::HeatUp, Box::new(observer))
        .await?;
    info!(run = %run_id, subject = %subject.name, "Run started");

    // 6. Relay events until the run ends.
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(RunEvent::Tick(update)) => {
                    info!(
                        step = update.step,
                        temperature_c = update.worker.vitals.temperature_c,
                        humidity_pct = update.worker.vitals.humidity_pct,
                        hr_mean = update.worker.vitals.hr_mean,
                        progress_pct = update.progress_pct,
                        risk = update.worker.risk.as_ref().map(|r| r.predicted_class.as_str()),
                        "Tick"
                    );
                }
                Ok(RunEvent::Terminal(update)) => {
                    info!(
                        phase = ?update.phase,
                        cause = update.cause.code(),
                        reason = %update.reason,
                        steps = update.steps,
                        total_failures = update.total_failures,
                        "Run ended"
                    );
                    break;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event relay lagging; skipped to newest");
                }
                Err(RecvError::Closed) => break,
            },
            result = tokio::signal::ctrl_c() => {
                if let Err(err) = result {
                    warn!(error = %err, "Ctrl-C handler failed; stopping run");
                }
                info!("Stop requested; tearing down run");
                simulator.stop(StopCause::UserRequested).await;
            }
        }
    }

    info!("heatwatch-daemon exiting");
    Ok(())
}

/// Load the simulation configuration, falling back to defaults when the
/// file does not exist.
fn load_config(path: &Path) -> anyhow::Result<SimulationConfig> {
    if path.exists() {
        Ok(SimulationConfig::from_file(path)?)
    } else {
        Ok(SimulationConfig::default())
    }
}
