//! End-to-end scenario tests for the simulation loop.
//!
//! All tests run under `start_paused` tokio time, so interval-driven runs
//! execute instantly and deterministically: sleeps and ticks resolve in
//! virtual time order, and a scripted oracle latency behaves exactly as
//! a slow prediction service would.

// Integration tests use expect/unwrap extensively for clarity -- panicking
// on failure is the correct behavior in test code.
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::too_many_lines,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::panic
)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use heatwatch_core::bounds::{Range, VitalBounds};
use heatwatch_core::signal;
use heatwatch_engine::driver::{DriverConfig, Simulator};
use heatwatch_engine::observer::CollectingObserver;
use heatwatch_engine::roster::WorkerRegistry;
use heatwatch_oracle::{RiskAssessment, RiskOracle, ScriptedOracle};
use heatwatch_types::{
    RiskTier, RunPhase, SimMode, StopCause, TerminalUpdate, Vitals, Worker, WorkerId,
};

// =============================================================================
// Helpers
// =============================================================================

fn assessment() -> RiskAssessment {
    RiskAssessment {
        risk_score: 0.4217,
        predicted_class: String::from("warning"),
        confidence: 0.913,
    }
}

/// A worker at the canonical resting state (22.0 C, 45 %, 70 bpm), with
/// derived fields filled through the same normalize pipeline the loop
/// uses.
fn resting_worker(bounds: &VitalBounds) -> Worker {
    let primaries = Vitals {
        temperature_c: 22.0,
        humidity_pct: 45.0,
        hr_mean: 70.0,
        hr_min: 0.0,
        hr_max: 0.0,
        hr_std: 0.0,
        rmssd: 42.0,
        sdnn: 45.0,
        pnn50: 18.0,
        mean_nni: 857.0,
        median_nni: 0.0,
        range_nni: 0.0,
        cv_nni: 0.0,
        total_power: 2400.0,
        vlf: 900.0,
        lf: 700.0,
        hf: 600.0,
        lf_hf_ratio: 0.0,
    };
    Worker {
        id: WorkerId::new(),
        name: String::from("Amara"),
        age_years: 34,
        risk_tier: RiskTier::Moderate,
        vitals: signal::normalize(&primaries, bounds),
        risk: None,
        created_at: Utc::now(),
    }
}

fn setup(oracle: ScriptedOracle, config: DriverConfig) -> (Arc<WorkerRegistry>, Simulator, WorkerId) {
    let registry = Arc::new(WorkerRegistry::new());
    let worker = resting_worker(&config.bounds);
    let worker_id = worker.id;
    registry.insert(worker);
    let simulator = Simulator::new(
        Arc::clone(&registry),
        Arc::new(RiskOracle::Scripted(oracle)),
        config,
    );
    (registry, simulator, worker_id)
}

fn fast_config() -> DriverConfig {
    DriverConfig {
        tick_interval: Duration::from_millis(100),
        ..DriverConfig::default()
    }
}

/// Wait until the run publishes its terminal update.
async fn wait_for_terminal(collector: &CollectingObserver) -> TerminalUpdate {
    for _ in 0..100_000 {
        if let Some(terminal) = collector.terminals().into_iter().next() {
            return terminal;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("run never reached a terminal state");
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test(start_paused = true)]
async fn first_heat_up_tick_publishes_annotated_advanced_state() {
    let (_registry, simulator, worker_id) =
        setup(ScriptedOracle::always(assessment()), fast_config());
    let collector = CollectingObserver::new();

    simulator
        .start("Amara", SimMode::HeatUp, Box::new(collector.clone()))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;
    simulator.stop(StopCause::UserRequested).await;

    let ticks = collector.ticks();
    assert!(!ticks.is_empty());
    let first = &ticks[0];

    assert_eq!(first.step, 1);
    assert_eq!(first.worker_id, worker_id);
    assert!(first.is_active);
    assert!((first.worker.vitals.temperature_c - 23.2).abs() < 1e-9);
    assert!((first.worker.vitals.humidity_pct - 48.5).abs() < 1e-9);
    assert!((first.worker.vitals.hr_mean - 71.5).abs() < 1e-9);

    let risk = first.worker.risk.as_ref().expect("first tick is annotated");
    assert_eq!(risk.predicted_class, "warning");
    assert!((risk.risk_score - 0.4217).abs() < 1e-9);
    assert!((risk.confidence - 0.913).abs() < 1e-9);
    assert!(first.progress_pct > 0.0 && first.progress_pct < 100.0);
}

#[tokio::test(start_paused = true)]
async fn heat_up_completes_when_both_axes_saturate() {
    let (registry, simulator, worker_id) =
        setup(ScriptedOracle::always(assessment()), fast_config());
    let collector = CollectingObserver::new();

    simulator
        .start("Amara", SimMode::HeatUp, Box::new(collector.clone()))
        .await
        .unwrap();

    let terminal = wait_for_terminal(&collector).await;
    assert_eq!(terminal.cause, StopCause::Completed);
    assert_eq!(terminal.phase, RunPhase::Completed);

    // Temperature saturates at step 10 (22.0 + 10 * 1.2 = 34.0); humidity
    // needs 13 steps (45.0 + 13 * 3.5 clamps to 90.0). The run keeps
    // ticking until BOTH axes are pinned -- the dual-axis condition is an
    // OR over remaining distance, not a stop-on-first-saturation.
    assert_eq!(terminal.steps, 13);
    let ticks = collector.ticks();
    assert!((ticks[9].worker.vitals.temperature_c - 34.0).abs() < 1e-9);
    assert!(ticks[9].worker.vitals.humidity_pct < 90.0);

    let last = ticks.last().unwrap();
    assert!((last.worker.vitals.temperature_c - 34.0).abs() < 1e-9);
    assert!((last.worker.vitals.humidity_pct - 90.0).abs() < 1e-9);
    assert!((last.progress_pct - 100.0).abs() < 1e-9);

    // The merged state is visible in the registry after the run ends.
    let stored = registry.get(worker_id).unwrap();
    assert!((stored.vitals.temperature_c - 34.0).abs() < 1e-9);
    assert!(stored.risk.is_some());
}

#[tokio::test(start_paused = true)]
async fn three_consecutive_oracle_failures_stop_the_run() {
    let (_registry, simulator, _worker_id) = setup(ScriptedOracle::failing(), fast_config());
    let collector = CollectingObserver::new();

    simulator
        .start("Amara", SimMode::HeatUp, Box::new(collector.clone()))
        .await
        .unwrap();

    let terminal = wait_for_terminal(&collector).await;
    assert_eq!(terminal.cause, StopCause::ConsecutiveFailures);
    assert_eq!(terminal.phase, RunPhase::Failed);
    assert_eq!(terminal.steps, 3);
    assert_eq!(terminal.consecutive_failures, 3);
    assert_eq!(terminal.total_failures, 3);

    // The physical simulation advanced on every degraded tick, but no
    // annotation was ever attached.
    let ticks = collector.ticks();
    assert_eq!(ticks.len(), 3);
    assert!((ticks[0].worker.vitals.temperature_c - 23.2).abs() < 1e-9);
    assert!((ticks[2].worker.vitals.temperature_c - 25.6).abs() < 1e-9);
    for tick in &ticks {
        assert!(tick.worker.risk.is_none());
    }
}

#[tokio::test(start_paused = true)]
async fn interspersed_failures_exhaust_the_total_budget() {
    // Alternate failure/success so the consecutive counter never exceeds
    // one; the humidity ceiling is pushed out of reach so the run cannot
    // complete before the total budget (10) is spent at step 19.
    let mut config = fast_config();
    config.bounds.humidity = Range::new(20.0, 100_000.0);

    let script: Vec<Result<RiskAssessment, String>> = (0..20)
        .map(|i| {
            if i % 2 == 0 {
                Err(String::from("connection reset"))
            } else {
                Ok(assessment())
            }
        })
        .collect();
    let oracle = ScriptedOracle::from_script(script, Some(assessment()));

    let (_registry, simulator, _worker_id) = setup(oracle, config);
    let collector = CollectingObserver::new();

    simulator
        .start("Amara", SimMode::HeatUp, Box::new(collector.clone()))
        .await
        .unwrap();

    let terminal = wait_for_terminal(&collector).await;
    assert_eq!(terminal.cause, StopCause::TotalFailures);
    assert_eq!(terminal.phase, RunPhase::Failed);
    assert_eq!(terminal.total_failures, 10);
    assert_eq!(terminal.steps, 19);
    // The last success reset the consecutive counter before the final
    // failure, proving the budgets are tracked independently.
    assert_eq!(terminal.consecutive_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn step_ceiling_stops_a_run_that_would_never_converge() {
    // Pathological config: humidity can never saturate, so the dual-axis
    // condition alone would tick forever.
    let mut config = fast_config();
    config.bounds.humidity = Range::new(20.0, 100_000.0);
    config.max_steps = 5;

    let (_registry, simulator, _worker_id) =
        setup(ScriptedOracle::always(assessment()), config);
    let collector = CollectingObserver::new();

    simulator
        .start("Amara", SimMode::HeatUp, Box::new(collector.clone()))
        .await
        .unwrap();

    let terminal = wait_for_terminal(&collector).await;
    assert_eq!(terminal.cause, StopCause::StepLimit);
    // Step-ceiling exhaustion is a normal termination, not an error.
    assert_eq!(terminal.phase, RunPhase::Completed);
    assert_eq!(terminal.steps, 5);
    assert_eq!(collector.ticks().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn slow_oracle_suppresses_timer_fires_instead_of_stacking_ticks() {
    // Oracle latency (250 ms) far exceeds the tick interval (100 ms).
    // Single-flight scheduling must coalesce the timer fires that land
    // during an in-flight call: the cadence becomes oracle-bound (one
    // tick per ~250 ms) and no tick is lost, duplicated, or reordered.
    let oracle = ScriptedOracle::always(assessment()).with_latency(Duration::from_millis(250));
    let (_registry, simulator, _worker_id) = setup(oracle, fast_config());
    let collector = CollectingObserver::new();

    simulator
        .start("Amara", SimMode::HeatUp, Box::new(collector.clone()))
        .await
        .unwrap();

    // Virtual-time window of 980 ms: ticks complete at 350, 600, and
    // 850 ms; the fourth is still in flight when the stop lands. A
    // re-entrant loop would have run nine.
    tokio::time::sleep(Duration::from_millis(980)).await;
    simulator.stop(StopCause::UserRequested).await;

    let ticks = collector.ticks();
    assert_eq!(ticks.len(), 3);
    for (index, tick) in ticks.iter().enumerate() {
        assert_eq!(tick.step, u64::try_from(index).unwrap() + 1);
    }
}

#[tokio::test(start_paused = true)]
async fn external_stop_mid_oracle_call_leaves_no_partial_tick() {
    let oracle = ScriptedOracle::always(assessment()).with_latency(Duration::from_millis(500));
    let (registry, simulator, worker_id) = setup(oracle, fast_config());
    let collector = CollectingObserver::new();

    let before = registry.get(worker_id).unwrap();

    simulator
        .start("Amara", SimMode::HeatUp, Box::new(collector.clone()))
        .await
        .unwrap();

    // Stop lands at 150 ms, while the first tick (fired at 100 ms) is
    // still waiting on the oracle.
    tokio::time::sleep(Duration::from_millis(150)).await;
    simulator.stop(StopCause::UserRequested).await;

    let terminal = wait_for_terminal(&collector).await;
    assert_eq!(terminal.cause, StopCause::UserRequested);
    assert_eq!(terminal.phase, RunPhase::Stopped);
    assert_eq!(terminal.steps, 0);

    // The cancelled tick merged nothing and published nothing.
    assert!(collector.ticks().is_empty());
    let after = registry.get(worker_id).unwrap();
    assert_eq!(after.vitals, before.vitals);
}

#[tokio::test(start_paused = true)]
async fn worker_removed_mid_run_fails_with_subject_not_found() {
    let (registry, simulator, worker_id) =
        setup(ScriptedOracle::always(assessment()), fast_config());
    let collector = CollectingObserver::new();

    simulator
        .start("Amara", SimMode::HeatUp, Box::new(collector.clone()))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;
    registry.remove(worker_id);

    let terminal = wait_for_terminal(&collector).await;
    assert_eq!(terminal.cause, StopCause::WorkerNotFound);
    assert_eq!(terminal.phase, RunPhase::Failed);
}

#[tokio::test(start_paused = true)]
async fn cool_down_run_floors_and_completes() {
    let (_registry, simulator, _worker_id) =
        setup(ScriptedOracle::always(assessment()), fast_config());
    let collector = CollectingObserver::new();

    simulator
        .start("Amara", SimMode::CoolDown, Box::new(collector.clone()))
        .await
        .unwrap();

    let terminal = wait_for_terminal(&collector).await;
    assert_eq!(terminal.cause, StopCause::Completed);
    assert_eq!(terminal.phase, RunPhase::Completed);

    let last = collector.ticks().last().cloned().unwrap();
    assert!((last.worker.vitals.temperature_c - 10.0).abs() < 1e-9);
    assert!((last.worker.vitals.humidity_pct - 20.0).abs() < 1e-9);
    assert!((last.progress_pct - 100.0).abs() < 1e-9);
}
