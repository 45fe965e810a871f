//! The simulation loop.
//!
//! One [`Simulator`] drives at most one run at a time. The run's mutable
//! control-plane record (the [`RunDescriptor`]: step counter, error
//! budgets, baseline snapshot, cached subject) is owned exclusively by a
//! single spawned task, so the tick path needs no locks. The controller
//! keeps only a stop signal and the task handle behind one mutex.
//!
//! # Tick scheduling
//!
//! Ticks are single-flight by construction: the run task awaits the
//! interval and then executes the tick body to completion before the
//! next interval fire can be observed. A timer fire that lands while an
//! oracle call is still in flight is coalesced
//! ([`MissedTickBehavior::Skip`]) -- a no-op, not a queued or reordered
//! tick. Oracle latency therefore stretches the effective cadence but
//! can never re-enter the tick body.
//!
//! # Cancellation
//!
//! Stopping is cooperative. An external stop raises the stop signal; the
//! in-flight tick future is dropped at its next await point -- before any
//! merge or publication -- so a cancelled tick leaves no partial writes.
//! Teardown (raise signal, await task, drop handle) is idempotent, and a
//! run that terminates itself converges on the same terminal publication
//! path.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use heatwatch_core::bounds::{VitalBounds, round3, round4};
use heatwatch_core::config::SimulationConfig;
use heatwatch_core::signal::{self, SignalConfig};
use heatwatch_core::{policy, progress};
use heatwatch_oracle::{RiskOracle, RiskRequest};
use heatwatch_types::{
    RiskAnnotation, RunId, SimMode, StopCause, TerminalUpdate, TickUpdate, Worker, WorkerId,
};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::error::EngineError;
use crate::observer::RunObserver;
use crate::roster::{self, WorkerRegistry};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Resolved driver configuration: the slice of the simulation config the
/// run task needs, plus the kernel tables.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Interval between scheduled ticks.
    pub tick_interval: Duration,
    /// Global step ceiling; always enforced.
    pub max_steps: u64,
    /// Consecutive oracle failures that end a run.
    pub max_consecutive_failures: u32,
    /// Total oracle failures over a run that end it.
    pub max_total_failures: u32,
    /// Physiological clamp ranges.
    pub bounds: VitalBounds,
    /// Per-mode signal rate tables.
    pub signal: SignalConfig,
}

impl DriverConfig {
    /// Extract the driver's configuration from the loaded simulation
    /// config.
    pub fn from_simulation(config: &SimulationConfig) -> Self {
        Self {
            tick_interval: Duration::from_millis(config.simulation.tick_interval_ms),
            max_steps: config.simulation.max_steps,
            max_consecutive_failures: config.simulation.max_consecutive_failures,
            max_total_failures: config.simulation.max_total_failures,
            bounds: config.bounds.clone(),
            signal: config.signal.clone(),
        }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self::from_simulation(&SimulationConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Stop signal
// ---------------------------------------------------------------------------

/// Cooperative stop signal shared between the controller and the run
/// task. The first requested cause wins; later requests only re-wake the
/// task.
#[derive(Debug, Default)]
struct StopSignal {
    cause: Mutex<Option<StopCause>>,
    notify: Notify,
}

impl StopSignal {
    /// Request a stop with the given cause. Idempotent: a second request
    /// keeps the original cause.
    fn request(&self, cause: StopCause) {
        {
            let mut guard = match self.cause.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if guard.is_none() {
                *guard = Some(cause);
            }
        }
        self.notify.notify_one();
    }

    /// The requested cause, if a stop has been requested.
    fn requested(&self) -> Option<StopCause> {
        match self.cause.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Wait until a stop is requested (or a permit is already stored).
    async fn notified(&self) {
        self.notify.notified().await;
    }
}

// ---------------------------------------------------------------------------
// Run descriptor
// ---------------------------------------------------------------------------

/// The private control-plane record for one active run.
///
/// Owned exclusively by the run task for the whole run; destroyed when
/// the task exits.
struct RunDescriptor {
    run_id: RunId,
    worker_id: WorkerId,
    mode: SimMode,
    /// Monotonic step counter; resets only with a new run.
    step: u64,
    /// Failures since the last successful tick.
    consecutive_failures: u32,
    /// Failures over the whole run.
    total_failures: u32,
    /// Environmental values captured at run start, kept for drift
    /// reporting at the terminal transition.
    baseline_temperature_c: f64,
    baseline_humidity_pct: f64,
    /// Last merged subject snapshot; avoids re-resolving identity every
    /// tick.
    cached: Option<Worker>,
}

/// Everything the run task needs besides its descriptor.
struct RunContext {
    registry: Arc<WorkerRegistry>,
    oracle: Arc<RiskOracle>,
    config: Arc<DriverConfig>,
    stop: Arc<StopSignal>,
}

/// Control-plane handle the controller keeps for an active run.
struct ActiveRun {
    run_id: RunId,
    worker_id: WorkerId,
    mode: SimMode,
    stop: Arc<StopSignal>,
    task: JoinHandle<()>,
}

/// Snapshot of the controller's lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStatus {
    /// Whether a run task is currently alive.
    pub is_active: bool,
    /// Id of the current (or last finished, if not yet torn down) run.
    pub run_id: Option<RunId>,
    /// Subject of that run.
    pub worker_id: Option<WorkerId>,
    /// Mode of that run.
    pub mode: Option<SimMode>,
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

/// Controller for per-subject simulation runs.
///
/// Guarantees at most one live run at a time: starting a new run tears
/// the old one down synchronously before the new task is spawned, so no
/// two timers ever target the same subject.
pub struct Simulator {
    registry: Arc<WorkerRegistry>,
    oracle: Arc<RiskOracle>,
    config: Arc<DriverConfig>,
    slot: tokio::sync::Mutex<Option<ActiveRun>>,
}

impl Simulator {
    /// Create a simulator over the given registry and oracle.
    pub fn new(registry: Arc<WorkerRegistry>, oracle: Arc<RiskOracle>, config: DriverConfig) -> Self {
        Self {
            registry,
            oracle,
            config: Arc::new(config),
            slot: tokio::sync::Mutex::new(None),
        }
    }

    /// Start a run for the worker resolved by `identity`.
    ///
    /// Any active run is torn down first (its terminal update reports
    /// `superseded`). The new run's first tick fires one interval after
    /// this call returns.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::WorkerNotFound`] if the identity does not
    /// resolve; the controller makes no state transition in that case.
    pub async fn start(
        &self,
        identity: &str,
        mode: SimMode,
        observer: Box<dyn RunObserver>,
    ) -> Result<RunId, EngineError> {
        let Some(worker) = self.registry.find_by_identity(identity) else {
            warn!(identity, "Start rejected: subject not found");
            return Err(EngineError::WorkerNotFound {
                identity: identity.to_owned(),
            });
        };

        let mut slot = self.slot.lock().await;
        if let Some(previous) = slot.take() {
            teardown(previous, StopCause::Superseded).await;
        }

        let run_id = RunId::new();
        let stop = Arc::new(StopSignal::default());
        let descriptor = RunDescriptor {
            run_id,
            worker_id: worker.id,
            mode,
            step: 0,
            consecutive_failures: 0,
            total_failures: 0,
            baseline_temperature_c: worker.vitals.temperature_c,
            baseline_humidity_pct: worker.vitals.humidity_pct,
            cached: Some(worker.clone()),
        };
        let ctx = RunContext {
            registry: Arc::clone(&self.registry),
            oracle: Arc::clone(&self.oracle),
            config: Arc::clone(&self.config),
            stop: Arc::clone(&stop),
        };

        info!(
            run = %run_id,
            worker = %worker.id,
            name = %worker.name,
            mode = %mode,
            tick_interval_ms = u64::try_from(self.config.tick_interval.as_millis()).unwrap_or(u64::MAX),
            "Simulation run starting"
        );

        let task = tokio::spawn(run_loop(ctx, descriptor, observer));
        *slot = Some(ActiveRun {
            run_id,
            worker_id: worker.id,
            mode,
            stop,
            task,
        });
        Ok(run_id)
    }

    /// Stop the active run with the given cause.
    ///
    /// Always safe to call: with no active run this is a no-op and
    /// returns `false`. Returns `true` if a live run was torn down.
    pub async fn stop(&self, cause: StopCause) -> bool {
        let mut slot = self.slot.lock().await;
        match slot.take() {
            Some(active) => {
                let was_live = !active.task.is_finished();
                teardown(active, cause).await;
                was_live
            }
            None => false,
        }
    }

    /// Stop any active run, discard the subject's risk annotation, and
    /// re-seed its environmental fields from a freshly generated
    /// baseline profile.
    ///
    /// This is a full re-seed via the baseline generator, not a restore
    /// of the run descriptor's captured baseline snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::WorkerNotFound`] if the identity does not
    /// resolve.
    pub async fn reset_to_baseline(&self, identity: &str) -> Result<Worker, EngineError> {
        let Some(worker) = self.registry.find_by_identity(identity) else {
            warn!(identity, "Reset rejected: subject not found");
            return Err(EngineError::WorkerNotFound {
                identity: identity.to_owned(),
            });
        };

        self.stop(StopCause::Reset).await;

        let vitals =
            roster::generate_baseline(worker.risk_tier, &mut rand::rng(), &self.config.bounds);
        let updated = self
            .registry
            .replace_vitals(worker.id, vitals)
            .ok_or_else(|| EngineError::WorkerNotFound {
                identity: identity.to_owned(),
            })?;

        info!(worker = %updated.id, name = %updated.name, "Reset to baseline");
        Ok(updated)
    }

    /// Snapshot the controller's lifecycle state.
    pub async fn status(&self) -> RunStatus {
        let slot = self.slot.lock().await;
        slot.as_ref().map_or(
            RunStatus {
                is_active: false,
                run_id: None,
                worker_id: None,
                mode: None,
            },
            |active| RunStatus {
                is_active: !active.task.is_finished(),
                run_id: Some(active.run_id),
                worker_id: Some(active.worker_id),
                mode: Some(active.mode),
            },
        )
    }
}

/// Idempotent teardown: raise the stop signal and wait for the task to
/// publish its terminal update and exit. Tearing down an already-stopped
/// run only consumes the finished handle.
async fn teardown(active: ActiveRun, cause: StopCause) {
    active.stop.request(cause);
    if let Err(err) = active.task.await {
        warn!(run = %active.run_id, error = %err, "Run task join failed during teardown");
    }
}

// ---------------------------------------------------------------------------
// Run task
// ---------------------------------------------------------------------------

/// Outcome of one tick body.
enum TickOutcome {
    /// Keep ticking.
    Continue,
    /// Terminate the run with this cause.
    Stop(StopCause),
}

/// The run task: owns the descriptor, schedules ticks, and publishes the
/// terminal transition exactly once.
async fn run_loop(ctx: RunContext, mut run: RunDescriptor, mut observer: Box<dyn RunObserver>) {
    let mut interval = tokio::time::interval_at(
        Instant::now() + ctx.config.tick_interval,
        ctx.config.tick_interval,
    );
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let cause = loop {
        // The cause mutex is the source of truth; the notify is only a
        // waker. Checking here closes the gap between the two selects.
        if let Some(cause) = ctx.stop.requested() {
            break cause;
        }

        tokio::select! {
            biased;
            () = ctx.stop.notified() => {
                break ctx.stop.requested().unwrap_or(StopCause::UserRequested);
            }
            _ = interval.tick() => {}
        }

        // Race the tick body against the stop signal so an external stop
        // cancels an in-flight oracle call before any merge or publish.
        let outcome = tokio::select! {
            biased;
            () = ctx.stop.notified() => {
                TickOutcome::Stop(ctx.stop.requested().unwrap_or(StopCause::UserRequested))
            }
            outcome = tick_once(&ctx, &mut run, observer.as_mut()) => outcome,
        };

        match outcome {
            TickOutcome::Continue => {}
            TickOutcome::Stop(cause) => break cause,
        }
    };

    publish_terminal(&run, cause, observer.as_mut());
}

/// Build, log, and publish the run's terminal update.
fn publish_terminal(run: &RunDescriptor, cause: StopCause, observer: &mut dyn RunObserver) {
    let terminal = TerminalUpdate::from_cause(
        run.run_id,
        run.worker_id,
        run.mode,
        cause,
        run.step,
        run.consecutive_failures,
        run.total_failures,
    );

    let (final_temperature_c, final_humidity_pct) = run.cached.as_ref().map_or(
        (run.baseline_temperature_c, run.baseline_humidity_pct),
        |worker| (worker.vitals.temperature_c, worker.vitals.humidity_pct),
    );

    if terminal.phase == heatwatch_types::RunPhase::Failed {
        error!(
            run = %run.run_id,
            worker = %run.worker_id,
            mode = %run.mode,
            cause = cause.code(),
            step = run.step,
            consecutive_failures = run.consecutive_failures,
            total_failures = run.total_failures,
            "Simulation run failed"
        );
    } else {
        info!(
            run = %run.run_id,
            worker = %run.worker_id,
            mode = %run.mode,
            cause = cause.code(),
            step = run.step,
            baseline_temperature_c = run.baseline_temperature_c,
            final_temperature_c,
            baseline_humidity_pct = run.baseline_humidity_pct,
            final_humidity_pct,
            "Simulation run ended"
        );
    }

    observer.on_terminal(&terminal);
}

/// Execute one tick: perturb, assess, merge, publish, and gate
/// continuation.
async fn tick_once(
    ctx: &RunContext,
    run: &mut RunDescriptor,
    observer: &mut dyn RunObserver,
) -> TickOutcome {
    // Resolve the working subject state: cached if present, otherwise
    // re-resolve by identity.
    let resolved = run
        .cached
        .take()
        .or_else(|| ctx.registry.get(run.worker_id));
    let Some(working) = resolved else {
        return TickOutcome::Stop(StopCause::WorkerNotFound);
    };

    // Perturb toward the run's regime and build the candidate snapshot.
    let next = signal::next_vitals(&working.vitals, run.mode, &ctx.config.signal, &ctx.config.bounds);
    let mut candidate = working;
    candidate.vitals = next;

    // Submit the candidate to the risk oracle. Both arms advance the
    // physical simulation; only the annotation differs.
    let mut budget_exhausted = None;
    match ctx.oracle.assess(&RiskRequest::from_worker(&candidate)).await {
        Ok(assessment) => {
            candidate.risk = Some(RiskAnnotation {
                risk_score: round4(assessment.risk_score),
                predicted_class: assessment.predicted_class,
                confidence: round3(assessment.confidence),
                assessed_at: Utc::now(),
            });
            run.consecutive_failures = 0;
            run.step = run.step.saturating_add(1);
        }
        Err(err) => {
            run.consecutive_failures = run.consecutive_failures.saturating_add(1);
            run.total_failures = run.total_failures.saturating_add(1);
            run.step = run.step.saturating_add(1);
            warn!(
                run = %run.run_id,
                step = run.step,
                consecutive_failures = run.consecutive_failures,
                total_failures = run.total_failures,
                error = %err,
                "Oracle call failed; continuing on degraded data"
            );
            if run.consecutive_failures >= ctx.config.max_consecutive_failures {
                budget_exhausted = Some(StopCause::ConsecutiveFailures);
            } else if run.total_failures >= ctx.config.max_total_failures {
                budget_exhausted = Some(StopCause::TotalFailures);
            }
        }
    }

    // Merge the candidate into shared state. A vanished worker is
    // subject-not-found, fatal to the run.
    if !ctx
        .registry
        .merge_simulated(candidate.id, candidate.vitals.clone(), candidate.risk.clone())
    {
        return TickOutcome::Stop(StopCause::WorkerNotFound);
    }

    let update = TickUpdate {
        run_id: run.run_id,
        is_active: true,
        mode: run.mode,
        worker_id: run.worker_id,
        step: run.step,
        progress_pct: progress::completion_pct(
            candidate.vitals.temperature_c,
            candidate.vitals.humidity_pct,
            run.mode,
            &ctx.config.bounds,
        ),
        worker: candidate.clone(),
    };
    debug!(
        run = %run.run_id,
        step = update.step,
        temperature_c = candidate.vitals.temperature_c,
        humidity_pct = candidate.vitals.humidity_pct,
        progress_pct = update.progress_pct,
        "Tick merged"
    );
    observer.on_tick(&update);
    run.cached = Some(candidate);

    // An exhausted error budget ends the run immediately; the
    // continuation check is not consulted.
    if let Some(cause) = budget_exhausted {
        return TickOutcome::Stop(cause);
    }

    // Gate continuation on the termination policy, against the merged
    // candidate state.
    if !policy::should_continue(
        &update.worker.vitals,
        run.mode,
        run.step,
        ctx.config.max_steps,
        &ctx.config.bounds,
    ) {
        if run.step >= ctx.config.max_steps {
            return TickOutcome::Stop(StopCause::StepLimit);
        }
        return TickOutcome::Stop(StopCause::Completed);
    }

    TickOutcome::Continue
}
