//! Core entity structs for the Heatwatch risk simulation.
//!
//! Covers the worker record, the vitals block the simulation loop evolves,
//! the oracle's risk annotation, and the payloads published to observers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{RiskTier, RunPhase, SimMode, StopCause};
use crate::ids::{RunId, WorkerId};

// ---------------------------------------------------------------------------
// Vitals
// ---------------------------------------------------------------------------

/// The mutable physiological and environmental record the loop evolves.
///
/// Eleven primary quantities are perturbed per tick (temperature,
/// humidity, mean heart rate, and eight spectral/time-domain HRV
/// statistics); the remaining fields are recomputed from the primaries
/// every tick and are never perturbed independently. NNI is the
/// normal-to-normal inter-beat interval in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Vitals {
    /// Ambient temperature in degrees Celsius.
    pub temperature_c: f64,
    /// Relative humidity in percent.
    pub humidity_pct: f64,

    /// Mean heart rate in beats per minute.
    pub hr_mean: f64,
    /// Minimum heart rate, derived from `hr_mean` and `sdnn`.
    pub hr_min: f64,
    /// Maximum heart rate, derived from `hr_mean` and `sdnn`.
    pub hr_max: f64,
    /// Heart-rate standard deviation, derived from `sdnn`.
    pub hr_std: f64,

    /// Root mean square of successive NNI differences, in ms.
    pub rmssd: f64,
    /// Standard deviation of NNIs, in ms.
    pub sdnn: f64,
    /// Percentage of successive NNI pairs differing by more than 50 ms.
    pub pnn50: f64,

    /// Mean NNI in ms (integer-valued).
    pub mean_nni: f64,
    /// Median NNI in ms, derived from `mean_nni` (integer-valued).
    pub median_nni: f64,
    /// NNI range in ms, derived from `sdnn` (integer-valued).
    pub range_nni: f64,
    /// Coefficient of variation of NNIs, derived from `sdnn`/`mean_nni`.
    pub cv_nni: f64,

    /// Total spectral power (integer-valued).
    pub total_power: f64,
    /// Very-low-frequency band power (integer-valued).
    pub vlf: f64,
    /// Low-frequency band power (integer-valued).
    pub lf: f64,
    /// High-frequency band power (integer-valued).
    pub hf: f64,
    /// LF/HF sympathovagal balance ratio, derived from `lf` and `hf`.
    pub lf_hf_ratio: f64,
}

// ---------------------------------------------------------------------------
// Risk annotation
// ---------------------------------------------------------------------------

/// The oracle's last known classification of a worker's state.
///
/// Absent until the first successful oracle call of a run; carried
/// forward unchanged through oracle failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RiskAnnotation {
    /// Composite risk score in [0, 1], rounded to four decimals.
    pub risk_score: f64,
    /// Classifier label (e.g. "safe", "warning", "danger").
    pub predicted_class: String,
    /// Classifier confidence in [0, 1], rounded to three decimals.
    pub confidence: f64,
    /// When the oracle produced this annotation.
    pub assessed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// A worker: identity plus the subject state the simulation loop drives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Worker {
    /// Unique worker identifier.
    pub id: WorkerId,
    /// Display name, unique within a registry.
    pub name: String,
    /// Age in years (demographic input to the oracle).
    pub age_years: u32,
    /// A-priori risk tier shaping the generated baseline.
    pub risk_tier: RiskTier,
    /// The evolving physiological/environmental state.
    pub vitals: Vitals,
    /// Last known risk annotation, if the oracle has answered yet.
    pub risk: Option<RiskAnnotation>,
    /// When the worker record was created.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Observer payloads
// ---------------------------------------------------------------------------

/// Per-tick update published to observers after the merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TickUpdate {
    /// The run this update belongs to.
    pub run_id: RunId,
    /// Whether the run is still active after this tick.
    pub is_active: bool,
    /// The run's target regime.
    pub mode: SimMode,
    /// The subject being driven.
    pub worker_id: WorkerId,
    /// Step index of this tick (1-based after the first tick).
    pub step: u64,
    /// Display-only completion estimate in [0, 100].
    pub progress_pct: f64,
    /// The merged worker snapshot after this tick.
    pub worker: Worker,
}

/// Terminal update published exactly once when a run stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TerminalUpdate {
    /// The run that ended.
    pub run_id: RunId,
    /// Terminal lifecycle phase (`Completed`, `Stopped`, or `Failed`).
    pub phase: RunPhase,
    /// Why the run stopped.
    pub cause: StopCause,
    /// Human-readable stop reason for the dashboard.
    pub reason: String,
    /// The subject the run was driving.
    pub worker_id: WorkerId,
    /// The run's target regime.
    pub mode: SimMode,
    /// Number of steps executed before the stop.
    pub steps: u64,
    /// Consecutive oracle failures at the moment of the stop.
    pub consecutive_failures: u32,
    /// Total oracle failures over the whole run.
    pub total_failures: u32,
}

impl TerminalUpdate {
    /// Build a terminal update from a cause, filling phase and reason.
    pub fn from_cause(
        run_id: RunId,
        worker_id: WorkerId,
        mode: SimMode,
        cause: StopCause,
        steps: u64,
        consecutive_failures: u32,
        total_failures: u32,
    ) -> Self {
        Self {
            run_id,
            phase: cause.phase(),
            cause,
            reason: cause.to_string(),
            worker_id,
            mode,
            steps,
            consecutive_failures,
            total_failures,
        }
    }
}
