//! Enumeration types for the Heatwatch risk simulation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Simulation mode
// ---------------------------------------------------------------------------

/// Target regime a simulation run drives the worker toward.
///
/// The mode is chosen at run start and never changes during a run. Each
/// mode has its own rate table in the signal generator; the two transforms
/// are symmetric but not mirror-exact (different HRV bands respond at
/// different physiological speeds in each direction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum SimMode {
    /// Drive temperature, humidity, and heart rate up toward the maxima
    /// while HRV shifts toward sympathetic arousal.
    HeatUp,
    /// The relaxation transform: environmental values fall toward the
    /// minima and HRV recovers toward a resting baseline.
    CoolDown,
}

impl core::fmt::Display for SimMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::HeatUp => write!(f, "heat-up"),
            Self::CoolDown => write!(f, "cool-down"),
        }
    }
}

// ---------------------------------------------------------------------------
// Run lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle phase of a simulation run as published to observers.
///
/// A run moves `Idle -> Running -> {Completed, Stopped, Failed}` and the
/// controller returns to `Idle` once the terminal transition is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum RunPhase {
    /// No run is active for the subject.
    Idle,
    /// A run is ticking.
    Running,
    /// The run reached a normal termination (policy satisfied or step
    /// ceiling exhausted).
    Completed,
    /// The run was stopped deliberately (user request, supersession, or
    /// baseline reset).
    Stopped,
    /// The run died on an error condition (missing subject or exhausted
    /// oracle error budget).
    Failed,
}

/// Why a simulation run stopped.
///
/// The dashboard distinguishes terminal outcomes by this cause, so each
/// variant carries a stable machine code ([`StopCause::code`]) alongside
/// the human-readable [`core::fmt::Display`] reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum StopCause {
    /// The termination policy reported saturation on both tracked axes.
    Completed,
    /// The global step ceiling was reached. Normal, non-error termination.
    StepLimit,
    /// An explicit stop request from outside the loop.
    UserRequested,
    /// A new run for the subject tore this one down.
    Superseded,
    /// A baseline reset tore this run down.
    Reset,
    /// The subject could not be resolved by identity.
    WorkerNotFound,
    /// The consecutive oracle-failure budget was exhausted.
    ConsecutiveFailures,
    /// The total oracle-failure budget was exhausted.
    TotalFailures,
}

impl StopCause {
    /// Stable machine-readable code for dashboard branching.
    pub const fn code(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::StepLimit => "step-limit",
            Self::UserRequested => "stopped",
            Self::Superseded => "superseded",
            Self::Reset => "reset",
            Self::WorkerNotFound => "worker-not-found",
            Self::ConsecutiveFailures => "consecutive-failures",
            Self::TotalFailures => "total-failures",
        }
    }

    /// The terminal phase a run ends in for this cause.
    pub const fn phase(self) -> RunPhase {
        match self {
            Self::Completed | Self::StepLimit => RunPhase::Completed,
            Self::UserRequested | Self::Superseded | Self::Reset => RunPhase::Stopped,
            Self::WorkerNotFound | Self::ConsecutiveFailures | Self::TotalFailures => {
                RunPhase::Failed
            }
        }
    }
}

impl core::fmt::Display for StopCause {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Completed => write!(f, "simulation completed"),
            Self::StepLimit => write!(f, "step ceiling reached"),
            Self::UserRequested => write!(f, "stopped by user"),
            Self::Superseded => write!(f, "superseded by a new run"),
            Self::Reset => write!(f, "reset to baseline"),
            Self::WorkerNotFound => write!(f, "subject not found"),
            Self::ConsecutiveFailures => {
                write!(f, "stopped due to repeated prediction failures")
            }
            Self::TotalFailures => {
                write!(f, "stopped due to accumulated prediction failures")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Risk tier
// ---------------------------------------------------------------------------

/// Coarse a-priori risk tier assigned to a worker at creation.
///
/// The tier shapes the baseline vitals the generator produces; it is not
/// the oracle's prediction (that lives in the risk annotation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum RiskTier {
    /// Baseline near resting physiology.
    Low,
    /// Mildly elevated baseline.
    Moderate,
    /// Elevated baseline close to the warning thresholds.
    High,
}

impl core::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Moderate => write!(f, "moderate"),
            Self::High => write!(f, "high"),
        }
    }
}
