//! Simulation engine for the Heatwatch risk dashboard.
//!
//! This crate owns the timed control loop that drives a worker's
//! physiological state toward a target regime, submits each perturbed
//! snapshot to the risk oracle, merges the result back into shared
//! state, and publishes every step to observers. The pure kernel it
//! schedules lives in `heatwatch-core`; the oracle contract lives in
//! `heatwatch-oracle`.
//!
//! # Modules
//!
//! - [`driver`] -- The [`Simulator`] controller, run descriptor, and the
//!   single-flight tick task.
//! - [`error`] -- Engine error types.
//! - [`observer`] -- The [`RunObserver`] trait and its broadcast,
//!   tracing, collecting, and no-op implementations.
//! - [`roster`] -- The worker registry (subject resolver) and baseline
//!   generation.
//!
//! [`Simulator`]: driver::Simulator
//! [`RunObserver`]: observer::RunObserver

pub mod driver;
pub mod error;
pub mod observer;
pub mod roster;

pub use driver::{DriverConfig, RunStatus, Simulator};
pub use error::EngineError;
pub use observer::{
    BroadcastObserver, CollectingObserver, NoOpObserver, RunEvent, RunObserver, TracingObserver,
};
pub use roster::WorkerRegistry;
