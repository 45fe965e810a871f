//! Simulation kernel for the Heatwatch risk dashboard.
//!
//! This crate owns the pure pieces of the stepwise physiological
//! simulation: clamp ranges and rounding, the per-tick signal generator,
//! the termination policy, the progress estimate, and typed configuration
//! loading. Everything here is deterministic and I/O-free; the timed loop
//! that drives it lives in `heatwatch-engine`.
//!
//! # Modules
//!
//! - [`bounds`] -- Clamp ranges, bounds table, and the rounding policy.
//! - [`config`] -- Configuration loading from `heatwatch-config.yaml`
//!   into strongly-typed structs.
//! - [`policy`] -- The continuation predicate (step ceiling + dual-axis
//!   saturation).
//! - [`progress`] -- Display-only completion estimate.
//! - [`signal`] -- The per-tick perturbation with per-mode rate tables.

pub mod bounds;
pub mod config;
pub mod policy;
pub mod progress;
pub mod signal;
