//! Shared type definitions for the Heatwatch risk simulation.
//!
//! This crate is the single source of truth for all types used across the
//! Heatwatch workspace. Types defined here flow downstream to `TypeScript`
//! via `ts-rs` for the risk dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for entity identifiers
//! - [`enums`] -- Enumeration types (simulation mode, run lifecycle, tiers)
//! - [`structs`] -- Core entity structs (workers, vitals, observer payloads)

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{RiskTier, RunPhase, SimMode, StopCause};
pub use ids::{RunId, WorkerId};
pub use structs::{RiskAnnotation, TerminalUpdate, TickUpdate, Vitals, Worker};
