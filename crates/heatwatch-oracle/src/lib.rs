//! Risk oracle client for the Heatwatch simulation loop.
//!
//! The simulation loop consumes the prediction service only through the
//! contract in this crate: submit a flat worker snapshot, get back a
//! classification with confidence, bounded by a hard timeout. Every
//! non-success outcome -- transport error, bad status, malformed body,
//! out-of-range values, timeout -- surfaces as one [`OracleError`] the
//! loop counts against its error budgets.
//!
//! # Modules
//!
//! - [`error`] -- The oracle error taxonomy.
//! - [`oracle`] -- Backends ([`HttpRiskOracle`], [`ScriptedOracle`]) and
//!   the request/response contract.

pub mod error;
pub mod oracle;

pub use error::OracleError;
pub use oracle::{HttpRiskOracle, RiskAssessment, RiskOracle, RiskRequest, ScriptedOracle};
