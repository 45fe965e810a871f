//! Risk oracle backends and the request/response contract.
//!
//! Defines an enum-based dispatch for oracle backends, avoiding the
//! dyn-compatibility issues with async trait methods. The HTTP backend
//! talks to the prediction service over `reqwest` with a hard timeout;
//! the scripted backend replays a deterministic outcome queue for tests.
//!
//! The loop does not care what model is behind the service -- it sends a
//! flat feature snapshot and expects a classification with confidence.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use heatwatch_types::Worker;
use serde::{Deserialize, Serialize};

use crate::error::OracleError;

// ---------------------------------------------------------------------------
// Request contract
// ---------------------------------------------------------------------------

/// Flat feature snapshot submitted to the prediction service.
///
/// Every field the classifier consumes, flattened from a [`Worker`].
/// Optional demographics the registry does not track are sent as zero,
/// which the service treats as "unknown".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskRequest {
    /// Worker age in years.
    pub age: f64,
    /// Body weight in kilograms (0 = unknown).
    pub weight_kg: f64,
    /// Height in centimeters (0 = unknown).
    pub height_cm: f64,
    /// Ambient temperature, degrees Celsius.
    pub temperature_c: f64,
    /// Relative humidity, percent.
    pub humidity_pct: f64,
    /// Mean heart rate, bpm.
    pub hr_mean: f64,
    /// Minimum heart rate, bpm.
    pub hr_min: f64,
    /// Maximum heart rate, bpm.
    pub hr_max: f64,
    /// Heart-rate standard deviation.
    pub hr_std: f64,
    /// RMSSD, ms.
    pub rmssd: f64,
    /// SDNN, ms.
    pub sdnn: f64,
    /// `pNN50`, percent.
    pub pnn50: f64,
    /// Mean NNI, ms.
    pub mean_nni: f64,
    /// Median NNI, ms.
    pub median_nni: f64,
    /// NNI range, ms.
    pub range_nni: f64,
    /// NNI coefficient of variation.
    pub cv_nni: f64,
    /// Total spectral power.
    pub total_power: f64,
    /// VLF band power.
    pub vlf: f64,
    /// LF band power.
    pub lf: f64,
    /// HF band power.
    pub hf: f64,
    /// LF/HF ratio.
    pub lf_hf_ratio: f64,
}

impl RiskRequest {
    /// Flatten a worker snapshot into the oracle's feature contract.
    pub fn from_worker(worker: &Worker) -> Self {
        let v = &worker.vitals;
        Self {
            age: f64::from(worker.age_years),
            weight_kg: 0.0,
            height_cm: 0.0,
            temperature_c: v.temperature_c,
            humidity_pct: v.humidity_pct,
            hr_mean: v.hr_mean,
            hr_min: v.hr_min,
            hr_max: v.hr_max,
            hr_std: v.hr_std,
            rmssd: v.rmssd,
            sdnn: v.sdnn,
            pnn50: v.pnn50,
            mean_nni: v.mean_nni,
            median_nni: v.median_nni,
            range_nni: v.range_nni,
            cv_nni: v.cv_nni,
            total_power: v.total_power,
            vlf: v.vlf,
            lf: v.lf,
            hf: v.hf,
            lf_hf_ratio: v.lf_hf_ratio,
        }
    }
}

// ---------------------------------------------------------------------------
// Response contract
// ---------------------------------------------------------------------------

/// A successful risk assessment from the prediction service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Composite risk score in [0, 1].
    pub risk_score: f64,
    /// Classifier label (e.g. "safe", "warning", "danger").
    pub predicted_class: String,
    /// Classifier confidence in [0, 1].
    pub confidence: f64,
}

impl RiskAssessment {
    /// Check the contract's range constraints.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::InvalidResponse`] naming the violated
    /// constraint. `NaN` fails every comparison and is rejected too.
    pub fn validate(&self) -> Result<(), OracleError> {
        if !(self.risk_score >= 0.0 && self.risk_score <= 1.0) {
            return Err(OracleError::InvalidResponse {
                message: format!("risk_score {} outside [0, 1]", self.risk_score),
            });
        }
        if !(self.confidence >= 0.0 && self.confidence <= 1.0) {
            return Err(OracleError::InvalidResponse {
                message: format!("confidence {} outside [0, 1]", self.confidence),
            });
        }
        if self.predicted_class.is_empty() {
            return Err(OracleError::InvalidResponse {
                message: "predicted_class is empty".to_owned(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unified backend enum (dyn-compatible alternative to async trait)
// ---------------------------------------------------------------------------

/// A risk oracle backend that can assess a worker snapshot.
///
/// Uses enum dispatch instead of trait objects because async methods
/// are not dyn-compatible in Rust.
pub enum RiskOracle {
    /// The production HTTP prediction service.
    Http(HttpRiskOracle),
    /// A deterministic scripted backend for tests.
    Scripted(ScriptedOracle),
}

impl RiskOracle {
    /// Submit a snapshot and return the validated assessment.
    ///
    /// Dispatches to the concrete backend implementation.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] on any non-success outcome; the caller
    /// treats all variants identically.
    pub async fn assess(&self, request: &RiskRequest) -> Result<RiskAssessment, OracleError> {
        match self {
            Self::Http(backend) => backend.assess(request).await,
            Self::Scripted(backend) => backend.assess().await,
        }
    }

    /// Human-readable backend name for logging.
    pub const fn name(&self) -> &str {
        match self {
            Self::Http(_) => "http",
            Self::Scripted(_) => "scripted",
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP backend
// ---------------------------------------------------------------------------

/// Backend for the HTTP prediction service.
///
/// Sends requests to `{base_url}/predict`. The whole call is bounded by
/// the configured timeout at the client level, so a stalled service
/// becomes a [`OracleError::Timeout`] instead of a hung tick.
pub struct HttpRiskOracle {
    client: reqwest::Client,
    base_url: String,
    timeout_ms: u64,
}

impl HttpRiskOracle {
    /// Create a new HTTP oracle backend.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Init`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::Init {
                message: format!("{e}"),
            })?;
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            timeout_ms,
        })
    }

    /// Submit a snapshot and return the validated assessment.
    async fn assess(&self, request: &RiskRequest) -> Result<RiskAssessment, OracleError> {
        let url = format!("{}/predict", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout {
                        timeout_ms: self.timeout_ms,
                    }
                } else {
                    OracleError::Request {
                        message: format!("{e}"),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(OracleError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let assessment: RiskAssessment = response.json().await.map_err(|e| {
            if e.is_timeout() {
                OracleError::Timeout {
                    timeout_ms: self.timeout_ms,
                }
            } else {
                OracleError::Parse {
                    message: format!("{e}"),
                }
            }
        })?;

        assessment.validate()?;
        Ok(assessment)
    }
}

// ---------------------------------------------------------------------------
// Scripted backend
// ---------------------------------------------------------------------------

/// One entry in a scripted oracle's outcome queue.
pub type ScriptedOutcome = Result<RiskAssessment, String>;

/// A deterministic oracle for tests.
///
/// Replays a queue of outcomes in order; once the queue is drained it
/// falls back to a fixed outcome (an assessment, or a scripted failure
/// when none is configured). An optional artificial latency lets tests
/// exercise the loop's single-flight behavior under a slow service.
pub struct ScriptedOracle {
    script: Mutex<VecDeque<ScriptedOutcome>>,
    fallback: Option<RiskAssessment>,
    latency: Duration,
}

impl ScriptedOracle {
    /// An oracle that answers every call with the same assessment.
    pub fn always(assessment: RiskAssessment) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(assessment),
            latency: Duration::ZERO,
        }
    }

    /// An oracle that fails every call.
    pub const fn failing() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: None,
            latency: Duration::ZERO,
        }
    }

    /// An oracle that replays `outcomes` in order, then keeps answering
    /// with `fallback` (or failing, when `fallback` is `None`).
    pub fn from_script(
        outcomes: impl IntoIterator<Item = ScriptedOutcome>,
        fallback: Option<RiskAssessment>,
    ) -> Self {
        Self {
            script: Mutex::new(outcomes.into_iter().collect()),
            fallback,
            latency: Duration::ZERO,
        }
    }

    /// Add an artificial per-call latency.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Pop the next scripted outcome.
    async fn assess(&self) -> Result<RiskAssessment, OracleError> {
        if self.latency > Duration::ZERO {
            tokio::time::sleep(self.latency).await;
        }

        let next = {
            // A poisoned script lock means a test already failed; keep
            // replaying from whatever state it left behind.
            let mut script = match self.script.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            script.pop_front()
        };

        match next {
            Some(Ok(assessment)) => Ok(assessment),
            Some(Err(message)) => Err(OracleError::Scripted { message }),
            None => self.fallback.clone().map_or_else(
                || {
                    Err(OracleError::Scripted {
                        message: "script exhausted".to_owned(),
                    })
                },
                Ok,
            ),
        }
    }
}
