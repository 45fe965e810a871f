//! Physiological clamp ranges and the rounding policy.
//!
//! Every quantity the signal generator perturbs has a configured
//! [`Range`]; after every tick the primaries are clamped into their
//! ranges and rounded. Clamping is idempotent: re-clamping an already
//! clamped value is a no-op, which the driver relies on when it merges
//! candidate states back into shared state.
//!
//! Rounding is applied consistently across the workspace:
//! one decimal for continuous physical quantities, integer for power and
//! interval quantities, two decimals for the LF/HF ratio, three for the
//! NNI coefficient of variation and classifier confidence, four for the
//! composite risk score.

use heatwatch_types::Vitals;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Range
// ---------------------------------------------------------------------------

/// An inclusive `[min, max]` clamp range for one vital quantity.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Range {
    /// Lower clamp bound.
    pub min: f64,
    /// Upper clamp bound.
    pub max: f64,
}

impl Range {
    /// Construct a range from its endpoints.
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Clamp `value` into `[min, max]`.
    ///
    /// Written without `f64::clamp` so a misconfigured range (min > max)
    /// degrades to the lower bound instead of panicking.
    pub const fn clamp(&self, value: f64) -> f64 {
        if value > self.max {
            self.max
        } else if value < self.min {
            self.min
        } else {
            value
        }
    }

    /// Fractional position of `value` within the range, clamped to [0, 1].
    ///
    /// Returns 1.0 for a degenerate range (span <= 0), treating the axis
    /// as trivially saturated.
    pub const fn fraction(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 1.0;
        }
        let raw = (value - self.min) / span;
        if raw < 0.0 {
            0.0
        } else if raw > 1.0 {
            1.0
        } else {
            raw
        }
    }
}

// ---------------------------------------------------------------------------
// Bounds table
// ---------------------------------------------------------------------------

/// Clamp ranges for every perturbed vital quantity.
///
/// The defaults mirror the dashboard's documented physiological table;
/// all of them are a configuration surface, not hard-coded policy.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VitalBounds {
    /// Ambient temperature, degrees Celsius.
    #[serde(default = "default_temperature")]
    pub temperature: Range,
    /// Relative humidity, percent.
    #[serde(default = "default_humidity")]
    pub humidity: Range,
    /// Mean heart rate, bpm.
    #[serde(default = "default_hr_mean")]
    pub hr_mean: Range,
    /// RMSSD, ms.
    #[serde(default = "default_rmssd")]
    pub rmssd: Range,
    /// SDNN, ms.
    #[serde(default = "default_sdnn")]
    pub sdnn: Range,
    /// `pNN50`, percent.
    #[serde(default = "default_pnn50")]
    pub pnn50: Range,
    /// Mean NNI, ms.
    #[serde(default = "default_mean_nni")]
    pub mean_nni: Range,
    /// Total spectral power.
    #[serde(default = "default_total_power")]
    pub total_power: Range,
    /// VLF band power.
    #[serde(default = "default_vlf")]
    pub vlf: Range,
    /// LF band power.
    #[serde(default = "default_lf")]
    pub lf: Range,
    /// HF band power.
    #[serde(default = "default_hf")]
    pub hf: Range,
}

impl Default for VitalBounds {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            humidity: default_humidity(),
            hr_mean: default_hr_mean(),
            rmssd: default_rmssd(),
            sdnn: default_sdnn(),
            pnn50: default_pnn50(),
            mean_nni: default_mean_nni(),
            total_power: default_total_power(),
            vlf: default_vlf(),
            lf: default_lf(),
            hf: default_hf(),
        }
    }
}

impl VitalBounds {
    /// Clamp and round the eleven perturbed primaries of `vitals`,
    /// leaving the derived fields untouched.
    ///
    /// Idempotent: applying this twice yields the same result as once.
    pub fn clamp_primaries(&self, vitals: &Vitals) -> Vitals {
        Vitals {
            temperature_c: round1(self.temperature.clamp(vitals.temperature_c)),
            humidity_pct: round1(self.humidity.clamp(vitals.humidity_pct)),
            hr_mean: round1(self.hr_mean.clamp(vitals.hr_mean)),
            rmssd: round1(self.rmssd.clamp(vitals.rmssd)),
            sdnn: round1(self.sdnn.clamp(vitals.sdnn)),
            pnn50: round1(self.pnn50.clamp(vitals.pnn50)),
            mean_nni: round0(self.mean_nni.clamp(vitals.mean_nni)),
            total_power: round0(self.total_power.clamp(vitals.total_power)),
            vlf: round0(self.vlf.clamp(vitals.vlf)),
            lf: round0(self.lf.clamp(vitals.lf)),
            hf: round0(self.hf.clamp(vitals.hf)),
            ..vitals.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Rounding helpers
// ---------------------------------------------------------------------------

/// Round to the nearest integer value (stored as `f64`).
pub fn round0(value: f64) -> f64 {
    value.round()
}

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round to three decimal places.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Round to four decimal places.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_temperature() -> Range {
    Range::new(10.0, 34.0)
}

const fn default_humidity() -> Range {
    Range::new(20.0, 90.0)
}

const fn default_hr_mean() -> Range {
    Range::new(50.0, 110.0)
}

const fn default_rmssd() -> Range {
    Range::new(15.0, 120.0)
}

const fn default_sdnn() -> Range {
    Range::new(20.0, 150.0)
}

const fn default_pnn50() -> Range {
    Range::new(2.0, 55.0)
}

const fn default_mean_nni() -> Range {
    Range::new(540.0, 1180.0)
}

const fn default_total_power() -> Range {
    Range::new(800.0, 4500.0)
}

const fn default_vlf() -> Range {
    Range::new(300.0, 1800.0)
}

const fn default_lf() -> Range {
    Range::new(250.0, 1800.0)
}

const fn default_hf() -> Range {
    Range::new(120.0, 1500.0)
}
