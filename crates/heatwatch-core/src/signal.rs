//! Signal generator: the pure per-tick perturbation of a worker's vitals.
//!
//! `next_vitals` is the only entry point the driver calls. It is pure and
//! deterministic: no I/O, no randomness, no clock. Each mode has its own
//! rate table because the two transforms are not mirror-exact -- different
//! HRV bands recover at different physiological speeds than they degrade.
//!
//! The eleven primaries (temperature, humidity, mean heart rate, and the
//! eight spectral/time-domain HRV statistics) are perturbed, clamped, and
//! rounded; the remaining fields are then recomputed as deterministic
//! functions of the primaries and are never perturbed independently.

use heatwatch_types::{SimMode, Vitals};
use serde::Deserialize;

use crate::bounds::{VitalBounds, round0, round1, round2, round3};

// ---------------------------------------------------------------------------
// Rate tables
// ---------------------------------------------------------------------------

/// Per-tick perturbation rates for one mode.
///
/// Environmental quantities move by additive steps; cardiac and HRV
/// quantities move by multiplicative factors. The rates are deliberately
/// non-uniform across HRV bands.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModeRates {
    /// Additive temperature step per tick, degrees Celsius.
    pub temperature_step: f64,
    /// Additive humidity step per tick, percentage points.
    pub humidity_step: f64,
    /// Multiplicative factor for mean heart rate.
    pub hr_factor: f64,
    /// Multiplicative factor for RMSSD.
    pub rmssd_factor: f64,
    /// Multiplicative factor for SDNN.
    pub sdnn_factor: f64,
    /// Multiplicative factor for mean NNI.
    pub mean_nni_factor: f64,
    /// Multiplicative factor for `pNN50`.
    pub pnn50_factor: f64,
    /// Multiplicative factor for total spectral power.
    pub total_power_factor: f64,
    /// Multiplicative factor for VLF band power.
    pub vlf_factor: f64,
    /// Multiplicative factor for LF band power.
    pub lf_factor: f64,
    /// Multiplicative factor for HF band power.
    pub hf_factor: f64,
}

/// Rate tables for both modes.
///
/// Overriding either table in configuration replaces it wholesale; the
/// defaults are the dashboard's documented drift rates.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SignalConfig {
    /// Heat-up rate table (arousal drift).
    #[serde(default = "default_heat_rates")]
    pub heat: ModeRates,
    /// Cool-down rate table (recovery drift).
    #[serde(default = "default_cool_rates")]
    pub cool: ModeRates,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            heat: default_heat_rates(),
            cool: default_cool_rates(),
        }
    }
}

const fn default_heat_rates() -> ModeRates {
    ModeRates {
        temperature_step: 1.2,
        humidity_step: 3.5,
        hr_factor: 1.021,
        rmssd_factor: 0.955,
        sdnn_factor: 0.97,
        mean_nni_factor: 0.985,
        pnn50_factor: 0.94,
        total_power_factor: 0.965,
        vlf_factor: 0.975,
        lf_factor: 1.03,
        hf_factor: 0.93,
    }
}

const fn default_cool_rates() -> ModeRates {
    ModeRates {
        temperature_step: -1.2,
        humidity_step: -3.5,
        hr_factor: 0.984,
        rmssd_factor: 1.04,
        sdnn_factor: 1.025,
        mean_nni_factor: 1.012,
        pnn50_factor: 1.05,
        total_power_factor: 1.03,
        vlf_factor: 1.02,
        lf_factor: 0.975,
        hf_factor: 1.06,
    }
}

// ---------------------------------------------------------------------------
// Perturbation
// ---------------------------------------------------------------------------

/// Compute the next vitals state for one tick of the given mode.
///
/// Pure and deterministic. The result is clamped into `bounds`, rounded
/// per the workspace rounding policy, and has all derived fields
/// recomputed.
pub fn next_vitals(
    current: &Vitals,
    mode: SimMode,
    config: &SignalConfig,
    bounds: &VitalBounds,
) -> Vitals {
    let perturbed = match mode {
        SimMode::HeatUp => perturb(current, &config.heat),
        SimMode::CoolDown => perturb(current, &config.cool),
    };
    normalize(&perturbed, bounds)
}

/// Clamp the primaries of `vitals` and recompute every derived field.
///
/// Idempotent: normalizing an already-normalized state is a no-op. The
/// driver uses this to re-seed cached state without perturbing it.
pub fn normalize(vitals: &Vitals, bounds: &VitalBounds) -> Vitals {
    derive_secondary(&bounds.clamp_primaries(vitals))
}

/// Apply one mode's rate table to the primaries. Derived fields are left
/// stale here; `normalize` recomputes them.
fn perturb(current: &Vitals, rates: &ModeRates) -> Vitals {
    Vitals {
        temperature_c: current.temperature_c + rates.temperature_step,
        humidity_pct: current.humidity_pct + rates.humidity_step,
        hr_mean: current.hr_mean * rates.hr_factor,
        rmssd: current.rmssd * rates.rmssd_factor,
        sdnn: current.sdnn * rates.sdnn_factor,
        pnn50: current.pnn50 * rates.pnn50_factor,
        mean_nni: current.mean_nni * rates.mean_nni_factor,
        total_power: current.total_power * rates.total_power_factor,
        vlf: current.vlf * rates.vlf_factor,
        lf: current.lf * rates.lf_factor,
        hf: current.hf * rates.hf_factor,
        ..current.clone()
    }
}

/// Recompute the mechanically derived fields from clamped primaries.
///
/// - min/max/std heart rate from mean HR and SDNN
/// - LF/HF ratio from the band powers (the HF floor keeps it finite)
/// - median/range/CV of NNI from mean NNI and SDNN
fn derive_secondary(primaries: &Vitals) -> Vitals {
    let hr_min = round1(primaries.hr_mean - 0.20 * primaries.sdnn);
    let hr_max = round1(primaries.hr_mean + 0.25 * primaries.sdnn);
    let hr_std = round1(0.08 * primaries.sdnn);

    let lf_hf_ratio = if primaries.hf > 0.0 {
        round2(primaries.lf / primaries.hf)
    } else {
        0.0
    };

    let median_nni = round0(primaries.mean_nni);
    let range_nni = round0(3.5 * primaries.sdnn);
    let cv_nni = if primaries.mean_nni > 0.0 {
        round3(primaries.sdnn / primaries.mean_nni)
    } else {
        0.0
    };

    Vitals {
        hr_min,
        hr_max,
        hr_std,
        lf_hf_ratio,
        median_nni,
        range_nni,
        cv_nni,
        ..primaries.clone()
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn resting_vitals() -> Vitals {
        Vitals {
            temperature_c: 22.0,
            humidity_pct: 45.0,
            hr_mean: 70.0,
            hr_min: 61.0,
            hr_max: 81.3,
            hr_std: 3.6,
            rmssd: 42.0,
            sdnn: 45.0,
            pnn50: 18.0,
            mean_nni: 857.0,
            median_nni: 857.0,
            range_nni: 158.0,
            cv_nni: 0.053,
            total_power: 2400.0,
            vlf: 900.0,
            lf: 700.0,
            hf: 600.0,
            lf_hf_ratio: 1.17,
        }
    }

    fn random_vitals(rng: &mut StdRng) -> Vitals {
        Vitals {
            temperature_c: rng.random_range(-5.0..60.0),
            humidity_pct: rng.random_range(0.0..130.0),
            hr_mean: rng.random_range(30.0..180.0),
            hr_min: 0.0,
            hr_max: 0.0,
            hr_std: 0.0,
            rmssd: rng.random_range(1.0..200.0),
            sdnn: rng.random_range(1.0..250.0),
            pnn50: rng.random_range(0.0..90.0),
            mean_nni: rng.random_range(300.0..1600.0),
            median_nni: 0.0,
            range_nni: 0.0,
            cv_nni: 0.0,
            total_power: rng.random_range(100.0..9000.0),
            vlf: rng.random_range(50.0..4000.0),
            lf: rng.random_range(50.0..4000.0),
            hf: rng.random_range(50.0..4000.0),
            lf_hf_ratio: 0.0,
        }
    }

    fn assert_primaries_in_bounds(v: &Vitals, b: &VitalBounds) {
        assert!(v.temperature_c >= b.temperature.min && v.temperature_c <= b.temperature.max);
        assert!(v.humidity_pct >= b.humidity.min && v.humidity_pct <= b.humidity.max);
        assert!(v.hr_mean >= b.hr_mean.min && v.hr_mean <= b.hr_mean.max);
        assert!(v.rmssd >= b.rmssd.min && v.rmssd <= b.rmssd.max);
        assert!(v.sdnn >= b.sdnn.min && v.sdnn <= b.sdnn.max);
        assert!(v.pnn50 >= b.pnn50.min && v.pnn50 <= b.pnn50.max);
        assert!(v.mean_nni >= b.mean_nni.min && v.mean_nni <= b.mean_nni.max);
        assert!(v.total_power >= b.total_power.min && v.total_power <= b.total_power.max);
        assert!(v.vlf >= b.vlf.min && v.vlf <= b.vlf.max);
        assert!(v.lf >= b.lf.min && v.lf <= b.lf.max);
        assert!(v.hf >= b.hf.min && v.hf <= b.hf.max);
    }

    #[test]
    fn heat_up_single_tick_from_resting_state() {
        let config = SignalConfig::default();
        let bounds = VitalBounds::default();
        let next = next_vitals(&resting_vitals(), SimMode::HeatUp, &config, &bounds);

        assert_close(next.temperature_c, 23.2);
        assert_close(next.humidity_pct, 48.5);
        // 70.0 * 1.021 = 71.47 -> one decimal -> 71.5
        assert_close(next.hr_mean, 71.5);
    }

    #[test]
    fn heat_up_shifts_hrv_toward_arousal() {
        let config = SignalConfig::default();
        let bounds = VitalBounds::default();
        let current = resting_vitals();
        let next = next_vitals(&current, SimMode::HeatUp, &config, &bounds);

        assert!(next.rmssd < current.rmssd);
        assert!(next.sdnn < current.sdnn);
        assert!(next.pnn50 < current.pnn50);
        assert!(next.mean_nni < current.mean_nni);
        assert!(next.hf < current.hf);
        assert!(next.lf > current.lf);
        assert!(next.lf_hf_ratio > current.lf_hf_ratio);
    }

    #[test]
    fn cool_down_relaxes_toward_baseline() {
        let config = SignalConfig::default();
        let bounds = VitalBounds::default();
        let mut current = resting_vitals();
        current.temperature_c = 30.0;
        current.humidity_pct = 80.0;
        current.hr_mean = 100.0;
        current.rmssd = 20.0;

        let next = next_vitals(&current, SimMode::CoolDown, &config, &bounds);
        assert_close(next.temperature_c, 28.8);
        assert_close(next.humidity_pct, 76.5);
        assert!(next.hr_mean < current.hr_mean);
        assert!(next.rmssd > current.rmssd);
        assert!(next.lf < current.lf);
        assert!(next.hf > current.hf);
    }

    #[test]
    fn repeated_heat_up_saturates_at_maxima() {
        let config = SignalConfig::default();
        let bounds = VitalBounds::default();
        let mut state = resting_vitals();
        for _ in 0..60 {
            state = next_vitals(&state, SimMode::HeatUp, &config, &bounds);
        }
        assert_close(state.temperature_c, bounds.temperature.max);
        assert_close(state.humidity_pct, bounds.humidity.max);
        assert_close(state.hr_mean, bounds.hr_mean.max);
    }

    #[test]
    fn repeated_cool_down_floors_at_minima() {
        let config = SignalConfig::default();
        let bounds = VitalBounds::default();
        let mut state = resting_vitals();
        for _ in 0..60 {
            state = next_vitals(&state, SimMode::CoolDown, &config, &bounds);
        }
        assert_close(state.temperature_c, bounds.temperature.min);
        assert_close(state.humidity_pct, bounds.humidity.min);
        assert_close(state.hr_mean, bounds.hr_mean.min);
    }

    #[test]
    fn outputs_stay_in_bounds_from_any_valid_state() {
        // Randomized bounds property: from arbitrary (even out-of-range)
        // starting states, one tick of either mode lands every primary
        // inside its documented range.
        let config = SignalConfig::default();
        let bounds = VitalBounds::default();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..1000 {
            let start = random_vitals(&mut rng);
            for mode in [SimMode::HeatUp, SimMode::CoolDown] {
                let next = next_vitals(&start, mode, &config, &bounds);
                assert_primaries_in_bounds(&next, &bounds);
                assert!(next.lf_hf_ratio.is_finite());
                assert!(next.cv_nni.is_finite());
            }
        }
    }

    #[test]
    fn normalize_is_idempotent() {
        let bounds = VitalBounds::default();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let start = random_vitals(&mut rng);
            let once = normalize(&start, &bounds);
            let twice = normalize(&once, &bounds);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn derived_fields_follow_primaries() {
        let config = SignalConfig::default();
        let bounds = VitalBounds::default();
        let next = next_vitals(&resting_vitals(), SimMode::HeatUp, &config, &bounds);

        assert_close(next.hr_min, round1(next.hr_mean - 0.20 * next.sdnn));
        assert_close(next.hr_max, round1(next.hr_mean + 0.25 * next.sdnn));
        assert_close(next.hr_std, round1(0.08 * next.sdnn));
        assert_close(next.lf_hf_ratio, round2(next.lf / next.hf));
        assert_close(next.median_nni, round0(next.mean_nni));
        assert_close(next.range_nni, round0(3.5 * next.sdnn));
        assert_close(next.cv_nni, round3(next.sdnn / next.mean_nni));
    }
}
