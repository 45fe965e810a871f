//! Termination policy: the continuation predicate the driver consults
//! after every merged tick.
//!
//! Two conditions end a run normally: the global step ceiling, and
//! saturation of BOTH tracked environmental axes. The axis condition is
//! a deliberate OR -- a run keeps ticking until temperature AND humidity
//! have both pinned to their extreme, i.e. it continues while either one
//! still has distance to cover. The progress reporter never feeds into
//! this predicate.

use heatwatch_types::{SimMode, Vitals};

use crate::bounds::VitalBounds;

/// Decide whether a running simulation should execute another tick.
///
/// Returns `false` once `step >= max_steps` (the ceiling is always
/// enforced; there is no "unlimited" setting), or once both temperature
/// and humidity are saturated for the run's mode.
pub const fn should_continue(
    vitals: &Vitals,
    mode: SimMode,
    step: u64,
    max_steps: u64,
    bounds: &VitalBounds,
) -> bool {
    if step >= max_steps {
        return false;
    }
    match mode {
        SimMode::HeatUp => {
            vitals.temperature_c < bounds.temperature.max
                || vitals.humidity_pct < bounds.humidity.max
        }
        SimMode::CoolDown => {
            vitals.temperature_c > bounds.temperature.min
                || vitals.humidity_pct > bounds.humidity.min
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vitals_at(temperature_c: f64, humidity_pct: f64) -> Vitals {
        Vitals {
            temperature_c,
            humidity_pct,
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

    #[test]
    fn heat_up_continues_below_both_maxima() {
        let bounds = VitalBounds::default();
        let vitals = vitals_at(22.0, 45.0);
        assert!(should_continue(&vitals, SimMode::HeatUp, 0, 240, &bounds));
    }

    #[test]
    fn single_saturated_axis_still_continues() {
        // The continuation condition is an OR over the two axes: a run
        // with temperature pinned at max but humidity below max keeps
        // ticking. This mirrors the documented behavior exactly; it is
        // not the stop-on-first-saturation a reader might expect.
        let bounds = VitalBounds::default();

        let temp_only = vitals_at(bounds.temperature.max, 45.0);
        assert!(should_continue(&temp_only, SimMode::HeatUp, 10, 240, &bounds));

        let humidity_only = vitals_at(22.0, bounds.humidity.max);
        assert!(should_continue(&humidity_only, SimMode::HeatUp, 10, 240, &bounds));
    }

    #[test]
    fn heat_up_stops_when_both_axes_saturate() {
        let bounds = VitalBounds::default();
        let vitals = vitals_at(bounds.temperature.max, bounds.humidity.max);
        assert!(!should_continue(&vitals, SimMode::HeatUp, 10, 240, &bounds));
    }

    #[test]
    fn cool_down_is_symmetric_against_minima() {
        let bounds = VitalBounds::default();

        let warm = vitals_at(22.0, 45.0);
        assert!(should_continue(&warm, SimMode::CoolDown, 0, 240, &bounds));

        let temp_only = vitals_at(bounds.temperature.min, 45.0);
        assert!(should_continue(&temp_only, SimMode::CoolDown, 0, 240, &bounds));

        let both = vitals_at(bounds.temperature.min, bounds.humidity.min);
        assert!(!should_continue(&both, SimMode::CoolDown, 0, 240, &bounds));
    }

    #[test]
    fn step_ceiling_overrides_axis_state() {
        let bounds = VitalBounds::default();
        let vitals = vitals_at(22.0, 45.0);
        assert!(should_continue(&vitals, SimMode::HeatUp, 239, 240, &bounds));
        assert!(!should_continue(&vitals, SimMode::HeatUp, 240, 240, &bounds));
        assert!(!should_continue(&vitals, SimMode::HeatUp, 241, 240, &bounds));
    }
}
