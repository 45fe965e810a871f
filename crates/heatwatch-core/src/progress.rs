//! Progress reporter: a display-only completion estimate.
//!
//! Converts the two environmental axes into a 0-100% figure for the
//! dashboard's progress bar. Each axis is clamped to [0, 100] before
//! averaging, so an overshoot on one axis can neither push the average
//! past 100 nor drag the other axis negative. This value is purely a UI
//! aid and never feeds back into the termination policy.

use heatwatch_types::SimMode;

use crate::bounds::VitalBounds;

/// Completion estimate in [0, 100] for the given environmental state.
///
/// Heat-up: average fractional distance of temperature and humidity from
/// their minima toward their maxima. Cool-down: the inversion.
pub const fn completion_pct(
    temperature_c: f64,
    humidity_pct: f64,
    mode: SimMode,
    bounds: &VitalBounds,
) -> f64 {
    let temp_leg = bounds.temperature.fraction(temperature_c) * 100.0;
    let humidity_leg = bounds.humidity.fraction(humidity_pct) * 100.0;
    let heating = (temp_leg + humidity_leg) / 2.0;
    match mode {
        SimMode::HeatUp => heating,
        SimMode::CoolDown => 100.0 - heating,
    }
}
