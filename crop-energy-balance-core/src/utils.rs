//! Module containing miscellaneous numerical helpers.

use crate::imports::*;

/// Floor used for denominators (resistances, conductances) that must stay strictly positive
pub const PRECISION: f64 = 1.0e-6;

pub fn almost_eq(val1: f64, val2: f64, epsilon: Option<f64>) -> bool {
    let epsilon = epsilon.unwrap_or(1e-8);
    ((val2 - val1) / (val1 + val2)).abs() < epsilon || (val2 - val1).abs() < epsilon
}

/// Returns `true` when `|actual - desired| < 1.5 * 10^-decimal`
pub fn almost_eq_decimal(actual: f64, desired: f64, decimal: i32) -> bool {
    (desired - actual).abs() < 1.5 * 10f64.powi(-decimal)
}

/// Returns true if `values` never decrease
pub fn is_non_decreasing(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] <= w[1])
}

/// Returns true if `values` never increase
pub fn is_non_increasing(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] >= w[1])
}

/// Returns the damped temperature step between two consecutive energy balance calculations
/// Arguments:
/// ----------
/// previous_value: f64
///     previous calculated temperature [K]
/// actual_value: f64
///     actual calculated temperature [K]
/// step_fraction: f64
///     fraction of the entire step (`actual_value - previous_value`) to be used [-]
pub fn calc_temperature_step(previous_value: f64, actual_value: f64, step_fraction: f64) -> f64 {
    step_fraction * (actual_value - previous_value)
}

/// Linearly discretizes the closed interval `[inclusive_start, inclusive_stop]` into
/// `vector_length` points.
pub fn discretize_linearly(
    inclusive_start: f64,
    inclusive_stop: f64,
    vector_length: usize,
) -> anyhow::Result<Vec<f64>> {
    ensure!(
        vector_length > 1,
        "`vector_length` must be greater than 1, got {}",
        vector_length
    );
    let step = (inclusive_stop - inclusive_start) / (vector_length - 1) as f64;
    Ok((0..vector_length)
        .map(|i| inclusive_start + step * i as f64)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_almost_eq_zero() {
        assert!(almost_eq(0.0, 1e-9, None));
        assert!(!almost_eq(0.0, 1e-7, None));
    }

    #[test]
    fn test_almost_eq_decimal() {
        assert!(almost_eq_decimal(208.0 / 3600.0, 0.0578, 2));
        assert!(!almost_eq_decimal(1.0, 1.1, 2));
    }

    #[test]
    fn test_trend_helpers() {
        assert!(is_non_decreasing(&[1.0, 1.0, 2.0]));
        assert!(!is_non_decreasing(&[1.0, 0.5]));
        assert!(is_non_increasing(&[3.0, 2.0, 2.0]));
        assert!(is_non_increasing(&[]));
    }

    #[test]
    fn test_temperature_step() {
        assert_eq!(calc_temperature_step(290.0, 300.0, 0.5), 5.0);
        assert_eq!(calc_temperature_step(300.0, 290.0, 1.0), -10.0);
        assert_eq!(calc_temperature_step(300.0, 300.0, 0.5), 0.0);
    }

    #[test]
    fn test_discretize_linearly() {
        let axis = discretize_linearly(0.0, 1.0, 5).unwrap();
        assert_eq!(axis, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert!(discretize_linearly(0.0, 1.0, 1).is_err());
    }
}
