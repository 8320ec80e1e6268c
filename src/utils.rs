//! Small numeric helpers shared by the scoring code.

/// Round `value` to `places` decimal digits.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub fn round1(value: f64) -> f64 {
    round_to(value, 1)
}

/// Clamp into `[min, max]`. NaN collapses to `min`.
pub fn bounded(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.max(min).min(max)
}

pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator), 0 for fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

/// Least-squares slope of `values` against their index.
pub fn linear_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(values);
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_to(1.25, 1), 1.3);
        assert_eq!(round_to(-2.25, 1), -2.3);
        assert_eq!(round1(97.04), 97.0);
    }

    #[test]
    fn slope_of_line_is_exact() {
        let ys = [10.0, 12.0, 14.0, 16.0];
        assert!((linear_slope(&ys) - 2.0).abs() < 1e-12);
        assert_eq!(linear_slope(&[5.0]), 0.0);
    }

    #[test]
    fn sample_std_uses_bessel_correction() {
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((sample_std(&xs) - 2.138_089_935).abs() < 1e-6);
        assert_eq!(sample_std(&[3.0]), 0.0);
    }

    #[test]
    fn bounded_handles_nan() {
        assert_eq!(bounded(f64::NAN, 3.0, 95.0), 3.0);
        assert_eq!(bounded(120.0, 3.0, 95.0), 95.0);
    }
}
