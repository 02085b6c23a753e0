//! Numeric primitives shared by the aggregation and anomaly stages.
//!
//! Callers filter missing values before calling; every function here returns
//! `None` rather than a NaN or a division error when the statistic is
//! undefined for the given slice.

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Bessel-corrected (n - 1) standard deviation. `None` with fewer than two values.
///
/// Identical values give exactly 0, even when their mean is not representable.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let (lo, hi) = min_max(values)?;
    if lo == hi {
        return Some(0.0);
    }
    let mu = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - mu).powi(2)).sum();
    Some((sum_sq / (values.len() - 1) as f64).sqrt())
}

/// Smallest and largest value. `None` for an empty slice.
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(values.iter().fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))))
}

/// Standardizes `value` against `mean` and `std_dev`.
///
/// Undefined when either statistic is missing or the deviation is exactly 0.
pub fn z_score(value: f64, mean: Option<f64>, std_dev: Option<f64>) -> Option<f64> {
    match (mean, std_dev) {
        (Some(mu), Some(sigma)) if sigma != 0.0 => Some((value - mu) / sigma),
        _ => None,
    }
}
