//! Statistical utility functions.

use statrs::distribution::{ContinuousCDF, Normal};

/// Quantile function of the standard normal distribution.
///
/// # Example
/// ```
/// use vaccine_risk::utils::quantile_normal;
///
/// let z = quantile_normal(0.975);
/// assert!((z - 1.96).abs() < 0.01);
/// ```
pub fn quantile_normal(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    match Normal::new(0.0, 1.0) {
        Ok(normal) => normal.inverse_cdf(p),
        Err(_) => f64::NAN,
    }
}

/// Two-sided z-score for a confidence level in `(0, 1)`.
///
/// The conventional levels use their tabulated values (1.645, 1.96, 2.58);
/// any other level is taken from the normal quantile.
pub fn z_score(confidence: f64) -> f64 {
    const TABLE: [(f64, f64); 3] = [(0.90, 1.645), (0.95, 1.96), (0.99, 2.58)];

    if let Some(&(_, z)) = TABLE
        .iter()
        .find(|(level, _)| (confidence - level).abs() < 1e-9)
    {
        return z;
    }
    if !(confidence > 0.0 && confidence < 1.0) {
        return 1.96;
    }
    quantile_normal((1.0 + confidence) / 2.0)
}

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Calculate the median of a slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Mean absolute percentage error between actuals and fitted values, in percent.
///
/// Pairs with a zero actual are skipped; returns `None` when nothing remains.
pub fn mape(actual: &[f64], fitted: &[f64]) -> Option<f64> {
    let errors: Vec<f64> = actual
        .iter()
        .zip(fitted.iter())
        .filter(|(a, _)| a.abs() > 1e-10)
        .map(|(a, f)| ((a - f) / a).abs())
        .collect();
    if errors.is_empty() {
        None
    } else {
        Some(100.0 * mean(&errors))
    }
}
