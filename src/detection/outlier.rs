//! Rule-based anomaly scoring used when no isolation forest is trained.
//!
//! Scores each value by its modified z-score (median and MAD of the batch) and
//! maps it into `[0, 1]` so it is comparable with isolation-forest scores.

use crate::utils::stats::median;

/// Modified z-score that maps to an anomaly score of exactly 0.5.
pub const MODIFIED_Z_REFERENCE: f64 = 3.5;

/// Compute modified z-scores using MAD (median absolute deviation).
///
/// Returns all zeros for fewer than two points or a zero MAD.
pub fn modified_z_scores(series: &[f64]) -> Vec<f64> {
    let n = series.len();
    if n < 2 {
        return vec![0.0; n];
    }

    let finite: Vec<f64> = series.iter().filter(|x| x.is_finite()).copied().collect();
    if finite.is_empty() {
        return vec![0.0; n];
    }
    let center = median(&finite);
    let abs_deviations: Vec<f64> = finite.iter().map(|x| (x - center).abs()).collect();
    let mad = median(&abs_deviations);

    // 0.6745 is the 0.75 quantile of the standard normal
    let scaled_mad = mad / 0.6745;
    if scaled_mad < 1e-10 {
        return vec![0.0; n];
    }

    series
        .iter()
        .map(|x| {
            if x.is_finite() {
                ((x - center) / scaled_mad).abs()
            } else {
                0.0
            }
        })
        .collect()
}

/// Anomaly scores in `[0, 1)`: `1 - 2^(-z / 3.5)`.
pub fn fallback_scores(series: &[f64]) -> Vec<f64> {
    modified_z_scores(series)
        .into_iter()
        .map(|z| 1.0 - 2.0_f64.powf(-z / MODIFIED_Z_REFERENCE))
        .collect()
}
