//! Forecaster trait defining the common interface for consumption models.

use crate::core::{Forecast, PredictionInterval, TimeSeries};
use crate::error::Result;
use crate::utils::stats::z_score;

/// Standard error assumed for every forecast step, as a share of the forecast.
pub const FORECAST_RELATIVE_ERROR: f64 = 0.15;

/// Common interface for consumption forecasters.
///
/// A forecaster is fitted once and only read afterwards; this trait is
/// object-safe and can be stored as `Arc<dyn Forecaster + Send + Sync>`.
pub trait Forecaster {
    /// Fit the model to the time series data.
    fn fit(&mut self, series: &TimeSeries) -> Result<()>;

    /// Generate point forecasts for the next `horizon` steps.
    fn forecast(&self, horizon: usize) -> Result<Forecast>;

    /// Generate forecasts with symmetric prediction intervals.
    fn forecast_with_intervals(&self, horizon: usize, confidence: f64) -> Result<Forecast> {
        let forecast = self.forecast(horizon)?;
        let intervals = prediction_intervals(forecast.values(), confidence);
        Ok(forecast.with_intervals(intervals))
    }

    /// In-sample one-step-ahead predictions.
    fn fitted_values(&self) -> Option<&[f64]>;

    /// Confidence score earned by the fit, already clamped to `[70, 95]`.
    fn fit_confidence(&self) -> Option<f64> {
        None
    }

    /// Get the model name.
    fn name(&self) -> &str;

    /// Check if the model has been fitted.
    fn is_fitted(&self) -> bool {
        self.fitted_values().is_some()
    }
}

/// Prediction bands from an assumed 15% standard error, floored at zero.
///
/// # Example
/// ```
/// use vaccine_risk::models::prediction_intervals;
///
/// let bands = prediction_intervals(&[100.0], 0.95);
/// assert!((bands[0].upper - 129.4).abs() < 1e-9);
/// assert!((bands[0].lower - 70.6).abs() < 1e-9);
/// ```
pub fn prediction_intervals(forecasts: &[f64], confidence: f64) -> Vec<PredictionInterval> {
    let z = z_score(confidence);
    forecasts
        .iter()
        .map(|&f| {
            let margin = z * FORECAST_RELATIVE_ERROR * f.abs();
            PredictionInterval {
                lower: (f - margin).max(0.0),
                upper: f + margin,
            }
        })
        .collect()
}
