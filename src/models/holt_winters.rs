//! Holt-Winters consumption forecaster.
//!
//! Triple exponential smoothing with multiplicative seasonality, used to
//! project daily consumption once enough history exists.

use crate::core::{clamp_confidence, Forecast, TimeSeries};
use crate::error::{EngineError, Result};
use crate::models::Forecaster;
use crate::utils::stats::mape;
use serde::{Deserialize, Serialize};

/// Smoothing coefficients and seasonal period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtsConfig {
    /// Level smoothing (0 < alpha <= 1).
    pub alpha: f64,
    /// Trend smoothing (0 < beta <= 1).
    pub beta: f64,
    /// Seasonal smoothing (0 < gamma <= 1).
    pub gamma: f64,
    /// Seasonal cycle length in observations.
    pub period: usize,
}

impl Default for EtsConfig {
    fn default() -> Self {
        Self {
            alpha: 0.3,
            beta: 0.1,
            gamma: 0.1,
            period: 7,
        }
    }
}

impl EtsConfig {
    /// Set the smoothing coefficients.
    pub fn with_smoothing(mut self, alpha: f64, beta: f64, gamma: f64) -> Self {
        self.alpha = alpha;
        self.beta = beta;
        self.gamma = gamma;
        self
    }

    /// Set the seasonal period.
    pub fn with_period(mut self, period: usize) -> Self {
        self.period = period;
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("alpha", self.alpha), ("beta", self.beta), ("gamma", self.gamma)] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(EngineError::invalid(format!(
                    "{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.period == 0 {
            return Err(EngineError::invalid("seasonal period must be positive"));
        }
        Ok(())
    }
}

/// Holt-Winters forecaster.
///
/// - Level: `l_t = α(y_t / s_{t-m}) + (1-α)(l_{t-1} + b_{t-1})`
/// - Trend: `b_t = β(l_t - l_{t-1}) + (1-β)b_{t-1}`
/// - Seasonal: `s_t = γ(y_t / l_t) + (1-γ)s_{t-m}`
/// - Forecast: `ŷ_{n+h} = max(0, (l_n + h*b_n) * s_{n-1+h mod m})`
#[derive(Debug, Clone)]
pub struct HoltWinters {
    config: EtsConfig,
    level: Option<f64>,
    trend: Option<f64>,
    seasonals: Option<Vec<f64>>,
    fitted: Option<Vec<f64>>,
    /// In-sample MAPE after the first season.
    mape: Option<f64>,
    n: usize,
}

impl HoltWinters {
    /// Create an unfitted model.
    pub fn new(config: EtsConfig) -> Self {
        Self {
            config,
            level: None,
            trend: None,
            seasonals: None,
            fitted: None,
            mape: None,
            n: 0,
        }
    }

    pub fn config(&self) -> &EtsConfig {
        &self.config
    }

    /// Get the seasonal period.
    pub fn period(&self) -> usize {
        self.config.period
    }

    /// Get the current level.
    pub fn level(&self) -> Option<f64> {
        self.level
    }

    /// Get the current trend.
    pub fn trend(&self) -> Option<f64> {
        self.trend
    }

    /// Get the seasonal factors.
    pub fn seasonals(&self) -> Option<&[f64]> {
        self.seasonals.as_deref()
    }

    /// In-sample mean absolute percentage error.
    pub fn mape(&self) -> Option<f64> {
        self.mape
    }

    /// Level from the first observation, trend from the first difference,
    /// seasonal factors as each point's ratio to the first window's mean.
    fn initialize_state(values: &[f64], period: usize) -> (f64, f64, Vec<f64>) {
        let level = values[0];
        let trend = values[1] - values[0];

        let window = &values[..period];
        let window_mean = window.iter().sum::<f64>() / period as f64;
        let seasonals = window
            .iter()
            .map(|y| {
                if window_mean.abs() > 1e-10 {
                    y / window_mean
                } else {
                    1.0
                }
            })
            .collect();

        (level, trend, seasonals)
    }
}

impl Default for HoltWinters {
    fn default() -> Self {
        Self::new(EtsConfig::default())
    }
}

impl Forecaster for HoltWinters {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        self.config.validate()?;
        let values = series.values();
        let period = self.config.period;
        let needed = (2 * period).max(2);
        if values.len() < needed {
            return Err(EngineError::InsufficientData {
                needed,
                got: values.len(),
            });
        }

        let EtsConfig {
            alpha, beta, gamma, ..
        } = self.config;
        let (mut level, mut trend, mut seasonals) = Self::initialize_state(values, period);

        let mut fitted = Vec::with_capacity(values.len());
        fitted.push(values[0]);

        for (t, &y) in values.iter().enumerate().skip(1) {
            let idx = t % period;
            let s = seasonals[idx];

            fitted.push((level + trend) * s);

            let level_prev = level;
            let deseasonalized = if s.abs() > 1e-10 { y / s } else { y };
            level = alpha * deseasonalized + (1.0 - alpha) * (level_prev + trend);
            trend = beta * (level - level_prev) + (1.0 - beta) * trend;
            if level.abs() > 1e-10 {
                seasonals[idx] = gamma * (y / level) + (1.0 - gamma) * s;
            }
        }

        if !level.is_finite() || !trend.is_finite() {
            return Err(EngineError::ComputationError(
                "smoothing state diverged".to_string(),
            ));
        }

        self.mape = mape(&values[period..], &fitted[period..]);
        self.level = Some(level);
        self.trend = Some(trend);
        self.seasonals = Some(seasonals);
        self.fitted = Some(fitted);
        self.n = values.len();

        Ok(())
    }

    fn forecast(&self, horizon: usize) -> Result<Forecast> {
        let level = self.level.ok_or(EngineError::FitRequired)?;
        let trend = self.trend.ok_or(EngineError::FitRequired)?;
        let seasonals = self.seasonals.as_ref().ok_or(EngineError::FitRequired)?;
        let period = self.config.period;
        let last_index = self.n - 1;

        let predictions = (1..=horizon)
            .map(|h| {
                let s = seasonals[(last_index + h) % period];
                ((level + h as f64 * trend) * s).max(0.0)
            })
            .collect();

        Ok(Forecast::from_values(predictions))
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn fit_confidence(&self) -> Option<f64> {
        self.mape.map(|m| clamp_confidence(100.0 - m))
    }

    fn name(&self) -> &str {
        "HoltWinters(multiplicative)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn series(values: Vec<f64>) -> TimeSeries {
        TimeSeries::daily(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), values).unwrap()
    }

    fn weekly_pattern(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let t = i as f64;
                100.0 * (1.0 + 0.2 * (2.0 * std::f64::consts::PI * t / 7.0).sin())
            })
            .collect()
    }

    #[test]
    fn hw_reproduces_linear_trend() {
        let values: Vec<f64> = (0..120).map(|t| 100.0 + 2.0 * t as f64).collect();
        let mut model = HoltWinters::new(EtsConfig::default().with_smoothing(0.3, 0.1, 0.5));
        model.fit(&series(values)).unwrap();

        let forecast = model.forecast(14).unwrap();
        for (h, &pred) in forecast.values().iter().enumerate() {
            let expected = 100.0 + 2.0 * (119 + h + 1) as f64;
            assert_relative_eq!(pred, expected, max_relative = 0.01);
        }
        assert_relative_eq!(model.trend().unwrap(), 2.0, max_relative = 0.05);
    }

    #[test]
    fn hw_flat_series_stays_flat() {
        let mut model = HoltWinters::default();
        model.fit(&series(vec![50.0; 28])).unwrap();
        let forecast = model.forecast(7).unwrap();
        for &v in forecast.values() {
            assert_relative_eq!(v, 50.0, epsilon = 1e-9);
        }
        assert_relative_eq!(model.fit_confidence().unwrap(), 95.0);
    }

    #[test]
    fn hw_captures_weekly_seasonality() {
        let values = weekly_pattern(70);
        let mut model = HoltWinters::default();
        model.fit(&series(values)).unwrap();

        let preds = model.forecast(7).unwrap();
        let expected = weekly_pattern(77);
        for h in 0..7 {
            assert_relative_eq!(preds.values()[h], expected[70 + h], max_relative = 0.02);
        }
    }

    #[test]
    fn hw_insufficient_data() {
        let mut model = HoltWinters::default();
        let result = model.fit(&series(vec![10.0; 13]));
        assert_eq!(
            result,
            Err(EngineError::InsufficientData {
                needed: 14,
                got: 13
            })
        );
        assert!(!model.is_fitted());
    }

    #[test]
    fn hw_requires_fit_before_forecast() {
        let model = HoltWinters::default();
        assert_eq!(model.forecast(3), Err(EngineError::FitRequired));
        assert!(model.forecast_with_intervals(3, 0.95).is_err());
    }

    #[test]
    fn hw_forecasts_never_negative() {
        let values: Vec<f64> = (0..28).map(|t| 200.0 - 7.0 * t as f64).collect();
        let mut model = HoltWinters::new(EtsConfig::default().with_smoothing(0.8, 0.8, 0.1));
        model.fit(&series(values)).unwrap();
        let forecast = model.forecast(60).unwrap();
        assert!(forecast.values().iter().all(|&v| v >= 0.0));
        assert_eq!(*forecast.values().last().unwrap(), 0.0);
    }

    #[test]
    fn hw_zero_horizon() {
        let mut model = HoltWinters::default();
        model.fit(&series(weekly_pattern(21))).unwrap();
        assert_eq!(model.forecast(0).unwrap().horizon(), 0);
    }

    #[test]
    fn hw_intervals_bracket_forecast() {
        let mut model = HoltWinters::default();
        model.fit(&series(weekly_pattern(28))).unwrap();
        let forecast = model.forecast_with_intervals(7, 0.95).unwrap();
        let intervals = forecast.intervals().unwrap();
        for (band, &pred) in intervals.iter().zip(forecast.values()) {
            assert!(band.lower <= pred && pred <= band.upper);
            assert_relative_eq!(band.upper - pred, 1.96 * 0.15 * pred, epsilon = 1e-9);
        }
    }

    #[test]
    fn hw_rejects_invalid_config() {
        let mut model = HoltWinters::new(EtsConfig::default().with_smoothing(0.0, 0.1, 0.1));
        assert!(matches!(
            model.fit(&series(vec![1.0; 30])),
            Err(EngineError::InvalidParameter(_))
        ));
        let mut model = HoltWinters::new(EtsConfig::default().with_period(0));
        assert!(model.fit(&series(vec![1.0; 30])).is_err());
    }

    #[test]
    fn hw_fitted_values_cover_series() {
        let mut model = HoltWinters::default();
        model.fit(&series(weekly_pattern(21))).unwrap();
        assert_eq!(model.fitted_values().unwrap().len(), 21);
        assert_eq!(model.seasonals().unwrap().len(), 7);
        assert_eq!(model.name(), "HoltWinters(multiplicative)");
    }
}
