//! Forecast result structure for holding predictions and their bands.

use serde::{Deserialize, Serialize};

/// Symmetric prediction band around one forecast step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionInterval {
    pub lower: f64,
    pub upper: f64,
}

impl PredictionInterval {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Point forecasts with optional prediction intervals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    point: Vec<f64>,
    intervals: Option<Vec<PredictionInterval>>,
}

impl Forecast {
    /// Create an empty forecast.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a forecast from point predictions.
    pub fn from_values(values: Vec<f64>) -> Self {
        Self {
            point: values,
            intervals: None,
        }
    }

    /// Attach prediction intervals (one per step).
    pub fn with_intervals(mut self, intervals: Vec<PredictionInterval>) -> Self {
        self.intervals = Some(intervals);
        self
    }

    /// Number of forecast steps.
    pub fn horizon(&self) -> usize {
        self.point.len()
    }

    pub fn is_empty(&self) -> bool {
        self.point.is_empty()
    }

    /// Point predictions.
    pub fn values(&self) -> &[f64] {
        &self.point
    }

    pub fn intervals(&self) -> Option<&[PredictionInterval]> {
        self.intervals.as_deref()
    }

    pub fn has_intervals(&self) -> bool {
        self.intervals.is_some()
    }

    pub fn into_parts(self) -> (Vec<f64>, Option<Vec<PredictionInterval>>) {
        (self.point, self.intervals)
    }
}
