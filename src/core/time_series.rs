//! Univariate daily time series used to fit the consumption forecaster.

use super::types::TimeSeriesPoint;
use crate::error::{EngineError, Result};
use chrono::{Duration, NaiveDate};

/// An ordered, validated series of observations.
///
/// Dates are strictly increasing; values are finite.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Build a series from points, sorting them by date.
    ///
    /// Fails on empty input, non-finite values or duplicate dates.
    pub fn from_points(points: &[TimeSeriesPoint]) -> Result<Self> {
        if points.is_empty() {
            return Err(EngineError::EmptyData);
        }

        let mut sorted = points.to_vec();
        sorted.sort_by_key(|p| p.date);

        for window in sorted.windows(2) {
            if window[0].date == window[1].date {
                return Err(EngineError::invalid(format!(
                    "duplicate observation for {}",
                    window[0].date
                )));
            }
        }
        if let Some(bad) = sorted.iter().find(|p| !p.value.is_finite()) {
            return Err(EngineError::invalid(format!(
                "non-finite value on {}",
                bad.date
            )));
        }

        Ok(Self {
            dates: sorted.iter().map(|p| p.date).collect(),
            values: sorted.iter().map(|p| p.value).collect(),
        })
    }

    /// Build a daily series starting at `start`.
    pub fn daily(start: NaiveDate, values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(EngineError::EmptyData);
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(EngineError::invalid("non-finite value in series"));
        }
        let dates = (0..values.len())
            .map(|i| start + Duration::days(i as i64))
            .collect();
        Ok(Self { dates, values })
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the series is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }
}
