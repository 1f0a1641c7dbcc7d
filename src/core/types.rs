//! Input records: observations, history and point-in-time snapshots.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single observation in a regular-cadence series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// One day of inventory history for a facility/product pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalDataPoint {
    pub date: NaiveDate,
    pub consumption: f64,
    pub stock: f64,
    pub wastage: f64,
}

impl HistoricalDataPoint {
    pub fn new(date: NaiveDate, consumption: f64, stock: f64, wastage: f64) -> Self {
        Self {
            date,
            consumption,
            stock,
            wastage,
        }
    }

    /// True when every quantity is finite and non-negative.
    pub fn is_valid(&self) -> bool {
        [self.consumption, self.stock, self.wastage]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// Mean daily consumption over the most recent `window` points.
///
/// Points are taken in date order; returns 0 for an empty history or a zero
/// window.
pub fn avg_daily_consumption(history: &[HistoricalDataPoint], window: usize) -> f64 {
    if history.is_empty() || window == 0 {
        return 0.0;
    }
    let mut recent: Vec<&HistoricalDataPoint> = history.iter().collect();
    recent.sort_by_key(|p| p.date);
    let start = recent.len().saturating_sub(window);
    let slice = &recent[start..];
    slice.iter().map(|p| p.consumption.max(0.0)).sum::<f64>() / slice.len() as f64
}

/// Point-in-time stock position used for stockout prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSnapshot {
    pub current_stock: f64,
    pub avg_daily_consumption: f64,
    /// Quality of the history behind `avg_daily_consumption`, in `[0, 1]`.
    pub historical_data_quality: f64,
    pub min_stock_threshold: f64,
}

/// Doses approaching expiry at a facility.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpirySnapshot {
    pub total_doses: f64,
    pub expiring_doses: f64,
    pub days_until_expiry: f64,
    pub avg_daily_consumption: f64,
}

/// Cold-chain capacity and temperature state of a facility.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColdChainSnapshot {
    pub current_stock: f64,
    pub max_capacity: f64,
    pub avg_incoming_shipments: f64,
    pub seasonality_factor: f64,
    pub current_temperature: Option<f64>,
    pub max_safe_temperature: f64,
}

impl ColdChainSnapshot {
    /// Whether the measured temperature exceeds the safe bound.
    pub fn temperature_breach(&self) -> bool {
        self.current_temperature
            .is_some_and(|t| t > self.max_safe_temperature)
    }

    /// Degrees above the safe bound, 0 when within bounds or unmeasured.
    pub fn temperature_deviation(&self) -> f64 {
        self.current_temperature
            .map(|t| (t - self.max_safe_temperature).max(0.0))
            .unwrap_or(0.0)
    }
}

/// A value submitted to the anomaly detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl AnomalyRecord {
    pub fn new(value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            value,
            timestamp,
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}
