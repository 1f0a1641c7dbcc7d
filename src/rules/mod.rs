//! Deterministic rule engine for stockout, expiry and cold-chain risk.
//!
//! Every rule is a closed-form function of its snapshot and the engine's
//! reference date, so the same inputs always produce the same result.
//!
//! # Example
//! ```
//! use chrono::NaiveDate;
//! use vaccine_risk::core::{RiskLevel, StockSnapshot};
//! use vaccine_risk::rules::RuleEngine;
//!
//! let engine = RuleEngine::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
//! let result = engine.stockout_prediction(&StockSnapshot {
//!     current_stock: 150.0,
//!     avg_daily_consumption: 50.0,
//!     historical_data_quality: 1.0,
//!     min_stock_threshold: 100.0,
//! });
//! assert_eq!(result.days_until_event, 3);
//! assert_eq!(result.risk_level, RiskLevel::Critical);
//! ```

mod quality;
pub mod tiers;

pub use quality::{data_quality, seasonality_factor};

use crate::core::{
    ColdChainSnapshot, ExpirySnapshot, HistoricalDataPoint, PredictionResult, StockSnapshot,
};
use chrono::{Duration, NaiveDate, Utc};

/// Floor applied to any rate or total used as a denominator.
pub const MIN_DENOMINATOR: f64 = 0.1;

/// Fixed confidence of expiry predictions.
pub const EXPIRY_CONFIDENCE: f64 = 90.0;
/// Fixed confidence of cold-chain predictions.
pub const COLD_CHAIN_CONFIDENCE: f64 = 85.0;
/// Default projection horizon for cold-chain load.
pub const DEFAULT_COLD_CHAIN_HORIZON_DAYS: u32 = 30;

/// Whole days until a quantity is exhausted at a given rate.
///
/// The rate is floored to [`MIN_DENOMINATOR`] and negative quantities count
/// as zero, so the result is always defined.
pub fn days_of_cover(quantity: f64, daily_rate: f64) -> u32 {
    let rate = if daily_rate.is_finite() {
        daily_rate.max(MIN_DENOMINATOR)
    } else {
        MIN_DENOMINATOR
    };
    let quantity = if quantity.is_finite() { quantity.max(0.0) } else { 0.0 };
    // float-to-int casts saturate
    (quantity / rate).floor() as u32
}

/// Rule-based predictor anchored at a reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleEngine {
    as_of: NaiveDate,
    cold_chain_horizon_days: u32,
}

impl RuleEngine {
    /// Engine whose "today" is `as_of`.
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            cold_chain_horizon_days: DEFAULT_COLD_CHAIN_HORIZON_DAYS,
        }
    }

    /// Engine anchored at the current UTC date.
    pub fn today() -> Self {
        Self::new(Utc::now().date_naive())
    }

    /// Override the cold-chain projection horizon.
    pub fn with_cold_chain_horizon(mut self, days: u32) -> Self {
        self.cold_chain_horizon_days = days;
        self
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    fn date_after(&self, days: u32) -> NaiveDate {
        self.as_of
            .checked_add_signed(Duration::days(i64::from(days)))
            .unwrap_or(NaiveDate::MAX)
    }

    /// Days until stock runs out at the current consumption rate.
    pub fn stockout_prediction(&self, snapshot: &StockSnapshot) -> PredictionResult {
        let days = days_of_cover(snapshot.current_stock, snapshot.avg_daily_consumption);
        let risk_level = tiers::stockout_tier(days);
        let quality = snapshot.historical_data_quality.clamp(0.0, 1.0);
        let confidence = 70.0 + quality * 25.0;
        let below_minimum = snapshot.current_stock < snapshot.min_stock_threshold;

        let text = if days == 0 {
            "Stock exhausted at current consumption".to_string()
        } else {
            format!("Stockout expected in {} days", days)
        };

        PredictionResult::new(text, self.date_after(days), confidence, risk_level, days)
            .with_metric("daysUntilStockout", days)
            .with_metric("currentStock", snapshot.current_stock)
            .with_metric("avgDailyConsumption", snapshot.avg_daily_consumption)
            .with_metric("minStockThreshold", snapshot.min_stock_threshold)
            .with_metric("belowMinimum", below_minimum)
            .with_metric("method", "rule-based")
    }

    /// Share of doses likely to expire unused.
    pub fn expiry_risk(&self, snapshot: &ExpirySnapshot) -> PredictionResult {
        let wastage_risk = if snapshot.total_doses > 0.0 {
            snapshot.expiring_doses / snapshot.total_doses * 100.0
        } else {
            0.0
        };
        let usable = snapshot.days_until_expiry.max(0.0) * snapshot.avg_daily_consumption.max(0.0);
        let potential_wastage = (snapshot.expiring_doses - usable).max(0.0);
        let risk_level = tiers::expiry_tier(wastage_risk, snapshot.days_until_expiry);
        let days = days_of_cover(snapshot.days_until_expiry, 1.0);

        let text = format!(
            "{:.0} doses expire in {} days; {:.0} likely wasted",
            snapshot.expiring_doses, days, potential_wastage
        );

        PredictionResult::new(text, self.date_after(days), EXPIRY_CONFIDENCE, risk_level, days)
            .with_metric("wastageRisk", wastage_risk)
            .with_metric("potentialWastage", potential_wastage)
            .with_metric("expiringDoses", snapshot.expiring_doses)
            .with_metric("daysUntilExpiry", snapshot.days_until_expiry)
            .with_metric("method", "rule-based")
    }

    /// Projected cold-chain load over the horizon, plus temperature state.
    pub fn cold_chain_risk(&self, snapshot: &ColdChainSnapshot) -> PredictionResult {
        let capacity = snapshot.max_capacity.max(MIN_DENOMINATOR);
        let capacity_utilization = snapshot.current_stock / capacity * 100.0;
        let predicted_influx = snapshot.avg_incoming_shipments * snapshot.seasonality_factor;
        let projected_utilization = capacity_utilization + predicted_influx / capacity * 100.0;
        let breach = snapshot.temperature_breach();
        let risk_level =
            tiers::cold_chain_tier(breach, projected_utilization, capacity_utilization);
        let days = self.cold_chain_horizon_days;

        let text = if breach {
            format!(
                "Temperature breach: {:.1}°C above safe maximum",
                snapshot.temperature_deviation()
            )
        } else {
            format!(
                "Cold-chain utilization projected at {:.0}% within {} days",
                projected_utilization, days
            )
        };

        let mut result = PredictionResult::new(
            text,
            self.date_after(days),
            COLD_CHAIN_CONFIDENCE,
            risk_level,
            days,
        )
        .with_metric("capacityUtilization", capacity_utilization)
        .with_metric("projectedUtilization", projected_utilization)
        .with_metric("predictedInflux", predicted_influx)
        .with_metric("temperatureBreach", breach)
        .with_metric("method", "rule-based");
        if let Some(temperature) = snapshot.current_temperature {
            result = result.with_metric("currentTemperature", temperature);
        }
        result
    }

    /// Demand multiplier for the engine's current month.
    pub fn current_seasonality(&self) -> f64 {
        use chrono::Datelike;
        seasonality_factor(self.as_of.month())
    }

    /// Quality score of a history relative to the engine's date.
    pub fn data_quality(&self, history: &[HistoricalDataPoint]) -> f64 {
        data_quality(history, self.as_of)
    }
}
