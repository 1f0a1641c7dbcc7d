//! Fixed-shape feature vector for risk classification.

use crate::core::{ColdChainSnapshot, ExpirySnapshot, StockSnapshot};
use crate::rules::{days_of_cover, MIN_DENOMINATOR};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of classification features.
pub const FEATURE_COUNT: usize = 8;

/// Name of a classification feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeatureName {
    CurrentStock,
    AvgDailyConsumption,
    DaysUntilStockout,
    ExpiryRisk,
    CapacityUtilization,
    TemperatureDeviation,
    DataQuality,
    SeasonalityFactor,
}

impl FeatureName {
    pub const ALL: [FeatureName; FEATURE_COUNT] = [
        FeatureName::CurrentStock,
        FeatureName::AvgDailyConsumption,
        FeatureName::DaysUntilStockout,
        FeatureName::ExpiryRisk,
        FeatureName::CapacityUtilization,
        FeatureName::TemperatureDeviation,
        FeatureName::DataQuality,
        FeatureName::SeasonalityFactor,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FeatureName::CurrentStock => "currentStock",
            FeatureName::AvgDailyConsumption => "avgDailyConsumption",
            FeatureName::DaysUntilStockout => "daysUntilStockout",
            FeatureName::ExpiryRisk => "expiryRisk",
            FeatureName::CapacityUtilization => "capacityUtilization",
            FeatureName::TemperatureDeviation => "temperatureDeviation",
            FeatureName::DataQuality => "dataQuality",
            FeatureName::SeasonalityFactor => "seasonalityFactor",
        }
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engineered features describing one facility/product position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationFeatures {
    pub current_stock: f64,
    pub avg_daily_consumption: f64,
    pub days_until_stockout: f64,
    /// Expiring share of doses, in percent.
    pub expiry_risk: f64,
    /// Cold-chain utilization, in percent.
    pub capacity_utilization: f64,
    /// Degrees above the safe storage maximum.
    pub temperature_deviation: f64,
    pub data_quality: f64,
    pub seasonality_factor: f64,
}

impl ClassificationFeatures {
    /// Value of a feature by name.
    pub fn get(&self, name: FeatureName) -> f64 {
        match name {
            FeatureName::CurrentStock => self.current_stock,
            FeatureName::AvgDailyConsumption => self.avg_daily_consumption,
            FeatureName::DaysUntilStockout => self.days_until_stockout,
            FeatureName::ExpiryRisk => self.expiry_risk,
            FeatureName::CapacityUtilization => self.capacity_utilization,
            FeatureName::TemperatureDeviation => self.temperature_deviation,
            FeatureName::DataQuality => self.data_quality,
            FeatureName::SeasonalityFactor => self.seasonality_factor,
        }
    }

    /// Derive features from the snapshots the rule engine consumes.
    pub fn from_snapshots(
        stock: &StockSnapshot,
        expiry: Option<&ExpirySnapshot>,
        cold_chain: &ColdChainSnapshot,
    ) -> Self {
        let expiry_risk = expiry
            .filter(|e| e.total_doses > 0.0)
            .map(|e| e.expiring_doses / e.total_doses * 100.0)
            .unwrap_or(0.0);

        Self {
            current_stock: stock.current_stock,
            avg_daily_consumption: stock.avg_daily_consumption,
            days_until_stockout: f64::from(days_of_cover(
                stock.current_stock,
                stock.avg_daily_consumption,
            )),
            expiry_risk,
            capacity_utilization: cold_chain.current_stock
                / cold_chain.max_capacity.max(MIN_DENOMINATOR)
                * 100.0,
            temperature_deviation: cold_chain.temperature_deviation(),
            data_quality: stock.historical_data_quality,
            seasonality_factor: cold_chain.seasonality_factor,
        }
    }
}
