//! # vaccine-risk
//!
//! Supply-chain risk prediction for vaccine inventory.
//!
//! Produces ranked stockout, expiry-wastage and cold-chain insights per
//! facility and product from a deterministic rule engine, optionally
//! refined by three lightweight models: a Holt-Winters consumption
//! forecaster, an isolation-forest anomaly detector and a random-forest
//! risk classifier. Untrained models fall back to rule-based scoring.

pub mod classification;
pub mod config;
pub mod core;
pub mod detection;
pub mod error;
pub mod insights;
pub mod models;
pub mod rules;
pub mod utils;

pub use error::{EngineError, Result};

pub mod prelude {
    pub use crate::classification::{
        ClassificationFeatures, LabeledSample, RandomForest, RandomForestConfig, RiskClassifier,
    };
    pub use crate::config::EngineConfig;
    pub use crate::core::{
        AnomalyRecord, ColdChainSnapshot, ExpirySnapshot, HistoricalDataPoint, PredictionResult,
        PredictionType, RiskLevel, StockSnapshot, TimeSeries,
    };
    pub use crate::detection::{AnomalyDetector, IsolationForest, IsolationForestConfig};
    pub use crate::error::{EngineError, Result};
    pub use crate::insights::{
        Facility, InsightEngine, InsightFilter, InventorySource, Product, StaticInventory,
        StockRecord,
    };
    pub use crate::models::{EtsConfig, Forecaster, HoltWinters, ModelKind, ModelRegistry};
    pub use crate::rules::RuleEngine;
}
