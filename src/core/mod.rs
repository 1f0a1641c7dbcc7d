//! Core data structures shared by the rule engine, models and orchestrator.

mod forecast;
mod prediction;
mod time_series;
mod types;

pub use forecast::{Forecast, PredictionInterval};
pub use prediction::{
    clamp_confidence, MetricValue, Metrics, PredictionResult, PredictionType, RiskLevel,
    MAX_CONFIDENCE, MIN_CONFIDENCE,
};
pub use time_series::TimeSeries;
pub use types::{
    avg_daily_consumption, AnomalyRecord, ColdChainSnapshot, ExpirySnapshot,
    HistoricalDataPoint, StockSnapshot, TimeSeriesPoint,
};
