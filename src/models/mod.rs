//! Consumption forecasting models and the trained-model registry.

mod traits;

pub mod holt_winters;
pub mod registry;

pub use holt_winters::{EtsConfig, HoltWinters};
pub use registry::{
    ModelKind, ModelRegistry, ModelStatus, Registered, SharedClassifier, SharedDetector,
    SharedForecaster,
};
pub use traits::{prediction_intervals, Forecaster, FORECAST_RELATIVE_ERROR};
