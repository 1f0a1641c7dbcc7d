//! Error types for the vaccine-risk engine.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while fitting models or producing insights.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter or input value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Model has not been trained yet.
    #[error("model must be trained before prediction")]
    FitRequired,

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A facility, product or record could not be found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The requested model kind has no implementation.
    #[error("model kind not implemented: {0}")]
    ModelNotImplemented(String),

    /// Configuration could not be loaded or failed validation.
    #[error("configuration error: {0}")]
    Config(String),

    /// Computation error (e.g., numerical issues).
    #[error("computation error: {0}")]
    ComputationError(String),
}

impl EngineError {
    /// Create an invalid-parameter error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
