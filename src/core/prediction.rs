//! Prediction outputs: risk tiers, metrics and the `PredictionResult` record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lowest confidence any rule or model result may report.
pub const MIN_CONFIDENCE: f64 = 70.0;
/// Highest confidence any rule or model result may report.
pub const MAX_CONFIDENCE: f64 = 95.0;

/// Risk tier assigned to a prediction.
///
/// Variants are declared from most to least severe, so the derived ordering
/// sorts `Critical` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl RiskLevel {
    /// All tiers, most severe first. Also the class order used by the classifier.
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Critical,
        RiskLevel::High,
        RiskLevel::Medium,
        RiskLevel::Low,
    ];

    /// Position of this tier in [`RiskLevel::ALL`].
    pub fn index(self) -> usize {
        match self {
            RiskLevel::Critical => 0,
            RiskLevel::High => 1,
            RiskLevel::Medium => 2,
            RiskLevel::Low => 3,
        }
    }

    /// Tier at a class index, if in range.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// The more severe of two tiers.
    pub fn most_severe(self, other: RiskLevel) -> RiskLevel {
        self.min(other)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Critical => "CRITICAL",
            RiskLevel::High => "HIGH",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::Low => "LOW",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of event an insight predicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PredictionType {
    Stockout,
    Expiry,
    ColdChain,
    Aggregated,
}

impl PredictionType {
    pub fn as_str(self) -> &'static str {
        match self {
            PredictionType::Stockout => "STOCKOUT",
            PredictionType::Expiry => "EXPIRY",
            PredictionType::ColdChain => "COLD_CHAIN",
            PredictionType::Aggregated => "AGGREGATED",
        }
    }
}

impl fmt::Display for PredictionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric attached to a prediction: either numeric or free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

impl MetricValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(v) => Some(*v),
            MetricValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetricValue::Number(_) => None,
            MetricValue::Text(s) => Some(s),
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Number(value)
    }
}

impl From<u32> for MetricValue {
    fn from(value: u32) -> Self {
        MetricValue::Number(f64::from(value))
    }
}

impl From<bool> for MetricValue {
    fn from(value: bool) -> Self {
        MetricValue::Text(value.to_string())
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        MetricValue::Text(value.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(value: String) -> Self {
        MetricValue::Text(value)
    }
}

impl From<RiskLevel> for MetricValue {
    fn from(value: RiskLevel) -> Self {
        MetricValue::Text(value.as_str().to_string())
    }
}

/// Named metrics, kept sorted by key.
pub type Metrics = BTreeMap<String, MetricValue>;

/// Clamp a raw confidence into the reportable band.
pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        return MIN_CONFIDENCE;
    }
    confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

/// Output of every rule or model prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub prediction_text: String,
    pub expected_date: NaiveDate,
    /// Always within `[70, 95]`.
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub days_until_event: u32,
    pub metrics: Metrics,
}

impl PredictionResult {
    /// Create a result; the confidence is clamped into `[70, 95]`.
    pub fn new(
        prediction_text: impl Into<String>,
        expected_date: NaiveDate,
        confidence: f64,
        risk_level: RiskLevel,
        days_until_event: u32,
    ) -> Self {
        Self {
            prediction_text: prediction_text.into(),
            expected_date,
            confidence: clamp_confidence(confidence),
            risk_level,
            days_until_event,
            metrics: Metrics::new(),
        }
    }

    /// Attach a metric.
    pub fn with_metric(mut self, key: &str, value: impl Into<MetricValue>) -> Self {
        self.metrics.insert(key.to_string(), value.into());
        self
    }

    /// Numeric metric by key.
    pub fn metric(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).and_then(MetricValue::as_f64)
    }
}
