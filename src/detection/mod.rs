//! Anomaly detection over consumption and stock value streams.
//!
//! - [`IsolationForest`]: trained ensemble detector
//! - [`outlier`]: modified z-score scoring used when no detector is trained

pub mod isolation_forest;
pub mod outlier;

pub use isolation_forest::{average_path_length, IsolationForest, IsolationForestConfig};
pub use outlier::{fallback_scores, modified_z_scores};

use crate::core::AnomalyRecord;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Default score above which a record is reported as anomalous.
pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 0.5;

/// Common interface for anomaly detectors.
///
/// Fitted once, then only read; object-safe.
pub trait AnomalyDetector {
    /// Fit the detector to a stream of values.
    fn fit(&mut self, values: &[f64]) -> Result<()>;

    /// Anomaly score in `[0, 1]`, higher is more anomalous.
    fn score(&self, value: f64) -> Result<f64>;

    /// Score a batch of values.
    fn score_all(&self, values: &[f64]) -> Result<Vec<f64>> {
        values.iter().map(|&v| self.score(v)).collect()
    }

    fn is_fitted(&self) -> bool;

    fn name(&self) -> &str;
}

/// A record flagged as anomalous, with its score and input position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredAnomaly {
    pub index: usize,
    pub score: f64,
    pub record: AnomalyRecord,
}

/// Result of anomaly detection over a batch of records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyReport {
    /// Records scoring above the threshold, in input order.
    pub anomalies: Vec<ScoredAnomaly>,
    /// Score for every input record.
    pub scores: Vec<f64>,
    pub threshold: f64,
    pub anomaly_count: usize,
    /// Name of the scorer that produced the scores.
    pub method: String,
}

impl AnomalyReport {
    /// Assemble a report from precomputed scores.
    pub fn from_scores(
        data: &[AnomalyRecord],
        scores: Vec<f64>,
        threshold: f64,
        method: impl Into<String>,
    ) -> Self {
        let anomalies: Vec<ScoredAnomaly> = data
            .iter()
            .zip(scores.iter())
            .enumerate()
            .filter(|(_, (_, &score))| score > threshold)
            .map(|(index, (record, &score))| ScoredAnomaly {
                index,
                score,
                record: record.clone(),
            })
            .collect();

        Self {
            anomaly_count: anomalies.len(),
            anomalies,
            scores,
            threshold,
            method: method.into(),
        }
    }

    /// Share of records flagged, in percent.
    pub fn anomaly_percentage(&self) -> f64 {
        if self.scores.is_empty() {
            0.0
        } else {
            100.0 * self.anomaly_count as f64 / self.scores.len() as f64
        }
    }

    /// Check if a specific input index was flagged.
    pub fn is_anomaly(&self, index: usize) -> bool {
        self.anomalies.iter().any(|a| a.index == index)
    }
}

/// Score records with a fitted detector and keep those above `threshold`.
pub fn detect_anomalies<D>(
    detector: &D,
    data: &[AnomalyRecord],
    threshold: f64,
) -> Result<AnomalyReport>
where
    D: AnomalyDetector + ?Sized,
{
    let values: Vec<f64> = data.iter().map(|r| r.value).collect();
    let scores = detector.score_all(&values)?;
    Ok(AnomalyReport::from_scores(
        data,
        scores,
        threshold,
        detector.name(),
    ))
}

/// Score records against their own batch with the modified z-score fallback.
pub fn detect_anomalies_fallback(data: &[AnomalyRecord], threshold: f64) -> AnomalyReport {
    let values: Vec<f64> = data.iter().map(|r| r.value).collect();
    AnomalyReport::from_scores(data, fallback_scores(&values), threshold, "rule-based")
}
