//! Risk-tier classification from engineered supply features.
//!
//! - [`RandomForest`]: bagged Gini trees with majority voting
//! - [`fallback`]: weighted threshold scoring used when no forest is trained

pub mod fallback;
pub mod features;
pub mod forest;
pub mod tree;

pub use fallback::{classify_fallback, fallback_probabilities};
pub use features::{ClassificationFeatures, FeatureName, FEATURE_COUNT};
pub use forest::{RandomForest, RandomForestConfig};
pub use tree::{gini_impurity, information_gain, DecisionTree};

use crate::core::RiskLevel;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A training example: features plus the observed tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabeledSample {
    pub features: ClassificationFeatures,
    pub label: RiskLevel,
}

impl LabeledSample {
    pub fn new(features: ClassificationFeatures, label: RiskLevel) -> Self {
        Self { features, label }
    }
}

/// Probability per risk tier, indexed in [`RiskLevel::ALL`] order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClassProbabilities([f64; 4]);

impl ClassProbabilities {
    /// Normalize non-negative weights to sum to one. All-zero weights stay zero.
    pub fn from_weights(weights: [f64; 4]) -> Self {
        let total: f64 = weights.iter().map(|w| w.max(0.0)).sum();
        if total <= 0.0 {
            return Self([0.0; 4]);
        }
        Self(weights.map(|w| w.max(0.0) / total))
    }

    pub fn get(&self, level: RiskLevel) -> f64 {
        self.0[level.index()]
    }

    pub fn as_array(&self) -> [f64; 4] {
        self.0
    }

    /// Most probable tier; ties go to the more severe one.
    pub fn most_likely(&self) -> RiskLevel {
        let mut best = 0;
        for (i, &p) in self.0.iter().enumerate() {
            if p > self.0[best] {
                best = i;
            }
        }
        RiskLevel::ALL[best]
    }

    /// Margin between the top two probabilities, as a percentage.
    pub fn confidence(&self) -> f64 {
        let mut sorted = self.0;
        sorted.sort_by(|a, b| b.total_cmp(a));
        (sorted[0] - sorted[1]) * 100.0
    }

    pub fn to_map(&self) -> BTreeMap<RiskLevel, f64> {
        RiskLevel::ALL.iter().map(|&l| (l, self.get(l))).collect()
    }
}

/// Output of a classification: predicted tier, margin confidence and the
/// full distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskClassification {
    pub risk_level: RiskLevel,
    /// Top-1 minus top-2 probability, in percent.
    pub confidence: f64,
    pub probabilities: BTreeMap<RiskLevel, f64>,
    pub method: String,
}

impl RiskClassification {
    pub fn from_probabilities(probabilities: ClassProbabilities, method: impl Into<String>) -> Self {
        Self {
            risk_level: probabilities.most_likely(),
            confidence: probabilities.confidence(),
            probabilities: probabilities.to_map(),
            method: method.into(),
        }
    }
}

/// Common interface for risk classifiers.
pub trait RiskClassifier {
    /// Fit on labeled samples.
    fn fit(&mut self, samples: &[LabeledSample]) -> Result<()>;

    /// Probability of each tier for one feature vector.
    fn predict_proba(&self, features: &ClassificationFeatures) -> Result<ClassProbabilities>;

    /// Most probable tier.
    fn predict(&self, features: &ClassificationFeatures) -> Result<RiskLevel> {
        Ok(self.predict_proba(features)?.most_likely())
    }

    /// Tier, confidence and distribution in one record.
    fn classify(&self, features: &ClassificationFeatures) -> Result<RiskClassification> {
        let probabilities = self.predict_proba(features)?;
        Ok(RiskClassification::from_probabilities(
            probabilities,
            self.name(),
        ))
    }

    fn is_fitted(&self) -> bool;

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn weights_normalize() {
        let p = ClassProbabilities::from_weights([2.0, 1.0, 1.0, 0.0]);
        assert_relative_eq!(p.as_array().iter().sum::<f64>(), 1.0);
        assert_relative_eq!(p.get(RiskLevel::Critical), 0.5);
        assert_eq!(p.most_likely(), RiskLevel::Critical);
        assert_relative_eq!(p.confidence(), 25.0);
    }

    #[test]
    fn zero_weights_stay_zero() {
        let p = ClassProbabilities::from_weights([0.0; 4]);
        assert_eq!(p.as_array(), [0.0; 4]);
        assert_eq!(p.confidence(), 0.0);
    }

    #[test]
    fn tie_prefers_more_severe() {
        let p = ClassProbabilities::from_weights([0.0, 0.0, 1.0, 1.0]);
        assert_eq!(p.most_likely(), RiskLevel::Medium);
        assert_eq!(p.confidence(), 0.0);
    }

    #[test]
    fn classification_serializes_tier_keys() {
        let p = ClassProbabilities::from_weights([0.0, 0.0, 0.0, 1.0]);
        let result = RiskClassification::from_probabilities(p, "test");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["riskLevel"], "LOW");
        assert_eq!(json["probabilities"]["LOW"], 1.0);
        assert_eq!(json["confidence"], 100.0);
    }
}
