//! Threshold scoring used to classify risk when no forest is trained.

use super::{ClassProbabilities, ClassificationFeatures, RiskClassification};
use crate::core::RiskLevel;
use crate::rules::tiers::{
    CURRENT_MEDIUM_PCT, EXPIRY_CRITICAL_PCT, EXPIRY_HIGH_PCT, EXPIRY_MEDIUM_PCT,
    PROJECTED_CRITICAL_PCT, PROJECTED_HIGH_PCT, STOCKOUT_CRITICAL_DAYS, STOCKOUT_HIGH_DAYS,
};

const STOCKOUT_WEIGHT: f64 = 0.4;
const EXPIRY_WEIGHT: f64 = 0.3;
const CAPACITY_WEIGHT: f64 = 0.3;

/// Days of cover at or below which the stockout indicator votes medium.
const STOCKOUT_MEDIUM_DAYS: f64 = 30.0;

fn stockout_vote(days: f64) -> RiskLevel {
    if days <= f64::from(STOCKOUT_CRITICAL_DAYS) {
        RiskLevel::Critical
    } else if days <= f64::from(STOCKOUT_HIGH_DAYS) {
        RiskLevel::High
    } else if days <= STOCKOUT_MEDIUM_DAYS {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

fn expiry_vote(pct: f64) -> RiskLevel {
    if pct > EXPIRY_CRITICAL_PCT {
        RiskLevel::Critical
    } else if pct > EXPIRY_HIGH_PCT {
        RiskLevel::High
    } else if pct > EXPIRY_MEDIUM_PCT {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

fn capacity_vote(pct: f64) -> RiskLevel {
    if pct > PROJECTED_CRITICAL_PCT {
        RiskLevel::Critical
    } else if pct > PROJECTED_HIGH_PCT {
        RiskLevel::High
    } else if pct > CURRENT_MEDIUM_PCT {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Each indicator votes for one tier with a fixed weight; weights are
/// normalized into a distribution.
pub fn fallback_probabilities(features: &ClassificationFeatures) -> ClassProbabilities {
    let mut weights = [0.0; 4];
    weights[stockout_vote(features.days_until_stockout).index()] += STOCKOUT_WEIGHT;
    weights[expiry_vote(features.expiry_risk).index()] += EXPIRY_WEIGHT;
    weights[capacity_vote(features.capacity_utilization).index()] += CAPACITY_WEIGHT;
    ClassProbabilities::from_weights(weights)
}

pub fn classify_fallback(features: &ClassificationFeatures) -> RiskClassification {
    RiskClassification::from_probabilities(fallback_probabilities(features), "rule-based")
}
