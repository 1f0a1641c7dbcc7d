//! Ranked insight records served to callers.

use super::source::{Facility, Product};
use crate::core::{Metrics, PredictionResult, PredictionType, RiskLevel};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Product id used by facility-wide insights such as cold-chain capacity.
pub const ALL_PRODUCTS_ID: &str = "all";
pub const ALL_PRODUCTS_NAME: &str = "All products";

/// One prediction about a facility/product pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightRecord {
    /// `"{TYPE}:{facility}:{product}"`; stable across refreshes.
    pub id: String,
    pub facility_id: String,
    pub facility_name: String,
    pub state: String,
    pub lga: String,
    pub product_id: String,
    pub product_name: String,
    pub prediction_type: PredictionType,
    pub prediction: String,
    pub expected_date: NaiveDate,
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub days_until_event: u32,
    pub metrics: Metrics,
}

impl InsightRecord {
    pub fn new(
        prediction_type: PredictionType,
        facility: &Facility,
        product: Option<&Product>,
        result: PredictionResult,
    ) -> Self {
        let (product_id, product_name) = match product {
            Some(p) => (p.id.clone(), p.name.clone()),
            None => (ALL_PRODUCTS_ID.to_string(), ALL_PRODUCTS_NAME.to_string()),
        };
        Self {
            id: format!("{}:{}:{}", prediction_type.as_str(), facility.id, product_id),
            facility_id: facility.id.clone(),
            facility_name: facility.name.clone(),
            state: facility.state.clone(),
            lga: facility.lga.clone(),
            product_id,
            product_name,
            prediction_type,
            prediction: result.prediction_text,
            expected_date: result.expected_date,
            confidence: result.confidence,
            risk_level: result.risk_level,
            days_until_event: result.days_until_event,
            metrics: result.metrics,
        }
    }

    pub fn metric(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).and_then(|v| v.as_f64())
    }
}
