//! Query filtering and ranking of cached insights.

use super::record::InsightRecord;
use crate::core::RiskLevel;
use serde::{Deserialize, Serialize};

/// Optional constraints on an insight query; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InsightFilter {
    pub risk_level: Option<RiskLevel>,
    /// Matched case-insensitively.
    pub state: Option<String>,
    pub facility_id: Option<String>,
    pub product_id: Option<String>,
}

impl InsightFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_risk_level(mut self, level: RiskLevel) -> Self {
        self.risk_level = Some(level);
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_facility(mut self, facility_id: impl Into<String>) -> Self {
        self.facility_id = Some(facility_id.into());
        self
    }

    pub fn with_product(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    pub fn matches(&self, record: &InsightRecord) -> bool {
        self.risk_level.map_or(true, |l| record.risk_level == l)
            && self
                .state
                .as_deref()
                .map_or(true, |s| record.state.eq_ignore_ascii_case(s))
            && self
                .facility_id
                .as_deref()
                .map_or(true, |id| record.facility_id == id)
            && self
                .product_id
                .as_deref()
                .map_or(true, |id| record.product_id == id)
    }

    /// Matching records, ranked.
    pub fn apply(&self, records: &[InsightRecord]) -> Vec<InsightRecord> {
        let mut out: Vec<InsightRecord> = records
            .iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect();
        rank(&mut out);
        out
    }
}

/// Most severe tier first, then soonest event, then id for a stable order.
pub fn rank(records: &mut [InsightRecord]) {
    records.sort_by(|a, b| {
        a.risk_level
            .cmp(&b.risk_level)
            .then(a.days_until_event.cmp(&b.days_until_event))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Response of an insight query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightPage {
    pub data: Vec<InsightRecord>,
    pub count: usize,
}

impl InsightPage {
    pub fn new(data: Vec<InsightRecord>) -> Self {
        Self {
            count: data.len(),
            data,
        }
    }
}
