//! Threshold tables mapping rule quantities to risk tiers.

use crate::core::RiskLevel;

/// Days of cover at or below which a stockout is critical.
pub const STOCKOUT_CRITICAL_DAYS: u32 = 7;
/// Days of cover at or below which a stockout is high risk.
pub const STOCKOUT_HIGH_DAYS: u32 = 14;

/// Wastage percentages for the expiry tiers.
pub const EXPIRY_CRITICAL_PCT: f64 = 20.0;
pub const EXPIRY_HIGH_PCT: f64 = 10.0;
pub const EXPIRY_MEDIUM_PCT: f64 = 5.0;
/// Days to expiry for the expiry tiers.
pub const EXPIRY_CRITICAL_DAYS: f64 = 7.0;
pub const EXPIRY_HIGH_DAYS: f64 = 14.0;

/// Utilization percentages for the cold-chain tiers.
pub const PROJECTED_CRITICAL_PCT: f64 = 90.0;
pub const PROJECTED_HIGH_PCT: f64 = 80.0;
pub const CURRENT_MEDIUM_PCT: f64 = 70.0;

/// Stockout tier. Never returns `Low`: that tier belongs to the classifier.
pub fn stockout_tier(days_until_stockout: u32) -> RiskLevel {
    if days_until_stockout <= STOCKOUT_CRITICAL_DAYS {
        RiskLevel::Critical
    } else if days_until_stockout <= STOCKOUT_HIGH_DAYS {
        RiskLevel::High
    } else {
        RiskLevel::Medium
    }
}

pub fn expiry_tier(wastage_risk_pct: f64, days_until_expiry: f64) -> RiskLevel {
    if wastage_risk_pct > EXPIRY_CRITICAL_PCT || days_until_expiry <= EXPIRY_CRITICAL_DAYS {
        RiskLevel::Critical
    } else if wastage_risk_pct > EXPIRY_HIGH_PCT || days_until_expiry <= EXPIRY_HIGH_DAYS {
        RiskLevel::High
    } else if wastage_risk_pct > EXPIRY_MEDIUM_PCT {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Cold-chain tier. A temperature breach is critical regardless of load.
pub fn cold_chain_tier(
    temperature_breach: bool,
    projected_utilization_pct: f64,
    capacity_utilization_pct: f64,
) -> RiskLevel {
    if temperature_breach || projected_utilization_pct > PROJECTED_CRITICAL_PCT {
        RiskLevel::Critical
    } else if projected_utilization_pct > PROJECTED_HIGH_PCT {
        RiskLevel::High
    } else if capacity_utilization_pct > CURRENT_MEDIUM_PCT {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stockout_boundaries() {
        assert_eq!(stockout_tier(0), RiskLevel::Critical);
        assert_eq!(stockout_tier(7), RiskLevel::Critical);
        assert_eq!(stockout_tier(8), RiskLevel::High);
        assert_eq!(stockout_tier(14), RiskLevel::High);
        assert_eq!(stockout_tier(15), RiskLevel::Medium);
        assert_eq!(stockout_tier(u32::MAX), RiskLevel::Medium);
    }

    #[test]
    fn expiry_boundaries() {
        assert_eq!(expiry_tier(25.0, 60.0), RiskLevel::Critical);
        assert_eq!(expiry_tier(0.0, 7.0), RiskLevel::Critical);
        assert_eq!(expiry_tier(20.0, 60.0), RiskLevel::High);
        assert_eq!(expiry_tier(0.0, 14.0), RiskLevel::High);
        assert_eq!(expiry_tier(10.0, 60.0), RiskLevel::Medium);
        assert_eq!(expiry_tier(5.0, 60.0), RiskLevel::Low);
    }

    #[test]
    fn cold_chain_boundaries() {
        assert_eq!(cold_chain_tier(true, 0.0, 0.0), RiskLevel::Critical);
        assert_eq!(cold_chain_tier(false, 90.5, 50.0), RiskLevel::Critical);
        assert_eq!(cold_chain_tier(false, 90.0, 50.0), RiskLevel::High);
        assert_eq!(cold_chain_tier(false, 75.0, 71.0), RiskLevel::Medium);
        assert_eq!(cold_chain_tier(false, 75.0, 70.0), RiskLevel::Low);
    }
}
