//! Data-quality scoring and the monthly demand seasonality table.

use crate::core::HistoricalDataPoint;
use chrono::NaiveDate;

/// Monthly demand multipliers, January first. Campaign season peaks in
/// November through January; April to June is the trough.
const MONTHLY_SEASONALITY: [f64; 12] = [
    1.2, 1.1, 1.0, 0.9, 0.85, 0.9, 1.0, 1.0, 1.05, 1.1, 1.2, 1.3,
];

/// Demand multiplier for a calendar month (1-12). Out-of-range months get 1.0.
pub fn seasonality_factor(month: u32) -> f64 {
    match month {
        1..=12 => MONTHLY_SEASONALITY[(month - 1) as usize],
        _ => 1.0,
    }
}

/// Score in `[0, 1]` for how far a history can be trusted.
///
/// Starts at 0.5; +0.2 when every point is non-negative, +0.15 at 30 points,
/// another +0.15 at 90 points, and +0.1 when the newest point is at most a week
/// older than `as_of`. An empty history keeps the base score.
pub fn data_quality(history: &[HistoricalDataPoint], as_of: NaiveDate) -> f64 {
    let mut score: f64 = 0.5;
    if history.is_empty() {
        return score;
    }

    if history.iter().all(HistoricalDataPoint::is_valid) {
        score += 0.2;
    }
    if history.len() >= 30 {
        score += 0.15;
    }
    if history.len() >= 90 {
        score += 0.15;
    }
    if let Some(latest) = history.iter().map(|p| p.date).max() {
        if (as_of - latest).num_days().abs() <= 7 {
            score += 0.1;
        }
    }

    score.min(1.0)
}
