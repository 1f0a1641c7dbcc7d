//! Engine configuration.
//!
//! Every field has a default, so a partial JSON document only overrides what
//! it names:
//!
//! ```
//! use vaccine_risk::config::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{ "cache_ttl_secs": 60, "forest": { "num_trees": 20 } }"#).unwrap();
//! assert_eq!(config.cache_ttl_secs, 60);
//! assert_eq!(config.forest.num_trees, 20);
//! assert_eq!(config.cold_chain_horizon_days, 30);
//! ```

use crate::classification::RandomForestConfig;
use crate::detection::IsolationForestConfig;
use crate::error::{EngineError, Result};
use crate::models::EtsConfig;
use crate::rules::DEFAULT_COLD_CHAIN_HORIZON_DAYS;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lifetime of a generated insight snapshot.
    pub cache_ttl_secs: u64,
    /// Projection horizon reported by cold-chain insights.
    pub cold_chain_horizon_days: u32,
    /// Used for facilities that do not report their own limit.
    pub default_max_safe_temperature: f64,
    /// History points averaged when a stock record carries no consumption rate.
    pub consumption_window_days: usize,
    pub ets: EtsConfig,
    pub isolation: IsolationForestConfig,
    pub forest: RandomForestConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            cold_chain_horizon_days: DEFAULT_COLD_CHAIN_HORIZON_DAYS,
            default_max_safe_temperature: 8.0,
            consumption_window_days: 30,
            ets: EtsConfig::default(),
            isolation: IsolationForestConfig::default(),
            forest: RandomForestConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl_secs = ttl.as_secs();
        self
    }

    pub fn with_cold_chain_horizon(mut self, days: u32) -> Self {
        self.cold_chain_horizon_days = days;
        self
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EngineError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.consumption_window_days == 0 {
            return Err(EngineError::config("consumption_window_days must be positive"));
        }
        if !self.default_max_safe_temperature.is_finite() {
            return Err(EngineError::config(
                "default_max_safe_temperature must be finite",
            ));
        }
        let nested = [
            ("ets", self.ets.validate()),
            ("isolation", self.isolation.validate()),
            ("forest", self.forest.validate()),
        ];
        for (section, result) in nested {
            if let Err(e) = result {
                return Err(EngineError::config(format!("{}: {}", section, e)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.cold_chain_horizon_days, 30);
        assert_eq!(config.ets.period, 7);
        assert_eq!(config.isolation.num_trees, 100);
        assert_eq!(config.forest.num_trees, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(EngineConfig::from_json_str("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn nested_overrides() {
        let config = EngineConfig::from_json_str(
            r#"{ "ets": { "alpha": 0.5, "period": 12 }, "isolation": { "seed": 9 } }"#,
        )
        .unwrap();
        assert_eq!(config.ets.alpha, 0.5);
        assert_eq!(config.ets.beta, 0.1);
        assert_eq!(config.ets.period, 12);
        assert_eq!(config.isolation.seed, Some(9));
    }

    #[test]
    fn rejects_malformed_and_invalid() {
        assert!(matches!(
            EngineConfig::from_json_str("{ not json"),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "consumption_window_days": 0 }"#),
            Err(EngineError::Config(_))
        ));
        let err = EngineConfig::from_json_str(r#"{ "forest": { "num_trees": 0 } }"#).unwrap_err();
        assert!(err.to_string().contains("forest"));
    }

    #[test]
    fn missing_file() {
        let result = EngineConfig::from_json_file("/nonexistent/vaccine-risk.json");
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn builders() {
        let config = EngineConfig::default()
            .with_cache_ttl(Duration::from_secs(5))
            .with_cold_chain_horizon(14);
        assert_eq!(config.cache_ttl_secs, 5);
        assert_eq!(config.cold_chain_horizon_days, 14);
    }
}
