//! The insight engine: runs rules and registered models over every
//! facility/product pair, caches the ranked result and serves queries.

use super::cache::{InsightCache, InsightSnapshot};
use super::filter::{rank, InsightFilter, InsightPage};
use super::record::InsightRecord;
use super::source::{Facility, InventorySource, Product};
use crate::classification::{
    classify_fallback, ClassificationFeatures, LabeledSample, RandomForest, RandomForestConfig,
    RiskClassification, RiskClassifier,
};
use crate::config::EngineConfig;
use crate::core::{
    avg_daily_consumption, AnomalyRecord, ColdChainSnapshot, ExpirySnapshot,
    HistoricalDataPoint, PredictionInterval, PredictionResult, PredictionType, RiskLevel,
    StockSnapshot, TimeSeries, MIN_CONFIDENCE,
};
use crate::detection::{
    detect_anomalies, detect_anomalies_fallback, AnomalyDetector, AnomalyReport,
    IsolationForest, IsolationForestConfig,
};
use crate::error::{EngineError, Result};
use crate::models::{
    prediction_intervals, EtsConfig, Forecaster, HoltWinters, ModelKind, ModelRegistry,
    SharedClassifier, SharedDetector,
};
use crate::rules::{seasonality_factor, RuleEngine};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Confidence level of the bands attached to consumption forecasts.
const FORECAST_INTERVAL_LEVEL: f64 = 0.95;

/// Rule, expiry and cold-chain results for one facility/product pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedPrediction {
    pub stockout: PredictionResult,
    /// Absent when no doses are approaching expiry.
    pub expiry: Option<PredictionResult>,
    pub cold_chain: PredictionResult,
    /// Most severe tier of the three.
    pub overall_risk_level: RiskLevel,
}

/// Projected daily consumption.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionForecast {
    pub forecast: Vec<f64>,
    pub prediction_intervals: Vec<PredictionInterval>,
    pub confidence: f64,
    /// `RuleBased` or `Ets`.
    pub method: ModelKind,
}

/// Stock position of one product at a facility, resolved into snapshots.
struct Position {
    product: Product,
    stock: StockSnapshot,
    expiry: Option<ExpirySnapshot>,
    history: Vec<HistoricalDataPoint>,
}

/// Models captured once per generation so a concurrent retrain does not mix
/// two model versions into one snapshot.
struct ActiveModels {
    classifier: Option<SharedClassifier>,
    detector: Option<SharedDetector>,
}

struct Assessment {
    stockout: PredictionResult,
    expiry: Option<PredictionResult>,
}

/// Orchestrates rule and model predictions across the inventory.
pub struct InsightEngine {
    config: EngineConfig,
    source: Arc<dyn InventorySource>,
    registry: Arc<ModelRegistry>,
    cache: InsightCache,
    as_of: Option<NaiveDate>,
}

impl InsightEngine {
    pub fn new(
        config: EngineConfig,
        source: Arc<dyn InventorySource>,
        registry: Arc<ModelRegistry>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            cache: InsightCache::new(config.cache_ttl()),
            config,
            source,
            registry,
            as_of: None,
        })
    }

    /// Pin the reference date instead of using the current UTC date.
    pub fn with_as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    fn today(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Utc::now().date_naive())
    }

    fn rules(&self) -> RuleEngine {
        RuleEngine::new(self.today()).with_cold_chain_horizon(self.config.cold_chain_horizon_days)
    }

    /// Filtered, ranked insights from the current snapshot.
    pub fn get_insights(&self, filter: &InsightFilter) -> Result<InsightPage> {
        let snapshot = self.snapshot()?;
        Ok(InsightPage::new(filter.apply(&snapshot.records)))
    }

    /// Current snapshot, regenerated if older than the cache TTL.
    pub fn snapshot(&self) -> Result<Arc<InsightSnapshot>> {
        self.cache.get_or_refresh(|| self.generate())
    }

    /// Force the next read to regenerate.
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    fn generate(&self) -> Result<Vec<InsightRecord>> {
        let started = Instant::now();
        let rules = self.rules();
        let facilities = self.source.facilities()?;
        let products = self.source.products()?;
        let models = self.active_models();

        let mut records: Vec<InsightRecord> = facilities
            .par_iter()
            .flat_map_iter(|facility| self.facility_insights(&rules, facility, &products, &models))
            .collect();
        rank(&mut records);

        info!(
            count = records.len(),
            facilities = facilities.len(),
            products = products.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "insights regenerated"
        );
        Ok(records)
    }

    fn active_models(&self) -> ActiveModels {
        let classifier = self.registry.classifier();
        let detector = self.registry.detector();
        if classifier.is_none() {
            debug!("no risk classifier registered, stockout insights use rules only");
        }
        if detector.is_none() {
            debug!("no anomaly detector registered, anomaly scores omitted");
        }
        ActiveModels {
            classifier,
            detector,
        }
    }

    /// Cold-chain insight for the facility plus stockout and expiry insights
    /// for each product it stocks. Pairs that fail are logged and skipped.
    fn facility_insights(
        &self,
        rules: &RuleEngine,
        facility: &Facility,
        products: &[Product],
        models: &ActiveModels,
    ) -> Vec<InsightRecord> {
        let positions = self.positions(rules, facility, products);
        let cold_chain = self.cold_chain_snapshot(rules, facility, &positions);

        let mut records = Vec::with_capacity(1 + positions.len() * 2);
        records.push(InsightRecord::new(
            PredictionType::ColdChain,
            facility,
            None,
            rules.cold_chain_risk(&cold_chain),
        ));

        for position in &positions {
            let assessment = self.assess(rules, facility, position, &cold_chain, models);
            records.push(InsightRecord::new(
                PredictionType::Stockout,
                facility,
                Some(&position.product),
                assessment.stockout,
            ));
            if let Some(expiry) = assessment.expiry {
                records.push(InsightRecord::new(
                    PredictionType::Expiry,
                    facility,
                    Some(&position.product),
                    expiry,
                ));
            }
        }
        records
    }

    fn positions(
        &self,
        rules: &RuleEngine,
        facility: &Facility,
        products: &[Product],
    ) -> Vec<Position> {
        products
            .iter()
            .filter_map(|product| match self.position(rules, facility, product) {
                Ok(position) => position,
                Err(e) => {
                    warn!(
                        facility_id = %facility.id,
                        product_id = %product.id,
                        error = %e,
                        "skipping facility/product pair"
                    );
                    None
                }
            })
            .collect()
    }

    fn position(
        &self,
        rules: &RuleEngine,
        facility: &Facility,
        product: &Product,
    ) -> Result<Option<Position>> {
        let Some(record) = self.source.stock(&facility.id, &product.id)? else {
            return Ok(None);
        };
        record.validate()?;

        let consumption = record.avg_daily_consumption.unwrap_or_else(|| {
            avg_daily_consumption(&record.history, self.config.consumption_window_days)
        });
        let stock = StockSnapshot {
            current_stock: record.current_stock,
            avg_daily_consumption: consumption,
            historical_data_quality: rules.data_quality(&record.history),
            min_stock_threshold: record.min_stock_threshold,
        };
        let expiry = (record.expiring_doses > 0.0).then(|| ExpirySnapshot {
            total_doses: record.current_stock,
            expiring_doses: record.expiring_doses,
            days_until_expiry: record.days_until_expiry,
            avg_daily_consumption: consumption,
        });

        Ok(Some(Position {
            product: product.clone(),
            stock,
            expiry,
            history: record.history,
        }))
    }

    /// Facility-wide cold-chain load: all stocked products share the store.
    fn cold_chain_snapshot(
        &self,
        rules: &RuleEngine,
        facility: &Facility,
        positions: &[Position],
    ) -> ColdChainSnapshot {
        ColdChainSnapshot {
            current_stock: positions.iter().map(|p| p.stock.current_stock).sum(),
            max_capacity: facility.cold_chain_capacity,
            avg_incoming_shipments: facility.avg_incoming_shipments,
            seasonality_factor: rules.current_seasonality(),
            current_temperature: facility.current_temperature,
            max_safe_temperature: facility
                .max_safe_temperature
                .unwrap_or(self.config.default_max_safe_temperature),
        }
    }

    fn assess(
        &self,
        rules: &RuleEngine,
        facility: &Facility,
        position: &Position,
        cold_chain: &ColdChainSnapshot,
        models: &ActiveModels,
    ) -> Assessment {
        let mut stockout = rules.stockout_prediction(&position.stock);

        if let Some(classifier) = &models.classifier {
            let features = ClassificationFeatures::from_snapshots(
                &position.stock,
                position.expiry.as_ref(),
                cold_chain,
            );
            match classifier.classify(&features) {
                Ok(ml) => {
                    let level = stockout.risk_level.most_severe(ml.risk_level);
                    stockout = stockout
                        .with_metric("mlRiskLevel", ml.risk_level)
                        .with_metric("mlConfidence", ml.confidence);
                    stockout.risk_level = level;
                }
                Err(e) => warn!(
                    facility_id = %facility.id,
                    product_id = %position.product.id,
                    error = %e,
                    "risk classifier failed, keeping rule tier"
                ),
            }
        }

        if let Some(detector) = &models.detector {
            if let Some(latest) = position.history.iter().max_by_key(|p| p.date) {
                match detector.score(latest.consumption) {
                    Ok(score) => stockout = stockout.with_metric("anomalyScore", score),
                    Err(e) => warn!(
                        facility_id = %facility.id,
                        product_id = %position.product.id,
                        error = %e,
                        "anomaly scoring failed"
                    ),
                }
            }
        }

        Assessment {
            stockout,
            expiry: position.expiry.as_ref().map(|e| rules.expiry_risk(e)),
        }
    }

    /// Stockout, expiry and cold-chain predictions for one pair, computed
    /// fresh from the source.
    pub fn get_aggregated_predictions(
        &self,
        facility_id: &str,
        product_id: &str,
    ) -> Result<AggregatedPrediction> {
        let rules = self.rules();
        let facility = self
            .source
            .facilities()?
            .into_iter()
            .find(|f| f.id == facility_id)
            .ok_or_else(|| EngineError::NotFound(format!("facility {}", facility_id)))?;
        let products = self.source.products()?;
        if !products.iter().any(|p| p.id == product_id) {
            return Err(EngineError::NotFound(format!("product {}", product_id)));
        }

        let positions = self.positions(&rules, &facility, &products);
        let position = positions
            .iter()
            .find(|p| p.product.id == product_id)
            .ok_or_else(|| {
                EngineError::NotFound(format!(
                    "stock of product {} at facility {}",
                    product_id, facility_id
                ))
            })?;

        let cold_chain_snapshot = self.cold_chain_snapshot(&rules, &facility, &positions);
        let cold_chain = rules.cold_chain_risk(&cold_chain_snapshot);
        let models = self.active_models();
        let Assessment { stockout, expiry } =
            self.assess(&rules, &facility, position, &cold_chain_snapshot, &models);

        let overall_risk_level = expiry
            .iter()
            .map(|e| e.risk_level)
            .fold(
                stockout.risk_level.most_severe(cold_chain.risk_level),
                RiskLevel::most_severe,
            );

        Ok(AggregatedPrediction {
            stockout,
            expiry,
            cold_chain,
            overall_risk_level,
        })
    }

    /// Project daily consumption `horizon` days ahead.
    ///
    /// Uses the registered forecaster when `use_ml` is set and one is
    /// available; otherwise the recent mean scaled by each day's monthly
    /// seasonality factor.
    pub fn forecast_consumption(
        &self,
        history: &[HistoricalDataPoint],
        horizon: usize,
        use_ml: bool,
    ) -> Result<ConsumptionForecast> {
        if use_ml {
            match self.registry.forecaster() {
                Some(model) => match model.forecast_with_intervals(horizon, FORECAST_INTERVAL_LEVEL)
                {
                    Ok(forecast) => {
                        let confidence = model.fit_confidence().unwrap_or(MIN_CONFIDENCE);
                        let (point, intervals) = forecast.into_parts();
                        return Ok(ConsumptionForecast {
                            forecast: point,
                            prediction_intervals: intervals.unwrap_or_default(),
                            confidence,
                            method: ModelKind::Ets,
                        });
                    }
                    Err(e) => debug!(error = %e, "forecaster failed, using rule-based forecast"),
                },
                None => debug!("no forecaster registered, using rule-based forecast"),
            }
        }

        let base = avg_daily_consumption(history, self.config.consumption_window_days);
        let today = self.today();
        let forecast: Vec<f64> = (1..=horizon)
            .map(|h| {
                let date = today
                    .checked_add_signed(Duration::days(h as i64))
                    .unwrap_or(NaiveDate::MAX);
                base * seasonality_factor(date.month())
            })
            .collect();

        Ok(ConsumptionForecast {
            prediction_intervals: prediction_intervals(&forecast, FORECAST_INTERVAL_LEVEL),
            forecast,
            confidence: MIN_CONFIDENCE,
            method: ModelKind::RuleBased,
        })
    }

    /// Score records with the registered detector, or the modified z-score
    /// fallback when none is registered or scoring fails.
    pub fn detect_anomalies(&self, data: &[AnomalyRecord], threshold: f64) -> Result<AnomalyReport> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(EngineError::invalid(format!(
                "threshold must be in [0, 1], got {}",
                threshold
            )));
        }
        if let Some(detector) = self.registry.detector() {
            match detect_anomalies(detector.as_ref(), data, threshold) {
                Ok(report) => return Ok(report),
                Err(e) => debug!(error = %e, "anomaly detector failed, using rule-based scoring"),
            }
        } else {
            debug!("no anomaly detector registered, using rule-based scoring");
        }
        Ok(detect_anomalies_fallback(data, threshold))
    }

    /// Classify with the registered classifier, or threshold scoring when
    /// none is registered or it fails.
    pub fn classify_risk(&self, features: &ClassificationFeatures) -> RiskClassification {
        if let Some(classifier) = self.registry.classifier() {
            match classifier.classify(features) {
                Ok(result) => return result,
                Err(e) => debug!(error = %e, "risk classifier failed, using rule-based scoring"),
            }
        } else {
            debug!("no risk classifier registered, using rule-based scoring");
        }
        classify_fallback(features)
    }

    /// Fit a Holt-Winters model and register it; returns the new version.
    pub fn train_ets_model(&self, series: &TimeSeries, config: Option<EtsConfig>) -> Result<u64> {
        let config = config.unwrap_or(self.config.ets);
        info!(kind = %ModelKind::Ets, points = series.len(), "training started");
        let mut model = HoltWinters::new(config);
        model.fit(series)?;
        let version = self.registry.register_forecaster(model);
        info!(kind = %ModelKind::Ets, version, "training finished");
        Ok(version)
    }

    /// Fit an isolation forest on a value stream and register it.
    pub fn train_isolation_forest(
        &self,
        values: &[f64],
        config: Option<IsolationForestConfig>,
    ) -> Result<u64> {
        let config = config.unwrap_or_else(|| self.config.isolation.clone());
        info!(kind = %ModelKind::AnomalyForest, points = values.len(), "training started");
        let mut model = IsolationForest::new(config);
        model.fit(values)?;
        let version = self.registry.register_detector(model);
        // cached insights carry anomaly scores from the previous detector
        self.invalidate();
        info!(kind = %ModelKind::AnomalyForest, version, "training finished");
        Ok(version)
    }

    /// Fit a random forest on labeled samples and register it.
    pub fn train_random_forest(
        &self,
        samples: &[LabeledSample],
        config: Option<RandomForestConfig>,
    ) -> Result<u64> {
        let config = config.unwrap_or_else(|| self.config.forest.clone());
        info!(kind = %ModelKind::RiskForest, samples = samples.len(), "training started");
        let mut model = RandomForest::new(config);
        model.fit(samples)?;
        let version = self.registry.register_classifier(model);
        self.invalidate();
        info!(kind = %ModelKind::RiskForest, version, "training finished");
        Ok(version)
    }

    /// Remove a trained model so its path reverts to rule-based fallback.
    pub fn forget_model(&self, kind: &ModelKind) -> Result<bool> {
        let removed = self.registry.unregister(kind)?;
        if removed {
            self.invalidate();
        }
        Ok(removed)
    }
}
