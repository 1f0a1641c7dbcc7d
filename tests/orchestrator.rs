//! Integration tests for the insight engine: caching, failure isolation,
//! fallback routing and models injected through the registry.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use vaccine_risk::classification::{
    ClassProbabilities, ClassificationFeatures, LabeledSample, RiskClassifier,
};
use vaccine_risk::config::EngineConfig;
use vaccine_risk::core::{
    AnomalyRecord, HistoricalDataPoint, PredictionType, RiskLevel, TimeSeries,
};
use vaccine_risk::detection::IsolationForestConfig;
use vaccine_risk::insights::{
    Facility, InsightEngine, InsightFilter, InventorySource, Product, StaticInventory, StockRecord,
};
use vaccine_risk::models::{ModelKind, ModelRegistry};
use vaccine_risk::{EngineError, Result};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn history(end: NaiveDate, days: i64, consumption: f64) -> Vec<HistoricalDataPoint> {
    (0..days)
        .map(|i| {
            HistoricalDataPoint::new(
                end - Duration::days(days - 1 - i),
                consumption + (i % 3) as f64,
                500.0,
                0.0,
            )
        })
        .collect()
}

/// Two facilities in two states, three products.
fn inventory() -> StaticInventory {
    let today = date(2024, 1, 1);
    StaticInventory::new()
        .with_facility(
            Facility::new("F1", "Kano Central Store", "Kano", "Nassarawa", 2000.0)
                .with_incoming_shipments(200.0),
        )
        .with_facility(
            Facility::new("F2", "Ikeja PHC", "Lagos", "Ikeja", 500.0)
                .with_temperature(11.0, Some(8.0)),
        )
        .with_product(Product::new("BCG", "BCG"))
        .with_product(Product::new("OPV", "Oral Polio"))
        .with_product(Product::new("PENTA", "Pentavalent"))
        // 3 days of cover
        .with_stock("F1", "BCG", StockRecord::new(150.0).with_consumption(50.0))
        // 40 days of cover derived from history, some doses expiring
        .with_stock(
            "F1",
            "OPV",
            StockRecord::new(800.0)
                .with_expiring(100.0, 20.0)
                .with_history(history(today, 30, 19.0)),
        )
        .with_stock("F2", "PENTA", StockRecord::new(120.0).with_consumption(4.0))
}

fn engine_with(source: Arc<dyn InventorySource>, registry: Arc<ModelRegistry>) -> InsightEngine {
    InsightEngine::new(EngineConfig::default(), source, registry)
        .unwrap()
        .with_as_of(date(2024, 1, 1))
}

fn engine() -> InsightEngine {
    engine_with(Arc::new(inventory()), Arc::new(ModelRegistry::new()))
}

/// Counts directory reads so cache hits can be observed.
struct CountingSource {
    inner: StaticInventory,
    reads: AtomicUsize,
}

impl InventorySource for CountingSource {
    fn facilities(&self) -> Result<Vec<Facility>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.facilities()
    }

    fn products(&self) -> Result<Vec<Product>> {
        self.inner.products()
    }

    fn stock(&self, facility_id: &str, product_id: &str) -> Result<Option<StockRecord>> {
        self.inner.stock(facility_id, product_id)
    }
}

/// Fails for one facility/product pair.
struct FlakySource {
    inner: StaticInventory,
}

impl InventorySource for FlakySource {
    fn facilities(&self) -> Result<Vec<Facility>> {
        self.inner.facilities()
    }

    fn products(&self) -> Result<Vec<Product>> {
        self.inner.products()
    }

    fn stock(&self, facility_id: &str, product_id: &str) -> Result<Option<StockRecord>> {
        if facility_id == "F1" && product_id == "BCG" {
            return Err(EngineError::ComputationError("feed timeout".to_string()));
        }
        self.inner.stock(facility_id, product_id)
    }
}

/// Classifier that always answers with a fixed tier.
struct FixedClassifier(RiskLevel);

impl RiskClassifier for FixedClassifier {
    fn fit(&mut self, _samples: &[LabeledSample]) -> Result<()> {
        Ok(())
    }

    fn predict_proba(&self, _features: &ClassificationFeatures) -> Result<ClassProbabilities> {
        let mut weights = [0.0; 4];
        weights[self.0.index()] = 1.0;
        Ok(ClassProbabilities::from_weights(weights))
    }

    fn is_fitted(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Classifier that is registered but cannot predict.
struct BrokenClassifier;

impl RiskClassifier for BrokenClassifier {
    fn fit(&mut self, _samples: &[LabeledSample]) -> Result<()> {
        Ok(())
    }

    fn predict_proba(&self, _features: &ClassificationFeatures) -> Result<ClassProbabilities> {
        Err(EngineError::FitRequired)
    }

    fn is_fitted(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "broken"
    }
}

#[test]
fn cache_is_reused_within_ttl() {
    init_tracing();
    let source = Arc::new(CountingSource {
        inner: inventory(),
        reads: AtomicUsize::new(0),
    });
    let engine = engine_with(source.clone(), Arc::new(ModelRegistry::new()));

    let first = engine.snapshot().unwrap();
    let second = engine.snapshot().unwrap();
    let page = engine.get_insights(&InsightFilter::new()).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.generated_at, second.generated_at);
    assert_eq!(page.count, first.len());
    assert_eq!(source.reads.load(Ordering::SeqCst), 1);

    engine.invalidate();
    let third = engine.snapshot().unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(source.reads.load(Ordering::SeqCst), 2);
}

#[test]
fn insights_cover_every_stocked_pair() {
    let page = engine().get_insights(&InsightFilter::new()).unwrap();
    let count = |kind: PredictionType| {
        page.data
            .iter()
            .filter(|r| r.prediction_type == kind)
            .count()
    };

    assert_eq!(count(PredictionType::ColdChain), 2);
    assert_eq!(count(PredictionType::Stockout), 3);
    assert_eq!(count(PredictionType::Expiry), 1);
    assert_eq!(page.count, 6);
}

#[test]
fn insights_are_ranked_most_severe_first() {
    let page = engine().get_insights(&InsightFilter::new()).unwrap();
    for pair in page.data.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(
            a.risk_level < b.risk_level
                || (a.risk_level == b.risk_level && a.days_until_event <= b.days_until_event)
        );
    }
    // BCG at F1 (3 days) outranks the F2 temperature breach (30-day horizon)
    assert_eq!(page.data[0].id, "STOCKOUT:F1:BCG");
    assert_eq!(page.data[1].id, "COLD_CHAIN:F2:all");
}

#[test]
fn history_drives_consumption_when_unreported() {
    let page = engine()
        .get_insights(
            &InsightFilter::new()
                .with_facility("F1")
                .with_product("OPV"),
        )
        .unwrap();
    let stockout = page
        .data
        .iter()
        .find(|r| r.prediction_type == PredictionType::Stockout)
        .unwrap();
    // consumption cycles 19, 20, 21 -> mean 20
    assert_eq!(stockout.metric("avgDailyConsumption"), Some(20.0));
    assert_eq!(stockout.days_until_event, 40);
    assert_eq!(stockout.risk_level, RiskLevel::Medium);
}

#[test]
fn filters_by_state_and_level() {
    let engine = engine();
    let lagos = engine
        .get_insights(&InsightFilter::new().with_state("Lagos"))
        .unwrap();
    assert_eq!(lagos.count, 2);
    assert!(lagos.data.iter().all(|r| r.facility_id == "F2"));

    let critical = engine
        .get_insights(&InsightFilter::new().with_risk_level(RiskLevel::Critical))
        .unwrap();
    assert!(critical
        .data
        .iter()
        .all(|r| r.risk_level == RiskLevel::Critical));
    assert!(critical.data.iter().any(|r| r.id == "COLD_CHAIN:F2:all"));
}

#[test]
fn failing_pair_does_not_block_others() {
    init_tracing();
    let engine = engine_with(
        Arc::new(FlakySource { inner: inventory() }),
        Arc::new(ModelRegistry::new()),
    );
    let page = engine.get_insights(&InsightFilter::new()).unwrap();

    assert!(page.data.iter().all(|r| r.id != "STOCKOUT:F1:BCG"));
    assert!(page.data.iter().any(|r| r.id == "STOCKOUT:F1:OPV"));
    assert!(page.data.iter().any(|r| r.id == "STOCKOUT:F2:PENTA"));
    assert_eq!(page.count, 5);
}

#[test]
fn injected_classifier_escalates_stockout_tier() {
    let registry = Arc::new(ModelRegistry::new());
    registry.register_classifier(FixedClassifier(RiskLevel::Critical));
    let engine = engine_with(Arc::new(inventory()), registry);

    let page = engine
        .get_insights(&InsightFilter::new().with_product("OPV"))
        .unwrap();
    let stockout = page
        .data
        .iter()
        .find(|r| r.prediction_type == PredictionType::Stockout)
        .unwrap();
    assert_eq!(stockout.risk_level, RiskLevel::Critical);
    assert_eq!(
        stockout.metrics.get("mlRiskLevel").and_then(|v| v.as_text()),
        Some("CRITICAL")
    );
    assert_eq!(stockout.metric("mlConfidence"), Some(100.0));
}

#[test]
fn classifier_never_downgrades_rule_tier() {
    let registry = Arc::new(ModelRegistry::new());
    registry.register_classifier(FixedClassifier(RiskLevel::Low));
    let engine = engine_with(Arc::new(inventory()), registry);

    let result = engine.get_aggregated_predictions("F1", "BCG").unwrap();
    assert_eq!(result.stockout.risk_level, RiskLevel::Critical);
    assert_eq!(result.overall_risk_level, RiskLevel::Critical);
}

#[test]
fn broken_model_falls_back_silently() {
    init_tracing();
    let registry = Arc::new(ModelRegistry::new());
    registry.register_classifier(BrokenClassifier);
    let engine = engine_with(Arc::new(inventory()), registry);

    let features = ClassificationFeatures {
        days_until_stockout: 3.0,
        expiry_risk: 25.0,
        capacity_utilization: 95.0,
        ..Default::default()
    };
    let result = engine.classify_risk(&features);
    assert_eq!(result.method, "rule-based");
    assert_eq!(result.risk_level, RiskLevel::Critical);

    // insights still generate with rule tiers
    let page = engine.get_insights(&InsightFilter::new()).unwrap();
    assert_eq!(page.count, 6);
    assert!(page.data.iter().all(|r| !r.metrics.contains_key("mlRiskLevel")));
}

#[test]
fn aggregated_prediction_for_breached_facility() {
    let result = engine().get_aggregated_predictions("F2", "PENTA").unwrap();
    assert_eq!(result.stockout.days_until_event, 30);
    assert_eq!(result.stockout.risk_level, RiskLevel::Medium);
    assert!(result.expiry.is_none());
    assert_eq!(result.cold_chain.risk_level, RiskLevel::Critical);
    assert_eq!(result.overall_risk_level, RiskLevel::Critical);

    assert!(matches!(
        engine().get_aggregated_predictions("F2", "BCG"),
        Err(EngineError::NotFound(_))
    ));
}

#[test]
fn forecast_routes_to_ets_once_trained() {
    init_tracing();
    let engine = engine();
    let recent = history(date(2024, 1, 1), 30, 20.0);

    let rule = engine.forecast_consumption(&recent, 7, true).unwrap();
    assert_eq!(rule.method, ModelKind::RuleBased);
    assert_eq!(rule.forecast.len(), 7);
    assert_eq!(rule.confidence, 70.0);

    let values: Vec<f64> = (0..56)
        .map(|i| 20.0 + 4.0 * ((i % 7) as f64 - 3.0).abs())
        .collect();
    let series = TimeSeries::daily(date(2023, 11, 6), values).unwrap();
    assert_eq!(engine.train_ets_model(&series, None).unwrap(), 1);

    let ets = engine.forecast_consumption(&recent, 7, true).unwrap();
    assert_eq!(ets.method, ModelKind::Ets);
    assert_eq!(ets.forecast.len(), 7);
    assert_eq!(ets.prediction_intervals.len(), 7);
    assert!((70.0..=95.0).contains(&ets.confidence));

    // use_ml = false keeps the rule path even with a trained model
    let forced = engine.forecast_consumption(&recent, 7, false).unwrap();
    assert_eq!(forced.method, ModelKind::RuleBased);
}

#[test]
fn ets_training_with_short_series_fails() {
    let engine = engine();
    let series = TimeSeries::daily(date(2024, 1, 1), vec![10.0; 10]).unwrap();
    assert!(matches!(
        engine.train_ets_model(&series, None),
        Err(EngineError::InsufficientData { needed: 14, got: 10 })
    ));
    assert!(engine.registry().forecaster().is_none());
}

#[test]
fn anomaly_detection_routes_to_trained_forest() {
    init_tracing();
    let engine = engine();
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let records: Vec<AnomalyRecord> = [20.0, 21.0, 19.5, 20.5, 400.0, 20.0, 19.0, 21.5]
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            AnomalyRecord::new(v, base + Duration::days(i as i64)).with_context("BCG@F1")
        })
        .collect();

    let fallback = engine.detect_anomalies(&records, 0.5).unwrap();
    assert_eq!(fallback.method, "rule-based");
    assert_eq!(fallback.anomaly_count, 1);
    assert_eq!(fallback.anomalies[0].index, 4);

    let mut training: Vec<f64> = (0..200).map(|i| 20.0 + (i as f64 * 0.7).sin()).collect();
    training.push(400.0);
    let before = engine.snapshot().unwrap();
    engine
        .train_isolation_forest(&training, Some(IsolationForestConfig::default().with_seed(7)))
        .unwrap();
    let after = engine.snapshot().unwrap();
    // retraining invalidates cached insights
    assert!(!Arc::ptr_eq(&before, &after));

    let report = engine.detect_anomalies(&records, 0.75).unwrap();
    assert_eq!(report.method, "IsolationForest");
    assert!(report.is_anomaly(4));
    assert_eq!(report.scores.len(), records.len());
}

#[test]
fn random_forest_training_replaces_fallback() {
    let engine = engine();
    let tiers = [
        (RiskLevel::Critical, 3.0, 30.0, 95.0),
        (RiskLevel::High, 10.0, 15.0, 85.0),
        (RiskLevel::Medium, 25.0, 7.0, 75.0),
        (RiskLevel::Low, 60.0, 1.0, 40.0),
    ];
    let samples: Vec<LabeledSample> = (0..60)
        .map(|i| {
            let (label, days, expiry, util) = tiers[i % 4];
            let j = ((i / 4) % 5) as f64;
            LabeledSample::new(
                ClassificationFeatures {
                    current_stock: 200.0,
                    avg_daily_consumption: 10.0,
                    days_until_stockout: days + j,
                    expiry_risk: expiry + j * 0.5,
                    capacity_utilization: util + j,
                    temperature_deviation: 0.0,
                    data_quality: 0.8,
                    seasonality_factor: 1.0,
                },
                label,
            )
        })
        .collect();

    let config = EngineConfig::default().forest.with_seed(42);
    assert_eq!(engine.train_random_forest(&samples, Some(config)).unwrap(), 1);

    let result = engine.classify_risk(&samples[0].features);
    assert_eq!(result.method, "RandomForest");
    assert_eq!(result.risk_level, RiskLevel::Critical);
    let total: f64 = result.probabilities.values().sum();
    assert!((total - 1.0).abs() < 1e-9);

    let status = engine.registry().status();
    assert_eq!(status.len(), 1);
    assert_eq!(status[0].kind, ModelKind::RiskForest);

    assert_eq!(engine.forget_model(&ModelKind::RiskForest), Ok(true));
    assert_eq!(engine.classify_risk(&samples[0].features).method, "rule-based");
}

#[test]
fn unimplemented_model_kind_is_rejected() {
    let engine = engine();
    let kind = ModelKind::NotImplemented("lstm".to_string());
    assert_eq!(
        engine.forget_model(&kind),
        Err(EngineError::ModelNotImplemented("lstm".to_string()))
    );
}
