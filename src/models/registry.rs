//! Registry of trained model instances shared with the insight engine.
//!
//! Each model family has one slot. Training produces a fresh instance that
//! replaces the slot wholesale, so readers holding an `Arc` from before a
//! retrain keep using the old model undisturbed.

use crate::classification::RiskClassifier;
use crate::detection::AnomalyDetector;
use crate::error::{EngineError, Result};
use crate::models::Forecaster;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::info;

pub type SharedForecaster = Arc<dyn Forecaster + Send + Sync>;
pub type SharedDetector = Arc<dyn AnomalyDetector + Send + Sync>;
pub type SharedClassifier = Arc<dyn RiskClassifier + Send + Sync>;

/// Kinds of model the engine can route to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    RuleBased,
    Ets,
    AnomalyForest,
    RiskForest,
    /// Reserved for model families with no implementation.
    NotImplemented(String),
}

impl ModelKind {
    pub fn as_str(&self) -> &str {
        match self {
            ModelKind::RuleBased => "rule-based",
            ModelKind::Ets => "ets",
            ModelKind::AnomalyForest => "anomaly-forest",
            ModelKind::RiskForest => "risk-forest",
            ModelKind::NotImplemented(name) => name,
        }
    }

    /// Error for kinds that cannot be trained or served.
    pub fn ensure_supported(&self) -> Result<()> {
        match self {
            ModelKind::NotImplemented(name) => Err(EngineError::ModelNotImplemented(name.clone())),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A model instance together with its registration metadata.
pub struct Registered<M: ?Sized> {
    pub version: u64,
    pub trained_at: DateTime<Utc>,
    pub name: String,
    pub model: Arc<M>,
}

impl<M: ?Sized> fmt::Debug for Registered<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registered")
            .field("version", &self.version)
            .field("trained_at", &self.trained_at)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// One row of [`ModelRegistry::status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStatus {
    pub kind: ModelKind,
    pub name: String,
    pub version: u64,
    pub trained_at: DateTime<Utc>,
}

type Slot<M> = RwLock<Option<Registered<M>>>;

fn replace<M: ?Sized>(slot: &Slot<M>, kind: &ModelKind, name: String, model: Arc<M>) -> u64 {
    let mut guard = slot.write();
    let version = guard.as_ref().map_or(1, |r| r.version + 1);
    *guard = Some(Registered {
        version,
        trained_at: Utc::now(),
        name,
        model,
    });
    info!(kind = %kind, version, "model registered");
    version
}

/// Versioned slots for the forecaster, anomaly detector and risk classifier.
#[derive(Default)]
pub struct ModelRegistry {
    forecaster: Slot<dyn Forecaster + Send + Sync>,
    detector: Slot<dyn AnomalyDetector + Send + Sync>,
    classifier: Slot<dyn RiskClassifier + Send + Sync>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a fitted forecaster; returns its version.
    pub fn register_forecaster<F>(&self, model: F) -> u64
    where
        F: Forecaster + Send + Sync + 'static,
    {
        let name = model.name().to_string();
        replace(&self.forecaster, &ModelKind::Ets, name, Arc::new(model))
    }

    /// Install a fitted anomaly detector; returns its version.
    pub fn register_detector<D>(&self, model: D) -> u64
    where
        D: AnomalyDetector + Send + Sync + 'static,
    {
        let name = model.name().to_string();
        replace(&self.detector, &ModelKind::AnomalyForest, name, Arc::new(model))
    }

    /// Install a fitted risk classifier; returns its version.
    pub fn register_classifier<C>(&self, model: C) -> u64
    where
        C: RiskClassifier + Send + Sync + 'static,
    {
        let name = model.name().to_string();
        replace(&self.classifier, &ModelKind::RiskForest, name, Arc::new(model))
    }

    pub fn forecaster(&self) -> Option<SharedForecaster> {
        self.forecaster.read().as_ref().map(|r| Arc::clone(&r.model))
    }

    pub fn detector(&self) -> Option<SharedDetector> {
        self.detector.read().as_ref().map(|r| Arc::clone(&r.model))
    }

    pub fn classifier(&self) -> Option<SharedClassifier> {
        self.classifier.read().as_ref().map(|r| Arc::clone(&r.model))
    }

    /// Drop the model of `kind`, reverting that path to rule-based fallback.
    pub fn unregister(&self, kind: &ModelKind) -> Result<bool> {
        kind.ensure_supported()?;
        let removed = match kind {
            ModelKind::Ets => self.forecaster.write().take().is_some(),
            ModelKind::AnomalyForest => self.detector.write().take().is_some(),
            ModelKind::RiskForest => self.classifier.write().take().is_some(),
            _ => false,
        };
        Ok(removed)
    }

    /// Currently registered models, in forecaster/detector/classifier order.
    pub fn status(&self) -> Vec<ModelStatus> {
        fn row<M: ?Sized>(kind: ModelKind, slot: &Slot<M>) -> Option<ModelStatus> {
            slot.read().as_ref().map(|r| ModelStatus {
                kind,
                name: r.name.clone(),
                version: r.version,
                trained_at: r.trained_at,
            })
        }

        [
            row(ModelKind::Ets, &self.forecaster),
            row(ModelKind::AnomalyForest, &self.detector),
            row(ModelKind::RiskForest, &self.classifier),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("models", &self.status())
            .finish()
    }
}
