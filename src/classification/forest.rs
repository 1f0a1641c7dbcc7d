//! Random forest risk classifier.

use super::features::{FeatureName, FEATURE_COUNT};
use super::tree::{DecisionTree, TreeParams};
use super::{ClassProbabilities, ClassificationFeatures, LabeledSample, RiskClassifier};
use crate::error::{EngineError, Result};
use crate::utils::seeded_rng;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Random forest configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomForestConfig {
    pub num_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Features tried per split; `floor(sqrt(8))` when unset.
    pub max_features: Option<usize>,
    /// Random seed for reproducibility (None for entropy).
    pub seed: Option<u64>,
}

impl Default for RandomForestConfig {
    fn default() -> Self {
        Self {
            num_trees: 50,
            max_depth: 10,
            min_samples_split: 2,
            max_features: None,
            seed: None,
        }
    }
}

impl RandomForestConfig {
    pub fn with_num_trees(mut self, num_trees: usize) -> Self {
        self.num_trees = num_trees;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    /// Set random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Features tried per split after defaulting and clamping.
    pub fn effective_max_features(&self) -> usize {
        self.max_features
            .unwrap_or_else(|| (FEATURE_COUNT as f64).sqrt().floor() as usize)
            .clamp(1, FEATURE_COUNT)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_trees == 0 {
            return Err(EngineError::invalid("num_trees must be positive"));
        }
        if self.max_depth == 0 {
            return Err(EngineError::invalid("max_depth must be positive"));
        }
        if self.min_samples_split < 2 {
            return Err(EngineError::invalid("min_samples_split must be at least 2"));
        }
        if self.max_features == Some(0) {
            return Err(EngineError::invalid("max_features must be positive"));
        }
        Ok(())
    }
}

/// Bagged ensemble of Gini decision trees.
///
/// Each tree is grown on a bootstrap sample of the training set. Trees get
/// their own seed drawn from the forest seed, so a seeded forest is
/// reproducible even though trees are grown in parallel.
#[derive(Debug, Clone)]
pub struct RandomForest {
    config: RandomForestConfig,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn new(config: RandomForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
        }
    }

    pub fn config(&self) -> &RandomForestConfig {
        &self.config
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Share of split nodes using each feature, summing to one.
    ///
    /// All zeros when no tree split at all.
    pub fn feature_importances(&self) -> Vec<(FeatureName, f64)> {
        let mut counts = [0usize; FEATURE_COUNT];
        for tree in &self.trees {
            for feature in tree.split_features() {
                if let Some(i) = FeatureName::ALL.iter().position(|&f| f == feature) {
                    counts[i] += 1;
                }
            }
        }
        let total: usize = counts.iter().sum();
        FeatureName::ALL
            .iter()
            .zip(counts.iter())
            .map(|(&name, &c)| {
                let share = if total == 0 {
                    0.0
                } else {
                    c as f64 / total as f64
                };
                (name, share)
            })
            .collect()
    }

    /// Fraction of samples whose predicted tier matches the label.
    pub fn accuracy(&self, samples: &[LabeledSample]) -> Result<f64> {
        if samples.is_empty() {
            return Err(EngineError::EmptyData);
        }
        let mut correct = 0usize;
        for s in samples {
            if self.predict(&s.features)? == s.label {
                correct += 1;
            }
        }
        Ok(correct as f64 / samples.len() as f64)
    }
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(RandomForestConfig::default())
    }
}

impl RiskClassifier for RandomForest {
    fn fit(&mut self, samples: &[LabeledSample]) -> Result<()> {
        self.config.validate()?;
        if samples.is_empty() {
            return Err(EngineError::EmptyData);
        }
        if samples
            .iter()
            .any(|s| FeatureName::ALL.iter().any(|&f| !s.features.get(f).is_finite()))
        {
            return Err(EngineError::invalid("non-finite feature in training data"));
        }

        let params = TreeParams {
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split,
            max_features: self.config.effective_max_features(),
        };
        let n = samples.len();
        let mut rng = seeded_rng(self.config.seed);
        let tree_seeds: Vec<u64> = (0..self.config.num_trees).map(|_| rng.gen()).collect();

        let trees: Vec<DecisionTree> = tree_seeds
            .par_iter()
            .map(|&seed| {
                let mut tree_rng = StdRng::seed_from_u64(seed);
                let bootstrap: Vec<usize> = (0..n).map(|_| tree_rng.gen_range(0..n)).collect();
                DecisionTree::fit(samples, &bootstrap, params, &mut tree_rng)
            })
            .collect();

        debug!(
            trees = trees.len(),
            samples = n,
            max_features = params.max_features,
            "random forest fitted"
        );

        self.trees = trees;
        Ok(())
    }

    /// Vote share of each tier across all trees.
    fn predict_proba(&self, features: &ClassificationFeatures) -> Result<ClassProbabilities> {
        if self.trees.is_empty() {
            return Err(EngineError::FitRequired);
        }
        let mut votes = [0.0; 4];
        for tree in &self.trees {
            votes[tree.predict(features).index()] += 1.0;
        }
        Ok(ClassProbabilities::from_weights(votes))
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    fn name(&self) -> &str {
        "RandomForest"
    }
}
