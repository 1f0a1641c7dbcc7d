//! Isolation forest over a stream of scalar values.
//!
//! Outliers are isolated by fewer random splits than typical values, so their
//! average path length through the ensemble is shorter.

use super::AnomalyDetector;
use crate::error::{EngineError, Result};
use crate::utils::seeded_rng;
use rand::seq::index::sample;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

const EULER_GAMMA: f64 = 0.5772156649;

/// Average path length of an unsuccessful binary-search-tree lookup over `n`
/// points; the normalizer for isolation-tree depths.
///
/// `c(n) = 2(ln(n-1) + γ) - 2(n-1)/n` for `n > 1`, otherwise 0.
pub fn average_path_length(n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let n = n as f64;
    2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
}

/// Isolation forest configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolationForestConfig {
    /// Number of trees in the ensemble.
    pub num_trees: usize,
    /// Points drawn (without replacement) for each tree; capped at data length.
    pub sub_sampling_size: usize,
    /// Maximum depth of a tree.
    pub max_depth: usize,
    /// Random seed for reproducibility (None for entropy).
    pub seed: Option<u64>,
}

impl Default for IsolationForestConfig {
    fn default() -> Self {
        Self {
            num_trees: 100,
            sub_sampling_size: 256,
            max_depth: 8,
            seed: None,
        }
    }
}

impl IsolationForestConfig {
    pub fn with_num_trees(mut self, num_trees: usize) -> Self {
        self.num_trees = num_trees;
        self
    }

    pub fn with_sub_sampling_size(mut self, size: usize) -> Self {
        self.sub_sampling_size = size;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_trees == 0 {
            return Err(EngineError::invalid("num_trees must be positive"));
        }
        if self.sub_sampling_size < 2 {
            return Err(EngineError::invalid("sub_sampling_size must be at least 2"));
        }
        if self.max_depth == 0 {
            return Err(EngineError::invalid("max_depth must be positive"));
        }
        Ok(())
    }
}

/// A node of an isolation tree.
#[derive(Debug, Clone)]
enum IsolationTree {
    Split {
        threshold: f64,
        left: Box<IsolationTree>,
        right: Box<IsolationTree>,
    },
    /// Leaf holding the number of training points that reached it.
    Leaf { size: usize },
}

impl IsolationTree {
    /// Split on a threshold drawn uniformly between the node's min and max
    /// until `max_depth` is reached or at most one point remains.
    fn build(data: &[f64], depth: usize, max_depth: usize, rng: &mut impl Rng) -> Self {
        if depth >= max_depth || data.len() <= 1 {
            return IsolationTree::Leaf { size: data.len() };
        }

        let min = data.iter().copied().fold(f64::INFINITY, f64::min);
        let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if max - min <= f64::EPSILON * max.abs().max(1.0) {
            // identical values cannot be separated
            return IsolationTree::Leaf { size: data.len() };
        }

        // weighted form stays finite when max - min overflows
        let u: f64 = rng.gen();
        let threshold = min * (1.0 - u) + max * u;
        let (left, right): (Vec<f64>, Vec<f64>) = data.iter().partition(|&&v| v < threshold);

        IsolationTree::Split {
            threshold,
            left: Box::new(Self::build(&left, depth + 1, max_depth, rng)),
            right: Box::new(Self::build(&right, depth + 1, max_depth, rng)),
        }
    }

    /// Depth at which `value` lands, plus the expected depth of the leaf's
    /// remaining points.
    fn path_length(&self, value: f64) -> f64 {
        let mut node = self;
        let mut depth = 0usize;
        loop {
            match node {
                IsolationTree::Leaf { size } => {
                    return depth as f64 + average_path_length(*size);
                }
                IsolationTree::Split {
                    threshold,
                    left,
                    right,
                } => {
                    node = if value < *threshold { left } else { right };
                    depth += 1;
                }
            }
        }
    }
}

/// Isolation forest anomaly detector.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    config: IsolationForestConfig,
    trees: Vec<IsolationTree>,
    /// Effective per-tree sample size after capping at data length.
    sample_size: usize,
}

impl IsolationForest {
    pub fn new(config: IsolationForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            sample_size: 0,
        }
    }

    pub fn config(&self) -> &IsolationForestConfig {
        &self.config
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Per-tree sample size used at fit time.
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Mean path length of `value` across all trees.
    pub fn average_path(&self, value: f64) -> Result<f64> {
        if self.trees.is_empty() {
            return Err(EngineError::FitRequired);
        }
        let total: f64 = self.trees.iter().map(|t| t.path_length(value)).sum();
        Ok(total / self.trees.len() as f64)
    }
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new(IsolationForestConfig::default())
    }
}

impl AnomalyDetector for IsolationForest {
    fn fit(&mut self, values: &[f64]) -> Result<()> {
        self.config.validate()?;
        if values.len() < 2 {
            return Err(EngineError::InsufficientData {
                needed: 2,
                got: values.len(),
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(EngineError::invalid("non-finite value in training data"));
        }

        let sample_size = self.config.sub_sampling_size.min(values.len());
        let mut rng = seeded_rng(self.config.seed);

        let trees = (0..self.config.num_trees)
            .map(|_| {
                let subsample: Vec<f64> = sample(&mut rng, values.len(), sample_size)
                    .into_iter()
                    .map(|i| values[i])
                    .collect();
                IsolationTree::build(&subsample, 0, self.config.max_depth, &mut rng)
            })
            .collect();

        debug!(
            trees = self.config.num_trees,
            sample_size,
            points = values.len(),
            "isolation forest fitted"
        );

        self.trees = trees;
        self.sample_size = sample_size;
        Ok(())
    }

    /// Anomaly score `2^(-E[h(x)] / c(ψ))` in `[0, 1]`; higher is more anomalous.
    fn score(&self, value: f64) -> Result<f64> {
        let avg_path = self.average_path(value)?;
        let normalizer = average_path_length(self.sample_size);
        if normalizer <= 0.0 {
            return Err(EngineError::ComputationError(
                "sample size too small to normalize path length".to_string(),
            ));
        }
        Ok(2.0_f64.powf(-avg_path / normalizer))
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    fn name(&self) -> &str {
        "IsolationForest"
    }
}
