//! CART decision tree with Gini impurity over [`ClassificationFeatures`].

use super::features::{FeatureName, FEATURE_COUNT};
use super::{ClassificationFeatures, LabeledSample};
use crate::core::RiskLevel;
use rand::seq::index::sample;
use rand::Rng;

/// Gains at or below this are treated as no improvement.
const MIN_GAIN: f64 = 1e-12;

/// Per-class sample counts indexed by [`RiskLevel::index`].
pub type ClassCounts = [usize; 4];

/// Gini impurity `1 - Σ p_k²` of a class distribution.
///
/// Zero for a pure (or empty) node, 0.75 for four balanced classes.
pub fn gini_impurity(counts: &ClassCounts) -> f64 {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

/// Impurity decrease of splitting `parent` into `left` and `right`.
pub fn information_gain(parent: &ClassCounts, left: &ClassCounts, right: &ClassCounts) -> f64 {
    let n_left: usize = left.iter().sum();
    let n_right: usize = right.iter().sum();
    let n = (n_left + n_right) as f64;
    if n == 0.0 {
        return 0.0;
    }
    gini_impurity(parent)
        - (n_left as f64 / n) * gini_impurity(left)
        - (n_right as f64 / n) * gini_impurity(right)
}

/// Most frequent class; ties go to the more severe level.
pub fn majority_class(counts: &ClassCounts) -> RiskLevel {
    let mut best = 0;
    for (i, &c) in counts.iter().enumerate() {
        if c > counts[best] {
            best = i;
        }
    }
    RiskLevel::ALL[best]
}

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Features considered at each split, drawn without replacement.
    pub max_features: usize,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(RiskLevel),
    Split {
        feature: FeatureName,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

struct Split {
    feature: FeatureName,
    threshold: f64,
    gain: f64,
}

/// A fitted classification tree. Values `<= threshold` go left.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    root: Node,
}

impl DecisionTree {
    /// Grow a tree on the samples selected by `indices` (repeats allowed).
    pub fn fit(
        samples: &[LabeledSample],
        indices: &[usize],
        params: TreeParams,
        rng: &mut impl Rng,
    ) -> Self {
        Self {
            root: grow(samples, indices, 0, params, rng),
        }
    }

    pub fn predict(&self, features: &ClassificationFeatures) -> RiskLevel {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf(level) => return *level,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if features.get(*feature) <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    /// Features used by every split node, one entry per split.
    pub fn split_features(&self) -> Vec<FeatureName> {
        let mut out = Vec::new();
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            if let Node::Split {
                feature,
                left,
                right,
                ..
            } = node
            {
                out.push(*feature);
                stack.push(left);
                stack.push(right);
            }
        }
        out
    }

    pub fn depth(&self) -> usize {
        fn depth_of(node: &Node) -> usize {
            match node {
                Node::Leaf(_) => 0,
                Node::Split { left, right, .. } => 1 + depth_of(left).max(depth_of(right)),
            }
        }
        depth_of(&self.root)
    }
}

fn class_counts(samples: &[LabeledSample], indices: &[usize]) -> ClassCounts {
    let mut counts = [0usize; 4];
    for &i in indices {
        counts[samples[i].label.index()] += 1;
    }
    counts
}

fn grow(
    samples: &[LabeledSample],
    indices: &[usize],
    depth: usize,
    params: TreeParams,
    rng: &mut impl Rng,
) -> Node {
    let counts = class_counts(samples, indices);
    let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
    if pure || depth >= params.max_depth || indices.len() < params.min_samples_split {
        return Node::Leaf(majority_class(&counts));
    }

    let Some(split) = best_split(samples, indices, &counts, params.max_features, rng) else {
        return Node::Leaf(majority_class(&counts));
    };

    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .partition(|&&i| samples[i].features.get(split.feature) <= split.threshold);

    Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left: Box::new(grow(samples, &left, depth + 1, params, rng)),
        right: Box::new(grow(samples, &right, depth + 1, params, rng)),
    }
}

/// Search a random feature subset for the split with the largest positive
/// gain. Candidate thresholds are the distinct observed values.
fn best_split(
    samples: &[LabeledSample],
    indices: &[usize],
    parent: &ClassCounts,
    max_features: usize,
    rng: &mut impl Rng,
) -> Option<Split> {
    let mut best: Option<Split> = None;
    let amount = max_features.clamp(1, FEATURE_COUNT);

    for f in sample(rng, FEATURE_COUNT, amount) {
        let feature = FeatureName::ALL[f];
        let mut column: Vec<(f64, usize)> = indices
            .iter()
            .map(|&i| (samples[i].features.get(feature), samples[i].label.index()))
            .collect();
        column.sort_by(|a, b| a.0.total_cmp(&b.0));

        // sweep thresholds left to right with running counts
        let mut left = [0usize; 4];
        for k in 0..column.len() - 1 {
            left[column[k].1] += 1;
            if column[k].0 == column[k + 1].0 {
                continue;
            }
            let mut right = *parent;
            for (r, l) in right.iter_mut().zip(left.iter()) {
                *r -= l;
            }
            let gain = information_gain(parent, &left, &right);
            if gain > MIN_GAIN && best.as_ref().map_or(true, |b| gain > b.gain) {
                best = Some(Split {
                    feature,
                    threshold: column[k].0,
                    gain,
                });
            }
        }
    }

    best
}
