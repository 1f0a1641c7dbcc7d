//! Numeric and randomness helpers shared by the models.

pub mod random;
pub mod stats;

pub use random::seeded_rng;
pub use stats::{mean, median, quantile_normal, z_score};
