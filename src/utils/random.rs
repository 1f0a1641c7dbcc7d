//! Seedable random source for tree construction.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Create a generator from an optional seed.
///
/// `Some(seed)` gives a reproducible stream; `None` seeds from OS entropy.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
