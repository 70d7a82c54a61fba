//! Seedable random number generation.
//!
//! All stochastic entry points of the crate take an explicit generator so
//! that runs are reproducible from a single `u64` seed.

use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Creates a deterministic generator from a seed.
pub fn create_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Creates a generator from an optional seed, falling back to entropy.
pub fn create_rng_opt(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => create_rng(seed),
        None => create_rng(rand::random()),
    }
}
