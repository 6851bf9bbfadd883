//! Deterministic RNG utilities for reproducible tests.

use arbor_linalg::Matrix;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Create a deterministic `ChaCha8Rng` from a seed.
///
/// All test randomization should go through this to ensure reproducibility.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// A `rows x cols` matrix with entries uniform in `[-1, 1)`, reproducible
/// from `seed`.
pub fn random_matrix(rows: usize, cols: usize, seed: u64) -> Matrix {
    let mut m = Matrix::zeros(rows, cols);
    m.randomize(&mut seeded_rng(seed), -1.0, 1.0);
    m
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
