//! Shared test fixtures and utilities for arbor crates.
//!
//! Provides deterministic RNG setup, random matrices for the SVD suites and
//! ready-made joint chains for the solver suites.

pub mod rng;
pub mod spawn;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use rng::{random_matrix, seeded_rng};
pub use spawn::{ChainFixture, bent_chain, straight_chain, zigzag_chain};
