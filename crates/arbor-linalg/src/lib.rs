//! Minimal dense linear algebra for the Jacobian IK solvers.
//!
//! [`Matrix`] is a fixed-shape `f32` container with checked elementwise and
//! matrix operations. [`svd`] is an approximate singular value decomposition
//! by power iteration with deflation, enough to build pseudoinverses of small
//! Jacobians. Neither aims to be a general-purpose linear algebra library.

pub mod matrix;
pub mod svd;

pub use matrix::Matrix;
pub use svd::{SingularComponent, Svd, SvdConfig, svd};
