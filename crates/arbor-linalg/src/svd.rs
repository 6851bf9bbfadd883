//! Approximate singular value decomposition by power iteration and deflation.
//!
//! For a matrix `A` with `k = min(rows, cols)`, components are extracted one
//! at a time from a working copy of `A`:
//!
//! ```text
//! G  = WᵀW  (rows > cols)  or  WWᵀ  (otherwise)
//! x  ← normalize(G x)      until |x·x_prev| > 1 - ε  or the cap is hit
//! σ  = |W v|  or  |Wᵀ u|   (whichever vector was not iterated)
//! W  ← W - σ u vᵀ
//! ```
//!
//! This is **not** an exact SVD. Components come out in extraction order,
//! which is usually but not necessarily descending. The convergence test only
//! looks at how much successive vectors still move, so with repeated or
//! near-equal singular values it can stop on a mix of the corresponding
//! singular vectors. Deflation keeps the reconstruction `Σ σ u vᵀ` faithful
//! even then; the individual vectors are what suffers.

use rand::Rng;

use arbor_core::DimensionError;

use crate::matrix::Matrix;

/// Stopping rule for the power iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SvdConfig {
    /// Iteration cap per component.
    pub max_iterations: u32,
    /// Stop once `|dot(x_new, x_prev)| > 1 - convergence`.
    pub convergence: f32,
}

impl Default for SvdConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1024,
            convergence: 1e-6,
        }
    }
}

/// One `(u, σ, v)` triple. `u` is `rows x 1`, `v` is `cols x 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct SingularComponent {
    pub u: Matrix,
    pub sigma: f32,
    pub v: Matrix,
}

impl SingularComponent {
    /// `v uᵀ`, the component's contribution shape for inverses.
    fn v_ut(&self) -> Result<Matrix, DimensionError> {
        self.v.matmul(&self.u.transpose())
    }
}

/// Result of [`svd`].
#[derive(Debug, Clone, PartialEq)]
pub struct Svd {
    rows: usize,
    cols: usize,
    components: Vec<SingularComponent>,
}

impl Svd {
    /// Components in extraction order.
    pub fn components(&self) -> &[SingularComponent] {
        &self.components
    }

    pub fn singular_values(&self) -> Vec<f32> {
        self.components.iter().map(|c| c.sigma).collect()
    }

    /// Shape of the decomposed matrix.
    pub const fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// `Σ σ u vᵀ`.
    pub fn reconstruct(&self) -> Result<Matrix, DimensionError> {
        let mut res = Matrix::zeros(self.rows, self.cols);
        for c in &self.components {
            res = res.add(&c.u.matmul(&c.v.transpose())?.scale(c.sigma))?;
        }
        Ok(res)
    }

    /// Moore-Penrose pseudoinverse `Σ (1/σ) v uᵀ` over components with
    /// `σ > tolerance`. The rest are treated as null space.
    pub fn pseudoinverse(&self, tolerance: f32) -> Result<Matrix, DimensionError> {
        let mut res = Matrix::zeros(self.cols, self.rows);
        for c in self.components.iter().filter(|c| c.sigma > tolerance) {
            res = res.add(&c.v_ut()?.scale(1.0 / c.sigma))?;
        }
        Ok(res)
    }

    /// Damped pseudoinverse `Σ σ/(σ² + λ²) v uᵀ`.
    pub fn damped_pseudoinverse(&self, damping: f32) -> Result<Matrix, DimensionError> {
        let lambda_sq = damping * damping;
        let mut res = Matrix::zeros(self.cols, self.rows);
        for c in &self.components {
            let denom = c.sigma * c.sigma + lambda_sq;
            if denom > 0.0 {
                res = res.add(&c.v_ut()?.scale(c.sigma / denom))?;
            }
        }
        Ok(res)
    }
}

/// Decompose `a` into `min(rows, cols)` components.
///
/// `rng` supplies the random starting vector of every power iteration.
pub fn svd<R: Rng + ?Sized>(
    a: &Matrix,
    config: &SvdConfig,
    rng: &mut R,
) -> Result<Svd, DimensionError> {
    let k = a.rows().min(a.cols());
    let mut working = a.clone();
    let mut components = Vec::with_capacity(k);

    for _ in 0..k {
        let component = dominant_component(&working, config, rng)?;
        let rank_one = component
            .u
            .matmul(&component.v.transpose())?
            .scale(component.sigma);
        working = working.sub(&rank_one)?;
        components.push(component);
    }

    Ok(Svd {
        rows: a.rows(),
        cols: a.cols(),
        components,
    })
}

impl Matrix {
    /// Shorthand for [`svd`].
    pub fn svd<R: Rng + ?Sized>(
        &self,
        config: &SvdConfig,
        rng: &mut R,
    ) -> Result<Svd, DimensionError> {
        svd(self, config, rng)
    }

    /// Pseudoinverse through the approximate SVD, dropping `σ <= tolerance`.
    pub fn pseudoinverse<R: Rng + ?Sized>(
        &self,
        tolerance: f32,
        config: &SvdConfig,
        rng: &mut R,
    ) -> Result<Self, DimensionError> {
        svd(self, config, rng)?.pseudoinverse(tolerance)
    }
}

/// Largest remaining component of `w`.
fn dominant_component<R: Rng + ?Sized>(
    w: &Matrix,
    config: &SvdConfig,
    rng: &mut R,
) -> Result<SingularComponent, DimensionError> {
    let wt = w.transpose();
    let tall = w.rows() > w.cols();
    let gram = if tall { wt.matmul(w)? } else { w.matmul(&wt)? };

    let iterated = power_iteration(&gram, config, rng)?;
    let paired = if tall {
        w.matmul(&iterated)?
    } else {
        wt.matmul(&iterated)?
    };

    let sigma = paired.norm();
    let paired = if sigma > f32::MIN_POSITIVE {
        paired.scale(1.0 / sigma)
    } else {
        Matrix::zeros(paired.rows(), 1)
    };

    let (u, v) = if tall {
        (paired, iterated)
    } else {
        (iterated, paired)
    };
    Ok(SingularComponent { u, sigma, v })
}

/// Dominant eigenvector of a symmetric positive semi-definite `gram`.
fn power_iteration<R: Rng + ?Sized>(
    gram: &Matrix,
    config: &SvdConfig,
    rng: &mut R,
) -> Result<Matrix, DimensionError> {
    let mut current = Matrix::zeros(gram.rows(), 1);
    current.randomize(rng, -1.0, 1.0);
    current.normalize();

    for _ in 0..config.max_iterations {
        let mut next = gram.matmul(&current)?;
        if next.norm() <= f32::MIN_POSITIVE {
            // Nothing left in this direction: the remaining matrix is zero.
            break;
        }
        next.normalize();
        let similarity = next.dot(&current)?.abs();
        current = next;
        if similarity > 1.0 - config.convergence {
            break;
        }
    }
    Ok(current)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
