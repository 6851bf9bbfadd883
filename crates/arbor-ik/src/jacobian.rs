//! Jacobian-based iterative solvers.
//!
//! Every iteration linearizes the chain around its current pose. Joint `i`
//! turns about the axis that would swing the effector straight at the
//! target, so its column is the effector velocity for a unit angle rate:
//!
//! ```text
//! r_i      = effector - p_i
//! axis_i   = normalize(r_i x (target - p_i))
//! J[:, i]  = axis_i x r_i
//! d        = target - effector
//! ```
//!
//! The three variants differ only in how a step of joint angles is derived
//! from `J` and `d` (see [`JacobianMethod`]). A step whose largest angle
//! exceeds `max_step` is scaled down as a whole, keeping its direction,
//! then shortened by halving until the effector error drops.

use nalgebra::{UnitQuaternion, Vector3};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use arbor_core::{DimensionError, SolverConfig};
use arbor_linalg::{Matrix, SvdConfig};

use crate::accessor::JointAccessor;
use crate::chain::JointChain;
use crate::geometry::{any_perpendicular, axis_angle, safe_normalize};
use crate::solver::IkResult;

/// How a Jacobian step is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JacobianMethod {
    /// `α Jᵀ d` with the step length that minimizes the linearized error.
    Transpose,
    /// `J⁺ d`, dropping singular values at or below `epsilon`.
    Pseudoinverse,
    /// `Σ σ / (σ² + λ²) v uᵀ d`.
    DampedLeastSquares,
}

/// Iterate Jacobian steps until the effector is within tolerance of the
/// stable target, the Jacobian cap is spent, or no step makes progress.
///
/// # Errors
///
/// Propagates a [`DimensionError`] from the matrix engine. With a
/// well-formed chain the shapes always agree.
pub fn solve<A: JointAccessor>(
    accessor: &mut A,
    chain: &JointChain<A::Joint>,
    target: &Vector3<f32>,
    config: &SolverConfig,
    method: JacobianMethod,
) -> Result<IkResult, DimensionError> {
    let stable = chain.stable_target(accessor, target, config.epsilon);
    let movable = &chain.joints()[..chain.joint_count() - 1];
    let svd_config = SvdConfig {
        max_iterations: config.max_iterations.svd,
        convergence: config.svd_convergence,
    };
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

    let mut error = chain.effector_error(accessor, &stable);
    let mut iterations = 0;
    while error > config.tolerance && iterations < config.max_iterations.jacobian {
        iterations += 1;

        let effector = accessor.position(chain.effector());
        let (jacobian, axes) = build(accessor, movable, &effector, &stable);
        let delta = Matrix::from_vector3(&(stable - effector));

        let Some(step) = compute_step(method, &jacobian, &delta, config, &svd_config, &mut rng)?
        else {
            log::debug!("jacobian: no usable step at iteration {iterations}");
            break;
        };
        let step = limit_step(step.as_slice(), config.max_step);

        match line_search(accessor, chain, &axes, &step, &stable, error, config) {
            Some(improved) => error = improved,
            None => {
                log::debug!("jacobian: step did not reduce error at iteration {iterations}");
                break;
            }
        }
        log::trace!("jacobian iteration {iterations}: error {error:.6}");
    }

    let converged = error <= config.tolerance;
    if !converged {
        log::debug!(
            "jacobian ({method:?}): stopped after {iterations} iterations, error {error:.6}"
        );
    }
    Ok(IkResult {
        iterations,
        converged,
        error,
        target: stable,
    })
}

/// The 3 x n Jacobian and the rotation axis behind each column.
fn build<A: JointAccessor>(
    accessor: &A,
    movable: &[A::Joint],
    effector: &Vector3<f32>,
    target: &Vector3<f32>,
) -> (Matrix, Vec<Vector3<f32>>) {
    let mut jacobian = Matrix::zeros(3, movable.len());
    let mut axes = Vec::with_capacity(movable.len());
    for (col, &joint) in movable.iter().enumerate() {
        let pivot = accessor.position(joint);
        let r = effector - pivot;
        let axis = safe_normalize(&r.cross(&(target - pivot)))
            .unwrap_or_else(|| any_perpendicular(&r));
        let column = axis.cross(&r);
        for row in 0..3 {
            jacobian[(row, col)] = column[row];
        }
        axes.push(axis);
    }
    (jacobian, axes)
}

/// One angle per movable joint, or `None` when the method has nothing to
/// offer (transpose with a vanishing `J Jᵀ d`).
fn compute_step<R: rand::Rng + ?Sized>(
    method: JacobianMethod,
    jacobian: &Matrix,
    delta: &Matrix,
    config: &SolverConfig,
    svd_config: &SvdConfig,
    rng: &mut R,
) -> Result<Option<Matrix>, DimensionError> {
    let step = match method {
        JacobianMethod::Transpose => {
            let jt_d = jacobian.transpose().matmul(delta)?;
            let j_jt_d = jacobian.matmul(&jt_d)?;
            let denominator = j_jt_d.dot(&j_jt_d)?;
            if denominator <= config.epsilon {
                return Ok(None);
            }
            let alpha = delta.dot(&j_jt_d)? / denominator;
            jt_d.scale(alpha)
        }
        JacobianMethod::Pseudoinverse => jacobian
            .svd(svd_config, rng)?
            .pseudoinverse(config.epsilon)?
            .matmul(delta)?,
        JacobianMethod::DampedLeastSquares => jacobian
            .svd(svd_config, rng)?
            .damped_pseudoinverse(config.damping)?
            .matmul(delta)?,
    };
    Ok(step.is_finite().then_some(step))
}

/// Scale `step` uniformly so no angle exceeds `max_step`.
fn limit_step(step: &[f32], max_step: f32) -> Vec<f32> {
    let largest = step.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
    let shrink = if largest > max_step {
        max_step / largest
    } else {
        1.0
    };
    step.iter().map(|s| s * shrink).collect()
}

/// Apply `step`, halving it until the error does not grow. Returns the new
/// error, or `None` (with the pose restored) if every attempt made it worse.
fn line_search<A: JointAccessor>(
    accessor: &mut A,
    chain: &JointChain<A::Joint>,
    axes: &[Vector3<f32>],
    step: &[f32],
    target: &Vector3<f32>,
    error: f32,
    config: &SolverConfig,
) -> Option<f32> {
    let movable = &chain.joints()[..axes.len()];
    let saved: Vec<UnitQuaternion<f32>> =
        movable.iter().map(|&j| accessor.local_rotation(j)).collect();

    let mut scale = 1.0;
    for _ in 0..=config.max_iterations.line_search {
        apply(accessor, movable, axes, step, scale);
        let trial = chain.effector_error(accessor, target);
        if trial < error {
            return Some(trial);
        }
        restore(accessor, movable, &saved);
        scale *= 0.5;
    }
    None
}

/// Rotate each joint about its axis, effector side first. Axes were taken
/// on the pose before the step, so they are applied in the world frame.
fn apply<A: JointAccessor>(
    accessor: &mut A,
    movable: &[A::Joint],
    axes: &[Vector3<f32>],
    step: &[f32],
    scale: f32,
) {
    for ((&joint, axis), angle) in movable.iter().zip(axes).zip(step).rev() {
        accessor.rotate_global(joint, &axis_angle(axis, angle * scale));
    }
}

fn restore<A: JointAccessor>(
    accessor: &mut A,
    movable: &[A::Joint],
    saved: &[UnitQuaternion<f32>],
) {
    for (&joint, rotation) in movable.iter().zip(saved) {
        let current = accessor.local_rotation(joint);
        accessor.rotate_local(joint, &(current.inverse() * rotation));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
