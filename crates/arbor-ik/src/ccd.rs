//! Cyclic coordinate descent.
//!
//! Each sweep visits the joints from the effector's parent down to the base
//! and turns each one so the effector lies on the ray from that joint to the
//! target. A single turn can only shorten the effector's distance to the
//! target, so the error never grows between sweeps.

use nalgebra::Vector3;

use arbor_core::SolverConfig;

use crate::accessor::JointAccessor;
use crate::chain::JointChain;
use crate::geometry::{axis_angle, clamped_acos, safe_normalize};
use crate::solver::IkResult;

/// Run CCD sweeps until the effector is within tolerance of the stable
/// target or the CCD cap is spent.
pub fn solve<A: JointAccessor>(
    accessor: &mut A,
    chain: &JointChain<A::Joint>,
    target: &Vector3<f32>,
    config: &SolverConfig,
) -> IkResult {
    let stable = chain.stable_target(accessor, target, config.epsilon);
    let effector = chain.effector();
    let movable = &chain.joints()[..chain.joint_count() - 1];

    let mut error = chain.effector_error(accessor, &stable);
    let mut iterations = 0;
    while error > config.tolerance && iterations < config.max_iterations.ccd {
        iterations += 1;
        for &joint in movable.iter().rev() {
            let pivot = accessor.position(joint);
            let (Some(to_end), Some(to_target)) = (
                safe_normalize(&(accessor.position(effector) - pivot)),
                safe_normalize(&(stable - pivot)),
            ) else {
                continue;
            };
            let axis = to_end.cross(&to_target);
            if axis.norm() <= config.epsilon {
                continue;
            }
            let angle = clamped_acos(to_end.dot(&to_target));
            accessor.rotate_global(joint, &axis_angle(&axis, angle));
        }
        error = chain.effector_error(accessor, &stable);
        log::trace!("ccd sweep {iterations}: error {error:.6}");
    }

    let converged = error <= config.tolerance;
    if !converged {
        log::debug!("ccd: stopped after {iterations} sweeps, error {error:.6}");
    }
    IkResult {
        iterations,
        converged,
        error,
        target: stable,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::{JointId, Skeleton};
    use approx::assert_relative_eq;
    use arbor_core::Algorithm;

    fn line(count: usize) -> (Skeleton, JointChain<JointId>) {
        let points: Vec<_> = (0..count)
            .map(|i| Vector3::new(i as f32, 0.0, 0.0))
            .collect();
        let (skeleton, ids) = Skeleton::from_positions(&points);
        let chain = JointChain::build(&skeleton, ids[0], ids[count - 1]).unwrap();
        (skeleton, chain)
    }

    fn config_with_cap(cap: u32) -> SolverConfig {
        let mut config = SolverConfig::with_algorithm(Algorithm::Ccd);
        config.max_iterations.ccd = cap;
        config
    }

    #[test]
    fn reaches_reachable_target() {
        let (mut skeleton, chain) = line(5);
        let target = Vector3::new(1.5, 2.0, 0.5);
        let config = SolverConfig::with_algorithm(Algorithm::Ccd);
        let result = solve(&mut skeleton, &chain, &target, &config);
        assert!(result.converged, "error {}", result.error);
        assert!(result.error <= config.tolerance);
        assert_relative_eq!(result.target, target);
    }

    #[test]
    fn error_never_increases_between_sweeps() {
        let target = Vector3::new(-1.0, 1.5, 1.0);
        let mut previous = f32::INFINITY;
        for cap in 0..12 {
            let (mut skeleton, chain) = line(5);
            let result = solve(&mut skeleton, &chain, &target, &config_with_cap(cap));
            assert!(
                result.error <= previous + 1e-5,
                "cap {cap}: {} > {previous}",
                result.error
            );
            previous = result.error;
        }
    }

    #[test]
    fn preserves_bone_lengths() {
        let (mut skeleton, chain) = line(5);
        solve(
            &mut skeleton,
            &chain,
            &Vector3::new(0.5, -2.5, 1.0),
            &SolverConfig::default(),
        );
        let p = chain.positions(&skeleton);
        for (i, length) in chain.bone_lengths().iter().enumerate() {
            assert_relative_eq!((p[i + 1] - p[i]).norm(), *length, epsilon = 1e-3);
        }
    }

    #[test]
    fn already_solved_does_no_work() {
        let (mut skeleton, chain) = line(3);
        let result = solve(
            &mut skeleton,
            &chain,
            &Vector3::new(2.0, 0.0, 0.0),
            &SolverConfig::default(),
        );
        assert_eq!(result.iterations, 0);
        assert!(result.converged);
    }

    #[test]
    fn target_on_base_stays_finite() {
        let (mut skeleton, chain) = line(4);
        let result = solve(&mut skeleton, &chain, &Vector3::zeros(), &config_with_cap(64));
        assert!(result.error.is_finite());
        assert!(
            chain
                .positions(&skeleton)
                .iter()
                .all(|p| p.iter().all(|v| v.is_finite()))
        );
    }
}
