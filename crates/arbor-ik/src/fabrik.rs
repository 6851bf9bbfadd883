//! Forward and backward reaching (FABRIK).
//!
//! The solver works on a copy of the joint positions and only touches the
//! accessor at the end, turning each joint (base first) so its bone points
//! where the solved positions say. Bone lengths are reimposed on every
//! pass, so the rotations reproduce the solved positions exactly.

use nalgebra::Vector3;

use arbor_core::SolverConfig;

use crate::accessor::JointAccessor;
use crate::chain::JointChain;
use crate::geometry::{MIN_LENGTH, safe_normalize, shortest_arc};
use crate::solver::IkResult;

/// Solve by repositioning joints, then realize the positions as rotations.
///
/// A target beyond the chain's reach stretches the chain straight toward
/// it in one pass. Otherwise forward/backward passes toward the stable
/// target repeat until the effector is within tolerance or the FABRIK cap
/// is spent.
pub fn solve<A: JointAccessor>(
    accessor: &mut A,
    chain: &JointChain<A::Joint>,
    target: &Vector3<f32>,
    config: &SolverConfig,
) -> IkResult {
    let stable = chain.stable_target(accessor, target, config.epsilon);
    let lengths = chain.bone_lengths();
    let rest = chain.positions(accessor);
    let mut points = rest.clone();
    let last = points.len() - 1;
    let base = rest[0];

    let mut iterations = 0;
    if (target - base).norm() > chain.total_length() {
        for i in 0..last {
            let toward_target = target - points[i];
            let distance = toward_target.norm();
            points[i + 1] = if distance > MIN_LENGTH {
                let lambda = lengths[i] / distance;
                points[i] * (1.0 - lambda) + target * lambda
            } else {
                place(&points[i], &points[i + 1], lengths[i], &(rest[i + 1] - rest[i]))
            };
        }
        iterations = 1;
    } else {
        let mut error = (points[last] - stable).norm();
        while error > config.tolerance && iterations < config.max_iterations.fabrik {
            iterations += 1;

            points[last] = stable;
            for i in (0..last).rev() {
                points[i] = place(&points[i + 1], &points[i], lengths[i], &(rest[i] - rest[i + 1]));
            }

            points[0] = base;
            for i in 0..last {
                points[i + 1] =
                    place(&points[i], &points[i + 1], lengths[i], &(rest[i + 1] - rest[i]));
            }

            error = (points[last] - stable).norm();
            log::trace!("fabrik pass {iterations}: error {error:.6}");
        }
    }

    apply_positions(accessor, chain, &points);

    let error = chain.effector_error(accessor, &stable);
    let converged = error <= config.tolerance;
    if !converged {
        log::debug!("fabrik: stopped after {iterations} passes, error {error:.6}");
    }
    IkResult {
        iterations,
        converged,
        error,
        target: stable,
    }
}

/// Point at `length` from `anchor` in the direction of `toward`. Falls back
/// to `fallback` when the two points coincide.
fn place(
    anchor: &Vector3<f32>,
    toward: &Vector3<f32>,
    length: f32,
    fallback: &Vector3<f32>,
) -> Vector3<f32> {
    let direction = safe_normalize(&(toward - anchor))
        .or_else(|| safe_normalize(fallback))
        .unwrap_or_else(Vector3::x);
    anchor + direction * length
}

/// Rotate each joint, base first, so the next joint lands on `points`.
fn apply_positions<A: JointAccessor>(
    accessor: &mut A,
    chain: &JointChain<A::Joint>,
    points: &[Vector3<f32>],
) {
    for (i, pair) in chain.joints().windows(2).enumerate() {
        let (joint, child) = (pair[0], pair[1]);
        let pivot = accessor.position(joint);
        let current = accessor.position(child) - pivot;
        let desired = points[i + 1] - pivot;
        accessor.rotate_global(joint, &shortest_arc(&current, &desired));
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

    fn assert_lengths_kept(skeleton: &Skeleton, chain: &JointChain<JointId>) {
        let p = chain.positions(skeleton);
        for (i, length) in chain.bone_lengths().iter().enumerate() {
            assert_relative_eq!((p[i + 1] - p[i]).norm(), *length, epsilon = 1e-3);
        }
    }

    #[test]
    fn reaches_reachable_target() {
        let (mut skeleton, chain) = line(5);
        let target = Vector3::new(1.0, 2.0, -1.0);
        let config = SolverConfig::with_algorithm(Algorithm::Fabrik);
        let result = solve(&mut skeleton, &chain, &target, &config);
        assert!(result.converged, "error {}", result.error);
        let effector = skeleton.position(chain.effector());
        assert!((effector - target).norm() <= 2.0 * config.tolerance);
        assert_lengths_kept(&skeleton, &chain);
    }

    #[test]
    fn error_never_increases_between_passes() {
        let target = Vector3::new(-1.0, 1.5, 1.0);
        let mut previous = f32::INFINITY;
        for cap in 0..12 {
            let (mut skeleton, chain) = line(5);
            let mut config = SolverConfig::with_algorithm(Algorithm::Fabrik);
            config.max_iterations.fabrik = cap;
            let result = solve(&mut skeleton, &chain, &target, &config);
            assert!(
                result.error <= previous + 1e-5,
                "cap {cap}: {} > {previous}",
                result.error
            );
            previous = result.error;
        }
    }

    #[test]
    fn unreachable_target_stretches_chain() {
        let (mut skeleton, chain) = line(5);
        let target = Vector3::new(0.0, 10.0, 0.0);
        let result = solve(&mut skeleton, &chain, &target, &SolverConfig::default());
        assert_eq!(result.iterations, 1);
        let p = chain.positions(&skeleton);
        for (i, point) in p.iter().enumerate() {
            assert_relative_eq!(point.x, 0.0, epsilon = 1e-4);
            assert_relative_eq!(point.y, i as f32, epsilon = 1e-4);
        }
        assert!(result.converged);
    }

    #[test]
    fn base_stays_put() {
        let (mut skeleton, chain) = line(4);
        solve(
            &mut skeleton,
            &chain,
            &Vector3::new(-0.5, 0.5, 1.5),
            &SolverConfig::default(),
        );
        assert_eq!(skeleton.position(chain.base()), Vector3::zeros());
        assert_lengths_kept(&skeleton, &chain);
    }

    #[test]
    fn target_behind_straight_chain_stays_finite() {
        let (mut skeleton, chain) = line(4);
        let result = solve(
            &mut skeleton,
            &chain,
            &Vector3::new(-1.0, 0.0, 0.0),
            &SolverConfig::default(),
        );
        assert!(result.error.is_finite());
        assert!(result.error < 1.0);
    }

    #[test]
    fn place_uses_fallback_for_coincident_points() {
        let p = place(
            &Vector3::zeros(),
            &Vector3::zeros(),
            2.0,
            &Vector3::new(0.0, 0.0, 3.0),
        );
        assert_relative_eq!(p, Vector3::new(0.0, 0.0, 2.0));
    }
}
