//! Integration test: drive every solver through `IkSolver` on fixture chains.
//!
//! Checks that:
//! 1. The two-bone solver lands a straight arm on a reachable target in one call
//! 2. CCD and FABRIK pull a 5-joint chain toward an out-of-reach target and
//!    stay finite
//! 3. Repeated ticks against a moving target keep bone lengths intact
//! 4. Every iterative solver tolerates a degenerate (target at base) setup

use approx::assert_relative_eq;
use arbor_core::{Algorithm, IkError, SolverConfig};
use arbor_ik::{IkSolver, JointAccessor};
use arbor_test_utils::{ChainFixture, bent_chain, straight_chain, zigzag_chain};
use nalgebra::Vector3;

const ITERATIVE: [Algorithm; 5] = [
    Algorithm::Ccd,
    Algorithm::Fabrik,
    Algorithm::JacobianTranspose,
    Algorithm::JacobianPseudoinverse,
    Algorithm::JacobianDls,
];

fn solver(algorithm: Algorithm) -> IkSolver {
    IkSolver::new(SolverConfig::with_algorithm(algorithm))
}

fn assert_finite(fixture: &ChainFixture) {
    for p in fixture.positions() {
        assert!(p.iter().all(|v| v.is_finite()), "non-finite joint {p:?}");
    }
}

fn assert_lengths(fixture: &ChainFixture, lengths: &[f32]) {
    let p = fixture.positions();
    for (i, length) in lengths.iter().enumerate() {
        assert_relative_eq!((p[i + 1] - p[i]).norm(), *length, epsilon = 1e-3);
    }
}

#[test]
fn two_bone_reaches_target_in_one_call() {
    let mut arm = straight_chain(3, 1.0);
    let (base, effector) = (arm.base(), arm.effector());
    let target = Vector3::new(1.9, 0.5, 0.0);
    let result = solver(Algorithm::TwoBone)
        .solve(&mut arm.skeleton, base, effector, &target)
        .unwrap();

    assert!(result.converged);
    let effector = arm.skeleton.position(effector);
    assert_relative_eq!(effector, target, epsilon = 1e-3);
}

#[test]
fn two_bone_on_bent_arm() {
    let mut arm = bent_chain(1.0, 0.6);
    let (base, effector) = (arm.base(), arm.effector());
    let target = Vector3::new(-0.3, 0.9, 0.6);
    let result = solver(Algorithm::TwoBone)
        .solve(&mut arm.skeleton, base, effector, &target)
        .unwrap();
    assert!(result.error < 1e-3, "error {}", result.error);
    assert_lengths(&arm, &[1.0, 0.6]);
}

#[test]
fn ccd_and_fabrik_approach_unreachable_target() {
    let raw_target = Vector3::new(10.0, 3.0, 0.0);
    for algorithm in [Algorithm::Ccd, Algorithm::Fabrik] {
        let mut fixture = straight_chain(5, 1.0);
        let (base, effector) = (fixture.base(), fixture.effector());
        let result = solver(algorithm)
            .solve(&mut fixture.skeleton, base, effector, &raw_target)
            .unwrap();

        assert_finite(&fixture);
        let effector = fixture.skeleton.position(effector);
        assert_relative_eq!(result.target.norm(), 4.0, epsilon = 1e-3);
        assert!(
            (effector - result.target).norm() < 0.05,
            "{algorithm}: effector {effector:?} far from stable target {:?}",
            result.target
        );
        assert!((effector - result.target).norm() < (effector - raw_target).norm());
        assert_lengths(&fixture, &[1.0; 4]);
    }
}

#[test]
fn iterative_solvers_reach_reachable_target() {
    let target = Vector3::new(1.0, 2.5, -0.5);
    for algorithm in ITERATIVE {
        let mut fixture = zigzag_chain(5);
        let (base, effector) = (fixture.base(), fixture.effector());
        let result = solver(algorithm)
            .solve(&mut fixture.skeleton, base, effector, &target)
            .unwrap();
        assert!(result.error < 0.01, "{algorithm}: error {}", result.error);
        assert_lengths(&fixture, &[1.0; 4]);
    }
}

#[test]
fn moving_target_over_many_ticks() {
    for algorithm in ITERATIVE {
        let mut fixture = straight_chain(4, 1.0);
        let (base, effector) = (fixture.base(), fixture.effector());
        let solver = solver(algorithm);
        for tick in 0..30 {
            let angle = tick as f32 * 0.2;
            let target = Vector3::new(2.0 * angle.cos(), 2.0 * angle.sin(), 0.5);
            let result = solver
                .solve(&mut fixture.skeleton, base, effector, &target)
                .unwrap();
            assert!(result.error.is_finite());
        }
        assert_finite(&fixture);
        assert_lengths(&fixture, &[1.0; 3]);
    }
}

#[test]
fn target_at_base_stays_finite() {
    for algorithm in ITERATIVE {
        let mut fixture = straight_chain(4, 1.0);
        let (base, effector) = (fixture.base(), fixture.effector());
        let mut config = SolverConfig::with_algorithm(algorithm);
        config.max_iterations.ccd = 32;
        config.max_iterations.fabrik = 32;
        config.max_iterations.jacobian = 32;
        let result = IkSolver::new(config)
            .solve(&mut fixture.skeleton, base, effector, &Vector3::zeros())
            .unwrap();
        assert!(result.error.is_finite(), "{algorithm}");
        assert_finite(&fixture);
    }
}

#[test]
fn reversed_chain_is_hierarchy_error() {
    let mut fixture = straight_chain(3, 1.0);
    let (base, effector) = (fixture.base(), fixture.effector());
    let err = solver(Algorithm::Fabrik)
        .solve(&mut fixture.skeleton, effector, base, &Vector3::x())
        .unwrap_err();
    assert!(matches!(err, IkError::Hierarchy { .. }));
}

#[test]
fn sub_chain_leaves_ancestors_alone() {
    let mut fixture = straight_chain(5, 1.0);
    let (base, effector) = (fixture.joints[2], fixture.effector());
    let before = fixture.skeleton.position(fixture.joints[1]);
    let result = solver(Algorithm::Ccd)
        .solve(&mut fixture.skeleton, base, effector, &Vector3::new(2.5, 1.0, 0.0))
        .unwrap();
    assert!(result.converged);
    assert_eq!(fixture.skeleton.position(fixture.joints[1]), before);
    assert_eq!(
        fixture.skeleton.rotation(fixture.joints[1]),
        fixture.skeleton.rotation(fixture.joints[0])
    );
}
