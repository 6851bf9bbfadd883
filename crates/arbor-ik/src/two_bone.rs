//! Closed-form two-bone solver.
//!
//! For a chain `a -> b -> c` the law of cosines gives the interior angles
//! at `a` and `b` that put `c` at distance `|a - t|` from the base. The
//! base is then swung so `a -> c` points at the target:
//!
//! ```text
//! angle_a = acos((lcb² - lab² - lat²) / (-2 lab lat))
//! angle_b = acos((lat² - lab² - lcb²) / (-2 lab lcb))
//! ```
//!
//! Both bends happen about the same axis (`axis0`), so the triangle stays
//! planar and the new `a -> c` lies along the old one before the final swing
//! about `axis1 = (c - a) x (t - a)`.
//!
//! `axis0` is the normal of the current triangle, so a bent arm keeps bending
//! in its own plane. The configured pole axis, taken in the middle joint's
//! frame, only picks the bend plane when the arm is straight.

use nalgebra::Vector3;

use arbor_core::{IkError, SolverConfig};

use crate::accessor::JointAccessor;
use crate::chain::JointChain;
use crate::geometry::{
    MIN_LENGTH, angle_between, any_perpendicular, axis_angle, clamped_acos, safe_normalize,
};
use crate::solver::IkResult;

/// Solve a two-bone chain in one pass.
///
/// Reaches the target exactly when `|lab - lcb| <= |a - t| <= lab + lcb`,
/// otherwise the nearest point of that annulus.
///
/// # Errors
///
/// [`IkError::ChainLength`] if the chain does not have exactly two bones.
pub fn solve<A: JointAccessor>(
    accessor: &mut A,
    chain: &JointChain<A::Joint>,
    target: &Vector3<f32>,
    config: &SolverConfig,
) -> Result<IkResult, IkError> {
    if chain.bone_count() != 2 {
        return Err(IkError::ChainLength {
            bones: chain.bone_count(),
        });
    }
    let stable = chain.stable_target(accessor, target, config.epsilon);
    let (base, middle) = (chain.joints()[0], chain.joints()[1]);
    let eps = config.epsilon;

    let a = accessor.position(base);
    let b = accessor.position(middle);
    let c = accessor.position(chain.effector());
    let lab = chain.bone_lengths()[0];
    let lcb = chain.bone_lengths()[1];

    if lab > MIN_LENGTH && lcb > MIN_LENGTH {
        let lat = (a - target).norm().clamp(eps, (lab + lcb - eps).max(eps));

        let ab = b - a;
        let ac = c - a;
        let bc = c - b;
        let at = target - a;

        let ac_ab_0 = angle_between(&ac, &ab);
        let ba_bc_0 = angle_between(&-ab, &bc);
        let ac_at_0 = angle_between(&ac, &at);

        let ac_ab_1 = clamped_acos((lcb * lcb - lab * lab - lat * lat) / (-2.0 * lab * lat));
        let ba_bc_1 = clamped_acos((lat * lat - lab * lab - lcb * lcb) / (-2.0 * lab * lcb));

        let base_rot = accessor.rotation(base);
        let middle_rot = accessor.rotation(middle);
        let pole = middle_rot * Vector3::from(config.pole_axis);

        let axis0 = safe_normalize(&ac.cross(&ab))
            .or_else(|| safe_normalize(&ac.cross(&pole)))
            .unwrap_or_else(|| any_perpendicular(&ac));
        let axis1 = match safe_normalize(&ac.cross(&at)) {
            Some(axis) => axis,
            // Target straight behind the effector: any perpendicular will do.
            None if ac_at_0 > std::f32::consts::FRAC_PI_2 => axis0,
            None => Vector3::zeros(),
        };

        let r0 = axis_angle(&(base_rot.inverse() * axis0), ac_ab_1 - ac_ab_0);
        let r1 = axis_angle(&(middle_rot.inverse() * axis0), ba_bc_1 - ba_bc_0);
        let r2 = axis_angle(&(base_rot.inverse() * axis1), ac_at_0);

        // Bend first, then swing: world-frame r2 * r0.
        accessor.rotate_local(base, &(r2 * r0));
        accessor.rotate_local(middle, &r1);
    } else {
        log::debug!("two-bone: zero-length bone, chain left unchanged");
    }

    let error = chain.effector_error(accessor, &stable);
    log::debug!("two-bone: error {error:.6}");
    Ok(IkResult {
        iterations: 1,
        converged: error <= config.tolerance,
        error,
        target: stable,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
