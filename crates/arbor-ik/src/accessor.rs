//! The capability the solvers use to read and move joints.
//!
//! Joints are owned by whatever scene or animation system drives the chain.
//! Solvers only hold copyable handles and go through a [`JointAccessor`] to
//! read poses and compose rotations, so the same solver code runs against a
//! game engine's transform hierarchy or the in-memory [`Skeleton`](crate::rig::Skeleton).

use std::fmt::Debug;

use nalgebra::{UnitQuaternion, Vector3};

/// Read and rotate joints of a hierarchy.
///
/// Rotating a joint must carry its descendants along rigidly: after
/// `rotate_global(j, r)` every descendant's position has been rotated by `r`
/// about `position(j)`.
pub trait JointAccessor {
    /// Copyable joint handle.
    type Joint: Copy + Eq + Debug;

    /// World-space position.
    fn position(&self, joint: Self::Joint) -> Vector3<f32>;

    /// World-space orientation.
    fn rotation(&self, joint: Self::Joint) -> UnitQuaternion<f32>;

    /// Orientation relative to the parent joint.
    fn local_rotation(&self, joint: Self::Joint) -> UnitQuaternion<f32>;

    /// Parent joint, `None` at the hierarchy root.
    fn parent(&self, joint: Self::Joint) -> Option<Self::Joint>;

    /// Compose a world-frame rotation: `global = rotation * global`.
    fn rotate_global(&mut self, joint: Self::Joint, rotation: &UnitQuaternion<f32>);

    /// Compose a joint-frame rotation: `local = local * rotation`.
    fn rotate_local(&mut self, joint: Self::Joint, rotation: &UnitQuaternion<f32>);
}
