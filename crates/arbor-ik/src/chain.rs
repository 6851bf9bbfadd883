//! Joint chain derived from a hierarchy.
//!
//! A [`JointChain`] is the ordered list of joints from a base joint to an
//! effector joint, together with the bone lengths measured when it was
//! built. Solvers rebuild it at the start of every solve, so it never
//! outlives the pose it was measured on.

use std::fmt::Debug;

use nalgebra::Vector3;

use arbor_core::IkError;

use crate::accessor::JointAccessor;

/// An ordered chain from base (index 0) to effector (last index).
#[derive(Debug, Clone, PartialEq)]
pub struct JointChain<J> {
    joints: Vec<J>,
    /// `bone_lengths[i]` is the distance from `joints[i]` to `joints[i + 1]`.
    bone_lengths: Vec<f32>,
    total_length: f32,
}

impl<J: Copy + Eq + Debug> JointChain<J> {
    /// Walk parent links from `effector` up to `base`.
    ///
    /// # Errors
    ///
    /// Returns [`IkError::Hierarchy`] if `base` is not a proper ancestor of
    /// `effector`. A chain needs at least one bone, so `base == effector`
    /// is rejected too.
    pub fn build<A>(accessor: &A, base: J, effector: J) -> Result<Self, IkError>
    where
        A: JointAccessor<Joint = J>,
    {
        let not_descendant = || IkError::Hierarchy {
            base: format!("{base:?}"),
            effector: format!("{effector:?}"),
        };
        if base == effector {
            return Err(not_descendant());
        }

        let mut joints = vec![effector];
        let mut bone_lengths = Vec::new();
        let mut current = effector;
        let mut current_pos = accessor.position(current);
        loop {
            let parent = accessor.parent(current).ok_or_else(not_descendant)?;
            let parent_pos = accessor.position(parent);
            bone_lengths.push((current_pos - parent_pos).norm());
            joints.push(parent);
            if parent == base {
                break;
            }
            current = parent;
            current_pos = parent_pos;
        }
        joints.reverse();
        bone_lengths.reverse();
        let total_length = bone_lengths.iter().sum();

        Ok(Self {
            joints,
            bone_lengths,
            total_length,
        })
    }

    /// Joints from base to effector.
    pub fn joints(&self) -> &[J] {
        &self.joints
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn bone_count(&self) -> usize {
        self.bone_lengths.len()
    }

    pub fn base(&self) -> J {
        self.joints[0]
    }

    pub fn effector(&self) -> J {
        self.joints[self.joints.len() - 1]
    }

    pub fn bone_lengths(&self) -> &[f32] {
        &self.bone_lengths
    }

    /// Sum of all bone lengths: the chain's reach.
    pub fn total_length(&self) -> f32 {
        self.total_length
    }

    /// `target` pulled toward the base so it lies within `total_length - epsilon`.
    pub fn stable_target<A>(&self, accessor: &A, target: &Vector3<f32>, epsilon: f32) -> Vector3<f32>
    where
        A: JointAccessor<Joint = J>,
    {
        let base = accessor.position(self.base());
        let offset = target - base;
        let distance = offset.norm();
        let reach = (self.total_length - epsilon).max(0.0);
        if distance > reach {
            base + offset * (reach / distance)
        } else {
            *target
        }
    }

    /// Distance from the effector to `target`.
    pub fn effector_error<A>(&self, accessor: &A, target: &Vector3<f32>) -> f32
    where
        A: JointAccessor<Joint = J>,
    {
        (accessor.position(self.effector()) - target).norm()
    }

    /// Current world positions of every joint, base first.
    pub fn positions<A>(&self, accessor: &A) -> Vec<Vector3<f32>>
    where
        A: JointAccessor<Joint = J>,
    {
        self.joints.iter().map(|&j| accessor.position(j)).collect()
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

    fn bent_chain() -> (Skeleton, Vec<JointId>) {
        Skeleton::from_positions(&[
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 2.0, 0.0),
            Vector3::new(1.0, 2.0, 0.0),
            Vector3::new(1.0, 2.0, 0.5),
        ])
    }

    #[test]
    fn build_orders_base_to_effector() {
        let (skeleton, ids) = bent_chain();
        let chain = JointChain::build(&skeleton, ids[0], ids[3]).unwrap();
        assert_eq!(chain.joints(), ids.as_slice());
        assert_eq!(chain.joint_count(), 4);
        assert_eq!(chain.bone_count(), 3);
        assert_eq!(chain.base(), ids[0]);
        assert_eq!(chain.effector(), ids[3]);
    }

    #[test]
    fn bone_lengths_sum_to_total() {
        let (skeleton, ids) = bent_chain();
        let chain = JointChain::build(&skeleton, ids[0], ids[3]).unwrap();
        assert_relative_eq!(chain.bone_lengths()[0], 2.0, epsilon = 1e-6);
        assert_relative_eq!(chain.bone_lengths()[1], 1.0, epsilon = 1e-6);
        assert_relative_eq!(chain.bone_lengths()[2], 0.5, epsilon = 1e-6);
        assert_relative_eq!(chain.total_length(), 3.5, epsilon = 1e-6);
    }

    #[test]
    fn sub_chain_starts_at_given_base() {
        let (skeleton, ids) = bent_chain();
        let chain = JointChain::build(&skeleton, ids[1], ids[3]).unwrap();
        assert_eq!(chain.joints(), &ids[1..]);
        assert_relative_eq!(chain.total_length(), 1.5, epsilon = 1e-6);
    }

    #[test]
    fn base_not_ancestor_is_hierarchy_error() {
        let (skeleton, ids) = bent_chain();
        let err = JointChain::build(&skeleton, ids[3], ids[1]).unwrap_err();
        assert!(matches!(err, IkError::Hierarchy { .. }));
        assert!(err.to_string().contains("JointId(3)"));
    }

    #[test]
    fn base_equal_to_effector_is_rejected() {
        let (skeleton, ids) = bent_chain();
        let err = JointChain::build(&skeleton, ids[2], ids[2]).unwrap_err();
        assert!(matches!(err, IkError::Hierarchy { .. }));
    }

    #[test]
    fn sibling_branch_is_rejected() {
        let mut skeleton = Skeleton::new();
        let root = skeleton.add_root("root", Vector3::zeros());
        let left = skeleton.add_joint("left", root, -Vector3::x());
        let right = skeleton.add_joint("right", root, Vector3::x());
        assert!(JointChain::build(&skeleton, left, right).is_err());
    }

    #[test]
    fn stable_target_clamps_to_reach() {
        let (skeleton, ids) = bent_chain();
        let chain = JointChain::build(&skeleton, ids[0], ids[3]).unwrap();

        let far = Vector3::new(10.0, 0.0, 0.0);
        let stable = chain.stable_target(&skeleton, &far, 1e-3);
        assert_relative_eq!(stable.x, 3.5 - 1e-3, epsilon = 1e-5);
        assert_relative_eq!(stable.y, 0.0);

        let near = Vector3::new(1.0, 1.0, 0.0);
        assert_eq!(chain.stable_target(&skeleton, &near, 1e-3), near);
    }

    #[test]
    fn effector_error_measures_distance() {
        let (skeleton, ids) = bent_chain();
        let chain = JointChain::build(&skeleton, ids[0], ids[3]).unwrap();
        let err = chain.effector_error(&skeleton, &Vector3::new(1.0, 2.0, 2.5));
        assert_relative_eq!(err, 2.0, epsilon = 1e-6);
    }
}
