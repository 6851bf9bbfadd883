//! In-memory joint hierarchy.
//!
//! [`Skeleton`] stores each joint as an offset and rotation relative to its
//! parent and derives world poses on demand. It implements [`JointAccessor`],
//! which makes it the reference target for the solvers outside of a scene
//! system (tools, tests, offline baking).

use nalgebra::{UnitQuaternion, Vector3};

use crate::accessor::JointAccessor;

/// Index of a joint inside a [`Skeleton`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JointId(pub usize);

#[derive(Debug, Clone)]
struct RigJoint {
    name: String,
    parent: Option<JointId>,
    /// Translation from the parent joint, in the parent's frame.
    offset: Vector3<f32>,
    local_rotation: UnitQuaternion<f32>,
}

/// One line of [`Skeleton::outline`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub joint: JointId,
    /// Number of ancestors.
    pub depth: usize,
    /// Name with everything up to and including the matched prefix removed.
    pub name: String,
}

/// Arena of named joints. Parents are always added before their children.
#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    joints: Vec<RigJoint>,
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root joint at a world position.
    pub fn add_root(&mut self, name: impl Into<String>, position: Vector3<f32>) -> JointId {
        self.push(name.into(), None, position)
    }

    /// Add a joint under `parent`, offset in the parent's frame.
    ///
    /// # Panics
    ///
    /// Panics if `parent` does not belong to this skeleton.
    pub fn add_joint(
        &mut self,
        name: impl Into<String>,
        parent: JointId,
        offset: Vector3<f32>,
    ) -> JointId {
        assert!(parent.0 < self.joints.len(), "unknown parent {parent:?}");
        self.push(name.into(), Some(parent), offset)
    }

    fn push(&mut self, name: String, parent: Option<JointId>, offset: Vector3<f32>) -> JointId {
        let id = JointId(self.joints.len());
        self.joints.push(RigJoint {
            name,
            parent,
            offset,
            local_rotation: UnitQuaternion::identity(),
        });
        id
    }

    /// Single unbranched chain through `positions` with identity rotations.
    /// Joints are named `joint0`, `joint1`, ...
    pub fn from_positions(positions: &[Vector3<f32>]) -> (Self, Vec<JointId>) {
        let mut skeleton = Self::new();
        let mut ids = Vec::with_capacity(positions.len());
        for (i, p) in positions.iter().enumerate() {
            let id = match ids.last() {
                None => skeleton.add_root(format!("joint{i}"), *p),
                Some(&parent) => {
                    skeleton.add_joint(format!("joint{i}"), parent, p - positions[i - 1])
                }
            };
            ids.push(id);
        }
        (skeleton, ids)
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn name(&self, joint: JointId) -> &str {
        &self.joints[joint.0].name
    }

    /// First joint with exactly this name.
    pub fn find(&self, name: &str) -> Option<JointId> {
        self.joints
            .iter()
            .position(|j| j.name == name)
            .map(JointId)
    }

    pub fn depth(&self, joint: JointId) -> usize {
        let mut depth = 0;
        let mut current = self.joints[joint.0].parent;
        while let Some(p) = current {
            depth += 1;
            current = self.joints[p.0].parent;
        }
        depth
    }

    /// Overwrite a joint's rotation relative to its parent.
    pub fn set_local_rotation(&mut self, joint: JointId, rotation: UnitQuaternion<f32>) {
        self.joints[joint.0].local_rotation = rotation;
    }

    /// World positions of `joints`, in order.
    pub fn positions(&self, joints: &[JointId]) -> Vec<Vector3<f32>> {
        joints.iter().map(|&j| self.position(j)).collect()
    }

    /// Depth-first listing of the joints whose name contains `prefix`, with
    /// the prefix (and anything before it) stripped. Rigs exported from
    /// authoring tools namespace their bones this way (`rig:LeftArm`).
    pub fn outline(&self, prefix: &str) -> Vec<OutlineEntry> {
        let mut children: Vec<Vec<JointId>> = vec![Vec::new(); self.joints.len()];
        let mut stack = Vec::new();
        for (i, joint) in self.joints.iter().enumerate() {
            match joint.parent {
                Some(p) => children[p.0].push(JointId(i)),
                None => stack.push(JointId(i)),
            }
        }
        stack.reverse();

        let mut entries = Vec::new();
        while let Some(id) = stack.pop() {
            let name = &self.joints[id.0].name;
            if let Some(at) = name.find(prefix) {
                entries.push(OutlineEntry {
                    joint: id,
                    depth: self.depth(id),
                    name: name[at + prefix.len()..].to_string(),
                });
            }
            stack.extend(children[id.0].iter().rev());
        }
        entries
    }

    /// World position and rotation.
    fn global_pose(&self, joint: JointId) -> (Vector3<f32>, UnitQuaternion<f32>) {
        let j = &self.joints[joint.0];
        match j.parent {
            None => (j.offset, j.local_rotation),
            Some(p) => {
                let (parent_pos, parent_rot) = self.global_pose(p);
                (parent_pos + parent_rot * j.offset, parent_rot * j.local_rotation)
            }
        }
    }

    fn parent_rotation(&self, joint: JointId) -> UnitQuaternion<f32> {
        self.joints[joint.0]
            .parent
            .map_or_else(UnitQuaternion::identity, |p| self.global_pose(p).1)
    }
}

impl JointAccessor for Skeleton {
    type Joint = JointId;

    fn position(&self, joint: JointId) -> Vector3<f32> {
        self.global_pose(joint).0
    }

    fn rotation(&self, joint: JointId) -> UnitQuaternion<f32> {
        self.global_pose(joint).1
    }

    fn local_rotation(&self, joint: JointId) -> UnitQuaternion<f32> {
        self.joints[joint.0].local_rotation
    }

    fn parent(&self, joint: JointId) -> Option<JointId> {
        self.joints[joint.0].parent
    }

    fn rotate_global(&mut self, joint: JointId, rotation: &UnitQuaternion<f32>) {
        let parent_rot = self.parent_rotation(joint);
        let global = rotation * parent_rot * self.joints[joint.0].local_rotation;
        let local = parent_rot.inverse() * global;
        self.joints[joint.0].local_rotation = UnitQuaternion::new_normalize(local.into_inner());
    }

    fn rotate_local(&mut self, joint: JointId, rotation: &UnitQuaternion<f32>) {
        let local = self.joints[joint.0].local_rotation * rotation;
        self.joints[joint.0].local_rotation = UnitQuaternion::new_normalize(local.into_inner());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
