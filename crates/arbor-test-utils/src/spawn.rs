//! Joint chain fixtures for solver tests.

use arbor_ik::{JointChain, JointId, Skeleton};
use nalgebra::Vector3;

/// A skeleton holding one unbranched chain, plus its joint ids.
#[derive(Debug, Clone)]
pub struct ChainFixture {
    pub skeleton: Skeleton,
    pub joints: Vec<JointId>,
}

impl ChainFixture {
    pub fn from_positions(positions: &[Vector3<f32>]) -> Self {
        let (skeleton, joints) = Skeleton::from_positions(positions);
        Self { skeleton, joints }
    }

    pub fn base(&self) -> JointId {
        self.joints[0]
    }

    pub fn effector(&self) -> JointId {
        self.joints[self.joints.len() - 1]
    }

    /// Chain from the first to the last joint.
    ///
    /// # Panics
    ///
    /// Panics if the fixture has fewer than two joints.
    pub fn chain(&self) -> JointChain<JointId> {
        JointChain::build(&self.skeleton, self.base(), self.effector())
            .expect("fixture chains are well formed")
    }

    pub fn positions(&self) -> Vec<Vector3<f32>> {
        self.skeleton.positions(&self.joints)
    }
}

/// `count` joints spaced `bone` apart along +X, starting at the origin.
pub fn straight_chain(count: usize, bone: f32) -> ChainFixture {
    let positions: Vec<_> = (0..count)
        .map(|i| Vector3::new(i as f32 * bone, 0.0, 0.0))
        .collect();
    ChainFixture::from_positions(&positions)
}

/// Three-joint arm bent 90 degrees at the middle joint (X then Y).
pub fn bent_chain(upper: f32, lower: f32) -> ChainFixture {
    ChainFixture::from_positions(&[
        Vector3::zeros(),
        Vector3::new(upper, 0.0, 0.0),
        Vector3::new(upper, lower, 0.0),
    ])
}

/// Unit bones alternating between +X+Y and +X-Y diagonals, with a small Z
/// drift so the chain is not planar.
pub fn zigzag_chain(count: usize) -> ChainFixture {
    let step = std::f32::consts::FRAC_1_SQRT_2;
    let mut positions = vec![Vector3::zeros()];
    for i in 1..count {
        let y = if i % 2 == 1 { step } else { -step };
        let previous = positions[i - 1];
        let dir = Vector3::new(step, y, 0.1).normalize();
        positions.push(previous + dir);
    }
    ChainFixture::from_positions(&positions)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
