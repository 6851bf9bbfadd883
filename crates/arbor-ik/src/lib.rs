//! Inverse kinematics for articulated joint chains.
//!
//! Solvers rotate the joints of a chain so its last joint (the effector)
//! reaches, or gets as close as possible to, a target point. Bone lengths
//! never change; only orientations are written.
//!
//! # Architecture
//!
//! ```text
//! JointAccessor ──► JointChain ──► solve(algorithm) ──► rotated joints
//!                                   ├─ two_bone   (closed form)
//!                                   ├─ ccd / fabrik
//!                                   └─ jacobian   (arbor-linalg SVD)
//! ```
//!
//! Joints live in whatever hierarchy the caller owns; the solvers see them
//! through [`JointAccessor`]. [`Skeleton`] is an in-memory implementation.

pub mod accessor;
pub mod ccd;
pub mod chain;
pub mod fabrik;
mod geometry;
pub mod jacobian;
pub mod rig;
pub mod solver;
pub mod two_bone;

pub use accessor::JointAccessor;
pub use chain::JointChain;
pub use jacobian::JacobianMethod;
pub use rig::{JointId, OutlineEntry, Skeleton};
pub use solver::{IkResult, IkSolver, solve};
