//! Algorithm dispatch.
//!
//! [`solve`] runs one algorithm against a chain that has already been
//! built. [`IkSolver`] is the per-tick entry point: it owns a
//! [`SolverConfig`], rebuilds the chain from the live hierarchy and then
//! dispatches.

use nalgebra::Vector3;

use arbor_core::{Algorithm, IkError, SolverConfig};

use crate::accessor::JointAccessor;
use crate::chain::JointChain;
use crate::jacobian::JacobianMethod;
use crate::{ccd, fabrik, jacobian, two_bone};

/// Outcome of a solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IkResult {
    /// Iterations (sweeps, passes) used. Zero if the chain was already there.
    pub iterations: u32,
    /// Whether the effector ended within tolerance of the stable target.
    pub converged: bool,
    /// Final distance from the effector to the stable target.
    pub error: f32,
    /// The target after clamping into the chain's reach.
    pub target: Vector3<f32>,
}

impl IkResult {
    /// Result for a solve that did nothing.
    fn untouched<A: JointAccessor>(
        accessor: &A,
        chain: &JointChain<A::Joint>,
        target: &Vector3<f32>,
        config: &SolverConfig,
    ) -> Self {
        let stable = chain.stable_target(accessor, target, config.epsilon);
        let error = chain.effector_error(accessor, &stable);
        Self {
            iterations: 0,
            converged: error <= config.tolerance,
            error,
            target: stable,
        }
    }
}

/// Run `algorithm` on `chain`, mutating joint rotations through `accessor`.
///
/// [`Algorithm::None`] leaves the chain untouched and only reports the error.
///
/// # Errors
///
/// [`IkError::ChainLength`] for the two-bone solver on a chain of another
/// length, [`IkError::Dimension`] if the matrix engine rejects a shape.
pub fn solve<A: JointAccessor>(
    algorithm: Algorithm,
    accessor: &mut A,
    chain: &JointChain<A::Joint>,
    target: &Vector3<f32>,
    config: &SolverConfig,
) -> Result<IkResult, IkError> {
    let result = match algorithm {
        Algorithm::None => IkResult::untouched(accessor, chain, target, config),
        Algorithm::TwoBone => two_bone::solve(accessor, chain, target, config)?,
        Algorithm::Ccd => ccd::solve(accessor, chain, target, config),
        Algorithm::Fabrik => fabrik::solve(accessor, chain, target, config),
        Algorithm::JacobianTranspose => {
            jacobian::solve(accessor, chain, target, config, JacobianMethod::Transpose)?
        }
        Algorithm::JacobianPseudoinverse => {
            jacobian::solve(accessor, chain, target, config, JacobianMethod::Pseudoinverse)?
        }
        Algorithm::JacobianDls => {
            jacobian::solve(accessor, chain, target, config, JacobianMethod::DampedLeastSquares)?
        }
    };
    log::debug!(
        "{algorithm}: {} iterations, error {:.6}, converged {}",
        result.iterations,
        result.error,
        result.converged
    );
    Ok(result)
}

/// Configured solver, called once per tick.
#[derive(Debug, Clone, Default)]
pub struct IkSolver {
    config: SolverConfig,
}

impl IkSolver {
    pub const fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Switch algorithms between ticks.
    pub fn set_algorithm(&mut self, algorithm: Algorithm) {
        self.config.algorithm = algorithm;
    }

    /// Rebuild the chain from `base` to `effector` and solve toward `target`
    /// with the configured algorithm.
    ///
    /// # Errors
    ///
    /// [`IkError::Hierarchy`] if `effector` does not descend from `base`,
    /// otherwise whatever [`solve`] reports.
    pub fn solve<A: JointAccessor>(
        &self,
        accessor: &mut A,
        base: A::Joint,
        effector: A::Joint,
        target: &Vector3<f32>,
    ) -> Result<IkResult, IkError> {
        let chain = JointChain::build(accessor, base, effector)?;
        solve(self.config.algorithm, accessor, &chain, target, &self.config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
