use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_tolerance() -> f32 {
    1e-3
}
const fn default_epsilon() -> f32 {
    1e-5
}
const fn default_damping() -> f32 {
    0.1
}
const fn default_svd_convergence() -> f32 {
    1e-6
}
const fn default_max_step() -> f32 {
    0.5
}
const fn default_pole_axis() -> [f32; 3] {
    [0.0, 0.0, -1.0]
}
const fn default_geometric_cap() -> u32 {
    512
}
const fn default_jacobian_cap() -> u32 {
    1024
}
const fn default_svd_cap() -> u32 {
    1024
}
const fn default_line_search_halvings() -> u32 {
    8
}

// ---------------------------------------------------------------------------
// Algorithm
// ---------------------------------------------------------------------------

/// Which solver runs each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Leave the chain untouched.
    #[default]
    None,
    /// Closed-form law-of-cosines solve for a 2-bone chain.
    TwoBone,
    /// Cyclic coordinate descent.
    Ccd,
    /// Forward and backward reaching on joint positions.
    Fabrik,
    /// Steepest descent along the Jacobian transpose.
    JacobianTranspose,
    /// Moore-Penrose pseudoinverse from the approximate SVD.
    JacobianPseudoinverse,
    /// Damped least squares.
    JacobianDls,
}

impl Algorithm {
    /// Every algorithm, in menu order.
    pub const ALL: [Self; 7] = [
        Self::None,
        Self::TwoBone,
        Self::Ccd,
        Self::Fabrik,
        Self::JacobianTranspose,
        Self::JacobianPseudoinverse,
        Self::JacobianDls,
    ];

    /// Stable snake_case name, identical to the serde representation.
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::TwoBone => "two_bone",
            Self::Ccd => "ccd",
            Self::Fabrik => "fabrik",
            Self::JacobianTranspose => "jacobian_transpose",
            Self::JacobianPseudoinverse => "jacobian_pseudoinverse",
            Self::JacobianDls => "jacobian_dls",
        }
    }

    /// Whether the algorithm builds a Jacobian (and therefore uses the SVD).
    pub const fn is_jacobian(self) -> bool {
        matches!(
            self,
            Self::JacobianTranspose | Self::JacobianPseudoinverse | Self::JacobianDls
        )
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = ConfigError;

    /// Accepts the snake_case name; dashes and case are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|a| a.name() == normalized)
            .ok_or_else(|| ConfigError::UnknownAlgorithm(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// IterationCaps
// ---------------------------------------------------------------------------

/// Upper bounds on iterations. Caps are the only cancellation mechanism a
/// solve has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationCaps {
    #[serde(default = "default_geometric_cap")]
    pub ccd: u32,
    #[serde(default = "default_geometric_cap")]
    pub fabrik: u32,
    #[serde(default = "default_jacobian_cap")]
    pub jacobian: u32,
    /// Power iterations per singular component.
    #[serde(default = "default_svd_cap")]
    pub svd: u32,
    /// Step halvings tried before a Jacobian solve gives up on an iteration.
    #[serde(default = "default_line_search_halvings")]
    pub line_search: u32,
}

impl Default for IterationCaps {
    fn default() -> Self {
        Self {
            ccd: default_geometric_cap(),
            fabrik: default_geometric_cap(),
            jacobian: default_jacobian_cap(),
            svd: default_svd_cap(),
            line_search: default_line_search_halvings(),
        }
    }
}

// ---------------------------------------------------------------------------
// SolverConfig
// ---------------------------------------------------------------------------

/// Tuning for every solver. This is the only state that survives between
/// ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Active algorithm (default: none).
    #[serde(default)]
    pub algorithm: Algorithm,

    /// Effector-to-target distance at which a solve stops (default: 1e-3).
    #[serde(default = "default_tolerance")]
    pub tolerance: f32,

    /// Degeneracy floor for normalization, cross products and singular values.
    /// Also the margin kept between the stable target and full extension
    /// (default: 1e-5).
    #[serde(default = "default_epsilon")]
    pub epsilon: f32,

    /// Damping constant lambda for damped least squares (default: 0.1).
    #[serde(default = "default_damping")]
    pub damping: f32,

    /// Power iteration stops once successive vectors have
    /// `|dot| > 1 - svd_convergence` (default: 1e-6).
    #[serde(default = "default_svd_convergence")]
    pub svd_convergence: f32,

    /// Largest per-joint rotation a Jacobian step may apply, radians
    /// (default: 0.5).
    #[serde(default = "default_max_step")]
    pub max_step: f32,

    /// Bend hint for the two-bone solver, in the middle joint's frame.
    #[serde(default = "default_pole_axis")]
    pub pole_axis: [f32; 3],

    /// Seed for the SVD's random starting vectors.
    #[serde(default)]
    pub seed: u64,

    #[serde(default)]
    pub max_iterations: IterationCaps,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            tolerance: default_tolerance(),
            epsilon: default_epsilon(),
            damping: default_damping(),
            svd_convergence: default_svd_convergence(),
            max_step: default_max_step(),
            pole_axis: default_pole_axis(),
            seed: 0,
            max_iterations: IterationCaps::default(),
        }
    }
}

impl SolverConfig {
    /// Default tuning with a chosen algorithm.
    pub fn with_algorithm(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            ..Self::default()
        }
    }

    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("tolerance", self.tolerance)?;
        positive("epsilon", self.epsilon)?;
        positive("max_step", self.max_step)?;
        if !(self.damping.is_finite() && self.damping >= 0.0) {
            return Err(invalid("damping", "must be finite and >= 0"));
        }
        if !(self.svd_convergence > 0.0 && self.svd_convergence < 1.0) {
            return Err(invalid("svd_convergence", "must be in (0, 1)"));
        }
        if self.pole_axis.iter().all(|v| v.abs() <= f32::EPSILON) {
            return Err(invalid("pole_axis", "must be non-zero"));
        }
        let caps = &self.max_iterations;
        for (field, cap) in [
            ("max_iterations.ccd", caps.ccd),
            ("max_iterations.fabrik", caps.fabrik),
            ("max_iterations.jacobian", caps.jacobian),
            ("max_iterations.svd", caps.svd),
        ] {
            if cap == 0 {
                return Err(invalid(field, "must be > 0"));
            }
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

fn positive(field: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be finite and > 0"))
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
