use thiserror::Error;

/// Top-level error type for arbor.
#[derive(Debug, Error)]
pub enum ArborError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IK error: {0}")]
    Ik(#[from] IkError),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Unknown algorithm: {0}")]
    UnknownAlgorithm(String),
}

/// Matrix shape mismatch.
///
/// Copy + static operation name for cheap propagation out of inner loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Dimension mismatch in {op}: lhs is {lhs_rows}x{lhs_cols}, rhs is {rhs_rows}x{rhs_cols}")]
pub struct DimensionError {
    pub op: &'static str,
    pub lhs_rows: usize,
    pub lhs_cols: usize,
    pub rhs_rows: usize,
    pub rhs_cols: usize,
}

impl DimensionError {
    pub const fn new(op: &'static str, lhs: (usize, usize), rhs: (usize, usize)) -> Self {
        Self {
            op,
            lhs_rows: lhs.0,
            lhs_cols: lhs.1,
            rhs_rows: rhs.0,
            rhs_cols: rhs.1,
        }
    }
}

/// Errors raised while building or solving a joint chain.
#[derive(Debug, Error)]
pub enum IkError {
    #[error("Effector {effector} is not a descendant of base {base}")]
    Hierarchy { base: String, effector: String },

    #[error("Two-bone solver needs exactly 2 bones, chain has {bones}")]
    ChainLength { bones: usize },

    #[error(transparent)]
    Dimension(#[from] DimensionError),
}
