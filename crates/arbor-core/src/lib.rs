// arbor-core: errors and solver configuration shared by the arbor crates.

pub mod config;
pub mod error;

pub use config::{Algorithm, IterationCaps, SolverConfig};
pub use error::{ArborError, ConfigError, DimensionError, IkError};
