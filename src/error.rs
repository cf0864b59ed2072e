//! Error types for the memory engine and radius optimizers.

use thiserror::Error;

/// Errors raised by engine construction, reads/writes and the optimizers.
///
/// Every variant is a synchronous caller error: operations validate their
/// input before touching engine state, so a returned error never leaves a
/// half-applied write behind. An empty activation set on `read` is not an
/// error.
#[derive(Error, Debug)]
pub enum SdmError {
    /// Invalid engine, encoder or optimizer configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Pattern length does not match the engine's vector dimension
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Radius search range is empty or falls outside `[0, vector_dim]`
    #[error("Invalid radius range [{min}, {max}] for vector_dim {vector_dim}")]
    InvalidRadiusRange {
        min: usize,
        max: usize,
        vector_dim: usize,
    },

    /// Empty input where non-empty was required
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// JSON configuration could not be parsed or written
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

/// Result type alias for engine and optimizer operations.
pub type Result<T> = std::result::Result<T, SdmError>;
