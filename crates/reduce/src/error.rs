use thiserror::Error;

/// Errors raised while fitting or applying a [`FittedReducer`](crate::FittedReducer).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReduceError {
    #[error("cannot fit reducer on zero vectors")]
    EmptyInput,

    /// The sample covariance needs at least two rows.
    #[error("reducer needs at least 2 samples, got {found}")]
    InsufficientSamples { found: usize },

    #[error("max_components must be at least 1")]
    InvalidComponents,

    /// A vector does not have the width seen at fit time.
    #[error("vector has width {found}, expected {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("input vector holds a non-finite value at position {index}")]
    NonFiniteInput { index: usize },

    /// The eigen solver did not converge or produced non-finite output.
    #[error("eigendecomposition failed: {0}")]
    Decomposition(String),
}
