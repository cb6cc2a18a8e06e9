use thiserror::Error;

/// Errors raised while fitting or applying a [`FittedAssigner`](crate::FittedAssigner).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ClusterError {
    #[error("cannot cluster zero embeddings")]
    EmptyInput,

    /// `k` is zero or exceeds the number of samples.
    #[error("cannot form {k} clusters from {samples} samples")]
    InvalidClusterCount { k: usize, samples: usize },

    #[error("invalid clustering parameter: {0}")]
    InvalidParameter(String),

    #[error("embedding has width {found}, expected {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("embedding holds a non-finite value at position {index}")]
    NonFiniteInput { index: usize },
}
