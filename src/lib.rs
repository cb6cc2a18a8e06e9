//! Workspace umbrella crate for HerHealth cycle clustering.
//!
//! This crate stitches the normalize, reduce, cluster and store stages into
//! the offline training job ([`train`]) and the immutable
//! [`ServingContext`] used by the HTTP server.
//!
//! Offline: CSV → [`FeatureNormalizer`] → [`DimensionalityReducer`] →
//! [`ClusterAssigner`] → [`ModelStore`]. Online: one record → the three
//! fitted stages → [`GroupId`] → [`InsightResolver`].

pub mod config;
mod pipeline;
mod survey;
mod training;

pub use advisor::{InsightResolver, UNKNOWN_CLUSTER};
pub use cluster::{ClusterAssigner, ClusterError, FittedAssigner, GroupId};
pub use normalize::{
    DataLoadError, Dataset, FeatureNormalizer, FeatureValue, FittedNormalizer, NormalizeError,
    RawRecord, StandardizedVector,
};
pub use reduce::{DimensionalityReducer, Embedding, FittedReducer, ReduceError};
pub use store::{ArtifactName, BackendConfig, CompressionConfig, ModelStore, StoreError};

pub use crate::config::{ConfigLoadError, TrainingConfig};
pub use crate::pipeline::{
    fit_pipeline, FittedPipeline, PipelineFit, PipelineParams, Prediction, ServingContext,
};
pub use crate::survey::{SurveyRecord, SURVEY_FIELDS};
pub use crate::training::{
    train, train_dataset, write_clustered_csv, write_processed_csv, TrainingReport,
    CLUSTER_COLUMN,
};

use std::error::Error;
use std::fmt;

/// Errors that abort the training job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainingError {
    DataLoad(DataLoadError),
    Normalize(NormalizeError),
    Reduce(ReduceError),
    Cluster(ClusterError),
    Store(StoreError),
    /// An output CSV could not be written.
    Output { path: String, reason: String },
}

impl fmt::Display for TrainingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingError::DataLoad(err) => write!(f, "data load failure: {err}"),
            TrainingError::Normalize(err) => write!(f, "normalization failure: {err}"),
            TrainingError::Reduce(err) => write!(f, "dimensionality reduction failure: {err}"),
            TrainingError::Cluster(err) => write!(f, "clustering failure: {err}"),
            TrainingError::Store(err) => write!(f, "artifact store failure: {err}"),
            TrainingError::Output { path, reason } => {
                write!(f, "failed to write {path}: {reason}")
            }
        }
    }
}

impl Error for TrainingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TrainingError::DataLoad(err) => Some(err),
            TrainingError::Normalize(err) => Some(err),
            TrainingError::Reduce(err) => Some(err),
            TrainingError::Cluster(err) => Some(err),
            TrainingError::Store(err) => Some(err),
            TrainingError::Output { .. } => None,
        }
    }
}

impl From<DataLoadError> for TrainingError {
    fn from(value: DataLoadError) -> Self {
        TrainingError::DataLoad(value)
    }
}

impl From<NormalizeError> for TrainingError {
    fn from(value: NormalizeError) -> Self {
        TrainingError::Normalize(value)
    }
}

impl From<ReduceError> for TrainingError {
    fn from(value: ReduceError) -> Self {
        TrainingError::Reduce(value)
    }
}

impl From<ClusterError> for TrainingError {
    fn from(value: ClusterError) -> Self {
        TrainingError::Cluster(value)
    }
}

impl From<StoreError> for TrainingError {
    fn from(value: StoreError) -> Self {
        TrainingError::Store(value)
    }
}

/// Errors raised while classifying one serving record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServingError {
    /// The record itself is unusable (unknown category, missing field, ...).
    Normalize(NormalizeError),
    Reduce(ReduceError),
    Cluster(ClusterError),
}

impl ServingError {
    /// 422 for rejected input, 500 when loaded artifacts disagree.
    pub fn http_status_code(&self) -> u16 {
        match self {
            ServingError::Normalize(err) => err.http_status_code(),
            ServingError::Reduce(_) | ServingError::Cluster(_) => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status_code())
    }
}

impl fmt::Display for ServingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServingError::Normalize(err) => write!(f, "{err}"),
            ServingError::Reduce(err) => write!(f, "projection failed: {err}"),
            ServingError::Cluster(err) => write!(f, "cluster assignment failed: {err}"),
        }
    }
}

impl Error for ServingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ServingError::Normalize(err) => Some(err),
            ServingError::Reduce(err) => Some(err),
            ServingError::Cluster(err) => Some(err),
        }
    }
}

impl From<NormalizeError> for ServingError {
    fn from(value: NormalizeError) -> Self {
        ServingError::Normalize(value)
    }
}

impl From<ReduceError> for ServingError {
    fn from(value: ReduceError) -> Self {
        ServingError::Reduce(value)
    }
}

impl From<ClusterError> for ServingError {
    fn from(value: ClusterError) -> Self {
        ServingError::Cluster(value)
    }
}
