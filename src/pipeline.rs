//! The fitted three-stage pipeline and the serving context built from it.

use std::time::Instant;

use advisor::InsightResolver;
use cluster::{ClusterAssigner, FittedAssigner, GroupId};
use normalize::{Dataset, FeatureNormalizer, FittedNormalizer, RawRecord, StandardizedVector};
use reduce::{DimensionalityReducer, Embedding, FittedReducer};
use store::{ArtifactName, ModelStore, StoreError};
use tracing::info;

use crate::config::TrainingConfig;
use crate::survey::SurveyRecord;
use crate::{ServingError, TrainingError};

/// Hyperparameters for one training run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineParams {
    pub max_components: usize,
    pub n_clusters: usize,
    pub seed: u64,
    pub n_init: usize,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self::from(&TrainingConfig::default())
    }
}

impl From<&TrainingConfig> for PipelineParams {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            max_components: config.reducer.max_components,
            n_clusters: config.cluster.n_clusters,
            seed: config.cluster.seed,
            n_init: config.cluster.n_init,
            max_iter: config.cluster.max_iter,
            tol: config.cluster.tol,
        }
    }
}

impl PipelineParams {
    pub fn with_clusters(mut self, n_clusters: usize) -> Self {
        self.n_clusters = n_clusters;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn assigner(&self) -> ClusterAssigner {
        ClusterAssigner::new(self.n_clusters)
            .with_seed(self.seed)
            .with_n_init(self.n_init)
            .with_max_iter(self.max_iter)
            .with_tolerance(self.tol)
    }
}

/// Normalizer, reducer and assigner fitted together.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedPipeline {
    pub normalizer: FittedNormalizer,
    pub reducer: FittedReducer,
    pub assigner: FittedAssigner,
}

/// A fitted pipeline plus the intermediate training matrices.
#[derive(Debug, Clone)]
pub struct PipelineFit {
    pub pipeline: FittedPipeline,
    pub standardized: Vec<StandardizedVector>,
    pub embeddings: Vec<Embedding>,
    pub labels: Vec<GroupId>,
}

/// Fit all three stages on `dataset`.
pub fn fit_pipeline(dataset: &Dataset, params: &PipelineParams) -> Result<PipelineFit, TrainingError> {
    let (normalizer, standardized) = FeatureNormalizer::fit_transform(dataset)?;
    let reducer = DimensionalityReducer::new(params.max_components).fit(&standardized)?;
    let embeddings = reducer.apply_batch(&standardized)?;
    let assigner = params.assigner().fit(&embeddings)?;
    let labels = assigner.predict_batch(&embeddings)?;

    Ok(PipelineFit {
        pipeline: FittedPipeline {
            normalizer,
            reducer,
            assigner,
        },
        standardized,
        embeddings,
        labels,
    })
}

impl FittedPipeline {
    /// Normalize, project and assign one record.
    pub fn classify(&self, record: &RawRecord) -> Result<GroupId, ServingError> {
        let vector = self.normalizer.apply(record)?;
        let embedding = self.reducer.apply(&vector)?;
        Ok(self.assigner.apply(&embedding)?)
    }

    /// Persist all three artifacts.
    pub fn save(&self, store: &ModelStore) -> Result<(), StoreError> {
        store.save(ArtifactName::Normalizer, &self.normalizer)?;
        store.save(ArtifactName::Reducer, &self.reducer)?;
        store.save(ArtifactName::Assigner, &self.assigner)
    }

    /// Load all three artifacts and check that their shapes line up.
    pub fn load(store: &ModelStore) -> Result<Self, StoreError> {
        let pipeline = Self {
            normalizer: store.load(ArtifactName::Normalizer)?,
            reducer: store.load(ArtifactName::Reducer)?,
            assigner: store.load(ArtifactName::Assigner)?,
        };
        pipeline.check_consistency()?;
        Ok(pipeline)
    }

    fn check_consistency(&self) -> Result<(), StoreError> {
        if self.normalizer.width() != self.reducer.input_width() {
            return Err(StoreError::Corrupt {
                name: ArtifactName::Reducer.key().to_string(),
                reason: format!(
                    "expects {} input columns but the normalizer produces {}",
                    self.reducer.input_width(),
                    self.normalizer.width()
                ),
            });
        }
        if self.reducer.embedding_width() != self.assigner.width() || self.assigner.n_clusters() == 0 {
            return Err(StoreError::Corrupt {
                name: ArtifactName::Assigner.key().to_string(),
                reason: format!(
                    "holds {} centroids of width {} but embeddings have width {}",
                    self.assigner.n_clusters(),
                    self.assigner.width(),
                    self.reducer.embedding_width()
                ),
            });
        }
        Ok(())
    }
}

/// Cluster id and its advisory for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prediction {
    pub cluster: GroupId,
    pub advisory: &'static str,
}

/// Immutable serving state, built once at startup and shared by reference.
#[derive(Debug, Clone)]
pub struct ServingContext {
    pipeline: FittedPipeline,
    resolver: InsightResolver,
}

impl ServingContext {
    /// Load every artifact from `store`. Any missing or corrupt artifact fails the whole load.
    pub fn load(store: &ModelStore) -> Result<Self, StoreError> {
        let start = Instant::now();
        let pipeline = FittedPipeline::load(store)?;
        let context = Self::from_pipeline(pipeline);
        info!(
            location = %store.location(),
            columns = context.columns().len(),
            embedding_width = context.embedding_width(),
            clusters = context.n_clusters(),
            elapsed_micros = start.elapsed().as_micros(),
            "serving_context_loaded"
        );
        Ok(context)
    }

    pub fn from_pipeline(pipeline: FittedPipeline) -> Self {
        Self {
            pipeline,
            resolver: InsightResolver,
        }
    }

    pub fn predict(&self, record: &RawRecord) -> Result<Prediction, ServingError> {
        let cluster = self.pipeline.classify(record)?;
        Ok(Prediction {
            cluster,
            advisory: self.resolver.lookup(i64::from(cluster)),
        })
    }

    pub fn predict_survey(&self, survey: &SurveyRecord) -> Result<Prediction, ServingError> {
        self.predict(&RawRecord::from(survey))
    }

    pub fn pipeline(&self) -> &FittedPipeline {
        &self.pipeline
    }

    pub fn columns(&self) -> Vec<String> {
        self.pipeline
            .normalizer
            .column_names()
            .map(str::to_string)
            .collect()
    }

    pub fn embedding_width(&self) -> usize {
        self.pipeline.reducer.embedding_width()
    }

    pub fn n_clusters(&self) -> usize {
        self.pipeline.assigner.n_clusters()
    }
}
