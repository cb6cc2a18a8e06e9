//! The offline training job: CSV in, processed CSVs and artifacts out.

use std::fs;
use std::path::Path;
use std::time::Instant;

use cluster::GroupId;
use normalize::{Dataset, StandardizedVector};
use reduce::Embedding;
use serde::Serialize;
use store::{FileBackend, ModelStore};
use tracing::info;

use crate::config::{DataConfig, TrainingConfig};
use crate::pipeline::{fit_pipeline, PipelineFit, PipelineParams};
use crate::TrainingError;

/// Name of the cluster id column in the clustered CSV.
pub const CLUSTER_COLUMN: &str = "KMeans_Cluster";

/// Summary of one training run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub rows: usize,
    pub columns: usize,
    pub categorical_columns: Vec<String>,
    pub embedding_width: usize,
    pub explained_variance_ratio: Vec<f64>,
    /// Training rows per cluster id.
    pub cluster_sizes: Vec<usize>,
    pub inertia: f64,
    pub iterations: usize,
    pub seed: u64,
}

impl TrainingReport {
    fn from_fit(dataset: &Dataset, fit: &PipelineFit) -> Self {
        let pipeline = &fit.pipeline;
        let mut cluster_sizes = vec![0; pipeline.assigner.n_clusters()];
        for label in &fit.labels {
            cluster_sizes[label.index()] += 1;
        }
        Self {
            rows: dataset.n_rows(),
            columns: pipeline.normalizer.width(),
            categorical_columns: pipeline
                .normalizer
                .categorical_columns()
                .map(|c| c.name.clone())
                .collect(),
            embedding_width: pipeline.reducer.embedding_width(),
            explained_variance_ratio: pipeline.reducer.explained_variance_ratio().to_vec(),
            cluster_sizes,
            inertia: pipeline.assigner.inertia(),
            iterations: pipeline.assigner.n_iter(),
            seed: pipeline.assigner.seed(),
        }
    }
}

/// Run the full job described by `config`.
pub fn train(config: &TrainingConfig) -> Result<TrainingReport, TrainingError> {
    let dataset = Dataset::from_csv_path(&config.data.input)?;
    let store = ModelStore::with_backend(
        Box::new(FileBackend::new(&config.store.model_dir)),
        config.store.compression,
    );
    let (_, report) = train_dataset(&dataset, &PipelineParams::from(config), &store, Some(&config.data))?;
    Ok(report)
}

/// Fit on an in-memory dataset, save the artifacts, and write the output
/// CSVs when `outputs` is given.
pub fn train_dataset(
    dataset: &Dataset,
    params: &PipelineParams,
    store: &ModelStore,
    outputs: Option<&DataConfig>,
) -> Result<(PipelineFit, TrainingReport), TrainingError> {
    let start = Instant::now();
    let fit = fit_pipeline(dataset, params)?;

    if let Some(outputs) = outputs {
        write_processed_csv(&outputs.processed_output, dataset.columns(), &fit.standardized)?;
        write_clustered_csv(&outputs.clustered_output, &fit.embeddings, &fit.labels)?;
    }
    fit.pipeline.save(store)?;

    let report = TrainingReport::from_fit(dataset, &fit);
    for (cluster, members) in report.cluster_sizes.iter().enumerate() {
        info!(cluster, members, "cluster_distribution");
    }
    info!(
        rows = report.rows,
        columns = report.columns,
        embedding_width = report.embedding_width,
        clusters = report.cluster_sizes.len(),
        inertia = report.inertia,
        elapsed_micros = start.elapsed().as_micros(),
        "training_complete"
    );
    Ok((fit, report))
}

/// Standardized matrix under the original headers.
pub fn write_processed_csv(
    path: &Path,
    columns: &[String],
    rows: &[StandardizedVector],
) -> Result<(), TrainingError> {
    let mut writer = open_writer(path)?;
    writer.write_record(columns).map_err(|e| output_error(path, e))?;
    for row in rows {
        writer
            .write_record(row.as_slice().iter().map(f64::to_string))
            .map_err(|e| output_error(path, e))?;
    }
    writer.flush().map_err(|e| output_error(path, e))?;
    info!(path = %path.display(), rows = rows.len(), "processed_csv_written");
    Ok(())
}

/// `PC1..PCk` embedding columns followed by [`CLUSTER_COLUMN`].
pub fn write_clustered_csv(
    path: &Path,
    embeddings: &[Embedding],
    labels: &[GroupId],
) -> Result<(), TrainingError> {
    let width = embeddings.first().map_or(0, Embedding::len);
    let mut writer = open_writer(path)?;
    let header: Vec<String> = (1..=width)
        .map(|i| format!("PC{i}"))
        .chain(std::iter::once(CLUSTER_COLUMN.to_string()))
        .collect();
    writer.write_record(&header).map_err(|e| output_error(path, e))?;
    for (embedding, label) in embeddings.iter().zip(labels) {
        let record = embedding
            .as_slice()
            .iter()
            .map(f64::to_string)
            .chain(std::iter::once(label.to_string()));
        writer.write_record(record).map_err(|e| output_error(path, e))?;
    }
    writer.flush().map_err(|e| output_error(path, e))?;
    info!(path = %path.display(), rows = embeddings.len(), "clustered_csv_written");
    Ok(())
}

fn open_writer(path: &Path) -> Result<csv::Writer<fs::File>, TrainingError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| output_error(path, e))?;
    }
    csv::Writer::from_path(path).map_err(|e| output_error(path, e))
}

fn output_error(path: &Path, err: impl std::fmt::Display) -> TrainingError {
    TrainingError::Output {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}
