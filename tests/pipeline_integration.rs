mod common;

use std::fs;

use herhealth::{
    BackendConfig, CLUSTER_COLUMN, InsightResolver, ModelStore, PipelineParams, RawRecord,
    ServingContext, train, train_dataset,
};
use tempfile::tempdir;

use common::{ROWS, config_in, has_missing_cell, survey_csv, survey_dataset, survey_record, write_file};

#[test]
fn training_job_writes_outputs_and_artifacts() {
    let dir = tempdir().unwrap();
    let input = write_file(dir.path(), "health_data.csv", &survey_csv(ROWS));
    let config = config_in(dir.path(), input);

    let report = train(&config).expect("training succeeds");
    assert_eq!(report.rows, ROWS);
    assert_eq!(report.columns, 13);
    assert!(report.categorical_columns.is_empty());
    assert_eq!(report.embedding_width, 5);
    assert_eq!(report.explained_variance_ratio.len(), 5);
    assert_eq!(report.cluster_sizes.len(), 5);
    assert_eq!(report.cluster_sizes.iter().sum::<usize>(), ROWS);
    assert_eq!(report.seed, 42);

    for artifact in ["scaler.bin", "pca_model.bin", "kmeans_model.bin"] {
        assert!(config.store.model_dir.join(artifact).exists(), "{artifact} missing");
    }

    let processed = fs::read_to_string(&config.data.processed_output).unwrap();
    let mut lines = processed.lines();
    assert_eq!(lines.next().unwrap(), survey_csv(0).trim_end());
    assert_eq!(lines.count(), ROWS);

    let clustered = fs::read_to_string(&config.data.clustered_output).unwrap();
    let header = clustered.lines().next().unwrap();
    assert_eq!(header, format!("PC1,PC2,PC3,PC4,PC5,{CLUSTER_COLUMN}"));
    for line in clustered.lines().skip(1) {
        let cluster: u32 = line.rsplit(',').next().unwrap().parse().unwrap();
        assert!(cluster < 5);
    }
}

#[test]
fn served_predictions_match_training_labels() {
    let dataset = survey_dataset();
    let store = ModelStore::new(BackendConfig::in_memory());
    let (fit, _) = train_dataset(&dataset, &PipelineParams::default(), &store, None).unwrap();

    let context = ServingContext::load(&store).expect("artifacts load");
    for i in (0..ROWS).filter(|i| !has_missing_cell(*i)) {
        let record = dataset.record(i).unwrap();
        let prediction = context.predict(&record).unwrap();
        assert_eq!(prediction.cluster, fit.labels[i], "row {i}");
        assert_eq!(
            prediction.advisory,
            InsightResolver.lookup(i64::from(prediction.cluster))
        );
    }
}

#[test]
fn survey_form_matches_csv_row() {
    let dataset = survey_dataset();
    let store = ModelStore::new(BackendConfig::in_memory());
    train_dataset(&dataset, &PipelineParams::default(), &store, None).unwrap();
    let context = ServingContext::load(&store).unwrap();

    for i in [0, 1, 3] {
        let from_form = context.predict_survey(&survey_record(i)).unwrap();
        let from_csv = context.predict(&dataset.record(i).unwrap()).unwrap();
        assert_eq!(from_form, from_csv);
    }
}

#[test]
fn groups_are_recovered() {
    let dataset = survey_dataset();
    let store = ModelStore::new(BackendConfig::in_memory());
    let (fit, report) =
        train_dataset(&dataset, &PipelineParams::default(), &store, None).unwrap();

    // Rows i and i + 5 come from the same synthetic group.
    for i in (0..ROWS - 5).filter(|i| !has_missing_cell(*i) && !has_missing_cell(i + 5)) {
        assert_eq!(fit.labels[i], fit.labels[i + 5], "rows {i} and {}", i + 5);
    }
    assert!(report.cluster_sizes.iter().all(|&size| size > 0));
}

#[test]
fn seven_clusters_are_supported() {
    let dataset = survey_dataset();
    let store = ModelStore::new(BackendConfig::in_memory());
    let params = PipelineParams::default().with_clusters(7);
    let (fit, report) = train_dataset(&dataset, &params, &store, None).unwrap();

    assert_eq!(fit.pipeline.assigner.n_clusters(), 7);
    assert_eq!(report.cluster_sizes.len(), 7);

    let context = ServingContext::load(&store).unwrap();
    let record: RawRecord = dataset.record(0).unwrap();
    assert!(context.predict(&record).unwrap().cluster.get() < 7);
}
