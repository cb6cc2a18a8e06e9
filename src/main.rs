use std::path::PathBuf;

use anyhow::Context;
use herhealth::{train, TrainingConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Usage: `herhealth [config.yaml]`. Without a file the defaults apply.
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = TrainingConfig::load(config_path.as_deref())
        .with_context(|| format!("loading training config {config_path:?}"))?;

    info!(
        input = %config.data.input.display(),
        model_dir = %config.store.model_dir.display(),
        n_clusters = config.cluster.n_clusters,
        "training_started"
    );
    let report = train(&config).context("training failed")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
