use crate::config::ServerConfig;
use advisor::{build_generator, TextGenerator};
use anyhow::Context;
use herhealth::{BackendConfig, ModelStore, ServingContext};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Shared application state
///
/// Everything here is read-only after startup.
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Fitted normalizer, reducer and assigner plus the advisory table
    pub serving: Arc<ServingContext>,

    /// Hosted model client, or a disabled stand-in
    pub generator: Arc<dyn TextGenerator>,

    /// Prometheus recorder handle when metrics are enabled
    pub metrics: Option<PrometheusHandle>,

    /// When the state was built, before the listener binds
    pub started_at: Instant,
}

impl ServerState {
    /// Load the artifacts from `config.model_dir` and build the generator.
    ///
    /// Missing or corrupt artifacts fail startup.
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let store = ModelStore::with_backend(
            BackendConfig::directory(&config.model_dir).build(),
            config.compression,
        );
        let serving = ServingContext::load(&store)
            .with_context(|| format!("loading model artifacts from {}", store.location()))?;

        let generator = build_generator(&config.generator);

        let metrics = if config.metrics_enabled {
            Some(
                PrometheusBuilder::new()
                    .install_recorder()
                    .context("installing prometheus recorder")?,
            )
        } else {
            None
        };

        Ok(Self {
            config: Arc::new(config),
            serving: Arc::new(serving),
            generator,
            metrics,
            started_at: Instant::now(),
        })
    }

    /// Assemble state from already-built parts, without a metrics recorder.
    pub fn with_components(
        config: ServerConfig,
        serving: ServingContext,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            serving: Arc::new(serving),
            generator,
            metrics: None,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Time allowed for one text-generation call.
    pub fn generation_budget(&self) -> Duration {
        self.config.generator.timeout
    }
}
