use advisor::GeneratorConfig;
use herhealth::CompressionConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the hosted model's API key.
pub const API_KEY_ENV: &str = "TOGETHER_API_KEY";

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in KB
    #[serde(default = "default_max_body_size_kb")]
    pub max_body_size_kb: usize,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Metrics endpoint enabled
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Directory holding the fitted artifacts
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    /// Must match the compression the artifacts were written with
    #[serde(default)]
    pub compression: CompressionConfig,

    /// Text-generation client
    #[serde(default)]
    pub generator: GeneratorConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_kb: default_max_body_size_kb(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            metrics_enabled: default_true(),
            model_dir: default_model_dir(),
            compression: CompressionConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `.env`, an optional `server.*` file and
    /// `HERHEALTH_SERVER__*` environment variables
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let builder = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::with_name("server").required(false))
            // Override with environment variables
            .add_source(
                config::Environment::with_prefix("HERHEALTH_SERVER")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut config: ServerConfig = builder.build()?.try_deserialize()?;

        if !config.generator.has_api_key() {
            config.generator.api_key = std::env::var(API_KEY_ENV)
                .ok()
                .filter(|key| !key.trim().is_empty());
        }
        if !config.generator.has_api_key() {
            tracing::warn!("No {API_KEY_ENV} configured, AI insights will use the fallback text");
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be positive");
        }
        if self.max_body_size_kb == 0 {
            anyhow::bail!("max_body_size_kb must be positive");
        }
        self.compression
            .validate()
            .map_err(|e| anyhow::anyhow!("compression: {e}"))?;
        self.generator
            .validate()
            .map_err(|e| anyhow::anyhow!("generator: {e}"))?;
        Ok(())
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_kb * 1024
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_body_size_kb() -> usize {
    64
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}
