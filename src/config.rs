//! YAML configuration for the offline training job.
//!
//! Every section is optional; a missing file or section falls back to the
//! defaults below.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "cycle clusters"
//!
//! data:
//!   input: "data/health_data.csv"
//!   processed_output: "data/processed_data.csv"
//!   clustered_output: "data/clustered_data.csv"
//!
//! reducer:
//!   max_components: 5
//!
//! cluster:
//!   n_clusters: 5
//!   seed: 42
//!   n_init: 10
//!   max_iter: 300
//!   tol: 0.0001
//!
//! store:
//!   model_dir: "models"
//!   compression:
//!     codec: zstd
//!     level: 3
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use store::CompressionConfig;
use thiserror::Error;

/// Deployable cluster counts; the advisory table covers ids `0..=6`.
pub const CLUSTER_COUNT_RANGE: std::ops::RangeInclusive<usize> = 5..=7;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level training configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TrainingConfig {
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub reducer: ReducerYamlConfig,

    #[serde(default)]
    pub cluster: ClusterYamlConfig,

    #[serde(default)]
    pub store: StoreYamlConfig,
}

impl TrainingConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: TrainingConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// The file at `path` if one is given, otherwise the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigLoadError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.data.validate()?;
        self.reducer.validate()?;
        self.cluster.validate()?;
        self.store.validate()?;
        Ok(())
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            data: DataConfig::default(),
            reducer: ReducerYamlConfig::default(),
            cluster: ClusterYamlConfig::default(),
            store: StoreYamlConfig::default(),
        }
    }
}

/// Input and output CSV locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_input")]
    pub input: PathBuf,

    /// Standardized matrix under the original headers.
    #[serde(default = "default_processed_output")]
    pub processed_output: PathBuf,

    /// Embedding columns plus each row's cluster id.
    #[serde(default = "default_clustered_output")]
    pub clustered_output: PathBuf,
}

impl DataConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.input.as_os_str().is_empty() {
            return Err(ConfigLoadError::Validation("data.input must not be empty".into()));
        }
        if self.processed_output == self.clustered_output {
            return Err(ConfigLoadError::Validation(
                "data.processed_output and data.clustered_output must differ".into(),
            ));
        }
        Ok(())
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            processed_output: default_processed_output(),
            clustered_output: default_clustered_output(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReducerYamlConfig {
    #[serde(default = "default_max_components")]
    pub max_components: usize,
}

impl ReducerYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.max_components == 0 {
            return Err(ConfigLoadError::Validation(
                "reducer.max_components must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for ReducerYamlConfig {
    fn default() -> Self {
        Self {
            max_components: default_max_components(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterYamlConfig {
    #[serde(default = "default_n_clusters")]
    pub n_clusters: usize,

    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default = "default_n_init")]
    pub n_init: usize,

    #[serde(default = "default_max_iter")]
    pub max_iter: usize,

    #[serde(default = "default_tol")]
    pub tol: f64,
}

impl ClusterYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if !CLUSTER_COUNT_RANGE.contains(&self.n_clusters) {
            return Err(ConfigLoadError::Validation(format!(
                "cluster.n_clusters must be in {}..={}, got {}",
                CLUSTER_COUNT_RANGE.start(),
                CLUSTER_COUNT_RANGE.end(),
                self.n_clusters
            )));
        }
        if self.n_init == 0 {
            return Err(ConfigLoadError::Validation("cluster.n_init must be >= 1".into()));
        }
        if self.max_iter == 0 {
            return Err(ConfigLoadError::Validation(
                "cluster.max_iter must be >= 1".into(),
            ));
        }
        if !self.tol.is_finite() || self.tol < 0.0 {
            return Err(ConfigLoadError::Validation("cluster.tol must be >= 0".into()));
        }
        Ok(())
    }
}

impl Default for ClusterYamlConfig {
    fn default() -> Self {
        Self {
            n_clusters: default_n_clusters(),
            seed: default_seed(),
            n_init: default_n_init(),
            max_iter: default_max_iter(),
            tol: default_tol(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreYamlConfig {
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    #[serde(default)]
    pub compression: CompressionConfig,
}

impl StoreYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.model_dir.as_os_str().is_empty() {
            return Err(ConfigLoadError::Validation(
                "store.model_dir must not be empty".into(),
            ));
        }
        self.compression
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("store.compression: {e}")))
    }
}

impl Default for StoreYamlConfig {
    fn default() -> Self {
        Self {
            model_dir: default_model_dir(),
            compression: CompressionConfig::default(),
        }
    }
}

fn default_input() -> PathBuf {
    PathBuf::from("data/health_data.csv")
}
fn default_processed_output() -> PathBuf {
    PathBuf::from("data/processed_data.csv")
}
fn default_clustered_output() -> PathBuf {
    PathBuf::from("data/clustered_data.csv")
}
fn default_max_components() -> usize {
    reduce::DEFAULT_MAX_COMPONENTS
}
fn default_n_clusters() -> usize {
    5
}
fn default_seed() -> u64 {
    cluster::DEFAULT_SEED
}
fn default_n_init() -> usize {
    cluster::DEFAULT_N_INIT
}
fn default_max_iter() -> usize {
    cluster::DEFAULT_MAX_ITER
}
fn default_tol() -> f64 {
    cluster::DEFAULT_TOLERANCE
}
fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use store::CompressionCodec;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_valid_yaml() {
        let yaml = r#"
version: "1.0"
name: "test config"
cluster:
  n_clusters: 7
  seed: 7
store:
  model_dir: "/tmp/models"
"#;

        let config = TrainingConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.name.as_deref(), Some("test config"));
        assert_eq!(config.cluster.n_clusters, 7);
        assert_eq!(config.cluster.seed, 7);
        assert_eq!(config.cluster.n_init, 10);
        assert_eq!(config.store.model_dir, PathBuf::from("/tmp/models"));
        assert_eq!(config.reducer.max_components, 5);
    }

    #[test]
    fn test_load_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"version: \"1\"\n").unwrap();

        let config = TrainingConfig::load(Some(temp_file.path())).unwrap();
        assert_eq!(config.version, "1");
        assert_eq!(config.data, DataConfig::default());
    }

    #[test]
    fn test_default_config() {
        let config = TrainingConfig::load(None).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.data.input, PathBuf::from("data/health_data.csv"));
        assert_eq!(config.cluster.seed, 42);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cluster_count_range() {
        for k in [4, 8] {
            let yaml = format!("version: \"1.0\"\ncluster:\n  n_clusters: {k}\n");
            let err = TrainingConfig::from_yaml(&yaml).unwrap_err();
            assert!(err.to_string().contains("n_clusters"));
        }
    }

    #[test]
    fn test_unsupported_version() {
        let err = TrainingConfig::from_yaml("version: \"2\"\n").unwrap_err();
        assert!(matches!(err, ConfigLoadError::UnsupportedVersion(v) if v == "2"));
    }

    #[test]
    fn test_compression_section() {
        let yaml = r#"
version: "1.0"
store:
  compression:
    codec: none
"#;
        let config = TrainingConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.store.compression.codec, CompressionCodec::None);

        let bad = "version: \"1.0\"\nstore:\n  compression:\n    level: 40\n";
        assert!(TrainingConfig::from_yaml(bad).is_err());
    }

    #[test]
    fn test_outputs_must_differ() {
        let yaml = r#"
version: "1.0"
data:
  processed_output: "out.csv"
  clustered_output: "out.csv"
"#;
        assert!(TrainingConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = TrainingConfig::from_file("/no/such/config.yaml").unwrap_err();
        assert!(matches!(err, ConfigLoadError::FileRead(_)));
    }
}
