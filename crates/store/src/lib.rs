//! Persistence for fitted pipeline artifacts.
//!
//! Every artifact is wrapped in an envelope carrying a schema version and a
//! stage tag, encoded with bincode (serde mode, standard config) and then
//! compressed. Loading checks both tags before decoding the payload, so a
//! reducer file renamed to `scaler.bin` is reported as corrupt instead of
//! being misread.
//!
//! The three artifact names are fixed: `scaler`, `pca_model` and
//! `kmeans_model`. A serving process loads all three or refuses to start.
//!
//! ```
//! use store::{ArtifactName, BackendConfig, ModelStore};
//!
//! let store = ModelStore::new(BackendConfig::in_memory());
//! store.save(ArtifactName::Assigner, &vec![1.5_f64, 2.5]).unwrap();
//! let back: Vec<f64> = store.load(ArtifactName::Assigner).unwrap();
//! assert_eq!(back, vec![1.5, 2.5]);
//! ```

use std::fmt;
use std::time::Instant;

use bincode::config::standard;
use bincode::error::{DecodeError, EncodeError};
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use zstd::{decode_all, encode_all};

mod backend;

pub use backend::{ARTIFACT_EXTENSION, BackendConfig, FileBackend, InMemoryBackend, StoreBackend};

/// Bump whenever the layout of any stored artifact changes.
pub const STORE_SCHEMA_VERSION: u16 = 1;

/// The fitted stages a serving process needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactName {
    Normalizer,
    Reducer,
    Assigner,
}

impl ArtifactName {
    pub const ALL: [ArtifactName; 3] = [
        ArtifactName::Normalizer,
        ArtifactName::Reducer,
        ArtifactName::Assigner,
    ];

    /// Storage key.
    pub fn key(self) -> &'static str {
        match self {
            ArtifactName::Normalizer => "scaler",
            ArtifactName::Reducer => "pca_model",
            ArtifactName::Assigner => "kmeans_model",
        }
    }

    /// Stage tag written into the envelope.
    pub fn stage(self) -> &'static str {
        match self {
            ArtifactName::Normalizer => "normalizer",
            ArtifactName::Reducer => "reducer",
            ArtifactName::Assigner => "assigner",
        }
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Compression codec options for stored artifacts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionCodec {
    None,
    #[default]
    Zstd,
}

/// Compression behavior configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionConfig {
    #[serde(default)]
    pub codec: CompressionCodec,
    /// 1-22 for Zstd.
    #[serde(default = "default_level")]
    pub level: i32,
}

fn default_level() -> i32 {
    3
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            codec: CompressionCodec::default(),
            level: default_level(),
        }
    }
}

impl CompressionConfig {
    pub fn new(codec: CompressionCodec, level: i32) -> Self {
        Self { codec, level }
    }

    pub fn with_codec(mut self, codec: CompressionCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.codec == CompressionCodec::Zstd && !(1..=22).contains(&self.level) {
            return Err(format!("zstd level must be in 1..=22, got {}", self.level));
        }
        Ok(())
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, std::io::Error> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => encode_all(data, self.level),
        }
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, std::io::Error> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => decode_all(data),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Nothing is stored under the artifact's key.
    #[error("artifact `{name}` not found in {location}")]
    NotFound { name: String, location: String },

    /// The stored bytes do not decode to the expected artifact.
    #[error("artifact `{name}` is corrupt: {reason}")]
    Corrupt { name: String, reason: String },

    #[error("backend error: {0}")]
    Backend(String),

    #[error("failed to encode artifact: {0}")]
    Encode(String),
}

impl From<EncodeError> for StoreError {
    fn from(e: EncodeError) -> Self {
        StoreError::Encode(e.to_string())
    }
}

impl StoreError {
    pub fn backend<E: fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }

    fn corrupt(name: ArtifactName, reason: impl fmt::Display) -> Self {
        Self::Corrupt {
            name: name.key().to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    schema_version: u16,
    stage: &'a str,
    artifact: &'a T,
}

#[derive(Deserialize)]
struct EnvelopeHeader {
    schema_version: u16,
    stage: String,
}

#[derive(Deserialize)]
struct Envelope<T> {
    #[allow(dead_code)]
    schema_version: u16,
    #[allow(dead_code)]
    stage: String,
    artifact: T,
}

/// Saves and loads fitted artifacts through a [`StoreBackend`].
pub struct ModelStore {
    backend: Box<dyn StoreBackend>,
    compression: CompressionConfig,
}

impl ModelStore {
    pub fn new(config: BackendConfig) -> Self {
        Self::with_backend(config.build(), CompressionConfig::default())
    }

    /// Build a store with a custom backend and compression settings.
    pub fn with_backend(backend: Box<dyn StoreBackend>, compression: CompressionConfig) -> Self {
        Self {
            backend,
            compression,
        }
    }

    pub fn compression(&self) -> CompressionConfig {
        self.compression
    }

    pub fn location(&self) -> String {
        self.backend.describe()
    }

    /// Serialize, compress and store one artifact, replacing any previous one.
    pub fn save<T: Serialize>(&self, name: ArtifactName, artifact: &T) -> Result<(), StoreError> {
        let start = Instant::now();
        let envelope = EnvelopeRef {
            schema_version: STORE_SCHEMA_VERSION,
            stage: name.stage(),
            artifact,
        };
        let encoded = encode_to_vec(&envelope, standard())?;
        let compressed = self
            .compression
            .compress(&encoded)
            .map_err(|e| StoreError::Encode(e.to_string()))?;
        self.backend.put(name.key(), &compressed)?;
        info!(
            artifact = name.key(),
            location = %self.backend.describe(),
            raw_bytes = encoded.len(),
            stored_bytes = compressed.len(),
            elapsed_micros = start.elapsed().as_micros(),
            "artifact_saved"
        );
        Ok(())
    }

    /// Load one artifact, checking schema version and stage tag.
    pub fn load<T: DeserializeOwned>(&self, name: ArtifactName) -> Result<T, StoreError> {
        let start = Instant::now();
        let stored = self
            .backend
            .get(name.key())?
            .ok_or_else(|| StoreError::NotFound {
                name: name.key().to_string(),
                location: self.backend.describe(),
            })?;
        let bytes = self
            .compression
            .decompress(&stored)
            .map_err(|e| StoreError::corrupt(name, format!("decompression failed: {e}")))?;

        let (header, _): (EnvelopeHeader, usize) =
            decode_from_slice(&bytes, standard()).map_err(|e| decode_failure(name, e))?;
        if header.schema_version != STORE_SCHEMA_VERSION {
            return Err(StoreError::corrupt(
                name,
                format!(
                    "schema version {} is not supported (expected {STORE_SCHEMA_VERSION})",
                    header.schema_version
                ),
            ));
        }
        if header.stage != name.stage() {
            return Err(StoreError::corrupt(
                name,
                format!("holds a `{}` artifact, expected `{}`", header.stage, name.stage()),
            ));
        }

        let (envelope, consumed): (Envelope<T>, usize) =
            decode_from_slice(&bytes, standard()).map_err(|e| decode_failure(name, e))?;
        if consumed != bytes.len() {
            return Err(StoreError::corrupt(
                name,
                format!("{} trailing bytes", bytes.len() - consumed),
            ));
        }
        debug!(
            artifact = name.key(),
            bytes = stored.len(),
            elapsed_micros = start.elapsed().as_micros(),
            "artifact_loaded"
        );
        Ok(envelope.artifact)
    }

    pub fn exists(&self, name: ArtifactName) -> Result<bool, StoreError> {
        Ok(self.backend.get(name.key())?.is_some())
    }

    pub fn delete(&self, name: ArtifactName) -> Result<(), StoreError> {
        self.backend.delete(name.key())
    }
}

fn decode_failure(name: ArtifactName, err: DecodeError) -> StoreError {
    StoreError::corrupt(name, format!("decode failed: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Centroids {
        rows: Vec<Vec<f64>>,
        seed: u64,
    }

    fn sample() -> Centroids {
        Centroids {
            rows: vec![vec![0.25, -1.5], vec![3.0, 1.0 / 3.0]],
            seed: 42,
        }
    }

    #[test]
    fn save_then_load_from_directory() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(BackendConfig::directory(dir.path()));
        store.save(ArtifactName::Assigner, &sample()).unwrap();

        assert!(dir.path().join("kmeans_model.bin").exists());
        let back: Centroids = store.load(ArtifactName::Assigner).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn missing_artifact_is_not_found() {
        let store = ModelStore::new(BackendConfig::in_memory());
        let err = store.load::<Centroids>(ArtifactName::Reducer).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { ref name, .. } if name == "pca_model"));
        assert!(!store.exists(ArtifactName::Reducer).unwrap());
    }

    #[test]
    fn garbage_bytes_are_corrupt() {
        let backend = InMemoryBackend::new();
        backend.put("scaler", b"definitely not zstd").unwrap();
        let store = ModelStore::with_backend(Box::new(backend), CompressionConfig::default());

        let err = store.load::<Centroids>(ArtifactName::Normalizer).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { ref name, .. } if name == "scaler"));
    }

    #[test]
    fn stage_mismatch_is_corrupt() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(BackendConfig::directory(dir.path()));
        store.save(ArtifactName::Assigner, &sample()).unwrap();
        std::fs::rename(
            dir.path().join("kmeans_model.bin"),
            dir.path().join("pca_model.bin"),
        )
        .unwrap();

        let err = store.load::<Centroids>(ArtifactName::Reducer).unwrap_err();
        match err {
            StoreError::Corrupt { reason, .. } => assert!(reason.contains("assigner")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn truncated_payload_is_corrupt() {
        let backend = InMemoryBackend::new();
        let raw = CompressionConfig::default().with_codec(CompressionCodec::None);
        let store = ModelStore::with_backend(Box::new(backend), raw);
        store.save(ArtifactName::Normalizer, &sample()).unwrap();

        let bytes = store.backend.get("scaler").unwrap().unwrap();
        store.backend.put("scaler", &bytes[..bytes.len() - 4]).unwrap();
        assert!(matches!(
            store.load::<Centroids>(ArtifactName::Normalizer),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn uncompressed_round_trip() {
        let store = ModelStore::with_backend(
            Box::new(InMemoryBackend::new()),
            CompressionConfig::new(CompressionCodec::None, 0),
        );
        store.save(ArtifactName::Reducer, &sample()).unwrap();
        assert_eq!(store.load::<Centroids>(ArtifactName::Reducer).unwrap(), sample());
    }

    #[test]
    fn compression_level_is_validated() {
        assert!(CompressionConfig::default().validate().is_ok());
        assert!(CompressionConfig::default().with_level(30).validate().is_err());
        assert!(CompressionConfig::new(CompressionCodec::None, 0).validate().is_ok());
    }

    #[test]
    fn artifact_keys_are_fixed() {
        let keys: Vec<_> = ArtifactName::ALL.iter().map(|a| a.key()).collect();
        assert_eq!(keys, vec!["scaler", "pca_model", "kmeans_model"]);
    }
}
