use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::StoreError;

/// File extension of artifacts written by [`FileBackend`].
pub const ARTIFACT_EXTENSION: &str = "bin";

/// Byte storage for named artifacts.
pub trait StoreBackend: Send + Sync {
    /// Insert or replace the bytes stored under `key`.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;
    /// `Ok(None)` when nothing is stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    fn delete(&self, key: &str) -> Result<(), StoreError>;
    /// Human-readable location, used in logs.
    fn describe(&self) -> String;
}

/// Selects and builds a backend.
///
/// ```
/// use store::BackendConfig;
///
/// let config = BackendConfig::directory("models");
/// assert!(matches!(config, BackendConfig::Directory { .. }));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// One file per artifact under `path`.
    Directory { path: PathBuf },
    /// Process-local map, for tests.
    InMemory,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Directory {
            path: PathBuf::from("models"),
        }
    }
}

impl BackendConfig {
    pub fn directory<P: Into<PathBuf>>(path: P) -> Self {
        BackendConfig::Directory { path: path.into() }
    }

    pub fn in_memory() -> Self {
        BackendConfig::InMemory
    }

    pub fn build(&self) -> Box<dyn StoreBackend> {
        match self {
            BackendConfig::Directory { path } => Box::new(FileBackend::new(path)),
            BackendConfig::InMemory => Box::new(InMemoryBackend::new()),
        }
    }
}

/// Stores each artifact as `<root>/<key>.bin`.
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// reader never sees a half-written artifact.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.root.join(format!("{key}.{ARTIFACT_EXTENSION}")))
    }
}

impl StoreBackend for FileBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let target = self.path_for(key)?;
        fs::create_dir_all(&self.root).map_err(StoreError::backend)?;
        let staging = self.root.join(format!(".{key}.{ARTIFACT_EXTENSION}.tmp"));
        fs::write(&staging, value).map_err(StoreError::backend)?;
        fs::rename(&staging, &target).map_err(StoreError::backend)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(self.path_for(key)?) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::backend(err)),
        }
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::backend(err)),
        }
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// An in-memory backend using a `RwLock` around a `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    records: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreBackend for InMemoryBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        validate_key(key)?;
        self.records
            .write()
            .map_err(|_| StoreError::backend("poisoned lock"))?
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let guard = self
            .records
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        Ok(guard.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.records
            .write()
            .map_err(|_| StoreError::backend("poisoned lock"))?
            .remove(key);
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}

/// Keys become file names; keep them to `[A-Za-z0-9_-]`.
fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StoreError::backend(format!("invalid artifact key `{key}`")))
    }
}
