//! Persistent storage for the lookup table bundle.

use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::debug;

use super::error::CacheError;

/// The two values a bundle store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// Serialized lookup tables
    Bundle,
    /// Unix epoch milliseconds when the bundle was built
    Timestamp,
}

impl StoreKey {
    pub const ALL: [StoreKey; 2] = [StoreKey::Bundle, StoreKey::Timestamp];

    pub fn file_name(&self) -> &'static str {
        match self {
            StoreKey::Bundle => "lookup_tables.json",
            StoreKey::Timestamp => "last_updated",
        }
    }
}

/// Key-value storage for the persisted bundle.
pub trait BundleStore: Send + Sync + 'static {
    /// Read a value, or `None` if it was never written or has been cleared.
    fn read(&self, key: StoreKey)
    -> impl Future<Output = Result<Option<Vec<u8>>, CacheError>> + Send;

    fn write(
        &self,
        key: StoreKey,
        value: Vec<u8>,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// Remove every value.
    fn clear(&self) -> impl Future<Output = Result<(), CacheError>> + Send;
}

/// Stores each value as a file in one directory.
///
/// Writes go through a temporary file and a rename, so a reader never sees
/// a half-written value.
#[derive(Debug, Clone)]
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: StoreKey) -> PathBuf {
        self.dir.join(key.file_name())
    }
}

impl BundleStore for DiskStore {
    async fn read(&self, key: StoreKey) -> Result<Option<Vec<u8>>, CacheError> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::store(format!(
                "failed to read {}: {e}",
                key.file_name()
            ))),
        }
    }

    async fn write(&self, key: StoreKey, value: Vec<u8>) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            CacheError::store(format!("failed to create cache directory: {e}"))
        })?;

        let path = self.path(key);
        let tmp = path.with_extension("tmp");

        tokio::fs::write(&tmp, &value).await.map_err(|e| {
            CacheError::store(format!("failed to write {}: {e}", key.file_name()))
        })?;
        tokio::fs::rename(&tmp, &path).await.map_err(|e| {
            CacheError::store(format!("failed to replace {}: {e}", key.file_name()))
        })?;

        debug!(file = key.file_name(), bytes = value.len(), "Wrote cache file");
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        for key in StoreKey::ALL {
            match tokio::fs::remove_file(self.path(key)).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(CacheError::store(format!(
                        "failed to remove {}: {e}",
                        key.file_name()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// In-process store, for tests and for running without a cache directory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<StoreKey, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BundleStore for MemoryStore {
    async fn read(&self, key: StoreKey) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.values.lock().await.get(&key).cloned())
    }

    async fn write(&self, key: StoreKey, value: Vec<u8>) -> Result<(), CacheError> {
        self.values.lock().await.insert(key, value);
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.values.lock().await.clear();
        Ok(())
    }
}
