//! File Storage - Atomic JSON Slot Persistence
//!
//! Each key maps to `<data_dir>/<key>.json`. Writes go to a temporary
//! file first and are then renamed over the slot, so a slot is always
//! either the old or the new value, never a partial write.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, instrument};

use crate::ports::storage::{KeyValueStorage, is_valid_key};

/// Directory-backed key-value storage.
pub struct FileStorage {
    /// Directory holding one file per key.
    data_dir: PathBuf,
}

impl FileStorage {
    /// Create a new file storage in the given data directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub async fn new(data_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = data_dir.as_ref();
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create data directory {}", dir.display()))?;

        Ok(Self {
            data_dir: dir.to_path_buf(),
        })
    }

    /// Resolve the slot path for a key.
    ///
    /// Keys are restricted to `[A-Za-z0-9_-]` so they can't escape
    /// the data directory.
    fn slot_path(&self, key: &str) -> Result<PathBuf> {
        anyhow::ensure!(is_valid_key(key), "Invalid storage key: {key:?}");
        Ok(self.data_dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl KeyValueStorage for FileStorage {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.slot_path(key)?;
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Slot empty");
                Ok(None)
            }
            Err(e) => Err(e)
                .with_context(|| format!("Failed to read slot {}", path.display())),
        }
    }

    #[instrument(skip(self, value), fields(bytes = value.len()))]
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.slot_path(key)?;
        let tmp_path = path.with_extension("json.tmp");

        fs::write(&tmp_path, value)
            .await
            .context("Failed to write tmp slot file")?;

        fs::rename(&tmp_path, &path)
            .await
            .context("Failed to rename slot file")?;

        debug!(path = %path.display(), "Slot written");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.slot_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove slot {}", path.display())),
        }
    }

    /// Check if the data directory is writable.
    async fn is_healthy(&self) -> bool {
        let test_path = self.data_dir.join(".health_check");
        let result = fs::write(&test_path, b"ok").await;
        let _ = fs::remove_file(&test_path).await;
        result.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).await.unwrap();

        assert_eq!(storage.get("tradeHistory").await.unwrap(), None);

        storage.set("tradeHistory", "[1,2]").await.unwrap();
        assert_eq!(
            storage.get("tradeHistory").await.unwrap().as_deref(),
            Some("[1,2]")
        );
        assert!(!dir.path().join("tradeHistory.json.tmp").exists());

        storage.remove("tradeHistory").await.unwrap();
        storage.remove("tradeHistory").await.unwrap();
        assert_eq!(storage.get("tradeHistory").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).await.unwrap();
        assert!(storage.set("../escape", "x").await.is_err());
        assert!(storage.get("").await.is_err());
    }

    #[tokio::test]
    async fn test_healthy_dir() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).await.unwrap();
        assert!(storage.is_healthy().await);
    }
}
