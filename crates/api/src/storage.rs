//! Uploaded file contents, behind the [`FileStorage`] trait.
//!
//! Metadata lives in `stored_files`; a backend only maps an opaque
//! storage key to bytes. [`LocalStorage`] keeps one file per key under a
//! root directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("No stored object for key '{0}'")]
    NotFound(String),

    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::InternalError(err.to_string())
    }
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store `bytes` and return the new storage key.
    async fn put(&self, bytes: &[u8]) -> Result<String, StorageError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Remove the object. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Local-disk backend rooted at `FILES_DIR`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Keys are generated here, so anything that is not a plain UUID is
    /// rejected before it can reach the filesystem.
    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        if Uuid::parse_str(key).is_err() {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl FileStorage for LocalStorage {
    async fn put(&self, bytes: &[u8]) -> Result<String, StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let key = Uuid::now_v7().to_string();
        tokio::fs::write(self.path_for(&key)?, bytes).await?;
        Ok(key)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        match tokio::fs::read(self.path_for(key)?).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(key.into())),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.path_for(key)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("files"));

        let key = storage.put(b"receipt").await.unwrap();
        assert_eq!(storage.get(&key).await.unwrap(), b"receipt");

        storage.delete(&key).await.unwrap();
        assert_matches!(storage.get(&key).await, Err(StorageError::NotFound(_)));
        // Second delete is a no-op.
        storage.delete(&key).await.unwrap();
    }

    #[tokio::test]
    async fn rejects_keys_outside_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        assert_matches!(
            storage.get("../etc/passwd").await,
            Err(StorageError::InvalidKey(_))
        );
    }
}
