use crate::keys::validate_storage_key;
use crate::traits::{ObjectHeaders, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Local filesystem storage implementation
///
/// Intended for development: object headers are logged but not persisted.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for stored objects (e.g., "/var/lib/scanrelay/objects")
    /// * `base_url` - Base URL the objects are served from (e.g., "http://localhost:5000/objects")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
        })
    }

    /// Convert storage key to filesystem path, refusing anything that resolves
    /// outside the base directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        validate_storage_key(storage_key)?;

        let path = self.base_path.join(storage_key);
        if path.strip_prefix(&self.base_path).is_err() {
            return Err(StorageError::InvalidKey(
                "Storage key resolves outside storage directory".to_string(),
            ));
        }

        Ok(path)
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload_file(
        &self,
        local_path: &Path,
        storage_key: &str,
        headers: &ObjectHeaders,
    ) -> StorageResult<String> {
        let start = std::time::Instant::now();
        let destination = self.key_to_path(storage_key)?;
        self.ensure_parent_dir(&destination).await?;

        let size = fs::copy(local_path, &destination).await.map_err(|e| {
            tracing::error!(
                error = %e,
                source = %local_path.display(),
                key = %storage_key,
                "Local upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            key = %storage_key,
            size_bytes = size,
            content_type = %headers.content_type,
            content_disposition = ?headers.content_disposition,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local upload successful"
        );

        Ok(self.object_url(storage_key))
    }

    fn object_url(&self, storage_key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), storage_key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
