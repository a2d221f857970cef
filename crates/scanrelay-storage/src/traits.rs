//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Headers attached to a stored object and replayed to whoever downloads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHeaders {
    pub content_type: String,
    pub content_disposition: Option<String>,
}

impl ObjectHeaders {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            content_disposition: None,
        }
    }

    pub fn with_disposition(mut self, disposition: impl Into<String>) -> Self {
        self.content_disposition = Some(disposition.into());
        self
    }
}

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem) must implement this trait so the
/// relay can forward files without knowing where they end up.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload the file at `local_path` under `storage_key` and return its URL.
    ///
    /// The local file is only read; removing it stays the caller's job.
    async fn upload_file(
        &self,
        local_path: &Path,
        storage_key: &str,
        headers: &ObjectHeaders,
    ) -> StorageResult<String>;

    /// Public URL of the object stored under `storage_key`
    fn object_url(&self, storage_key: &str) -> String;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
