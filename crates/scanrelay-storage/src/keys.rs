//! Shared key generation for storage backends.
//!
//! Key format: `{prefix}/{filename}`, e.g. `downloads/report.pdf`.

use crate::{StorageError, StorageResult};

/// Generate the storage key for a sanitized filename under `prefix`.
///
/// Trailing slashes on the prefix are ignored; an empty prefix stores at the bucket root.
pub fn generate_storage_key(prefix: &str, filename: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        filename.to_string()
    } else {
        format!("{}/{}", prefix, filename)
    }
}

/// Reject keys that could address something outside the configured namespace.
pub fn validate_storage_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if storage_key.starts_with('/') || storage_key.contains('\\') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    // Dots inside a name are fine; only whole `.`/`..` segments navigate.
    if storage_key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(StorageError::InvalidKey(
            "Storage key contains a relative path segment".to_string(),
        ));
    }
    Ok(())
}
