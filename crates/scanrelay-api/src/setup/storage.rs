//! Object store setup

use anyhow::{Context, Result};
use scanrelay_core::Config;
use scanrelay_storage::{create_storage, Storage};
use std::sync::Arc;

/// Build the configured storage backend.
pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    let storage = create_storage(config)
        .await
        .context("Failed to initialize object storage")?;

    tracing::info!(
        backend = %storage.backend_type(),
        bucket = ?config.s3_bucket(),
        key_prefix = %config.object_key_prefix(),
        "Object storage initialized"
    );

    Ok(storage)
}
