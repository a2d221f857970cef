//! Service initialization

use crate::state::AppState;
use anyhow::{Context, Result};
use scanrelay_core::Config;
use scanrelay_services::{create_scanner, RelayOptions, ScratchSpace, Storage, UploadRelay};
use std::sync::Arc;

/// Build the scanner, scratch space and relay around an initialized storage backend.
pub async fn initialize_services(
    config: &Config,
    storage: Arc<dyn Storage>,
) -> Result<Arc<AppState>> {
    let scanner = create_scanner(config).context("Failed to initialize scan client")?;

    let scratch = ScratchSpace::new(config.upload_folder())
        .await
        .with_context(|| format!("Failed to create upload folder {}", config.upload_folder()))?;
    tracing::info!(upload_folder = %config.upload_folder(), "Scratch space ready");

    let options = RelayOptions::from_config(config);
    tracing::info!(
        scan_timeout_secs = options.scan_timeout.as_secs(),
        storage_timeout_secs = options.storage_timeout.as_secs(),
        "Upload relay configured"
    );
    let relay = UploadRelay::new(scanner, storage, options);

    Ok(Arc::new(AppState::new(config.clone(), scratch, relay)))
}
