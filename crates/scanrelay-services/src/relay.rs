//! Upload relay: scan a staged upload, then forward it to the object store.

use crate::scanner::{ScanClient, ScanSession};
use crate::scratch::ScratchFile;
use scanrelay_core::{AppError, Config, Disposition, ScanOutcome, StorageBackend};
use scanrelay_storage::{generate_storage_key, ObjectHeaders, Storage};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Tunables for [`UploadRelay`].
#[derive(Debug, Clone)]
pub struct RelayOptions {
    pub key_prefix: String,
    pub scan_timeout: Duration,
    pub storage_timeout: Duration,
}

impl RelayOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            key_prefix: config.object_key_prefix().to_string(),
            scan_timeout: Duration::from_secs(config.scan_timeout_secs()),
            storage_timeout: Duration::from_secs(config.storage_timeout_secs()),
        }
    }
}

/// An upload that has been fully written to scratch space.
#[derive(Debug)]
pub struct StagedUpload {
    pub scratch: ScratchFile,
    /// Sanitized filename; becomes the last segment of the object key.
    pub filename: String,
    pub content_type: String,
    pub disposition: Disposition,
}

/// What happened to a relayed upload.
#[derive(Debug, Clone)]
pub struct RelayReport {
    pub uploaded: bool,
    /// `None` when scanning is disabled.
    pub scan: Option<ScanOutcome>,
    pub storage_key: String,
    pub storage_url: String,
}

/// Sequences scan then forward for one staged upload.
#[derive(Clone)]
pub struct UploadRelay {
    scanner: Option<Arc<dyn ScanClient>>,
    storage: Arc<dyn Storage>,
    options: RelayOptions,
}

impl UploadRelay {
    pub fn new(
        scanner: Option<Arc<dyn ScanClient>>,
        storage: Arc<dyn Storage>,
        options: RelayOptions,
    ) -> Self {
        Self {
            scanner,
            storage,
            options,
        }
    }

    pub fn scanner_name(&self) -> Option<&'static str> {
        self.scanner.as_ref().map(|s| s.name())
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.storage.backend_type()
    }

    /// Scan (when enabled) and forward a staged upload.
    ///
    /// The scratch file is consumed and removed from disk when this returns,
    /// whatever the outcome. Malware is never forwarded.
    #[tracing::instrument(skip(self, staged), fields(filename = %staged.filename))]
    pub async fn relay(&self, staged: StagedUpload) -> Result<RelayReport, AppError> {
        let StagedUpload {
            scratch,
            filename,
            content_type,
            disposition,
        } = staged;

        let scan = match &self.scanner {
            Some(scanner) => Some(self.scan(scanner.as_ref(), &scratch).await?),
            None => None,
        };

        if let Some(outcome) = &scan {
            if outcome.is_malware() {
                tracing::warn!(
                    filename = %filename,
                    scan_result_code = outcome.code,
                    scan_results = %outcome.payload,
                    "Malware detected, upload rejected"
                );
                return Err(AppError::MalwareDetected(outcome.clone()));
            }
        }

        let storage_key = generate_storage_key(&self.options.key_prefix, &filename);
        let headers = ObjectHeaders::new(content_type)
            .with_disposition(disposition.header_value(&filename));

        let start = Instant::now();
        let upload = tokio::time::timeout(
            self.options.storage_timeout,
            self.storage.upload_file(scratch.path(), &storage_key, &headers),
        )
        .await;

        let storage_url = match upload {
            Ok(Ok(url)) => url,
            Ok(Err(e)) => {
                tracing::error!(error = %e, key = %storage_key, "Forwarding to object store failed");
                return Err(AppError::StorageFailed {
                    message: e.to_string(),
                    scan,
                });
            }
            Err(_) => {
                tracing::error!(
                    key = %storage_key,
                    timeout_secs = self.options.storage_timeout.as_secs(),
                    "Forwarding to object store timed out"
                );
                return Err(AppError::StorageFailed {
                    message: format!(
                        "upload timed out after {} seconds",
                        self.options.storage_timeout.as_secs()
                    ),
                    scan,
                });
            }
        };

        tracing::info!(
            key = %storage_key,
            size_bytes = scratch.len(),
            backend = %self.storage.backend_type(),
            duration_ms = start.elapsed().as_millis(),
            "File forwarded to object store"
        );

        Ok(RelayReport {
            uploaded: true,
            scan,
            storage_key,
            storage_url,
        })
    }

    async fn scan(
        &self,
        scanner: &dyn ScanClient,
        scratch: &ScratchFile,
    ) -> Result<ScanOutcome, AppError> {
        let mut session = ScanSession::open(scanner, self.options.scan_timeout)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, scanner = scanner.name(), "Scan client init failed");
                AppError::ScanFailed(e.to_string())
            })?;

        session.scan(scratch.path()).await.map_err(|e| {
            tracing::error!(error = %e, scanner = scanner.name(), "Scan failed");
            AppError::ScanFailed(e.to_string())
        })
    }
}
