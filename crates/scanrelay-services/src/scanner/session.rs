use super::{ScanClient, ScanError, ScanHandle};
use scanrelay_core::ScanOutcome;
use std::path::Path;
use std::time::{Duration, Instant};

/// Scoped ownership of a [`ScanHandle`].
///
/// The handle is released in `Drop`, so success, malware rejection, scan failure,
/// timeout and early returns all release it, and release happens once.
pub struct ScanSession {
    handle: Option<Box<dyn ScanHandle>>,
    scanner: &'static str,
    timeout: Duration,
}

impl ScanSession {
    /// Acquire a handle from `client`. Nothing needs releasing if this fails.
    pub async fn open(client: &dyn ScanClient, timeout: Duration) -> Result<Self, ScanError> {
        let handle = tokio::time::timeout(timeout, client.init())
            .await
            .map_err(|_| ScanError::Timeout(timeout.as_secs()))??;

        tracing::debug!(scanner = client.name(), "Scan handle acquired");
        Ok(Self {
            handle: Some(handle),
            scanner: client.name(),
            timeout,
        })
    }

    /// Scan `path` and interpret the verdict.
    pub async fn scan(&mut self, path: &Path) -> Result<ScanOutcome, ScanError> {
        let handle = self.handle.as_mut().ok_or(ScanError::Released)?;
        let start = Instant::now();

        tracing::info!(scanner = self.scanner, path = %path.display(), "Scanning file");

        let raw = tokio::time::timeout(self.timeout, handle.scan_file(path))
            .await
            .map_err(|_| ScanError::Timeout(self.timeout.as_secs()))??;

        let outcome =
            ScanOutcome::parse(&raw).map_err(|e| ScanError::MalformedResult(e.to_string()))?;

        tracing::info!(
            scanner = self.scanner,
            path = %path.display(),
            scan_result_code = outcome.code,
            duration_ms = start.elapsed().as_millis(),
            "Scan completed"
        );

        Ok(outcome)
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.quit();
            tracing::debug!(scanner = self.scanner, "Scan handle released");
        }
    }
}
