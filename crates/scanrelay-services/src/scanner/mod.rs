//! Malware scan clients.
//!
//! A scan client follows an init / scan / quit lifecycle: [`ScanClient::init`]
//! acquires a [`ScanHandle`], the handle scans files and returns the scanner's JSON
//! verdict, and [`ScanHandle::quit`] releases it. Callers never hold a handle
//! directly; they go through [`ScanSession`], which releases it exactly once.

#[cfg(feature = "clamav")]
pub mod clamav;
#[cfg(feature = "scan-http")]
pub mod http;
mod session;

pub use session::ScanSession;

use async_trait::async_trait;
use scanrelay_core::{Config, ScannerBackend};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Scan client errors
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to initialize scan client: {0}")]
    Init(String),

    #[error("Scan request failed: {0}")]
    Transport(String),

    #[error("Scan timed out after {0} seconds")]
    Timeout(u64),

    #[error("Malformed scan result: {0}")]
    MalformedResult(String),

    #[error("Scan handle already released")]
    Released,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Factory for scan handles.
#[async_trait]
pub trait ScanClient: Send + Sync {
    /// Acquire a handle for one request.
    async fn init(&self) -> Result<Box<dyn ScanHandle>, ScanError>;

    /// Short backend name for logs and health output.
    fn name(&self) -> &'static str;
}

/// An acquired connection to the scanner.
#[async_trait]
pub trait ScanHandle: Send {
    /// Scan the file at `path` and return the scanner's verdict as a JSON document
    /// carrying at least a `scanResult` integer.
    async fn scan_file(&mut self, path: &Path) -> Result<String, ScanError>;

    /// Release the handle. Called once by [`ScanSession`].
    fn quit(&mut self);
}

/// Build the configured scan client, or `None` when scanning is disabled.
pub fn create_scanner(config: &Config) -> anyhow::Result<Option<Arc<dyn ScanClient>>> {
    if !config.scan_enabled() {
        tracing::info!("Malware scanning disabled");
        return Ok(None);
    }

    match config.scanner_backend() {
        #[cfg(feature = "scan-http")]
        ScannerBackend::Http => {
            let scan_url = config.scanner_url().ok_or_else(|| {
                anyhow::anyhow!("SCANNER_URL must be set when scanning with the http backend")
            })?;
            let scanner = http::HttpScanner::new(
                scan_url.to_string(),
                config.scanner_api_key().map(str::to_string),
            );
            tracing::info!(
                url = %scan_url,
                authenticated = config.scanner_api_key().is_some(),
                "HTTP scanning enabled"
            );
            Ok(Some(Arc::new(scanner)))
        }

        #[cfg(not(feature = "scan-http"))]
        ScannerBackend::Http => Err(anyhow::anyhow!(
            "http scanner not available (scan-http feature not enabled)"
        )),

        #[cfg(feature = "clamav")]
        ScannerBackend::ClamAv => {
            let scanner =
                clamav::ClamAvScanner::new(config.clamav_host().to_string(), config.clamav_port());
            tracing::info!(
                host = %config.clamav_host(),
                port = config.clamav_port(),
                "ClamAV scanning enabled"
            );
            Ok(Some(Arc::new(scanner)))
        }

        #[cfg(not(feature = "clamav"))]
        ScannerBackend::ClamAv => Err(anyhow::anyhow!(
            "clamav scanner not available (clamav feature not enabled)"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let mut map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        map.insert("s3_bucket_name".into(), "uploads".into());
        map.insert("AWS_REGION".into(), "us-east-1".into());
        Config::from_source(|key| map.get(key).cloned()).unwrap()
    }

    #[test]
    fn disabled_scanning_builds_no_client() {
        let scanner = create_scanner(&config(&[("SCAN_ENABLED", "false")])).unwrap();
        assert!(scanner.is_none());
    }

    #[cfg(feature = "scan-http")]
    #[test]
    fn scanner_url_selects_http() {
        let scanner = create_scanner(&config(&[
            ("SCANNER_URL", "https://scanner.internal/scan"),
            ("V1_API_KEY", "secret"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(scanner.name(), "http");
    }

    #[cfg(feature = "clamav")]
    #[test]
    fn clamav_backend_is_selectable() {
        let scanner = create_scanner(&config(&[("SCANNER_BACKEND", "clamav")]))
            .unwrap()
            .unwrap();
        assert_eq!(scanner.name(), "clamav");
    }
}
