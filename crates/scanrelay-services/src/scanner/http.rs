use super::{ScanClient, ScanError, ScanHandle};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client, Url};
use std::path::Path;
use tokio_util::io::ReaderStream;

/// Header carrying the staged file's name on each scan request.
pub const FILENAME_HEADER: &str = "X-Filename";

/// Scan client for a scan service reachable over HTTP.
///
/// Each scan POSTs the staged file as an `application/octet-stream` body to the
/// configured URL. A 2xx answer must carry the JSON verdict (`scanResult` plus
/// whatever detail the service reports), which is returned unchanged. When an API
/// key is configured every request carries `Authorization: ApiKey <key>`.
#[derive(Clone)]
pub struct HttpScanner {
    scan_url: String,
    api_key: Option<String>,
}

impl HttpScanner {
    /// # Arguments
    /// * `scan_url` - Full URL of the scan endpoint, e.g. `https://scanner.internal/scan`
    /// * `api_key` - Normalized API key, without the `ApiKey ` scheme
    pub fn new(scan_url: String, api_key: Option<String>) -> Self {
        Self { scan_url, api_key }
    }

    fn default_headers(&self) -> Result<HeaderMap, ScanError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &self.api_key {
            let mut auth = HeaderValue::from_str(&format!("ApiKey {}", key))
                .map_err(|_| ScanError::Init("API key is not a valid header value".to_string()))?;
            auth.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth);
        }
        Ok(headers)
    }
}

#[async_trait]
impl ScanClient for HttpScanner {
    async fn init(&self) -> Result<Box<dyn ScanHandle>, ScanError> {
        let scan_url = Url::parse(&self.scan_url)
            .map_err(|e| ScanError::Init(format!("Invalid scanner URL {}: {}", self.scan_url, e)))?;
        if !matches!(scan_url.scheme(), "http" | "https") {
            return Err(ScanError::Init(format!(
                "Scanner URL must use http or https, got {}",
                scan_url.scheme()
            )));
        }

        let client = Client::builder()
            .default_headers(self.default_headers()?)
            .build()
            .map_err(|e| ScanError::Init(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Box::new(HttpScanHandle {
            client: Some(client),
            scan_url,
        }))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

struct HttpScanHandle {
    client: Option<Client>,
    scan_url: Url,
}

#[async_trait]
impl ScanHandle for HttpScanHandle {
    async fn scan_file(&mut self, path: &Path) -> Result<String, ScanError> {
        let client = self.client.as_ref().ok_or(ScanError::Released)?;

        let file = tokio::fs::File::open(path).await?;
        let size = file.metadata().await?.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut request = client
            .post(self.scan_url.clone())
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, size)
            .body(Body::wrap_stream(ReaderStream::new(file)));
        if let Ok(value) = HeaderValue::from_str(&file_name) {
            request = request.header(FILENAME_HEADER, value);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(error = %e, url = %self.scan_url, "Scan request failed");
            ScanError::Transport(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Scan service rejected request");
            return Err(ScanError::Transport(format!(
                "scan service returned {}",
                status
            )));
        }

        response
            .text()
            .await
            .map_err(|e| ScanError::Transport(format!("Failed to read scan result: {}", e)))
    }

    fn quit(&mut self) {
        // Dropping the client closes its pooled connections.
        self.client.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scanning_after_quit_is_refused() {
        let scanner = HttpScanner::new("http://localhost:1/scan".to_string(), None);
        let mut handle = scanner.init().await.unwrap();
        handle.quit();

        let err = handle
            .scan_file(Path::new("/nonexistent/upload.bin"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Released));
    }

    #[tokio::test]
    async fn invalid_api_key_fails_init() {
        let scanner = HttpScanner::new(
            "https://scanner.internal/scan".to_string(),
            Some("bad\nkey".to_string()),
        );
        assert!(matches!(scanner.init().await, Err(ScanError::Init(_))));
    }

    #[tokio::test]
    async fn url_must_be_http() {
        for url in ["scanner.internal:8443", "ftp://scanner.internal/scan"] {
            let scanner = HttpScanner::new(url.to_string(), None);
            assert!(
                matches!(scanner.init().await, Err(ScanError::Init(_))),
                "{url}"
            );
        }
    }

    #[test]
    fn api_key_is_sent_as_sensitive_authorization() {
        let scanner = HttpScanner::new(
            "https://scanner.internal/scan".to_string(),
            Some("secret".to_string()),
        );
        let headers = scanner.default_headers().unwrap();
        let auth = headers.get(AUTHORIZATION).unwrap();
        assert_eq!(auth, "ApiKey secret");
        assert!(auth.is_sensitive());

        let anonymous = HttpScanner::new("https://scanner.internal/scan".to_string(), None);
        assert!(anonymous.default_headers().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload-1-report.pdf");
        tokio::fs::write(&path, b"%PDF-1.4").await.unwrap();

        // Port 1 on loopback refuses connections.
        let scanner = HttpScanner::new("http://127.0.0.1:1/scan".to_string(), None);
        let mut handle = scanner.init().await.unwrap();
        let err = handle.scan_file(&path).await.unwrap_err();
        assert!(matches!(err, ScanError::Transport(_)));
    }
}
