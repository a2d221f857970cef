//! Configuration module
//!
//! Configuration is read once at process start (environment, plus an optional `.env`
//! file) into a [`Config`] that is shared read-only with every request.
//!
//! The historical variable names `V1_API_KEY`, `s3_bucket_name` and `s3_object_url`
//! are kept as-is so existing deployments keep working.

use std::env;
use std::str::FromStr;

use crate::constants::{DEFAULT_OBJECT_KEY_PREFIX, DEFAULT_UPLOAD_FOLDER};
use crate::models::Disposition;
use crate::storage_types::StorageBackend;

// Common constants
const SERVER_PORT: u16 = 5000;
const MAX_UPLOAD_SIZE_MB: usize = 100;
const HTTP_CONCURRENCY_LIMIT: usize = 1024;
const SCAN_TIMEOUT_SECS: u64 = 30;
const STORAGE_TIMEOUT_SECS: u64 = 60;
const CLAMAV_PORT: u16 = 3310;

/// Which scan client implementation backs the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerBackend {
    /// A scan service that takes the file as an HTTP POST body and answers
    /// with the JSON verdict.
    Http,
    /// A clamd daemon reachable over TCP.
    ClamAv,
}

impl FromStr for ScannerBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(ScannerBackend::Http),
            "clamav" => Ok(ScannerBackend::ClamAv),
            _ => Err(anyhow::anyhow!("Invalid scanner backend: {}", s)),
        }
    }
}

/// Server-level settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub max_upload_size_bytes: usize,
    pub http_concurrency_limit: usize,
    pub log_format: String,
}

/// Upload relay configuration
#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub base: BaseConfig,
    // Staging
    pub upload_folder: String,
    pub object_key_prefix: String,
    pub default_disposition: Disposition,
    // Scanning
    pub scan_enabled: bool,
    pub scanner_backend: ScannerBackend,
    pub scanner_url: Option<String>,
    pub scanner_api_key: Option<String>,
    pub clamav_host: String,
    pub clamav_port: u16,
    pub scan_timeout_secs: u64,
    // Storage
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub aws_region: Option<String>,
    pub s3_object_url: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub storage_timeout_secs: u64,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<RelayConfig>);

/// Strip the decoration operators tend to paste along with the scanner key:
/// surrounding double quotes and the `ApiKey ` scheme prefix.
pub fn normalize_api_key(raw: &str) -> String {
    raw.trim().trim_matches('"').replace("ApiKey ", "").trim().to_string()
}

fn parse_bool(value: Option<String>, default: bool) -> bool {
    value
        .map(|v| v.trim().to_lowercase())
        .and_then(|v| match v.as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

impl Config {
    fn as_relay(&self) -> &RelayConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_source(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup (the environment in production,
    /// a map in tests).
    pub fn from_source<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = RelayConfig::from_source(lookup)?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_relay().validate()
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.as_relay().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn server_port(&self) -> u16 {
        self.as_relay().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.as_relay().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.as_relay().base.environment
    }

    pub fn max_upload_size_bytes(&self) -> usize {
        self.as_relay().base.max_upload_size_bytes
    }

    pub fn http_concurrency_limit(&self) -> usize {
        self.as_relay().base.http_concurrency_limit
    }

    pub fn log_format(&self) -> &str {
        &self.as_relay().base.log_format
    }

    pub fn upload_folder(&self) -> &str {
        &self.as_relay().upload_folder
    }

    pub fn object_key_prefix(&self) -> &str {
        &self.as_relay().object_key_prefix
    }

    pub fn default_disposition(&self) -> Disposition {
        self.as_relay().default_disposition
    }

    pub fn scan_enabled(&self) -> bool {
        self.as_relay().scan_enabled
    }

    pub fn scanner_backend(&self) -> ScannerBackend {
        self.as_relay().scanner_backend
    }

    /// Full URL the HTTP scanner posts files to.
    pub fn scanner_url(&self) -> Option<&str> {
        self.as_relay().scanner_url.as_deref()
    }

    pub fn scanner_api_key(&self) -> Option<&str> {
        self.as_relay().scanner_api_key.as_deref()
    }

    pub fn clamav_host(&self) -> &str {
        &self.as_relay().clamav_host
    }

    pub fn clamav_port(&self) -> u16 {
        self.as_relay().clamav_port
    }

    pub fn scan_timeout_secs(&self) -> u64 {
        self.as_relay().scan_timeout_secs
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.as_relay().storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.as_relay().s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.as_relay().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.as_relay().s3_endpoint.as_deref()
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.as_relay().aws_region.as_deref()
    }

    pub fn s3_object_url(&self) -> Option<&str> {
        self.as_relay().s3_object_url.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.as_relay().local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.as_relay().local_storage_base_url.as_deref()
    }

    pub fn storage_timeout_secs(&self) -> u64 {
        self.as_relay().storage_timeout_secs
    }
}

impl RelayConfig {
    pub fn from_source<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values count as unset.
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = var("ENVIRONMENT")
            .or_else(|| var("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";

        let cors_origins_str = var("CORS_ORIGINS").unwrap_or_else(|| "*".to_string());
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }
        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_upload_size_mb = var("MAX_UPLOAD_SIZE_MB")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(MAX_UPLOAD_SIZE_MB);

        let base = BaseConfig {
            server_port: var("PORT")
                .unwrap_or_else(|| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
            max_upload_size_bytes: max_upload_size_mb * 1024 * 1024,
            http_concurrency_limit: var("HTTP_CONCURRENCY_LIMIT")
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(HTTP_CONCURRENCY_LIMIT)
                .max(1),
            log_format: var("LOG_FORMAT")
                .unwrap_or_else(|| "compact".to_string())
                .to_lowercase(),
        };

        let scanner_backend = var("SCANNER_BACKEND")
            .map(|s| s.parse::<ScannerBackend>())
            .transpose()?
            .unwrap_or(ScannerBackend::Http);

        let scanner_url = var("SCANNER_URL").map(|url| url.trim().to_string());
        let scanner_api_key = var("V1_API_KEY")
            .map(|raw| normalize_api_key(&raw))
            .filter(|key| !key.is_empty());

        // Scanning defaults to on whenever the selected backend has what it needs.
        let scanner_configured = match scanner_backend {
            ScannerBackend::Http => scanner_url.is_some(),
            ScannerBackend::ClamAv => true,
        };

        let storage_backend = var("STORAGE_BACKEND")
            .map(|s| s.parse::<StorageBackend>())
            .transpose()?
            .unwrap_or(StorageBackend::S3);

        let default_disposition = var("CONTENT_DISPOSITION")
            .map(|s| s.parse::<Disposition>())
            .transpose()?
            .unwrap_or_default();

        let config = RelayConfig {
            base,
            upload_folder: var("UPLOAD_FOLDER").unwrap_or_else(|| DEFAULT_UPLOAD_FOLDER.to_string()),
            object_key_prefix: var("OBJECT_KEY_PREFIX")
                .unwrap_or_else(|| DEFAULT_OBJECT_KEY_PREFIX.to_string()),
            default_disposition,
            scan_enabled: parse_bool(var("SCAN_ENABLED"), scanner_configured),
            scanner_backend,
            scanner_url,
            scanner_api_key,
            clamav_host: var("CLAMAV_HOST").unwrap_or_else(|| "localhost".to_string()),
            clamav_port: var("CLAMAV_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(CLAMAV_PORT),
            scan_timeout_secs: var("SCAN_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(SCAN_TIMEOUT_SECS),
            storage_backend,
            s3_bucket: var("s3_bucket_name").or_else(|| var("S3_BUCKET")),
            s3_region: var("S3_REGION"),
            s3_endpoint: var("S3_ENDPOINT"),
            aws_region: var("AWS_REGION"),
            s3_object_url: var("s3_object_url"),
            local_storage_path: var("LOCAL_STORAGE_PATH"),
            local_storage_base_url: var("LOCAL_STORAGE_BASE_URL"),
            storage_timeout_secs: var("STORAGE_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(STORAGE_TIMEOUT_SECS),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.scan_enabled && self.scanner_backend == ScannerBackend::Http {
            match self.scanner_url.as_deref() {
                None => {
                    return Err(anyhow::anyhow!(
                        "SCANNER_URL must be set when scanning is enabled with the http backend"
                    ));
                }
                Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
                    return Err(anyhow::anyhow!(
                        "SCANNER_URL must be an http:// or https:// URL"
                    ));
                }
                Some(_) => {}
            }
        }

        if self.scan_timeout_secs == 0 || self.storage_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "SCAN_TIMEOUT_SECS and STORAGE_TIMEOUT_SECS must be greater than zero"
            ));
        }

        if self.object_key_prefix.starts_with('/')
            || self
                .object_key_prefix
                .split('/')
                .any(|segment| segment == "." || segment == "..")
        {
            return Err(anyhow::anyhow!(
                "OBJECT_KEY_PREFIX must be a relative key prefix without '.' or '..' segments"
            ));
        }

        // Validate storage backend configuration
        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "s3_bucket_name must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, anyhow::Error> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_source(|key| map.get(key).cloned())
    }

    const S3: &[(&str, &str)] = &[("s3_bucket_name", "uploads"), ("AWS_REGION", "us-east-1")];

    #[test]
    fn normalizes_quoted_api_keys() {
        assert_eq!(normalize_api_key("\"ApiKey abc123\""), "abc123");
        assert_eq!(normalize_api_key("ApiKey abc123"), "abc123");
        assert_eq!(normalize_api_key("abc123"), "abc123");
        assert_eq!(normalize_api_key("  \"abc123\"  "), "abc123");
    }

    #[test]
    fn defaults_match_the_original_service() {
        let config = config_from(S3).unwrap();
        assert_eq!(config.server_port(), 5000);
        assert_eq!(config.upload_folder(), "/app/uploads");
        assert_eq!(config.object_key_prefix(), "downloads/");
        assert_eq!(config.default_disposition(), Disposition::Inline);
        assert_eq!(config.scanner_backend(), ScannerBackend::Http);
        assert_eq!(config.scanner_url(), None);
        assert_eq!(config.s3_bucket(), Some("uploads"));
        assert_eq!(config.s3_object_url(), None);
        // No scanner URL: scanning is off by default rather than failing.
        assert!(!config.scan_enabled());
    }

    #[test]
    fn scanner_url_enables_scanning() {
        let mut pairs = S3.to_vec();
        pairs.push(("SCANNER_URL", "https://scanner.internal:8443/scan"));
        pairs.push(("V1_API_KEY", "\"ApiKey secret\""));
        let config = config_from(&pairs).unwrap();
        assert!(config.scan_enabled());
        assert_eq!(config.scanner_url(), Some("https://scanner.internal:8443/scan"));
        assert_eq!(config.scanner_api_key(), Some("secret"));
    }

    #[test]
    fn api_key_alone_does_not_pick_a_scanner() {
        let mut pairs = S3.to_vec();
        pairs.push(("V1_API_KEY", "secret"));
        assert!(!config_from(&pairs).unwrap().scan_enabled());
    }

    #[test]
    fn scanning_toggle_overrides_default() {
        let mut pairs = S3.to_vec();
        pairs.push(("SCANNER_URL", "http://localhost:8080/scan"));
        pairs.push(("SCAN_ENABLED", "false"));
        assert!(!config_from(&pairs).unwrap().scan_enabled());
    }

    #[test]
    fn enabled_scanning_without_url_is_rejected() {
        let mut pairs = S3.to_vec();
        pairs.push(("SCAN_ENABLED", "true"));
        let err = config_from(&pairs).unwrap_err();
        assert!(err.to_string().contains("SCANNER_URL"));

        let mut pairs = S3.to_vec();
        pairs.push(("SCANNER_URL", "scanner.internal:8443"));
        let err = config_from(&pairs).unwrap_err();
        assert!(err.to_string().contains("http://"));
    }

    #[test]
    fn clamav_backend_scans_without_key() {
        let mut pairs = S3.to_vec();
        pairs.push(("SCANNER_BACKEND", "clamav"));
        pairs.push(("CLAMAV_PORT", "3311"));
        let config = config_from(&pairs).unwrap();
        assert!(config.scan_enabled());
        assert_eq!(config.scanner_backend(), ScannerBackend::ClamAv);
        assert_eq!(config.clamav_port(), 3311);
    }

    #[test]
    fn s3_backend_requires_bucket_and_region() {
        assert!(config_from(&[("AWS_REGION", "us-east-1")]).is_err());
        assert!(config_from(&[("s3_bucket_name", "uploads")]).is_err());
    }

    #[test]
    fn local_backend_requires_path_and_url() {
        assert!(config_from(&[("STORAGE_BACKEND", "local")]).is_err());
        let config = config_from(&[
            ("STORAGE_BACKEND", "local"),
            ("LOCAL_STORAGE_PATH", "/tmp/objects"),
            ("LOCAL_STORAGE_BASE_URL", "http://localhost:5000/objects"),
        ])
        .unwrap();
        assert_eq!(config.storage_backend(), StorageBackend::Local);
    }

    #[test]
    fn production_rejects_wildcard_cors() {
        let mut pairs = S3.to_vec();
        pairs.push(("ENVIRONMENT", "production"));
        assert!(config_from(&pairs).is_err());

        pairs.push(("CORS_ORIGINS", "https://app.example.com"));
        let config = config_from(&pairs).unwrap();
        assert!(config.is_production());
        assert_eq!(config.cors_origins(), ["https://app.example.com"]);
    }

    #[test]
    fn rejects_traversal_in_key_prefix() {
        let mut pairs = S3.to_vec();
        pairs.push(("OBJECT_KEY_PREFIX", "../outside/"));
        assert!(config_from(&pairs).is_err());

        let mut pairs = S3.to_vec();
        pairs.push(("OBJECT_KEY_PREFIX", "releases/v1..2/"));
        assert_eq!(
            config_from(&pairs).unwrap().object_key_prefix(),
            "releases/v1..2/"
        );
    }

    #[test]
    fn object_url_is_read_verbatim() {
        let mut pairs = S3.to_vec();
        pairs.push(("s3_object_url", "https://uploads.s3.amazonaws.com/downloads/a.pdf"));
        let config = config_from(&pairs).unwrap();
        assert_eq!(
            config.s3_object_url(),
            Some("https://uploads.s3.amazonaws.com/downloads/a.pdf")
        );
    }
}
