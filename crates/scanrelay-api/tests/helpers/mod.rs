//! Test helpers: build AppState and router for integration tests.
//!
//! The scanner and object store are in-process mocks that count their calls, so
//! tests can assert on side effects as well as on responses.

use async_trait::async_trait;
use axum_test::TestServer;
use bytes::Bytes;
use scanrelay_api::setup::routes;
use scanrelay_api::state::AppState;
use scanrelay_core::{Config, StorageBackend};
use scanrelay_services::{
    ObjectHeaders, RelayOptions, ScanClient, ScanError, ScanHandle, ScratchSpace, Storage,
    StorageError, StorageResult, UploadRelay,
};
use scanrelay_storage::validate_storage_key;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const BOUNDARY: &str = "scanrelay-test-boundary";

/// What the mock scanner answers to a scan.
#[derive(Clone, Copy, Debug)]
pub enum Verdict {
    Json(&'static str),
    TransportError,
}

#[derive(Default)]
pub struct ScanCounters {
    pub inits: AtomicUsize,
    pub scans: AtomicUsize,
    pub quits: AtomicUsize,
}

pub struct MockScanner {
    verdict: Verdict,
    counters: Arc<ScanCounters>,
}

struct MockHandle {
    verdict: Verdict,
    counters: Arc<ScanCounters>,
}

#[async_trait]
impl ScanClient for MockScanner {
    async fn init(&self) -> Result<Box<dyn ScanHandle>, ScanError> {
        self.counters.inits.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockHandle {
            verdict: self.verdict,
            counters: self.counters.clone(),
        }))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[async_trait]
impl ScanHandle for MockHandle {
    async fn scan_file(&mut self, path: &Path) -> Result<String, ScanError> {
        self.counters.scans.fetch_add(1, Ordering::SeqCst);
        assert!(path.exists(), "scanner must see the staged file");
        match self.verdict {
            Verdict::Json(body) => Ok(body.to_string()),
            Verdict::TransportError => {
                Err(ScanError::Transport("connection refused".to_string()))
            }
        }
    }

    fn quit(&mut self) {
        self.counters.quits.fetch_add(1, Ordering::SeqCst);
    }
}

/// One recorded `upload_file` call.
#[derive(Clone, Debug)]
pub struct RecordedUpload {
    pub key: String,
    pub headers: ObjectHeaders,
    pub body: Vec<u8>,
}

#[derive(Default)]
pub struct MockStorage {
    fail: bool,
    uploads: Mutex<HashMap<String, RecordedUpload>>,
    calls: AtomicUsize,
}

impl MockStorage {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn upload(&self, key: &str) -> Option<RecordedUpload> {
        self.uploads.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn upload_file(
        &self,
        local_path: &Path,
        storage_key: &str,
        headers: &ObjectHeaders,
    ) -> StorageResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        validate_storage_key(storage_key)?;
        if self.fail {
            return Err(StorageError::UploadFailed("AccessDenied".to_string()));
        }
        let body = tokio::fs::read(local_path).await?;
        self.uploads.lock().unwrap().insert(
            storage_key.to_string(),
            RecordedUpload {
                key: storage_key.to_string(),
                headers: headers.clone(),
                body,
            },
        );
        Ok(self.object_url(storage_key))
    }

    fn object_url(&self, storage_key: &str) -> String {
        format!("https://uploads.s3.us-east-1.amazonaws.com/{}", storage_key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

/// How to build a [`TestApp`].
pub struct TestAppOptions {
    /// `None` disables scanning.
    pub verdict: Option<Verdict>,
    pub storage_fails: bool,
    pub env: Vec<(&'static str, &'static str)>,
}

impl Default for TestAppOptions {
    fn default() -> Self {
        Self {
            verdict: Some(Verdict::Json(r#"{"scanResult":0,"foundMalwares":[]}"#)),
            storage_fails: false,
            env: Vec::new(),
        }
    }
}

/// Test application: server, mocks and the scratch directory.
pub struct TestApp {
    pub server: TestServer,
    pub scan: Arc<ScanCounters>,
    pub storage: Arc<MockStorage>,
    pub scratch_dir: PathBuf,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Files left behind in the upload folder.
    pub fn scratch_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(&self.scratch_dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }
}

fn create_test_config(env: &[(&'static str, &'static str)], upload_folder: &Path) -> Config {
    let mut vars: HashMap<String, String> = HashMap::new();
    vars.insert("s3_bucket_name".into(), "uploads".into());
    vars.insert("AWS_REGION".into(), "us-east-1".into());
    vars.insert("SCAN_ENABLED".into(), "false".into());
    vars.insert(
        "UPLOAD_FOLDER".into(),
        upload_folder.to_string_lossy().to_string(),
    );
    for (key, value) in env {
        vars.insert(key.to_string(), value.to_string());
    }
    let config = Config::from_source(|key| vars.get(key).cloned()).expect("valid test config");
    config.validate().expect("test config validates");
    config
}

/// Setup test app with mock scanner and storage.
pub async fn setup_test_app(options: TestAppOptions) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let scratch_dir = temp_dir.path().join("uploads");
    let config = create_test_config(&options.env, &scratch_dir);

    let scan = Arc::new(ScanCounters::default());
    let scanner: Option<Arc<dyn ScanClient>> = options.verdict.map(|verdict| {
        Arc::new(MockScanner {
            verdict,
            counters: scan.clone(),
        }) as Arc<dyn ScanClient>
    });

    let storage = Arc::new(MockStorage {
        fail: options.storage_fails,
        ..Default::default()
    });

    let scratch = ScratchSpace::new(&scratch_dir)
        .await
        .expect("Failed to create scratch space");
    let relay = UploadRelay::new(
        scanner,
        storage.clone(),
        RelayOptions {
            key_prefix: config.object_key_prefix().to_string(),
            scan_timeout: Duration::from_secs(5),
            storage_timeout: Duration::from_secs(5),
        },
    );

    let state = Arc::new(AppState::new(config.clone(), scratch, relay));
    let app = routes::setup_routes(&config, state)
        .await
        .expect("Failed to build router");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        scan,
        storage,
        scratch_dir,
        _temp_dir: temp_dir,
    }
}

/// One part of a hand-built multipart body.
pub struct RawPart<'a> {
    pub name: &'a str,
    /// `None` omits the filename attribute entirely.
    pub filename: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

impl<'a> RawPart<'a> {
    pub fn file(filename: &'a str, data: &'a [u8]) -> Self {
        Self {
            name: "file",
            filename: Some(filename),
            content_type: Some("application/octet-stream"),
            data,
        }
    }

    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            filename: None,
            content_type: None,
            data: value.as_bytes(),
        }
    }
}

/// Build a `multipart/form-data` body with [`BOUNDARY`]. Lets tests send shapes
/// (empty filenames, missing filename attributes) a form builder won't emit.
pub fn multipart_body(parts: &[RawPart<'_>]) -> Bytes {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(filename) = part.filename {
            disposition.push_str(&format!("; filename=\"{}\"", filename));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    Bytes::from(body)
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}
