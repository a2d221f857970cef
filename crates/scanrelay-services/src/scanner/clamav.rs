use super::{ScanClient, ScanError, ScanHandle};
use async_trait::async_trait;
use clamav_client::Tcp;
use scanrelay_core::constants::MALWARE_SCAN_RESULT;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::str;
use std::time::Instant;

/// Scan client backed by a clamd daemon over TCP.
///
/// clamd has no session to hold open, so a handle is just the daemon address.
/// `init` pings the daemon so an unreachable scanner fails before the scan.
#[derive(Clone)]
pub struct ClamAvScanner {
    host: String,
    port: u16,
}

impl ClamAvScanner {
    /// # Arguments
    /// * `host` - ClamAV daemon hostname
    /// * `port` - ClamAV daemon port (typically 3310)
    pub fn new(host: String, port: u16) -> Self {
        Self { host, port }
    }

    fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[async_trait]
impl ScanClient for ClamAvScanner {
    async fn init(&self) -> Result<Box<dyn ScanHandle>, ScanError> {
        let address = self.address();
        let ping_address = address.clone();

        // Sync API inside spawn_blocking to avoid !Send futures.
        let response = tokio::task::spawn_blocking(move || {
            clamav_client::ping(Tcp {
                host_address: ping_address.as_str(),
            })
        })
        .await
        .map_err(|e| ScanError::Init(format!("ClamAV ping task failed: {}", e)))?
        .map_err(|e| ScanError::Init(format!("ClamAV unreachable at {}: {}", address, e)))?;

        if response != clamav_client::PONG {
            return Err(ScanError::Init(format!(
                "Unexpected ClamAV ping response from {}",
                address
            )));
        }

        Ok(Box::new(ClamAvHandle { address }))
    }

    fn name(&self) -> &'static str {
        "clamav"
    }
}

struct ClamAvHandle {
    address: String,
}

#[async_trait]
impl ScanHandle for ClamAvHandle {
    async fn scan_file(&mut self, path: &Path) -> Result<String, ScanError> {
        let start = Instant::now();
        let address = self.address.clone();
        let file_path: PathBuf = path.to_path_buf();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let response = tokio::task::spawn_blocking(move || {
            clamav_client::scan_file(
                &file_path,
                Tcp {
                    host_address: address.as_str(),
                },
                None,
            )
        })
        .await
        .map_err(|e| ScanError::Transport(format!("ClamAV scan task failed: {}", e)))?
        .map_err(|e| ScanError::Transport(format!("ClamAV scan error: {}", e)))?;

        let reply = classify_reply(&response)?;
        let verdict = render_verdict(&reply, &file_name);
        tracing::debug!(
            duration_ms = start.elapsed().as_millis(),
            clean = matches!(reply, ClamdReply::Clean),
            "ClamAV scan finished"
        );

        Ok(verdict)
    }

    fn quit(&mut self) {
        tracing::debug!(address = %self.address, "ClamAV handle released");
    }
}

/// A clamd scan reply that names a verdict.
#[derive(Debug, PartialEq, Eq)]
enum ClamdReply {
    Clean,
    Infected(String),
}

/// Classify a raw clamd reply.
///
/// Only `... OK` and `... FOUND` are verdicts. clamd reports its own failures
/// (size limits, unreadable streams) as `... ERROR`; those and any other reply
/// are scan failures.
fn classify_reply(response: &[u8]) -> Result<ClamdReply, ScanError> {
    let reply = str::from_utf8(response)
        .map_err(|e| ScanError::MalformedResult(format!("ClamAV reply is not UTF-8: {}", e)))?
        .trim_matches(|c: char| c == '\0' || c.is_whitespace());

    if reply.ends_with("FOUND") {
        return Ok(ClamdReply::Infected(virus_name(reply)));
    }
    if reply.ends_with("OK") {
        return Ok(ClamdReply::Clean);
    }
    if reply.ends_with("ERROR") {
        return Err(ScanError::Transport(format!("ClamAV reported an error: {}", reply)));
    }
    Err(ScanError::MalformedResult(format!(
        "Unrecognised ClamAV reply: {}",
        reply
    )))
}

/// Render a clamd verdict in the same JSON shape the HTTP scan service returns.
fn render_verdict(reply: &ClamdReply, file_name: &str) -> String {
    match reply {
        ClamdReply::Clean => json!({
            "scanResult": 0,
            "foundMalwares": [],
            "fileName": file_name,
        }),
        ClamdReply::Infected(virus_name) => json!({
            "scanResult": MALWARE_SCAN_RESULT,
            "foundMalwares": [{ "malwareName": virus_name, "fileName": file_name }],
            "fileName": file_name,
        }),
    }
    .to_string()
}

/// Extract the signature name from a `stream: Eicar-Signature FOUND` reply.
fn virus_name(reply: &str) -> String {
    reply
        .rsplit_once(':')
        .map(|(_, rest)| rest)
        .unwrap_or(reply)
        .trim()
        .trim_end_matches("FOUND")
        .trim()
        .to_string()
}
