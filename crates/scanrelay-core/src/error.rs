//! Error types module
//!
//! Every failure a relay request can end in is a variant of [`AppError`]. The
//! variants carry whatever intermediate result (the scan outcome) was obtained
//! before the failing step, so the HTTP layer can still report it.

use crate::models::ScanOutcome;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for policy rejections like detected malware
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "SCAN_FAILED")
    fn error_code(&self) -> &'static str;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("No file part in the request")]
    MissingFilePart,

    #[error("No file selected for upload")]
    EmptyFilename,

    #[error("Invalid multipart request: {0}")]
    InvalidMultipart(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Request body too large: {0}")]
    PayloadTooLarge(String),

    #[error("Failed to stage upload: {0}")]
    Staging(String),

    #[error("File not scanned: {0}")]
    ScanFailed(String),

    #[error("File contains malware (scan result code {})", .0.code)]
    MalwareDetected(ScanOutcome),

    #[error("Error uploading file to object store: {message}")]
    StorageFailed {
        message: String,
        scan: Option<ScanOutcome>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        match self {
            AppError::MissingFilePart
            | AppError::EmptyFilename
            | AppError::InvalidMultipart(_)
            | AppError::InvalidInput(_) => 400,
            AppError::MalwareDetected(_) => 403,
            AppError::NotFound(_) => 404,
            AppError::PayloadTooLarge(_) => 413,
            AppError::Staging(_)
            | AppError::ScanFailed(_)
            | AppError::StorageFailed { .. }
            | AppError::Internal(_) => 500,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::MissingFilePart => "MISSING_FILE_PART",
            AppError::EmptyFilename => "EMPTY_FILENAME",
            AppError::InvalidMultipart(_) => "INVALID_MULTIPART",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            AppError::Staging(_) => "STAGING_FAILED",
            AppError::ScanFailed(_) => "SCAN_FAILED",
            AppError::MalwareDetected(_) => "MALWARE_DETECTED",
            AppError::StorageFailed { .. } => "STORAGE_FAILED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn client_message(&self) -> String {
        match self {
            AppError::MissingFilePart => "No file part".to_string(),
            AppError::EmptyFilename => "No selected file".to_string(),
            AppError::InvalidMultipart(_) => "Invalid multipart request".to_string(),
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::PayloadTooLarge(_) => "File exceeds the maximum upload size".to_string(),
            AppError::Staging(_) => "Failed to stage the file".to_string(),
            AppError::ScanFailed(_) => "File not scanned. Check the logs".to_string(),
            AppError::MalwareDetected(_) => {
                "File contains malware. Uploading is not allowed.".to_string()
            }
            AppError::StorageFailed { .. } => "Error uploading the file.".to_string(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Internal(_) => "An internal error occurred".to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            AppError::MissingFilePart
            | AppError::EmptyFilename
            | AppError::InvalidMultipart(_)
            | AppError::InvalidInput(_)
            | AppError::PayloadTooLarge(_)
            | AppError::NotFound(_) => LogLevel::Debug,
            AppError::MalwareDetected(_) => LogLevel::Warn,
            AppError::Staging(_)
            | AppError::ScanFailed(_)
            | AppError::StorageFailed { .. }
            | AppError::Internal(_) => LogLevel::Error,
        }
    }
}

impl AppError {
    /// Scan outcome obtained before the failure, if any.
    pub fn scan_outcome(&self) -> Option<&ScanOutcome> {
        match self {
            AppError::MalwareDetected(outcome) => Some(outcome),
            AppError::StorageFailed { scan, .. } => scan.as_ref(),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Staging(err.to_string())
    }
}
