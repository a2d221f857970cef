//! Shared constants

/// Scan result code reported by the scanner when malware was found.
pub const MALWARE_SCAN_RESULT: i64 = 1;

/// Scan result code used when the scanner payload carries no usable `scanResult`.
pub const UNKNOWN_SCAN_RESULT: i64 = -1;

/// Key prefix for forwarded objects.
pub const DEFAULT_OBJECT_KEY_PREFIX: &str = "downloads/";

/// Default scratch directory for staged uploads.
pub const DEFAULT_UPLOAD_FOLDER: &str = "/app/uploads";

/// Name used when sanitization leaves nothing of the client filename.
pub const FALLBACK_FILENAME: &str = "file";

/// Upper bound for sanitized filenames, in bytes.
pub const MAX_FILENAME_LENGTH: usize = 255;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
