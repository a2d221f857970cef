//! Scanrelay Core Library
//!
//! This crate provides configuration, the error taxonomy, filename sanitization and
//! the small domain models shared by the storage, service and API crates.

pub mod config;
pub mod constants;
pub mod error;
pub mod filename;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{normalize_api_key, BaseConfig, Config, RelayConfig, ScannerBackend};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use filename::{sanitize_filename, secure_filename};
pub use models::{Disposition, OutcomeError, ScanOutcome};
pub use storage_types::StorageBackend;
