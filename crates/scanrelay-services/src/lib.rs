//! Scanrelay Services Layer
//!
//! This crate is the business service layer: it hosts the scan clients, the scratch
//! space uploads are staged in, and the [`UploadRelay`] that sequences
//! stage → scan → forward. HTTP concerns stay in scanrelay-api.

pub mod relay;
pub mod scanner;
pub mod scratch;

pub use relay::{RelayOptions, RelayReport, StagedUpload, UploadRelay};
#[cfg(feature = "clamav")]
pub use scanner::clamav::ClamAvScanner;
#[cfg(feature = "scan-http")]
pub use scanner::http::HttpScanner;
pub use scanner::{create_scanner, ScanClient, ScanError, ScanHandle, ScanSession};
pub use scanrelay_storage::{
    create_storage, ObjectHeaders, Storage, StorageBackend, StorageError, StorageResult,
};
pub use scratch::{ScratchFile, ScratchSpace};
