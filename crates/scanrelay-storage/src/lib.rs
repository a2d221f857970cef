//! Scanrelay Storage Library
//!
//! This crate provides the object-store abstraction the relay forwards accepted files
//! to, with an S3 backend and a local filesystem backend for development.
//!
//! # Storage key format
//!
//! Objects are stored under a fixed prefix: `downloads/{filename}` by default, where
//! `filename` is the sanitized client filename. Keys must not contain `.` or `..`
//! path segments or a leading `/`; dots inside a name are allowed. Key generation lives in the `keys` module so all backends agree.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::{generate_storage_key, validate_storage_key};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use scanrelay_core::StorageBackend;
pub use traits::{ObjectHeaders, Storage, StorageError, StorageResult};
