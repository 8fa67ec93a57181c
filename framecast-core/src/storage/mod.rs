//! Durable artifact storage.
//!
//! Defines the object-store interface for rendered video artifacts with a
//! filesystem-backed implementation and an in-memory implementation for
//! tests and development mode. Keys are deterministic per render identity
//! and writes are upserts, so repeated runs stay idempotent.

mod fs;
mod memory;

use async_trait::async_trait;
use bytes::Bytes;
pub use fs::FsObjectStore;
pub use memory::MemoryObjectStore;

/// Errors that occur during artifact storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Requested object does not exist in the store
    #[error("Object {key} not found")]
    NotFound { key: String },

    /// Backend-specific write or read failure
    #[error("Storage backend error: {reason}")]
    Backend { reason: String },

    /// Standard I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Metadata for one stored object.
#[derive(Debug, Clone)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
}

/// Durable object storage for rendered artifacts.
///
/// Implementations handle backend details; callers address objects by
/// deterministic keys like `{sprint_id}/day-{day}.mp4`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores an object under `key`, overwriting any existing object
    /// (upsert semantics).
    ///
    /// # Errors
    /// - `StorageError::Backend` - Backend rejected the write
    /// - `StorageError::Io` - File system operation failed
    async fn put(&self, key: &str, bytes: Bytes) -> Result<(), StorageError>;

    /// Checks whether an object exists under `key`.
    ///
    /// # Errors
    /// - `StorageError::Io` - File system operation failed
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Lists objects whose keys start with `prefix`.
    ///
    /// # Errors
    /// - `StorageError::Io` - File system operation failed
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>, StorageError>;

    /// Removes the object under `key`, if present.
    ///
    /// # Errors
    /// - `StorageError::Io` - File system operation failed
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Returns the public-access URL for `key`.
    ///
    /// The URL is derived from the key alone; it does not imply the
    /// object exists.
    fn public_url(&self, key: &str) -> String;
}

/// Deterministic storage key for a render identity.
pub fn artifact_key(sprint_id: &str, day_number: u32) -> String {
    format!("{sprint_id}/day-{day_number}.mp4")
}
