//! Persistent Key-Value Storage
//!
//! The session and the profile cache are mirrored into a durable, string-keyed
//! store. Everything above this module talks to the [`KeyValueStore`] trait;
//! two implementations ship with the crate:
//!
//! - [`MemoryStore`] - process-local map, used by tests and ephemeral clients
//! - [`FileStore`] - JSON file on disk, optionally encrypted with AES-256-GCM
//!
//! Multi-key writes go through [`KeyValueStore::multi_set`] and
//! [`KeyValueStore::multi_remove`] so that callers never leave a half-written
//! pair behind. Every operation reports failure instead of silently no-oping.

pub mod file;
pub mod keys;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;

/// Storage failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(String),
    #[error("Storage serialization error: {0}")]
    Serialization(String),
    #[error("Storage encryption error: {0}")]
    Encryption(String),
}

/// Asynchronous durable key-value storage
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a single value
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a single value
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a single value; removing an absent key is not an error
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Write several values as one operation
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written. On error
    /// none of the entries are applied.
    async fn multi_set(&self, entries: &[(&str, String)]) -> Result<(), StoreError>;

    /// Remove several values as one operation
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written. On error
    /// none of the keys are removed.
    async fn multi_remove(&self, keys: &[&str]) -> Result<(), StoreError>;
}
