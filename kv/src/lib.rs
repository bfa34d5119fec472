//! Key-value store interface and implementations.
//!
//! Model persistence goes through the [`KVStore`] trait: string keys, opaque
//! byte values, prefix scans and atomic batches. [`MemoryStore`] keeps
//! everything in a map; [`RedbStore`] persists to a single redb file.

pub mod memory;
pub mod redb;

use thiserror::Error;

/// Errors that can occur in KV store operations.
#[derive(Error, Debug)]
pub enum KVError {
    #[error("kv: storage error: {0}")]
    Storage(String),
}

/// Result type for KV operations.
pub type KVResult<T> = Result<T, KVError>;

/// Key-value store trait.
///
/// Implementations must be safe for concurrent use. Batches are applied
/// atomically.
pub trait KVStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &str) -> KVResult<Option<Vec<u8>>>;

    /// Set a key-value pair.
    fn set(&self, key: &str, value: &[u8]) -> KVResult<()>;

    /// Delete a key. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> KVResult<()>;

    /// Returns all entries whose key starts with `prefix`, sorted by key.
    fn scan(&self, prefix: &str) -> KVResult<Vec<(String, Vec<u8>)>>;

    /// Sets and deletes in one atomic step.
    fn batch(&self, set: &[(&str, &[u8])], delete: &[&str]) -> KVResult<()>;
}

pub use memory::MemoryStore;
pub use redb::RedbStore;
