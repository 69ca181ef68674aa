//! Key-value persistence used to carry a session across restarts.
//!
//! This module provides:
//! - `KeyValueStore`: the synchronous get/set/remove contract
//! - `MemoryStore`: process-local storage for tests and embedding
//! - `FileStore`: a JSON file on disk that survives restarts

pub mod error;
pub mod file;
pub mod memory;

pub use error::StorageError;
pub use file::FileStore;
pub use memory::MemoryStore;

/// Synchronous local key-value storage.
///
/// Implementations must be cheap enough to call from inside a session
/// state transition; they are never awaited.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key. Removing a key that is not present succeeds.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
