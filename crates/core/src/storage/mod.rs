//! Module of MemStorage and the replicated KeyValueStore built on it.

mod kv;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
pub use crate::storage::kv::Entry;
pub use crate::storage::kv::EntryStorage;
pub use crate::storage::kv::KeyValueStore;
pub use crate::storage::kv::Role;
pub use crate::storage::memory::MemStorage;

/// Key value storage interface
#[async_trait]
pub trait KvStorageInterface<V> {
    /// Get a cache entry by `key`.
    async fn get(&self, key: &str) -> Result<Option<V>>;

    /// Put `entry` in the cache under `key`.
    async fn put(&self, key: &str, value: &V) -> Result<()>;

    /// All entries with their keys.
    async fn get_all(&self) -> Result<Vec<(String, V)>>;

    /// Remove an `entry` by `key`, returning it.
    async fn remove(&self, key: &str) -> Result<Option<V>>;
}
