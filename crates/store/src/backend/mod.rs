//! Key-value store trait and implementations.
//!
//! This module defines the [`KeyValueStore`] trait: a durable mapping from
//! string keys to string values, scoped to a namespace. It is the only
//! persistence capability the rest of the workspace depends on.

#[cfg(any(test, feature = "mock"))]
mod memory;
mod sqlite;

#[cfg(any(test, feature = "mock"))]
pub use self::memory::MemoryStore;
pub use self::sqlite::SqliteStore;
use crate::error::Result;
use async_trait::async_trait;

/// Durable string-to-string mapping, scoped to a single namespace.
///
/// All operations are asynchronous so that implementations backed by a real
/// storage engine can suspend on I/O. Values must survive process restarts
/// for every implementation except the in-memory test double.
///
/// # Examples
///
/// ```
/// use mipmap_store::{KeyValueStore, error::Result};
///
/// async fn bump(store: &dyn KeyValueStore) -> Result<u64> {
///     let current = store.get("counter").await?.and_then(|v| v.parse().ok()).unwrap_or(0u64);
///     store.set("counter", &(current + 1).to_string()).await?;
///     Ok(current + 1)
/// }
/// ```
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Namespace this store reads from and writes to (used for logging, and
    /// to scope [`clear()`](Self::clear)).
    fn namespace(&self) -> &str;

    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Create or overwrite the value stored under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Write several entries at once.
    ///
    /// Implementations should apply the whole batch atomically: either every
    /// entry is written, or none are.
    async fn set_many(&self, entries: &[(String, String)]) -> Result<()>;

    /// List every key in the namespace, sorted.
    async fn keys(&self) -> Result<Vec<String>>;

    /// List every key/value pair in the namespace, sorted by key.
    ///
    /// Default implementation of this method is to call [`keys()`](Self::keys)
    /// then [`get()`](Self::get) each one; keys deleted in between are skipped.
    async fn entries(&self) -> Result<Vec<(String, String)>> {
        let mut entries = Vec::new();
        for key in self.keys().await? {
            if let Some(value) = self.get(&key).await? {
                entries.push((key, value));
            }
        }
        Ok(entries)
    }

    /// Number of entries in the namespace.
    async fn len(&self) -> Result<usize> {
        Ok(self.keys().await?.len())
    }

    /// Remove `key`. Returns `true` if a value was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Remove every entry in the namespace. Other namespaces are untouched.
    async fn clear(&self) -> Result<()>;
}
