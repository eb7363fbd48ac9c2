//! In-memory key-value store for testing.

use crate::KeyValueStore;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// In-memory key-value store for testing.
///
/// Entries are stored in a `BTreeMap` behind a [`RwLock`], so all trait
/// methods can operate on `&self` without external synchronisation. Ideal for
/// unit tests that need a [`KeyValueStore`] without touching SQLite.
pub struct MemoryStore {
    namespace: String,
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Create a memory store pre-populated with entries.
    pub fn with_entries(entries: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>) -> Self {
        Self {
            namespace: "memory".to_string(),
            entries: RwLock::new(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    /// Change the namespace reported by the store.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
}
impl Default for MemoryStore {
    fn default() -> Self {
        let entries: [(&str, &str); 0] = [];
        Self::with_entries(entries)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn set_many(&self, entries: &[(String, String)]) -> Result<()> {
        let mut guard = self.entries.write().await;
        guard.extend(entries.iter().cloned());
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }

    async fn entries(&self) -> Result<Vec<(String, String)>> {
        Ok(self.entries.read().await.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}
