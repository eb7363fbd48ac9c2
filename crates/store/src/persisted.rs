use crate::StoreHandle;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A value that lives in memory but is mirrored to a [`KeyValueStore`](crate::KeyValueStore).
///
/// The value is restored once, on construction, and written back as JSON
/// every time it changes. Reads never touch the store.
///
/// Restoration is forgiving: a value that no longer parses (for example
/// after the shape of `T` changed between releases) is logged and replaced by
/// the initial value. A store that cannot be read at all is a real fault and
/// is returned as an error.
pub struct PersistedState<T> {
    store: StoreHandle,
    key: String,
    value: T,
}

impl<T: Serialize + DeserializeOwned> PersistedState<T> {
    /// Restore the value stored under `key`, falling back to `initial`.
    pub async fn restore(store: StoreHandle, key: impl Into<String>, initial: T) -> Result<Self> {
        let key = key.into();
        let value = match store.get(&key).await? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(e) => {
                    tracing::error!(namespace = store.namespace(), key = %key, error = %e, "Failed to parse persisted value; using initial value");
                    initial
                },
            },
            None => initial,
        };
        Ok(Self { store, key, value })
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Replace the value and write it through to the store.
    pub async fn set(&mut self, value: T) -> Result<()> {
        self.value = value;
        self.persist().await
    }

    /// Mutate the value in place and write it through to the store.
    pub async fn update(&mut self, f: impl FnOnce(&mut T)) -> Result<()> {
        f(&mut self.value);
        self.persist().await
    }

    async fn persist(&self) -> Result<()> {
        let raw = serde_json::to_string(&self.value).or_raise(|| ErrorKind::InvalidData("persisted state"))?;
        self.store.set(&self.key, &raw).await
    }
}
