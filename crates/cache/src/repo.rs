//! Repository for artifact mappings.
//!
//! Each entry maps a [`CacheKey`] (in its canonical string form) to the
//! location of the artifact generated for it. The repository never deletes a
//! stale entry on its own: lookups report it as a miss and the next `put`
//! for the same key overwrites it.

use crate::LocatorHandle;
use crate::error::{ErrorKind, Result};
use crate::models::{AssetRecord, CacheKey, CachedArtifact, TargetWidth};
use exn::ResultExt;
use mipmap_store::StoreHandle;
use std::collections::HashMap;

/// Repository for [`CachedArtifact`] entries over a key-value store namespace.
#[derive(Clone)]
pub struct ArtifactCache {
    store: StoreHandle,
    locator: LocatorHandle,
}
impl ArtifactCache {
    pub fn new(store: StoreHandle, locator: LocatorHandle) -> Self {
        Self { store, locator }
    }

    /// Look up the artifact recorded for `key`.
    ///
    /// Returns `None` if nothing is recorded, or if the recorded artifact no
    /// longer exists. Existence is checked on every call.
    pub async fn lookup(&self, key: &CacheKey) -> Result<Option<CachedArtifact>> {
        let encoded = key.to_string();
        let Some(location) = self.store.get(&encoded).await.or_raise(|| ErrorKind::Store)? else {
            return Ok(None);
        };
        if !self.locator.exists(&location).await? {
            tracing::debug!(key = %encoded, location = %location, "Cached artifact no longer exists");
            return Ok(None);
        }
        Ok(Some(CachedArtifact::new(key.clone(), location)))
    }

    /// Record `location` as the artifact for `key`, replacing any previous entry.
    pub async fn put(&self, key: CacheKey, location: impl Into<String>) -> Result<CachedArtifact> {
        let location = location.into();
        self.store.set(&key.to_string(), &location).await.or_raise(|| ErrorKind::Store)?;
        Ok(CachedArtifact::new(key, location))
    }

    /// Load the artifacts for every asset at `width`, or nothing at all.
    ///
    /// The result is in the same order as `assets`. If even one asset has no
    /// entry at this width, the result is empty: a partial set is never
    /// returned. Entries are matched on their recorded key only; artifact
    /// existence is not re-checked here.
    pub async fn load_all(&self, assets: &[AssetRecord], width: TargetWidth) -> Result<Vec<CachedArtifact>> {
        if assets.is_empty() {
            return Ok(Vec::new());
        }
        let entries = self.store.entries().await.or_raise(|| ErrorKind::Store)?;
        let mut by_identifier = HashMap::with_capacity(entries.len());
        for (raw, location) in entries {
            match raw.parse::<CacheKey>() {
                Ok(key) if key.target_width == width => {
                    by_identifier.insert(key.asset_identifier, location);
                },
                Ok(_) => {},
                Err(e) => tracing::warn!(key = %raw, error = %e, "Skipping undecodable cache key"),
            }
        }

        let mut artifacts = Vec::with_capacity(assets.len());
        for asset in assets {
            let Some(location) = by_identifier.remove(&asset.identifier) else {
                tracing::debug!(
                    width = %width,
                    matched = artifacts.len(),
                    total = assets.len(),
                    missing = %asset.identifier,
                    "Cache does not cover every asset"
                );
                return Ok(Vec::new());
            };
            artifacts.push(CachedArtifact::new(CacheKey::new(asset.identifier.clone(), width), location));
        }
        Ok(artifacts)
    }

    /// Remove every entry, at every width.
    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await.or_raise(|| ErrorKind::Store)
    }

    pub async fn len(&self) -> Result<usize> {
        self.store.len().await.or_raise(|| ErrorKind::Store)
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}
