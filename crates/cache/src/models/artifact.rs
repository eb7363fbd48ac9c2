use crate::models::{CacheKey, TargetWidth};

/// A resolved mapping from an asset at a given width to its derived artifact.
///
/// Only meaningful while the artifact still exists at `artifact_location`;
/// [`ArtifactCache::lookup`](crate::ArtifactCache::lookup) re-checks that on
/// every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedArtifact {
    pub asset_identifier: String,
    pub target_width: TargetWidth,
    pub artifact_location: String,
}
impl CachedArtifact {
    pub fn new(key: CacheKey, artifact_location: impl Into<String>) -> Self {
        Self {
            asset_identifier: key.asset_identifier,
            target_width: key.target_width,
            artifact_location: artifact_location.into(),
        }
    }

    pub fn key(&self) -> CacheKey {
        CacheKey::new(self.asset_identifier.clone(), self.target_width)
    }
}
