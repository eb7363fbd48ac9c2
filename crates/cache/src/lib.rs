//! Artifact cache for size-normalized media derivatives.
//!
//! This crate tracks which locally generated artifact belongs to which asset
//! at which target width. The mapping is ephemeral: artifacts themselves are
//! the source of truth, so every lookup re-checks that the recorded artifact
//! still exists. If the store is wiped, the cache is simply rebuilt.
//!
//! # Architecture
//! - **Models**: [`AssetRecord`] (an asset as reported by the external index),
//!   [`TargetWidth`] (a width at 2-decimal precision), [`CacheKey`] (the
//!   canonical `"<identifier>--<width>"` store key) and [`CachedArtifact`].
//! - **[`ArtifactLocator`]**: existence checks for artifact locations.
//! - **[`ArtifactCache`]**: lookups, writes and the all-or-nothing bulk load
//!   over a [`KeyValueStore`](mipmap_store::KeyValueStore) namespace.

pub mod error;
mod locator;
mod models;
mod repo;

#[cfg(any(test, feature = "mock"))]
pub use crate::locator::MockLocator;
pub use crate::locator::{ArtifactLocator, LocalLocator};
pub use crate::models::{AssetRecord, CacheKey, CachedArtifact, TargetWidth};
pub use crate::repo::ArtifactCache;
use std::sync::Arc;

pub type LocatorHandle = Arc<dyn ArtifactLocator + Send + Sync>;
