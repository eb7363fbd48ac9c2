//! Producing artifacts from assets.
//!
//! mipmap never transcodes anything itself. An [`ArtifactGenerator`] turns an
//! asset into a size-normalized artifact somewhere and reports where.

pub mod error;
#[cfg(any(test, feature = "mock"))]
mod mock;

use self::error::Result;
use async_trait::async_trait;
use mipmap_cache::TargetWidth;

#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockGenerator;

#[async_trait]
pub trait ArtifactGenerator: Send + Sync {
    /// Generate the artifact for `asset_identifier` at `width`, returning its location.
    async fn generate(&self, asset_identifier: &str, width: TargetWidth) -> Result<String>;
}
