mod artifact;
mod asset;
mod key;
mod width;

pub use self::artifact::CachedArtifact;
pub use self::asset::AssetRecord;
pub use self::key::CacheKey;
pub use self::width::TargetWidth;
