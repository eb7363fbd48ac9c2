//! The external media index.
//!
//! The index is owned by something else (the device, the filesystem, a photo
//! library) and is only ever read. It reports its assets most recent first,
//! one page at a time, and may require a permission before it can be read.

pub mod error;
#[cfg(any(test, feature = "mock"))]
mod mock;

use self::error::Result;
use async_trait::async_trait;
use derive_more::Display;
use mipmap_cache::AssetRecord;
use serde::{Deserialize, Serialize};

#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockIndex;

/// Whether the media index may be read.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    #[default]
    #[display("UNDETERMINED")]
    Undetermined,
    #[display("GRANTED")]
    Granted,
    #[display("DENIED")]
    Denied,
}

/// Order in which an index returns assets.
///
/// Implementations match on this exhaustively, so a new order cannot be
/// silently ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Most recently created assets first.
    #[default]
    MostRecentFirst,
}

/// A request for the next page of assets.
///
/// Cursors are opaque and only valid for the lifetime of the index value
/// that handed them out; they are never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub first: u32,
    pub after: Option<String>,
    pub order: SortOrder,
}
impl PageRequest {
    pub fn new(first: u32) -> Self {
        Self { first, ..Default::default() }
    }

    /// A request that fetches no assets, used only to learn the total count.
    pub fn count() -> Self {
        Self::new(0)
    }

    pub fn after(mut self, cursor: Option<String>) -> Self {
        self.after = cursor;
        self
    }
}

/// One page of assets, in index order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetPage {
    pub assets: Vec<AssetRecord>,
    /// Total number of assets in the index, as of this page.
    pub total_count: u64,
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// Read access to an external, paged media index.
#[async_trait]
pub trait MediaIndex: Send + Sync {
    /// The current permission status, without prompting.
    async fn permission(&self) -> Result<Permission>;

    /// Ask for permission to read the index, returning the resulting status.
    async fn request_permission(&self) -> Result<Permission>;

    async fn page(&self, request: PageRequest) -> Result<AssetPage>;
}
