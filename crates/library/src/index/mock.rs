//! In-memory media index for testing.

use super::error::{ErrorKind, Result};
use super::{AssetPage, MediaIndex, PageRequest, Permission, SortOrder};
use async_trait::async_trait;
use exn::ResultExt;
use mipmap_cache::AssetRecord;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory media index for testing.
///
/// Assets are held already sorted most-recent-first. Cursors are decimal
/// offsets. Every call to [`MediaIndex::page`] is counted, and the index can
/// be told to fail after a number of pages.
pub struct MockIndex {
    assets: RwLock<Vec<AssetRecord>>,
    permission: RwLock<Permission>,
    grant_on_request: bool,
    fail_after_pages: Option<usize>,
    page_calls: AtomicUsize,
}

impl MockIndex {
    pub fn new(assets: impl IntoIterator<Item = AssetRecord>) -> Self {
        Self {
            assets: RwLock::new(assets.into_iter().collect()),
            permission: RwLock::new(Permission::Granted),
            grant_on_request: true,
            fail_after_pages: None,
            page_calls: AtomicUsize::new(0),
        }
    }

    /// An index with `count` assets named `mock://asset/<n>`.
    pub fn with_count(count: usize) -> Self {
        Self::new((0..count).map(|i| AssetRecord::new(format!("mock://asset/{i}"))))
    }

    /// Start with `permission`; requesting it grants access only if `grant` is set.
    pub fn with_permission(mut self, permission: Permission, grant: bool) -> Self {
        self.permission = RwLock::new(permission);
        self.grant_on_request = grant;
        self
    }

    /// Fail every page request after the first `pages` content pages.
    pub fn failing_after(mut self, pages: usize) -> Self {
        self.fail_after_pages = Some(pages);
        self
    }

    pub fn set_assets(&self, assets: impl IntoIterator<Item = AssetRecord>) {
        if let Ok(mut guard) = self.assets.write() {
            *guard = assets.into_iter().collect();
        }
    }

    /// Number of page requests made so far (including count-only requests).
    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    fn current_permission(&self) -> Permission {
        self.permission.read().map(|p| *p).unwrap_or_default()
    }
}

#[async_trait]
impl MediaIndex for MockIndex {
    async fn permission(&self) -> Result<Permission> {
        Ok(self.current_permission())
    }

    async fn request_permission(&self) -> Result<Permission> {
        if self.grant_on_request
            && let Ok(mut permission) = self.permission.write()
        {
            *permission = Permission::Granted;
        }
        Ok(self.current_permission())
    }

    async fn page(&self, request: PageRequest) -> Result<AssetPage> {
        let calls = self.page_calls.fetch_add(1, Ordering::SeqCst);
        if self.current_permission() != Permission::Granted {
            exn::bail!(ErrorKind::PermissionDenied);
        }
        // The count-only request is the first call of every enumeration.
        if let Some(limit) = self.fail_after_pages
            && request.first > 0
            && calls > limit
        {
            exn::bail!(ErrorKind::Unavailable("mock failure".to_string()));
        }
        let assets = match request.order {
            SortOrder::MostRecentFirst => self.assets.read().map(|a| a.clone()).unwrap_or_default(),
        };
        let offset = match request.after.as_deref() {
            Some(cursor) => cursor.parse::<usize>().or_raise(|| ErrorKind::InvalidCursor(cursor.to_string()))?,
            None => 0,
        };
        let end = offset.saturating_add(request.first as usize).min(assets.len());
        let page = assets.get(offset.min(end)..end).unwrap_or_default().to_vec();
        Ok(AssetPage {
            total_count: assets.len() as u64,
            has_next_page: end < assets.len(),
            end_cursor: Some(end.to_string()),
            assets: page,
        })
    }
}
