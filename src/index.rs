//! A local directory presented as a media index.

use async_trait::async_trait;
use exn::ResultExt;
use mipmap_cache::AssetRecord;
use mipmap_library::MediaIndex;
use mipmap_library::index::error::{ErrorKind, Result};
use mipmap_library::index::{AssetPage, PageRequest, Permission, SortOrder};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::sync::Mutex;

const IMAGE_EXTENSIONS: &[&str] = &["avif", "bmp", "gif", "heic", "heif", "jpeg", "jpg", "png", "tif", "tiff", "webp"];

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(e)))
}

/// The asset identifier for a local file: `file://` followed by the path
/// exactly as written, with no percent-encoding. Consumers recover the path
/// by stripping the scheme. Paths that are not valid UTF-8 have no identifier.
pub fn file_identifier(path: &Path) -> Option<String> {
    path.to_str().map(|path| format!("file://{path}"))
}

/// Every image below a directory, most recently modified first.
///
/// Each request without a cursor re-walks the directory and pins the result;
/// cursors are offsets into that pinned listing, so paging stays consistent
/// even if files change underneath.
pub struct DirectoryIndex {
    root: PathBuf,
    snapshot: Mutex<Vec<AssetRecord>>,
}

impl DirectoryIndex {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), snapshot: Mutex::new(Vec::new()) }
    }

    async fn walk(&self, order: SortOrder) -> Result<Vec<AssetRecord>> {
        let unavailable = || ErrorKind::Unavailable(self.root.display().to_string());
        let root = tokio::fs::canonicalize(&self.root).await.or_raise(unavailable)?;
        let mut found: Vec<(SystemTime, PathBuf, String)> = Vec::new();
        let mut pending = vec![root];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await.or_raise(unavailable)?;
            while let Some(entry) = entries.next_entry().await.or_raise(unavailable)? {
                let path = entry.path();
                let metadata = match entry.metadata().await {
                    Ok(metadata) => metadata,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable entry");
                        continue;
                    },
                };
                if metadata.is_dir() {
                    pending.push(path);
                } else if metadata.is_file() && is_image(&path) {
                    let Some(identifier) = file_identifier(&path) else {
                        tracing::warn!(path = %path.display(), "Skipping image with a non UTF-8 path");
                        continue;
                    };
                    found.push((metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH), path, identifier));
                }
            }
        }
        match order {
            SortOrder::MostRecentFirst => found.sort_by(|(a_time, a_path, _), (b_time, b_path, _)| {
                b_time.cmp(a_time).then_with(|| a_path.cmp(b_path))
            }),
        }
        tracing::debug!(root = %self.root.display(), count = found.len(), "Walked directory");
        Ok(found.into_iter().map(|(_, _, identifier)| AssetRecord::new(identifier)).collect())
    }
}

#[async_trait]
impl MediaIndex for DirectoryIndex {
    async fn permission(&self) -> Result<Permission> {
        match tokio::fs::read_dir(&self.root).await {
            Ok(_) => Ok(Permission::Granted),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => Ok(Permission::Denied),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Permission::Undetermined),
            Err(e) => Err(e).or_raise(|| ErrorKind::Unavailable(self.root.display().to_string())),
        }
    }

    /// Filesystem permissions can't be granted from here; this only re-checks.
    async fn request_permission(&self) -> Result<Permission> {
        self.permission().await
    }

    async fn page(&self, request: PageRequest) -> Result<AssetPage> {
        let mut snapshot = self.snapshot.lock().await;
        let offset = match request.after.as_deref() {
            None => {
                *snapshot = self.walk(request.order).await?;
                0
            },
            Some(cursor) => cursor.parse::<usize>().or_raise(|| ErrorKind::InvalidCursor(cursor.to_string()))?,
        };
        if offset > snapshot.len() {
            exn::bail!(ErrorKind::InvalidCursor(offset.to_string()));
        }
        let end = offset.saturating_add(request.first as usize).min(snapshot.len());
        Ok(AssetPage {
            assets: snapshot[offset..end].to_vec(),
            total_count: snapshot.len() as u64,
            has_next_page: end < snapshot.len(),
            end_cursor: Some(end.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File, FileTimes};
    use std::time::Duration;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, age_secs: u64) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let file = File::create(&path).unwrap();
        let modified = SystemTime::now() - Duration::from_secs(age_secs);
        file.set_times(FileTimes::new().set_modified(modified)).unwrap();
    }

    fn names(assets: &[AssetRecord]) -> Vec<&str> {
        assets.iter().map(|a| a.identifier.rsplit('/').next().unwrap()).collect()
    }

    #[tokio::test]
    async fn test_pages_most_recent_first() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "old.jpg", 300);
        touch(dir.path(), "nested/newest.PNG", 10);
        touch(dir.path(), "middle.webp", 100);
        touch(dir.path(), "notes.txt", 1);
        let index = DirectoryIndex::new(dir.path());

        let count = index.page(PageRequest::count()).await.unwrap();
        assert_eq!(count.total_count, 3);
        assert!(count.assets.is_empty());

        let request = PageRequest::new(2);
        assert_eq!(request.order, SortOrder::MostRecentFirst);
        let first = index.page(request).await.unwrap();
        assert_eq!(names(&first.assets), vec!["newest.PNG", "middle.webp"]);
        assert!(first.has_next_page);
        assert!(first.assets[0].identifier.starts_with("file:///"));

        let second = index.page(PageRequest::new(2).after(first.end_cursor)).await.unwrap();
        assert_eq!(names(&second.assets), vec!["old.jpg"]);
        assert!(!second.has_next_page);
    }

    #[tokio::test]
    async fn test_cursor_pins_listing() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.jpg", 20);
        touch(dir.path(), "b.jpg", 10);
        let index = DirectoryIndex::new(dir.path());
        let first = index.page(PageRequest::new(1)).await.unwrap();

        // A file appearing mid-enumeration doesn't shift later pages.
        touch(dir.path(), "c.jpg", 0);
        let second = index.page(PageRequest::new(1).after(first.end_cursor)).await.unwrap();
        assert_eq!(names(&second.assets), vec!["a.jpg"]);
        assert_eq!(second.total_count, 2);
    }

    #[tokio::test]
    async fn test_permission() {
        let dir = TempDir::new().unwrap();
        assert_eq!(DirectoryIndex::new(dir.path()).permission().await.unwrap(), Permission::Granted);
        let missing = DirectoryIndex::new(dir.path().join("missing"));
        assert_eq!(missing.request_permission().await.unwrap(), Permission::Undetermined);
    }

    #[tokio::test]
    async fn test_bad_cursor() {
        let dir = TempDir::new().unwrap();
        let index = DirectoryIndex::new(dir.path());
        let err = index.page(PageRequest::new(10).after(Some("soon".to_string()))).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidCursor(_)));
    }

    #[tokio::test]
    async fn test_identifier_is_the_unescaped_path() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "beach day 100%.jpg", 0);
        let index = DirectoryIndex::new(dir.path());

        let page = index.page(PageRequest::new(10)).await.unwrap();
        let path = page.assets[0].identifier.strip_prefix("file://").unwrap();
        assert!(Path::new(path).is_file());
        assert!(path.ends_with("/beach day 100%.jpg"));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_skips_non_utf8_paths() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        touch(dir.path(), "fine.jpg", 0);
        File::create(dir.path().join(OsStr::from_bytes(b"bad\xff.jpg"))).unwrap();
        let index = DirectoryIndex::new(dir.path());

        let page = index.page(PageRequest::new(10)).await.unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(names(&page.assets), vec!["fine.jpg"]);
    }
}
