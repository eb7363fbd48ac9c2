//! Existence checks for generated artifacts.

use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use std::path::Path;

/// Answers whether a recorded artifact location still holds an artifact.
///
/// A location that simply isn't there is `Ok(false)`; an error means the
/// check itself could not be performed.
#[async_trait]
pub trait ArtifactLocator: Send + Sync {
    async fn exists(&self, location: &str) -> Result<bool>;
}

/// Locator for artifacts on the local filesystem.
///
/// Accepts plain paths as well as `file://` URIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalLocator;

impl LocalLocator {
    fn path(location: &str) -> &Path {
        Path::new(location.strip_prefix("file://").unwrap_or(location))
    }
}

#[async_trait]
impl ArtifactLocator for LocalLocator {
    async fn exists(&self, location: &str) -> Result<bool> {
        tokio::fs::try_exists(Self::path(location))
            .await
            .or_raise(|| ErrorKind::Locator(location.to_string()))
    }
}

#[cfg(any(test, feature = "mock"))]
mod mock {
    use super::*;
    use std::collections::HashSet;
    use std::sync::RwLock;

    /// Locator backed by an in-memory set of locations.
    #[derive(Debug, Default)]
    pub struct MockLocator {
        present: RwLock<HashSet<String>>,
        everything: bool,
    }
    impl MockLocator {
        /// A locator that reports every location as present.
        pub fn everything() -> Self {
            Self { present: RwLock::default(), everything: true }
        }

        pub fn with_locations(locations: impl IntoIterator<Item = impl Into<String>>) -> Self {
            Self { present: RwLock::new(locations.into_iter().map(Into::into).collect()), everything: false }
        }

        pub fn insert(&self, location: impl Into<String>) {
            if let Ok(mut present) = self.present.write() {
                present.insert(location.into());
            }
        }

        pub fn remove(&self, location: &str) {
            if let Ok(mut present) = self.present.write() {
                present.remove(location);
            }
        }
    }

    #[async_trait]
    impl ArtifactLocator for MockLocator {
        async fn exists(&self, location: &str) -> Result<bool> {
            if self.everything {
                return Ok(true);
            }
            Ok(self.present.read().is_ok_and(|present| present.contains(location)))
        }
    }
}
#[cfg(any(test, feature = "mock"))]
pub use mock::MockLocator;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case(false)]
    #[case(true)]
    #[tokio::test]
    async fn test_local_locator(#[case] as_uri: bool) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("artifact.jpg");
        let location = if as_uri { format!("file://{}", path.display()) } else { path.display().to_string() };

        assert!(!LocalLocator.exists(&location).await.unwrap());
        std::fs::write(&path, b"jpeg").unwrap();
        assert!(LocalLocator.exists(&location).await.unwrap());
    }

    #[tokio::test]
    async fn test_mock_locator() {
        let locator = MockLocator::with_locations(["a"]);
        assert!(locator.exists("a").await.unwrap());
        locator.remove("a");
        assert!(!locator.exists("a").await.unwrap());
        assert!(MockLocator::everything().exists("anything").await.unwrap());
    }
}
