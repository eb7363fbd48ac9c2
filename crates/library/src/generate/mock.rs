//! Artifact generator for testing.

use super::ArtifactGenerator;
use super::error::{ErrorKind, Result};
use async_trait::async_trait;
use mipmap_cache::TargetWidth;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Generator that "produces" `mock://artifact/<identifier>@<width>` locations.
///
/// Records every call, and fails for any identifier it was told to fail on.
#[derive(Debug, Default)]
pub struct MockGenerator {
    failing: HashSet<String>,
    calls: AtomicUsize,
    generated: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(identifiers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { failing: identifiers.into_iter().map(Into::into).collect(), ..Default::default() }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Identifiers successfully generated, in completion order.
    pub fn generated(&self) -> Vec<String> {
        self.generated.lock().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn location(asset_identifier: &str, width: TargetWidth) -> String {
        format!("mock://artifact/{asset_identifier}@{width}")
    }
}

#[async_trait]
impl ArtifactGenerator for MockGenerator {
    async fn generate(&self, asset_identifier: &str, width: TargetWidth) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(asset_identifier) {
            exn::bail!(ErrorKind::Failed(asset_identifier.to_string()));
        }
        if let Ok(mut generated) = self.generated.lock() {
            generated.push(asset_identifier.to_string());
        }
        Ok(Self::location(asset_identifier, width))
    }
}
