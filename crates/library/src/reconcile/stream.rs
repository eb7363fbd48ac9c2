use crate::GeneratorHandle;
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::reconcile::error::{ErrorKind as ReconcileErrorKind, Result as ReconcileResult};
use crate::reconcile::{ReconcileProgress, ReconcileState};
use async_stream::stream;
use exn::ResultExt;
use futures::Stream;
use futures::future::join_all;
use mipmap_cache::{ArtifactCache, AssetRecord, CacheKey, CachedArtifact, TargetWidth};

/// Maximum number of generator calls in flight at once.
pub const DEFAULT_BATCH_SIZE: usize = 8;

/// Progress events emitted by [`Reconciler::reconcile`].
///
/// Events follow a strict ordering. Either:
/// - [`Restored`](Self::Restored) then [`Ready`](Self::Ready), when the cache
///   already covers every asset; or
/// - [`Calculating`](Self::Calculating), then one [`Progress`](Self::Progress)
///   per batch, then [`Ready`](Self::Ready); or
/// - [`Ready`](Self::Ready) alone, for an empty asset list.
///
/// A failure ends the stream with an error after the failing batch finishes,
/// and the reconciler stays [`Calculating`](ReconcileState::Calculating).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileEvent {
    Restored { count: u64 },
    Calculating { total: u64 },
    Progress { current: u64, total: u64 },
    Ready { count: u64 },
}

/// Sole owner of every mutation of the artifact cache.
pub struct Reconciler {
    cache: ArtifactCache,
    generator: GeneratorHandle,
    batch_size: usize,
    state: ReconcileState,
    progress: ReconcileProgress,
    artifacts: Vec<CachedArtifact>,
}

impl Reconciler {
    pub fn new(cache: ArtifactCache, generator: GeneratorHandle, batch_size: usize) -> Self {
        Self {
            cache,
            generator,
            batch_size: batch_size.max(1),
            state: ReconcileState::Idle,
            progress: ReconcileProgress::default(),
            artifacts: Vec::new(),
        }
    }

    pub fn state(&self) -> ReconcileState {
        self.state
    }

    pub fn progress(&self) -> ReconcileProgress {
        self.progress
    }

    /// The complete artifact set, in asset order. Empty unless [`Ready`](ReconcileState::Ready).
    pub fn artifacts(&self) -> &[CachedArtifact] {
        &self.artifacts
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// Wipe the cache, at every width.
    pub async fn clear(&mut self) -> LibraryResult<()> {
        self.artifacts.clear();
        self.state = ReconcileState::Idle;
        self.cache.clear().await.or_raise(|| ReconcileErrorKind::Cache).or_raise(|| LibraryErrorKind::Reconcile)
    }

    /// Resolve an artifact for every asset at `width`.
    ///
    /// Any progress or result from a previous call is discarded first, so
    /// switching widths never mixes artifacts of different sizes.
    pub fn reconcile<'a>(
        &'a mut self,
        assets: &'a [AssetRecord],
        width: TargetWidth,
    ) -> impl Stream<Item = LibraryResult<ReconcileEvent>> + 'a {
        stream! {
            for await event in self.reconcile_inner(assets, width) {
                yield event.or_raise(|| LibraryErrorKind::Reconcile);
            }
        }
    }

    /// Wipe the cache, then reconcile from scratch.
    pub fn recalculate<'a>(
        &'a mut self,
        assets: &'a [AssetRecord],
        width: TargetWidth,
    ) -> impl Stream<Item = LibraryResult<ReconcileEvent>> + 'a {
        stream! {
            tracing::info!(width = %width, "Clearing artifact cache before recalculating");
            if let Err(e) = self.clear().await {
                yield Err(e);
                return;
            }
            for await event in self.reconcile_inner(assets, width) {
                yield event.or_raise(|| LibraryErrorKind::Reconcile);
            }
        }
    }

    fn reconcile_inner<'a>(
        &'a mut self,
        assets: &'a [AssetRecord],
        width: TargetWidth,
    ) -> impl Stream<Item = ReconcileResult<ReconcileEvent>> + 'a {
        stream!({
            self.artifacts.clear();
            self.progress = ReconcileProgress::default();
            self.state = ReconcileState::Idle;

            if assets.is_empty() {
                self.state = ReconcileState::Ready;
                yield Ok(ReconcileEvent::Ready { count: 0 });
                return;
            }
            let total = assets.len() as u64;

            let restored = match self.cache.load_all(assets, width).await.or_raise(|| ReconcileErrorKind::Cache) {
                Ok(restored) => restored,
                Err(e) => {
                    yield Err(e);
                    return;
                },
            };
            if !restored.is_empty() {
                self.state = ReconcileState::RestoringFromCache;
                tracing::info!(count = total, width = %width, "Restoring artifacts from cache");
                yield Ok(ReconcileEvent::Restored { count: total });
                self.artifacts = restored;
                self.progress = ReconcileProgress { current: total, total };
                self.state = ReconcileState::Ready;
                yield Ok(ReconcileEvent::Ready { count: total });
                return;
            }

            self.state = ReconcileState::Calculating;
            self.progress = ReconcileProgress { current: 0, total };
            tracing::info!(total, width = %width, "Calculating artifacts");
            yield Ok(ReconcileEvent::Calculating { total });

            let mut resolved = Vec::with_capacity(assets.len());
            for batch in assets.chunks(self.batch_size) {
                let results =
                    join_all(batch.iter().map(|asset| resolve(&self.cache, &self.generator, asset, width))).await;
                let mut failure = None;
                for result in results {
                    match result {
                        Ok(artifact) => resolved.push(artifact),
                        Err(e) if failure.is_none() => failure = Some(e),
                        Err(e) => tracing::error!(error = ?e, "Additional failure in batch"),
                    }
                }
                if let Some(e) = failure {
                    tracing::error!(error = ?e, current = self.progress.current, total, "Reconciliation batch failed");
                    yield Err(e);
                    return;
                }
                self.progress.current += batch.len() as u64;
                tracing::debug!(current = self.progress.current, total, "Reconciled batch");
                yield Ok(ReconcileEvent::Progress { current: self.progress.current, total });
            }

            self.artifacts = resolved;
            self.state = ReconcileState::Ready;
            tracing::info!(count = total, width = %width, "Artifacts ready");
            yield Ok(ReconcileEvent::Ready { count: total });
        })
    }
}

/// Resolve one asset: a live cache entry if there is one, otherwise a fresh artifact.
async fn resolve(
    cache: &ArtifactCache,
    generator: &GeneratorHandle,
    asset: &AssetRecord,
    width: TargetWidth,
) -> ReconcileResult<CachedArtifact> {
    let key = CacheKey::new(asset.identifier.clone(), width);
    if let Some(hit) = cache.lookup(&key).await.or_raise(|| ReconcileErrorKind::Cache)? {
        return Ok(hit);
    }
    let location = generator
        .generate(&asset.identifier, width)
        .await
        .or_raise(|| ReconcileErrorKind::Generation(asset.identifier.clone()))?;
    cache.put(key, location).await.or_raise(|| ReconcileErrorKind::Cache)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::MockGenerator;
    use futures::StreamExt;
    use mipmap_cache::MockLocator;
    use mipmap_store::MemoryStore;
    use std::sync::Arc;

    fn assets(n: usize) -> Vec<AssetRecord> {
        (0..n).map(|i| AssetRecord::new(format!("mock://asset/{i}"))).collect()
    }

    fn width(w: f64) -> TargetWidth {
        TargetWidth::new(w).unwrap()
    }

    fn reconciler(generator: &Arc<MockGenerator>) -> Reconciler {
        let cache = ArtifactCache::new(Arc::new(MemoryStore::default()), Arc::new(MockLocator::everything()));
        Reconciler::new(cache, generator.clone(), DEFAULT_BATCH_SIZE)
    }

    async fn run(reconciler: &mut Reconciler, assets: &[AssetRecord], width: TargetWidth) -> Vec<ReconcileEvent> {
        reconciler.reconcile(assets, width).map(|event| event.unwrap()).collect().await
    }

    #[tokio::test]
    async fn test_empty_assets_ready_immediately() {
        let generator = Arc::new(MockGenerator::new());
        let mut reconciler = reconciler(&generator);
        let events = run(&mut reconciler, &[], width(74.8)).await;
        assert_eq!(events, vec![ReconcileEvent::Ready { count: 0 }]);
        assert_eq!(reconciler.state(), ReconcileState::Ready);
        assert!(reconciler.artifacts().is_empty());
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_calculates_in_batches() {
        let generator = Arc::new(MockGenerator::new());
        let mut reconciler = reconciler(&generator);
        let all = assets(20);

        let events = run(&mut reconciler, &all, width(74.8)).await;
        assert_eq!(
            events,
            vec![
                ReconcileEvent::Calculating { total: 20 },
                ReconcileEvent::Progress { current: 8, total: 20 },
                ReconcileEvent::Progress { current: 16, total: 20 },
                ReconcileEvent::Progress { current: 20, total: 20 },
                ReconcileEvent::Ready { count: 20 },
            ]
        );
        assert_eq!(reconciler.state(), ReconcileState::Ready);
        assert_eq!(generator.calls(), 20);
        let identifiers: Vec<_> = reconciler.artifacts().iter().map(|a| a.asset_identifier.clone()).collect();
        let expected: Vec<_> = all.iter().map(|a| a.identifier.clone()).collect();
        assert_eq!(identifiers, expected);
        assert_eq!(reconciler.cache().len().await.unwrap(), 20);
    }

    #[tokio::test]
    async fn test_second_run_restores_from_cache() {
        let generator = Arc::new(MockGenerator::new());
        let mut reconciler = reconciler(&generator);
        let all = assets(10);
        run(&mut reconciler, &all, width(74.8)).await;

        let events = run(&mut reconciler, &all, width(74.8)).await;
        assert_eq!(events, vec![ReconcileEvent::Restored { count: 10 }, ReconcileEvent::Ready { count: 10 }]);
        assert_eq!(generator.calls(), 10);
        assert_eq!(reconciler.artifacts().len(), 10);
    }

    #[tokio::test]
    async fn test_partial_cache_only_generates_misses() {
        let generator = Arc::new(MockGenerator::new());
        let mut reconciler = reconciler(&generator);
        let all = assets(10);
        run(&mut reconciler, &all[..6], width(74.8)).await;

        let events = run(&mut reconciler, &all, width(74.8)).await;
        assert_eq!(events.first(), Some(&ReconcileEvent::Calculating { total: 10 }));
        assert_eq!(events.last(), Some(&ReconcileEvent::Ready { count: 10 }));
        // Six hits from the first run, four freshly generated.
        assert_eq!(generator.calls(), 10);
    }

    #[tokio::test]
    async fn test_generation_failure_stays_calculating() {
        let generator = Arc::new(MockGenerator::failing_on(["mock://asset/10"]));
        let mut reconciler = reconciler(&generator);
        let all = assets(20);

        let events: Vec<_> = reconciler.reconcile(&all, width(74.8)).collect().await;
        assert!(matches!(events[0], Ok(ReconcileEvent::Calculating { total: 20 })));
        assert!(matches!(events[1], Ok(ReconcileEvent::Progress { current: 8, total: 20 })));
        let err = events[2].as_ref().unwrap_err();
        assert!(matches!(&**err, LibraryErrorKind::Reconcile));
        assert_eq!(events.len(), 3);

        assert_eq!(reconciler.state(), ReconcileState::Calculating);
        assert!(reconciler.artifacts().is_empty());
        // The failing batch still ran to completion.
        assert_eq!(generator.calls(), 16);
        assert_eq!(generator.generated().len(), 15);
    }

    #[tokio::test]
    async fn test_width_change_discards_previous_result() {
        let generator = Arc::new(MockGenerator::new());
        let mut reconciler = reconciler(&generator);
        let all = assets(4);
        run(&mut reconciler, &all, width(74.8)).await;

        let events = run(&mut reconciler, &all, width(120.0)).await;
        assert_eq!(events.first(), Some(&ReconcileEvent::Calculating { total: 4 }));
        assert!(reconciler.artifacts().iter().all(|a| a.target_width == width(120.0)));
        assert_eq!(reconciler.cache().len().await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_width_change_while_calculating_restarts_accounting() {
        let generator = Arc::new(MockGenerator::new());
        let mut reconciler = reconciler(&generator);
        let all = assets(20);
        {
            let mut events = std::pin::pin!(reconciler.reconcile(&all, width(74.8)));
            assert_eq!(events.next().await.unwrap().unwrap(), ReconcileEvent::Calculating { total: 20 });
            assert_eq!(events.next().await.unwrap().unwrap(), ReconcileEvent::Progress { current: 8, total: 20 });
        }
        assert_eq!(reconciler.state(), ReconcileState::Calculating);
        assert_eq!(reconciler.progress(), ReconcileProgress { current: 8, total: 20 });

        let events = run(&mut reconciler, &all, width(120.0)).await;
        assert_eq!(events[0], ReconcileEvent::Calculating { total: 20 });
        // Counting starts over instead of continuing from the abandoned width.
        assert_eq!(events[1], ReconcileEvent::Progress { current: 8, total: 20 });
        assert_eq!(events.last(), Some(&ReconcileEvent::Ready { count: 20 }));
        assert_eq!(reconciler.state(), ReconcileState::Ready);
        assert_eq!(reconciler.progress(), ReconcileProgress { current: 20, total: 20 });
        assert_eq!(reconciler.artifacts().len(), 20);
        assert!(reconciler.artifacts().iter().all(|a| a.target_width == width(120.0)));
        assert_eq!(generator.calls(), 28);
    }

    #[tokio::test]
    async fn test_recalculate_clears_first() {
        let generator = Arc::new(MockGenerator::new());
        let mut reconciler = reconciler(&generator);
        let all = assets(4);
        run(&mut reconciler, &all, width(74.8)).await;
        run(&mut reconciler, &all, width(120.0)).await;

        let events: Vec<_> =
            reconciler.recalculate(&all, width(74.8)).map(|event| event.unwrap()).collect().await;
        assert_eq!(events.first(), Some(&ReconcileEvent::Calculating { total: 4 }));
        assert_eq!(generator.calls(), 12);
        // Only the recalculated width survives.
        assert_eq!(reconciler.cache().len().await.unwrap(), 4);
        assert_eq!(reconciler.state(), ReconcileState::Ready);
    }
}
