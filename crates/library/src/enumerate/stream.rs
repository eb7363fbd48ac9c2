use crate::IndexHandle;
use crate::enumerate::error::{ErrorKind as EnumerateErrorKind, Result as EnumerateResult};
use crate::enumerate::{EnumerationState, LoadingState};
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::index::{PageRequest, Permission};
use async_stream::stream;
use exn::ResultExt;
use futures::Stream;
use mipmap_cache::AssetRecord;
use mipmap_store::{PersistedState, StoreHandle};
use std::collections::HashSet;

/// Key the enumeration state is persisted under.
pub const STATE_KEY: &str = "mediaLibrary";
pub const DEFAULT_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumerateOptions {
    /// Assets requested per page.
    pub page_size: u32,
    /// Never hold more than this many assets, whatever the index reports.
    pub max_assets: Option<u64>,
}
impl Default for EnumerateOptions {
    fn default() -> Self {
        Self { page_size: DEFAULT_PAGE_SIZE, max_assets: None }
    }
}

/// Progress events emitted by [`Enumerator::enumerate`].
///
/// Events follow a strict ordering. Either:
/// - [`PermissionDenied`](Self::PermissionDenied), alone; or
/// - [`Unchanged`](Self::Unchanged), alone, when the index holds as many
///   assets as the last completed enumeration found; or
/// - [`Started`](Self::Started), then zero or more [`Batch`](Self::Batch)es,
///   then [`Complete`](Self::Complete).
///
/// An error may terminate the stream early, in which case the persisted state
/// has already been reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumerateEvent {
    PermissionDenied,
    Unchanged { total: u64 },
    Started { total: u64 },
    /// A page was appended. `assets` holds only the new, deduplicated assets.
    Batch { assets: Vec<AssetRecord>, loaded: u64, total: u64 },
    Complete { total: u64 },
}

/// Pages through a [`MediaIndex`](crate::MediaIndex), keeping a persisted
/// [`EnumerationState`] up to date.
pub struct Enumerator {
    index: IndexHandle,
    state: PersistedState<EnumerationState>,
    options: EnumerateOptions,
}

impl Enumerator {
    /// Restore the last persisted state from `store`.
    ///
    /// Fails only if the store itself cannot be read.
    pub async fn restore(index: IndexHandle, store: StoreHandle, options: EnumerateOptions) -> LibraryResult<Self> {
        let mut state = PersistedState::restore(store, STATE_KEY, EnumerationState::default())
            .await
            .or_raise(|| LibraryErrorKind::Restore)?;
        if state.get().is_loading() {
            tracing::info!("Previous enumeration did not finish; resuming as idle");
            let resumed = state.get().clone().resumed();
            state.set(resumed).await.or_raise(|| LibraryErrorKind::Restore)?;
        }
        Ok(Self { index, state, options })
    }

    pub fn state(&self) -> &EnumerationState {
        self.state.get()
    }

    pub fn is_loading(&self) -> bool {
        self.state.get().is_loading()
    }

    /// Re-enumerate, unless an enumeration is already in progress.
    pub fn reload(&mut self) -> Option<impl Stream<Item = LibraryResult<EnumerateEvent>> + '_> {
        if self.is_loading() {
            tracing::debug!("Enumeration already in progress; ignoring reload");
            return None;
        }
        Some(self.enumerate())
    }

    /// Enumerate the index from the beginning.
    ///
    /// The stream is lazy; dropping it abandons the enumeration.
    pub fn enumerate(&mut self) -> impl Stream<Item = LibraryResult<EnumerateEvent>> + '_ {
        stream! {
            for await event in self.enumerate_inner() {
                yield event.or_raise(|| LibraryErrorKind::Enumerate);
            }
        }
    }

    fn limit(&self, count: u64) -> u64 {
        self.options.max_assets.map_or(count, |max| count.min(max))
    }

    async fn persist(&mut self, state: EnumerationState) -> EnumerateResult<()> {
        self.state.set(state).await.or_raise(|| EnumerateErrorKind::Store)
    }

    async fn resolve_permission(&self) -> EnumerateResult<Permission> {
        let permission = self.index.permission().await.or_raise(|| EnumerateErrorKind::Permission)?;
        if permission == Permission::Granted {
            return Ok(permission);
        }
        tracing::debug!(%permission, "Requesting media index permission");
        self.index.request_permission().await.or_raise(|| EnumerateErrorKind::Permission)
    }

    /// Forget everything but the permission status after a failure.
    async fn reset(&mut self) {
        let permission = self.state.get().permission;
        if let Err(e) = self.state.set(EnumerationState { permission, ..Default::default() }).await {
            tracing::error!(error = ?e, "Could not persist reset enumeration state");
        }
    }

    fn enumerate_inner(&mut self) -> impl Stream<Item = EnumerateResult<EnumerateEvent>> + '_ {
        stream!({
            let permission = match self.resolve_permission().await {
                Ok(p) => p,
                Err(e) => {
                    self.reset().await;
                    yield Err(e);
                    return;
                },
            };
            if permission != Permission::Granted {
                tracing::info!(%permission, "Media index permission not granted");
                let denied = EnumerationState {
                    permission: Permission::Denied,
                    loading: LoadingState::Idle,
                    ..self.state.get().clone()
                };
                if let Err(e) = self.persist(denied).await {
                    yield Err(e);
                    return;
                }
                yield Ok(EnumerateEvent::PermissionDenied);
                return;
            }

            let previous = self.state.get().completed_count();
            let loading =
                EnumerationState { permission, loading: LoadingState::Loading, ..self.state.get().clone() };
            if let Err(e) = self.persist(loading).await {
                self.reset().await;
                yield Err(e);
                return;
            }

            let total = match self.index.page(PageRequest::count()).await.or_raise(|| EnumerateErrorKind::Index) {
                Ok(page) => self.limit(page.total_count),
                Err(e) => {
                    self.reset().await;
                    yield Err(e);
                    return;
                },
            };
            // Equal counts are taken to mean equal contents.
            if previous == Some(total) {
                tracing::info!(total, "Media index unchanged since last enumeration");
                let completed = EnumerationState { loading: LoadingState::Completed, ..self.state.get().clone() };
                if let Err(e) = self.persist(completed).await {
                    self.reset().await;
                    yield Err(e);
                    return;
                }
                yield Ok(EnumerateEvent::Unchanged { total });
                return;
            }

            let started = EnumerationState {
                permission,
                loading: LoadingState::Loading,
                total_count: Some(total),
                items: Vec::new(),
            };
            if let Err(e) = self.persist(started).await {
                self.reset().await;
                yield Err(e);
                return;
            }
            tracing::info!(total, "Enumerating media index");
            yield Ok(EnumerateEvent::Started { total });

            let mut total = total;
            let mut seen = HashSet::new();
            let mut cursor = None;
            while (self.state.get().items.len() as u64) < total {
                let request = PageRequest::new(self.options.page_size).after(cursor.take());
                let page = match self.index.page(request).await.or_raise(|| EnumerateErrorKind::Index) {
                    Ok(page) => page,
                    Err(e) => {
                        self.reset().await;
                        yield Err(e);
                        return;
                    },
                };
                // The latest count wins, even if it shrinks below what is already loaded.
                total = self.limit(page.total_count);
                let capacity = usize::try_from(total).unwrap_or(usize::MAX);
                let mut state = self.state.get().clone();
                state.total_count = Some(total);
                if state.items.len() > capacity {
                    tracing::debug!(loaded = state.items.len(), total, "Media index shrank during enumeration");
                    for dropped in state.items.drain(capacity..) {
                        seen.remove(&dropped.identifier);
                    }
                }
                if page.assets.is_empty() {
                    tracing::debug!("Media index returned an empty page");
                    if let Err(e) = self.persist(state).await {
                        self.reset().await;
                        yield Err(e);
                        return;
                    }
                    break;
                }

                let room = capacity.saturating_sub(state.items.len());
                let mut fresh: Vec<AssetRecord> =
                    page.assets.into_iter().filter(|asset| seen.insert(asset.identifier.clone())).collect();
                fresh.truncate(room);
                state.items.extend(fresh.iter().cloned());
                let loaded = state.items.len() as u64;
                if let Err(e) = self.persist(state).await {
                    self.reset().await;
                    yield Err(e);
                    return;
                }
                tracing::debug!(new = fresh.len(), loaded, total, "Enumerated page");
                yield Ok(EnumerateEvent::Batch { assets: fresh, loaded, total });

                cursor = page.end_cursor;
                if !page.has_next_page || cursor.is_none() {
                    break;
                }
            }

            let completed = EnumerationState {
                loading: LoadingState::Completed,
                total_count: Some(total),
                ..self.state.get().clone()
            };
            if let Err(e) = self.persist(completed).await {
                self.reset().await;
                yield Err(e);
                return;
            }
            tracing::info!(total, loaded = self.state.get().items.len(), "Enumeration complete");
            yield Ok(EnumerateEvent::Complete { total });
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MockIndex;
    use futures::StreamExt;
    use mipmap_store::{KeyValueStore, MemoryStore};
    use rstest::rstest;
    use std::sync::Arc;

    async fn enumerator(index: &Arc<MockIndex>, store: &Arc<MemoryStore>, options: EnumerateOptions) -> Enumerator {
        Enumerator::restore(index.clone(), store.clone(), options).await.unwrap()
    }

    async fn run(enumerator: &mut Enumerator) -> Vec<EnumerateEvent> {
        enumerator.enumerate().map(|event| event.unwrap()).collect().await
    }

    #[tokio::test]
    async fn test_enumerates_in_pages() {
        let index = Arc::new(MockIndex::with_count(120));
        let store = Arc::new(MemoryStore::default());
        let mut enumerator = enumerator(&index, &store, EnumerateOptions::default()).await;

        let events = run(&mut enumerator).await;
        assert_eq!(events.first(), Some(&EnumerateEvent::Started { total: 120 }));
        let loaded: Vec<u64> = events
            .iter()
            .filter_map(|e| match e {
                EnumerateEvent::Batch { loaded, .. } => Some(*loaded),
                _ => None,
            })
            .collect();
        assert_eq!(loaded, vec![50, 100, 120]);
        assert_eq!(events.last(), Some(&EnumerateEvent::Complete { total: 120 }));

        let state = enumerator.state();
        assert_eq!(state.loading, LoadingState::Completed);
        assert_eq!(state.permission, Permission::Granted);
        assert_eq!(state.total_count, Some(120));
        assert_eq!(state.items.len(), 120);
        assert_eq!(state.items[0].identifier, "mock://asset/0");
        assert_eq!(state.items[119].identifier, "mock://asset/119");

        // The state is mirrored to the store.
        let raw = store.get(STATE_KEY).await.unwrap().unwrap();
        let persisted: EnumerationState = serde_json::from_str(&raw).unwrap();
        assert_eq!(&persisted, state);
    }

    #[tokio::test]
    async fn test_unchanged_count_skips_paging() {
        let index = Arc::new(MockIndex::with_count(30));
        let store = Arc::new(MemoryStore::default());
        let mut enumerator = enumerator(&index, &store, EnumerateOptions::default()).await;
        run(&mut enumerator).await;
        let calls = index.page_calls();

        let events = run(&mut enumerator).await;
        assert_eq!(events, vec![EnumerateEvent::Unchanged { total: 30 }]);
        // Only the count request.
        assert_eq!(index.page_calls(), calls + 1);
        assert_eq!(enumerator.state().loading, LoadingState::Completed);
        assert_eq!(enumerator.state().items.len(), 30);
    }

    #[tokio::test]
    async fn test_changed_count_re_enumerates() {
        let index = Arc::new(MockIndex::with_count(30));
        let store = Arc::new(MemoryStore::default());
        let mut enumerator = enumerator(&index, &store, EnumerateOptions::default()).await;
        run(&mut enumerator).await;

        index.set_assets((0..31).map(|i| AssetRecord::new(format!("mock://asset/{i}"))));
        let events = run(&mut enumerator).await;
        assert_eq!(events.first(), Some(&EnumerateEvent::Started { total: 31 }));
        assert_eq!(enumerator.state().items.len(), 31);
    }

    #[rstest]
    #[case::denied(Permission::Denied)]
    #[case::undetermined(Permission::Undetermined)]
    #[tokio::test]
    async fn test_permission_denied(#[case] initial: Permission) {
        let index = Arc::new(MockIndex::with_count(10).with_permission(initial, false));
        let store = Arc::new(MemoryStore::default());
        let mut enumerator = enumerator(&index, &store, EnumerateOptions::default()).await;

        let events = run(&mut enumerator).await;
        assert_eq!(events, vec![EnumerateEvent::PermissionDenied]);
        assert_eq!(enumerator.state().permission, Permission::Denied);
        assert_eq!(enumerator.state().loading, LoadingState::Idle);
        assert_eq!(index.page_calls(), 0);
    }

    #[tokio::test]
    async fn test_permission_granted_on_request() {
        let index = Arc::new(MockIndex::with_count(10).with_permission(Permission::Undetermined, true));
        let store = Arc::new(MemoryStore::default());
        let mut enumerator = enumerator(&index, &store, EnumerateOptions::default()).await;

        let events = run(&mut enumerator).await;
        assert_eq!(events.last(), Some(&EnumerateEvent::Complete { total: 10 }));
        assert_eq!(enumerator.state().permission, Permission::Granted);
    }

    #[tokio::test]
    async fn test_failure_resets_state() {
        let index = Arc::new(MockIndex::with_count(120).failing_after(1));
        let store = Arc::new(MemoryStore::default());
        let mut enumerator = enumerator(&index, &store, EnumerateOptions::default()).await;

        let events: Vec<_> = enumerator.enumerate().collect().await;
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], Ok(EnumerateEvent::Started { total: 120 })));
        assert!(matches!(events[1], Ok(EnumerateEvent::Batch { loaded: 50, .. })));
        let err = events[2].as_ref().unwrap_err();
        assert!(matches!(&**err, LibraryErrorKind::Enumerate));

        let state = enumerator.state();
        assert_eq!(state.loading, LoadingState::Idle);
        assert_eq!(state.total_count, None);
        assert!(state.items.is_empty());
        assert_eq!(state.permission, Permission::Granted);
    }

    #[tokio::test]
    async fn test_max_assets_limit() {
        let index = Arc::new(MockIndex::with_count(120));
        let store = Arc::new(MemoryStore::default());
        let options = EnumerateOptions { page_size: 50, max_assets: Some(70) };
        let mut enumerator = enumerator(&index, &store, options).await;

        let events = run(&mut enumerator).await;
        assert_eq!(events.first(), Some(&EnumerateEvent::Started { total: 70 }));
        assert_eq!(events.last(), Some(&EnumerateEvent::Complete { total: 70 }));
        assert_eq!(enumerator.state().items.len(), 70);
    }

    #[rstest]
    #[case::grows_within_page(70, 70)]
    #[case::shrinks_below_loaded(30, 30)]
    #[tokio::test]
    async fn test_latest_total_wins(#[case] remaining: usize, #[case] expected: u64) {
        let index = Arc::new(MockIndex::with_count(120));
        let store = Arc::new(MemoryStore::default());
        let mut enumerator = enumerator(&index, &store, EnumerateOptions::default()).await;
        let mut rest = Vec::new();
        {
            let mut events = std::pin::pin!(enumerator.enumerate());
            assert_eq!(events.next().await.unwrap().unwrap(), EnumerateEvent::Started { total: 120 });
            assert!(matches!(
                events.next().await.unwrap().unwrap(),
                EnumerateEvent::Batch { loaded: 50, total: 120, .. }
            ));
            index.set_assets((0..remaining).map(|i| AssetRecord::new(format!("mock://asset/{i}"))));
            while let Some(event) = events.next().await {
                rest.push(event.unwrap());
            }
        }

        assert_eq!(rest.last(), Some(&EnumerateEvent::Complete { total: expected }));
        let state = enumerator.state();
        assert_eq!(state.total_count, Some(expected));
        assert_eq!(state.items.len() as u64, expected);
        assert_eq!(state.loading, LoadingState::Completed);
        let raw = store.get(STATE_KEY).await.unwrap().unwrap();
        let persisted: EnumerationState = serde_json::from_str(&raw).unwrap();
        assert_eq!(&persisted, state);
    }

    #[tokio::test]
    async fn test_duplicates_are_dropped() {
        let assets = ["a", "b", "a", "c"].map(|id| AssetRecord::new(format!("mock://{id}")));
        let index = Arc::new(MockIndex::new(assets));
        let store = Arc::new(MemoryStore::default());
        let options = EnumerateOptions { page_size: 2, max_assets: None };
        let mut enumerator = enumerator(&index, &store, options).await;

        run(&mut enumerator).await;
        let identifiers: Vec<_> = enumerator.state().items.iter().map(|a| a.identifier.as_str()).collect();
        assert_eq!(identifiers, vec!["mock://a", "mock://b", "mock://c"]);
        assert_eq!(enumerator.state().loading, LoadingState::Completed);
    }

    #[tokio::test]
    async fn test_empty_index() {
        let index = Arc::new(MockIndex::with_count(0));
        let store = Arc::new(MemoryStore::default());
        let mut enumerator = enumerator(&index, &store, EnumerateOptions::default()).await;

        let events = run(&mut enumerator).await;
        assert_eq!(events, vec![EnumerateEvent::Started { total: 0 }, EnumerateEvent::Complete { total: 0 }]);
        assert_eq!(index.page_calls(), 1);
    }

    #[tokio::test]
    async fn test_reload_ignored_while_loading() {
        let index = Arc::new(MockIndex::with_count(120));
        let store = Arc::new(MemoryStore::default());
        let mut enumerator = enumerator(&index, &store, EnumerateOptions::default()).await;
        {
            let mut events = std::pin::pin!(enumerator.enumerate());
            events.next().await.unwrap().unwrap();
            events.next().await.unwrap().unwrap();
            // Abandoned mid-enumeration.
        }
        assert!(enumerator.is_loading());
        assert!(enumerator.reload().is_none());
    }

    #[tokio::test]
    async fn test_restore_normalizes_loading() {
        let persisted = EnumerationState {
            permission: Permission::Granted,
            loading: LoadingState::Loading,
            total_count: Some(2),
            items: vec![AssetRecord::new("mock://a")],
        };
        let store = Arc::new(MemoryStore::with_entries([(STATE_KEY, serde_json::to_string(&persisted).unwrap())]));
        let index = Arc::new(MockIndex::with_count(2));
        let mut enumerator = enumerator(&index, &store, EnumerateOptions::default()).await;

        assert_eq!(enumerator.state().loading, LoadingState::Idle);
        assert_eq!(enumerator.state().items.len(), 1);
        assert!(enumerator.reload().is_some());
    }
}
