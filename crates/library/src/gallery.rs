use crate::enumerate::{EnumerateEvent, EnumerationState, Enumerator, LoadingState};
use crate::error::Result as LibraryResult;
use crate::reconcile::{ReconcileEvent, ReconcileProgress, ReconcileState, Reconciler};
use futures::{Stream, StreamExt};
use mipmap_cache::{ArtifactCache, CachedArtifact, TargetWidth};
use mipmap_progress::{PerformanceLog, ProgressObserver, ProgressUpdate};
use std::pin::pin;

/// The media gallery as seen from above: what is in the index, and whether
/// an artifact exists for every item at the current width.
///
/// Failures are logged and reflected in state rather than returned: a failed
/// enumeration leaves [`enumeration`](Self::enumeration) idle and empty, a
/// failed reconciliation leaves [`reconciliation_state`](Self::reconciliation_state)
/// calculating. The most recent failure is kept in [`last_error`](Self::last_error).
pub struct Gallery {
    enumerator: Enumerator,
    reconciler: Reconciler,
    performance: PerformanceLog,
    started: bool,
    last_error: Option<String>,
}

impl Gallery {
    pub fn new(enumerator: Enumerator, reconciler: Reconciler) -> Self {
        Self { enumerator, reconciler, performance: PerformanceLog::new(), started: false, last_error: None }
    }

    /// Enumerate the index, but only the first time this is called.
    ///
    /// Returns `false` (doing nothing) on every later call.
    pub async fn start(&mut self, observer: &dyn ProgressObserver) -> bool {
        if self.started {
            tracing::debug!("Gallery already started");
            return false;
        }
        self.started = true;
        self.enumerate(observer).await;
        true
    }

    /// Re-enumerate the index. Returns `false` if an enumeration is already in progress.
    pub async fn reload(&mut self, observer: &dyn ProgressObserver) -> bool {
        if self.enumerator.is_loading() {
            tracing::debug!("Enumeration already in progress; ignoring reload");
            return false;
        }
        self.enumerate(observer).await;
        true
    }

    /// Resolve artifacts for the current items at `width`.
    pub async fn reconcile(&mut self, width: TargetWidth, observer: &dyn ProgressObserver) -> ReconcileState {
        let Self { enumerator, reconciler, performance, last_error, .. } = self;
        let assets = &enumerator.state().items;
        let result = performance
            .measure(format!("reconcile, {} assets, width {width}", assets.len()), async {
                drive_reconcile(reconciler.reconcile(assets, width), observer).await
            })
            .await;
        Self::record(last_error, "Reconciliation", result);
        reconciler.state()
    }

    /// Wipe the cache, then resolve artifacts for the current items at `width`.
    pub async fn recalculate(&mut self, width: TargetWidth, observer: &dyn ProgressObserver) -> ReconcileState {
        let Self { enumerator, reconciler, performance, last_error, .. } = self;
        let assets = &enumerator.state().items;
        let result = performance
            .measure(format!("recalculate, {} assets, width {width}", assets.len()), async {
                drive_reconcile(reconciler.recalculate(assets, width), observer).await
            })
            .await;
        Self::record(last_error, "Recalculation", result);
        reconciler.state()
    }

    /// Wipe the artifact cache at every width.
    pub async fn clear(&mut self) -> LibraryResult<()> {
        self.reconciler.clear().await
    }

    pub fn enumeration(&self) -> &EnumerationState {
        self.enumerator.state()
    }

    pub fn reconciliation_state(&self) -> ReconcileState {
        self.reconciler.state()
    }

    pub fn reconciliation_progress(&self) -> ReconcileProgress {
        self.reconciler.progress()
    }

    /// The complete artifact set, or nothing.
    pub fn reconciliation(&self) -> &[CachedArtifact] {
        self.reconciler.artifacts()
    }

    pub fn cache(&self) -> &ArtifactCache {
        self.reconciler.cache()
    }

    pub fn performance(&self) -> &PerformanceLog {
        &self.performance
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    async fn enumerate(&mut self, observer: &dyn ProgressObserver) {
        let Self { enumerator, performance, last_error, .. } = self;
        let result = performance.measure("enumerate", drive_enumerate(enumerator, observer)).await;
        Self::record(last_error, "Enumeration", result);
    }

    fn record(last_error: &mut Option<String>, operation: &str, result: LibraryResult<()>) {
        match result {
            Ok(()) => *last_error = None,
            Err(e) => {
                tracing::error!(error = ?e, "{operation} failed");
                *last_error = Some(format!("{operation} failed: {e}"));
            },
        }
    }
}

async fn drive_enumerate(enumerator: &mut Enumerator, observer: &dyn ProgressObserver) -> LibraryResult<()> {
    let loading = LoadingState::Loading.to_string();
    let completed = LoadingState::Completed.to_string();
    let mut loaded = 0;
    let mut events = pin!(enumerator.enumerate());
    while let Some(event) = events.next().await {
        match event? {
            EnumerateEvent::PermissionDenied => tracing::warn!("Permission to read the media index was denied"),
            EnumerateEvent::Unchanged { total } => {
                observer.on_progress(&ProgressUpdate { current: total, total, label: &completed });
            },
            EnumerateEvent::Started { total } => {
                observer.on_progress(&ProgressUpdate { current: 0, total, label: &loading });
            },
            EnumerateEvent::Batch { loaded: now, total, .. } => {
                loaded = now;
                observer.on_progress(&ProgressUpdate { current: loaded, total, label: &loading });
            },
            EnumerateEvent::Complete { total } => {
                observer.on_progress(&ProgressUpdate { current: loaded, total, label: &completed });
            },
        }
    }
    Ok(())
}

async fn drive_reconcile(
    events: impl Stream<Item = LibraryResult<ReconcileEvent>>,
    observer: &dyn ProgressObserver,
) -> LibraryResult<()> {
    let mut events = pin!(events);
    while let Some(event) = events.next().await {
        let (current, total, state) = match event? {
            ReconcileEvent::Restored { count } => (0, count, ReconcileState::RestoringFromCache),
            ReconcileEvent::Calculating { total } => (0, total, ReconcileState::Calculating),
            ReconcileEvent::Progress { current, total } => (current, total, ReconcileState::Calculating),
            ReconcileEvent::Ready { count } => (count, count, ReconcileState::Ready),
        };
        let label = state.to_string();
        observer.on_progress(&ProgressUpdate { current, total, label: &label });
    }
    Ok(())
}
