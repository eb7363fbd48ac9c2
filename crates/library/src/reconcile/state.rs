use derive_more::Display;

/// Where a [`Reconciler`](super::Reconciler) is in resolving the artifact set.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ReconcileState {
    #[default]
    #[display("IDLE")]
    Idle,
    #[display("CALCULATING")]
    Calculating,
    #[display("RESTORING_FROM_CACHE")]
    RestoringFromCache,
    #[display("READY")]
    Ready,
}

/// Assets resolved so far out of the current asset list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileProgress {
    pub current: u64,
    pub total: u64,
}
