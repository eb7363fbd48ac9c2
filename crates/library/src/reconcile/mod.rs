//! Reconciling the artifact cache against the current asset list.
//!
//! Given the assets and a target width, [`Reconciler::reconcile`] either
//! restores the complete artifact set from the cache in one go, or works
//! through the assets in bounded batches, generating whatever is missing.
//! A partial set is never published.

pub mod error;
mod state;
mod stream;

pub use self::state::{ReconcileProgress, ReconcileState};
pub use self::stream::{DEFAULT_BATCH_SIZE, ReconcileEvent, Reconciler};
