//! Core of mipmap: enumerating a media index and reconciling a cache of
//! size-normalized artifacts against it.
//!
//! # Architecture
//! - [`index`]: the [`MediaIndex`] capability, implemented outside this crate.
//! - [`enumerate`]: the [`Enumerator`](enumerate::Enumerator), paging through
//!   the index into a persisted [`EnumerationState`](enumerate::EnumerationState).
//! - [`generate`]: the [`ArtifactGenerator`] capability, implemented outside
//!   this crate.
//! - [`reconcile`]: the [`Reconciler`](reconcile::Reconciler), the only thing
//!   that mutates the artifact cache.
//! - [`Gallery`]: ties the above together for callers that only care about
//!   the resulting state.

pub mod enumerate;
pub mod error;
mod gallery;
pub mod generate;
pub mod index;
pub mod reconcile;

pub use crate::gallery::Gallery;
pub use crate::generate::ArtifactGenerator;
pub use crate::index::MediaIndex;
use std::sync::Arc;

pub type IndexHandle = Arc<dyn MediaIndex + Send + Sync>;
pub type GeneratorHandle = Arc<dyn ArtifactGenerator + Send + Sync>;
