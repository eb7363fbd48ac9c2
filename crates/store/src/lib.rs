//! Durable key-value state for mipmap.
//!
//! Everything the core needs to remember between runs (the last enumeration
//! of the media index, and which derived artifact belongs to which asset at
//! which width) is stored as plain strings under string keys. This crate
//! provides that capability and nothing more.
//!
//! # Architecture
//! - [`KeyValueStore`]: the capability trait. Every store is scoped to a
//!   single namespace; clearing one namespace never touches another.
//! - [`Database`]: the SQLite connection pool. Hands out [`SqliteStore`]
//!   values for individual namespaces.
//! - [`PersistedState`]: a typed value that is restored from a store on
//!   construction and written back (as JSON) on every change.

pub mod backend;
mod db;
pub mod error;
mod persisted;

#[cfg(any(test, feature = "mock"))]
pub use crate::backend::MemoryStore;
pub use crate::backend::{KeyValueStore, SqliteStore};
pub use crate::db::Database;
pub use crate::persisted::PersistedState;
use std::sync::Arc;

pub type StoreHandle = Arc<dyn KeyValueStore + Send + Sync>;

/// Namespace holding application state (see [`PersistedState`]).
pub const STATE_NAMESPACE: &str = "persisted-state";
/// Namespace holding the artifact cache mappings.
pub const CACHE_NAMESPACE: &str = "photos-cache";
