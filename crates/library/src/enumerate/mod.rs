//! Permission-gated, batched enumeration of the media index.
//!
//! The primary entry point is [`Enumerator::enumerate`], which streams
//! [`EnumerateEvent`]s while paging through a [`MediaIndex`](crate::MediaIndex)
//! and mirrors everything it learns into a persisted [`EnumerationState`].
//!
//! A fresh enumeration always starts from the beginning of the index; page
//! cursors live only as long as the stream.

pub mod error;
mod state;
mod stream;

pub use self::state::{EnumerationState, LoadingState};
pub use self::stream::{DEFAULT_PAGE_SIZE, EnumerateEvent, EnumerateOptions, Enumerator, STATE_KEY};
