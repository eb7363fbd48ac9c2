use crate::index::Permission;
use derive_more::Display;
use mipmap_cache::AssetRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadingState {
    #[default]
    #[display("IDLE")]
    Idle,
    #[display("LOADING")]
    Loading,
    #[display("COMPLETED")]
    Completed,
}

/// What is known about the media index, persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumerationState {
    pub permission: Permission,
    pub loading: LoadingState,
    pub total_count: Option<u64>,
    pub items: Vec<AssetRecord>,
}

impl EnumerationState {
    pub fn is_loading(&self) -> bool {
        self.loading == LoadingState::Loading
    }

    /// The total count of the last enumeration that ran to completion.
    pub fn completed_count(&self) -> Option<u64> {
        self.total_count.filter(|_| self.loading == LoadingState::Completed)
    }

    /// State as it should be resumed in a new process.
    ///
    /// A persisted `LOADING` belongs to a process that stopped mid-enumeration;
    /// nothing is loading any more, so it becomes `IDLE`.
    pub(crate) fn resumed(mut self) -> Self {
        if self.loading == LoadingState::Loading {
            self.loading = LoadingState::Idle;
        }
        self
    }
}
