use crate::state::ErrorValue;
use futures::task::SpawnError;
use thiserror::Error;

/// Errors surfaced when converting a derivable's state into a plain value.
#[derive(Debug, Error)]
pub enum ReactiveError {
    /// The derivable has no value yet.
    #[error("derivable is unresolved")]
    Unresolved,

    /// The derivable is in an errored state.
    #[error("derivable errored: {0}")]
    Errored(ErrorValue),

    /// A one-shot producer could not be spawned on the executor.
    #[error("failed to spawn producer: {0}")]
    Spawn(#[from] SpawnError),
}

impl ReactiveError {
    /// Returns `true` for [`ReactiveError::Unresolved`].
    pub fn is_unresolved(&self) -> bool {
        matches!(self, ReactiveError::Unresolved)
    }
}
