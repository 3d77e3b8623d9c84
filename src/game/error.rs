//! Engine errors.

use thiserror::Error;

use crate::game::state::PlayerId;
use crate::store::StoreError;

/// Errors surfaced by engine operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// Guess outside `[1, 100]`.
    #[error("guess {0} is outside 1..=100")]
    InvalidGuess(i64),

    /// Display name empty or too long after trimming.
    #[error("invalid display name: {0}")]
    InvalidDisplayName(String),

    /// Display name already registered.
    #[error("display name already taken: {0}")]
    DuplicateName(String),

    /// Unknown player.
    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),

    /// Storage failure, propagated unmodified.
    #[error("storage failure: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for GameError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateName(name) => GameError::DuplicateName(name),
            StoreError::PlayerNotFound(id) => GameError::PlayerNotFound(id),
            other => GameError::Storage(other),
        }
    }
}
