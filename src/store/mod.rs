//! Round Storage
//!
//! The [`RoundStore`] trait is the durable record of players, rounds and
//! guesses. Every method is one atomic unit: implementations must never let a
//! caller observe or act on a half-applied transition.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::game::state::{Guess, Player, PlayerId, Round, RoundId, RoundSummary};

pub use memory::MemoryStore;

#[cfg(test)]
pub(crate) mod testing;

/// Storage errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Display name already registered.
    #[error("display name already taken: {0}")]
    DuplicateName(String),

    /// Player not found.
    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),

    /// Round not found.
    #[error("round {0} not found")]
    RoundNotFound(RoundId),

    /// Backend could not serve the request.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Result of starting a round.
#[derive(Debug, Clone)]
pub struct RoundSwap {
    /// The newly opened round.
    pub started: Round,
    /// The round that was still active and got closed, if any.
    pub superseded: Option<Round>,
}

/// Result of a guarded guess insert.
#[derive(Debug, Clone)]
pub enum GuessInsert {
    /// Guess recorded and the round's guess counter incremented.
    Recorded(Guess),
    /// The player already has a guess in this round; nothing written.
    Duplicate,
    /// The round is no longer active; nothing written.
    RoundClosed,
}

/// Storage backend for the round engine.
#[async_trait]
pub trait RoundStore: Send + Sync {
    /// Insert a player with zeroed stats. Fails with `DuplicateName` before writing.
    async fn create_player(
        &self,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Player, StoreError>;

    /// Look up a player.
    async fn get_player(&self, id: PlayerId) -> Result<Option<Player>, StoreError>;

    /// All players ranked by wins desc, then streak desc.
    async fn leaderboard(&self) -> Result<Vec<Player>, StoreError>;

    /// The currently active round, if any.
    async fn active_round(&self) -> Result<Option<Round>, StoreError>;

    /// Look up a round.
    async fn get_round(&self, id: RoundId) -> Result<Option<Round>, StoreError>;

    /// Close any active round at `now` and open a new one, as one atomic unit.
    async fn start_round(&self, target_number: u8, now: DateTime<Utc>) -> Result<RoundSwap, StoreError>;

    /// Close `round_id` with `winner_id` only if it is still active.
    ///
    /// Returns the closed round if this call performed the transition.
    async fn end_round_if_active(
        &self,
        round_id: RoundId,
        winner_id: Option<PlayerId>,
        now: DateTime<Utc>,
    ) -> Result<Option<Round>, StoreError>;

    /// Record a guess if the round is still active and the player has not
    /// guessed in it yet.
    ///
    /// `is_correct` is set only for the first guess matching the target.
    async fn record_guess(
        &self,
        round_id: RoundId,
        player_id: PlayerId,
        guess_number: u8,
        now: DateTime<Utc>,
    ) -> Result<GuessInsert, StoreError>;

    /// Guesses recorded for a round, in insertion order.
    async fn guesses_for_round(&self, round_id: RoundId) -> Result<Vec<Guess>, StoreError>;

    /// Apply a win: winner wins/attempts/streak +1, every other streak reset.
    ///
    /// Returns the winner's updated record.
    async fn apply_win(&self, winner_id: PlayerId) -> Result<Player, StoreError>;

    /// Up to `limit` ended rounds, newest `ended_at` first, with winner names.
    async fn recent_rounds(&self, limit: usize) -> Result<Vec<RoundSummary>, StoreError>;
}
