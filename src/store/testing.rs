//! Fault-injecting store wrapper for tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::game::state::{Guess, Player, PlayerId, Round, RoundId, RoundSummary};
use crate::store::{GuessInsert, MemoryStore, RoundStore, RoundSwap, StoreError};

/// Delegates to a [`MemoryStore`] unless a fault is armed.
#[derive(Default)]
pub(crate) struct FlakyStore {
    pub inner: MemoryStore,
    /// Number of upcoming `start_round` calls that fail.
    pub start_failures: AtomicUsize,
    /// `get_round` fails while set.
    pub fail_get_round: AtomicBool,
    /// `apply_win` fails while set.
    pub fail_apply_win: AtomicBool,
    /// The next `active_round` read is followed by a new round starting.
    pub supersede_after_read: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_starts(count: usize) -> Self {
        Self { start_failures: AtomicUsize::new(count), ..Self::default() }
    }

    fn injected(what: &str) -> StoreError {
        StoreError::Unavailable(format!("injected {what} failure"))
    }
}

#[async_trait]
impl RoundStore for FlakyStore {
    async fn create_player(&self, name: &str, now: DateTime<Utc>) -> Result<Player, StoreError> {
        self.inner.create_player(name, now).await
    }

    async fn get_player(&self, id: PlayerId) -> Result<Option<Player>, StoreError> {
        self.inner.get_player(id).await
    }

    async fn leaderboard(&self) -> Result<Vec<Player>, StoreError> {
        self.inner.leaderboard().await
    }

    async fn active_round(&self) -> Result<Option<Round>, StoreError> {
        let round = self.inner.active_round().await?;
        if let Some(current) = &round {
            if self.supersede_after_read.swap(false, Ordering::SeqCst) {
                self.inner.start_round(current.target_number, current.started_at).await?;
            }
        }
        Ok(round)
    }

    async fn get_round(&self, id: RoundId) -> Result<Option<Round>, StoreError> {
        if self.fail_get_round.load(Ordering::SeqCst) {
            return Err(Self::injected("get_round"));
        }
        self.inner.get_round(id).await
    }

    async fn start_round(&self, target: u8, now: DateTime<Utc>) -> Result<RoundSwap, StoreError> {
        let failed = self.start_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(Self::injected("start_round"));
        }
        self.inner.start_round(target, now).await
    }

    async fn end_round_if_active(
        &self,
        round_id: RoundId,
        winner_id: Option<PlayerId>,
        now: DateTime<Utc>,
    ) -> Result<Option<Round>, StoreError> {
        self.inner.end_round_if_active(round_id, winner_id, now).await
    }

    async fn record_guess(
        &self,
        round_id: RoundId,
        player_id: PlayerId,
        guess_number: u8,
        now: DateTime<Utc>,
    ) -> Result<GuessInsert, StoreError> {
        self.inner.record_guess(round_id, player_id, guess_number, now).await
    }

    async fn guesses_for_round(&self, round_id: RoundId) -> Result<Vec<Guess>, StoreError> {
        self.inner.guesses_for_round(round_id).await
    }

    async fn apply_win(&self, winner_id: PlayerId) -> Result<Player, StoreError> {
        if self.fail_apply_win.load(Ordering::SeqCst) {
            return Err(Self::injected("apply_win"));
        }
        self.inner.apply_win(winner_id).await
    }

    async fn recent_rounds(&self, limit: usize) -> Result<Vec<RoundSummary>, StoreError> {
        self.inner.recent_rounds(limit).await
    }
}
