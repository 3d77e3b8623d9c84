//! Guess Adjudication
//!
//! Validates and records guesses, then lets the first correct one claim the
//! round. The protocol has two phases:
//!
//! 1. **Record** – every accepted guess on a still-active round is logged,
//!    including correct guesses that lose the race.
//! 2. **Claim** – conditional and exclusive. Only a guess whose
//!    `end_round_if_active` call succeeds becomes the winner and updates stats.
//!
//! Recording is itself guarded: a guess aimed at a round that closed after it
//! was read is rejected by the store, never written.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::core::clock::Clock;
use crate::game::error::GameError;
use crate::game::round::RoundManager;
use crate::game::scheduler::RoundScheduler;
use crate::game::state::{GuessFeedback, GuessResult, PlayerId};
use crate::game::stats::StatsAggregator;
use crate::store::{GuessInsert, RoundStore};
use crate::{TARGET_MAX, TARGET_MIN};

/// Validate a raw guess and narrow it to the target range.
pub fn validate_guess(guess_number: i64) -> Result<u8, GameError> {
    if (TARGET_MIN as i64..=TARGET_MAX as i64).contains(&guess_number) {
        Ok(guess_number as u8)
    } else {
        Err(GameError::InvalidGuess(guess_number))
    }
}

/// Decides the outcome of each guess.
pub struct GuessAdjudicator {
    store: Arc<dyn RoundStore>,
    rounds: Arc<RoundManager>,
    stats: Arc<StatsAggregator>,
    clock: Arc<dyn Clock>,
    scheduler: Option<Arc<RoundScheduler>>,
}

impl GuessAdjudicator {
    /// Create an adjudicator.
    pub fn new(
        store: Arc<dyn RoundStore>,
        rounds: Arc<RoundManager>,
        stats: Arc<StatsAggregator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { store, rounds, stats, clock, scheduler: None }
    }

    /// Restart `scheduler`'s countdown whenever a guess claims a round.
    pub fn with_scheduler(mut self, scheduler: Arc<RoundScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Adjudicate one guess.
    ///
    /// `round_ended` feedback covers both "no active round" and "already
    /// guessed this round"; the two are distinguished only in logs.
    #[instrument(skip(self))]
    pub async fn submit_guess(
        &self,
        player_id: PlayerId,
        guess_number: i64,
    ) -> Result<GuessResult, GameError> {
        let guess_number = validate_guess(guess_number)?;

        if self.store.get_player(player_id).await?.is_none() {
            return Err(GameError::PlayerNotFound(player_id));
        }

        let round = match self.rounds.active_round().await? {
            Some(round) => round,
            None => {
                debug!("No active round; guess from player {} rejected", player_id);
                return Ok(GuessResult::ROUND_ENDED);
            }
        };

        let now = self.clock.now();
        let guess = match self.store.record_guess(round.id, player_id, guess_number, now).await? {
            GuessInsert::Recorded(guess) => guess,
            GuessInsert::Duplicate => {
                debug!("Player {} already guessed in round {}", player_id, round.id);
                return Ok(GuessResult::ROUND_ENDED);
            }
            GuessInsert::RoundClosed => {
                debug!("Round {} closed before player {}'s guess was recorded", round.id, player_id);
                return Ok(GuessResult::ROUND_ENDED);
            }
        };

        let feedback = round.judge(guess_number);
        if feedback != GuessFeedback::Correct {
            return Ok(GuessResult::miss(feedback));
        }

        // A matching guess that was not the round's first correct one has
        // already lost; skip the claim.
        if !guess.is_correct {
            debug!("Player {} matched round {} after it was solved", player_id, round.id);
            return Ok(GuessResult::CORRECT_TOO_LATE);
        }

        if !self.rounds.end_round_if_active(round.id, player_id).await? {
            warn!("Round {} closed before player {} could claim it", round.id, player_id);
            return Ok(GuessResult::CORRECT_TOO_LATE);
        }

        // The round is over from here on, whatever happens to the stats update
        if let Some(scheduler) = &self.scheduler {
            scheduler.on_round_ended_by_win();
        }

        self.stats.on_win(player_id).await?;
        info!("Player {} won round {} with {}", player_id, round.id, guess_number);
        Ok(GuessResult::WON)
    }
}
