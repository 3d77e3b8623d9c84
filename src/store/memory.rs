//! In-memory round storage.
//!
//! All state lives behind one async lock, so each trait method executes as a
//! single serialized unit. No lock is held across anything but in-memory work.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::game::state::{Guess, GuessId, Player, PlayerId, Round, RoundId, RoundSummary};
use crate::game::stats::leaderboard_order;
use crate::store::{GuessInsert, RoundStore, RoundSwap, StoreError};

/// In-memory [`RoundStore`].
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    players: BTreeMap<PlayerId, Player>,
    rounds: BTreeMap<RoundId, Round>,
    guesses: Vec<Guess>,
    /// Active round pointer. Always agrees with `Round::is_active`.
    active: Option<RoundId>,
    /// (round, player) pairs that already have a guess.
    guessed: BTreeSet<(RoundId, PlayerId)>,
    /// Rounds that already have their correct guess.
    solved: BTreeSet<RoundId>,
    next_player_id: i64,
    next_round_id: i64,
    next_guess_id: i64,
}

impl Inner {
    fn next_player_id(&mut self) -> PlayerId {
        self.next_player_id += 1;
        PlayerId(self.next_player_id)
    }

    fn next_round_id(&mut self) -> RoundId {
        self.next_round_id += 1;
        RoundId(self.next_round_id)
    }

    fn next_guess_id(&mut self) -> GuessId {
        self.next_guess_id += 1;
        GuessId(self.next_guess_id)
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self { inner: RwLock::new(Inner::default()) }
    }

    /// Number of rounds currently flagged active.
    pub async fn active_round_count(&self) -> usize {
        let inner = self.inner.read().await;
        inner.rounds.values().filter(|r| r.is_active).count()
    }

    /// Total rounds ever started.
    pub async fn round_count(&self) -> usize {
        self.inner.read().await.rounds.len()
    }

    /// Total guesses ever recorded.
    pub async fn guess_count(&self) -> usize {
        self.inner.read().await.guesses.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoundStore for MemoryStore {
    async fn create_player(
        &self,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Player, StoreError> {
        let mut inner = self.inner.write().await;

        if inner.players.values().any(|p| p.display_name == display_name) {
            return Err(StoreError::DuplicateName(display_name.to_string()));
        }

        let id = inner.next_player_id();
        let player = Player::new(id, display_name, now);
        inner.players.insert(id, player.clone());
        Ok(player)
    }

    async fn get_player(&self, id: PlayerId) -> Result<Option<Player>, StoreError> {
        Ok(self.inner.read().await.players.get(&id).cloned())
    }

    async fn leaderboard(&self) -> Result<Vec<Player>, StoreError> {
        let inner = self.inner.read().await;
        let mut players: Vec<Player> = inner.players.values().cloned().collect();
        players.sort_by(leaderboard_order);
        Ok(players)
    }

    async fn active_round(&self) -> Result<Option<Round>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.active.and_then(|id| inner.rounds.get(&id).cloned()))
    }

    async fn get_round(&self, id: RoundId) -> Result<Option<Round>, StoreError> {
        Ok(self.inner.read().await.rounds.get(&id).cloned())
    }

    async fn start_round(&self, target_number: u8, now: DateTime<Utc>) -> Result<RoundSwap, StoreError> {
        let mut inner = self.inner.write().await;

        let superseded = match inner.active.take() {
            Some(id) => {
                let round = inner.rounds.get_mut(&id).ok_or(StoreError::RoundNotFound(id))?;
                round.close(None, now);
                Some(round.clone())
            }
            None => None,
        };

        let id = inner.next_round_id();
        let started = Round::open(id, target_number, now);
        inner.rounds.insert(id, started.clone());
        inner.active = Some(id);

        Ok(RoundSwap { started, superseded })
    }

    async fn end_round_if_active(
        &self,
        round_id: RoundId,
        winner_id: Option<PlayerId>,
        now: DateTime<Utc>,
    ) -> Result<Option<Round>, StoreError> {
        let mut inner = self.inner.write().await;

        let round = inner.rounds.get_mut(&round_id).ok_or(StoreError::RoundNotFound(round_id))?;
        if !round.close(winner_id, now) {
            return Ok(None);
        }
        let closed = round.clone();

        if inner.active == Some(round_id) {
            inner.active = None;
        }
        Ok(Some(closed))
    }

    async fn record_guess(
        &self,
        round_id: RoundId,
        player_id: PlayerId,
        guess_number: u8,
        now: DateTime<Utc>,
    ) -> Result<GuessInsert, StoreError> {
        let mut inner = self.inner.write().await;

        if inner.guessed.contains(&(round_id, player_id)) {
            return Ok(GuessInsert::Duplicate);
        }

        let round = inner.rounds.get(&round_id).ok_or(StoreError::RoundNotFound(round_id))?;
        if !round.is_active {
            return Ok(GuessInsert::RoundClosed);
        }
        let is_correct = round.target_number == guess_number && !inner.solved.contains(&round_id);

        let id = inner.next_guess_id();
        let guess = Guess {
            id,
            round_id,
            player_id,
            guess_number,
            is_correct,
            created_at: now,
        };

        inner.guesses.push(guess.clone());
        inner.guessed.insert((round_id, player_id));
        if is_correct {
            inner.solved.insert(round_id);
        }
        if let Some(round) = inner.rounds.get_mut(&round_id) {
            round.total_guesses += 1;
        }

        Ok(GuessInsert::Recorded(guess))
    }

    async fn guesses_for_round(&self, round_id: RoundId) -> Result<Vec<Guess>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.guesses.iter()
            .filter(|g| g.round_id == round_id)
            .cloned()
            .collect())
    }

    async fn apply_win(&self, winner_id: PlayerId) -> Result<Player, StoreError> {
        let mut inner = self.inner.write().await;

        if !inner.players.contains_key(&winner_id) {
            return Err(StoreError::PlayerNotFound(winner_id));
        }

        for (id, player) in inner.players.iter_mut() {
            if *id == winner_id {
                player.total_wins += 1;
                player.total_attempts += 1;
                player.current_streak += 1;
            } else {
                player.current_streak = 0;
            }
        }

        inner.players.get(&winner_id).cloned().ok_or(StoreError::PlayerNotFound(winner_id))
    }

    async fn recent_rounds(&self, limit: usize) -> Result<Vec<RoundSummary>, StoreError> {
        let inner = self.inner.read().await;

        let mut ended: Vec<&Round> = inner.rounds.values()
            .filter(|r| !r.is_active && r.ended_at.is_some())
            .collect();
        // Newest first; later rounds win ties on equal timestamps
        ended.sort_by(|a, b| b.ended_at.cmp(&a.ended_at).then(b.id.cmp(&a.id)));

        Ok(ended.into_iter()
            .take(limit)
            .map(|round| RoundSummary {
                round: round.clone(),
                winner_name: round.winner_id
                    .and_then(|id| inner.players.get(&id))
                    .map(|p| p.display_name.clone()),
            })
            .collect())
    }
}
