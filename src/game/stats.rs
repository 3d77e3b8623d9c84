//! Player Statistics
//!
//! Win bookkeeping and leaderboard ranking.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::game::state::{Player, PlayerId};
use crate::store::{RoundStore, StoreError};

/// Leaderboard ranking: wins desc, then streak desc, then oldest id first.
pub fn leaderboard_order(a: &Player, b: &Player) -> Ordering {
    b.total_wins.cmp(&a.total_wins)
        .then(b.current_streak.cmp(&a.current_streak))
        .then(a.id.cmp(&b.id))
}

/// Updates player counters when a round is won.
pub struct StatsAggregator {
    store: Arc<dyn RoundStore>,
}

impl StatsAggregator {
    /// Create an aggregator over a store.
    pub fn new(store: Arc<dyn RoundStore>) -> Self {
        Self { store }
    }

    /// Credit a win to `winner_id` and break every other player's streak.
    ///
    /// Must be called exactly once per won round; the caller guarantees this
    /// by only invoking it after a successful round claim. Only the win path
    /// counts toward `total_attempts`.
    #[instrument(skip(self))]
    pub async fn on_win(&self, winner_id: PlayerId) -> Result<Player, StoreError> {
        let winner = self.store.apply_win(winner_id).await?;
        info!(
            "Player {} ({}) now has {} wins, streak {}",
            winner.id, winner.display_name, winner.total_wins, winner.current_streak,
        );
        Ok(winner)
    }
}
