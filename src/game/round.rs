//! Round Lifecycle
//!
//! [`RoundManager`] owns the answer to "which round is active" and performs
//! the two transitions that change it. Both are delegated to atomic store
//! operations; the manager never reads a round and then writes it back.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, instrument};

use crate::core::clock::Clock;
use crate::core::rng::TargetSource;
use crate::game::events::{self, EndReason, GameEvent};
use crate::game::state::{PlayerId, Round, RoundId};
use crate::store::{RoundStore, StoreError};

/// Starts and ends rounds.
pub struct RoundManager {
    store: Arc<dyn RoundStore>,
    clock: Arc<dyn Clock>,
    targets: Arc<dyn TargetSource>,
    events: broadcast::Sender<GameEvent>,
}

impl RoundManager {
    /// Create a manager over a store.
    pub fn new(
        store: Arc<dyn RoundStore>,
        clock: Arc<dyn Clock>,
        targets: Arc<dyn TargetSource>,
        events: broadcast::Sender<GameEvent>,
    ) -> Self {
        Self { store, clock, targets, events }
    }

    /// The active round, if any.
    pub async fn active_round(&self) -> Result<Option<Round>, StoreError> {
        self.store.active_round().await
    }

    /// Close whatever round is active and open a fresh one.
    ///
    /// Safe under concurrent callers: the store swaps the active round in one
    /// atomic step, so two simultaneous starts leave exactly one round active.
    #[instrument(skip(self))]
    pub async fn start_round(&self) -> Result<Round, StoreError> {
        let target = self.targets.next_target();
        let now = self.clock.now();
        let swap = self.store.start_round(target, now).await?;

        if let Some(closed) = swap.superseded {
            info!("Round {} superseded without a winner", closed.id);
            events::publish(&self.events, GameEvent::RoundEnded {
                round_id: closed.id,
                winner_id: None,
                target_number: closed.target_number,
                ended_at: closed.ended_at.unwrap_or(now),
                reason: EndReason::Superseded,
            });
        }

        info!("Round {} started", swap.started.id);
        events::publish(&self.events, GameEvent::RoundStarted {
            round_id: swap.started.id,
            started_at: swap.started.started_at,
        });

        Ok(swap.started)
    }

    /// Claim `round_id` for `winner_id` if it is still active.
    ///
    /// Returns whether this call closed the round. At most one call per round
    /// ever returns true.
    #[instrument(skip(self))]
    pub async fn end_round_if_active(
        &self,
        round_id: RoundId,
        winner_id: PlayerId,
    ) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let Some(closed) = self.store.end_round_if_active(round_id, Some(winner_id), now).await? else {
            debug!("Round {} already closed; claim by player {} rejected", round_id, winner_id);
            return Ok(false);
        };

        info!("Round {} won by player {}", round_id, winner_id);
        events::publish(&self.events, GameEvent::RoundEnded {
            round_id,
            winner_id: Some(winner_id),
            target_number: closed.target_number,
            ended_at: closed.ended_at.unwrap_or(now),
            reason: EndReason::Won,
        });

        Ok(true)
    }
}
