//! Game Events
//!
//! Lifecycle notifications published on a broadcast channel. Transport
//! sessions forward them to connected clients.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use tokio::sync::broadcast;

use crate::game::state::{PlayerId, RoundId};

/// Capacity of the event channel. Slow receivers drop the oldest events.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Why a round closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// A correct guess claimed it.
    Won,
    /// A new round started while it was still active.
    Superseded,
}

/// Round lifecycle event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    /// A round opened.
    RoundStarted {
        /// The new round.
        round_id: RoundId,
        /// When it opened.
        started_at: DateTime<Utc>,
    },

    /// A round closed.
    RoundEnded {
        /// The closed round.
        round_id: RoundId,
        /// Winner; `None` when superseded.
        winner_id: Option<PlayerId>,
        /// Revealed once the round is over.
        target_number: u8,
        /// When it closed.
        ended_at: DateTime<Utc>,
        /// Why it closed.
        reason: EndReason,
    },

    /// The scheduler armed its timer.
    NextRoundScheduled {
        /// Wall-clock time the timer fires.
        starts_at: DateTime<Utc>,
    },
}

/// Create the engine's event channel.
pub fn channel() -> broadcast::Sender<GameEvent> {
    let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    tx
}

/// Publish without caring whether anyone listens.
pub(crate) fn publish(tx: &broadcast::Sender<GameEvent>, event: GameEvent) {
    // Err only means there are no subscribers right now
    let _ = tx.send(event);
}
