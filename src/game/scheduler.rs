//! Round Scheduler
//!
//! Keeps the game moving without operator input. A single timer is pending
//! at any time; arming a new one aborts the previous one.
//!
//! ```text
//!   arm ──round_delay──► fire ──start_round──┬─ ok ──► arm
//!    ▲                                       └─ err ─► retry ──retry_delay──┐
//!    └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Timers carry a generation number. A timer whose generation is stale when
//! it wakes (because something re-armed or cancelled in the meantime) does
//! nothing.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, instrument, warn};

use crate::core::clock::Clock;
use crate::game::events::{self, GameEvent};
use crate::game::round::RoundManager;
use crate::game::state::Round;
use crate::store::StoreError;

#[derive(Default)]
struct SchedulerState {
    /// Deadline of the round timer.
    next_round_at: Option<Instant>,
    pending: Option<JoinHandle<()>>,
    generation: u64,
}

impl SchedulerState {
    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        self.generation += 1;
    }
}

/// Starts rounds on a fixed delay.
pub struct RoundScheduler {
    rounds: Arc<RoundManager>,
    clock: Arc<dyn Clock>,
    round_delay: Duration,
    retry_delay: Duration,
    events: broadcast::Sender<GameEvent>,
    state: Mutex<SchedulerState>,
}

impl RoundScheduler {
    /// Create an unarmed scheduler.
    pub fn new(
        rounds: Arc<RoundManager>,
        clock: Arc<dyn Clock>,
        round_delay: Duration,
        retry_delay: Duration,
        events: broadcast::Sender<GameEvent>,
    ) -> Self {
        Self {
            rounds,
            clock,
            round_delay,
            retry_delay,
            events,
            state: Mutex::new(SchedulerState::default()),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SchedulerState> {
        // Nothing in the critical sections can leave the state half-written
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace any pending timer with one that starts a round after
    /// `round_delay`.
    #[instrument(skip(self))]
    pub fn schedule_next_round(self: &Arc<Self>) {
        let mut state = self.lock_state();
        self.arm_locked(&mut state);
    }

    /// A round was won; restart the countdown.
    pub fn on_round_ended_by_win(self: &Arc<Self>) {
        debug!("Round won; rescheduling");
        self.schedule_next_round();
    }

    /// Manual start: cancel the timer, start a round now, then re-arm.
    ///
    /// The timer is re-armed even when the start fails so the cycle keeps
    /// running.
    #[instrument(skip(self))]
    pub async fn cancel_and_reschedule(self: &Arc<Self>) -> Result<Round, StoreError> {
        self.lock_state().cancel_pending();

        let result = self.rounds.start_round().await;
        if let Err(err) = &result {
            warn!("Manual round start failed: {}", err);
        }

        let mut state = self.lock_state();
        self.arm_locked(&mut state);
        result
    }

    /// Whole seconds until the timer fires, rounded up. `Some(0)` once the
    /// deadline has passed, `None` if nothing was ever scheduled.
    pub fn time_until_next_round(&self) -> Option<u64> {
        let deadline = self.lock_state().next_round_at?;
        let remaining = deadline.saturating_duration_since(Instant::now());
        Some(remaining.as_millis().div_ceil(1000) as u64)
    }

    /// Cancel the pending timer and forget the deadline.
    pub fn shutdown(&self) {
        let mut state = self.lock_state();
        state.cancel_pending();
        state.next_round_at = None;
        info!("Round scheduler stopped");
    }

    fn arm_locked(self: &Arc<Self>, state: &mut SchedulerState) {
        state.cancel_pending();
        let generation = state.generation;

        let deadline = Instant::now() + self.round_delay;
        let starts_at = self.clock.now()
            + chrono::Duration::from_std(self.round_delay).unwrap_or_else(|_| chrono::Duration::zero());
        state.next_round_at = Some(deadline);

        let this = Arc::clone(self);
        state.pending = Some(tokio::spawn(async move {
            sleep_until(deadline).await;
            this.fire(generation).await;
        }));

        debug!("Next round at {} (generation {})", starts_at, generation);
        events::publish(&self.events, GameEvent::NextRoundScheduled { starts_at });
    }

    /// Try again after `retry_delay`. The old deadline stays in place.
    fn arm_retry_locked(self: &Arc<Self>, state: &mut SchedulerState) {
        state.cancel_pending();
        let generation = state.generation;

        let this = Arc::clone(self);
        let retry_delay = self.retry_delay;
        state.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(retry_delay).await;
            let mut state = this.lock_state();
            if state.generation == generation {
                state.pending.take();
                this.arm_locked(&mut state);
            }
        }));
    }

    async fn fire(self: Arc<Self>, generation: u64) {
        {
            let mut state = self.lock_state();
            if state.generation != generation {
                return;
            }
            // This task is the pending one; drop its handle instead of aborting itself
            state.pending.take();
        }

        match self.rounds.start_round().await {
            Ok(round) => {
                debug!("Scheduled start opened round {}", round.id);
                let mut state = self.lock_state();
                if state.generation == generation {
                    self.arm_locked(&mut state);
                }
            }
            Err(err) => {
                error!("Scheduled round start failed, retrying in {:?}: {}", self.retry_delay, err);
                let mut state = self.lock_state();
                if state.generation == generation {
                    self.arm_retry_locked(&mut state);
                }
            }
        }
    }
}
