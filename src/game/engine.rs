//! Game Engine
//!
//! Facade tying the round manager, adjudicator, stats and scheduler together
//! over one store. Transport layers talk to this type only.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{info, instrument};

use crate::config::GameConfig;
use crate::core::clock::Clock;
use crate::core::rng::TargetSource;
use crate::game::error::GameError;
use crate::game::events::{self, GameEvent};
use crate::game::guess::GuessAdjudicator;
use crate::game::round::RoundManager;
use crate::game::scheduler::RoundScheduler;
use crate::game::state::{GameState, GuessResult, Player, PlayerId, Round, RoundSummary};
use crate::game::stats::StatsAggregator;
use crate::store::RoundStore;

/// The round lifecycle and adjudication engine.
pub struct GameEngine {
    store: Arc<dyn RoundStore>,
    config: GameConfig,
    clock: Arc<dyn Clock>,
    rounds: Arc<RoundManager>,
    adjudicator: GuessAdjudicator,
    scheduler: Arc<RoundScheduler>,
    events: broadcast::Sender<GameEvent>,
}

impl GameEngine {
    /// Wire up an engine. The scheduler stays idle until [`start`](Self::start).
    pub fn new(
        store: Arc<dyn RoundStore>,
        config: GameConfig,
        clock: Arc<dyn Clock>,
        targets: Arc<dyn TargetSource>,
    ) -> Self {
        let events = events::channel();
        let rounds = Arc::new(RoundManager::new(
            store.clone(),
            clock.clone(),
            targets,
            events.clone(),
        ));
        let stats = Arc::new(StatsAggregator::new(store.clone()));
        let scheduler = Arc::new(RoundScheduler::new(
            rounds.clone(),
            clock.clone(),
            config.round_delay,
            config.retry_delay,
            events.clone(),
        ));
        let adjudicator = GuessAdjudicator::new(store.clone(), rounds.clone(), stats, clock.clone())
            .with_scheduler(scheduler.clone());

        Self { store, config, clock, rounds, adjudicator, scheduler, events }
    }

    /// Arm the automatic round cycle.
    pub fn start(&self) {
        info!("Round cycle armed ({:?} delay)", self.config.round_delay);
        self.scheduler.schedule_next_round();
    }

    /// Stop the automatic round cycle.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }

    /// Register a player. The name is trimmed and must be 1..=50 characters.
    #[instrument(skip(self))]
    pub async fn create_player(&self, display_name: &str) -> Result<Player, GameError> {
        let name = display_name.trim();
        let len = name.chars().count();
        if len == 0 || len > self.config.max_display_name_len {
            return Err(GameError::InvalidDisplayName(name.to_string()));
        }

        let player = self.store.create_player(name, self.clock.now()).await?;
        info!("Player {} registered as {:?}", player.id, player.display_name);
        Ok(player)
    }

    /// Adjudicate a guess. A guess that claims the round restarts the
    /// countdown, even if the winner's stats update then fails.
    pub async fn submit_guess(
        &self,
        player_id: PlayerId,
        guess_number: i64,
    ) -> Result<GuessResult, GameError> {
        self.adjudicator.submit_guess(player_id, guess_number).await
    }

    /// Manually start a round, replacing the pending automatic start.
    pub async fn start_new_round(&self) -> Result<Round, GameError> {
        Ok(self.scheduler.cancel_and_reschedule().await?)
    }

    /// Snapshot of the whole game.
    pub async fn get_game_state(&self) -> Result<GameState, GameError> {
        let current_round = self.rounds.active_round().await?;
        let time_until_next_round = match current_round {
            Some(_) => None,
            None => self.scheduler.time_until_next_round(),
        };

        Ok(GameState {
            current_round,
            time_until_next_round,
            leaderboard: self.leaderboard().await?,
            recent_rounds: self.round_history().await?,
        })
    }

    /// Players ranked by wins, then streak.
    pub async fn leaderboard(&self) -> Result<Vec<Player>, GameError> {
        Ok(self.store.leaderboard().await?)
    }

    /// Most recently ended rounds, newest first.
    pub async fn round_history(&self) -> Result<Vec<RoundSummary>, GameError> {
        Ok(self.store.recent_rounds(self.config.recent_rounds_limit).await?)
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    /// Engine configuration.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }
}
