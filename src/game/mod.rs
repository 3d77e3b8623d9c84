//! Game Logic Module
//!
//! Round lifecycle and guess adjudication.
//!
//! ## Module Structure
//!
//! - `state`: Player, round and guess records, results
//! - `round`: Starting and claiming rounds
//! - `guess`: Two-phase guess adjudication (record, then claim)
//! - `stats`: Win bookkeeping and leaderboard order
//! - `scheduler`: Timed automatic round starts
//! - `engine`: Facade over all of the above
//! - `events`: Lifecycle notifications

pub mod engine;
pub mod error;
pub mod events;
pub mod guess;
pub mod round;
pub mod scheduler;
pub mod state;
pub mod stats;

// Re-export key types
pub use engine::GameEngine;
pub use error::GameError;
pub use events::{EndReason, GameEvent};
pub use scheduler::RoundScheduler;
pub use state::{
    GameState, Guess, GuessFeedback, GuessId, GuessResult, Player, PlayerId, Round, RoundId,
    RoundSummary,
};
