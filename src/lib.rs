//! # Guess Round Server
//!
//! Round lifecycle and guess adjudication engine for a multiplayer
//! guess-the-number game.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    GUESS ROUND SERVER                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Injectable providers                      │
//! │  ├── clock.rs    - Wall clock (system / manual)              │
//! │  └── rng.rs      - Xorshift128+ target source                │
//! │                                                              │
//! │  store/          - Atomic round storage                      │
//! │  └── memory.rs   - In-memory store                           │
//! │                                                              │
//! │  game/           - Round rules                               │
//! │  ├── state.rs    - Players, rounds, guesses, results         │
//! │  ├── round.rs    - Start / claim transitions                 │
//! │  ├── guess.rs    - Guess adjudication                        │
//! │  ├── stats.rs    - Wins, streaks, leaderboard                │
//! │  ├── scheduler.rs- Timed automatic rounds                    │
//! │  └── engine.rs   - Facade                                    │
//! │                                                              │
//! │  network/        - Networking                                │
//! │  ├── server.rs   - WebSocket server                          │
//! │  └── protocol.rs - Message types                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - At most one round is active at any time.
//! - Each round has at most one winner and at most one correct guess.
//! - Each player guesses at most once per round.
//!
//! Every state transition is a single conditional store operation, so these
//! hold under any number of concurrent requests.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod game;
pub mod network;
pub mod store;

// Re-export commonly used types
pub use crate::config::GameConfig;
pub use crate::core::clock::{Clock, ManualClock, SystemClock};
pub use crate::core::rng::{DeterministicRng, RandomTargets, SequenceTargets, TargetSource};
pub use game::engine::GameEngine;
pub use game::error::GameError;
pub use game::state::{GameState, GuessFeedback, GuessResult, Player, PlayerId, Round, RoundId};
pub use store::{MemoryStore, RoundStore, StoreError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Smallest target number and valid guess.
pub const TARGET_MIN: u8 = 1;

/// Largest target number and valid guess.
pub const TARGET_MAX: u8 = 100;

/// Seconds between a round starting (or being won) and the next automatic start.
pub const ROUND_DELAY_SECS: u64 = 60;

/// Seconds to wait after a failed automatic start.
pub const RETRY_DELAY_SECS: u64 = 10;

/// Ended rounds returned by history queries.
pub const RECENT_ROUNDS_LIMIT: usize = 10;
