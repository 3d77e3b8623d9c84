//! Engine configuration.

use std::time::Duration;

use crate::{RECENT_ROUNDS_LIMIT, RETRY_DELAY_SECS, ROUND_DELAY_SECS};

/// Longest display name accepted, after trimming.
pub const MAX_DISPLAY_NAME_LEN: usize = 50;

/// Round engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    /// Delay between a round starting (or being won) and the next automatic start.
    pub round_delay: Duration,
    /// Delay before retrying after a failed automatic start.
    pub retry_delay: Duration,
    /// Number of ended rounds returned by history queries.
    pub recent_rounds_limit: usize,
    /// Maximum display name length in characters.
    pub max_display_name_len: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            round_delay: Duration::from_secs(ROUND_DELAY_SECS),
            retry_delay: Duration::from_secs(RETRY_DELAY_SECS),
            recent_rounds_limit: RECENT_ROUNDS_LIMIT,
            max_display_name_len: MAX_DISPLAY_NAME_LEN,
        }
    }
}

impl GameConfig {
    /// Load from environment variables, falling back to defaults.
    ///
    /// - `GUESS_ROUND_DELAY_SECS`
    /// - `GUESS_RETRY_DELAY_SECS`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let secs = |key: &str| lookup(key)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|&v| v > 0)
            .map(Duration::from_secs);

        Self {
            round_delay: secs("GUESS_ROUND_DELAY_SECS").unwrap_or(defaults.round_delay),
            retry_delay: secs("GUESS_RETRY_DELAY_SECS").unwrap_or(defaults.retry_delay),
            ..defaults
        }
    }
}
