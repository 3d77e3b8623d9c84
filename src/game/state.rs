//! Game State Definitions
//!
//! Records owned by the round engine: players, rounds, guesses, and the
//! values returned to callers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

// =============================================================================
// IDENTIFIERS
// =============================================================================

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Raw numeric value.
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

record_id!(
    /// Player identifier.
    PlayerId
);
record_id!(
    /// Round identifier. Increases with every round started.
    RoundId
);
record_id!(
    /// Guess identifier.
    GuessId
);

// =============================================================================
// RECORDS
// =============================================================================

/// A registered player and their running statistics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Unique player ID
    pub id: PlayerId,

    /// Unique display name
    pub display_name: String,

    /// Rounds won
    pub total_wins: u32,

    /// Attempts counted on the win path
    pub total_attempts: u32,

    /// Consecutive rounds won
    pub current_streak: u32,

    /// Registration time
    pub created_at: DateTime<Utc>,
}

impl Player {
    /// Create a player with zeroed statistics.
    pub fn new(id: PlayerId, display_name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            total_wins: 0,
            total_attempts: 0,
            current_streak: 0,
            created_at,
        }
    }
}

/// One game instance with a hidden target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// Round ID
    pub id: RoundId,

    /// Hidden number in `[1, 100]`
    pub target_number: u8,

    /// Player whose guess claimed the round
    pub winner_id: Option<PlayerId>,

    /// Guesses recorded against this round
    pub total_guesses: u32,

    /// When the round opened
    pub started_at: DateTime<Utc>,

    /// When the round closed (set exactly once)
    pub ended_at: Option<DateTime<Utc>>,

    /// Whether the round accepts guesses
    pub is_active: bool,
}

impl Round {
    /// Open a new round.
    pub fn open(id: RoundId, target_number: u8, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            target_number,
            winner_id: None,
            total_guesses: 0,
            started_at,
            ended_at: None,
            is_active: true,
        }
    }

    /// Close the round. Returns false if it was already closed.
    pub fn close(&mut self, winner_id: Option<PlayerId>, ended_at: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        self.is_active = false;
        self.ended_at = Some(ended_at);
        self.winner_id = winner_id;
        true
    }

    /// Compare a guess against the target.
    pub fn judge(&self, guess_number: u8) -> GuessFeedback {
        use std::cmp::Ordering;
        match guess_number.cmp(&self.target_number) {
            Ordering::Greater => GuessFeedback::TooHigh,
            Ordering::Less => GuessFeedback::TooLow,
            Ordering::Equal => GuessFeedback::Correct,
        }
    }
}

/// A single player's attempt within a round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guess {
    /// Guess ID
    pub id: GuessId,
    /// Round guessed in
    pub round_id: RoundId,
    /// Player who guessed
    pub player_id: PlayerId,
    /// Guessed number
    pub guess_number: u8,
    /// Whether this guess is the round's correct guess
    pub is_correct: bool,
    /// When the guess was recorded
    pub created_at: DateTime<Utc>,
}

/// An ended round annotated with its winner's display name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSummary {
    /// The round record.
    #[serde(flatten)]
    pub round: Round,
    /// Winner's display name, if the round was won.
    pub winner_name: Option<String>,
}

// =============================================================================
// RESULTS
// =============================================================================

/// Feedback returned for a guess.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuessFeedback {
    /// Guess above the target.
    TooHigh,
    /// Guess below the target.
    TooLow,
    /// Guess matched the target.
    Correct,
    /// No round to guess in, or the player already guessed this round.
    RoundEnded,
}

/// Outcome of a guess submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessResult {
    /// Feedback value.
    pub feedback: GuessFeedback,
    /// This submission claimed the round.
    pub is_winner: bool,
    /// The round is no longer accepting this player's guesses.
    pub round_ended: bool,
}

impl GuessResult {
    /// Guess above the target; round continues.
    pub const TOO_HIGH: Self = Self { feedback: GuessFeedback::TooHigh, is_winner: false, round_ended: false };
    /// Guess below the target; round continues.
    pub const TOO_LOW: Self = Self { feedback: GuessFeedback::TooLow, is_winner: false, round_ended: false };
    /// Correct guess that claimed the round.
    pub const WON: Self = Self { feedback: GuessFeedback::Correct, is_winner: true, round_ended: true };
    /// Correct guess that arrived after the round was claimed.
    pub const CORRECT_TOO_LATE: Self = Self { feedback: GuessFeedback::Correct, is_winner: false, round_ended: true };
    /// No active round, or a repeat guess.
    pub const ROUND_ENDED: Self = Self { feedback: GuessFeedback::RoundEnded, is_winner: false, round_ended: true };

    /// Result for an incorrect guess.
    pub fn miss(feedback: GuessFeedback) -> Self {
        match feedback {
            GuessFeedback::TooHigh => Self::TOO_HIGH,
            _ => Self::TOO_LOW,
        }
    }
}

/// Read-only aggregate of the whole game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// The active round, if any.
    pub current_round: Option<Round>,
    /// Seconds until the scheduler starts a round; `None` while a round is active.
    pub time_until_next_round: Option<u64>,
    /// Players ranked by wins, then streak.
    pub leaderboard: Vec<Player>,
    /// Most recently ended rounds, newest first.
    pub recent_rounds: Vec<RoundSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH
    }

    #[test]
    fn test_round_judge() {
        let round = Round::open(RoundId(1), 50, epoch());
        assert_eq!(round.judge(75), GuessFeedback::TooHigh);
        assert_eq!(round.judge(30), GuessFeedback::TooLow);
        assert_eq!(round.judge(50), GuessFeedback::Correct);
    }

    #[test]
    fn test_round_close_once() {
        let mut round = Round::open(RoundId(1), 50, epoch());
        let first_end = epoch() + chrono::Duration::seconds(5);

        assert!(round.close(Some(PlayerId(7)), first_end));
        assert!(!round.is_active);
        assert_eq!(round.winner_id, Some(PlayerId(7)));

        // Second close leaves ended_at and winner untouched
        assert!(!round.close(None, first_end + chrono::Duration::seconds(5)));
        assert_eq!(round.ended_at, Some(first_end));
        assert_eq!(round.winner_id, Some(PlayerId(7)));
    }

    #[test]
    fn test_feedback_wire_names() {
        let json = serde_json::to_string(&GuessResult::ROUND_ENDED).unwrap();
        assert!(json.contains("\"round_ended\""));
        let json = serde_json::to_string(&GuessFeedback::TooHigh).unwrap();
        assert_eq!(json, "\"too_high\"");
    }

    #[test]
    fn test_round_summary_flattens() {
        let summary = RoundSummary {
            round: Round::open(RoundId(3), 12, epoch()),
            winner_name: Some("ada".into()),
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["id"], 3);
        assert_eq!(value["winner_name"], "ada");
    }

    #[test]
    fn test_new_player_zeroed() {
        let player = Player::new(PlayerId(1), "ada", epoch());
        assert_eq!((player.total_wins, player.total_attempts, player.current_streak), (0, 0, 0));
    }
}
