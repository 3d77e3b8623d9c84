//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! All messages are JSON objects tagged by `type`.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::game::error::GameError;
use crate::game::events::GameEvent;
use crate::game::state::{GameState, GuessResult, Player, PlayerId, Round, RoundId, RoundSummary};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Register a player.
    CreatePlayer {
        /// Requested name; trimmed before validation.
        display_name: String,
    },

    /// Guess the active round's target.
    SubmitGuess {
        /// Guessing player.
        player_id: PlayerId,
        /// Guess; must fall within 1..=100.
        guess_number: i64,
    },

    /// Start a round now, replacing any active one.
    StartNewRound,

    /// Request a full game snapshot.
    GetGameState,

    /// Request the leaderboard.
    GetLeaderboard,

    /// Request recently ended rounds.
    GetRoundHistory,

    /// Health check.
    Ping {
        /// Client timestamp, echoed back.
        timestamp: u64,
    },
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Player registered.
    PlayerCreated {
        /// The new player.
        player: Player,
    },

    /// Outcome of a guess.
    GuessResult(GuessResult),

    /// A manual round start succeeded.
    RoundStarted {
        /// The opened round.
        round: RoundView,
    },

    /// Full game snapshot.
    GameState(GameStateView),

    /// Players ranked by wins, then streak.
    Leaderboard {
        /// Ranked players.
        players: Vec<Player>,
    },

    /// Recently ended rounds, newest first.
    RoundHistory {
        /// Ended rounds.
        rounds: Vec<RoundSummaryView>,
    },

    /// Lifecycle notification.
    Event(GameEvent),

    /// Health check reply.
    Pong {
        /// Timestamp from the ping.
        timestamp: u64,
        /// Server time in milliseconds since the Unix epoch.
        server_time: u64,
    },

    /// Request failed.
    Error(ServerError),

    /// Server is shutting down.
    Shutdown {
        /// Human-readable reason.
        reason: String,
    },
}

/// A round as clients see it. The target stays hidden while the round is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundView {
    /// Round ID.
    pub id: RoundId,
    /// Target number; `None` while the round is active.
    pub target_number: Option<u8>,
    /// Winner, once claimed.
    pub winner_id: Option<PlayerId>,
    /// Guesses recorded so far.
    pub total_guesses: u32,
    /// Start time.
    pub started_at: DateTime<Utc>,
    /// End time, once ended.
    pub ended_at: Option<DateTime<Utc>>,
    /// Whether the round accepts guesses.
    pub is_active: bool,
}

impl From<&Round> for RoundView {
    fn from(round: &Round) -> Self {
        Self {
            id: round.id,
            target_number: (!round.is_active).then_some(round.target_number),
            winner_id: round.winner_id,
            total_guesses: round.total_guesses,
            started_at: round.started_at,
            ended_at: round.ended_at,
            is_active: round.is_active,
        }
    }
}

/// An ended round with its winner's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSummaryView {
    /// The round.
    #[serde(flatten)]
    pub round: RoundView,
    /// Winner's display name.
    pub winner_name: Option<String>,
}

impl From<&RoundSummary> for RoundSummaryView {
    fn from(summary: &RoundSummary) -> Self {
        Self {
            round: RoundView::from(&summary.round),
            winner_name: summary.winner_name.clone(),
        }
    }
}

/// Game snapshot as clients see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStateView {
    /// The active round, if any.
    pub current_round: Option<RoundView>,
    /// Seconds until the next automatic start; `null` while a round is active.
    pub time_until_next_round: Option<u64>,
    /// Players ranked by wins, then streak.
    pub leaderboard: Vec<Player>,
    /// Recently ended rounds, newest first.
    pub recent_rounds: Vec<RoundSummaryView>,
}

impl From<GameState> for GameStateView {
    fn from(state: GameState) -> Self {
        Self {
            current_round: state.current_round.as_ref().map(RoundView::from),
            time_until_next_round: state.time_until_next_round,
            leaderboard: state.leaderboard,
            recent_rounds: state.recent_rounds.iter().map(RoundSummaryView::from).collect(),
        }
    }
}

/// Error message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

impl ServerError {
    /// Build an error message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed message.
    InvalidInput,
    /// Guess outside 1..=100.
    InvalidGuess,
    /// Display name empty or too long.
    InvalidDisplayName,
    /// Display name taken.
    DuplicateName,
    /// Unknown player.
    PlayerNotFound,
    /// Connection limit reached.
    ServerOverloaded,
    /// Internal error.
    InternalError,
}

impl From<&GameError> for ServerError {
    fn from(err: &GameError) -> Self {
        let code = match err {
            GameError::InvalidGuess(_) => ErrorCode::InvalidGuess,
            GameError::InvalidDisplayName(_) => ErrorCode::InvalidDisplayName,
            GameError::DuplicateName(_) => ErrorCode::DuplicateName,
            GameError::PlayerNotFound(_) => ErrorCode::PlayerNotFound,
            // Storage details stay in the server log
            GameError::Storage(_) => return Self::new(ErrorCode::InternalError, "Internal error"),
        };
        Self::new(code, err.to_string())
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::events::EndReason;
    use crate::store::StoreError;

    fn epoch() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH
    }

    #[test]
    fn test_client_message_parse() {
        let msg = ClientMessage::from_json(r#"{"type":"submit_guess","player_id":3,"guess_number":42}"#).unwrap();
        assert_eq!(msg, ClientMessage::SubmitGuess { player_id: PlayerId(3), guess_number: 42 });

        let msg = ClientMessage::from_json(r#"{"type":"start_new_round"}"#).unwrap();
        assert_eq!(msg, ClientMessage::StartNewRound);

        assert!(ClientMessage::from_json(r#"{"type":"submit_guess","player_id":"x"}"#).is_err());
        assert!(ClientMessage::from_json(r#"{"type":"cheat"}"#).is_err());
    }

    #[test]
    fn test_active_round_hides_target() {
        let mut round = Round::open(RoundId(1), 77, epoch());
        let json = serde_json::to_value(RoundView::from(&round)).unwrap();
        assert!(json["target_number"].is_null());
        assert_eq!(json["is_active"], true);

        round.close(Some(PlayerId(2)), epoch());
        let json = serde_json::to_value(RoundView::from(&round)).unwrap();
        assert_eq!(json["target_number"], 77);
        assert_eq!(json["winner_id"], 2);
    }

    #[test]
    fn test_guess_result_wire_shape() {
        let json = ServerMessage::GuessResult(GuessResult::WON).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "guess_result");
        assert_eq!(value["feedback"], "correct");
        assert_eq!(value["is_winner"], true);
        assert_eq!(value["round_ended"], true);
    }

    #[test]
    fn test_event_message_roundtrip() {
        let msg = ServerMessage::Event(GameEvent::RoundEnded {
            round_id: RoundId(9),
            winner_id: None,
            target_number: 12,
            ended_at: epoch(),
            reason: EndReason::Superseded,
        });
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"type\":\"event\""));
        assert_eq!(ServerMessage::from_json(&json).unwrap(), msg);
    }

    #[test]
    fn test_game_state_view_fresh() {
        let view = GameStateView::from(GameState {
            current_round: None,
            time_until_next_round: None,
            leaderboard: vec![],
            recent_rounds: vec![],
        });
        let value = serde_json::to_value(ServerMessage::GameState(view)).unwrap();
        assert!(value["current_round"].is_null());
        assert!(value["time_until_next_round"].is_null());
        assert_eq!(value["leaderboard"], serde_json::json!([]));
        assert_eq!(value["recent_rounds"], serde_json::json!([]));
    }

    #[test]
    fn test_error_codes() {
        let err = ServerError::from(&GameError::InvalidGuess(0));
        assert_eq!(err.code, ErrorCode::InvalidGuess);

        let err = ServerError::from(&GameError::Storage(StoreError::Unavailable("db down".into())));
        assert_eq!(err.code, ErrorCode::InternalError);
        assert!(!err.message.contains("db down"));

        let json = serde_json::to_string(&ErrorCode::PlayerNotFound).unwrap();
        assert_eq!(json, "\"player_not_found\"");
    }
}
