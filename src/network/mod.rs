//! Network Layer
//!
//! WebSocket server exposing the round engine to clients.
//! All game rules live in `game/`; this layer only translates messages.

pub mod protocol;
pub mod server;

pub use protocol::{
    ClientMessage, ErrorCode, GameStateView, RoundSummaryView, RoundView, ServerError,
    ServerMessage,
};
pub use server::{respond, GameServer, GameServerError, ServerConfig};
