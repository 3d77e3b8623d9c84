//! WebSocket Game Server
//!
//! Async WebSocket server for player connections.
//! Routes client requests to the [`GameEngine`] and forwards lifecycle
//! events to every connected client.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::game::engine::GameEngine;
use crate::game::state::PlayerId;
use crate::network::protocol::{
    ClientMessage, ErrorCode, GameStateView, RoundSummaryView, RoundView, ServerError,
    ServerMessage,
};

/// Default listening port.
pub const DEFAULT_PORT: u16 = 2022;

/// Outbound queue depth per connection.
const CLIENT_QUEUE_DEPTH: usize = 64;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            max_connections: 1000,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Load from environment variables, falling back to defaults.
    ///
    /// - `SERVER_PORT`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.trim().parse::<u16>().ok()) {
            config.bind_addr.set_port(port);
        }
        config
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),
}

/// Connected client state.
struct ConnectedClient {
    /// Player registered over this connection, if any.
    player_id: Option<PlayerId>,
    /// Connection time.
    connected_at: Instant,
}

type Clients = Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>;

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Round engine.
    engine: Arc<GameEngine>,
    /// Connected clients.
    clients: Clients,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server.
    pub fn new(config: ServerConfig, engine: Arc<GameEngine>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            engine,
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Bind the configured address and run until shutdown.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("Game server v{} listening on {}", self.config.version, self.config.bind_addr);
        self.serve(listener).await
    }

    /// Accept connections on `listener` until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GameServerError> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let clients_count = self.clients.read().await.len();
                            if clients_count >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                Self::reject(stream, addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Tell an over-limit client why it is being dropped.
    fn reject(stream: TcpStream, addr: SocketAddr) {
        tokio::spawn(async move {
            let Ok(mut ws) = accept_async(stream).await else {
                return;
            };
            let msg = ServerMessage::Error(ServerError::new(
                ErrorCode::ServerOverloaded,
                "Connection limit reached",
            ));
            if let Ok(text) = msg.to_json() {
                let _ = ws.send(Message::Text(text)).await;
            }
            let _ = ws.close(None).await;
            debug!("Rejected {}", addr);
        });
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let engine = self.engine.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut events_rx = engine.subscribe_events();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(CLIENT_QUEUE_DEPTH);

            // Register client
            clients.write().await.insert(addr, ConnectedClient {
                player_id: None,
                connected_at: Instant::now(),
            });

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                let _ = ws_sender.close().await;
            });

            // Handle incoming messages
            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let reply = match ClientMessage::from_json(&text) {
                                    Ok(client_msg) => {
                                        Self::handle_client_message(addr, client_msg, &engine, &clients).await
                                    }
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        ServerMessage::Error(ServerError::new(
                                            ErrorCode::InvalidInput,
                                            "Invalid message format",
                                        ))
                                    }
                                };
                                if msg_tx.send(reply).await.is_err() {
                                    break;
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    event = events_rx.recv() => {
                        match event {
                            Ok(event) => {
                                if msg_tx.send(ServerMessage::Event(event)).await.is_err() {
                                    break;
                                }
                            }
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                warn!("Client {} missed {} events", addr, skipped);
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Let queued replies drain before the socket closes
            drop(msg_tx);
            let _ = sender_task.await;

            // Remove client
            if let Some(client) = clients.write().await.remove(&addr) {
                info!(
                    "Client {} (player {:?}) cleaned up after {:?}",
                    addr,
                    client.player_id.map(PlayerId::get),
                    client.connected_at.elapsed(),
                );
            }
        });
    }

    /// Handle a client message, tracking the connection's player.
    async fn handle_client_message(
        addr: SocketAddr,
        msg: ClientMessage,
        engine: &GameEngine,
        clients: &Clients,
    ) -> ServerMessage {
        let reply = respond(engine, msg).await;

        if let ServerMessage::PlayerCreated { player } = &reply {
            if let Some(client) = clients.write().await.get_mut(&addr) {
                client.player_id = Some(player.id);
            }
        }
        reply
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }
}

/// Run one client request against the engine.
pub async fn respond(engine: &GameEngine, msg: ClientMessage) -> ServerMessage {
    let result = match msg {
        ClientMessage::CreatePlayer { display_name } => engine.create_player(&display_name).await
            .map(|player| ServerMessage::PlayerCreated { player }),
        ClientMessage::SubmitGuess { player_id, guess_number } => engine.submit_guess(player_id, guess_number).await
            .map(ServerMessage::GuessResult),
        ClientMessage::StartNewRound => engine.start_new_round().await
            .map(|round| ServerMessage::RoundStarted { round: RoundView::from(&round) }),
        ClientMessage::GetGameState => engine.get_game_state().await
            .map(|state| ServerMessage::GameState(GameStateView::from(state))),
        ClientMessage::GetLeaderboard => engine.leaderboard().await
            .map(|players| ServerMessage::Leaderboard { players }),
        ClientMessage::GetRoundHistory => engine.round_history().await
            .map(|rounds| ServerMessage::RoundHistory {
                rounds: rounds.iter().map(RoundSummaryView::from).collect(),
            }),
        ClientMessage::Ping { timestamp } => Ok(ServerMessage::Pong {
            timestamp,
            server_time: chrono::Utc::now().timestamp_millis().max(0) as u64,
        }),
    };

    result.unwrap_or_else(|err| {
        debug!("Request failed: {}", err);
        ServerMessage::Error(ServerError::from(&err))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::core::clock::ManualClock;
    use crate::core::rng::SequenceTargets;
    use crate::game::state::{GuessFeedback, GuessResult};
    use crate::store::MemoryStore;
    use tokio_tungstenite::connect_async;

    fn engine(target: u8) -> Arc<GameEngine> {
        Arc::new(GameEngine::new(
            Arc::new(MemoryStore::new()),
            GameConfig::default(),
            Arc::new(ManualClock::default()),
            Arc::new(SequenceTargets::constant(target)),
        ))
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 2022);
        assert_eq!(config.max_connections, 1000);
    }

    #[tokio::test]
    async fn test_respond_flow() {
        let engine = engine(40);

        let player = match respond(&engine, ClientMessage::CreatePlayer { display_name: "ada".into() }).await {
            ServerMessage::PlayerCreated { player } => player,
            other => panic!("unexpected reply: {other:?}"),
        };

        let reply = respond(&engine, ClientMessage::StartNewRound).await;
        let ServerMessage::RoundStarted { round } = reply else {
            panic!("unexpected reply: {reply:?}");
        };
        assert_eq!(round.target_number, None);

        let reply = respond(&engine, ClientMessage::SubmitGuess { player_id: player.id, guess_number: 40 }).await;
        assert_eq!(reply, ServerMessage::GuessResult(GuessResult::WON));

        let reply = respond(&engine, ClientMessage::GetRoundHistory).await;
        let ServerMessage::RoundHistory { rounds } = reply else {
            panic!("unexpected reply: {reply:?}");
        };
        assert_eq!(rounds[0].round.target_number, Some(40));
        assert_eq!(rounds[0].winner_name.as_deref(), Some("ada"));

        engine.shutdown();
    }

    #[tokio::test]
    async fn test_respond_errors() {
        let engine = engine(40);

        let reply = respond(&engine, ClientMessage::SubmitGuess { player_id: PlayerId(5), guess_number: 500 }).await;
        assert!(matches!(reply, ServerMessage::Error(ServerError { code: ErrorCode::InvalidGuess, .. })));

        let reply = respond(&engine, ClientMessage::SubmitGuess { player_id: PlayerId(5), guess_number: 50 }).await;
        assert!(matches!(reply, ServerMessage::Error(ServerError { code: ErrorCode::PlayerNotFound, .. })));

        respond(&engine, ClientMessage::CreatePlayer { display_name: "bo".into() }).await;
        let reply = respond(&engine, ClientMessage::CreatePlayer { display_name: " bo ".into() }).await;
        assert!(matches!(reply, ServerMessage::Error(ServerError { code: ErrorCode::DuplicateName, .. })));
    }

    #[tokio::test]
    async fn test_websocket_session() {
        let engine = engine(10);
        let server = Arc::new(GameServer::new(ServerConfig::default(), engine.clone()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let serve = {
            let server = server.clone();
            tokio::spawn(async move { server.serve(listener).await })
        };

        let (mut ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();

        // Read until a non-event reply arrives
        async fn next_reply<S>(ws: &mut S) -> ServerMessage
        where
            S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
        {
            loop {
                let Some(Ok(Message::Text(text))) = ws.next().await else {
                    panic!("connection closed");
                };
                match ServerMessage::from_json(&text).unwrap() {
                    ServerMessage::Event(_) => continue,
                    msg => return msg,
                }
            }
        }

        ws.send(Message::Text("not json".into())).await.unwrap();
        assert!(matches!(
            next_reply(&mut ws).await,
            ServerMessage::Error(ServerError { code: ErrorCode::InvalidInput, .. })
        ));

        ws.send(Message::Text(r#"{"type":"create_player","display_name":"zed"}"#.into())).await.unwrap();
        let ServerMessage::PlayerCreated { player } = next_reply(&mut ws).await else {
            panic!("expected player_created");
        };
        assert_eq!(server.connection_count().await, 1);

        ws.send(Message::Text(r#"{"type":"start_new_round"}"#.into())).await.unwrap();
        assert!(matches!(next_reply(&mut ws).await, ServerMessage::RoundStarted { .. }));

        let guess = ClientMessage::SubmitGuess { player_id: player.id, guess_number: 3 };
        ws.send(Message::Text(guess.to_json().unwrap())).await.unwrap();
        let ServerMessage::GuessResult(result) = next_reply(&mut ws).await else {
            panic!("expected guess_result");
        };
        assert_eq!(result.feedback, GuessFeedback::TooLow);

        server.shutdown();
        assert!(matches!(next_reply(&mut ws).await, ServerMessage::Shutdown { .. }));
        serve.await.unwrap().unwrap();
        engine.shutdown();
    }
}
