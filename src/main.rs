//! Guess Round Server
//!
//! Runs the round engine behind a WebSocket endpoint.

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use guess_round::{
    GameConfig, GameEngine, MemoryStore, RandomTargets, SystemClock, VERSION,
    network::{GameServer, ServerConfig},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let game_config = GameConfig::from_env();
    let server_config = ServerConfig::from_env();

    info!("Guess Round Server v{}", VERSION);
    info!(
        "Round delay: {:?}, retry delay: {:?}",
        game_config.round_delay, game_config.retry_delay,
    );

    let engine = Arc::new(GameEngine::new(
        Arc::new(MemoryStore::new()),
        game_config,
        Arc::new(SystemClock),
        Arc::new(RandomTargets::from_entropy()),
    ));
    engine.start();

    let server = Arc::new(GameServer::new(server_config, engine.clone()));
    let shutdown = {
        let server = server.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Ctrl-C received"),
                Err(e) => {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                    return;
                }
            }
            server.shutdown();
        })
    };

    let result = server.run().await;
    shutdown.abort();
    engine.shutdown();

    result?;
    info!("Server stopped");
    Ok(())
}
