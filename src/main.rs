use std::time::Duration;

use anyhow::Context;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use arena_battle_server::{GameLoopHost, SimEvent, SimulationConfig};

/// How often buffered simulation events are drained when no transport is attached
const EVENT_DRAIN_INTERVAL_MS: u64 = 100;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Arena Battle Server v{}", env!("CARGO_PKG_VERSION"));

    let config = SimulationConfig::load_or_default();
    config.validate().context("invalid simulation configuration")?;
    info!(
        "Configuration loaded: {} Hz, arena {:.0} ({:.0}..{:.0}), max {} players, seed {:?}",
        config.tick_rate,
        config.arena.initial_size,
        config.arena.min_size,
        config.arena.max_size,
        config.spawn.max_players,
        config.seed
    );

    let mut host = GameLoopHost::new(config);
    host.start()?;

    // Stand-in consumer for the transport layer
    let events = host.events();
    let drain = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(EVENT_DRAIN_INTERVAL_MS));
        loop {
            ticker.tick().await;
            for event in events.try_iter() {
                match event {
                    SimEvent::PlayerDeath { target_id, shooter_id } => {
                        debug!("Player {} killed {}", shooter_id, target_id)
                    }
                    other => debug!("Event: {:?}", other),
                }
            }
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to install Ctrl+C handler")?;
    info!("Shutdown signal received");

    host.shutdown().await;
    drain.abort();
    info!("Server stopped");

    Ok(())
}
