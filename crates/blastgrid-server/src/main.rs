use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use blastgrid_arena::ArenaRound;
use blastgrid_arena::config::ArenaConfig;
use blastgrid_server::config::ServerConfig;
use blastgrid_server::spawn_room_reaper;
use blastgrid_server::state::AppState;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var_os("BLASTGRID_LOG_JSON").is_some() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    tracing::info!("Blastgrid server starting");

    let config = ServerConfig::load();
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    }
    let arena = ArenaConfig::load();
    let state = AppState::new(config, ArenaRound::factory(arena));

    let shutdown = CancellationToken::new();
    let reaper = spawn_room_reaper(state.clone(), shutdown.clone());
    tracing::info!(
        max_rooms = state.config.rooms.max_rooms,
        max_wins = state.config.match_rules.max_wins,
        "Room server ready"
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
    shutdown.cancel();
    state.rooms.write().await.close_all();
    if let Err(e) = reaper.await {
        tracing::warn!(error = %e, "Room reaper ended abnormally");
    }
}
