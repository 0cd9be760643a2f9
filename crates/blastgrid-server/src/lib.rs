pub mod config;
pub mod error;
pub mod game_loop;
pub mod lifecycle;
pub mod room_manager;
pub mod session;
pub mod state;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use state::AppState;

/// Background task that periodically reaps idle and stopped rooms until
/// `shutdown` is cancelled.
pub fn spawn_room_reaper(state: AppState, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let max_idle = state.config.idle_timeout();
        let mut interval = tokio::time::interval(state.config.idle_check_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    let removed = state.rooms.write().await.cleanup(max_idle);
                    if removed > 0 {
                        tracing::info!(removed, "Reaped rooms");
                    }
                }
            }
        }
        tracing::debug!("Room reaper stopped");
    })
}
