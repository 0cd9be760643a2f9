use std::sync::Arc;
use tokio::sync::RwLock;

use blastgrid_core::game_trait::RoundFactory;

use crate::config::ServerConfig;
use crate::room_manager::RoomManager;

pub type SharedRoomManager = Arc<RwLock<RoomManager>>;

#[derive(Clone)]
pub struct AppState {
    pub rooms: SharedRoomManager,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig, factory: RoundFactory) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(RoomManager::new(&config, factory))),
            config: Arc::new(config),
        }
    }
}
