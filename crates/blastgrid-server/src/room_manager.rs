use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use blastgrid_core::game_trait::RoundFactory;
use blastgrid_core::player::Player;
use blastgrid_core::room::{RoomConfig, generate_room_id};

use crate::config::ServerConfig;
use crate::error::Rejection;
use crate::game_loop::{RoomHandle, spawn_room};

/// Registry of running rooms keyed by room id.
pub struct RoomManager {
    rooms: HashMap<String, RoomEntry>,
    factory: RoundFactory,
    room_config: RoomConfig,
    max_rooms: usize,
    broadcast_capacity: usize,
}

struct RoomEntry {
    handle: RoomHandle,
    task: JoinHandle<()>,
}

impl RoomManager {
    pub fn new(config: &ServerConfig, factory: RoundFactory) -> Self {
        Self {
            rooms: HashMap::new(),
            factory,
            room_config: config.room_config(),
            max_rooms: config.rooms.max_rooms,
            broadcast_capacity: config.rooms.broadcast_capacity,
        }
    }

    /// Open a room with `host` in seat 0.
    pub fn create_room(&mut self, host: Player) -> Result<RoomHandle, Rejection> {
        if self.rooms.len() >= self.max_rooms {
            tracing::warn!(max = self.max_rooms, "Room limit reached");
            return Err(Rejection::RoomLimitReached(self.max_rooms));
        }
        let id = generate_unique_room_id(&self.rooms);
        let host_id = host.id;
        let (handle, task) = spawn_room(
            id.clone(),
            host,
            self.room_config.clone(),
            Arc::clone(&self.factory),
            self.broadcast_capacity,
        );
        tracing::info!(room = %id, host_id, "Room created");
        self.rooms.insert(
            id,
            RoomEntry {
                handle: handle.clone(),
                task,
            },
        );
        Ok(handle)
    }

    /// Handle to a live room.
    pub fn get(&self, room_id: &str) -> Option<RoomHandle> {
        self.rooms
            .get(room_id)
            .filter(|e| !e.handle.is_closed())
            .map(|e| e.handle.clone())
    }

    pub fn subscribe(&self, room_id: &str) -> Option<broadcast::Receiver<Bytes>> {
        self.get(room_id).map(|h| h.subscribe())
    }

    /// Stop and forget a room. Returns false if it was already gone.
    pub fn close_room(&mut self, room_id: &str) -> bool {
        match self.rooms.remove(room_id) {
            Some(entry) => {
                entry.handle.close();
                tracing::info!(room = room_id, "Room closed by manager");
                true
            },
            None => false,
        }
    }

    /// Close every room, used on shutdown.
    pub fn close_all(&mut self) {
        for (_, entry) in self.rooms.drain() {
            entry.handle.close();
        }
    }

    /// Remove rooms whose actor stopped and rooms idle for longer than `max_idle`.
    /// Activity is recorded on the room handle by sessions.
    /// Returns the number of rooms removed.
    pub fn cleanup(&mut self, max_idle: Duration) -> usize {
        let before = self.rooms.len();
        self.rooms.retain(|id, entry| {
            let finished = entry.handle.is_closed() || entry.task.is_finished();
            let idle = entry.handle.idle_for() >= max_idle;
            if finished || idle {
                entry.handle.close();
                tracing::info!(room = %id, finished, idle, "Reaping room");
                false
            } else {
                true
            }
        });
        before - self.rooms.len()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

/// Generate a unique room id, retrying on collision with existing rooms.
fn generate_unique_room_id(existing: &HashMap<String, RoomEntry>) -> String {
    loop {
        let id = generate_room_id();
        if !existing.contains_key(&id) {
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    use blastgrid_core::test_helpers::endless_factory;

    use super::*;

    fn manager(max_rooms: usize) -> RoomManager {
        let mut config = ServerConfig::default();
        config.rooms.max_rooms = max_rooms;
        RoomManager::new(&config, endless_factory())
    }

    #[tokio::test]
    async fn create_room_seats_host() {
        let mut mgr = manager(4);
        let room = mgr.create_room(Player::new(1, "Alice")).unwrap();
        assert_eq!(mgr.len(), 1);
        let info = room.info().await.unwrap();
        assert_eq!(info.roster.seat_of(1), Some(0));
        assert!(info.roster.is_host(1));
        assert!(mgr.get(room.id()).is_some());
        assert!(mgr.subscribe(room.id()).is_some());
    }

    #[tokio::test]
    async fn room_limit_enforced() {
        let mut mgr = manager(1);
        mgr.create_room(Player::new(1, "Alice")).unwrap();
        assert_eq!(
            mgr.create_room(Player::new(2, "Bob")).err(),
            Some(Rejection::RoomLimitReached(1))
        );
    }

    #[tokio::test]
    async fn close_room_is_idempotent() {
        let mut mgr = manager(4);
        let room = mgr.create_room(Player::new(1, "Alice")).unwrap();
        let id = room.id().to_string();
        assert!(mgr.close_room(&id));
        assert!(!mgr.close_room(&id));
        assert!(room.is_closed());
        assert!(mgr.get(&id).is_none());
    }

    #[tokio::test]
    async fn cleanup_reaps_idle_rooms() {
        let mut mgr = manager(4);
        let room = mgr.create_room(Player::new(1, "Alice")).unwrap();
        assert_eq!(mgr.cleanup(Duration::from_secs(3600)), 0);
        assert_eq!(mgr.cleanup(Duration::ZERO), 1);
        assert!(mgr.is_empty());
        assert!(room.is_closed());
    }

    #[tokio::test]
    async fn touched_rooms_survive_cleanup() {
        let mut mgr = manager(4);
        let room = mgr.create_room(Player::new(1, "Alice")).unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(room.idle_for() >= Duration::from_millis(50));
        room.touch();
        assert!(room.idle_for() < Duration::from_millis(50));
        assert_eq!(mgr.cleanup(Duration::from_millis(50)), 0);
        assert_eq!(mgr.len(), 1);
    }

    #[tokio::test]
    async fn cleanup_reaps_emptied_rooms() {
        let mut mgr = manager(4);
        let room = mgr.create_room(Player::new(1, "Alice")).unwrap();
        room.leave(1).await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), async {
            while !room.is_closed() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert!(mgr.get(room.id()).is_none());
        assert_eq!(mgr.cleanup(Duration::from_secs(3600)), 1);
    }

    #[test]
    fn unique_ids_skip_existing() {
        let existing = HashMap::new();
        let a = generate_unique_room_id(&existing);
        let b = generate_unique_room_id(&existing);
        assert_ne!(a, b);
    }
}
