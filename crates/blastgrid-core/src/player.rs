use serde::{Deserialize, Serialize};

use crate::game_trait::PlayerId;

/// Opaque player identity handed over by the session layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
}

impl Player {
    pub fn new(id: PlayerId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}

/// A seated player and whether they flagged themselves ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub player: Player,
    pub ready: bool,
}

impl Seat {
    pub fn new(player: Player) -> Self {
        Self {
            player,
            ready: false,
        }
    }
}
