use blastgrid_core::game_trait::{PlayerId, RoundOutcome};
use blastgrid_core::room::SeatIndex;
use serde::{Deserialize, Serialize};

use crate::bombs::FlameCell;
use crate::grid::{Cell, Direction, Point};

/// Round portion of a broadcast snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub round: u32,
    pub clock: f64,
    pub grid: Vec<Vec<u8>>,
    pub players: Vec<PlayerView>,
    pub bombs: Vec<BombView>,
    pub explosions: Vec<ExplosionView>,
    pub blocks: Vec<BlockView>,
    pub powerups: Vec<PowerupView>,
    pub outcome: Option<RoundOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub seat: SeatIndex,
    pub position: Point,
    pub facing: Direction,
    pub movement_state: String,
    pub frame_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BombView {
    pub cell: Cell,
    pub frame: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplosionView {
    pub cell: Cell,
    pub frame: u8,
    pub flame_cells: Vec<FlameCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockView {
    pub cell: Cell,
    /// Reserved collision code of the hidden powerup.
    pub powerup: Option<u8>,
    pub destruction_frame: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerupView {
    pub cell: Cell,
    /// Reserved collision code of the pickup kind.
    pub kind: u8,
    pub frame: u8,
}
