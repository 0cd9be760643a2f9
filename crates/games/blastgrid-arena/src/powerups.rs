use serde::{Deserialize, Serialize};

use crate::anim::looping_frame;
use crate::grid::{Cell, CellType, Rect};

/// Stat buff carried by a block and dropped when it is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerupKind {
    Flame,
    Bomb,
    Speed,
}

impl PowerupKind {
    /// Reserved collision code for this kind. The map itself stays EMPTY under
    /// a pickup; the code is only used to label pickups in snapshots.
    pub fn cell_type(self) -> CellType {
        match self {
            Self::Flame => CellType::PowerupFlame,
            Self::Bomb => CellType::PowerupBomb,
            Self::Speed => CellType::PowerupSpeed,
        }
    }
}

/// A pickup lying on the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pickup {
    pub cell: Cell,
    pub kind: PowerupKind,
    pub elapsed: f32,
}

impl Pickup {
    pub fn new(cell: Cell, kind: PowerupKind) -> Self {
        Self {
            cell,
            kind,
            elapsed: 0.0,
        }
    }
}

/// Active pickups on the grid.
#[derive(Debug, Clone, Default)]
pub struct Powerups {
    pickups: Vec<Pickup>,
    blink_secs: f32,
}

impl Powerups {
    pub fn new(blink_secs: f32) -> Self {
        Self {
            pickups: Vec::new(),
            blink_secs,
        }
    }

    pub fn spawn(&mut self, pickup: Pickup) {
        self.pickups.push(pickup);
    }

    pub fn pickups(&self) -> &[Pickup] {
        &self.pickups
    }

    pub fn blink_frame(&self, pickup: &Pickup) -> u8 {
        looping_frame(pickup.elapsed, self.blink_secs, 2)
    }

    pub fn update(&mut self, dt: f32) {
        for pickup in &mut self.pickups {
            pickup.elapsed += dt;
        }
    }

    /// Remove and return every pickup whose cell overlaps `hitbox`.
    pub fn collect(&mut self, hitbox: &Rect) -> Vec<PowerupKind> {
        let mut taken = Vec::new();
        self.pickups.retain(|p| {
            if p.cell.rect().overlaps(hitbox) {
                taken.push(p.kind);
                false
            } else {
                true
            }
        });
        taken
    }
}
