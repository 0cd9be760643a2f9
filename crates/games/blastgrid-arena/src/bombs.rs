use blastgrid_core::game_trait::PlayerId;
use serde::{Deserialize, Serialize};

use crate::anim::{Animation, looping_frame};
use crate::grid::{Cell, CellType, Direction, Grid};
use crate::terrain::Terrain;

const EXPLOSION_FRAMES: u8 = 5;
const BOMB_FRAMES: u8 = 3;
const BOMB_FRAME_SECS: f32 = 0.2;

/// A lit bomb. `fuse` is a timestamp on the round clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bomb {
    pub cell: Cell,
    pub owner: PlayerId,
    pub strength: u8,
    pub placed_at: f64,
    pub fuse: f64,
    pub sequence: u64,
}

/// One cell of an explosion's arms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlameCell {
    pub cell: Cell,
    pub vertical: bool,
    pub last: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explosion {
    pub center: Cell,
    pub flames: Vec<FlameCell>,
    pub animation: Animation,
}

impl Explosion {
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        std::iter::once(self.center).chain(self.flames.iter().map(|f| f.cell))
    }
}

/// Why a bomb could not be placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementError {
    Occupied { cell: Cell, found: CellType },
}

impl std::fmt::Display for PlacementError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Occupied { cell, found } => write!(
                f,
                "cannot place bomb at ({}, {}): cell holds {found:?}",
                cell.row, cell.col
            ),
        }
    }
}

impl std::error::Error for PlacementError {}

/// Flame cells of a blast from `center`, plus the cell that stopped each arm.
///
/// Each arm walks up to `strength` cells and stops at the first non-EMPTY
/// cell, which is not burned. The final cell reached is tagged `last`.
pub fn blast_pattern(grid: &Grid, center: Cell, strength: u8) -> (Vec<FlameCell>, Vec<Cell>) {
    let mut flames = Vec::new();
    let mut stops = Vec::new();
    for dir in Direction::ALL {
        let arm_start = flames.len();
        for step in 1..=strength as i32 {
            let cell = center.offset(dir, step);
            if grid.get(cell) != CellType::Empty {
                stops.push(cell);
                break;
            }
            flames.push(FlameCell {
                cell,
                vertical: dir.is_vertical(),
                last: false,
            });
        }
        if flames.len() > arm_start
            && let Some(tail) = flames.last_mut()
        {
            tail.last = true;
        }
    }
    (flames, stops)
}

/// Bombs and explosions for one round.
#[derive(Debug, Clone)]
pub struct Bombs {
    bombs: Vec<Bomb>,
    explosions: Vec<Explosion>,
    next_sequence: u64,
    fuse_secs: f32,
    chain_delay_secs: f32,
    explosion_secs: f32,
}

impl Bombs {
    pub fn new(fuse_secs: f32, chain_delay_secs: f32, explosion_secs: f32) -> Self {
        Self {
            bombs: Vec::new(),
            explosions: Vec::new(),
            next_sequence: 0,
            fuse_secs,
            chain_delay_secs,
            explosion_secs,
        }
    }

    pub fn bombs(&self) -> &[Bomb] {
        &self.bombs
    }

    pub fn explosions(&self) -> &[Explosion] {
        &self.explosions
    }

    pub fn bomb_at(&self, cell: Cell) -> Option<&Bomb> {
        self.bombs.iter().find(|b| b.cell == cell)
    }

    pub fn bomb_frame(&self, bomb: &Bomb, now: f64) -> u8 {
        looping_frame((now - bomb.placed_at) as f32, BOMB_FRAME_SECS, BOMB_FRAMES)
    }

    /// Light a bomb on an EMPTY cell.
    pub fn place(
        &mut self,
        grid: &mut Grid,
        cell: Cell,
        owner: PlayerId,
        strength: u8,
        now: f64,
    ) -> Result<(), PlacementError> {
        let found = grid.get(cell);
        if found != CellType::Empty {
            return Err(PlacementError::Occupied { cell, found });
        }
        grid.set(cell, CellType::Bomb);
        self.bombs.push(Bomb {
            cell,
            owner,
            strength,
            placed_at: now,
            fuse: now + self.fuse_secs as f64,
            sequence: self.next_sequence,
        });
        self.next_sequence += 1;
        Ok(())
    }

    /// Advance explosions and detonate due bombs.
    ///
    /// Returns the owner of every bomb that exploded this tick, once per bomb.
    pub fn update(
        &mut self,
        grid: &mut Grid,
        terrain: &mut Terrain,
        now: f64,
        dt: f32,
    ) -> Vec<PlayerId> {
        self.explosions.retain_mut(|explosion| {
            explosion.animation.advance(dt);
            if !explosion.animation.finished() {
                return true;
            }
            for cell in explosion.cells() {
                if grid.get(cell) == CellType::Flame {
                    grid.set(cell, CellType::Empty);
                }
            }
            false
        });

        let mut detonated = Vec::new();
        while let Some(index) = self.next_due(now) {
            let bomb = self.bombs.remove(index);
            detonated.push(bomb.owner);
            self.detonate(grid, terrain, &bomb, now);
        }
        detonated
    }

    /// Earliest due bomb by (fuse, placement sequence).
    fn next_due(&self, now: f64) -> Option<usize> {
        self.bombs
            .iter()
            .enumerate()
            .filter(|(_, b)| b.fuse <= now)
            .min_by(|(_, a), (_, b)| {
                a.fuse
                    .total_cmp(&b.fuse)
                    .then(a.sequence.cmp(&b.sequence))
            })
            .map(|(i, _)| i)
    }

    fn detonate(&mut self, grid: &mut Grid, terrain: &mut Terrain, bomb: &Bomb, now: f64) {
        grid.set(bomb.cell, CellType::Empty);
        let (flames, stops) = blast_pattern(grid, bomb.cell, bomb.strength);

        for stop in stops {
            match grid.get(stop) {
                CellType::Block => {
                    terrain.destroy(stop);
                },
                CellType::Bomb => {
                    let collapsed = now + self.chain_delay_secs as f64;
                    if let Some(other) = self.bombs.iter_mut().find(|b| b.cell == stop) {
                        other.fuse = other.fuse.min(collapsed);
                    }
                },
                _ => {},
            }
        }

        grid.set(bomb.cell, CellType::Flame);
        for flame in &flames {
            grid.set(flame.cell, CellType::Flame);
        }
        tracing::trace!(
            row = bomb.cell.row,
            col = bomb.cell.col,
            owner = bomb.owner,
            flames = flames.len(),
            "Bomb detonated"
        );
        self.explosions.push(Explosion {
            center: bomb.cell,
            flames,
            animation: Animation::new(self.explosion_secs, EXPLOSION_FRAMES),
        });
    }
}
