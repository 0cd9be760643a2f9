use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::anim::Animation;
use crate::config::ArenaConfig;
use crate::grid::{Cell, CellType, Grid};
use crate::level::Level;
use crate::powerups::{Pickup, PowerupKind};

const DESTROY_FRAMES: u8 = 6;

/// A destructible block. Exists while the map says BLOCK or while its
/// destruction animation is still playing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub cell: Cell,
    pub powerup: Option<PowerupKind>,
    pub destruction: Option<Animation>,
}

/// Destructible terrain for one round.
#[derive(Debug, Clone, Default)]
pub struct Terrain {
    blocks: BTreeMap<Cell, Block>,
    destroy_secs: f32,
}

impl Terrain {
    pub fn empty(destroy_secs: f32) -> Self {
        Self {
            blocks: BTreeMap::new(),
            destroy_secs,
        }
    }

    /// Scatter up to `max_blocks` blocks over empty cells outside the spawn
    /// zone, then hide capped counts of each powerup under them.
    pub fn seed<R: Rng>(grid: &mut Grid, level: &Level, config: &ArenaConfig, rng: &mut R) -> Self {
        let mut candidates: Vec<Cell> = grid
            .cells()
            .filter(|(cell, t)| *t == CellType::Empty && !level.spawn_zone.contains(cell))
            .map(|(cell, _)| cell)
            .collect();
        candidates.shuffle(rng);
        candidates.truncate(config.max_blocks);

        let mut powerups: Vec<PowerupKind> = std::iter::repeat_n(
            PowerupKind::Flame,
            config.max_flame_powerups,
        )
        .chain(std::iter::repeat_n(PowerupKind::Bomb, config.max_bomb_powerups))
        .chain(std::iter::repeat_n(PowerupKind::Speed, config.max_speed_powerups))
        .collect();
        powerups.shuffle(rng);

        let mut terrain = Self::empty(config.block_destroy_secs);
        for (i, cell) in candidates.into_iter().enumerate() {
            grid.set(cell, CellType::Block);
            terrain.blocks.insert(
                cell,
                Block {
                    cell,
                    powerup: powerups.get(i).copied(),
                    destruction: None,
                },
            );
        }
        terrain
    }

    /// Place a block directly.
    pub fn insert(&mut self, grid: &mut Grid, cell: Cell, powerup: Option<PowerupKind>) {
        grid.set(cell, CellType::Block);
        self.blocks.insert(
            cell,
            Block {
                cell,
                powerup,
                destruction: None,
            },
        );
    }

    /// Remove a block outright, no animation.
    pub fn clear(&mut self, grid: &mut Grid, cell: Cell) {
        if self.blocks.remove(&cell).is_some() {
            grid.set(cell, CellType::Empty);
        }
    }

    pub fn block_at(&self, cell: Cell) -> Option<&Block> {
        self.blocks.get(&cell)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Start destroying the block at `cell`. Returns false if there is no
    /// block or it is already being destroyed.
    pub fn destroy(&mut self, cell: Cell) -> bool {
        match self.blocks.get_mut(&cell) {
            Some(block) if block.destruction.is_none() => {
                block.destruction = Some(Animation::new(self.destroy_secs, DESTROY_FRAMES));
                true
            },
            _ => false,
        }
    }

    /// Advance destruction animations. Finished blocks free their cell and
    /// hand back any powerup they carried.
    pub fn update(&mut self, grid: &mut Grid, dt: f32) -> Vec<Pickup> {
        let mut released = Vec::new();
        self.blocks.retain(|cell, block| {
            let Some(anim) = block.destruction.as_mut() else {
                return true;
            };
            anim.advance(dt);
            if !anim.finished() {
                return true;
            }
            grid.set(*cell, CellType::Empty);
            if let Some(kind) = block.powerup {
                released.push(Pickup::new(*cell, kind));
            }
            false
        });
        released
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn seeded(config: &ArenaConfig, seed: u64) -> (Grid, Terrain) {
        let level = Level::generate(13, 15);
        let mut grid = level.grid.clone();
        let mut rng = StdRng::seed_from_u64(seed);
        let terrain = Terrain::seed(&mut grid, &level, config, &mut rng);
        (grid, terrain)
    }

    #[test]
    fn seeding_respects_cap_and_spawn_zone() {
        let config = ArenaConfig::default();
        let (grid, terrain) = seeded(&config, 1);
        let level = Level::generate(13, 15);
        assert_eq!(terrain.len(), config.max_blocks);
        assert_eq!(grid.count(CellType::Block), config.max_blocks);
        for block in terrain.blocks() {
            assert!(!level.spawn_zone.contains(&block.cell));
            assert_eq!(level.grid.get(block.cell), CellType::Empty);
        }
    }

    #[test]
    fn powerup_counts_capped_one_per_block() {
        let config = ArenaConfig::default();
        let (_, terrain) = seeded(&config, 2);
        let count = |kind| terrain.blocks().filter(|b| b.powerup == Some(kind)).count();
        assert_eq!(count(PowerupKind::Flame), config.max_flame_powerups);
        assert_eq!(count(PowerupKind::Bomb), config.max_bomb_powerups);
        assert_eq!(count(PowerupKind::Speed), config.max_speed_powerups);
    }

    #[test]
    fn same_seed_same_layout() {
        let config = ArenaConfig::default();
        let (a, _) = seeded(&config, 9);
        let (b, _) = seeded(&config, 9);
        assert_eq!(a, b);
    }

    #[test]
    fn destruction_keeps_block_code_until_finished() {
        let mut grid = Grid::new(3, 3, CellType::Empty);
        let mut terrain = Terrain::empty(0.5);
        let cell = Cell::new(1, 1);
        terrain.insert(&mut grid, cell, Some(PowerupKind::Flame));

        assert!(terrain.destroy(cell));
        assert!(!terrain.destroy(cell), "second request ignored");

        assert!(terrain.update(&mut grid, 0.3).is_empty());
        assert_eq!(grid.get(cell), CellType::Block);
        assert!(terrain.block_at(cell).is_some());

        let released = terrain.update(&mut grid, 0.3);
        assert_eq!(grid.get(cell), CellType::Empty);
        assert!(terrain.block_at(cell).is_none());
        assert_eq!(released, vec![Pickup::new(cell, PowerupKind::Flame)]);
    }

    #[test]
    fn destroy_missing_block_is_noop() {
        let mut terrain = Terrain::empty(0.5);
        assert!(!terrain.destroy(Cell::new(0, 0)));
    }
}
