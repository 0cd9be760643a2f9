use std::collections::HashSet;

use blastgrid_core::room::MAX_SEATS;

use crate::grid::{Cell, CellType, Direction, Grid};

/// Static level data a round starts from.
#[derive(Debug, Clone)]
pub struct Level {
    pub grid: Grid,
    /// Spawn tile per seat.
    pub spawns: [Cell; MAX_SEATS],
    /// Cells kept free of blocks so every spawn has room to move.
    pub spawn_zone: HashSet<Cell>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelError {
    Empty,
    Ragged { row: usize },
    UnknownTile { row: usize, col: usize, ch: char },
    MissingSpawn(usize),
}

impl std::fmt::Display for LevelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "layout has no rows"),
            Self::Ragged { row } => write!(f, "layout row {row} has a different width"),
            Self::UnknownTile { row, col, ch } => {
                write!(f, "unknown tile {ch:?} at row {row}, column {col}")
            },
            Self::MissingSpawn(seat) => write!(f, "layout has no spawn for seat {seat}"),
        }
    }
}

impl std::error::Error for LevelError {}

impl Level {
    /// Classic layout: solid border, pillars on even (row, col), a spawn in
    /// each corner. Dimensions are clamped to at least 5x5.
    pub fn generate(rows: i32, cols: i32) -> Self {
        let rows = rows.max(5);
        let cols = cols.max(5);
        let mut grid = Grid::new(rows, cols, CellType::Empty);
        for row in 0..rows {
            for col in 0..cols {
                let border = row == 0 || col == 0 || row == rows - 1 || col == cols - 1;
                let pillar = row % 2 == 0 && col % 2 == 0;
                if border || pillar {
                    grid.set(Cell::new(row, col), CellType::Wall);
                }
            }
        }

        let spawns = [
            Cell::new(1, 1),
            Cell::new(1, cols - 2),
            Cell::new(rows - 2, 1),
            Cell::new(rows - 2, cols - 2),
        ];
        let mut spawn_zone = HashSet::new();
        for spawn in spawns {
            grid.set(spawn, CellType::Empty);
            spawn_zone.insert(spawn);
            for dir in Direction::ALL {
                let next = spawn.offset(dir, 1);
                if grid.get(next) == CellType::Empty {
                    spawn_zone.insert(next);
                }
            }
        }

        Self {
            grid,
            spawns,
            spawn_zone,
        }
    }

    /// Parse an ASCII layout.
    ///
    /// `#` wall, `.` floor, `0`-`3` seat spawn, `+` floor kept free of blocks.
    pub fn parse<S: AsRef<str>>(rows: &[S]) -> Result<Self, LevelError> {
        let width = rows
            .first()
            .map(|r| r.as_ref().chars().count())
            .ok_or(LevelError::Empty)?;
        let mut grid = Grid::new(rows.len() as i32, width as i32, CellType::Empty);
        let mut spawns: [Option<Cell>; MAX_SEATS] = [None; MAX_SEATS];
        let mut spawn_zone = HashSet::new();

        for (r, line) in rows.iter().enumerate() {
            let line = line.as_ref();
            if line.chars().count() != width {
                return Err(LevelError::Ragged { row: r });
            }
            for (c, ch) in line.chars().enumerate() {
                let cell = Cell::new(r as i32, c as i32);
                match ch {
                    '#' => grid.set(cell, CellType::Wall),
                    '.' => {},
                    '+' => {
                        spawn_zone.insert(cell);
                    },
                    '0'..='3' => {
                        let seat = ch as usize - '0' as usize;
                        spawns[seat] = Some(cell);
                        spawn_zone.insert(cell);
                    },
                    _ => {
                        return Err(LevelError::UnknownTile {
                            row: r,
                            col: c,
                            ch,
                        });
                    },
                }
            }
        }

        let mut resolved = [Cell::new(0, 0); MAX_SEATS];
        for (seat, spawn) in spawns.iter().enumerate() {
            resolved[seat] = spawn.ok_or(LevelError::MissingSpawn(seat))?;
        }

        Ok(Self {
            grid,
            spawns: resolved,
            spawn_zone,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_level_has_corner_spawns() {
        let level = Level::generate(13, 15);
        assert_eq!(level.spawns[0], Cell::new(1, 1));
        assert_eq!(level.spawns[3], Cell::new(11, 13));
        for spawn in level.spawns {
            assert_eq!(level.grid.get(spawn), CellType::Empty);
        }
    }

    #[test]
    fn generated_level_walls() {
        let level = Level::generate(13, 15);
        assert_eq!(level.grid.get(Cell::new(0, 7)), CellType::Wall);
        assert_eq!(level.grid.get(Cell::new(2, 2)), CellType::Wall);
        assert_eq!(level.grid.get(Cell::new(5, 5)), CellType::Empty);
        assert_eq!(level.grid.get(Cell::new(4, 5)), CellType::Empty);
    }

    #[test]
    fn spawn_zone_covers_neighbors() {
        let level = Level::generate(13, 15);
        assert!(level.spawn_zone.contains(&Cell::new(1, 2)));
        assert!(level.spawn_zone.contains(&Cell::new(2, 1)));
        assert!(!level.spawn_zone.contains(&Cell::new(0, 1)), "walls are not zone");
    }

    #[test]
    fn parse_reads_spawns_and_zone() {
        let level = Level::parse(&["#######", "#0+.+1#", "#.#.#.#", "#2+.+3#", "#######"])
            .unwrap();
        assert_eq!(level.spawns[1], Cell::new(1, 5));
        assert_eq!(level.spawns[2], Cell::new(3, 1));
        assert!(level.spawn_zone.contains(&Cell::new(1, 2)));
        assert_eq!(level.grid.get(Cell::new(2, 2)), CellType::Wall);
    }

    #[test]
    fn parse_rejects_bad_layouts() {
        assert_eq!(Level::parse::<&str>(&[]).unwrap_err(), LevelError::Empty);
        assert_eq!(
            Level::parse(&["###", "##"]).unwrap_err(),
            LevelError::Ragged { row: 1 }
        );
        assert!(matches!(
            Level::parse(&["#x#"]).unwrap_err(),
            LevelError::UnknownTile { ch: 'x', .. }
        ));
        assert_eq!(
            Level::parse(&["#0#"]).unwrap_err(),
            LevelError::MissingSpawn(1)
        );
    }
}
