use serde::{Deserialize, Serialize};

/// Per-cell occupancy code. The numeric values are part of the snapshot format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CellType {
    Empty = 0,
    PowerupFlame = 1,
    PowerupBomb = 2,
    PowerupSpeed = 3,
    Flame = 4,
    Wall = 5,
    Bomb = 6,
    Block = 7,
}

impl CellType {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Blocks movement (before the grace-cell exception).
    pub fn is_obstacle(self) -> bool {
        matches!(self, Self::Wall | Self::Block | Self::Bomb)
    }
}

/// Cardinal direction, declared in input priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];

    /// (row delta, column delta).
    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::Left => (0, -1),
            Self::Right => (0, 1),
            Self::Up => (-1, 0),
            Self::Down => (1, 0),
        }
    }

    /// Unit vector in (x, y) tile space; y grows downward with the row index.
    pub fn unit(self) -> (f32, f32) {
        let (dr, dc) = self.delta();
        (dc as f32, dr as f32)
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Self::Up | Self::Down)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

/// Integer tile coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub row: i32,
    pub col: i32,
}

impl Cell {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn offset(self, dir: Direction, steps: i32) -> Self {
        let (dr, dc) = dir.delta();
        Self {
            row: self.row + dr * steps,
            col: self.col + dc * steps,
        }
    }

    /// The cell a point falls in.
    pub fn containing(p: Point) -> Self {
        Self {
            row: p.y.floor() as i32,
            col: p.x.floor() as i32,
        }
    }

    pub fn center(self) -> Point {
        Point {
            x: self.col as f32 + 0.5,
            y: self.row as f32 + 0.5,
        }
    }

    pub fn rect(self) -> Rect {
        Rect {
            min_x: self.col as f32,
            min_y: self.row as f32,
            max_x: self.col as f32 + 1.0,
            max_y: self.row as f32 + 1.0,
        }
    }
}

/// Sub-tile position in tile units. `x` follows columns, `y` follows rows.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn moved(self, dir: Direction, distance: f32) -> Self {
        let (ux, uy) = dir.unit();
        Self {
            x: self.x + ux * distance,
            y: self.y + uy * distance,
        }
    }
}

/// Axis-aligned rectangle in tile units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Rect {
    pub fn around(center: Point, half: f32) -> Self {
        Self {
            min_x: center.x - half,
            min_y: center.y - half,
            max_x: center.x + half,
            max_y: center.y + half,
        }
    }

    /// Strict overlap; touching edges do not count.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_y < other.max_y
            && other.min_y < self.max_y
    }
}

/// The collision map: occupancy codes stored row-major (row * cols + col).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    rows: i32,
    cols: i32,
    cells: Vec<CellType>,
}

impl Grid {
    pub fn new(rows: i32, cols: i32, fill: CellType) -> Self {
        let rows = rows.max(0);
        let cols = cols.max(0);
        Self {
            rows,
            cols,
            cells: vec![fill; (rows * cols) as usize],
        }
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.row >= 0 && cell.col >= 0 && cell.row < self.rows && cell.col < self.cols
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        self.in_bounds(cell)
            .then(|| (cell.row * self.cols + cell.col) as usize)
    }

    /// Out-of-bounds cells read as walls.
    pub fn get(&self, cell: Cell) -> CellType {
        self.index(cell).map_or(CellType::Wall, |i| self.cells[i])
    }

    /// Writes outside the grid are ignored.
    pub fn set(&mut self, cell: Cell, value: CellType) {
        if let Some(i) = self.index(cell) {
            self.cells[i] = value;
        }
    }

    pub fn cells(&self) -> impl Iterator<Item = (Cell, CellType)> + '_ {
        let cols = self.cols.max(1);
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, t)| (Cell::new(i as i32 / cols, i as i32 % cols), *t))
    }

    pub fn count(&self, value: CellType) -> usize {
        self.cells.iter().filter(|t| **t == value).count()
    }

    /// Numeric codes as rows, the snapshot representation.
    pub fn codes(&self) -> Vec<Vec<u8>> {
        self.cells
            .chunks(self.cols.max(1) as usize)
            .map(|row| row.iter().map(|t| t.code()).collect())
            .collect()
    }
}
