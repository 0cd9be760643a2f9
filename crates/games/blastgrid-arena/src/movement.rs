use crate::config::ArenaConfig;
use crate::grid::{Cell, CellType, Direction, Grid, Point};

/// Movement probe geometry, in tile units.
#[derive(Debug, Clone, Copy)]
pub struct Probes {
    /// Distance ahead of the center along the movement axis.
    pub lead: f32,
    /// Offset to either side of the center line.
    pub lateral: f32,
}

impl Probes {
    pub fn from_config(config: &ArenaConfig) -> Self {
        Self {
            lead: config.probe_lead,
            lateral: config.probe_lateral,
        }
    }

    /// The two probe points for moving `dir` from `center`. Index 0 is on the
    /// left/up side of the movement axis, index 1 on the right/down side.
    pub fn points(&self, center: Point, dir: Direction) -> [Point; 2] {
        let ahead = center.moved(dir, self.lead);
        if dir.is_vertical() {
            [
                Point::new(ahead.x - self.lateral, ahead.y),
                Point::new(ahead.x + self.lateral, ahead.y),
            ]
        } else {
            [
                Point::new(ahead.x, ahead.y - self.lateral),
                Point::new(ahead.x, ahead.y + self.lateral),
            ]
        }
    }
}

/// Slide direction when moving `dir` and probe `failed` is obstructed.
fn slide_direction(dir: Direction, failed: usize) -> Direction {
    const HORIZONTAL: [Direction; 2] = [Direction::Down, Direction::Up];
    const VERTICAL: [Direction; 2] = [Direction::Right, Direction::Left];
    if dir.is_vertical() {
        VERTICAL[failed]
    } else {
        HORIZONTAL[failed]
    }
}

/// Is `cell` impassable for a player whose grace cell is `grace`?
pub fn obstructed(grid: &Grid, cell: Cell, grace: Option<Cell>) -> bool {
    match grid.get(cell) {
        CellType::Bomb => grace != Some(cell),
        other => other.is_obstacle(),
    }
}

/// Result of one movement step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Moved along the requested direction.
    Straight(Point),
    /// Redirected 90 degrees around a corner.
    Slide(Point, Direction),
    /// Both probes obstructed; position unchanged.
    Blocked,
}

impl Step {
    pub fn position(&self, from: Point) -> Point {
        match self {
            Self::Straight(p) | Self::Slide(p, _) => *p,
            Self::Blocked => from,
        }
    }
}

/// Try to move `distance` tiles from `center` toward `dir`.
pub fn step(
    grid: &Grid,
    probes: &Probes,
    center: Point,
    dir: Direction,
    distance: f32,
    grace: Option<Cell>,
) -> Step {
    let candidate = center.moved(dir, distance);
    let points = probes.points(candidate, dir);
    let blocked = points.map(|p| obstructed(grid, Cell::containing(p), grace));

    match blocked {
        [false, false] => Step::Straight(candidate),
        [true, true] => Step::Blocked,
        [first_blocked, _] => {
            let failed = if first_blocked { 0 } else { 1 };
            let free = points[1 - failed];
            let slide = slide_direction(dir, failed);
            let lane = Cell::containing(free).center();
            let gap = if slide.is_vertical() {
                (lane.y - center.y).abs()
            } else {
                (lane.x - center.x).abs()
            };
            let amount = distance.min(gap);
            if amount <= 0.0 {
                return Step::Blocked;
            }
            let slid = center.moved(slide, amount);
            let clear = probes
                .points(slid, slide)
                .iter()
                .all(|p| !obstructed(grid, Cell::containing(*p), grace));
            if clear {
                Step::Slide(slid, slide)
            } else {
                Step::Blocked
            }
        },
    }
}

/// First held direction in priority order: left, right, up, down.
pub fn resolve_direction(held: impl Fn(Direction) -> bool) -> Option<Direction> {
    Direction::ALL.into_iter().find(|d| held(*d))
}
