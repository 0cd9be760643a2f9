use blastgrid_core::game_trait::PlayerId;
use blastgrid_core::input::{InputFrame, Key};
use blastgrid_core::room::SeatIndex;
use serde::{Deserialize, Serialize};

use crate::anim::{Animation, looping_frame};
use crate::config::ArenaConfig;
use crate::grid::{Cell, CellType, Direction, Grid, Point, Rect};
use crate::movement::{self, Probes, Step};
use crate::powerups::PowerupKind;

const WALK_FRAMES: u8 = 4;
const DEATH_FRAMES: u8 = 6;

/// Kinematic state shared by every movement state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub position: Point,
    pub facing: Direction,
    pub speed_multiplier: f32,
    /// Cell of the bomb just placed, passable until the player leaves it.
    pub grace_cell: Option<Cell>,
}

impl Body {
    pub fn cell(&self) -> Cell {
        Cell::containing(self.position)
    }
}

/// Bomb-related stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loadout {
    pub capacity: u8,
    pub available: u8,
    pub strength: u8,
}

/// Per-tick context handed to the active state.
pub struct Tick<'a> {
    pub grid: &'a Grid,
    pub config: &'a ArenaConfig,
    pub direction: Option<Direction>,
    pub dt: f32,
}

/// Contract every movement state implements.
pub trait State {
    fn enter(&mut self, body: &mut Body, tick: &Tick<'_>);
    /// Advance one tick. Returns the next state when a transition is due.
    fn update(&mut self, body: &mut Body, tick: &Tick<'_>) -> Option<MovementState>;
    fn frame_key(&self, body: &Body) -> String;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Idle;

impl State for Idle {
    fn enter(&mut self, _body: &mut Body, _tick: &Tick<'_>) {}

    fn update(&mut self, _body: &mut Body, tick: &Tick<'_>) -> Option<MovementState> {
        tick.direction
            .map(|_| MovementState::Moving(Moving::default()))
    }

    fn frame_key(&self, body: &Body) -> String {
        format!("idle_{}", body.facing.name())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Moving {
    walk_elapsed: f32,
    frame_secs: f32,
}

impl State for Moving {
    fn enter(&mut self, body: &mut Body, tick: &Tick<'_>) {
        self.walk_elapsed = 0.0;
        self.frame_secs = tick.config.walk_frame_secs;
        if let Some(dir) = tick.direction {
            body.facing = dir;
        }
    }

    fn update(&mut self, body: &mut Body, tick: &Tick<'_>) -> Option<MovementState> {
        let Some(dir) = tick.direction else {
            return Some(MovementState::Idle(Idle));
        };
        body.facing = dir;
        self.walk_elapsed += tick.dt;

        let distance = tick.config.base_speed * body.speed_multiplier * tick.dt;
        let probes = Probes::from_config(tick.config);
        let step = movement::step(
            tick.grid,
            &probes,
            body.position,
            dir,
            distance,
            body.grace_cell,
        );
        if let Step::Blocked = step {
            return None;
        }
        body.position = step.position(body.position);
        None
    }

    fn frame_key(&self, body: &Body) -> String {
        let frame = looping_frame(self.walk_elapsed, self.frame_secs, WALK_FRAMES);
        format!("walk_{}_{}", body.facing.name(), frame)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Death {
    animation: Animation,
}

impl Death {
    pub fn new(duration: f32) -> Self {
        Self {
            animation: Animation::new(duration, DEATH_FRAMES),
        }
    }

    pub fn finished(&self) -> bool {
        self.animation.finished()
    }
}

impl State for Death {
    fn enter(&mut self, body: &mut Body, _tick: &Tick<'_>) {
        body.grace_cell = None;
    }

    fn update(&mut self, _body: &mut Body, tick: &Tick<'_>) -> Option<MovementState> {
        self.animation.advance(tick.dt);
        None
    }

    fn frame_key(&self, _body: &Body) -> String {
        format!("death_{}", self.animation.frame())
    }
}

/// Movement state, one type per state.
#[derive(Debug, Clone, PartialEq)]
pub enum MovementState {
    Idle(Idle),
    Moving(Moving),
    Death(Death),
}

impl MovementState {
    fn as_state(&mut self) -> &mut dyn State {
        match self {
            Self::Idle(s) => s,
            Self::Moving(s) => s,
            Self::Death(s) => s,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle(_) => "idle",
            Self::Moving(_) => "moving",
            Self::Death(_) => "death",
        }
    }
}

/// A player's avatar for one round.
#[derive(Debug, Clone)]
pub struct Combatant {
    pub id: PlayerId,
    pub seat: SeatIndex,
    pub body: Body,
    pub loadout: Loadout,
    state: MovementState,
    action_held: bool,
}

impl Combatant {
    pub fn spawn(id: PlayerId, seat: SeatIndex, cell: Cell, config: &ArenaConfig) -> Self {
        Self {
            id,
            seat,
            body: Body {
                position: cell.center(),
                facing: Direction::Down,
                speed_multiplier: config.start_speed_multiplier,
                grace_cell: None,
            },
            loadout: Loadout {
                capacity: config.start_bombs,
                available: config.start_bombs,
                strength: config.start_strength,
            },
            state: MovementState::Idle(Idle),
            action_held: false,
        }
    }

    pub fn state(&self) -> &MovementState {
        &self.state
    }

    pub fn is_dead(&self) -> bool {
        matches!(self.state, MovementState::Death(_))
    }

    /// DEATH animation completed; the round should drop this combatant.
    pub fn death_finished(&self) -> bool {
        matches!(&self.state, MovementState::Death(d) if d.finished())
    }

    pub fn cell(&self) -> Cell {
        self.body.cell()
    }

    pub fn hitbox(&self, half: f32) -> Rect {
        Rect::around(self.body.position, half)
    }

    pub fn frame_key(&self) -> String {
        match &self.state {
            MovementState::Idle(s) => s.frame_key(&self.body),
            MovementState::Moving(s) => s.frame_key(&self.body),
            MovementState::Death(s) => s.frame_key(&self.body),
        }
    }

    fn transition(&mut self, mut next: MovementState, tick: &Tick<'_>) {
        next.as_state().enter(&mut self.body, tick);
        self.state = next;
    }

    /// Advance movement, then check for a bomb request and flame contact.
    ///
    /// Returns the cell to place a bomb on, if one was requested.
    pub fn update(
        &mut self,
        grid: &Grid,
        input: InputFrame,
        dt: f32,
        config: &ArenaConfig,
    ) -> Option<Cell> {
        let direction = movement::resolve_direction(|d| input.held.contains(direction_key(d)));
        let tick = Tick {
            grid,
            config,
            direction,
            dt,
        };

        if self.is_dead() {
            let _ = self.state.as_state().update(&mut self.body, &tick);
            return None;
        }

        if let Some(grace) = self.body.grace_cell
            && (self.cell() != grace || grid.get(grace) != CellType::Bomb)
        {
            self.body.grace_cell = None;
        }

        if let Some(next) = self.state.as_state().update(&mut self.body, &tick) {
            self.transition(next, &tick);
            // A fresh Moving state moves on the tick it is entered.
            if let MovementState::Moving(_) = self.state
                && let Some(after) = self.state.as_state().update(&mut self.body, &tick)
            {
                self.transition(after, &tick);
            }
        }

        let action_now = input.held.contains(Key::Action);
        let fresh_press = input.pressed.contains(Key::Action) || (action_now && !self.action_held);
        self.action_held = action_now;

        let request = (fresh_press
            && self.loadout.available > 0
            && grid.get(self.cell()) == CellType::Empty)
            .then(|| self.cell());

        if grid.get(self.cell()) == CellType::Flame {
            self.kill(&tick);
        }

        request
    }

    fn kill(&mut self, tick: &Tick<'_>) {
        if !self.is_dead() {
            self.transition(MovementState::Death(Death::new(tick.config.death_secs)), tick);
        }
    }

    /// A bomb this combatant requested was placed.
    pub fn bomb_placed(&mut self, cell: Cell) {
        self.loadout.available = self.loadout.available.saturating_sub(1);
        self.body.grace_cell = Some(cell);
    }

    /// One of this combatant's bombs exploded.
    pub fn bomb_returned(&mut self) {
        if self.loadout.available < self.loadout.capacity {
            self.loadout.available += 1;
        }
    }

    pub fn apply_powerup(&mut self, kind: PowerupKind, config: &ArenaConfig) {
        match kind {
            PowerupKind::Flame => {
                self.loadout.strength = self.loadout.strength.saturating_add(1);
            },
            PowerupKind::Bomb => {
                self.loadout.capacity = self.loadout.capacity.saturating_add(1);
                self.loadout.available = self.loadout.available.saturating_add(1);
            },
            PowerupKind::Speed => {
                self.body.speed_multiplier += config.speed_per_pickup;
            },
        }
    }
}

fn direction_key(dir: Direction) -> Key {
    match dir {
        Direction::Left => Key::Left,
        Direction::Right => Key::Right,
        Direction::Up => Key::Up,
        Direction::Down => Key::Down,
    }
}
