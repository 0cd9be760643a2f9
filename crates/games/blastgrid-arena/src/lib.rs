pub mod anim;
pub mod bombs;
pub mod combatant;
pub mod config;
pub mod grid;
pub mod level;
pub mod movement;
pub mod powerups;
pub mod snapshot;
pub mod terrain;

use std::collections::HashMap;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use blastgrid_core::game_trait::{
    PlayerId, RoundFactory, RoundOutcome, RoundSimulation, SeatAssignment,
};
use blastgrid_core::input::{InputBuffer, InputUpdate};
use blastgrid_core::room::MAX_SEATS;

use bombs::Bombs;
use combatant::Combatant;
use config::ArenaConfig;
use grid::Grid;
use level::Level;
use powerups::Powerups;
use snapshot::{BlockView, BombView, ExplosionView, PlayerView, PowerupView, RoundSnapshot};
use terrain::Terrain;

/// One round on the bomber grid.
pub struct ArenaRound {
    config: ArenaConfig,
    round: u32,
    grid: Grid,
    terrain: Terrain,
    powerups: Powerups,
    bombs: Bombs,
    players: Vec<Combatant>,
    inputs: HashMap<PlayerId, InputBuffer>,
    /// Seconds since round start.
    clock: f64,
    outcome: Option<RoundOutcome>,
}

impl ArenaRound {
    pub fn new(seats: &[SeatAssignment], round: u32, config: ArenaConfig) -> Self {
        let level = build_level(&config);
        let mut grid = level.grid.clone();
        let seed = config
            .seed
            .map_or_else(rand::random::<u64>, |s| s.wrapping_add(round as u64));
        let mut rng = StdRng::seed_from_u64(seed);
        let terrain = Terrain::seed(&mut grid, &level, &config, &mut rng);

        let players: Vec<Combatant> = seats
            .iter()
            .map(|s| {
                let spawn = level.spawns[s.seat as usize % MAX_SEATS];
                Combatant::spawn(s.player_id, s.seat, spawn, &config)
            })
            .collect();
        let inputs = players
            .iter()
            .map(|p| (p.id, InputBuffer::default()))
            .collect();

        tracing::debug!(
            round,
            seed,
            players = players.len(),
            blocks = terrain.len(),
            "Arena round created"
        );

        Self {
            powerups: Powerups::new(config.powerup_blink_secs),
            bombs: Bombs::new(
                config.fuse_secs,
                config.chain_delay_secs,
                config.explosion_secs,
            ),
            config,
            round,
            grid,
            terrain,
            players,
            inputs,
            clock: 0.0,
            outcome: None,
        }
    }

    /// Factory building arena rounds from a shared config.
    pub fn factory(config: ArenaConfig) -> RoundFactory {
        Arc::new(move |seats: &[SeatAssignment], round: u32| {
            Box::new(ArenaRound::new(seats, round, config.clone())) as Box<dyn RoundSimulation>
        })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn players(&self) -> &[Combatant] {
        &self.players
    }

    pub fn bombs(&self) -> &Bombs {
        &self.bombs
    }

    pub fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot {
            round: self.round,
            clock: self.clock,
            grid: self.grid.codes(),
            players: self
                .players
                .iter()
                .map(|p| PlayerView {
                    id: p.id,
                    seat: p.seat,
                    position: p.body.position,
                    facing: p.body.facing,
                    movement_state: p.state().name().to_string(),
                    frame_key: p.frame_key(),
                })
                .collect(),
            bombs: self
                .bombs
                .bombs()
                .iter()
                .map(|b| BombView {
                    cell: b.cell,
                    frame: self.bombs.bomb_frame(b, self.clock),
                })
                .collect(),
            explosions: self
                .bombs
                .explosions()
                .iter()
                .map(|e| ExplosionView {
                    cell: e.center,
                    frame: e.animation.frame(),
                    flame_cells: e.flames.clone(),
                })
                .collect(),
            blocks: self
                .terrain
                .blocks()
                .map(|b| BlockView {
                    cell: b.cell,
                    powerup: b.powerup.map(|k| k.cell_type().code()),
                    destruction_frame: b.destruction.map(|a| a.frame()),
                })
                .collect(),
            powerups: self
                .powerups
                .pickups()
                .iter()
                .map(|p| PowerupView {
                    cell: p.cell,
                    kind: p.kind.cell_type().code(),
                    frame: self.powerups.blink_frame(p),
                })
                .collect(),
            outcome: self.outcome,
        }
    }

    fn collect_powerups(&mut self) {
        let half = self.config.hitbox_half;
        for player in self.players.iter_mut().filter(|p| !p.is_dead()) {
            for kind in self.powerups.collect(&player.hitbox(half)) {
                tracing::trace!(player_id = player.id, ?kind, "Powerup collected");
                player.apply_powerup(kind, &self.config);
            }
        }
    }

    fn update_players(&mut self, dt: f32) {
        // Render order: top to bottom, ties by id.
        self.players.sort_by(|a, b| {
            a.body
                .position
                .y
                .total_cmp(&b.body.position.y)
                .then(a.id.cmp(&b.id))
        });

        for player in &mut self.players {
            let frame = self
                .inputs
                .get_mut(&player.id)
                .map(InputBuffer::take_frame)
                .unwrap_or_default();
            let Some(cell) = player.update(&self.grid, frame, dt, &self.config) else {
                continue;
            };
            match self.bombs.place(
                &mut self.grid,
                cell,
                player.id,
                player.loadout.strength,
                self.clock,
            ) {
                Ok(()) => player.bomb_placed(cell),
                Err(e) => {
                    tracing::debug!(player_id = player.id, error = %e, "Bomb placement rejected");
                },
            }
        }

        self.players.retain(|p| !p.death_finished());
    }

    fn check_round_over(&self) -> Option<RoundOutcome> {
        let mut alive = self.players.iter().filter(|p| !p.is_dead());
        match (alive.next(), alive.next()) {
            (Some(_), Some(_)) => None,
            (Some(survivor), None) => Some(RoundOutcome::Winner(survivor.id)),
            (None, _) => Some(RoundOutcome::Draw),
        }
    }
}

fn build_level(config: &ArenaConfig) -> Level {
    if let Some(layout) = &config.layout {
        match Level::parse(layout) {
            Ok(level) => return level,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid arena layout, using generated level");
            },
        }
    }
    Level::generate(config.rows, config.cols)
}

/// MessagePack bytes for a round snapshot. An encode failure is logged and
/// yields empty bytes.
fn encode_state<T: Serialize>(round: u32, state: &T) -> Vec<u8> {
    match rmp_serde::to_vec(state) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(round, error = %e, "Failed to encode round snapshot");
            Vec::new()
        },
    }
}

impl RoundSimulation for ArenaRound {
    fn apply_input(&mut self, player_id: PlayerId, update: &InputUpdate) {
        match self.inputs.get_mut(&player_id) {
            Some(buffer) => buffer.apply(update),
            None => tracing::debug!(player_id, "Input for player not in round dropped"),
        }
    }

    fn update(&mut self, dt: f32) -> Option<RoundOutcome> {
        if self.outcome.is_some() {
            return None;
        }
        self.clock += dt as f64;

        for pickup in self.terrain.update(&mut self.grid, dt) {
            self.powerups.spawn(pickup);
        }
        let detonated = self
            .bombs
            .update(&mut self.grid, &mut self.terrain, self.clock, dt);
        for owner in detonated {
            if let Some(player) = self.players.iter_mut().find(|p| p.id == owner) {
                player.bomb_returned();
            }
        }
        self.powerups.update(dt);
        self.collect_powerups();
        self.update_players(dt);

        let outcome = self.check_round_over()?;
        tracing::debug!(round = self.round, ?outcome, clock = self.clock, "Round over");
        self.outcome = Some(outcome);
        Some(outcome)
    }

    fn clear_inputs(&mut self) {
        for buffer in self.inputs.values_mut() {
            buffer.clear();
        }
    }

    fn player_left(&mut self, player_id: PlayerId) {
        self.players.retain(|p| p.id != player_id);
        self.inputs.remove(&player_id);
    }

    fn serialize_state(&self) -> Vec<u8> {
        encode_state(self.round, &self.snapshot())
    }

    fn outcome(&self) -> Option<RoundOutcome> {
        self.outcome
    }

    fn tick_rate(&self) -> f32 {
        self.config.tick_rate
    }
}
