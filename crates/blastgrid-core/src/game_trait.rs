use serde::{Deserialize, Serialize};

use crate::input::InputUpdate;
use crate::room::SeatIndex;

/// Unique identifier for a player in a room.
pub type PlayerId = u64;

/// A player placed into a round at a fixed seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatAssignment {
    pub seat: SeatIndex,
    pub player_id: PlayerId,
}

/// How a round finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundOutcome {
    /// Exactly one combatant survived.
    Winner(PlayerId),
    /// Nobody survived (simultaneous deaths).
    Draw,
}

impl RoundOutcome {
    pub fn winner(&self) -> Option<PlayerId> {
        match self {
            Self::Winner(id) => Some(*id),
            Self::Draw => None,
        }
    }
}

/// One round of play, driven tick by tick by its owning room.
///
/// The room owns timing, pausing and round sequencing; the simulation only
/// advances its own entities and reports when the round is over.
pub trait RoundSimulation: Send {
    /// Buffer an input update for a player. Applied on the next `update`.
    fn apply_input(&mut self, player_id: PlayerId, update: &InputUpdate);

    /// Advance the simulation by `dt` seconds.
    ///
    /// Returns `Some` exactly once, on the tick the round ends.
    fn update(&mut self, dt: f32) -> Option<RoundOutcome>;

    /// Forget buffered input for every player. Called when play halts so
    /// keys held or pressed before the halt do not carry over.
    fn clear_inputs(&mut self);

    /// Remove a player who disconnected. They count as dead from now on.
    fn player_left(&mut self, player_id: PlayerId);

    /// Serialize the authoritative round state for broadcast.
    fn serialize_state(&self) -> Vec<u8>;

    /// Outcome already reported by `update`, if any.
    fn outcome(&self) -> Option<RoundOutcome>;

    /// Simulation tick rate in Hz.
    fn tick_rate(&self) -> f32 {
        60.0
    }
}

/// Builds a fresh round for the given seats. `round_number` starts at 1.
pub type RoundFactory =
    std::sync::Arc<dyn Fn(&[SeatAssignment], u32) -> Box<dyn RoundSimulation> + Send + Sync>;
