use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::game_trait::{PlayerId, SeatAssignment};
use crate::player::{Player, Seat};

/// Number of seats in a room.
pub const MAX_SEATS: usize = 4;

/// Seat slot index, `0..MAX_SEATS`.
pub type SeatIndex = u8;

/// Win counters indexed by seat.
pub type WinCounters = [u8; MAX_SEATS];

/// Match configuration for a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Round wins needed to clinch the match.
    pub max_wins: u8,
    /// Delay between a round ending and the next one starting.
    pub round_end_delay: Duration,
    /// Upper bound on the wall-clock delta fed into a single tick.
    pub max_tick_delta: Duration,
    /// Overrides the round's own tick rate when set.
    pub tick_rate_hz: Option<f32>,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_wins: 3,
            round_end_delay: Duration::from_secs(3),
            max_tick_delta: Duration::from_millis(100),
            tick_rate_hz: None,
        }
    }
}

/// Lifecycle status of a room's match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStatus {
    Waiting,
    Active,
    Paused,
    RoundEnded,
    GameEnded,
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::RoundEnded => "round-ended",
            Self::GameEnded => "game-ended",
        };
        f.write_str(s)
    }
}

/// Seating rule violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterError {
    InvalidSeat(SeatIndex),
    SeatOccupied(SeatIndex),
    AlreadySeated(PlayerId),
    RoomFull,
    NotSeated(PlayerId),
}

impl std::fmt::Display for RosterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSeat(s) => write!(f, "seat {s} does not exist"),
            Self::SeatOccupied(s) => write!(f, "seat {s} is already occupied"),
            Self::AlreadySeated(id) => write!(f, "player {id} is already seated"),
            Self::RoomFull => write!(f, "room is full"),
            Self::NotSeated(id) => write!(f, "player {id} is not seated in this room"),
        }
    }
}

impl std::error::Error for RosterError {}

/// Who sits where, who is host, and who is ready.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    seats: [Option<Seat>; MAX_SEATS],
    host_id: Option<PlayerId>,
}

impl Roster {
    /// A roster with `host` in seat 0.
    pub fn with_host(host: Player) -> Self {
        let host_id = host.id;
        let mut roster = Self::default();
        roster.seats[0] = Some(Seat::new(host));
        roster.host_id = Some(host_id);
        roster
    }

    pub fn seats(&self) -> &[Option<Seat>; MAX_SEATS] {
        &self.seats
    }

    pub fn host_id(&self) -> Option<PlayerId> {
        self.host_id
    }

    pub fn is_host(&self, player_id: PlayerId) -> bool {
        self.host_id == Some(player_id)
    }

    pub fn seat_of(&self, player_id: PlayerId) -> Option<SeatIndex> {
        self.seats
            .iter()
            .position(|s| s.as_ref().is_some_and(|s| s.player.id == player_id))
            .map(|i| i as SeatIndex)
    }

    pub fn player_at(&self, seat: SeatIndex) -> Option<&Player> {
        self.seats
            .get(seat as usize)
            .and_then(|s| s.as_ref())
            .map(|s| &s.player)
    }

    pub fn seated_count(&self) -> usize {
        self.seats.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.seated_count() == 0
    }

    pub fn first_free_seat(&self) -> Option<SeatIndex> {
        self.seats
            .iter()
            .position(Option::is_none)
            .map(|i| i as SeatIndex)
    }

    /// Seat `player` at a specific seat. Occupied seats are never overwritten.
    pub fn take_seat(&mut self, seat: SeatIndex, player: Player) -> Result<(), RosterError> {
        if self.seat_of(player.id).is_some() {
            return Err(RosterError::AlreadySeated(player.id));
        }
        let slot = self
            .seats
            .get_mut(seat as usize)
            .ok_or(RosterError::InvalidSeat(seat))?;
        if slot.is_some() {
            return Err(RosterError::SeatOccupied(seat));
        }
        let player_id = player.id;
        *slot = Some(Seat::new(player));
        if self.host_id.is_none() {
            self.host_id = Some(player_id);
        }
        Ok(())
    }

    /// Seat `player` in the first free seat.
    pub fn join(&mut self, player: Player) -> Result<SeatIndex, RosterError> {
        let seat = self.first_free_seat().ok_or(RosterError::RoomFull)?;
        self.take_seat(seat, player)?;
        Ok(seat)
    }

    /// Move a seated player to another free seat, keeping host and ready flags.
    pub fn move_seat(&mut self, player_id: PlayerId, seat: SeatIndex) -> Result<(), RosterError> {
        let from = self
            .seat_of(player_id)
            .ok_or(RosterError::NotSeated(player_id))?;
        if from == seat {
            return Ok(());
        }
        match self.seats.get(seat as usize) {
            None => return Err(RosterError::InvalidSeat(seat)),
            Some(Some(_)) => return Err(RosterError::SeatOccupied(seat)),
            Some(None) => {},
        }
        self.seats.swap(from as usize, seat as usize);
        Ok(())
    }

    pub fn set_ready(&mut self, player_id: PlayerId, ready: bool) -> Result<(), RosterError> {
        let seat = self
            .seats
            .iter_mut()
            .flatten()
            .find(|s| s.player.id == player_id)
            .ok_or(RosterError::NotSeated(player_id))?;
        seat.ready = ready;
        Ok(())
    }

    /// Free a player's seat. If the host leaves, the lowest occupied seat
    /// becomes host. Returns the freed seat.
    pub fn remove(&mut self, player_id: PlayerId) -> Option<SeatIndex> {
        let seat = self.seat_of(player_id)?;
        self.seats[seat as usize] = None;
        if self.host_id == Some(player_id) {
            self.host_id = self.seats.iter().flatten().map(|s| s.player.id).next();
        }
        Some(seat)
    }

    /// Every seated player other than the host is ready.
    pub fn all_guests_ready(&self) -> bool {
        self.seats
            .iter()
            .flatten()
            .filter(|s| Some(s.player.id) != self.host_id)
            .all(|s| s.ready)
    }

    /// Clear ready flags, used when a match returns to waiting.
    pub fn reset_ready(&mut self) {
        for seat in self.seats.iter_mut().flatten() {
            seat.ready = false;
        }
    }

    /// Seat-ordered assignments for building a round.
    pub fn assignments(&self) -> Vec<SeatAssignment> {
        self.seats
            .iter()
            .enumerate()
            .filter_map(|(i, s)| {
                s.as_ref().map(|s| SeatAssignment {
                    seat: i as SeatIndex,
                    player_id: s.player.id,
                })
            })
            .collect()
    }
}

/// Generate a new unique room id.
pub fn generate_room_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Player {
        Player::new(1, "Alice")
    }

    fn bob() -> Player {
        Player::new(2, "Bob")
    }

    #[test]
    fn host_sits_in_seat_zero() {
        let roster = Roster::with_host(alice());
        assert_eq!(roster.seat_of(1), Some(0));
        assert!(roster.is_host(1));
        assert_eq!(roster.seated_count(), 1);
    }

    #[test]
    fn join_takes_first_free_seat() {
        let mut roster = Roster::with_host(alice());
        assert_eq!(roster.join(bob()), Ok(1));
        assert_eq!(roster.player_at(1).map(|p| p.id), Some(2));
    }

    #[test]
    fn occupied_seat_rejected_without_mutation() {
        let mut roster = Roster::with_host(alice());
        let before = roster.clone();
        let err = roster.take_seat(0, bob()).unwrap_err();
        assert_eq!(err, RosterError::SeatOccupied(0));
        assert_eq!(roster, before);
    }

    #[test]
    fn invalid_seat_rejected() {
        let mut roster = Roster::default();
        assert_eq!(
            roster.take_seat(MAX_SEATS as SeatIndex, bob()),
            Err(RosterError::InvalidSeat(MAX_SEATS as SeatIndex))
        );
    }

    #[test]
    fn double_seating_rejected() {
        let mut roster = Roster::with_host(alice());
        assert_eq!(roster.join(alice()), Err(RosterError::AlreadySeated(1)));
    }

    #[test]
    fn full_room_rejects_join() {
        let mut roster = Roster::with_host(alice());
        for id in 2..=4 {
            roster.join(Player::new(id, format!("P{id}"))).unwrap();
        }
        assert_eq!(roster.join(Player::new(9, "Late")), Err(RosterError::RoomFull));
    }

    #[test]
    fn host_migrates_to_lowest_seat() {
        let mut roster = Roster::with_host(alice());
        roster.join(bob()).unwrap();
        roster.join(Player::new(3, "Cara")).unwrap();
        assert_eq!(roster.remove(1), Some(0));
        assert_eq!(roster.host_id(), Some(2));
    }

    #[test]
    fn last_player_leaving_clears_host() {
        let mut roster = Roster::with_host(alice());
        roster.remove(1);
        assert!(roster.is_empty());
        assert_eq!(roster.host_id(), None);
    }

    #[test]
    fn guests_ready_ignores_host() {
        let mut roster = Roster::with_host(alice());
        roster.join(bob()).unwrap();
        assert!(!roster.all_guests_ready());
        roster.set_ready(2, true).unwrap();
        assert!(roster.all_guests_ready());
        assert_eq!(roster.set_ready(42, true), Err(RosterError::NotSeated(42)));
    }

    #[test]
    fn assignments_are_seat_ordered() {
        let mut roster = Roster::default();
        roster.take_seat(2, bob()).unwrap();
        roster.take_seat(0, alice()).unwrap();
        let seats: Vec<SeatIndex> = roster.assignments().iter().map(|a| a.seat).collect();
        assert_eq!(seats, vec![0, 2]);
        // First player seated becomes host when none was set.
        assert_eq!(roster.host_id(), Some(2));
    }

    #[test]
    fn move_seat_keeps_host() {
        let mut roster = Roster::with_host(alice());
        roster.join(bob()).unwrap();
        assert_eq!(roster.move_seat(1, 1), Err(RosterError::SeatOccupied(1)));
        assert_eq!(roster.move_seat(1, 9), Err(RosterError::InvalidSeat(9)));
        roster.move_seat(1, 3).unwrap();
        assert_eq!(roster.seat_of(1), Some(3));
        assert!(roster.is_host(1));
        assert_eq!(roster.move_seat(7, 2), Err(RosterError::NotSeated(7)));
    }

    #[test]
    fn room_ids_are_unique() {
        assert_ne!(generate_room_id(), generate_room_id());
    }
}
