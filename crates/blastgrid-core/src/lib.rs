pub mod game_trait;
pub mod input;
pub mod net;
pub mod player;
pub mod room;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use std::sync::Arc;

    use crate::game_trait::{
        PlayerId, RoundFactory, RoundOutcome, RoundSimulation, SeatAssignment,
    };
    use crate::input::InputUpdate;
    use crate::player::Player;
    use crate::room::{Roster, SeatIndex};

    /// Create `n` test players with sequential IDs starting at 1.
    pub fn make_players(n: usize) -> Vec<Player> {
        (0..n)
            .map(|i| Player::new(i as PlayerId + 1, format!("Player{}", i + 1)))
            .collect()
    }

    /// A roster with `n` players in seats `0..n`, host in seat 0, guests ready.
    pub fn make_roster(n: usize) -> Roster {
        let mut roster = Roster::default();
        for (i, player) in make_players(n).into_iter().enumerate() {
            let id = player.id;
            roster
                .take_seat(i as SeatIndex, player)
                .expect("fresh roster has free seats");
            if i > 0 {
                roster.set_ready(id, true).expect("player was just seated");
            }
        }
        roster
    }

    /// Seat assignments for `n` players in seats `0..n`.
    pub fn make_assignments(n: usize) -> Vec<SeatAssignment> {
        make_roster(n).assignments()
    }

    /// A round that ends after a fixed number of ticks with a chosen outcome.
    ///
    /// Drives the match lifecycle without any arena physics.
    #[derive(Debug, Clone)]
    pub struct ScriptedRound {
        pub players: Vec<PlayerId>,
        pub ticks: u32,
        pub end_after: u32,
        pub scripted: RoundOutcome,
        pub inputs_seen: u32,
        pub inputs_cleared: u32,
        pub tick_rate: f32,
        pub panic_at: Option<u32>,
        reported: Option<RoundOutcome>,
    }

    impl ScriptedRound {
        pub fn new(players: Vec<PlayerId>, end_after: u32, scripted: RoundOutcome) -> Self {
            Self {
                players,
                ticks: 0,
                end_after,
                scripted,
                inputs_seen: 0,
                inputs_cleared: 0,
                tick_rate: 60.0,
                panic_at: None,
                reported: None,
            }
        }

        /// Report `hz` from `tick_rate`.
        pub fn with_tick_rate(mut self, hz: f32) -> Self {
            self.tick_rate = hz;
            self
        }

        /// Panic inside `update` on the given tick.
        pub fn panicking_at(mut self, tick: u32) -> Self {
            self.panic_at = Some(tick);
            self
        }
    }

    impl RoundSimulation for ScriptedRound {
        fn apply_input(&mut self, player_id: PlayerId, _update: &InputUpdate) {
            if self.players.contains(&player_id) {
                self.inputs_seen += 1;
            }
        }

        fn update(&mut self, _dt: f32) -> Option<RoundOutcome> {
            if self.reported.is_some() {
                return None;
            }
            self.ticks += 1;
            if self.panic_at == Some(self.ticks) {
                panic!("scripted panic at tick {}", self.ticks);
            }
            let outcome = if self.players.len() <= 1 {
                Some(match self.players.first() {
                    Some(id) => RoundOutcome::Winner(*id),
                    None => RoundOutcome::Draw,
                })
            } else if self.ticks >= self.end_after {
                Some(self.scripted)
            } else {
                None
            };
            self.reported = outcome;
            outcome
        }

        fn clear_inputs(&mut self) {
            self.inputs_cleared += 1;
        }

        fn player_left(&mut self, player_id: PlayerId) {
            self.players.retain(|id| *id != player_id);
        }

        fn serialize_state(&self) -> Vec<u8> {
            rmp_serde::to_vec(&(self.ticks, &self.players)).unwrap_or_default()
        }

        fn outcome(&self) -> Option<RoundOutcome> {
            self.reported
        }

        fn tick_rate(&self) -> f32 {
            self.tick_rate
        }
    }

    /// Factory whose rounds are won by the seat-0 player after `end_after` ticks.
    pub fn seat_zero_wins_factory(end_after: u32) -> RoundFactory {
        Arc::new(move |seats: &[SeatAssignment], _round: u32| {
            let players: Vec<PlayerId> = seats.iter().map(|s| s.player_id).collect();
            let outcome = seats
                .iter()
                .find(|s| s.seat == 0)
                .map_or(RoundOutcome::Draw, |s| RoundOutcome::Winner(s.player_id));
            Box::new(ScriptedRound::new(players, end_after, outcome)) as Box<dyn RoundSimulation>
        })
    }

    /// Factory whose rounds never end on their own.
    pub fn endless_factory() -> RoundFactory {
        Arc::new(|seats: &[SeatAssignment], _round: u32| {
            let players: Vec<PlayerId> = seats.iter().map(|s| s.player_id).collect();
            Box::new(ScriptedRound::new(players, u32::MAX, RoundOutcome::Draw))
                as Box<dyn RoundSimulation>
        })
    }

    // ================================================================
    // RoundSimulation contract tests
    // ================================================================
    // Every RoundSimulation implementation must pass these. Simulation
    // crates call them from their own #[cfg(test)] modules.

    /// A freshly built round must serialize to non-empty bytes.
    pub fn contract_serialize_nonempty(round: &dyn RoundSimulation) {
        assert!(
            !round.serialize_state().is_empty(),
            "serialize_state() must return non-empty bytes"
        );
    }

    /// `update` yields `Some` exactly once and stays quiet afterwards.
    pub fn contract_outcome_reported_once(
        round: &mut dyn RoundSimulation,
        max_ticks: usize,
        dt: f32,
    ) -> RoundOutcome {
        let mut reported = None;
        for _ in 0..max_ticks {
            if let Some(outcome) = round.update(dt) {
                reported = Some(outcome);
                break;
            }
        }
        let outcome = reported.unwrap_or_else(|| panic!("round must end within {max_ticks} ticks"));
        for _ in 0..10 {
            assert_eq!(round.update(dt), None, "outcome must be reported only once");
        }
        assert_eq!(round.outcome(), Some(outcome));
        outcome
    }

    /// With all but one player gone, the survivor wins.
    pub fn contract_last_player_standing_wins(
        round: &mut dyn RoundSimulation,
        leavers: &[PlayerId],
        survivor: PlayerId,
        max_ticks: usize,
    ) {
        for id in leavers {
            round.player_left(*id);
        }
        let outcome = contract_outcome_reported_once(round, max_ticks, 1.0 / 60.0);
        assert_eq!(outcome, RoundOutcome::Winner(survivor));
    }

}
