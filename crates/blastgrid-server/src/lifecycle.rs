//! Match status state machine for a single room.
//!
//! Pure bookkeeping: status, win counters and round number. The room actor
//! decides when to call each operation and owns every timer.

use blastgrid_core::room::{MAX_SEATS, MatchStatus, SeatIndex, WinCounters};

use crate::error::Rejection;

/// An edge of the match state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Start,
    Pause,
    Resume,
    EndRound,
    NextRound,
    FinishMatch,
    Abandon,
}

impl Transition {
    pub const ALL: [Transition; 7] = [
        Transition::Start,
        Transition::Pause,
        Transition::Resume,
        Transition::EndRound,
        Transition::NextRound,
        Transition::FinishMatch,
        Transition::Abandon,
    ];

    /// Transitions only the server itself may trigger.
    pub fn is_system(&self) -> bool {
        matches!(
            self,
            Self::EndRound | Self::NextRound | Self::FinishMatch | Self::Abandon
        )
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::EndRound => "end the round",
            Self::NextRound => "start the next round",
            Self::FinishMatch => "finish the match",
            Self::Abandon => "abandon the match",
        };
        f.write_str(s)
    }
}

/// Who is asking for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Guest,
    System,
}

/// Room facts a transition is checked against.
#[derive(Debug, Clone, Copy)]
pub struct Gate {
    pub role: Role,
    pub seated: usize,
    pub guests_ready: bool,
}

impl Gate {
    pub fn system(seated: usize) -> Self {
        Self {
            role: Role::System,
            seated,
            guests_ready: true,
        }
    }
}

/// Destination of `transition` from `from`, if that edge exists.
pub fn target(from: MatchStatus, transition: Transition) -> Option<MatchStatus> {
    use MatchStatus::*;
    match (from, transition) {
        (Waiting, Transition::Start) => Some(Active),
        (Active, Transition::Pause) => Some(Paused),
        (Paused, Transition::Resume) => Some(Active),
        (Active, Transition::EndRound) => Some(RoundEnded),
        (RoundEnded, Transition::NextRound) => Some(Active),
        (RoundEnded, Transition::FinishMatch) => Some(GameEnded),
        (Active | Paused | RoundEnded, Transition::Abandon) => Some(Waiting),
        _ => None,
    }
}

/// Check a transition without applying it.
pub fn authorize(
    from: MatchStatus,
    transition: Transition,
    gate: &Gate,
) -> Result<MatchStatus, Rejection> {
    let to = target(from, transition).ok_or(Rejection::IllegalTransition { from, transition })?;

    if transition.is_system() {
        if gate.role != Role::System {
            return Err(Rejection::SystemOnly(transition));
        }
        return Ok(to);
    }

    // Disconnect handling pauses on the host's behalf.
    let system_pause = transition == Transition::Pause && gate.role == Role::System;
    if gate.role != Role::Host && !system_pause {
        return Err(Rejection::NotHost);
    }
    if gate.seated < 2 {
        return Err(Rejection::NotEnoughPlayers {
            seated: gate.seated,
        });
    }
    if transition == Transition::Start && !gate.guests_ready {
        return Err(Rejection::GuestsNotReady);
    }
    Ok(to)
}

/// A status change that was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: MatchStatus,
    pub to: MatchStatus,
}

/// What happens after a round's result is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundVerdict {
    /// The seat reached the win target.
    MatchOver { champion: SeatIndex },
    /// Another round follows after the round-end delay.
    NextRound,
}

/// Reaction to a player leaving, given how many remain seated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectPolicy {
    Continue,
    Pause,
    Abandon,
}

#[derive(Debug, Clone)]
pub struct MatchLifecycle {
    status: MatchStatus,
    wins: WinCounters,
    round: u32,
    max_wins: u8,
}

impl MatchLifecycle {
    pub fn new(max_wins: u8) -> Self {
        Self {
            status: MatchStatus::Waiting,
            wins: [0; MAX_SEATS],
            round: 0,
            max_wins,
        }
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    pub fn wins(&self) -> WinCounters {
        self.wins
    }

    /// Current round number, 1-based once a match has started.
    pub fn round(&self) -> u32 {
        self.round
    }

    fn apply(&mut self, transition: Transition, gate: &Gate) -> Result<StatusChange, Rejection> {
        let to = authorize(self.status, transition, gate)?;
        let change = StatusChange {
            from: self.status,
            to,
        };
        self.status = to;
        Ok(change)
    }

    /// Begin a fresh match: counters reset, round 1.
    pub fn start(&mut self, gate: &Gate) -> Result<StatusChange, Rejection> {
        let change = self.apply(Transition::Start, gate)?;
        self.wins = [0; MAX_SEATS];
        self.round = 1;
        Ok(change)
    }

    pub fn pause(&mut self, gate: &Gate) -> Result<StatusChange, Rejection> {
        self.apply(Transition::Pause, gate)
    }

    pub fn resume(&mut self, gate: &Gate) -> Result<StatusChange, Rejection> {
        self.apply(Transition::Resume, gate)
    }

    /// Count the round's result. `winner` is `None` for a draw.
    pub fn end_round(
        &mut self,
        winner: Option<SeatIndex>,
    ) -> Result<(StatusChange, RoundVerdict), Rejection> {
        let change = self.apply(Transition::EndRound, &Gate::system(0))?;
        let verdict = match winner.filter(|s| (*s as usize) < MAX_SEATS) {
            Some(seat) => {
                let counter = &mut self.wins[seat as usize];
                *counter = counter.saturating_add(1);
                if *counter >= self.max_wins {
                    RoundVerdict::MatchOver { champion: seat }
                } else {
                    RoundVerdict::NextRound
                }
            },
            None => RoundVerdict::NextRound,
        };
        Ok((change, verdict))
    }

    pub fn begin_next_round(&mut self) -> Result<StatusChange, Rejection> {
        let change = self.apply(Transition::NextRound, &Gate::system(0))?;
        self.round += 1;
        Ok(change)
    }

    pub fn finish_match(&mut self) -> Result<StatusChange, Rejection> {
        self.apply(Transition::FinishMatch, &Gate::system(0))
    }

    pub fn abandon(&mut self) -> Result<StatusChange, Rejection> {
        self.apply(Transition::Abandon, &Gate::system(0))
    }

    /// Decide how to react to a player leaving. Does not change status.
    pub fn disconnect_policy(&self, remaining: usize) -> DisconnectPolicy {
        match self.status {
            MatchStatus::Active if remaining >= 2 => DisconnectPolicy::Pause,
            MatchStatus::Active | MatchStatus::Paused | MatchStatus::RoundEnded
                if remaining < 2 =>
            {
                DisconnectPolicy::Abandon
            },
            _ => DisconnectPolicy::Continue,
        }
    }
}
