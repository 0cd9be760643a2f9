use blastgrid_core::game_trait::PlayerId;
use blastgrid_core::net::messages::ActionResponseMsg;
use blastgrid_core::room::{MatchStatus, RosterError};

use crate::lifecycle::Transition;

/// Why a room refused a request. Rejected requests never mutate the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    IllegalTransition {
        from: MatchStatus,
        transition: Transition,
    },
    /// System transitions cannot be requested by a player.
    SystemOnly(Transition),
    NotHost,
    NotEnoughPlayers {
        seated: usize,
    },
    GuestsNotReady,
    /// Seats only change while the room is waiting.
    SeatingClosed(MatchStatus),
    Roster(RosterError),
    /// A session tried to act for a different player.
    ForeignPlayer(PlayerId),
    InvalidName,
    NotInRoom,
    AlreadyInRoom,
    RoomNotFound(String),
    RoomLimitReached(usize),
    RoomClosed,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IllegalTransition { from, transition } => {
                write!(f, "cannot {transition} while the match is {from}")
            },
            Self::SystemOnly(t) => write!(f, "{t} is performed by the server only"),
            Self::NotHost => write!(f, "only the host can do that"),
            Self::NotEnoughPlayers { seated } => {
                write!(f, "at least 2 seated players are required ({seated} seated)")
            },
            Self::GuestsNotReady => write!(f, "not every player is ready"),
            Self::SeatingClosed(status) => {
                write!(f, "seats cannot change while the match is {status}")
            },
            Self::Roster(e) => write!(f, "{e}"),
            Self::ForeignPlayer(id) => write!(f, "cannot act on behalf of player {id}"),
            Self::InvalidName => write!(f, "display name must be 1-32 printable characters"),
            Self::NotInRoom => write!(f, "not in a room"),
            Self::AlreadyInRoom => write!(f, "already in a room"),
            Self::RoomNotFound(id) => write!(f, "room {id} not found"),
            Self::RoomLimitReached(max) => write!(f, "room limit reached ({max})"),
            Self::RoomClosed => write!(f, "room is closed"),
        }
    }
}

impl std::error::Error for Rejection {}

impl From<RosterError> for Rejection {
    fn from(e: RosterError) -> Self {
        Self::Roster(e)
    }
}

/// Structured verdict relayed back to whoever issued a room request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResult {
    pub success: bool,
    pub message: Option<String>,
}

impl ActionResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn rejected(reason: &Rejection) -> Self {
        Self {
            success: false,
            message: Some(reason.to_string()),
        }
    }
}

impl<T> From<Result<T, Rejection>> for ActionResult {
    fn from(result: Result<T, Rejection>) -> Self {
        match result {
            Ok(_) => Self::ok(),
            Err(e) => Self::rejected(&e),
        }
    }
}

impl From<ActionResult> for ActionResponseMsg {
    fn from(result: ActionResult) -> Self {
        Self {
            success: result.success,
            message: result.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_messages_are_readable() {
        let r = Rejection::IllegalTransition {
            from: MatchStatus::Waiting,
            transition: Transition::Pause,
        };
        assert_eq!(r.to_string(), "cannot pause while the match is waiting");
        assert_eq!(
            Rejection::Roster(RosterError::SeatOccupied(2)).to_string(),
            "seat 2 is already occupied"
        );
    }

    #[test]
    fn action_result_from_result() {
        let ok: ActionResult = Ok::<(), Rejection>(()).into();
        assert_eq!(ok, ActionResult::ok());

        let err: ActionResult = Err::<(), _>(Rejection::NotHost).into();
        assert!(!err.success);
        assert_eq!(err.message.as_deref(), Some("only the host can do that"));

        let msg: ActionResponseMsg = err.into();
        assert!(!msg.success);
    }
}
