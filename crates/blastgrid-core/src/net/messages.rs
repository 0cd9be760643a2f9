use serde::{Deserialize, Serialize};

use crate::game_trait::{PlayerId, RoundOutcome};
use crate::input::InputUpdate;
use crate::room::{MatchStatus, Roster, SeatIndex, WinCounters};

/// Network message type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    // Client -> Server
    PlayerInput = 0x01,
    JoinRoom = 0x02,
    LeaveRoom = 0x03,
    TakeSeat = 0x04,
    SetReady = 0x05,
    MatchControl = 0x06,

    // Server -> Client
    Snapshot = 0x10,
    MatchStateChanged = 0x11,
    RoundStarted = 0x12,
    RoundEnded = 0x13,
    MatchEnded = 0x14,
    ActionResponse = 0x15,
    RosterUpdate = 0x16,
}

impl MessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::PlayerInput),
            0x02 => Some(Self::JoinRoom),
            0x03 => Some(Self::LeaveRoom),
            0x04 => Some(Self::TakeSeat),
            0x05 => Some(Self::SetReady),
            0x06 => Some(Self::MatchControl),
            0x10 => Some(Self::Snapshot),
            0x11 => Some(Self::MatchStateChanged),
            0x12 => Some(Self::RoundStarted),
            0x13 => Some(Self::RoundEnded),
            0x14 => Some(Self::MatchEnded),
            0x15 => Some(Self::ActionResponse),
            0x16 => Some(Self::RosterUpdate),
            _ => None,
        }
    }
}

// ============================================================================
// Client -> Server
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInputMsg {
    pub input: InputUpdate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRoomMsg {
    pub room_id: String,
    pub player_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveRoomMsg {
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakeSeatMsg {
    pub seat: SeatIndex,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetReadyMsg {
    pub ready: bool,
}

/// Host-initiated match transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchAction {
    Start,
    Pause,
    Resume,
}

impl std::fmt::Display for MatchAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchControlMsg {
    pub action: MatchAction,
}

/// Messages sent from a client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    PlayerInput(PlayerInputMsg),
    JoinRoom(JoinRoomMsg),
    LeaveRoom(LeaveRoomMsg),
    TakeSeat(TakeSeatMsg),
    SetReady(SetReadyMsg),
    MatchControl(MatchControlMsg),
}

impl ClientMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::PlayerInput(_) => MessageType::PlayerInput,
            Self::JoinRoom(_) => MessageType::JoinRoom,
            Self::LeaveRoom(_) => MessageType::LeaveRoom,
            Self::TakeSeat(_) => MessageType::TakeSeat,
            Self::SetReady(_) => MessageType::SetReady,
            Self::MatchControl(_) => MessageType::MatchControl,
        }
    }
}

// ============================================================================
// Server -> Client
// ============================================================================

/// Per-tick authoritative state. `round_state` is the round's own
/// MessagePack-encoded snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMsg {
    pub tick: u32,
    pub match_status: MatchStatus,
    pub win_counters: WinCounters,
    pub round_state: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchStateChangedMsg {
    pub from: MatchStatus,
    pub to: MatchStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundStartedMsg {
    pub round: u32,
    pub win_counters: WinCounters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundEndedMsg {
    pub round: u32,
    pub outcome: RoundOutcome,
    pub winner_seat: Option<SeatIndex>,
    pub win_counters: WinCounters,
}

/// One seat's line on the final scoreboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub seat: SeatIndex,
    pub player_id: Option<PlayerId>,
    pub wins: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEndedMsg {
    pub champion: Option<PlayerId>,
    pub rounds_played: u32,
    pub scoreboard: Vec<ScoreEntry>,
}

/// Verdict on a client request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponseMsg {
    pub success: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterUpdateMsg {
    pub roster: Roster,
}

/// Messages broadcast or replied by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    Snapshot(SnapshotMsg),
    MatchStateChanged(MatchStateChangedMsg),
    RoundStarted(RoundStartedMsg),
    RoundEnded(RoundEndedMsg),
    MatchEnded(MatchEndedMsg),
    ActionResponse(ActionResponseMsg),
    RosterUpdate(RosterUpdateMsg),
}

impl ServerMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Snapshot(_) => MessageType::Snapshot,
            Self::MatchStateChanged(_) => MessageType::MatchStateChanged,
            Self::RoundStarted(_) => MessageType::RoundStarted,
            Self::RoundEnded(_) => MessageType::RoundEnded,
            Self::MatchEnded(_) => MessageType::MatchEnded,
            Self::ActionResponse(_) => MessageType::ActionResponse,
            Self::RosterUpdate(_) => MessageType::RosterUpdate,
        }
    }
}
