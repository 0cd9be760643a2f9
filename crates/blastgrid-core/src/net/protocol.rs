use serde::{Deserialize, Serialize};

use super::messages::{
    ActionResponseMsg, ClientMessage, JoinRoomMsg, LeaveRoomMsg, MatchControlMsg,
    MatchEndedMsg, MatchStateChangedMsg, MessageType, PlayerInputMsg, RosterUpdateMsg,
    RoundEndedMsg, RoundStartedMsg, ServerMessage, SetReadyMsg, SnapshotMsg, TakeSeatMsg,
};

/// Default simulation tick rate in Hz.
pub const DEFAULT_TICK_RATE_HZ: u32 = 60;

/// Maximum message payload size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

#[derive(Debug)]
pub enum ProtocolError {
    EmptyMessage,
    UnknownMessageType(u8),
    PayloadTooLarge(usize),
    SerializeError(String),
    DeserializeError(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::UnknownMessageType(b) => write!(f, "unknown message type: 0x{b:02x}"),
            Self::PayloadTooLarge(size) => {
                write!(
                    f,
                    "payload too large: {size} bytes (max {MAX_MESSAGE_SIZE})"
                )
            },
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
            Self::DeserializeError(e) => write!(f, "deserialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Encode a serializable payload with a 1-byte type prefix.
pub fn encode_message<T: Serialize>(
    msg_type: MessageType,
    payload: &T,
) -> Result<Vec<u8>, ProtocolError> {
    let payload_bytes =
        rmp_serde::to_vec(payload).map_err(|e| ProtocolError::SerializeError(e.to_string()))?;
    let total = 1 + payload_bytes.len();
    if total > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(total));
    }
    let mut buf = Vec::with_capacity(total);
    buf.push(msg_type as u8);
    buf.extend_from_slice(&payload_bytes);
    Ok(buf)
}

/// Encode a `ClientMessage` to wire format.
pub fn encode_client_message(msg: &ClientMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ClientMessage::PlayerInput(m) => encode_message(MessageType::PlayerInput, m),
        ClientMessage::JoinRoom(m) => encode_message(MessageType::JoinRoom, m),
        ClientMessage::LeaveRoom(m) => encode_message(MessageType::LeaveRoom, m),
        ClientMessage::TakeSeat(m) => encode_message(MessageType::TakeSeat, m),
        ClientMessage::SetReady(m) => encode_message(MessageType::SetReady, m),
        ClientMessage::MatchControl(m) => encode_message(MessageType::MatchControl, m),
    }
}

/// Encode a `ServerMessage` to wire format.
pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ServerMessage::Snapshot(m) => encode_message(MessageType::Snapshot, m),
        ServerMessage::MatchStateChanged(m) => encode_message(MessageType::MatchStateChanged, m),
        ServerMessage::RoundStarted(m) => encode_message(MessageType::RoundStarted, m),
        ServerMessage::RoundEnded(m) => encode_message(MessageType::RoundEnded, m),
        ServerMessage::MatchEnded(m) => encode_message(MessageType::MatchEnded, m),
        ServerMessage::ActionResponse(m) => encode_message(MessageType::ActionResponse, m),
        ServerMessage::RosterUpdate(m) => encode_message(MessageType::RosterUpdate, m),
    }
}

/// Extract the message type byte from raw wire data.
pub fn decode_message_type(data: &[u8]) -> Result<MessageType, ProtocolError> {
    let first = *data.first().ok_or(ProtocolError::EmptyMessage)?;
    MessageType::from_byte(first).ok_or(ProtocolError::UnknownMessageType(first))
}

/// Decode a MessagePack payload (bytes after the type prefix).
pub fn decode_payload<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    rmp_serde::from_slice(&data[1..]).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

/// Decode raw wire data into a `ClientMessage`.
pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::PlayerInput => Ok(ClientMessage::PlayerInput(
            decode_payload::<PlayerInputMsg>(data)?,
        )),
        MessageType::JoinRoom => Ok(ClientMessage::JoinRoom(decode_payload::<JoinRoomMsg>(
            data,
        )?)),
        MessageType::LeaveRoom => Ok(ClientMessage::LeaveRoom(decode_payload::<LeaveRoomMsg>(
            data,
        )?)),
        MessageType::TakeSeat => Ok(ClientMessage::TakeSeat(decode_payload::<TakeSeatMsg>(
            data,
        )?)),
        MessageType::SetReady => Ok(ClientMessage::SetReady(decode_payload::<SetReadyMsg>(
            data,
        )?)),
        MessageType::MatchControl => Ok(ClientMessage::MatchControl(decode_payload::<
            MatchControlMsg,
        >(data)?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}

/// Decode raw wire data into a `ServerMessage`.
pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::Snapshot => Ok(ServerMessage::Snapshot(decode_payload::<SnapshotMsg>(
            data,
        )?)),
        MessageType::MatchStateChanged => Ok(ServerMessage::MatchStateChanged(decode_payload::<
            MatchStateChangedMsg,
        >(data)?)),
        MessageType::RoundStarted => Ok(ServerMessage::RoundStarted(decode_payload::<
            RoundStartedMsg,
        >(data)?)),
        MessageType::RoundEnded => Ok(ServerMessage::RoundEnded(decode_payload::<RoundEndedMsg>(
            data,
        )?)),
        MessageType::MatchEnded => Ok(ServerMessage::MatchEnded(decode_payload::<MatchEndedMsg>(
            data,
        )?)),
        MessageType::ActionResponse => Ok(ServerMessage::ActionResponse(decode_payload::<
            ActionResponseMsg,
        >(data)?)),
        MessageType::RosterUpdate => Ok(ServerMessage::RosterUpdate(decode_payload::<
            RosterUpdateMsg,
        >(data)?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}
