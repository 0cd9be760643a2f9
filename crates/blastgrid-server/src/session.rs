//! Per-connection message handling. The transport owns one `Session` per
//! client, feeds it raw frames and forwards the room's broadcast stream.

use bytes::Bytes;
use tokio::sync::broadcast;

use blastgrid_core::game_trait::PlayerId;
use blastgrid_core::net::messages::{ClientMessage, JoinRoomMsg, ServerMessage};
use blastgrid_core::net::protocol::{ProtocolError, decode_client_message};
use blastgrid_core::player::Player;
use blastgrid_core::room::SeatIndex;

use crate::error::{ActionResult, Rejection};
use crate::game_loop::RoomHandle;
use crate::state::AppState;

const MAX_NAME_CHARS: usize = 32;

pub struct Session {
    player_id: PlayerId,
    display_name: String,
    room: Option<RoomHandle>,
}

fn validate_name(raw: &str) -> Result<String, Rejection> {
    let name = raw.trim();
    let len = name.chars().count();
    if len == 0 || len > MAX_NAME_CHARS || name.chars().any(char::is_control) {
        return Err(Rejection::InvalidName);
    }
    Ok(name.to_string())
}

impl Session {
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            display_name: String::new(),
            room: None,
        }
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub fn room(&self) -> Option<&RoomHandle> {
        self.room.as_ref()
    }

    pub fn subscribe(&self) -> Option<broadcast::Receiver<Bytes>> {
        self.room.as_ref().map(RoomHandle::subscribe)
    }

    fn current_room(&self) -> Result<&RoomHandle, Rejection> {
        self.room.as_ref().ok_or(Rejection::NotInRoom)
    }

    /// Decode and apply one client frame. Returns the reply for the client,
    /// if the message warrants one.
    pub async fn handle(
        &mut self,
        state: &AppState,
        data: &[u8],
    ) -> Result<Option<ServerMessage>, ProtocolError> {
        let msg = decode_client_message(data)?;
        if let Some(room) = &self.room {
            room.touch();
        }

        let result: ActionResult = match msg {
            ClientMessage::PlayerInput(m) => {
                match &self.room {
                    Some(room) => room.send_input(self.player_id, m.input),
                    None => tracing::debug!(player_id = self.player_id, "Input outside a room"),
                }
                return Ok(None);
            },
            ClientMessage::JoinRoom(m) => self.join(state, m).await.into(),
            ClientMessage::LeaveRoom(m) => self.leave(m.player_id).await.into(),
            ClientMessage::TakeSeat(m) => self.take_seat(m.seat).await.into(),
            ClientMessage::SetReady(m) => match self.current_room() {
                Ok(room) => room.set_ready(self.player_id, m.ready).await.into(),
                Err(e) => ActionResult::rejected(&e),
            },
            ClientMessage::MatchControl(m) => match self.current_room() {
                Ok(room) => room.control(self.player_id, m.action).await,
                Err(e) => ActionResult::rejected(&e),
            },
        };
        Ok(Some(ServerMessage::ActionResponse(result.into())))
    }

    /// Join the named room, or create one when `room_id` is empty.
    async fn join(&mut self, state: &AppState, msg: JoinRoomMsg) -> Result<(), Rejection> {
        if self.room.is_some() {
            return Err(Rejection::AlreadyInRoom);
        }
        let name = validate_name(&msg.player_name)?;
        let player = Player::new(self.player_id, name.clone());

        let room = if msg.room_id.is_empty() {
            state.rooms.write().await.create_room(player)?
        } else {
            let room = state
                .rooms
                .read()
                .await
                .get(&msg.room_id)
                .ok_or_else(|| Rejection::RoomNotFound(msg.room_id.clone()))?;
            room.join(player).await?;
            room
        };
        tracing::info!(player_id = self.player_id, room = room.id(), "Session entered room");
        self.display_name = name;
        self.room = Some(room);
        Ok(())
    }

    async fn leave(&mut self, player_id: PlayerId) -> Result<(), Rejection> {
        if player_id != self.player_id {
            return Err(Rejection::ForeignPlayer(player_id));
        }
        self.current_room()?.leave(player_id).await?;
        self.room = None;
        Ok(())
    }

    async fn take_seat(&self, seat: SeatIndex) -> Result<(), Rejection> {
        let player = Player::new(self.player_id, self.display_name.clone());
        self.current_room()?.take_seat(player, seat).await
    }

    /// The transport lost this client.
    pub fn disconnected(&mut self) {
        if let Some(room) = self.room.take() {
            room.disconnect(self.player_id);
        }
    }
}
