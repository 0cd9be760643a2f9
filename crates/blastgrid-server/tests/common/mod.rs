use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use blastgrid_core::game_trait::{
    PlayerId, RoundFactory, RoundOutcome, RoundSimulation, SeatAssignment,
};
use blastgrid_core::net::messages::ServerMessage;
use blastgrid_core::net::protocol::decode_server_message;
use blastgrid_core::room::{MatchStatus, RoomConfig};
use blastgrid_core::test_helpers::{ScriptedRound, make_players};

use blastgrid_server::game_loop::{RoomHandle, spawn_room};

pub const WAIT: Duration = Duration::from_secs(3);

/// Fast ticks and a short round-end delay.
pub fn fast_config(max_wins: u8) -> RoomConfig {
    RoomConfig {
        max_wins,
        round_end_delay: Duration::from_millis(20),
        tick_rate_hz: Some(200.0),
        ..RoomConfig::default()
    }
}

/// A room with `n` players seated in order, every guest ready.
pub async fn seated_room(n: usize, factory: RoundFactory, config: RoomConfig) -> RoomHandle {
    let mut players = make_players(n).into_iter();
    let host = players.next().expect("at least one player");
    let (room, _task) = spawn_room(
        format!("room-{}", next_room_number()),
        host,
        config,
        factory,
        1024,
    );
    for p in players {
        let id = p.id;
        room.join(p).await.unwrap();
        room.set_ready(id, true).await.unwrap();
    }
    room
}

fn next_room_number() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

/// Rounds that panic on the given tick.
pub fn panicking_factory(tick: u32) -> RoundFactory {
    Arc::new(move |seats: &[SeatAssignment], _round: u32| {
        let players: Vec<PlayerId> = seats.iter().map(|s| s.player_id).collect();
        Box::new(ScriptedRound::new(players, u32::MAX, RoundOutcome::Draw).panicking_at(tick))
            as Box<dyn RoundSimulation>
    })
}

/// Rounds that end in a draw after `end_after` ticks.
pub fn draw_factory(end_after: u32) -> RoundFactory {
    Arc::new(move |seats: &[SeatAssignment], _round: u32| {
        let players: Vec<PlayerId> = seats.iter().map(|s| s.player_id).collect();
        Box::new(ScriptedRound::new(players, end_after, RoundOutcome::Draw))
            as Box<dyn RoundSimulation>
    })
}

/// Next decodable broadcast, skipping over lag.
pub async fn recv(rx: &mut broadcast::Receiver<Bytes>) -> ServerMessage {
    tokio::time::timeout(WAIT, async {
        loop {
            match rx.recv().await {
                Ok(data) => return decode_server_message(&data).unwrap(),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => panic!("room broadcast closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for a broadcast")
}

/// Collect broadcasts up to and including the first one matching `done`.
pub async fn recv_until(
    rx: &mut broadcast::Receiver<Bytes>,
    done: impl Fn(&ServerMessage) -> bool,
) -> Vec<ServerMessage> {
    let mut seen = Vec::new();
    loop {
        let msg = recv(rx).await;
        let finished = done(&msg);
        seen.push(msg);
        if finished {
            return seen;
        }
    }
}

/// Everything already queued on `rx`, without waiting.
pub fn drain(rx: &mut broadcast::Receiver<Bytes>) -> Vec<ServerMessage> {
    let mut seen = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(data) => seen.push(decode_server_message(&data).unwrap()),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => return seen,
        }
    }
}

pub async fn wait_for_status(room: &RoomHandle, status: MatchStatus) {
    tokio::time::timeout(WAIT, async {
        loop {
            if room.info().await.unwrap().status == status {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("room never reached {status}"));
}

/// Status transitions in broadcast order.
pub fn transitions(messages: &[ServerMessage]) -> Vec<(MatchStatus, MatchStatus)> {
    messages
        .iter()
        .filter_map(|m| match m {
            ServerMessage::MatchStateChanged(c) => Some((c.from, c.to)),
            _ => None,
        })
        .collect()
}
