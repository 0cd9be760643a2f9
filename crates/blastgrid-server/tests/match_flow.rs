//! End-to-end match lifecycle tests: a room actor driven through whole
//! matches with scripted rounds, plus one run against the real arena.

#[allow(dead_code)]
mod common;

use std::time::Duration;

use blastgrid_arena::ArenaRound;
use blastgrid_arena::config::ArenaConfig;
use blastgrid_arena::snapshot::RoundSnapshot;
use blastgrid_core::game_trait::RoundOutcome;
use blastgrid_core::input::{InputUpdate, Key};
use blastgrid_core::net::messages::{ServerMessage, SnapshotMsg};
use blastgrid_core::room::MatchStatus;
use blastgrid_core::test_helpers::{endless_factory, seat_zero_wins_factory};

use common::{
    draw_factory, drain, fast_config, panicking_factory, recv, recv_until, seated_room,
    transitions, wait_for_status,
};

#[tokio::test]
async fn seat_zero_wins_two_rounds_and_the_match() {
    let room = seated_room(2, seat_zero_wins_factory(3), fast_config(2)).await;
    let mut rx = room.subscribe();
    assert!(room.start(1).await.success);

    let seen = recv_until(&mut rx, |m| matches!(m, ServerMessage::MatchEnded(_))).await;

    assert_eq!(
        transitions(&seen),
        vec![
            (MatchStatus::Waiting, MatchStatus::Active),
            (MatchStatus::Active, MatchStatus::RoundEnded),
            (MatchStatus::RoundEnded, MatchStatus::Active),
            (MatchStatus::Active, MatchStatus::RoundEnded),
            (MatchStatus::RoundEnded, MatchStatus::GameEnded),
        ]
    );

    let started: Vec<u32> = seen
        .iter()
        .filter_map(|m| match m {
            ServerMessage::RoundStarted(r) => Some(r.round),
            _ => None,
        })
        .collect();
    assert_eq!(started, vec![1, 2]);

    let ended: Vec<_> = seen
        .iter()
        .filter_map(|m| match m {
            ServerMessage::RoundEnded(r) => Some((r.round, r.winner_seat, r.win_counters)),
            _ => None,
        })
        .collect();
    assert_eq!(
        ended,
        vec![(1, Some(0), [1, 0, 0, 0]), (2, Some(0), [2, 0, 0, 0])]
    );

    match seen.last() {
        Some(ServerMessage::MatchEnded(m)) => {
            assert_eq!(m.champion, Some(1));
            assert_eq!(m.rounds_played, 2);
            assert_eq!(m.scoreboard.len(), 4);
            assert_eq!(m.scoreboard[0].wins, 2);
            assert_eq!(m.scoreboard[0].player_id, Some(1));
            assert_eq!(m.scoreboard[1].wins, 0);
        },
        other => panic!("expected match end, got {other:?}"),
    }

    // No third round: the loop has stopped.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let late = drain(&mut rx);
    assert!(
        !late
            .iter()
            .any(|m| matches!(m, ServerMessage::RoundStarted(_) | ServerMessage::Snapshot(_))),
        "room kept running after the match ended: {late:?}"
    );
    let info = room.info().await.unwrap();
    assert_eq!(info.status, MatchStatus::GameEnded);
    assert_eq!(info.round, 2);
    assert_eq!(info.win_counters, [2, 0, 0, 0]);
}

#[tokio::test]
async fn game_ended_is_terminal() {
    let room = seated_room(2, seat_zero_wins_factory(1), fast_config(1)).await;
    assert!(room.start(1).await.success);
    wait_for_status(&room, MatchStatus::GameEnded).await;

    for result in [room.start(1).await, room.pause(1).await, room.resume(1).await] {
        assert!(!result.success);
    }
}

#[tokio::test]
async fn draws_count_for_nobody() {
    let room = seated_room(2, draw_factory(2), fast_config(1)).await;
    let mut rx = room.subscribe();
    assert!(room.start(1).await.success);

    let seen = recv_until(&mut rx, |m| matches!(m, ServerMessage::RoundStarted(r) if r.round == 2))
        .await;
    let first_end = seen.iter().find_map(|m| match m {
        ServerMessage::RoundEnded(r) => Some(r.clone()),
        _ => None,
    });
    let first_end = first_end.expect("round 1 ended");
    assert_eq!(first_end.outcome, RoundOutcome::Draw);
    assert_eq!(first_end.winner_seat, None);
    assert_eq!(first_end.win_counters, [0; 4]);
    room.close();
}

#[tokio::test]
async fn pause_freezes_ticks_until_resume() {
    let room = seated_room(2, endless_factory(), fast_config(3)).await;
    assert!(room.start(1).await.success);
    tokio::time::sleep(Duration::from_millis(30)).await;

    let guest_pause = room.pause(2).await;
    assert!(!guest_pause.success);

    assert!(room.pause(1).await.success);
    let frozen = room.info().await.unwrap();
    assert_eq!(frozen.status, MatchStatus::Paused);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(room.info().await.unwrap().tick, frozen.tick);

    assert!(room.resume(1).await.success);
    tokio::time::sleep(Duration::from_millis(50)).await;
    let resumed = room.info().await.unwrap();
    assert_eq!(resumed.status, MatchStatus::Active);
    assert!(resumed.tick > frozen.tick);
}

#[tokio::test]
async fn disconnect_with_two_left_pauses() {
    let room = seated_room(3, endless_factory(), fast_config(3)).await;
    assert!(room.start(1).await.success);

    room.disconnect(3);
    let info = room.info().await.unwrap();
    assert_eq!(info.status, MatchStatus::Paused);
    assert_eq!(info.roster.seated_count(), 2);

    assert!(room.resume(1).await.success);
    assert_eq!(room.info().await.unwrap().status, MatchStatus::Active);
}

#[tokio::test]
async fn disconnect_leaving_one_player_abandons() {
    let room = seated_room(2, endless_factory(), fast_config(3)).await;
    let mut rx = room.subscribe();
    assert!(room.start(1).await.success);

    room.disconnect(2);
    let seen = recv_until(&mut rx, |m| {
        matches!(m, ServerMessage::MatchStateChanged(c) if c.to == MatchStatus::Waiting)
    })
    .await;
    assert_eq!(
        transitions(&seen).last(),
        Some(&(MatchStatus::Active, MatchStatus::Waiting))
    );
    let info = room.info().await.unwrap();
    assert_eq!(info.status, MatchStatus::Waiting);
    assert_eq!(info.roster.seated_count(), 1);
}

#[tokio::test]
async fn host_leaving_migrates_host() {
    let room = seated_room(3, endless_factory(), fast_config(3)).await;
    room.leave(1).await.unwrap();
    let info = room.info().await.unwrap();
    assert_eq!(info.roster.host_id(), Some(2));
    assert!(!room.start(3).await.success);
}

#[tokio::test]
async fn leaving_during_round_end_cancels_next_round() {
    let mut config = fast_config(3);
    config.round_end_delay = Duration::from_millis(150);
    let room = seated_room(2, seat_zero_wins_factory(2), config).await;
    let mut rx = room.subscribe();
    assert!(room.start(1).await.success);

    recv_until(&mut rx, |m| matches!(m, ServerMessage::RoundEnded(_))).await;
    room.leave(2).await.unwrap();
    assert_eq!(room.info().await.unwrap().status, MatchStatus::Waiting);

    tokio::time::sleep(Duration::from_millis(250)).await;
    let late = drain(&mut rx);
    assert!(!late.iter().any(|m| matches!(m, ServerMessage::RoundStarted(_))));
    assert_eq!(room.info().await.unwrap().status, MatchStatus::Waiting);
}

#[tokio::test]
async fn tick_panic_returns_room_to_waiting() {
    let broken = seated_room(2, panicking_factory(3), fast_config(3)).await;
    let healthy = seated_room(2, endless_factory(), fast_config(3)).await;

    assert!(broken.start(1).await.success);
    assert!(healthy.start(1).await.success);
    wait_for_status(&broken, MatchStatus::Waiting).await;

    // Unaffected neighbour keeps ticking.
    let before = healthy.info().await.unwrap().tick;
    tokio::time::sleep(Duration::from_millis(40)).await;
    let after = healthy.info().await.unwrap();
    assert_eq!(after.status, MatchStatus::Active);
    assert!(after.tick > before);

    // The broken room is still usable once guests ready up again.
    assert!(!broken.start(1).await.success);
    broken.set_ready(2, true).await.unwrap();
    assert!(broken.start(1).await.success);
}

#[tokio::test]
async fn arena_round_snapshots_decode() {
    let mut arena = ArenaConfig::default();
    arena.seed = Some(7);
    let room = seated_room(2, ArenaRound::factory(arena), fast_config(3)).await;
    let mut rx = room.subscribe();
    assert!(room.start(1).await.success);
    room.send_input(1, InputUpdate::holding(&[Key::Right]));

    let snapshot = loop {
        if let ServerMessage::Snapshot(s) = recv(&mut rx).await {
            break s;
        }
    };
    assert_eq!(snapshot.match_status, MatchStatus::Active);
    let round: RoundSnapshot = rmp_serde::from_slice(&snapshot.round_state).unwrap();
    assert_eq!(round.round, 1);
    assert_eq!(round.players.len(), 2);
    assert_eq!(round.grid.len(), 13);
    assert!(round.outcome.is_none());
    room.close();
}

fn player_x(snapshot: &SnapshotMsg, player_id: u64) -> f32 {
    let round: RoundSnapshot = rmp_serde::from_slice(&snapshot.round_state).unwrap();
    round
        .players
        .iter()
        .find(|p| p.id == player_id)
        .map(|p| p.position.x)
        .expect("player in snapshot")
}

async fn next_active_snapshot(rx: &mut tokio::sync::broadcast::Receiver<bytes::Bytes>) -> SnapshotMsg {
    loop {
        if let ServerMessage::Snapshot(s) = recv(rx).await
            && s.match_status == MatchStatus::Active
        {
            return s;
        }
    }
}

#[tokio::test]
async fn key_released_during_pause_stays_released() {
    let mut arena = ArenaConfig::default();
    arena.seed = Some(7);
    let room = seated_room(2, ArenaRound::factory(arena), fast_config(3)).await;
    let mut rx = room.subscribe();
    assert!(room.start(1).await.success);

    room.send_input(1, InputUpdate::holding(&[Key::Right]));
    let first = next_active_snapshot(&mut rx).await;
    let walking = loop {
        let s = next_active_snapshot(&mut rx).await;
        if player_x(&s, 1) > player_x(&first, 1) {
            break s;
        }
    };

    assert!(room.pause(1).await.success);
    room.send_input(1, InputUpdate::holding(&[]));
    assert!(room.resume(1).await.success);
    drain(&mut rx);

    let after = next_active_snapshot(&mut rx).await;
    tokio::time::sleep(Duration::from_millis(40)).await;
    let later = drain(&mut rx)
        .into_iter()
        .filter_map(|m| match m {
            ServerMessage::Snapshot(s) => Some(s),
            _ => None,
        })
        .last()
        .expect("ticks after resume");
    assert!(later.tick > after.tick);
    assert!(player_x(&after, 1) >= player_x(&walking, 1));
    assert_eq!(player_x(&later, 1), player_x(&after, 1));
    room.close();
}

#[tokio::test]
async fn presses_sent_while_paused_are_dropped() {
    let mut arena = ArenaConfig::default();
    arena.seed = Some(7);
    let room = seated_room(2, ArenaRound::factory(arena), fast_config(3)).await;
    let mut rx = room.subscribe();
    assert!(room.start(1).await.success);

    assert!(room.pause(1).await.success);
    room.send_input(1, InputUpdate::pressing(&[Key::Action]));
    assert!(room.resume(1).await.success);
    drain(&mut rx);

    tokio::time::sleep(Duration::from_millis(40)).await;
    let snapshot = next_active_snapshot(&mut rx).await;
    let round: RoundSnapshot = rmp_serde::from_slice(&snapshot.round_state).unwrap();
    assert!(round.bombs.is_empty());
    room.close();
}
