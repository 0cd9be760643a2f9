//! Per-room actor: owns the roster, the match lifecycle, the running round
//! and every timer. One tokio task per room; rooms share nothing.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior, Sleep};
use tokio_util::sync::CancellationToken;

use blastgrid_core::game_trait::{
    PlayerId, RoundFactory, RoundOutcome, RoundSimulation, SeatAssignment,
};
use blastgrid_core::input::InputUpdate;
use blastgrid_core::net::messages::{
    MatchAction, MatchEndedMsg, MatchStateChangedMsg, RosterUpdateMsg, RoundEndedMsg,
    RoundStartedMsg, ScoreEntry, ServerMessage, SnapshotMsg,
};
use blastgrid_core::net::protocol::{DEFAULT_TICK_RATE_HZ, encode_server_message};
use blastgrid_core::player::Player;
use blastgrid_core::room::{
    MAX_SEATS, MatchStatus, RoomConfig, Roster, RosterError, SeatIndex, WinCounters,
};

use crate::error::{ActionResult, Rejection};
use crate::lifecycle::{
    DisconnectPolicy, Gate, MatchLifecycle, Role, RoundVerdict, StatusChange,
};

type Reply<T> = oneshot::Sender<Result<T, Rejection>>;

const MIN_TICK_RATE_HZ: f32 = 1.0;
const MAX_TICK_RATE_HZ: f32 = 1000.0;

/// Why a player is leaving a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveReason {
    Left,
    Disconnected,
}

impl std::fmt::Display for LeaveReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Disconnected => f.write_str("disconnected"),
        }
    }
}

/// Commands sent to a room actor.
pub enum RoomCommand {
    Join {
        player: Player,
        reply: Reply<SeatIndex>,
    },
    TakeSeat {
        player: Player,
        seat: SeatIndex,
        reply: Reply<()>,
    },
    SetReady {
        player_id: PlayerId,
        ready: bool,
        reply: Reply<()>,
    },
    Control {
        player_id: PlayerId,
        action: MatchAction,
        reply: Reply<()>,
    },
    Leave {
        player_id: PlayerId,
        reason: LeaveReason,
        reply: Option<Reply<()>>,
    },
    Input {
        player_id: PlayerId,
        update: InputUpdate,
    },
    Inspect {
        reply: Reply<RoomInfo>,
    },
}

/// Point-in-time view of a room.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub id: String,
    pub status: MatchStatus,
    pub roster: Roster,
    pub win_counters: WinCounters,
    pub round: u32,
    pub tick: u32,
}

/// Last client activity, in milliseconds since the room opened.
struct Activity {
    opened: Instant,
    last_ms: AtomicU64,
}

impl Activity {
    fn new() -> Self {
        Self {
            opened: Instant::now(),
            last_ms: AtomicU64::new(0),
        }
    }

    fn since_open_ms(&self) -> u64 {
        u64::try_from(self.opened.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Cloneable handle to a running room.
#[derive(Clone)]
pub struct RoomHandle {
    id: String,
    commands: mpsc::UnboundedSender<RoomCommand>,
    broadcast_tx: broadcast::Sender<Bytes>,
    cancel: CancellationToken,
    activity: Arc<Activity>,
}

impl RoomHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Encoded `ServerMessage`s from this room. Lagging receivers lose the
    /// oldest messages and pick up again from the next snapshot.
    pub fn subscribe(&self) -> broadcast::Receiver<Bytes> {
        self.broadcast_tx.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.commands.is_closed()
    }

    /// Record client activity. Lock-free, safe on every input frame.
    pub fn touch(&self) {
        let now = self.activity.since_open_ms();
        self.activity.last_ms.fetch_max(now, Ordering::Relaxed);
    }

    /// Time since the last recorded activity, or since the room opened.
    pub fn idle_for(&self) -> Duration {
        let last = self.activity.last_ms.load(Ordering::Relaxed);
        Duration::from_millis(self.activity.since_open_ms().saturating_sub(last))
    }

    /// Stop the room. Safe to call any number of times.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> RoomCommand,
    ) -> Result<T, Rejection> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(build(reply))
            .map_err(|_| Rejection::RoomClosed)?;
        rx.await.map_err(|_| Rejection::RoomClosed)?
    }

    pub async fn join(&self, player: Player) -> Result<SeatIndex, Rejection> {
        self.request(|reply| RoomCommand::Join { player, reply })
            .await
    }

    pub async fn take_seat(&self, player: Player, seat: SeatIndex) -> Result<(), Rejection> {
        self.request(|reply| RoomCommand::TakeSeat {
            player,
            seat,
            reply,
        })
        .await
    }

    pub async fn set_ready(&self, player_id: PlayerId, ready: bool) -> Result<(), Rejection> {
        self.request(|reply| RoomCommand::SetReady {
            player_id,
            ready,
            reply,
        })
        .await
    }

    /// Relay a start/pause/resume request from `player_id`.
    pub async fn control(&self, player_id: PlayerId, action: MatchAction) -> ActionResult {
        self.request(|reply| RoomCommand::Control {
            player_id,
            action,
            reply,
        })
        .await
        .into()
    }

    pub async fn start(&self, player_id: PlayerId) -> ActionResult {
        self.control(player_id, MatchAction::Start).await
    }

    pub async fn pause(&self, player_id: PlayerId) -> ActionResult {
        self.control(player_id, MatchAction::Pause).await
    }

    pub async fn resume(&self, player_id: PlayerId) -> ActionResult {
        self.control(player_id, MatchAction::Resume).await
    }

    pub async fn leave(&self, player_id: PlayerId) -> Result<(), Rejection> {
        self.request(|reply| RoomCommand::Leave {
            player_id,
            reason: LeaveReason::Left,
            reply: Some(reply),
        })
        .await
    }

    /// Report a dropped connection. Fire-and-forget.
    pub fn disconnect(&self, player_id: PlayerId) {
        let cmd = RoomCommand::Leave {
            player_id,
            reason: LeaveReason::Disconnected,
            reply: None,
        };
        if self.commands.send(cmd).is_err() {
            tracing::debug!(room = %self.id, player_id, "Disconnect for closed room");
        }
    }

    /// Queue an input update for the next tick. Fire-and-forget.
    pub fn send_input(&self, player_id: PlayerId, update: InputUpdate) {
        if let Err(e) = self.commands.send(RoomCommand::Input { player_id, update }) {
            tracing::debug!(room = %self.id, player_id, error = %e, "Room gone, input dropped");
        }
    }

    pub async fn info(&self) -> Result<RoomInfo, Rejection> {
        self.request(|reply| RoomCommand::Inspect { reply }).await
    }
}

/// Spawn a room actor with `host` in seat 0.
pub fn spawn_room(
    id: String,
    host: Player,
    config: RoomConfig,
    factory: RoundFactory,
    broadcast_capacity: usize,
) -> (RoomHandle, JoinHandle<()>) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (broadcast_tx, _) = broadcast::channel(broadcast_capacity.max(1));
    let cancel = CancellationToken::new();

    let handle = RoomHandle {
        id: id.clone(),
        commands: cmd_tx,
        broadcast_tx: broadcast_tx.clone(),
        cancel: cancel.clone(),
        activity: Arc::new(Activity::new()),
    };

    let actor = RoomActor {
        id,
        lifecycle: MatchLifecycle::new(config.max_wins),
        config,
        factory,
        roster: Roster::with_host(host),
        round: None,
        round_seats: Vec::new(),
        ticker: None,
        round_end_timer: None,
        last_tick: Instant::now(),
        tick: 0,
        broadcast_tx,
    };
    let task = tokio::spawn(actor.run(cmd_rx, cancel));
    (handle, task)
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

struct RoomActor {
    id: String,
    config: RoomConfig,
    factory: RoundFactory,
    roster: Roster,
    lifecycle: MatchLifecycle,
    round: Option<Box<dyn RoundSimulation>>,
    /// Seats as they were when the current round began.
    round_seats: Vec<SeatAssignment>,
    ticker: Option<Interval>,
    round_end_timer: Option<Pin<Box<Sleep>>>,
    last_tick: Instant,
    tick: u32,
    broadcast_tx: broadcast::Sender<Bytes>,
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        },
        None => std::future::pending().await,
    }
}

async fn round_end_elapsed(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

/// Tick period for a requested rate, falling back to the default rate when
/// the request is unusable and clamped to `MIN_TICK_RATE_HZ..=MAX_TICK_RATE_HZ`.
fn tick_period(hz: Option<f32>) -> Duration {
    let hz = hz
        .filter(|hz| hz.is_finite() && *hz > 0.0)
        .unwrap_or(DEFAULT_TICK_RATE_HZ as f32)
        .clamp(MIN_TICK_RATE_HZ, MAX_TICK_RATE_HZ);
    Duration::from_secs_f32(1.0 / hz)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

impl RoomActor {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<RoomCommand>,
        cancel: CancellationToken,
    ) {
        tracing::info!(room = %self.id, "Room opened");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = next_tick(&mut self.ticker) => self.on_tick(),
                _ = round_end_elapsed(&mut self.round_end_timer) => {
                    self.round_end_timer = None;
                    self.on_round_end_delay();
                }
                cmd = cmd_rx.recv() => {
                    let Some(cmd) = cmd else { break };
                    if self.handle(cmd) == Flow::Stop {
                        break;
                    }
                }
            }
        }
        self.stop_timers();
        self.round = None;
        cancel.cancel();
        tracing::info!(room = %self.id, status = %self.lifecycle.status(), "Room closed");
    }

    fn handle(&mut self, cmd: RoomCommand) -> Flow {
        match cmd {
            RoomCommand::Join { player, reply } => {
                let _ = reply.send(self.join(player));
            },
            RoomCommand::TakeSeat {
                player,
                seat,
                reply,
            } => {
                let _ = reply.send(self.take_seat(player, seat));
            },
            RoomCommand::SetReady {
                player_id,
                ready,
                reply,
            } => {
                let _ = reply.send(self.set_ready(player_id, ready));
            },
            RoomCommand::Control {
                player_id,
                action,
                reply,
            } => {
                let _ = reply.send(self.control(player_id, action));
            },
            RoomCommand::Leave {
                player_id,
                reason,
                reply,
            } => {
                let result = self.leave(player_id, reason);
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
                if self.roster.is_empty() {
                    tracing::info!(room = %self.id, "Last player left");
                    return Flow::Stop;
                }
            },
            RoomCommand::Input { player_id, update } => self.route_input(player_id, &update),
            RoomCommand::Inspect { reply } => {
                let _ = reply.send(Ok(self.info()));
            },
        }
        Flow::Continue
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            id: self.id.clone(),
            status: self.lifecycle.status(),
            roster: self.roster.clone(),
            win_counters: self.lifecycle.wins(),
            round: self.lifecycle.round(),
            tick: self.tick,
        }
    }

    // ----------------------------------------------------------------
    // Seating
    // ----------------------------------------------------------------

    fn ensure_seating_open(&self) -> Result<(), Rejection> {
        match self.lifecycle.status() {
            MatchStatus::Waiting => Ok(()),
            status => Err(Rejection::SeatingClosed(status)),
        }
    }

    fn join(&mut self, player: Player) -> Result<SeatIndex, Rejection> {
        self.ensure_seating_open()?;
        let player_id = player.id;
        let seat = self.roster.join(player)?;
        tracing::info!(room = %self.id, player_id, seat, "Player joined");
        self.broadcast_roster();
        Ok(seat)
    }

    fn take_seat(&mut self, player: Player, seat: SeatIndex) -> Result<(), Rejection> {
        self.ensure_seating_open()?;
        let player_id = player.id;
        if self.roster.seat_of(player_id).is_some() {
            self.roster.move_seat(player_id, seat)?;
        } else {
            self.roster.take_seat(seat, player)?;
        }
        tracing::info!(room = %self.id, player_id, seat, "Player took seat");
        self.broadcast_roster();
        Ok(())
    }

    fn set_ready(&mut self, player_id: PlayerId, ready: bool) -> Result<(), Rejection> {
        self.roster.set_ready(player_id, ready)?;
        self.broadcast_roster();
        Ok(())
    }

    fn leave(&mut self, player_id: PlayerId, reason: LeaveReason) -> Result<(), Rejection> {
        let seat = self
            .roster
            .remove(player_id)
            .ok_or(Rejection::Roster(RosterError::NotSeated(player_id)))?;
        tracing::info!(room = %self.id, player_id, seat, %reason, "Player removed from seat");

        if let Some(round) = self.round.as_mut() {
            round.player_left(player_id);
        }

        let remaining = self.roster.seated_count();
        match self.lifecycle.disconnect_policy(remaining) {
            DisconnectPolicy::Pause => match self.lifecycle.pause(&Gate::system(remaining)) {
                Ok(change) => {
                    self.halt_ticking();
                    self.announce(change);
                },
                Err(e) => tracing::warn!(room = %self.id, reason = %e, "Could not pause"),
            },
            DisconnectPolicy::Abandon => self.abandon_match(),
            DisconnectPolicy::Continue => {},
        }
        self.broadcast_roster();
        Ok(())
    }

    // ----------------------------------------------------------------
    // Match control
    // ----------------------------------------------------------------

    fn gate_for(&self, player_id: PlayerId) -> Gate {
        let role = if self.roster.is_host(player_id) {
            Role::Host
        } else {
            Role::Guest
        };
        Gate {
            role,
            seated: self.roster.seated_count(),
            guests_ready: self.roster.all_guests_ready(),
        }
    }

    fn control(&mut self, player_id: PlayerId, action: MatchAction) -> Result<(), Rejection> {
        let gate = self.gate_for(player_id);
        let result = match action {
            MatchAction::Start => self.lifecycle.start(&gate).map(|change| {
                self.announce(change);
                self.begin_round();
            }),
            MatchAction::Pause => self.lifecycle.pause(&gate).map(|change| {
                self.halt_ticking();
                self.announce(change);
            }),
            MatchAction::Resume => self.lifecycle.resume(&gate).map(|change| {
                self.announce(change);
                self.start_ticker();
            }),
        };
        if let Err(e) = &result {
            tracing::warn!(room = %self.id, player_id, %action, reason = %e, "Match control rejected");
        }
        result
    }

    /// Active rounds take full updates. Paused rounds track held keys only,
    /// so a key released during the pause is released on resume.
    fn route_input(&mut self, player_id: PlayerId, update: &InputUpdate) {
        let status = self.lifecycle.status();
        let accepted = match status {
            MatchStatus::Active => Some(update.clone()),
            MatchStatus::Paused => Some(update.without_edges()),
            _ => None,
        };
        let (Some(update), Some(round), Some(_)) = (
            accepted,
            self.round.as_mut(),
            self.roster.seat_of(player_id),
        ) else {
            tracing::debug!(room = %self.id, player_id, %status, "Dropping input");
            return;
        };
        round.apply_input(player_id, &update);
    }

    // ----------------------------------------------------------------
    // Rounds and ticking
    // ----------------------------------------------------------------

    fn begin_round(&mut self) {
        let seats = self.roster.assignments();
        let round = self.lifecycle.round();
        self.round = Some((self.factory)(&seats, round));
        tracing::info!(room = %self.id, round, players = seats.len(), "Round started");
        self.round_seats = seats;
        self.tick = 0;
        self.broadcast(&ServerMessage::RoundStarted(RoundStartedMsg {
            round,
            win_counters: self.lifecycle.wins(),
        }));
        self.start_ticker();
    }

    fn start_ticker(&mut self) {
        let hz = self
            .config
            .tick_rate_hz
            .or_else(|| self.round.as_ref().map(|r| r.tick_rate()));
        let period = tick_period(hz);
        let now = Instant::now();
        let mut interval = tokio::time::interval_at(now + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.ticker = Some(interval);
        self.last_tick = now;
    }

    /// Stop ticking and forget input buffered before the halt.
    fn halt_ticking(&mut self) {
        self.ticker = None;
        if let Some(round) = self.round.as_mut() {
            round.clear_inputs();
        }
    }

    fn stop_timers(&mut self) {
        self.ticker = None;
        self.round_end_timer = None;
    }

    fn on_tick(&mut self) {
        let now = Instant::now();
        let dt = now
            .duration_since(self.last_tick)
            .min(self.config.max_tick_delta);
        self.last_tick = now;

        let Some(round) = self.round.as_mut() else {
            self.ticker = None;
            return;
        };
        let stepped = catch_unwind(AssertUnwindSafe(|| {
            let outcome = round.update(dt.as_secs_f32());
            (outcome, round.serialize_state())
        }));

        match stepped {
            Ok((outcome, state)) => {
                self.tick += 1;
                match outcome {
                    Some(outcome) => self.finish_round(outcome, state),
                    None => self.broadcast_snapshot(state),
                }
            },
            Err(payload) => {
                tracing::error!(
                    room = %self.id,
                    tick = self.tick,
                    panic = panic_message(&*payload),
                    "Round update panicked, returning room to waiting"
                );
                self.abandon_match();
            },
        }
    }

    fn seat_in_round(&self, player_id: PlayerId) -> Option<SeatIndex> {
        self.round_seats
            .iter()
            .find(|s| s.player_id == player_id)
            .map(|s| s.seat)
    }

    /// Close the round, then send its final snapshot with the post-round
    /// status and counters.
    fn finish_round(&mut self, outcome: RoundOutcome, state: Vec<u8>) {
        self.ticker = None;
        let winner_seat = outcome.winner().and_then(|id| self.seat_in_round(id));
        let (change, verdict) = match self.lifecycle.end_round(winner_seat) {
            Ok(ended) => ended,
            Err(e) => {
                tracing::warn!(room = %self.id, reason = %e, "Round result ignored");
                self.broadcast_snapshot(state);
                return;
            },
        };
        self.broadcast_snapshot(state);
        self.announce(change);

        let round = self.lifecycle.round();
        tracing::info!(room = %self.id, round, ?outcome, ?winner_seat, "Round ended");
        self.broadcast(&ServerMessage::RoundEnded(RoundEndedMsg {
            round,
            outcome,
            winner_seat,
            win_counters: self.lifecycle.wins(),
        }));

        match verdict {
            RoundVerdict::MatchOver { champion } => self.finish_match(champion),
            RoundVerdict::NextRound => {
                self.round_end_timer =
                    Some(Box::pin(tokio::time::sleep(self.config.round_end_delay)));
            },
        }
    }

    fn on_round_end_delay(&mut self) {
        match self.lifecycle.begin_next_round() {
            Ok(change) => {
                self.announce(change);
                self.begin_round();
            },
            Err(e) => tracing::warn!(room = %self.id, reason = %e, "Next round not started"),
        }
    }

    fn finish_match(&mut self, champion: SeatIndex) {
        match self.lifecycle.finish_match() {
            Ok(change) => self.announce(change),
            Err(e) => {
                tracing::warn!(room = %self.id, reason = %e, "Match could not finish");
                return;
            },
        }
        self.stop_timers();
        self.round = None;

        let wins = self.lifecycle.wins();
        let scoreboard = (0..MAX_SEATS as SeatIndex)
            .map(|seat| ScoreEntry {
                seat,
                player_id: self.roster.player_at(seat).map(|p| p.id),
                wins: wins[seat as usize],
            })
            .collect();
        let rounds_played = self.lifecycle.round();
        tracing::info!(room = %self.id, champion_seat = champion, rounds_played, "Match ended");
        self.broadcast(&ServerMessage::MatchEnded(MatchEndedMsg {
            champion: self
                .round_seats
                .iter()
                .find(|s| s.seat == champion)
                .map(|s| s.player_id),
            rounds_played,
            scoreboard,
        }));
    }

    /// Drop the running match and return to waiting.
    fn abandon_match(&mut self) {
        self.stop_timers();
        self.round = None;
        match self.lifecycle.abandon() {
            Ok(change) => {
                tracing::info!(room = %self.id, from = %change.from, "Match abandoned");
                self.announce(change);
            },
            Err(e) => tracing::debug!(room = %self.id, reason = %e, "Nothing to abandon"),
        }
        self.roster.reset_ready();
    }

    // ----------------------------------------------------------------
    // Broadcasts
    // ----------------------------------------------------------------

    fn broadcast(&self, msg: &ServerMessage) {
        match encode_server_message(msg) {
            Ok(data) => {
                // No subscribers is not an error.
                let _ = self.broadcast_tx.send(Bytes::from(data));
            },
            Err(e) => tracing::error!(
                room = %self.id,
                message = ?msg.message_type(),
                error = %e,
                "Failed to encode broadcast"
            ),
        }
    }

    fn broadcast_snapshot(&self, round_state: Vec<u8>) {
        self.broadcast(&ServerMessage::Snapshot(SnapshotMsg {
            tick: self.tick,
            match_status: self.lifecycle.status(),
            win_counters: self.lifecycle.wins(),
            round_state,
        }));
    }

    fn announce(&self, change: StatusChange) {
        tracing::info!(room = %self.id, from = %change.from, to = %change.to, "Match status changed");
        self.broadcast(&ServerMessage::MatchStateChanged(MatchStateChangedMsg {
            from: change.from,
            to: change.to,
        }));
    }

    fn broadcast_roster(&self) {
        self.broadcast(&ServerMessage::RosterUpdate(RosterUpdateMsg {
            roster: self.roster.clone(),
        }));
    }
}
