//! One match: two seats, a ball and the lifecycle that drives them.
//!
//! Every mutation of a room goes through its mutex, so inbound intents and
//! the room's own ticks are applied one at a time. Rooms share nothing with
//! each other.

use crate::error::RoomError;
use crate::game::GameState;
use crate::registry::SessionRegistry;
use log::{debug, info, warn};
use shared::{GameConfig, Packet, PlayerId, RoomId, Slot, Snapshot};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Per-connection outbound queue. Full queues drop packets; the next full
/// snapshot supersedes whatever was lost.
pub type Outbound = mpsc::Sender<Packet>;

#[derive(Debug, Clone)]
pub struct RoomSettings {
    pub game: GameConfig,
    pub grace_period: Duration,
}

/// Lifecycle phase without the attached tick driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Waiting,
    Pending,
    Active,
    Ended,
}

/// Fixed-rate task that ticks a room while it is active.
///
/// Dropping the driver aborts the task, so leaving the `Active` phase is the
/// one and only way to cancel it.
#[derive(Debug)]
pub struct TickDriver {
    handle: JoinHandle<()>,
}

impl TickDriver {
    fn spawn(room: Weak<Room>, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let Some(room) = room.upgrade() else {
                    break;
                };
                if !room.tick().await {
                    break;
                }
            }
        });

        Self { handle }
    }
}

impl Drop for TickDriver {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Debug)]
enum Phase {
    Waiting { since: Instant },
    Pending,
    Active(TickDriver),
    Ended { winner: PlayerId },
}

impl Phase {
    fn kind(&self) -> PhaseKind {
        match self {
            Phase::Waiting { .. } => PhaseKind::Waiting,
            Phase::Pending => PhaseKind::Pending,
            Phase::Active(_) => PhaseKind::Active,
            Phase::Ended { .. } => PhaseKind::Ended,
        }
    }

    fn waiting() -> Self {
        Phase::Waiting {
            since: Instant::now(),
        }
    }
}

/// Point-in-time view used by the registry for matchmaking and sweeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomSummary {
    pub phase: PhaseKind,
    pub occupants: usize,
    pub waiting_since: Option<Instant>,
}

impl RoomSummary {
    /// A lone player is waiting here for an opponent.
    pub fn is_open(&self) -> bool {
        self.phase == PhaseKind::Waiting && self.occupants == 1
    }
}

struct RoomState {
    game: GameState,
    phase: Phase,
    peers: [Option<Outbound>; 2],
}

impl RoomState {
    fn snapshot(&self) -> Snapshot {
        let (started, ended, winner) = match &self.phase {
            Phase::Waiting { .. } | Phase::Pending => (false, false, None),
            Phase::Active(_) => (true, false, None),
            Phase::Ended { winner } => (true, true, Some(*winner)),
        };
        self.game.snapshot(started, ended, winner)
    }

    fn summary(&self) -> RoomSummary {
        let waiting_since = match &self.phase {
            Phase::Waiting { since } => Some(*since),
            _ => None,
        };
        RoomSummary {
            phase: self.phase.kind(),
            occupants: self.game.occupants(),
            waiting_since,
        }
    }

    fn send_to(&self, slot: Slot, packet: Packet) {
        if let Some(peer) = &self.peers[slot.index()] {
            deliver(self.game.room_id, slot, peer, packet);
        }
    }

    fn broadcast(&self, packet: Packet) {
        for slot in [Slot::One, Slot::Two] {
            self.send_to(slot, packet.clone());
        }
    }

    fn broadcast_snapshot(&self) {
        self.broadcast(Packet::GameStateUpdate(self.snapshot()));
    }
}

fn deliver(room_id: RoomId, slot: Slot, peer: &Outbound, packet: Packet) {
    match peer.try_send(packet) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            debug!(
                "Room {}: outbound queue for slot {} is full, dropping packet",
                room_id,
                slot.number()
            );
        }
        Err(TrySendError::Closed(_)) => {
            debug!(
                "Room {}: connection for slot {} is gone, dropping packet",
                room_id,
                slot.number()
            );
        }
    }
}

pub struct Room {
    id: RoomId,
    settings: RoomSettings,
    registry: Weak<SessionRegistry>,
    state: Mutex<RoomState>,
}

impl Room {
    pub fn new(id: RoomId, settings: RoomSettings, registry: Weak<SessionRegistry>) -> Arc<Self> {
        let game = GameState::new(id, settings.game);
        Self::with_game(game, settings, registry)
    }

    /// Builds a room around an existing simulation, e.g. one with a seeded RNG.
    pub fn with_game(
        game: GameState,
        settings: RoomSettings,
        registry: Weak<SessionRegistry>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: game.room_id,
            settings,
            registry,
            state: Mutex::new(RoomState {
                game,
                phase: Phase::waiting(),
                peers: [None, None],
            }),
        })
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub async fn summary(&self) -> RoomSummary {
        self.state.lock().await.summary()
    }

    pub async fn phase(&self) -> PhaseKind {
        self.state.lock().await.phase.kind()
    }

    pub async fn occupants(&self) -> usize {
        self.state.lock().await.game.occupants()
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.state.lock().await.snapshot()
    }

    /// Seats a player in the first open slot.
    pub async fn join(&self, identity: PlayerId, outbound: Outbound) -> Result<Slot, RoomError> {
        let mut state = self.state.lock().await;

        if state.phase.kind() == PhaseKind::Ended {
            return Err(RoomError::RoomFull(self.id));
        }
        let slot = state
            .game
            .occupy(identity)
            .ok_or(RoomError::RoomFull(self.id))?;
        state.peers[slot.index()] = Some(outbound);

        info!(
            "Room {}: player {} joined as slot {}",
            self.id,
            identity,
            slot.number()
        );
        state.send_to(slot, Packet::PlayerJoined { identity, slot });

        if state.game.is_full() {
            state.phase = Phase::Pending;
            let snapshot = state.snapshot();
            state.broadcast(Packet::RoomReady(snapshot));
        } else {
            state.phase = Phase::waiting();
            state.send_to(slot, Packet::WaitingForPlayer);
        }

        Ok(slot)
    }

    /// Marks a player ready; starts the match once both are.
    pub async fn set_ready(self: &Arc<Self>, identity: PlayerId) -> Result<(), RoomError> {
        let mut state = self.state.lock().await;
        let slot = self.seat_of(&state, identity)?;

        if !state.game.mark_ready(slot) {
            return Ok(());
        }
        debug!("Room {}: player {} is ready", self.id, identity);

        if state.phase.kind() == PhaseKind::Pending && state.game.all_ready() {
            state.game.kickoff();
            let period = self.settings.game.tick_interval();
            state.phase = Phase::Active(TickDriver::spawn(Arc::downgrade(self), period));
            info!("Room {}: match started", self.id);
            state.broadcast(Packet::GameStarted);
        }

        state.broadcast_snapshot();
        Ok(())
    }

    /// Stores a clamped paddle position. While active, the next tick carries
    /// the change; otherwise it is broadcast right away.
    pub async fn set_paddle_position(&self, identity: PlayerId, y: f32) -> Result<f32, RoomError> {
        let mut state = self.state.lock().await;
        let slot = self.seat_of(&state, identity)?;

        let stored = state
            .game
            .set_paddle(slot, y)
            .ok_or(RoomError::UnknownIdentity {
                room_id: self.id,
                identity,
            })?;

        if state.phase.kind() != PhaseKind::Active {
            state.broadcast_snapshot();
        }
        Ok(stored)
    }

    /// Vacates the player's slot. Leaving an active match forfeits it.
    pub async fn leave(&self, identity: PlayerId) -> Result<RoomSummary, RoomError> {
        let mut state = self.state.lock().await;
        let slot = self.seat_of(&state, identity)?;

        state.game.vacate(identity);
        state.peers[slot.index()] = None;
        info!(
            "Room {}: player {} left slot {}",
            self.id,
            identity,
            slot.number()
        );
        state.broadcast(Packet::PlayerLeft { identity });

        match state.phase.kind() {
            PhaseKind::Active => match state.game.identity(slot.opponent()) {
                Some(winner) => {
                    state.phase = Phase::Ended { winner };
                    info!(
                        "Room {}: player {} forfeited, player {} wins",
                        self.id, identity, winner
                    );
                    state.broadcast_snapshot();
                    state.broadcast(Packet::GameEnded { winner });
                    self.schedule_release();
                }
                None => {
                    warn!("Room {}: active match had no opponent seated", self.id);
                    state.phase = Phase::waiting();
                }
            },
            PhaseKind::Pending => state.phase = Phase::waiting(),
            PhaseKind::Waiting | PhaseKind::Ended => {}
        }

        Ok(state.summary())
    }

    /// Tells every seated player the room is going away.
    pub async fn close(&self, reason: &str) {
        let state = self.state.lock().await;
        state.broadcast(Packet::Disconnected {
            reason: reason.to_string(),
        });
    }

    /// Runs one simulation step. Returns false once the room stops ticking.
    async fn tick(&self) -> bool {
        let mut state = self.state.lock().await;
        if state.phase.kind() != PhaseKind::Active {
            return false;
        }

        let outcome = state.game.step();

        if let Some(scorer) = outcome.scored {
            if let Some(seat) = state.game.slot(scorer) {
                debug!(
                    "Room {}: slot {} scored ({} points)",
                    self.id,
                    scorer.number(),
                    seat.score
                );
            }
        }

        let winner = outcome.winner.and_then(|slot| state.game.identity(slot));
        if let Some(winner) = winner {
            state.phase = Phase::Ended { winner };
            info!("Room {}: player {} wins", self.id, winner);
            state.broadcast_snapshot();
            state.broadcast(Packet::GameEnded { winner });
            self.schedule_release();
            return false;
        }

        if state.game.tick % self.settings.game.tick_rate.max(1) == 0 {
            let ball = state.game.ball();
            debug!(
                "Room {}: tick {}, ball at ({:.1}, {:.1})",
                self.id, state.game.tick, ball.x, ball.y
            );
        }

        state.broadcast_snapshot();
        true
    }

    fn seat_of(&self, state: &RoomState, identity: PlayerId) -> Result<Slot, RoomError> {
        state
            .game
            .slot_of(identity)
            .ok_or(RoomError::UnknownIdentity {
                room_id: self.id,
                identity,
            })
    }

    fn schedule_release(&self) {
        match self.registry.upgrade() {
            Some(registry) => registry.schedule_release(self.id, self.settings.grace_period),
            None => debug!("Room {}: no registry to release from", self.id),
        }
    }
}
