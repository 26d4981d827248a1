use log::{debug, info};
use shared::physics::clamp_paddle;
use shared::{GameConfig, Packet, PlayerId, Slot, Snapshot};

/// Where the client believes its room is, as told by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientPhase {
    Connecting,
    Waiting,
    Pending,
    Playing,
    Finished,
}

/// Client-side mirror of one match.
///
/// The server is authoritative for everything except where this client
/// wants its own paddle; that target is tracked locally and sent as
/// `PaddleMove`.
#[derive(Debug, Clone)]
pub struct ClientGameState {
    config: GameConfig,
    identity: Option<PlayerId>,
    slot: Option<Slot>,
    phase: ClientPhase,
    snapshot: Option<Snapshot>,
    paddle_y: Option<f32>,
    winner: Option<PlayerId>,
    disconnect_reason: Option<String>,
}

impl Default for ClientGameState {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}

impl ClientGameState {
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            identity: None,
            slot: None,
            phase: ClientPhase::Connecting,
            snapshot: None,
            paddle_y: None,
            winner: None,
            disconnect_reason: None,
        }
    }

    pub fn identity(&self) -> Option<PlayerId> {
        self.identity
    }

    pub fn slot(&self) -> Option<Slot> {
        self.slot
    }

    pub fn phase(&self) -> ClientPhase {
        self.phase
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    pub fn disconnect_reason(&self) -> Option<&str> {
        self.disconnect_reason.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.phase == ClientPhase::Finished
    }

    /// True once the match ended with this client as the winner.
    pub fn won(&self) -> bool {
        self.winner.is_some() && self.winner == self.identity
    }

    /// Applies a server packet. Returns the packet to send back, if any.
    pub fn apply_packet(&mut self, packet: &Packet) -> Option<Packet> {
        match packet {
            Packet::PlayerJoined { identity, slot } => {
                info!("Joined as player {} in slot {}", identity, slot.number());
                self.identity = Some(*identity);
                self.slot = Some(*slot);
                None
            }
            Packet::WaitingForPlayer => {
                self.phase = ClientPhase::Waiting;
                None
            }
            Packet::RoomReady(snapshot) => {
                info!("Opponent found in room {}", snapshot.room_id);
                self.apply_snapshot(snapshot);
                self.phase = ClientPhase::Pending;
                Some(Packet::Ready)
            }
            Packet::GameStarted => {
                info!("Match started");
                self.phase = ClientPhase::Playing;
                None
            }
            Packet::GameStateUpdate(snapshot) => {
                self.apply_snapshot(snapshot);
                None
            }
            Packet::GameEnded { winner } => {
                self.winner = Some(*winner);
                self.phase = ClientPhase::Finished;
                None
            }
            Packet::PlayerLeft { identity } => {
                debug!("Player {} left the room", identity);
                // An ended match is reported separately; before the start the
                // room simply waits for someone new.
                if self.phase == ClientPhase::Pending {
                    self.phase = ClientPhase::Waiting;
                }
                None
            }
            Packet::Disconnected { reason } => {
                self.disconnect_reason = Some(reason.clone());
                self.phase = ClientPhase::Finished;
                None
            }
            Packet::Connect { .. } | Packet::Ready | Packet::PaddleMove { .. } | Packet::Disconnect => {
                debug!("Ignoring client-bound packet echoed by server: {:?}", packet);
                None
            }
        }
    }

    fn apply_snapshot(&mut self, snapshot: &Snapshot) {
        if snapshot.ended {
            self.phase = ClientPhase::Finished;
            self.winner = snapshot.winner;
        } else if snapshot.started {
            self.phase = ClientPhase::Playing;
        }

        if self.paddle_y.is_none() {
            if let Some(own) = self.slot.and_then(|slot| snapshot.slot(slot)) {
                self.paddle_y = Some(own.paddle_y);
            }
        }
        self.snapshot = Some(snapshot.clone());
    }

    /// Moves the own paddle toward the ball by at most `paddle_speed * dt`.
    /// Returns the new target, or `None` while no match is being played.
    pub fn next_paddle_target(&mut self, dt: f32) -> Option<f32> {
        if self.phase != ClientPhase::Playing {
            return None;
        }
        let snapshot = self.snapshot.as_ref()?;
        let current = self.paddle_y.unwrap_or_else(|| self.config.centered_paddle_y());

        let (_, ball_center_y) = snapshot.ball.center(&self.config);
        let wanted = ball_center_y - self.config.paddle_height / 2.0;
        let max_step = self.config.paddle_speed * dt.max(0.0);
        let step = (wanted - current).clamp(-max_step, max_step);

        let next = clamp_paddle(&self.config, current + step);
        self.paddle_y = Some(next);
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::{Ball, PlayerSlot};

    fn snapshot(started: bool, ball_y: f32) -> Snapshot {
        let config = GameConfig::default();
        Snapshot {
            room_id: 1,
            tick: 0,
            slot1: Some(PlayerSlot::new(7, &config)),
            slot2: Some(PlayerSlot::new(8, &config)),
            ball: Ball {
                x: 400.0,
                y: ball_y,
                velocity_x: 300.0,
                velocity_y: 0.0,
            },
            started,
            ended: false,
            winner: None,
        }
    }

    fn joined() -> ClientGameState {
        let mut state = ClientGameState::default();
        state.apply_packet(&Packet::PlayerJoined {
            identity: 7,
            slot: Slot::One,
        });
        state.apply_packet(&Packet::WaitingForPlayer);
        state
    }

    #[test]
    fn test_room_ready_is_answered_with_ready() {
        let mut state = joined();
        assert_eq!(state.phase(), ClientPhase::Waiting);
        assert_eq!(state.identity(), Some(7));

        let reply = state.apply_packet(&Packet::RoomReady(snapshot(false, 200.0)));

        assert_eq!(reply, Some(Packet::Ready));
        assert_eq!(state.phase(), ClientPhase::Pending);
    }

    #[test]
    fn test_no_paddle_target_before_start() {
        let mut state = joined();
        state.apply_packet(&Packet::RoomReady(snapshot(false, 0.0)));

        assert_eq!(state.next_paddle_target(1.0 / 60.0), None);
    }

    #[test]
    fn test_paddle_follows_ball_at_limited_speed() {
        let config = GameConfig::default();
        let mut state = joined();
        state.apply_packet(&Packet::RoomReady(snapshot(false, 0.0)));
        state.apply_packet(&Packet::GameStarted);
        state.apply_packet(&Packet::GameStateUpdate(snapshot(true, 0.0)));

        let dt = 1.0 / 60.0;
        let first = state.next_paddle_target(dt).unwrap();
        assert_approx_eq!(first, config.centered_paddle_y() - config.paddle_speed * dt, 1e-3);

        for _ in 0..120 {
            state.next_paddle_target(dt);
        }
        assert_eq!(state.next_paddle_target(dt), Some(0.0));
    }

    #[test]
    fn test_paddle_stops_when_aligned() {
        let config = GameConfig::default();
        let mut state = joined();
        let centered_ball = config.centered_paddle_y() + config.paddle_height / 2.0
            - config.ball_size / 2.0;
        state.apply_packet(&Packet::GameStarted);
        state.apply_packet(&Packet::GameStateUpdate(snapshot(true, centered_ball)));

        let target = state.next_paddle_target(1.0 / 60.0).unwrap();

        assert_approx_eq!(target, config.centered_paddle_y(), 1e-3);
    }

    #[test]
    fn test_game_ended_finishes() {
        let mut state = joined();
        state.apply_packet(&Packet::GameStarted);

        state.apply_packet(&Packet::GameEnded { winner: 7 });

        assert!(state.is_finished());
        assert!(state.won());
        assert_eq!(state.next_paddle_target(0.1), None);
    }

    #[test]
    fn test_opponent_leaving_before_start_returns_to_waiting() {
        let mut state = joined();
        state.apply_packet(&Packet::RoomReady(snapshot(false, 0.0)));

        state.apply_packet(&Packet::PlayerLeft { identity: 8 });

        assert_eq!(state.phase(), ClientPhase::Waiting);
        assert!(!state.is_finished());
    }

    #[test]
    fn test_disconnected_records_reason() {
        let mut state = ClientGameState::default();

        state.apply_packet(&Packet::Disconnected {
            reason: "No opponent found".to_string(),
        });

        assert!(state.is_finished());
        assert!(!state.won());
        assert_eq!(state.disconnect_reason(), Some("No opponent found"));
    }
}
