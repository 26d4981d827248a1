use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::physics::{advance, check_win, clamp_paddle, reset_ball};
use shared::{Ball, GameConfig, PlayerId, PlayerSlot, RoomId, Slot, Snapshot};

/// What a single simulation step produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepOutcome {
    pub scored: Option<Slot>,
    pub winner: Option<Slot>,
}

/// Simulation state of one room: both seats, the ball and the room's RNG.
///
/// Lifecycle decisions (who may join, when ticking starts) live in
/// [`crate::room::Room`]; this type only knows how to seat players and run
/// physics.
#[derive(Debug, Clone)]
pub struct GameState {
    pub room_id: RoomId,
    pub tick: u32,
    config: GameConfig,
    slots: [Option<PlayerSlot>; 2],
    ball: Ball,
    rng: StdRng,
}

impl GameState {
    pub fn new(room_id: RoomId, config: GameConfig) -> Self {
        Self::with_rng(room_id, config, StdRng::from_entropy())
    }

    pub fn with_rng(room_id: RoomId, config: GameConfig, mut rng: StdRng) -> Self {
        let ball = reset_ball(&config, &mut rng);
        Self {
            room_id,
            tick: 0,
            config,
            slots: [None, None],
            ball,
            rng,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn ball(&self) -> Ball {
        self.ball
    }

    pub fn slot(&self, slot: Slot) -> Option<&PlayerSlot> {
        self.slots[slot.index()].as_ref()
    }

    pub fn identity(&self, slot: Slot) -> Option<PlayerId> {
        self.slot(slot).map(|s| s.identity)
    }

    pub fn slot_of(&self, identity: PlayerId) -> Option<Slot> {
        [Slot::One, Slot::Two]
            .into_iter()
            .find(|slot| self.identity(*slot) == Some(identity))
    }

    pub fn occupants(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.occupants() == 2
    }

    /// Seats `identity` in the first open slot with a centred paddle.
    pub fn occupy(&mut self, identity: PlayerId) -> Option<Slot> {
        let slot = [Slot::One, Slot::Two]
            .into_iter()
            .find(|slot| self.slots[slot.index()].is_none())?;

        self.slots[slot.index()] = Some(PlayerSlot::new(identity, &self.config));
        debug!(
            "Room {}: player {} took slot {}",
            self.room_id,
            identity,
            slot.number()
        );
        Some(slot)
    }

    pub fn vacate(&mut self, identity: PlayerId) -> Option<Slot> {
        let slot = self.slot_of(identity)?;
        self.slots[slot.index()] = None;
        Some(slot)
    }

    /// Stores a clamped paddle position and returns the stored value.
    pub fn set_paddle(&mut self, slot: Slot, y: f32) -> Option<f32> {
        let clamped = clamp_paddle(&self.config, y);
        let seat = self.slots[slot.index()].as_mut()?;
        seat.paddle_y = clamped;
        Some(clamped)
    }

    /// Returns true only when the slot was not ready before.
    pub fn mark_ready(&mut self, slot: Slot) -> bool {
        match self.slots[slot.index()].as_mut() {
            Some(seat) if !seat.ready => {
                seat.ready = true;
                true
            }
            _ => false,
        }
    }

    pub fn all_ready(&self) -> bool {
        self.slots.iter().all(|s| s.as_ref().is_some_and(|s| s.ready))
    }

    /// Puts a fresh ball in play for the opening serve.
    pub fn kickoff(&mut self) {
        self.tick = 0;
        self.ball = reset_ball(&self.config, &mut self.rng);
    }

    /// Runs one fixed-length physics step.
    pub fn step(&mut self) -> StepOutcome {
        self.tick = self.tick.wrapping_add(1);

        let (ball, scored) = advance(
            &self.config,
            self.ball,
            self.slots[0].as_ref(),
            self.slots[1].as_ref(),
            self.config.tick_dt(),
        );
        self.ball = ball;

        if let Some(scorer) = scored {
            if let Some(seat) = self.slots[scorer.index()].as_mut() {
                seat.score += 1;
            }
            self.ball = reset_ball(&self.config, &mut self.rng);
        }

        let winner = check_win(
            self.slots[0].as_ref(),
            self.slots[1].as_ref(),
            self.config.winning_score,
        );

        StepOutcome { scored, winner }
    }

    #[cfg(test)]
    pub(crate) fn set_ball(&mut self, ball: Ball) {
        self.ball = ball;
    }

    pub fn snapshot(&self, started: bool, ended: bool, winner: Option<PlayerId>) -> Snapshot {
        Snapshot {
            room_id: self.room_id,
            tick: self.tick,
            slot1: self.slots[0].clone(),
            slot2: self.slots[1].clone(),
            ball: self.ball,
            started,
            ended,
            winner,
        }
    }
}
