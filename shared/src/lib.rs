//! Protocol types and game constants shared by the server and its clients.
//!
//! Both ends must compile against the same constants, otherwise the paddle
//! clamping done locally by a client disagrees with the server's physics.

use serde::{Deserialize, Serialize};

pub mod framing;
pub mod physics;

pub use framing::{read_packet, write_packet, FrameError, MAX_FRAME_LEN};

pub const BOARD_WIDTH: f32 = 800.0;
pub const BOARD_HEIGHT: f32 = 400.0;
pub const PADDLE_WIDTH: f32 = 10.0;
pub const PADDLE_HEIGHT: f32 = 100.0;
pub const BALL_SIZE: f32 = 10.0;
/// Pixels per second a client may move its paddle.
pub const PADDLE_SPEED: f32 = 480.0;
/// Pixels per second along the horizontal axis.
pub const BALL_SPEED: f32 = 300.0;
pub const WINNING_SCORE: u32 = 5;
pub const TICK_RATE: u32 = 60;
pub const PROTOCOL_VERSION: u32 = 1;

/// Anonymous identity handed out by the server on connect.
pub type PlayerId = u32;
pub type RoomId = u32;

/// Tunable simulation parameters. `Default` matches the protocol constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub board_width: f32,
    pub board_height: f32,
    pub paddle_width: f32,
    pub paddle_height: f32,
    pub ball_size: f32,
    pub paddle_speed: f32,
    pub ball_speed: f32,
    pub winning_score: u32,
    pub tick_rate: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board_width: BOARD_WIDTH,
            board_height: BOARD_HEIGHT,
            paddle_width: PADDLE_WIDTH,
            paddle_height: PADDLE_HEIGHT,
            ball_size: BALL_SIZE,
            paddle_speed: PADDLE_SPEED,
            ball_speed: BALL_SPEED,
            winning_score: WINNING_SCORE,
            tick_rate: TICK_RATE,
        }
    }
}

impl GameConfig {
    /// Seconds simulated by one tick.
    pub fn tick_dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }

    pub fn max_paddle_y(&self) -> f32 {
        self.board_height - self.paddle_height
    }

    /// Paddle position that centres the paddle vertically.
    pub fn centered_paddle_y(&self) -> f32 {
        self.max_paddle_y() / 2.0
    }
}

/// One of the two fixed positions in a room. Slot one defends the left edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    One,
    Two,
}

impl Slot {
    pub fn number(self) -> u8 {
        match self {
            Slot::One => 1,
            Slot::Two => 2,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Slot::One => 0,
            Slot::Two => 1,
        }
    }

    pub fn opponent(self) -> Slot {
        match self {
            Slot::One => Slot::Two,
            Slot::Two => Slot::One,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSlot {
    pub identity: PlayerId,
    pub paddle_y: f32,
    pub score: u32,
    pub ready: bool,
}

impl PlayerSlot {
    pub fn new(identity: PlayerId, config: &GameConfig) -> Self {
        Self {
            identity,
            paddle_y: config.centered_paddle_y(),
            score: 0,
            ready: false,
        }
    }

    pub fn paddle_center(&self, config: &GameConfig) -> f32 {
        self.paddle_y + config.paddle_height / 2.0
    }
}

/// Ball position is the top-left corner of a `ball_size` square.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub velocity_x: f32,
    pub velocity_y: f32,
}

impl Ball {
    pub fn center(&self, config: &GameConfig) -> (f32, f32) {
        (self.x + config.ball_size / 2.0, self.y + config.ball_size / 2.0)
    }
}

/// Complete room state pushed to both players.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub room_id: RoomId,
    pub tick: u32,
    pub slot1: Option<PlayerSlot>,
    pub slot2: Option<PlayerSlot>,
    pub ball: Ball,
    pub started: bool,
    pub ended: bool,
    pub winner: Option<PlayerId>,
}

impl Snapshot {
    pub fn slot(&self, slot: Slot) -> Option<&PlayerSlot> {
        match slot {
            Slot::One => self.slot1.as_ref(),
            Slot::Two => self.slot2.as_ref(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    Connect {
        client_version: u32,
    },
    Ready,
    PaddleMove {
        y: f32,
    },
    Disconnect,

    PlayerJoined {
        identity: PlayerId,
        slot: Slot,
    },
    WaitingForPlayer,
    RoomReady(Snapshot),
    GameStateUpdate(Snapshot),
    GameStarted,
    GameEnded {
        winner: PlayerId,
    },
    PlayerLeft {
        identity: PlayerId,
    },
    Disconnected {
        reason: String,
    },
}
