//! Pure ball and paddle physics.
//!
//! Nothing here owns state; the server feeds a room's ball and slots through
//! [`advance`] once per tick. Randomness only enters through [`reset_ball`].

use crate::{Ball, GameConfig, PlayerSlot, Slot};
use rand::Rng;

/// Places the ball at the centre of the board heading toward a random side.
pub fn reset_ball<R: Rng + ?Sized>(config: &GameConfig, rng: &mut R) -> Ball {
    let speed = config.ball_speed;
    let velocity_x = if rng.gen_bool(0.5) { speed } else { -speed };
    let velocity_y = rng.gen_range(-speed / 2.0..=speed / 2.0);

    Ball {
        x: (config.board_width - config.ball_size) / 2.0,
        y: (config.board_height - config.ball_size) / 2.0,
        velocity_x,
        velocity_y,
    }
}

/// Clamps a requested paddle position onto the board. NaN maps to the top.
pub fn clamp_paddle(config: &GameConfig, y: f32) -> f32 {
    if y.is_nan() {
        return 0.0;
    }
    y.clamp(0.0, config.max_paddle_y())
}

/// Advances the ball by `dt` seconds.
///
/// Returns the new ball and, when it left the board, the slot that scored.
/// A scoring ball is left out of bounds; the caller must replace it with
/// [`reset_ball`] before publishing state.
pub fn advance(
    config: &GameConfig,
    ball: Ball,
    slot1: Option<&PlayerSlot>,
    slot2: Option<&PlayerSlot>,
    dt: f32,
) -> (Ball, Option<Slot>) {
    let mut ball = ball;
    ball.x += ball.velocity_x * dt;
    ball.y += ball.velocity_y * dt;

    bounce_off_walls(config, &mut ball);

    // A ball that just bounced off a wall may still be in paddle range.
    if let Some(slot) = slot1 {
        bounce_off_left_paddle(config, &mut ball, slot);
    }
    if let Some(slot) = slot2 {
        bounce_off_right_paddle(config, &mut ball, slot);
    }

    let scored = if ball.x <= 0.0 {
        Some(Slot::Two)
    } else if ball.x >= config.board_width {
        Some(Slot::One)
    } else {
        None
    };

    (ball, scored)
}

/// First slot at or above `winning_score`. Only one score moves per tick so
/// both slots can never cross the line together.
pub fn check_win(
    slot1: Option<&PlayerSlot>,
    slot2: Option<&PlayerSlot>,
    winning_score: u32,
) -> Option<Slot> {
    if slot1.is_some_and(|s| s.score >= winning_score) {
        Some(Slot::One)
    } else if slot2.is_some_and(|s| s.score >= winning_score) {
        Some(Slot::Two)
    } else {
        None
    }
}

fn bounce_off_walls(config: &GameConfig, ball: &mut Ball) {
    let floor = config.board_height - config.ball_size;

    if ball.y <= 0.0 {
        ball.y = 0.0;
        ball.velocity_y = ball.velocity_y.abs();
    } else if ball.y >= floor {
        ball.y = floor;
        ball.velocity_y = -ball.velocity_y.abs();
    }
}

fn within_paddle(config: &GameConfig, ball: &Ball, slot: &PlayerSlot) -> bool {
    ball.y >= slot.paddle_y && ball.y <= slot.paddle_y + config.paddle_height
}

/// Offset of the ball from the paddle centre, in `[-1, 1]`.
fn hit_offset(config: &GameConfig, ball: &Ball, slot: &PlayerSlot) -> f32 {
    let half = config.paddle_height / 2.0;
    ((ball.y - slot.paddle_center(config)) / half).clamp(-1.0, 1.0)
}

fn bounce_off_left_paddle(config: &GameConfig, ball: &mut Ball, slot: &PlayerSlot) {
    if ball.velocity_x < 0.0 && ball.x <= config.paddle_width && within_paddle(config, ball, slot)
    {
        ball.velocity_x = -ball.velocity_x;
        ball.x = config.paddle_width;
        ball.velocity_y = hit_offset(config, ball, slot) * config.ball_speed;
    }
}

fn bounce_off_right_paddle(config: &GameConfig, ball: &mut Ball, slot: &PlayerSlot) {
    let face = config.board_width - config.paddle_width - config.ball_size;

    if ball.velocity_x > 0.0 && ball.x >= face && within_paddle(config, ball, slot) {
        ball.velocity_x = -ball.velocity_x;
        ball.x = face;
        ball.velocity_y = hit_offset(config, ball, slot) * config.ball_speed;
    }
}
