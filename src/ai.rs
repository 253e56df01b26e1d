//! Computer opponent
//!
//! A PID controller chases the ball's height. Two gain sets: a lazy one that
//! loses now and then, and a twitchy one that rarely misses.

use crate::consts::PADDLE_THICKNESS;
use crate::sim::{GamePhase, GameState, Half, Side};

/// World units per controller unit
const WORLD_SCALE: f32 = 1000.0;
/// Distance in front of the paddle where the AI starts flipping
const FLIP_REACH: f32 = 60.0;

#[derive(Debug, Clone, Copy)]
struct Gains {
    /// Twitchiness. High = aggressive tracking.
    kp: f32,
    /// Drift correction for steady-state error
    ki: f32,
    /// Braking. High = precise stops.
    kd: f32,
}

const SLUGGISH: Gains = Gains {
    kp: 0.035,
    ki: 0.00005,
    kd: 0.0003,
};

const TWITCHY: Gains = Gains {
    kp: 0.025,
    ki: 0.0001,
    kd: 0.000_000_01,
};

/// PID tracker over a normalized [-1, 1] position
#[derive(Debug, Clone, Default)]
pub struct PidController {
    target: f32,
    integral: f32,
    last_error: f32,
    current: f32,
    twitchy: bool,
}

impl PidController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aim at a world-space height
    pub fn set_target(&mut self, world_y: f32, twitchy: bool) {
        self.target = world_y / WORLD_SCALE;
        self.twitchy = twitchy;
    }

    /// Step the controller. `dt_ms` is elapsed milliseconds.
    /// Returns the new output in world units.
    pub fn predict(&mut self, dt_ms: f32) -> f32 {
        if dt_ms <= 0.0 {
            return self.current * WORLD_SCALE;
        }

        let gains = if self.twitchy { TWITCHY } else { SLUGGISH };
        let error = self.target - self.current;

        let p_out = gains.kp * error;
        self.integral += error * dt_ms;
        let i_out = gains.ki * self.integral;
        let d_out = gains.kd * (error - self.last_error) / dt_ms;
        self.last_error = error;

        self.current = (self.current + p_out + i_out + d_out).clamp(-1.0, 1.0);
        self.current * WORLD_SCALE
    }
}

/// A paddle driven by the PID tracker
#[derive(Debug, Clone)]
pub struct Opponent {
    pub side: Side,
    pid: PidController,
    twitchy: bool,
}

/// What the opponent wants this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpponentMove {
    pub target: f32,
    pub flips: [bool; 2],
}

impl Opponent {
    pub fn new(side: Side, twitchy: bool) -> Self {
        Self {
            side,
            pid: PidController::new(),
            twitchy,
        }
    }

    /// Decide paddle target and flips for one tick of `dt` seconds
    pub fn think(&mut self, state: &GameState, dt: f32) -> OpponentMove {
        let paddle = state.paddle(self.side);
        let ball = state.ball.pos.truth();
        let vel = state.ball.vel;
        let incoming = state.phase == GamePhase::Playing && vel.x * self.side.inward() < 0.0;

        // Follow the ball while it comes at us, drift home otherwise
        let aim = if incoming { ball.y } else { 0.0 };
        self.pid.set_target(aim, self.twitchy);
        let target = self.pid.predict(dt * 1000.0);

        let mut flips = [false; 2];
        let gap = (ball.x - paddle.x()) * self.side.inward() - PADDLE_THICKNESS / 2.0;
        if incoming && (0.0..FLIP_REACH).contains(&gap) {
            let half = if ball.y >= paddle.pos.get() {
                Half::Upper
            } else {
                Half::Lower
            };
            flips[half.index()] = true;
        }

        OpponentMove { target, flips }
    }
}
