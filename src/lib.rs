//! Pong Pinball - peer-to-peer netplay core
//!
//! Core modules:
//! - `sim`: Authoritative simulation (physics, collisions, scoring)
//! - `net`: Networked values, wire codec and peer session
//! - `game`: Frame driver tying simulation and session together
//! - `ai`: Computer opponent for local play
//! - `settings`: Match rules and tuning

pub mod ai;
pub mod game;
pub mod net;
pub mod settings;
pub mod sim;

pub use game::{FrameView, Match, MatchStatus};
pub use net::{NetNumber, NetValue, NetVector, Role};
pub use settings::Settings;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz for smooth physics)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Field extents (origin at center, +y up)
    pub const FIELD_HALF_WIDTH: f32 = 800.0;
    pub const FIELD_HALF_HEIGHT: f32 = 450.0;

    /// Paddle geometry - each paddle is two halves meeting at its pivot
    pub const PADDLE_INSET: f32 = 60.0;
    pub const PADDLE_THICKNESS: f32 = 18.0;
    pub const PADDLE_HALF_LENGTH: f32 = 90.0;
    /// Rotation of a flipped half (radians)
    pub const FLIP_ANGLE: f32 = 0.5;
    /// Shift of a flipped half toward the field
    pub const FLIP_NUDGE: f32 = 12.0;

    /// Ball defaults
    pub const BALL_RADIUS: f32 = 12.0;
    /// Speed the ball relaxes toward after boosts
    pub const BALL_BASE_SPEED: f32 = 600.0;
    /// Bleed rate above base speed (units/s²)
    pub const BALL_SPEED_DECAY: f32 = 150.0;
    /// Hard cap
    pub const BALL_MAX_SPEED: f32 = 1500.0;

    /// Bumpers
    pub const BUMPER_RADIUS: f32 = 50.0;
    pub const BUMPER_OFFSET_Y: f32 = 220.0;
    /// Speed multiplier applied on bumper bounce
    pub const BUMPER_BOOST: f32 = 1.25;
    /// Fraction of bumper radius the ball center must stay outside of to register
    pub const BUMPER_MIN_DEPTH: f32 = 0.5;
    /// Ticks a bumper stays lit after a hit
    pub const BUMPER_GLOW_TICKS: u32 = 30;

    /// Delay between a goal and the relaunch (1 second at 120 Hz)
    pub const RESPAWN_DELAY_TICKS: u64 = 120;
    /// Half-angle of the relaunch cone (radians)
    pub const LAUNCH_CONE: f32 = 0.6;

    /// Frame rate the vector prediction pull was tuned for
    pub const ASSUMED_FRAME_RATE: f32 = 60.0;
    /// Fraction of the truth residual recovered per second of prediction
    pub const PREDICTION_PULL_RATE: f32 = 3.0;
    /// Per-frame pull toward truth applied by `NetVector::predict`
    pub const PREDICTION_PULL: f32 = PREDICTION_PULL_RATE / ASSUMED_FRAME_RATE;
}

/// Component-wise sign, with zero staying zero
#[inline]
pub fn sign(v: Vec2) -> Vec2 {
    fn s(x: f32) -> f32 {
        if x > 0.0 {
            1.0
        } else if x < 0.0 {
            -1.0
        } else {
            0.0
        }
    }
    Vec2::new(s(v.x), s(v.y))
}

/// Rotate a vector counter-clockwise by `angle` radians
#[inline]
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    if angle == 0.0 {
        return v;
    }
    Vec2::from_angle(angle).rotate(v)
}
