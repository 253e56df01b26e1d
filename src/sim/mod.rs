//! Authoritative simulation module
//!
//! All gameplay logic lives here. Only the authority steps physics:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Fixed collision order (walls, paddles upper then lower, bumpers in order)
//! - No rendering or platform dependencies

pub mod collision;
pub mod shape;
pub mod state;
pub mod tick;

pub use collision::{Contact, reflect_velocity};
pub use shape::{Shape, resolve};
pub use state::{
    Ball, Bumper, BumperMood, GameEvent, GamePhase, GameState, Half, PADDLE_TRAVEL, Paddle,
    PendingLaunch, Score, Side,
};
pub use tick::{TickInput, TickReport, extrapolate, tick};
