//! Per-tick payloads exchanged between host and client

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::sim::{GamePhase, Score, Side};

/// `{x, y}` on the wire
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl From<Vec2> for Point {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<Point> for Vec2 {
    fn from(p: Point) -> Self {
        Vec2::new(p.x, p.y)
    }
}

/// Authority → dependent, sent every frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostUpdate {
    pub ball_pos: Point,
    pub ball_vel: Point,
    pub score: Score,
    /// Host-controlled paddle
    pub host_paddle: f32,
    /// Last client paddle position the host applied
    pub client_paddle: f32,
    pub host_flips: [bool; 2],
    pub client_flips: [bool; 2],
    pub phase: GamePhase,
    /// Side each bumper is lit for, in bumper order
    #[serde(default)]
    pub bumpers: Vec<Option<Side>>,
}

/// Dependent → authority, sent every frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientUpdate {
    pub paddle: f32,
    pub flips: [bool; 2],
}
