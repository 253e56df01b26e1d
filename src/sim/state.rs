//! Game state and core simulation types
//!
//! Everything the authority replicates lives here; the positions the client
//! needs to see smoothly are `Net*` values.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::shape::Shape;
use crate::consts::*;
use crate::net::{NetNumber, NetVector};
use crate::settings::Rules;

/// Left or right end of the field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }

    #[inline]
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Sign of the x axis pointing from this side's wall into the field
    #[inline]
    pub fn inward(self) -> f32 {
        match self {
            Side::Left => 1.0,
            Side::Right => -1.0,
        }
    }
}

/// One of the two independently flippable paddle halves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Half {
    Upper,
    Lower,
}

impl Half {
    /// Collision order: upper before lower
    pub const ORDER: [Half; 2] = [Half::Upper, Half::Lower];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Half::Upper => 0,
            Half::Lower => 1,
        }
    }

    /// +1 for the half extending up from the pivot, -1 for down
    #[inline]
    fn along(self) -> f32 {
        match self {
            Half::Upper => 1.0,
            Half::Lower => -1.0,
        }
    }
}

/// Current phase of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Ball parked at center waiting for the scheduled launch
    Respawning,
    /// Ball in flight
    Playing,
    /// A side reached the winning score
    GameOver,
}

/// Match score, never decreases within a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Score {
    pub left: u32,
    pub right: u32,
}

impl Score {
    pub fn get(&self, side: Side) -> u32 {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub fn award(&mut self, side: Side, points: u32) {
        match side {
            Side::Left => self.left = self.left.saturating_add(points),
            Side::Right => self.right = self.right.saturating_add(points),
        }
    }

    /// First side at or above `target`
    pub fn winner(&self, target: u32) -> Option<Side> {
        if self.left >= target && self.left >= self.right {
            Some(Side::Left)
        } else if self.right >= target {
            Some(Side::Right)
        } else {
            None
        }
    }

    /// End screen format, "left - right"
    pub fn display(&self) -> String {
        format!("{} - {}", self.left, self.right)
    }
}

/// The ball
#[derive(Debug, Clone)]
pub struct Ball {
    pub pos: NetVector,
    /// Written by physics on the authority; echoed from the host on the client
    pub vel: Vec2,
    pub radius: f32,
}

impl Ball {
    pub fn new() -> Self {
        Self {
            pos: NetVector::new(Vec2::ZERO),
            vel: Vec2::ZERO,
            radius: BALL_RADIUS,
        }
    }

    /// Park at center. A fresh net value so the client has no delta to replay.
    pub fn reset(&mut self) {
        self.pos = NetVector::new(Vec2::ZERO);
        self.vel = Vec2::ZERO;
    }
}

impl Default for Ball {
    fn default() -> Self {
        Self::new()
    }
}

/// Vertical travel limit for a paddle pivot
pub const PADDLE_TRAVEL: f32 = FIELD_HALF_HEIGHT - PADDLE_HALF_LENGTH;
/// Paddle follow speed toward its control target (units/s)
pub const PADDLE_MAX_SPEED: f32 = 1200.0;

/// A two-part paddle
#[derive(Debug, Clone)]
pub struct Paddle {
    pub side: Side,
    /// Pivot position along the vertical axis
    pub pos: NetNumber,
    /// Flip state per half (upper, lower)
    pub flips: [bool; 2],
}

impl Paddle {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            pos: NetNumber::new(0.0),
            flips: [false; 2],
        }
    }

    /// Fixed x of the paddle pivot
    pub fn x(&self) -> f32 {
        -self.side.inward() * (FIELD_HALF_WIDTH - PADDLE_INSET)
    }

    /// Next pivot position moving toward `target` at capped speed
    pub fn step_toward(&self, target: f32, dt: f32) -> f32 {
        let target = target.clamp(-PADDLE_TRAVEL, PADDLE_TRAVEL);
        let current = self.pos.get();
        let max_delta = PADDLE_MAX_SPEED * dt;
        current + (target - current).clamp(-max_delta, max_delta)
    }

    /// Collision shape of one half. A flipped half swings its far end toward
    /// the field around the pivot and shifts inward.
    pub fn half_shape(&self, half: Half) -> Shape {
        let inward = self.side.inward();
        let along = half.along();
        let mut center = Vec2::new(self.x(), self.pos.get());
        let mut rotation = 0.0;
        if self.flips[half.index()] {
            center.x += FLIP_NUDGE * inward;
            rotation = -FLIP_ANGLE * inward * along;
        }
        Shape::Rectangle {
            center,
            size: Vec2::new(PADDLE_THICKNESS, PADDLE_HALF_LENGTH),
            rotation,
            origin_offset: Vec2::new(0.0, along * PADDLE_HALF_LENGTH / 2.0),
        }
    }
}

/// How a bumper should be coloured for a given viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BumperMood {
    #[default]
    Neutral,
    /// Last lit by the viewer's own hit
    Favorable,
    /// Last lit by the opponent
    Unfavorable,
}

/// Fixed circular obstacle that reflects and accelerates the ball
#[derive(Debug, Clone)]
pub struct Bumper {
    pub center: Vec2,
    pub radius: f32,
    /// Ticks of glow left from the last hit
    pub glow_ticks: u32,
    /// Side credited for the last hit
    pub lit_by: Option<Side>,
}

impl Bumper {
    pub fn new(center: Vec2) -> Self {
        Self {
            center,
            radius: BUMPER_RADIUS,
            glow_ticks: 0,
            lit_by: None,
        }
    }

    pub fn shape(&self) -> Shape {
        Shape::Circle {
            center: self.center,
            radius: self.radius,
        }
    }

    pub fn light(&mut self, by: Option<Side>) {
        self.glow_ticks = BUMPER_GLOW_TICKS;
        self.lit_by = by;
    }

    pub fn decay(&mut self) {
        if self.glow_ticks > 0 {
            self.glow_ticks -= 1;
            if self.glow_ticks == 0 {
                self.lit_by = None;
            }
        }
    }

    pub fn mood(&self, viewer: Side) -> BumperMood {
        match self.lit_by {
            Some(side) if side == viewer => BumperMood::Favorable,
            Some(_) => BumperMood::Unfavorable,
            None => BumperMood::Neutral,
        }
    }
}

/// Deferred relaunch after a goal or match start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingLaunch {
    /// Round the launch belongs to; ignored once the round has moved on
    pub round: u32,
    pub fire_at_tick: u64,
    /// Side the ball is launched toward
    pub toward: Side,
}

/// Things that happened during a tick, for audio/effects collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    WallBounce,
    PaddleHit { side: Side, half: Half },
    BumperHit { index: usize, credited: Option<Side> },
    Goal { scorer: Side },
    Launch { toward: Side },
    MatchOver { winner: Side },
}

/// Complete match state
#[derive(Debug, Clone)]
pub struct GameState {
    pub rules: Rules,
    pub seed: u64,
    /// Bumped on every goal and new match; tags pending launches
    pub round: u32,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub phase: GamePhase,
    pub ball: Ball,
    /// Indexed by `Side::index`
    pub paddles: [Paddle; 2],
    /// Collision order is vector order
    pub bumpers: Vec<Bumper>,
    pub score: Score,
    /// Side whose paddle touched the ball most recently
    pub last_touch: Option<Side>,
    pub pending: Vec<PendingLaunch>,
    rng: Pcg32,
}

impl GameState {
    /// Create a match and schedule its opening launch
    pub fn new(seed: u64, rules: Rules) -> Self {
        let mut state = Self {
            rules,
            seed,
            round: 0,
            time_ticks: 0,
            phase: GamePhase::Respawning,
            ball: Ball::new(),
            paddles: [Paddle::new(Side::Left), Paddle::new(Side::Right)],
            bumpers: vec![
                Bumper::new(Vec2::new(0.0, BUMPER_OFFSET_Y)),
                Bumper::new(Vec2::new(0.0, -BUMPER_OFFSET_Y)),
            ],
            score: Score::default(),
            last_touch: None,
            pending: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
        };
        state.schedule_opening_launch();
        state
    }

    pub fn paddle(&self, side: Side) -> &Paddle {
        &self.paddles[side.index()]
    }

    pub fn paddle_mut(&mut self, side: Side) -> &mut Paddle {
        &mut self.paddles[side.index()]
    }

    /// Start over with a clean score. Launches from the previous round are
    /// left queued and discarded when they come due.
    pub fn new_match(&mut self) {
        self.round += 1;
        self.score = Score::default();
        self.last_touch = None;
        self.ball.reset();
        for bumper in &mut self.bumpers {
            bumper.glow_ticks = 0;
            bumper.lit_by = None;
        }
        self.phase = GamePhase::Respawning;
        self.schedule_opening_launch();
        log::info!("New match (round {})", self.round);
    }

    /// Park the ball, advance the round and queue a relaunch toward `toward`
    pub fn schedule_launch(&mut self, toward: Side) {
        self.ball.reset();
        self.phase = GamePhase::Respawning;
        self.pending.push(PendingLaunch {
            round: self.round,
            fire_at_tick: self.time_ticks + RESPAWN_DELAY_TICKS,
            toward,
        });
    }

    fn schedule_opening_launch(&mut self) {
        let toward = if self.rng.random_bool(0.5) {
            Side::Left
        } else {
            Side::Right
        };
        self.schedule_launch(toward);
    }

    /// Base-speed velocity at a random angle inside the launch cone
    pub fn launch_velocity(&mut self, toward: Side) -> Vec2 {
        let angle = self.rng.random_range(-LAUNCH_CONE..=LAUNCH_CONE);
        let dir = -toward.inward();
        Vec2::new(dir * angle.cos(), angle.sin()) * BALL_BASE_SPEED
    }

    /// Bumper colours as seen from `viewer`
    pub fn bumper_moods(&self, viewer: Side) -> Vec<BumperMood> {
        self.bumpers.iter().map(|b| b.mood(viewer)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_waits_for_launch() {
        let state = GameState::new(1, Rules::default());
        assert_eq!(state.phase, GamePhase::Respawning);
        assert_eq!(state.pending.len(), 1);
        assert_eq!(state.pending[0].round, 0);
        assert_eq!(state.pending[0].fire_at_tick, RESPAWN_DELAY_TICKS);
        assert_eq!(state.ball.pos.get(), Vec2::ZERO);
    }

    #[test]
    fn test_launch_velocity_stays_in_cone() {
        let mut state = GameState::new(42, Rules::default());
        for _ in 0..100 {
            let v = state.launch_velocity(Side::Right);
            assert!(v.x > 0.0);
            assert!((v.length() - BALL_BASE_SPEED).abs() < 0.01);
            assert!(v.y.atan2(v.x).abs() <= LAUNCH_CONE + 1e-4);

            let v = state.launch_velocity(Side::Left);
            assert!(v.x < 0.0);
        }
    }

    #[test]
    fn test_score_winner_and_display() {
        let mut score = Score::default();
        score.award(Side::Right, 5);
        assert_eq!(score.winner(10), None);
        score.award(Side::Right, 5);
        assert_eq!(score.winner(10), Some(Side::Right));
        assert_eq!(score.display(), "0 - 10");
    }

    #[test]
    fn test_paddle_step_respects_speed_and_travel() {
        let paddle = Paddle::new(Side::Left);
        let dt = SIM_DT;
        let y = paddle.step_toward(10_000.0, dt);
        assert!((y - PADDLE_MAX_SPEED * dt).abs() < 1e-4);

        let mut paddle = Paddle::new(Side::Left);
        for _ in 0..1000 {
            let y = paddle.step_toward(10_000.0, dt);
            paddle.pos.update_truth(y);
        }
        assert_eq!(paddle.pos.get(), PADDLE_TRAVEL);
    }

    #[test]
    fn test_flipped_half_tilts_toward_field() {
        let mut paddle = Paddle::new(Side::Left);
        paddle.flips = [true, true];
        for half in Half::ORDER {
            let Shape::Rectangle {
                center,
                rotation,
                origin_offset,
                ..
            } = paddle.half_shape(half)
            else {
                panic!("paddle half must be a rectangle");
            };
            let mid = center + crate::rotate(origin_offset, rotation);
            assert!(mid.x > paddle.x(), "{half:?} should swing inward");
        }

        let mut right = Paddle::new(Side::Right);
        right.flips = [true, false];
        let Shape::Rectangle { center, rotation, origin_offset, .. } = right.half_shape(Half::Upper)
        else {
            panic!("paddle half must be a rectangle");
        };
        assert!((center + crate::rotate(origin_offset, rotation)).x < right.x());
    }

    #[test]
    fn test_bumper_mood_relative_to_viewer() {
        let mut bumper = Bumper::new(Vec2::ZERO);
        assert_eq!(bumper.mood(Side::Left), BumperMood::Neutral);
        bumper.light(Some(Side::Left));
        assert_eq!(bumper.mood(Side::Left), BumperMood::Favorable);
        assert_eq!(bumper.mood(Side::Right), BumperMood::Unfavorable);
        for _ in 0..BUMPER_GLOW_TICKS {
            bumper.decay();
        }
        assert_eq!(bumper.mood(Side::Left), BumperMood::Neutral);
    }
}
