//! Networked values with local prediction
//!
//! A `NetValue` keeps the latest authoritative value (`truth`), the one before
//! it (`last_truth`) and what is shown this frame (`current`). The writer snaps
//! `current` to every truth it produces; the reader dead-reckons between
//! updates using the delta of the last two truths.

use glam::Vec2;

use crate::consts::PREDICTION_PULL;

/// How a value extrapolates its displayed state between truth updates
pub trait Extrapolate: Copy {
    /// Next displayed value given the last two truths
    fn extrapolate(current: Self, truth: Self, last_truth: Self) -> Self;
}

impl Extrapolate for f32 {
    /// Replays the last authoritative delta
    #[inline]
    fn extrapolate(current: f32, truth: f32, last_truth: f32) -> f32 {
        current + (truth - last_truth)
    }
}

impl Extrapolate for Vec2 {
    /// Replays the last authoritative delta and pulls a fraction of the way
    /// back toward truth so varying deltas cannot drift forever
    #[inline]
    fn extrapolate(current: Vec2, truth: Vec2, last_truth: Vec2) -> Vec2 {
        current + (truth - last_truth) + (truth - current) * PREDICTION_PULL
    }
}

/// Authoritative value plus its locally displayed estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetValue<T> {
    truth: T,
    last_truth: T,
    current: T,
}

/// Networked scalar (paddle positions)
pub type NetNumber = NetValue<f32>;
/// Networked 2D vector (ball position)
pub type NetVector = NetValue<Vec2>;

impl<T: Extrapolate> NetValue<T> {
    pub fn new(initial: T) -> Self {
        Self {
            truth: initial,
            last_truth: initial,
            current: initial,
        }
    }

    /// Authoritative write. Displayed value snaps to `value` immediately.
    pub fn update_truth(&mut self, value: T) {
        self.last_truth = self.truth;
        self.truth = value;
        self.current = value;
    }

    /// Local override of the displayed value only
    pub fn update(&mut self, value: T) {
        self.current = value;
    }

    /// Advance the displayed value one frame without new truth
    pub fn predict(&mut self) {
        self.current = T::extrapolate(self.current, self.truth, self.last_truth);
    }

    /// Value to present this frame
    #[inline]
    pub fn get(&self) -> T {
        self.current
    }

    #[inline]
    pub fn truth(&self) -> T {
        self.truth
    }

    #[inline]
    pub fn last_truth(&self) -> T {
        self.last_truth
    }
}
