//! Collision detection and response
//!
//! Narrow-phase tests between the ball (a circle) and the two obstacle kinds
//! on the field: oriented rectangles (paddle halves) and circles (bumpers).

use glam::Vec2;

use crate::consts::{BUMPER_MIN_DEPTH, FIELD_HALF_HEIGHT, FIELD_HALF_WIDTH};
use crate::rotate;

/// A ball touching a surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Closest surface point to the ball center
    pub point: Vec2,
    /// Unit surface normal pointing toward the ball
    pub normal: Vec2,
    /// Overlap depth (for position correction)
    pub penetration: f32,
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Check a ball against a rectangle rotated about `center`
///
/// `origin_offset` places the rectangle's middle relative to `center` in the
/// rectangle's own (unrotated) frame, so the rectangle swings around `center`.
pub fn ball_rect_collision(
    ball_pos: Vec2,
    ball_radius: f32,
    center: Vec2,
    size: Vec2,
    rotation: f32,
    origin_offset: Vec2,
) -> Option<Contact> {
    // Ball center in the rectangle's local frame
    let local = rotate(ball_pos - center, -rotation) - origin_offset;
    let half = size * 0.5;
    let closest = local.clamp(-half, half);
    let diff = local - closest;
    let dist_sq = diff.length_squared();

    if dist_sq > ball_radius * ball_radius {
        return None;
    }

    let (local_normal, penetration) = if dist_sq > 1e-8 {
        let dist = dist_sq.sqrt();
        (diff / dist, ball_radius - dist)
    } else {
        // Center inside the rectangle: leave through the nearest face
        let to_x = half.x - local.x.abs();
        let to_y = half.y - local.y.abs();
        if to_x <= to_y {
            (Vec2::new(local.x.signum(), 0.0), to_x + ball_radius)
        } else {
            (Vec2::new(0.0, local.y.signum()), to_y + ball_radius)
        }
    };

    Some(Contact {
        point: center + rotate(closest + origin_offset, rotation),
        normal: rotate(local_normal, rotation),
        penetration,
    })
}

/// Check a ball against a circle
///
/// A ball whose center is already deep inside (closer than
/// `BUMPER_MIN_DEPTH` of the radius) does not register, so an overlapping
/// ball cannot re-trigger every tick.
pub fn ball_circle_collision(
    ball_pos: Vec2,
    ball_radius: f32,
    center: Vec2,
    radius: f32,
) -> Option<Contact> {
    let offset = ball_pos - center;
    let dist = offset.length();

    if dist > radius + ball_radius || dist <= radius * BUMPER_MIN_DEPTH {
        return None;
    }

    let normal = offset.normalize_or_zero();
    if normal == Vec2::ZERO {
        return None;
    }

    Some(Contact {
        point: center + normal * radius,
        normal,
        penetration: radius + ball_radius - dist,
    })
}

/// Field boundary crossed by a probe point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wall {
    Left,
    Right,
    Top,
    Bottom,
}

impl Wall {
    /// Normal pointing back into the field
    pub fn normal(self) -> Vec2 {
        match self {
            Wall::Left => Vec2::X,
            Wall::Right => Vec2::NEG_X,
            Wall::Top => Vec2::NEG_Y,
            Wall::Bottom => Vec2::Y,
        }
    }
}

/// Side wall the probe has crossed while moving toward it
pub fn side_wall_crossing(probe: Vec2, velocity: Vec2) -> Option<Wall> {
    if velocity.x < 0.0 && probe.x < -FIELD_HALF_WIDTH {
        Some(Wall::Left)
    } else if velocity.x > 0.0 && probe.x > FIELD_HALF_WIDTH {
        Some(Wall::Right)
    } else {
        None
    }
}

/// Top/bottom wall the probe has crossed while moving toward it
pub fn end_wall_crossing(probe: Vec2, velocity: Vec2) -> Option<Wall> {
    if velocity.y > 0.0 && probe.y > FIELD_HALF_HEIGHT {
        Some(Wall::Top)
    } else if velocity.y < 0.0 && probe.y < -FIELD_HALF_HEIGHT {
        Some(Wall::Bottom)
    } else {
        None
    }
}
