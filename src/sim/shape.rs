//! Collision targets on the field

use glam::Vec2;

use super::collision::{Contact, ball_circle_collision, ball_rect_collision};

/// Obstacle geometry the ball can bounce off
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Rectangle that rotates about `center`; its middle sits at
    /// `origin_offset` in the unrotated frame
    Rectangle {
        center: Vec2,
        size: Vec2,
        rotation: f32,
        origin_offset: Vec2,
    },
    Circle {
        center: Vec2,
        radius: f32,
    },
}

/// Test a ball against any shape
pub fn resolve(shape: &Shape, ball_pos: Vec2, ball_radius: f32) -> Option<Contact> {
    match *shape {
        Shape::Rectangle {
            center,
            size,
            rotation,
            origin_offset,
        } => ball_rect_collision(ball_pos, ball_radius, center, size, rotation, origin_offset),
        Shape::Circle { center, radius } => {
            ball_circle_collision(ball_pos, ball_radius, center, radius)
        }
    }
}
