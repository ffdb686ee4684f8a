//! Geometry behind computed teleports: rotation, shape-relative target
//! placement and the one-step teleport acceleration.

use serde::{Deserialize, Serialize};

use crate::contact::ContactPoint;
use crate::data::{PointState, Vec2};
use crate::error::Result;
use crate::shape::Shape;

/// Rotate `offset` counter-clockwise by `degrees` (screen y points down, so
/// positive angles appear clockwise on screen).
#[inline]
pub fn rotate(offset: Vec2, degrees: f64) -> Vec2 {
    if degrees == 0.0 {
        return offset;
    }
    let (sin, cos) = degrees.to_radians().sin_cos();
    Vec2::new(
        offset.x * cos - offset.y * sin,
        offset.x * sin + offset.y * cos,
    )
}

/// `shape[point] - shape[anchor]`.
pub fn relative_offset(shape: &Shape, anchor: ContactPoint, point: ContactPoint) -> Result<Vec2> {
    Ok(shape.offset(point)? - shape.offset(anchor)?)
}

/// Where the shape is placed in world space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Anchor lands on this world position.
    Absolute(Vec2),
    /// Anchor lands on its own predicted position plus this offset.
    Relative(Vec2),
}

impl Default for Placement {
    fn default() -> Self {
        Placement::Relative(Vec2::ZERO)
    }
}

pub fn resolve_target_position(
    point: ContactPoint,
    anchor: ContactPoint,
    shape: &Shape,
    rotation: f64,
    placement: Placement,
    anchor_state: &PointState,
) -> Result<Vec2> {
    let rel = rotate(relative_offset(shape, anchor, point)?, rotation);
    Ok(match placement {
        Placement::Absolute(target) => target + rel,
        Placement::Relative(offset) => anchor_state.predicted() + rel + offset,
    })
}

/// Acceleration that lands a point exactly on `target` after one host step
/// (`vel' = vel + acc`, `pos' = pos + vel'`).
#[inline]
pub fn teleport_acceleration(target: Vec2, state: &PointState) -> Vec2 {
    target - state.pos - state.vel
}

/// The host integrator's step, for tests and offline previews.
#[inline]
pub fn integrate(state: &PointState, acceleration: Vec2) -> PointState {
    let vel = state.vel + acceleration;
    PointState::new(state.pos + vel, vel)
}
