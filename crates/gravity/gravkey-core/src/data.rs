//! Plain data shared by authoring and evaluation: vectors and live point
//! state as reported by the host.

use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

use crate::contact::{ContactPoint, POINTS_PER_RIDER};

/// 2D vector in host units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    #[inline]
    pub fn approx_eq(self, other: Vec2, eps: f64) -> bool {
        (self.x - other.x).abs() <= eps && (self.y - other.y).abs() <= eps
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    #[inline]
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    #[inline]
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    #[inline]
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    #[inline]
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl From<(f64, f64)> for Vec2 {
    fn from((x, y): (f64, f64)) -> Self {
        Vec2::new(x, y)
    }
}

/// Position and velocity of one contact point in a committed frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PointState {
    pub pos: Vec2,
    pub vel: Vec2,
}

impl PointState {
    pub const fn new(pos: Vec2, vel: Vec2) -> Self {
        Self { pos, vel }
    }

    /// Where the point will be next frame with no acceleration applied.
    #[inline]
    pub fn predicted(&self) -> Vec2 {
        self.pos + self.vel
    }
}

/// Point states of one rider in one committed frame, indexed by contact point.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RiderSnapshot {
    pub points: Vec<PointState>,
}

impl RiderSnapshot {
    pub fn new(points: Vec<PointState>) -> Self {
        Self { points }
    }

    #[inline]
    pub fn point(&self, cp: ContactPoint) -> Option<&PointState> {
        self.points.get(cp.index())
    }

    /// Iterate the points that map onto a valid contact point.
    pub fn iter(&self) -> impl Iterator<Item = (ContactPoint, &PointState)> + '_ {
        self.points
            .iter()
            .take(POINTS_PER_RIDER)
            .enumerate()
            .filter_map(|(i, state)| ContactPoint::new(i as u8).map(|cp| (cp, state)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_arithmetic() {
        let a = Vec2::new(1.0, 2.0);
        let b = Vec2::new(0.5, -1.0);
        assert_eq!(a + b, Vec2::new(1.5, 1.0));
        assert_eq!(a - b, Vec2::new(0.5, 3.0));
        assert_eq!(-a, Vec2::new(-1.0, -2.0));
        assert_eq!(a * 2.0, Vec2::new(2.0, 4.0));
    }

    #[test]
    fn snapshot_json_matches_host_layout() {
        let snap: RiderSnapshot = serde_json::from_str(
            r#"{ "points": [ { "pos": { "x": 1, "y": 2 }, "vel": { "x": 0.5, "y": 0 } } ] }"#,
        )
        .unwrap();
        let peg = snap.point(ContactPoint::PEG).unwrap();
        assert_eq!(peg.predicted(), Vec2::new(1.5, 2.0));
        assert!(snap.point(ContactPoint::TAIL).is_none());
    }
}
