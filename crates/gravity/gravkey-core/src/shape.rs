//! Rider shapes: per-contact-point offsets used as teleport targets.

use std::borrow::Cow;

use hashbrown::HashMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::contact::ContactPoint;
use crate::data::{RiderSnapshot, Vec2};
use crate::error::{GravityError, Result};

/// Named table of offsets keyed by contact point. Offsets are only meaningful
/// relative to one another.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub name: String,
    pub offsets: HashMap<ContactPoint, Vec2>,
}

impl Shape {
    pub fn new(
        name: impl Into<String>,
        offsets: impl IntoIterator<Item = (ContactPoint, Vec2)>,
    ) -> Self {
        Self {
            name: name.into(),
            offsets: offsets.into_iter().collect(),
        }
    }

    fn from_table(name: &str, table: &[(ContactPoint, f64, f64)]) -> Self {
        Shape::new(
            name,
            table.iter().map(|&(cp, x, y)| (cp, Vec2::new(x, y))),
        )
    }

    #[inline]
    pub fn get(&self, cp: ContactPoint) -> Option<Vec2> {
        self.offsets.get(&cp).copied()
    }

    pub fn contains(&self, cp: ContactPoint) -> bool {
        self.offsets.contains_key(&cp)
    }

    pub fn offset(&self, cp: ContactPoint) -> Result<Vec2> {
        self.get(cp).ok_or_else(|| GravityError::MissingShapePoint {
            shape: self.name.clone(),
            point: cp,
        })
    }

    /// Same shape re-expressed with `anchor` at the origin.
    pub fn relative_to(&self, anchor: ContactPoint) -> Result<Shape> {
        let origin = self.offset(anchor)?;
        Ok(Shape::new(
            self.name.clone(),
            self.offsets.iter().map(|(cp, off)| (*cp, *off - origin)),
        ))
    }
}

use ContactPoint as Cp;

/// Standing pose of the stock rider.
pub static DEFAULT_SHAPE: Lazy<Shape> = Lazy::new(|| {
    Shape::from_table(
        "default",
        &[
            (Cp::PEG, 0.0, 0.0),
            (Cp::TAIL, 0.0, 5.0),
            (Cp::NOSE, 15.0, 5.0),
            (Cp::STRING, 17.5, 0.0),
            (Cp::BUTT, 5.0, 0.0),
            (Cp::SHOULDER, 5.0, -5.5),
            (Cp::RHAND, 11.5, -5.0),
            (Cp::LHAND, 11.5, -5.0),
            (Cp::LFOOT, 10.0, 5.0),
            (Cp::RFOOT, 10.0, 5.0),
            (Cp::SCARF_0, 3.0, -5.5),
            (Cp::SCARF_1, 1.0, -5.5),
            (Cp::SCARF_2, -1.0, -5.5),
            (Cp::SCARF_3, -3.0, -5.5),
            (Cp::SCARF_4, -5.0, -5.5),
            (Cp::SCARF_5, -7.0, -5.5),
            (Cp::SCARF_6, -9.0, -5.5),
        ],
    )
});

/// Flattened, stretched-out line pose.
pub static KRAMUAL_SHAPE: Lazy<Shape> = Lazy::new(|| {
    Shape::from_table(
        "kramual",
        &[
            (Cp::PEG, 0.0, 0.0),
            (Cp::TAIL, -0.48, 0.0),
            (Cp::NOSE, 16.9, 0.0),
            (Cp::STRING, 20.7, 0.0),
            (Cp::BUTT, 4.85, 0.0),
            (Cp::SHOULDER, 6.42, 0.0),
            (Cp::RHAND, 13.11, 0.0),
            (Cp::LHAND, 12.61, 0.0),
            (Cp::LFOOT, 12.57, 0.0),
            (Cp::RFOOT, 12.24, 0.0),
            (Cp::SCARF_0, 8.42, 0.02),
            (Cp::SCARF_1, 10.42, -0.02),
            (Cp::SCARF_2, 12.42, 0.01),
            (Cp::SCARF_3, 14.42, 0.06),
            (Cp::SCARF_4, 16.42, 0.05),
            (Cp::SCARF_5, 18.42, 0.0),
            (Cp::SCARF_6, 20.42, -0.01),
        ],
    )
});

/// Sled laid out around the rider's BUTT.
pub static SLED_ON_RIDER_SHAPE: Lazy<Shape> = Lazy::new(|| {
    Shape::from_table(
        "sled_on_rider",
        &[
            (Cp::BUTT, 0.0, 0.0),
            (Cp::PEG, 0.0, 0.0),
            (Cp::TAIL, -10.0, 0.0),
            (Cp::NOSE, 10.0, 0.0),
            (Cp::STRING, 0.0, -5.0),
        ],
    )
});

/// Body laid out around the sled's PEG.
pub static RIDER_ON_SLED_SHAPE: Lazy<Shape> = Lazy::new(|| {
    Shape::from_table(
        "rider_on_sled",
        &[
            (Cp::PEG, 0.0, 0.0),
            (Cp::BUTT, 0.0, 0.0),
            (Cp::SHOULDER, 0.0, -10.0),
            (Cp::RHAND, 8.0, -5.0),
            (Cp::LHAND, -8.0, -5.0),
            (Cp::LFOOT, -5.0, 8.0),
            (Cp::RFOOT, 5.0, 8.0),
        ],
    )
});

/// Shape of a rider as it currently is: each point's offset from `anchor`.
pub fn capture_shape(snapshot: &RiderSnapshot, anchor: ContactPoint) -> Result<Shape> {
    let origin = snapshot
        .point(anchor)
        .ok_or(GravityError::MissingAnchor(anchor))?
        .pos;
    Ok(Shape::new(
        "current",
        snapshot.iter().map(|(cp, state)| (cp, state.pos - origin)),
    ))
}

/// Where a teleport takes its shape from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeSource {
    Default,
    Kramual,
    SledOnRider,
    RiderOnSled,
    /// Captured from the live snapshot at evaluation time.
    Current,
    Custom(Shape),
}

impl ShapeSource {
    pub fn resolve<'a>(
        &'a self,
        snapshot: &RiderSnapshot,
        anchor: ContactPoint,
    ) -> Result<Cow<'a, Shape>> {
        Ok(match self {
            ShapeSource::Default => Cow::Borrowed(&*DEFAULT_SHAPE),
            ShapeSource::Kramual => Cow::Borrowed(&*KRAMUAL_SHAPE),
            ShapeSource::SledOnRider => Cow::Borrowed(&*SLED_ON_RIDER_SHAPE),
            ShapeSource::RiderOnSled => Cow::Borrowed(&*RIDER_ON_SLED_SHAPE),
            ShapeSource::Current => Cow::Owned(capture_shape(snapshot, anchor)?),
            ShapeSource::Custom(shape) => Cow::Borrowed(shape),
        })
    }

    /// Custom shapes must be checked against their anchor and targets up
    /// front; the named tables cover every point they are used with.
    pub fn custom(&self) -> Option<&Shape> {
        match self {
            ShapeSource::Custom(shape) => Some(shape),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::POINTS_PER_RIDER;
    use crate::data::PointState;

    #[test]
    fn full_tables_cover_every_point() {
        assert_eq!(DEFAULT_SHAPE.offsets.len(), POINTS_PER_RIDER);
        assert_eq!(KRAMUAL_SHAPE.offsets.len(), POINTS_PER_RIDER);
        assert_eq!(KRAMUAL_SHAPE.get(Cp::STRING), Some(Vec2::new(20.7, 0.0)));
    }

    #[test]
    fn relative_to_moves_anchor_to_origin() {
        let rel = DEFAULT_SHAPE.relative_to(Cp::BUTT).unwrap();
        assert_eq!(rel.get(Cp::BUTT), Some(Vec2::ZERO));
        assert_eq!(rel.get(Cp::PEG), Some(Vec2::new(-5.0, 0.0)));
    }

    #[test]
    fn missing_point_is_an_error() {
        let err = SLED_ON_RIDER_SHAPE.offset(Cp::LHAND).unwrap_err();
        assert!(matches!(err, GravityError::MissingShapePoint { point, .. } if point == Cp::LHAND));
    }

    #[test]
    fn capture_uses_anchor_as_origin() {
        let snap = RiderSnapshot::new(vec![
            PointState::new(Vec2::new(10.0, 10.0), Vec2::ZERO),
            PointState::new(Vec2::new(12.0, 9.0), Vec2::new(1.0, 1.0)),
        ]);
        let shape = capture_shape(&snap, Cp::TAIL).unwrap();
        assert_eq!(shape.get(Cp::PEG), Some(Vec2::new(-2.0, 1.0)));
        assert_eq!(shape.get(Cp::TAIL), Some(Vec2::ZERO));
        assert!(matches!(
            capture_shape(&snap, Cp::NOSE),
            Err(GravityError::MissingAnchor(cp)) if cp == Cp::NOSE
        ));
    }
}
