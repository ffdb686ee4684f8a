//! Riders as handed to the host, plus bulk generation helpers.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_RIDER_GRAVITY;
use crate::data::Vec2;
use crate::error::{GravityError, Result};
use crate::keyframe::{Keyframe, RiderTimeline};

/// One rider. Serialized in the host's rider layout; the timeline travels
/// separately through the keyframe stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rider {
    pub id: String,
    #[serde(default)]
    pub start_position: Vec2,
    #[serde(default)]
    pub start_velocity: Vec2,
    #[serde(default)]
    pub start_angle: f64,
    #[serde(default = "default_remountable")]
    pub remountable: bool,
    #[serde(default = "default_gravity")]
    pub default_gravity: Vec2,
    #[serde(default)]
    pub groups: BTreeSet<String>,
    #[serde(skip)]
    pub timeline: RiderTimeline,
}

fn default_remountable() -> bool {
    true
}

fn default_gravity() -> Vec2 {
    DEFAULT_RIDER_GRAVITY
}

impl Rider {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            start_position: Vec2::ZERO,
            start_velocity: Vec2::ZERO,
            start_angle: 0.0,
            remountable: true,
            default_gravity: DEFAULT_RIDER_GRAVITY,
            groups: BTreeSet::new(),
            timeline: RiderTimeline::new(),
        }
    }

    pub fn with_start_position(mut self, pos: Vec2) -> Self {
        self.start_position = pos;
        self
    }

    pub fn with_start_velocity(mut self, vel: Vec2) -> Self {
        self.start_velocity = vel;
        self
    }

    pub fn with_start_angle(mut self, degrees: f64) -> Self {
        self.start_angle = degrees;
        self
    }

    pub fn with_default_gravity(mut self, gravity: Vec2) -> Self {
        self.default_gravity = gravity;
        self
    }

    pub fn with_remountable(mut self, remountable: bool) -> Self {
        self.remountable = remountable;
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.insert(group.into());
        self
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.contains(group)
    }

    pub fn add_gravity_keyframes(
        &mut self,
        keyframes: impl IntoIterator<Item = Keyframe>,
        fps: i64,
    ) -> Result<()> {
        self.timeline.append(keyframes, fps)
    }
}

type Modifier<T> = Box<dyn Fn(T, usize) -> T>;

/// Per-index adjustments applied by [`generate_rider_array`]. Each receives
/// the base value and the copy's index.
#[derive(Default)]
pub struct RiderModifiers {
    pub start_position: Option<Modifier<Vec2>>,
    pub start_velocity: Option<Modifier<Vec2>>,
    pub start_angle: Option<Modifier<f64>>,
    pub groups: Option<Modifier<BTreeSet<String>>>,
}

impl RiderModifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_position(mut self, f: impl Fn(Vec2, usize) -> Vec2 + 'static) -> Self {
        self.start_position = Some(Box::new(f));
        self
    }

    pub fn start_velocity(mut self, f: impl Fn(Vec2, usize) -> Vec2 + 'static) -> Self {
        self.start_velocity = Some(Box::new(f));
        self
    }

    pub fn start_angle(mut self, f: impl Fn(f64, usize) -> f64 + 'static) -> Self {
        self.start_angle = Some(Box::new(f));
        self
    }

    pub fn groups(mut self, f: impl Fn(BTreeSet<String>, usize) -> BTreeSet<String> + 'static) -> Self {
        self.groups = Some(Box::new(f));
        self
    }

    /// Offset each copy's start position by `step * index`.
    pub fn position_step(self, step: Vec2) -> Self {
        self.start_position(move |base, i| base + step * i as f64)
    }

    pub fn velocity_step(self, step: Vec2) -> Self {
        self.start_velocity(move |base, i| base + step * i as f64)
    }

    pub fn angle_step(self, step: f64) -> Self {
        self.start_angle(move |base, i| base + step * i as f64)
    }
}

/// `count` copies of `base` with ids `{id}_{index}`, each run through the
/// modifiers. Timelines are copied as-is.
pub fn generate_rider_array(
    base: &Rider,
    count: usize,
    modifiers: &RiderModifiers,
) -> Result<Vec<Rider>> {
    if base.id.is_empty() {
        return Err(GravityError::MissingRiderId);
    }
    let riders = (0..count)
        .map(|i| {
            let mut rider = base.clone();
            rider.id = format!("{}_{}", base.id, i);
            if let Some(f) = &modifiers.start_position {
                rider.start_position = f(rider.start_position, i);
            }
            if let Some(f) = &modifiers.start_velocity {
                rider.start_velocity = f(rider.start_velocity, i);
            }
            if let Some(f) = &modifiers.start_angle {
                rider.start_angle = f(rider.start_angle, i);
            }
            if let Some(f) = &modifiers.groups {
                rider.groups = f(std::mem::take(&mut rider.groups), i);
            }
            rider
        })
        .collect();
    Ok(riders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::PointSet;
    use crate::instruction::Instruction;

    #[test]
    fn copies_share_keyframes_but_not_identity() {
        let mut base = Rider::new("skater").with_group("crew");
        base.add_gravity_keyframes([Keyframe::new(3, PointSet::ALL, Instruction::LastGravity)], 40)
            .unwrap();
        let mods = RiderModifiers::new()
            .position_step(Vec2::new(0.0, 20.0))
            .groups(|mut g, i| {
                if i % 2 == 0 {
                    g.insert("even".to_string());
                }
                g
            });
        let riders = generate_rider_array(&base, 3, &mods).unwrap();
        assert_eq!(riders.len(), 3);
        assert_eq!(riders[2].id, "skater_2");
        assert_eq!(riders[2].start_position, Vec2::new(0.0, 40.0));
        assert_eq!(riders[1].timeline.len(), 1);
        assert!(riders[0].in_group("even") && riders[0].in_group("crew"));
        assert!(!riders[1].in_group("even"));
    }

    #[test]
    fn rider_without_id_is_rejected() {
        let base = Rider::new("");
        assert!(matches!(
            generate_rider_array(&base, 2, &RiderModifiers::default()),
            Err(GravityError::MissingRiderId)
        ));
    }

    #[test]
    fn host_layout_is_camel_case() {
        let json = serde_json::to_value(Rider::new("a").with_start_angle(15.0)).unwrap();
        assert_eq!(json["startAngle"], 15.0);
        assert_eq!(json["defaultGravity"]["y"], 0.15);
        assert!(json.get("timeline").is_none());
    }
}
