//! Rider timeline builder: owns the riders of a choreography and applies
//! effects to `(rider, contact points)` targets over time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::contact::PointSet;
use crate::effects::{Effect, EffectContext};
use crate::error::{GravityError, Result};
use crate::ids::{IdAllocator, RiderId};
use crate::keyframe::{offset_frame, Keyframe, KeyframeStream};
use crate::rider::Rider;
use crate::time::Timestamp;

/// A rider and the contact points an effect should hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub rider: RiderId,
    #[serde(default)]
    pub points: PointSet,
}

impl Target {
    pub fn new(rider: RiderId, points: PointSet) -> Self {
        Self { rider, points }
    }

    pub fn whole(rider: RiderId) -> Self {
        Self::new(rider, PointSet::ALL)
    }
}

/// Frame offset of the `index`-th target relative to the base time.
pub trait IntervalFn {
    fn offset(&self, index: usize) -> f64;
}

impl<F> IntervalFn for F
where
    F: Fn(usize) -> f64,
{
    fn offset(&self, index: usize) -> f64 {
        self(index)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Interval {
    #[default]
    Simultaneous,
    /// `frames * index`.
    Stagger { frames: f64 },
    /// `base^index * scale`.
    Exponential { base: f64, scale: f64 },
    /// `sin(index * period) * amplitude`.
    Sine { period: f64, amplitude: f64 },
    /// `index * frames_per_beat / division` (division 1 = full beats, 4 =
    /// quarter beats).
    Beats { frames_per_beat: f64, division: f64 },
}

impl IntervalFn for Interval {
    fn offset(&self, index: usize) -> f64 {
        let i = index as f64;
        match *self {
            Interval::Simultaneous => 0.0,
            Interval::Stagger { frames } => frames * i,
            Interval::Exponential { base, scale } => base.powf(i) * scale,
            Interval::Sine { period, amplitude } => (i * period).sin() * amplitude,
            Interval::Beats {
                frames_per_beat,
                division,
            } => i * frames_per_beat / division,
        }
    }
}

/// Frame offsets are fractional in general; a keyframe first applies on the
/// next whole frame.
#[inline]
pub fn interval_frames(offset: f64) -> i64 {
    if offset.is_finite() {
        offset.ceil() as i64
    } else {
        0
    }
}

/// Selection over target indices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    #[default]
    All,
    Even,
    Odd,
    First,
    /// Everything but the first.
    Tail,
}

impl Filter {
    pub fn keep(self, index: usize) -> bool {
        match self {
            Filter::All => true,
            Filter::Even => index % 2 == 0,
            Filter::Odd => index % 2 == 1,
            Filter::First => index == 0,
            Filter::Tail => index > 0,
        }
    }

    pub fn apply(self, targets: &[Target]) -> Vec<Target> {
        targets
            .iter()
            .enumerate()
            .filter(|(i, _)| self.keep(*i))
            .map(|(_, t)| *t)
            .collect()
    }
}

/// Riders of one authoring run and their timelines.
#[derive(Clone, Debug, Default)]
pub struct Choreography {
    cfg: Config,
    ids: IdAllocator,
    riders: Vec<Rider>,
}

impl Choreography {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            ids: IdAllocator::new(),
            riders: Vec::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn add_rider(&mut self, rider: Rider) -> RiderId {
        let id = self.ids.alloc_rider();
        self.riders.push(rider);
        id
    }

    pub fn add_riders(&mut self, riders: impl IntoIterator<Item = Rider>) -> Vec<RiderId> {
        riders.into_iter().map(|r| self.add_rider(r)).collect()
    }

    pub fn rider(&self, id: RiderId) -> Option<&Rider> {
        self.riders.get(id.index())
    }

    pub fn rider_mut(&mut self, id: RiderId) -> Option<&mut Rider> {
        self.riders.get_mut(id.index())
    }

    pub fn riders(&self) -> &[Rider] {
        &self.riders
    }

    pub fn rider_ids(&self) -> impl Iterator<Item = RiderId> + '_ {
        (0..self.riders.len()).map(|i| RiderId(i as u32))
    }

    pub fn find(&self, id: &str) -> Option<RiderId> {
        self.riders
            .iter()
            .position(|r| r.id == id)
            .map(|i| RiderId(i as u32))
    }

    pub fn len(&self) -> usize {
        self.riders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.riders.is_empty()
    }

    pub fn clear(&mut self) {
        self.riders.clear();
        self.ids.reset();
    }

    pub fn add_to_group(&mut self, group: &str, riders: &[RiderId]) -> Result<()> {
        self.check_ids(riders.iter().copied())?;
        for id in riders {
            if let Some(r) = self.riders.get_mut(id.index()) {
                r.groups.insert(group.to_string());
            }
        }
        Ok(())
    }

    pub fn remove_from_group(&mut self, group: &str, riders: &[RiderId]) -> Result<()> {
        self.check_ids(riders.iter().copied())?;
        for id in riders {
            if let Some(r) = self.riders.get_mut(id.index()) {
                r.groups.remove(group);
            }
        }
        Ok(())
    }

    /// Members of `group` in rider order.
    pub fn group(&self, group: &str) -> Vec<RiderId> {
        self.rider_ids()
            .filter(|id| self.riders[id.index()].in_group(group))
            .collect()
    }

    pub fn all_groups(&self) -> BTreeMap<String, Vec<RiderId>> {
        let mut groups: BTreeMap<String, Vec<RiderId>> = BTreeMap::new();
        for id in self.rider_ids() {
            for g in &self.riders[id.index()].groups {
                groups.entry(g.clone()).or_default().push(id);
            }
        }
        groups
    }

    /// Every rider of `group` (all riders when `None`) paired with `points`.
    pub fn targets(&self, group: Option<&str>, points: PointSet) -> Vec<Target> {
        let ids = match group {
            Some(g) => self.group(g),
            None => self.rider_ids().collect(),
        };
        ids.into_iter().map(|id| Target::new(id, points)).collect()
    }

    fn check_ids(&self, ids: impl IntoIterator<Item = RiderId>) -> Result<()> {
        for id in ids {
            if id.index() >= self.riders.len() {
                return Err(GravityError::UnknownRider(id.0));
            }
        }
        Ok(())
    }

    /// Apply `effect` to each target; target `i` starts at
    /// `base + interval(i)` frames. Either every target receives its
    /// keyframes or none does.
    pub fn apply_gravity(
        &mut self,
        targets: &[Target],
        base: Timestamp,
        effect: &dyn Effect,
        interval: &dyn IntervalFn,
    ) -> Result<()> {
        if targets.is_empty() {
            return Err(GravityError::NoTargets);
        }
        self.check_ids(targets.iter().map(|t| t.rider))?;
        let fps = self.cfg.frames_per_second;
        let base_frame = base.checked_to_frames(fps).ok_or_else(|| {
            GravityError::malformed_keyframe(format!("timestamp {base} is out of range"))
        })?;

        let mut produced: Vec<(RiderId, Vec<Keyframe>)> = Vec::with_capacity(targets.len());
        for (i, target) in targets.iter().enumerate() {
            let rider = &self.riders[target.rider.index()];
            let t = offset_frame(base_frame, interval_frames(interval.offset(i)))?;
            let ctx = EffectContext {
                default_gravity: rider.default_gravity,
                points: target.points,
                frames_per_second: fps,
            };
            produced.push((target.rider, effect.keyframes(t, &ctx)?));
        }
        for (_, keyframes) in &produced {
            for kf in keyframes {
                kf.instruction.validate()?;
            }
        }

        let total: usize = produced.iter().map(|(_, k)| k.len()).sum();
        for (id, keyframes) in produced {
            self.riders[id.index()].add_gravity_keyframes(keyframes, fps)?;
        }
        log::debug!(
            "applied effect at {base} to {} targets ({total} keyframes)",
            targets.len()
        );
        Ok(())
    }

    /// [`Choreography::apply_gravity`] on the targets `filter` keeps.
    pub fn apply_gravity_filtered(
        &mut self,
        targets: &[Target],
        filter: Filter,
        base: Timestamp,
        effect: &dyn Effect,
        interval: &dyn IntervalFn,
    ) -> Result<()> {
        self.apply_gravity(&filter.apply(targets), base, effect, interval)
    }

    /// Per-rider keyframes in rider order, ready for the engine.
    pub fn keyframe_stream(&self) -> KeyframeStream {
        self.riders
            .iter()
            .map(|r| r.timeline.keyframes().to_vec())
            .collect()
    }
}
