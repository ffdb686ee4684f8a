//! Authoring effects: reusable producers of keyframes for one target.
//!
//! An effect is called once per target with the target's base frame and
//! returns the keyframes to append to that rider's timeline. Closures with
//! the same signature are effects too.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::FRAMES_PER_SECOND;
use crate::contact::{ContactPoint, PointSet};
use crate::data::Vec2;
use crate::error::{GravityError, Result};
use crate::instruction::{ComputedInstruction, Instruction, TeleportPosition, TeleportVelocity, VelocityMode};
use crate::keyframe::{offset_frame, Keyframe};
use crate::shape::ShapeSource;

/// What an effect knows about the target it is applied to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EffectContext {
    /// The rider's default gravity.
    pub default_gravity: Vec2,
    /// Contact points targeted.
    pub points: PointSet,
    pub frames_per_second: i64,
}

impl EffectContext {
    pub fn new(default_gravity: Vec2, points: PointSet) -> Self {
        Self {
            default_gravity,
            points,
            frames_per_second: FRAMES_PER_SECOND,
        }
    }
}

pub trait Effect {
    fn keyframes(&self, base_frame: i64, ctx: &EffectContext) -> Result<Vec<Keyframe>>;
}

impl<F> Effect for F
where
    F: Fn(i64, &EffectContext) -> Result<Vec<Keyframe>>,
{
    fn keyframes(&self, base_frame: i64, ctx: &EffectContext) -> Result<Vec<Keyframe>> {
        self(base_frame, ctx)
    }
}

/// First frame after a `duration`-frame effect that starts at `t`.
fn after(t: i64, duration: i64) -> Result<i64> {
    offset_frame(offset_frame(t, duration)?, 1)
}

/// Permanent gravity change from `t`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SetGravity(pub Vec2);

impl Effect for SetGravity {
    fn keyframes(&self, t: i64, ctx: &EffectContext) -> Result<Vec<Keyframe>> {
        Ok(vec![Keyframe::new(t, ctx.points, Instruction::Constant(self.0))])
    }
}

/// Back to the rider's default gravity from `t`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DefaultGravity;

impl Effect for DefaultGravity {
    fn keyframes(&self, t: i64, ctx: &EffectContext) -> Result<Vec<Keyframe>> {
        Ok(vec![Keyframe::new(
            t,
            ctx.points,
            Instruction::Constant(ctx.default_gravity),
        )])
    }
}

/// `gravity` for `duration + 1` frames, then whatever the point had before.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pulse {
    pub gravity: Vec2,
    pub duration: i64,
}

impl Effect for Pulse {
    fn keyframes(&self, t: i64, ctx: &EffectContext) -> Result<Vec<Keyframe>> {
        Ok(vec![
            Keyframe::transient(t, ctx.points, Instruction::Constant(self.gravity)),
            Keyframe::transient(after(t, self.duration)?, ctx.points, Instruction::LastGravity),
        ])
    }
}

/// Older pulse: reverts to the default gravity captured at authoring time
/// instead of the point's last known gravity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LegacyPop {
    pub gravity: Vec2,
    pub duration: i64,
}

impl Effect for LegacyPop {
    fn keyframes(&self, t: i64, ctx: &EffectContext) -> Result<Vec<Keyframe>> {
        Ok(vec![
            Keyframe::new(t, ctx.points, Instruction::Constant(self.gravity)),
            Keyframe::new(
                after(t, self.duration)?,
                ctx.points,
                Instruction::Constant(ctx.default_gravity),
            ),
        ])
    }
}

/// Parameters of a shape-aware teleport.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeleportOptions {
    /// Defaults to PEG.
    pub anchor: Option<ContactPoint>,
    pub position: Option<Vec2>,
    pub absolute: bool,
    /// Defaults to the rider's shape at the teleport frame.
    pub shape: Option<ShapeSource>,
    pub rotation: f64,
    pub velocity: VelocityMode,
    pub exit_velocity: Option<Vec2>,
    /// Defaults to the targeted points.
    pub affected: Option<PointSet>,
}

impl TeleportOptions {
    pub fn anchor(mut self, anchor: ContactPoint) -> Self {
        self.anchor = Some(anchor);
        self
    }

    /// Put the anchor on a world position.
    pub fn to(mut self, position: Vec2) -> Self {
        self.position = Some(position);
        self.absolute = true;
        self
    }

    /// Put the anchor at its predicted position plus `offset`.
    pub fn by(mut self, offset: Vec2) -> Self {
        self.position = Some(offset);
        self.absolute = false;
        self
    }

    pub fn shape(mut self, shape: ShapeSource) -> Self {
        self.shape = Some(shape);
        self
    }

    pub fn rotation(mut self, degrees: f64) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn velocity(mut self, mode: VelocityMode) -> Self {
        self.velocity = mode;
        self
    }

    pub fn exit_velocity(mut self, velocity: Vec2) -> Self {
        self.exit_velocity = Some(velocity);
        self
    }

    pub fn affecting(mut self, points: PointSet) -> Self {
        self.affected = Some(points);
        self
    }

    fn validate(&self, affected: PointSet) -> Result<()> {
        if !self.rotation.is_finite() {
            return Err(GravityError::malformed_keyframe("non-finite teleport rotation"));
        }
        let Some(shape) = self.shape.as_ref().and_then(ShapeSource::custom) else {
            return Ok(());
        };
        let anchor = self.anchor.unwrap_or(ContactPoint::PEG);
        shape.offset(anchor)?;
        for cp in affected.iter() {
            shape.offset(cp)?;
        }
        Ok(())
    }
}

/// Teleport at `t`, settle velocity at `t + 1`, restore gravity at `t + 2`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Teleport(pub TeleportOptions);

impl Effect for Teleport {
    fn keyframes(&self, t: i64, ctx: &EffectContext) -> Result<Vec<Keyframe>> {
        let opts = &self.0;
        let affected = opts.affected.unwrap_or(ctx.points);
        opts.validate(affected.intersection(ctx.points))?;
        let position = TeleportPosition {
            anchor: opts.anchor,
            position: opts.position,
            absolute: opts.absolute,
            shape: opts.shape.clone(),
            rotation: opts.rotation,
            affected,
        };
        let velocity = TeleportVelocity {
            mode: opts.velocity,
            anchor: opts.anchor,
            exit_velocity: opts.exit_velocity,
            affected,
        };
        Ok(vec![
            Keyframe::transient(
                t,
                ctx.points,
                Instruction::Computed(ComputedInstruction::TeleportPosition(position)),
            ),
            Keyframe::transient(
                offset_frame(t, 1)?,
                ctx.points,
                Instruction::Computed(ComputedInstruction::TeleportVelocity(velocity)),
            ),
            Keyframe::transient(offset_frame(t, 2)?, ctx.points, Instruction::LastGravity),
        ])
    }
}

/// Legacy world-position teleport keeping the rider's layout.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TeleportTo {
    pub target: Vec2,
    /// Kill velocity on arrival instead of restoring it.
    pub stop: bool,
}

impl Effect for TeleportTo {
    fn keyframes(&self, t: i64, ctx: &EffectContext) -> Result<Vec<Keyframe>> {
        let (x, y, affected) = (self.target.x, self.target.y, ctx.points);
        let settle = if self.stop {
            ComputedInstruction::TeleportAbsoluteStop { affected }
        } else {
            ComputedInstruction::CancelTeleportAbsolute { x, y, affected }
        };
        Ok(vec![
            Keyframe::new(
                t,
                ctx.points,
                Instruction::Computed(ComputedInstruction::TeleportAbsolute { x, y, affected }),
            ),
            Keyframe::new(offset_frame(t, 1)?, ctx.points, Instruction::Computed(settle)),
            Keyframe::new(offset_frame(t, 2)?, ctx.points, Instruction::Constant(ctx.default_gravity)),
        ])
    }
}

/// Legacy relative teleport: one frame of `offset`, one frame of
/// `-offset` (or a velocity stop), then the default gravity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TeleportBy {
    pub offset: Vec2,
    pub stop: bool,
}

impl Effect for TeleportBy {
    fn keyframes(&self, t: i64, ctx: &EffectContext) -> Result<Vec<Keyframe>> {
        let settle = if self.stop {
            Instruction::Computed(ComputedInstruction::CancelVelocity {
                affected: ctx.points,
            })
        } else {
            Instruction::Constant(-self.offset)
        };
        Ok(vec![
            Keyframe::transient(t, ctx.points, Instruction::Constant(self.offset)),
            Keyframe::transient(offset_frame(t, 1)?, ctx.points, settle),
            Keyframe::new(offset_frame(t, 2)?, ctx.points, Instruction::Constant(ctx.default_gravity)),
        ])
    }
}

/// Which half of the rider is rebuilt around the other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DockTarget {
    /// Sled points move under the rider's BUTT.
    SledToRider,
    /// Body points move onto the sled's PEG.
    RiderToSled,
}

/// Legacy docking teleport with a cancel frame and a default-gravity revert.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dock {
    pub target: DockTarget,
    pub maintain_velocity: bool,
}

impl Effect for Dock {
    fn keyframes(&self, t: i64, ctx: &EffectContext) -> Result<Vec<Keyframe>> {
        let maintain_velocity = self.maintain_velocity;
        let (jump, cancel) = match self.target {
            DockTarget::SledToRider => (
                ComputedInstruction::TeleportSledToRider { maintain_velocity },
                ComputedInstruction::CancelSledToRider { maintain_velocity },
            ),
            DockTarget::RiderToSled => (
                ComputedInstruction::TeleportRiderToSled { maintain_velocity },
                ComputedInstruction::CancelRiderToSled { maintain_velocity },
            ),
        };
        Ok(vec![
            Keyframe::new(t, ctx.points, Instruction::Computed(jump)),
            Keyframe::new(offset_frame(t, 1)?, ctx.points, Instruction::Computed(cancel)),
            Keyframe::new(offset_frame(t, 2)?, ctx.points, Instruction::Constant(ctx.default_gravity)),
        ])
    }
}

pub enum Step {
    /// Frames to skip before the next effect.
    Wait(i64),
    Effect(Box<dyn Effect>),
}

/// Effects chained back to back: each starts one frame after the previous
/// effect's last keyframe.
#[derive(Default)]
pub struct Sequence {
    steps: Vec<Step>,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then<E: Effect + 'static>(mut self, effect: E) -> Self {
        self.steps.push(Step::Effect(Box::new(effect)));
        self
    }

    pub fn wait(mut self, frames: i64) -> Self {
        self.steps.push(Step::Wait(frames));
        self
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("steps", &self.steps.len())
            .finish()
    }
}

impl Effect for Sequence {
    fn keyframes(&self, t: i64, ctx: &EffectContext) -> Result<Vec<Keyframe>> {
        let mut current = t;
        let mut out = Vec::new();
        for step in &self.steps {
            match step {
                Step::Wait(frames) => current = offset_frame(current, *frames)?,
                Step::Effect(effect) => {
                    let produced = effect.keyframes(current, ctx)?;
                    if let Some(end) = produced.iter().map(|kf| kf.frame(ctx.frames_per_second)).max() {
                        current = offset_frame(end, 1)?;
                    }
                    out.extend(produced);
                }
            }
        }
        Ok(out)
    }
}

pub fn set_gravity(x: f64, y: f64) -> SetGravity {
    SetGravity(Vec2::new(x, y))
}

pub fn pulse(gravity: Vec2, duration: i64) -> Pulse {
    Pulse { gravity, duration }
}

pub fn pop(gravity: Vec2, duration: i64) -> LegacyPop {
    LegacyPop { gravity, duration }
}

pub fn teleport(options: TeleportOptions) -> Teleport {
    Teleport(options)
}

/// Stretch the rider flat along a line through TAIL, rotated by `rotation`
/// degrees, moving with TAIL's velocity.
pub fn kramual(rotation: f64) -> Teleport {
    Teleport(
        TeleportOptions::default()
            .anchor(ContactPoint::TAIL)
            .shape(ShapeSource::Kramual)
            .rotation(rotation)
            .velocity(VelocityMode::AdoptTarget),
    )
}

pub fn kramual_with_launch(rotation: f64, launch: Vec2) -> Teleport {
    let Teleport(options) = kramual(rotation);
    Teleport(options.exit_velocity(launch))
}

/// Put the rider back in the stock pose around PEG, at rest.
pub fn teleport_rider_to_sled() -> Teleport {
    Teleport(
        TeleportOptions::default()
            .anchor(ContactPoint::PEG)
            .shape(ShapeSource::Default)
            .velocity(VelocityMode::Reset),
    )
}

pub fn teleport_to(target: Vec2) -> TeleportTo {
    TeleportTo { target, stop: false }
}

pub fn teleport_to_and_stop(target: Vec2) -> TeleportTo {
    TeleportTo { target, stop: true }
}

pub fn teleport_by(offset: Vec2) -> TeleportBy {
    TeleportBy { offset, stop: false }
}

pub fn teleport_by_and_stop(offset: Vec2) -> TeleportBy {
    TeleportBy { offset, stop: true }
}

pub fn teleport_sled_to_rider(maintain_velocity: bool) -> Dock {
    Dock {
        target: DockTarget::SledToRider,
        maintain_velocity,
    }
}

pub fn teleport_rider_to_sled_legacy(maintain_velocity: bool) -> Dock {
    Dock {
        target: DockTarget::RiderToSled,
        maintain_velocity,
    }
}

pub fn sequence() -> Sequence {
    Sequence::new()
}
