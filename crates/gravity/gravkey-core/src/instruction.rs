//! Gravity instructions and their evaluation against live rider state.
//!
//! An [`Instruction`] is what a keyframe does to a contact point. Plain
//! constants need nothing; computed instructions read the rider snapshot of
//! the previous committed frame and synthesize an acceleration from it.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::contact::{ContactPoint, PointSet};
use crate::data::{PointState, RiderSnapshot, Vec2};
use crate::error::{GravityError, Result};
use crate::geometry::{resolve_target_position, teleport_acceleration, Placement};
use crate::shape::{ShapeSource, RIDER_ON_SLED_SHAPE, SLED_ON_RIDER_SHAPE};

/// Inputs an instruction sees when the engine resolves it.
#[derive(Clone, Copy, Debug)]
pub struct KeyframeContext<'a> {
    pub rider: usize,
    pub point: ContactPoint,
    pub frame: i64,
    /// Rider state at `frame - 1`, when the host has it.
    pub snapshot: Option<&'a RiderSnapshot>,
    /// Last non-transient gravity of this point (or the soft default).
    pub last_gravity: Vec2,
}

impl<'a> KeyframeContext<'a> {
    pub fn point_state(&self) -> Option<&'a PointState> {
        self.snapshot.and_then(|s| s.point(self.point))
    }
}

/// Strategy for turning a context into an acceleration. `None` means the
/// instruction cannot produce a value here and the engine falls back.
pub trait Resolve {
    fn resolve(&self, ctx: &KeyframeContext<'_>) -> Option<Vec2>;
}

impl<F> Resolve for F
where
    F: Fn(&KeyframeContext<'_>) -> Option<Vec2>,
{
    fn resolve(&self, ctx: &KeyframeContext<'_>) -> Option<Vec2> {
        self(ctx)
    }
}

/// Host- or caller-provided resolver. Compared by identity.
#[derive(Clone)]
pub struct CustomInstruction(Rc<dyn Resolve>);

impl CustomInstruction {
    pub fn new<R: Resolve + 'static>(resolver: R) -> Self {
        CustomInstruction(Rc::new(resolver))
    }
}

impl Resolve for CustomInstruction {
    fn resolve(&self, ctx: &KeyframeContext<'_>) -> Option<Vec2> {
        self.0.resolve(ctx)
    }
}

impl fmt::Debug for CustomInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomInstruction(..)")
    }
}

impl PartialEq for CustomInstruction {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Instruction {
    Constant(Vec2),
    /// The point's last known non-transient gravity.
    LastGravity,
    Computed(ComputedInstruction),
    #[serde(skip)]
    Custom(CustomInstruction),
}

impl Instruction {
    pub fn constant(x: f64, y: f64) -> Self {
        Instruction::Constant(Vec2::new(x, y))
    }

    pub fn custom<R: Resolve + 'static>(resolver: R) -> Self {
        Instruction::Custom(CustomInstruction::new(resolver))
    }

    /// Computed instructions only make sense against live state and are
    /// never remembered as a point's gravity.
    pub fn needs_snapshot(&self) -> bool {
        matches!(self, Instruction::Computed(_))
    }

    pub fn describe(&self) -> String {
        match self {
            Instruction::Constant(g) => format!("constant({}, {})", g.x, g.y),
            Instruction::LastGravity => "last_gravity".to_string(),
            Instruction::Computed(c) => format!("computed({})", c.kind()),
            Instruction::Custom(_) => "custom".to_string(),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            Instruction::Constant(g) if !g.is_finite() => Err(GravityError::malformed_keyframe(
                format!("non-finite constant gravity {g:?}"),
            )),
            Instruction::Computed(c) => c.validate(),
            _ => Ok(()),
        }
    }
}

impl Resolve for Instruction {
    fn resolve(&self, ctx: &KeyframeContext<'_>) -> Option<Vec2> {
        match self {
            Instruction::Constant(g) => Some(*g),
            Instruction::LastGravity => Some(ctx.last_gravity),
            Instruction::Computed(c) => c.resolve(ctx),
            Instruction::Custom(c) => c.resolve(ctx),
        }
    }
}

/// How a teleport treats the velocity the point arrives with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocityMode {
    /// Cancel it.
    #[default]
    Reset,
    /// Keep it.
    Maintain,
    /// Match the anchor's velocity.
    #[serde(alias = "adopt-target")]
    AdoptTarget,
}

fn default_true() -> bool {
    true
}

/// Move every affected point so the rider takes on `shape` around `anchor`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TeleportPosition {
    /// Defaults to PEG.
    #[serde(default)]
    pub anchor: Option<ContactPoint>,
    #[serde(default)]
    pub position: Option<Vec2>,
    /// `position` is a world position rather than an offset from the anchor.
    #[serde(default)]
    pub absolute: bool,
    /// Defaults to the rider's current shape.
    #[serde(default)]
    pub shape: Option<ShapeSource>,
    /// Degrees.
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub affected: PointSet,
}

impl TeleportPosition {
    pub fn anchor(&self) -> ContactPoint {
        self.anchor.unwrap_or(ContactPoint::PEG)
    }

    pub fn placement(&self) -> Placement {
        match self.position {
            Some(p) if self.absolute => Placement::Absolute(p),
            Some(p) => Placement::Relative(p),
            None => Placement::Relative(Vec2::ZERO),
        }
    }

    fn evaluate(&self, ctx: &KeyframeContext<'_>, snapshot: &RiderSnapshot) -> Result<Option<Vec2>> {
        let Some(state) = snapshot.point(ctx.point) else {
            return Ok(None);
        };
        let anchor = self.anchor();
        let anchor_state = snapshot
            .point(anchor)
            .ok_or(GravityError::MissingAnchor(anchor))?;
        let current = ShapeSource::Current;
        let shape = self
            .shape
            .as_ref()
            .unwrap_or(&current)
            .resolve(snapshot, anchor)?;
        let target = resolve_target_position(
            ctx.point,
            anchor,
            &shape,
            self.rotation,
            self.placement(),
            anchor_state,
        )?;
        Ok(Some(teleport_acceleration(target, state)))
    }
}

/// Settle velocity after a teleport.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TeleportVelocity {
    #[serde(default)]
    pub mode: VelocityMode,
    /// Velocity source for [`VelocityMode::AdoptTarget`].
    #[serde(default)]
    pub anchor: Option<ContactPoint>,
    /// Added on top of the mode's change.
    #[serde(default)]
    pub exit_velocity: Option<Vec2>,
    #[serde(default)]
    pub affected: PointSet,
}

impl TeleportVelocity {
    fn evaluate(&self, state: &PointState, snapshot: &RiderSnapshot) -> Vec2 {
        let change = match self.mode {
            VelocityMode::Reset => -state.vel,
            VelocityMode::Maintain => Vec2::ZERO,
            VelocityMode::AdoptTarget => {
                let target = self
                    .anchor
                    .and_then(|a| snapshot.point(a))
                    .map(|s| s.vel)
                    .unwrap_or(Vec2::ZERO);
                target - state.vel
            }
        };
        change + self.exit_velocity.unwrap_or(Vec2::ZERO)
    }
}

/// Instructions computed from live state. Unknown `compute` tags deserialize
/// to [`ComputedInstruction::Unknown`], which always falls back.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "compute", rename_all = "snake_case")]
pub enum ComputedInstruction {
    TeleportPosition(TeleportPosition),
    TeleportVelocity(TeleportVelocity),
    /// Move the affected points so the first of them lands on `(x, y)`,
    /// keeping their layout.
    TeleportAbsolute {
        x: f64,
        y: f64,
        #[serde(default)]
        affected: PointSet,
    },
    /// Undo a [`ComputedInstruction::TeleportAbsolute`] on the next frame.
    CancelTeleportAbsolute {
        x: f64,
        y: f64,
        #[serde(default)]
        affected: PointSet,
    },
    TeleportAbsoluteStop {
        #[serde(default)]
        affected: PointSet,
    },
    #[serde(alias = "cancelVelocity")]
    CancelVelocity {
        #[serde(default)]
        affected: PointSet,
    },
    TeleportSledToRider {
        #[serde(default = "default_true")]
        maintain_velocity: bool,
    },
    CancelSledToRider {
        #[serde(default = "default_true")]
        maintain_velocity: bool,
    },
    TeleportRiderToSled {
        #[serde(default = "default_true")]
        maintain_velocity: bool,
    },
    CancelRiderToSled {
        #[serde(default = "default_true")]
        maintain_velocity: bool,
    },
    #[serde(other)]
    Unknown,
}

impl ComputedInstruction {
    pub fn kind(&self) -> &'static str {
        match self {
            ComputedInstruction::TeleportPosition(_) => "teleport_position",
            ComputedInstruction::TeleportVelocity(_) => "teleport_velocity",
            ComputedInstruction::TeleportAbsolute { .. } => "teleport_absolute",
            ComputedInstruction::CancelTeleportAbsolute { .. } => "cancel_teleport_absolute",
            ComputedInstruction::TeleportAbsoluteStop { .. } => "teleport_absolute_stop",
            ComputedInstruction::CancelVelocity { .. } => "cancel_velocity",
            ComputedInstruction::TeleportSledToRider { .. } => "teleport_sled_to_rider",
            ComputedInstruction::CancelSledToRider { .. } => "cancel_sled_to_rider",
            ComputedInstruction::TeleportRiderToSled { .. } => "teleport_rider_to_sled",
            ComputedInstruction::CancelRiderToSled { .. } => "cancel_rider_to_sled",
            ComputedInstruction::Unknown => "unknown",
        }
    }

    /// Points the instruction acts on; every other point gets `(0, 0)`.
    pub fn affected(&self) -> PointSet {
        match self {
            ComputedInstruction::TeleportPosition(tp) => tp.affected,
            ComputedInstruction::TeleportVelocity(tv) => tv.affected,
            ComputedInstruction::TeleportAbsolute { affected, .. }
            | ComputedInstruction::CancelTeleportAbsolute { affected, .. }
            | ComputedInstruction::TeleportAbsoluteStop { affected }
            | ComputedInstruction::CancelVelocity { affected } => *affected,
            ComputedInstruction::TeleportSledToRider { .. }
            | ComputedInstruction::CancelSledToRider { .. } => PointSet::SLED,
            ComputedInstruction::TeleportRiderToSled { .. }
            | ComputedInstruction::CancelRiderToSled { .. } => PointSet::RIDER_BODY,
            ComputedInstruction::Unknown => PointSet::ALL,
        }
    }

    fn validate(&self) -> Result<()> {
        let finite = match self {
            ComputedInstruction::TeleportPosition(tp) => {
                tp.rotation.is_finite() && tp.position.map_or(true, Vec2::is_finite)
            }
            ComputedInstruction::TeleportVelocity(tv) => tv.exit_velocity.map_or(true, Vec2::is_finite),
            ComputedInstruction::TeleportAbsolute { x, y, .. }
            | ComputedInstruction::CancelTeleportAbsolute { x, y, .. } => {
                x.is_finite() && y.is_finite()
            }
            _ => true,
        };
        if finite {
            Ok(())
        } else {
            Err(GravityError::malformed_keyframe(format!(
                "non-finite parameters in {}",
                self.kind()
            )))
        }
    }

    /// `Ok(None)` for runtime gaps (no snapshot, no data for the point,
    /// unknown kind); `Err` for broken shape or anchor data.
    pub fn evaluate(&self, ctx: &KeyframeContext<'_>) -> Result<Option<Vec2>> {
        let Some(snapshot) = ctx.snapshot else {
            return Ok(None);
        };
        if let ComputedInstruction::Unknown = self {
            return Ok(None);
        }
        if !self.affected().contains(ctx.point) {
            return Ok(Some(Vec2::ZERO));
        }
        let Some(state) = snapshot.point(ctx.point) else {
            return Ok(None);
        };
        match self {
            ComputedInstruction::TeleportPosition(tp) => tp.evaluate(ctx, snapshot),
            ComputedInstruction::TeleportVelocity(tv) => Ok(Some(tv.evaluate(state, snapshot))),
            ComputedInstruction::TeleportAbsolute { x, y, affected } => {
                let target = Vec2::new(*x, *y);
                let reference = affected.first().unwrap_or(ContactPoint::PEG);
                let Some(ref_state) = snapshot.point(reference) else {
                    return Ok(None);
                };
                if ctx.point == reference {
                    Ok(Some(target - ref_state.pos - ref_state.vel))
                } else {
                    let layout = state.pos - ref_state.pos;
                    Ok(Some(teleport_acceleration(target + layout, state)))
                }
            }
            ComputedInstruction::CancelTeleportAbsolute { x, y, affected } => {
                let target = Vec2::new(*x, *y);
                let reference = affected.first().unwrap_or(ContactPoint::PEG);
                let Some(ref_state) = snapshot.point(reference) else {
                    return Ok(None);
                };
                if ctx.point == reference {
                    Ok(Some(-(target - ref_state.pos + ref_state.vel)))
                } else {
                    let layout = state.pos - ref_state.pos;
                    Ok(Some(-(target + layout - state.pos + state.vel)))
                }
            }
            ComputedInstruction::TeleportAbsoluteStop { .. }
            | ComputedInstruction::CancelVelocity { .. } => Ok(Some(-state.vel)),
            ComputedInstruction::TeleportSledToRider { maintain_velocity } => {
                dock(ctx.point, state, snapshot, &Dock::SLED_TO_RIDER, *maintain_velocity, false)
            }
            ComputedInstruction::CancelSledToRider { maintain_velocity } => {
                dock(ctx.point, state, snapshot, &Dock::SLED_TO_RIDER, *maintain_velocity, true)
            }
            ComputedInstruction::TeleportRiderToSled { maintain_velocity } => {
                dock(ctx.point, state, snapshot, &Dock::RIDER_TO_SLED, *maintain_velocity, false)
            }
            ComputedInstruction::CancelRiderToSled { maintain_velocity } => {
                dock(ctx.point, state, snapshot, &Dock::RIDER_TO_SLED, *maintain_velocity, true)
            }
            ComputedInstruction::Unknown => Ok(None),
        }
    }
}

impl Resolve for ComputedInstruction {
    fn resolve(&self, ctx: &KeyframeContext<'_>) -> Option<Vec2> {
        if let ComputedInstruction::Unknown = self {
            log::warn!(
                "unknown computed instruction at frame {} (rider {}, {}); falling back",
                ctx.frame,
                ctx.rider,
                ctx.point
            );
            return None;
        }
        match self.evaluate(ctx) {
            Ok(value) => value,
            Err(err) => {
                log::warn!(
                    "{} failed at frame {} (rider {}, {}): {err}",
                    self.kind(),
                    ctx.frame,
                    ctx.rider,
                    ctx.point
                );
                None
            }
        }
    }
}

/// One half of the rider rebuilt around a point of the other half.
struct Dock {
    anchor: ContactPoint,
    to_sled: bool,
}

impl Dock {
    const SLED_TO_RIDER: Dock = Dock {
        anchor: ContactPoint::BUTT,
        to_sled: false,
    };
    const RIDER_TO_SLED: Dock = Dock {
        anchor: ContactPoint::PEG,
        to_sled: true,
    };
}

fn dock(
    point: ContactPoint,
    state: &PointState,
    snapshot: &RiderSnapshot,
    dock: &Dock,
    maintain_velocity: bool,
    cancel: bool,
) -> Result<Option<Vec2>> {
    let anchor_state = snapshot
        .point(dock.anchor)
        .ok_or(GravityError::MissingAnchor(dock.anchor))?;
    let shape = if dock.to_sled {
        &*RIDER_ON_SLED_SHAPE
    } else {
        &*SLED_ON_RIDER_SHAPE
    };
    let target = resolve_target_position(
        point,
        dock.anchor,
        shape,
        0.0,
        Placement::Absolute(anchor_state.pos),
        anchor_state,
    )?;
    let carried = if maintain_velocity { state.vel } else { Vec2::ZERO };
    Ok(Some(if cancel {
        -(target - state.pos + carried)
    } else {
        target - state.pos - carried
    }))
}
