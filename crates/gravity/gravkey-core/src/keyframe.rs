//! Gravity keyframes and per-rider keyframe timelines.

use serde::{Deserialize, Serialize};

use crate::contact::{ContactPoint, PointSet};
use crate::error::{GravityError, Result};
use crate::instruction::Instruction;
use crate::time::FrameRef;

/// A gravity instruction applied to a set of contact points from `at`
/// onwards, until a later keyframe covering the same point takes over.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub at: FrameRef,
    #[serde(default)]
    pub points: PointSet,
    pub instruction: Instruction,
    /// Transient keyframes never become a point's last known gravity.
    #[serde(default)]
    pub computed: bool,
}

impl Keyframe {
    pub fn new(at: impl Into<FrameRef>, points: PointSet, instruction: Instruction) -> Self {
        Self {
            at: at.into(),
            points,
            instruction,
            computed: false,
        }
    }

    pub fn transient(at: impl Into<FrameRef>, points: PointSet, instruction: Instruction) -> Self {
        Self {
            computed: true,
            ..Keyframe::new(at, points, instruction)
        }
    }

    #[inline]
    pub fn frame(&self, fps: i64) -> i64 {
        self.at.resolve(fps)
    }

    #[inline]
    pub fn is_transient(&self) -> bool {
        self.computed || self.instruction.needs_snapshot()
    }

    #[inline]
    pub fn covers(&self, cp: ContactPoint) -> bool {
        self.points.contains(cp)
    }
}

/// `frame + by`, or an authoring error when the sum leaves the frame range.
pub fn offset_frame(frame: i64, by: i64) -> Result<i64> {
    frame.checked_add(by).ok_or_else(|| {
        GravityError::malformed_keyframe(format!("frame {frame} + {by} is out of range"))
    })
}

/// Stable sort by resolved frame; equal frames keep insertion order.
pub fn sort_keyframes(keyframes: &mut [Keyframe], fps: i64) {
    keyframes.sort_by_key(|kf| kf.frame(fps));
}

/// Keyframes of one rider, kept sorted by frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiderTimeline {
    keyframes: Vec<Keyframe>,
}

impl RiderTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate, append and re-sort. Nothing is appended when any keyframe
    /// is malformed.
    pub fn append(&mut self, keyframes: impl IntoIterator<Item = Keyframe>, fps: i64) -> Result<()> {
        let incoming: Vec<Keyframe> = keyframes.into_iter().collect();
        for kf in &incoming {
            kf.instruction.validate()?;
        }
        self.keyframes.extend(incoming);
        sort_keyframes(&mut self.keyframes, fps);
        Ok(())
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Keyframe> {
        self.keyframes.iter()
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    pub fn clear(&mut self) {
        self.keyframes.clear();
    }

    pub fn into_keyframes(self) -> Vec<Keyframe> {
        self.keyframes
    }

    /// Keyframes with their time expressed as normalized timestamps, the
    /// form authoring tools display.
    pub fn with_timestamps(&self, fps: i64) -> Result<Vec<Keyframe>> {
        crate::time::check_fps(fps)?;
        self.keyframes
            .iter()
            .map(|kf| {
                Ok(Keyframe {
                    at: FrameRef::Timestamp(crate::time::to_timestamp(kf.frame(fps), fps)?),
                    ..kf.clone()
                })
            })
            .collect()
    }
}

/// Keyframes for every rider, indexed like the host's rider list.
pub type KeyframeStream = Vec<Vec<Keyframe>>;
