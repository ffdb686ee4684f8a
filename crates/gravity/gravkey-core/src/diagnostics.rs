//! Counters and per-point state exposed for debugging overlays.

use serde::{Deserialize, Serialize};

use crate::contact::ContactPoint;
use crate::data::Vec2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Accessor resolutions (including direct `gravity_at` queries).
    pub calls: u64,
    /// Resolutions that had to evaluate a computed or custom instruction.
    pub computed_evaluations: u64,
    /// Computed or custom evaluations that produced nothing usable.
    pub fallbacks: u64,
}

/// What the engine would use for one contact point at one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointDebugState {
    pub point: ContactPoint,
    /// Description and frame of the active keyframe.
    pub active: Option<String>,
    pub active_frame: Option<i64>,
    pub transient: bool,
    pub last_known: Option<Vec2>,
}
