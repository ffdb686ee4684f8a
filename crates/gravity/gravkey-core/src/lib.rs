//! gravkey core (host-agnostic)
//!
//! Per-rider, per-contact-point gravity keyframes for a 2D rider/sled
//! simulator. Authoring (effects, timeline builder, scripts) produces a
//! keyframe stream; the [`Engine`] answers the host's per-point gravity
//! queries from it, including computed instructions that read live state
//! (teleports, velocity cancels, shape morphs).

pub mod config;
pub mod contact;
pub mod data;
pub mod diagnostics;
pub mod effects;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod host;
pub mod ids;
pub mod instruction;
pub mod keyframe;
pub mod rider;
pub mod script;
pub mod shape;
pub mod tempo;
pub mod time;
pub mod timeline;

// Re-exports for consumers (adapters)
pub use config::Config;
pub use contact::{ContactPoint, PointSet, POINTS_PER_RIDER};
pub use data::{PointState, RiderSnapshot, Vec2};
pub use diagnostics::{EngineStats, PointDebugState};
pub use effects::{Effect, EffectContext, TeleportOptions};
pub use engine::{round_robin, Engine, Slot};
pub use error::{GravityError, Result};
pub use geometry::{resolve_target_position, rotate, teleport_acceleration, Placement};
pub use host::{Session, SimulationHost, TrackHost};
pub use ids::RiderId;
pub use instruction::{
    ComputedInstruction, CustomInstruction, Instruction, KeyframeContext, Resolve, VelocityMode,
};
pub use keyframe::{Keyframe, KeyframeStream, RiderTimeline};
pub use rider::{generate_rider_array, Rider, RiderModifiers};
pub use script::{parse_script_json, Script};
pub use shape::{capture_shape, Shape, ShapeSource};
pub use time::{to_frames, to_timestamp, FrameRef, Timestamp};
pub use timeline::{Choreography, Filter, Interval, IntervalFn, Target};
