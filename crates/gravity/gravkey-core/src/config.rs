//! Engine and authoring configuration.

use serde::{Deserialize, Serialize};

use crate::data::Vec2;
use crate::error::Result;

/// Host frame rate.
pub const FRAMES_PER_SECOND: i64 = 40;
/// Returned whenever nothing better is known for a contact point.
pub const SOFT_DEFAULT_GRAVITY: Vec2 = Vec2::new(0.0, 0.175);
/// Gravity new riders start with.
pub const DEFAULT_RIDER_GRAVITY: Vec2 = Vec2::new(0.0, 0.15);
/// Host playback speed multiplier used when deriving frames per beat.
pub const PLAYBACK_SPEED: f64 = 1.04;

/// Configuration shared by the timeline builder and the evaluation engine.
/// Missing fields fall back to the host defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub frames_per_second: i64,
    /// Fallback gravity when a contact point has no usable keyframe.
    pub soft_default: Vec2,
    /// Default gravity assigned to riders built from scripts.
    pub default_rider_gravity: Vec2,
    pub playback_speed: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frames_per_second: FRAMES_PER_SECOND,
            soft_default: SOFT_DEFAULT_GRAVITY,
            default_rider_gravity: DEFAULT_RIDER_GRAVITY,
            playback_speed: PLAYBACK_SPEED,
        }
    }
}

impl Config {
    /// Reject settings the time codec cannot work with.
    pub fn validate(&self) -> Result<()> {
        crate::time::check_fps(self.frames_per_second)?;
        Ok(())
    }

    /// Frames per beat at the configured playback speed.
    pub fn frames_per_beat(&self) -> f64 {
        crate::tempo::frames_per_beat(self.frames_per_second as f64, self.playback_speed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: Config = serde_json::from_str(r#"{ "frames_per_second": 60 }"#).unwrap();
        assert_eq!(cfg.frames_per_second, 60);
        assert_eq!(cfg.soft_default, SOFT_DEFAULT_GRAVITY);
        assert_eq!(cfg.default_rider_gravity, DEFAULT_RIDER_GRAVITY);
    }

    #[test]
    fn negative_frame_rate_fails_validation() {
        let cfg = Config {
            frames_per_second: -1,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn frames_per_beat_uses_playback_speed() {
        let cfg = Config::default();
        assert!((cfg.frames_per_beat() - 40.0 / 1.04).abs() < 1e-12);
    }
}
