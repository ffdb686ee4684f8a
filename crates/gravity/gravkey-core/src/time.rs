//! Timestamp <-> absolute frame conversion.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{GravityError, Result};

/// `(minutes, seconds, frames)` on the host clock. Serialized as `[m, s, f]`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i64; 3]", into = "[i64; 3]")]
pub struct Timestamp {
    pub minutes: i64,
    pub seconds: i64,
    pub frames: i64,
}

impl Timestamp {
    pub const fn new(minutes: i64, seconds: i64, frames: i64) -> Self {
        Self {
            minutes,
            seconds,
            frames,
        }
    }

    /// Components are not validated; negative parts give negative totals.
    #[inline]
    pub fn to_frames(self, fps: i64) -> i64 {
        self.minutes * fps * 60 + self.seconds * fps + self.frames
    }

    /// [`Timestamp::to_frames`] for authored input, `None` on overflow.
    pub fn checked_to_frames(self, fps: i64) -> Option<i64> {
        self.minutes
            .checked_mul(fps)?
            .checked_mul(60)?
            .checked_add(self.seconds.checked_mul(fps)?)?
            .checked_add(self.frames)
    }

    /// Normalized timestamp for an absolute frame (`frames < fps`, `seconds < 60`).
    pub fn from_frames(frames: i64, fps: i64) -> Result<Self> {
        let per_minute = check_fps(fps)?
            .checked_mul(60)
            .ok_or(GravityError::InvalidFrameRate(fps))?;
        Ok(Self {
            minutes: frames.div_euclid(per_minute),
            seconds: frames.div_euclid(fps).rem_euclid(60),
            frames: frames.rem_euclid(fps),
        })
    }

    pub fn normalize(self, fps: i64) -> Result<Self> {
        Self::from_frames(self.to_frames(fps), fps)
    }

    pub fn is_normalized(self, fps: i64) -> bool {
        (0..fps).contains(&self.frames) && (0..60).contains(&self.seconds)
    }

    /// Strict parse of an authored timestamp: a 3-element integer array.
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        let malformed = || GravityError::MalformedTimestamp(value.to_string());
        let parts = value.as_array().ok_or_else(malformed)?;
        if parts.len() != 3 {
            return Err(malformed());
        }
        let mut out = [0i64; 3];
        for (slot, part) in out.iter_mut().zip(parts) {
            *slot = match part.as_i64() {
                Some(v) => v,
                None => match part.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.is_finite() => f as i64,
                    _ => return Err(malformed()),
                },
            };
        }
        Ok(Timestamp::from(out))
    }
}

impl From<[i64; 3]> for Timestamp {
    fn from([minutes, seconds, frames]: [i64; 3]) -> Self {
        Timestamp::new(minutes, seconds, frames)
    }
}

impl From<Timestamp> for [i64; 3] {
    fn from(ts: Timestamp) -> Self {
        [ts.minutes, ts.seconds, ts.frames]
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}+{:02}", self.minutes, self.seconds, self.frames)
    }
}

#[inline]
pub fn to_frames(ts: Timestamp, fps: i64) -> i64 {
    ts.to_frames(fps)
}

/// Fails with [`GravityError::InvalidFrameRate`] unless `fps > 0`.
#[inline]
pub fn to_timestamp(frames: i64, fps: i64) -> Result<Timestamp> {
    Timestamp::from_frames(frames, fps)
}

/// Frame rates must be positive.
pub fn check_fps(fps: i64) -> Result<i64> {
    if fps > 0 {
        Ok(fps)
    } else {
        Err(GravityError::InvalidFrameRate(fps))
    }
}

/// Keyframe time: an absolute frame or a timestamp resolved at the
/// configured frame rate. JSON: a number or `[m, s, f]`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrameRef {
    Frame(i64),
    Timestamp(Timestamp),
}

impl FrameRef {
    #[inline]
    pub fn resolve(self, fps: i64) -> i64 {
        match self {
            FrameRef::Frame(f) => f,
            FrameRef::Timestamp(ts) => ts.to_frames(fps),
        }
    }
}

impl From<i64> for FrameRef {
    fn from(frame: i64) -> Self {
        FrameRef::Frame(frame)
    }
}

impl From<i32> for FrameRef {
    fn from(frame: i32) -> Self {
        FrameRef::Frame(i64::from(frame))
    }
}

impl From<Timestamp> for FrameRef {
    fn from(ts: Timestamp) -> Self {
        FrameRef::Timestamp(ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn one_minute_is_2400_frames() {
        assert_eq!(Timestamp::new(1, 0, 0).to_frames(40), 2400);
        assert_eq!(Timestamp::new(0, 3, 30).to_frames(40), 150);
    }

    #[test]
    fn negative_frames_normalize() {
        let ts = to_timestamp(-1, 40).unwrap();
        assert_eq!(ts, Timestamp::new(-1, 59, 39));
        assert_eq!(ts.to_frames(40), -1);
    }

    #[test]
    fn non_positive_frame_rates_are_rejected() {
        for fps in [0, -40] {
            assert!(matches!(
                to_timestamp(10, fps),
                Err(GravityError::InvalidFrameRate(f)) if f == fps
            ));
        }
        assert!(Timestamp::new(0, 1, 0).normalize(0).is_err());
    }

    #[test]
    fn checked_to_frames_reports_overflow() {
        assert_eq!(Timestamp::new(1, 2, 3).checked_to_frames(40), Some(2483));
        assert_eq!(Timestamp::new(i64::MAX / 100, 0, 0).checked_to_frames(40), None);
    }

    #[test]
    fn from_json_accepts_integral_floats() {
        let ts = Timestamp::from_json(&json!([0, 2.0, 5])).unwrap();
        assert_eq!(ts, Timestamp::new(0, 2, 5));
        assert!(Timestamp::from_json(&json!([0, 2.5, 5])).is_err());
        assert!(Timestamp::from_json(&json!([0, 2])).is_err());
        assert!(Timestamp::from_json(&json!("0:02")).is_err());
    }

    #[test]
    fn frame_ref_json_forms() {
        let a: FrameRef = serde_json::from_str("120").unwrap();
        let b: FrameRef = serde_json::from_str("[0, 3, 0]").unwrap();
        assert_eq!(a.resolve(40), 120);
        assert_eq!(b.resolve(40), 120);
    }
}
