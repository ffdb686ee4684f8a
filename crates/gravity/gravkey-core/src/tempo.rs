//! Music sync helpers: pick a frames-per-beat value whose playback time
//! scale lands close to a song's tempo.

use serde::{Deserialize, Serialize};

/// Frames per beat at a playback speed multiplier (40 fps / 1.04 on the
/// stock host).
#[inline]
pub fn frames_per_beat(fps: f64, playback_speed: f64) -> f64 {
    fps / playback_speed
}

/// Playback time scale needed for beats of `fpb` frames to match `bpm`.
#[inline]
pub fn time_scale_for_fpb(fps: f64, bpm: f64, fpb: f64) -> f64 {
    fpb * bpm / (60.0 * fps)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fraction {
    pub numerator: i64,
    pub denominator: i64,
}

impl Fraction {
    pub fn value(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

fn gcd(mut a: i64, mut b: i64) -> i64 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a.abs()
}

/// Denominators searched before giving up on an exact fit.
const MAX_DENOMINATOR: i64 = 1_000_000;

/// Smallest-denominator fraction within `tolerance` of `decimal`, reduced.
pub fn to_fraction(decimal: f64, tolerance: f64) -> Fraction {
    if !decimal.is_finite() {
        return Fraction {
            numerator: 0,
            denominator: 1,
        };
    }
    let mut denominator = 1i64;
    let mut numerator = decimal.round() as i64;
    while denominator < MAX_DENOMINATOR
        && (decimal - numerator as f64 / denominator as f64).abs() > tolerance
    {
        denominator += 1;
        numerator = (decimal * denominator as f64).round() as i64;
    }
    let g = gcd(numerator, denominator).max(1);
    Fraction {
        numerator: numerator / g,
        denominator: denominator / g,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FpbChoice {
    pub fpb: u32,
    pub time_scale: f64,
    /// `|time_scale - 1|`.
    pub deviation: f64,
    pub fraction: Fraction,
}

fn choice(fps: f64, bpm: f64, fpb: u32) -> FpbChoice {
    let time_scale = time_scale_for_fpb(fps, bpm, fpb as f64);
    FpbChoice {
        fpb,
        time_scale,
        deviation: (time_scale - 1.0).abs(),
        fraction: to_fraction(time_scale, 1e-6),
    }
}

fn best(candidates: impl Iterator<Item = u32>, fps: f64, bpm: f64) -> Option<FpbChoice> {
    candidates
        .map(|fpb| choice(fps, bpm, fpb))
        .fold(None, |best: Option<FpbChoice>, c| match best {
            Some(b) if b.deviation <= c.deviation => Some(b),
            _ => Some(c),
        })
}

/// Frames per beat in `1..=max_fpb` needing the time scale closest to 1.
pub fn best_fpb(fps: f64, bpm: f64, max_fpb: u32) -> Option<FpbChoice> {
    best(1..=max_fpb, fps, bpm)
}

/// Like [`best_fpb`] over powers of two `2^1..=2^max_power`.
pub fn best_power_of_two_fpb(fps: f64, bpm: f64, max_power: u32) -> Option<FpbChoice> {
    best((1..=max_power.min(31)).map(|p| 1u32 << p), fps, bpm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractions_reduce() {
        assert_eq!(
            to_fraction(0.75, 1e-6),
            Fraction {
                numerator: 3,
                denominator: 4
            }
        );
        assert_eq!(to_fraction(2.0, 1e-6).denominator, 1);
        assert_eq!(to_fraction(1.0275, 1e-6), Fraction { numerator: 411, denominator: 400 });
    }

    #[test]
    fn picks_closest_fpb() {
        let any = best_fpb(40.0, 137.0, 32).unwrap();
        assert_eq!(any.fpb, 18);
        let pow2 = best_power_of_two_fpb(40.0, 137.0, 6).unwrap();
        assert_eq!(pow2.fpb, 16);
        assert!(best_fpb(40.0, 137.0, 0).is_none());
    }

    #[test]
    fn stock_frames_per_beat() {
        assert!((frames_per_beat(40.0, 1.04) - 38.461_538).abs() < 1e-5);
        assert!((time_scale_for_fpb(40.0, 150.0, 16.0) - 1.0).abs() < 1e-12);
    }
}
