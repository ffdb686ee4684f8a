//! Gravity evaluation engine.
//!
//! The host asks for gravity once per contact point per rider per frame, in
//! a fixed order, without saying which point it is asking about. The engine
//! recovers `(rider, point)` from a call counter and resolves the active
//! keyframe for that point. Resolution is an incremental fold over the
//! rider's sorted keyframes, memoized per point: advancing continues the
//! fold, asking for an earlier frame restarts it.

use crate::config::Config;
use crate::contact::{ContactPoint, POINTS_PER_RIDER};
use crate::data::{RiderSnapshot, Vec2};
use crate::diagnostics::{EngineStats, PointDebugState};
use crate::error::{GravityError, Result};
use crate::host::SimulationHost;
use crate::instruction::{Instruction, KeyframeContext, Resolve};
use crate::keyframe::{sort_keyframes, Keyframe, KeyframeStream};

/// `(rider, point)` addressed by one accessor call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slot {
    pub rider: usize,
    pub point: ContactPoint,
}

/// Decode the 1-based call counter. The host visits every point of rider 0,
/// then every point of rider 1, and so on, once per frame.
pub fn round_robin(call: u64, num_riders: usize) -> Option<Slot> {
    if call == 0 || num_riders == 0 {
        return None;
    }
    let idx = call - 1;
    let per_rider = POINTS_PER_RIDER as u64;
    let rider = ((idx / per_rider) % num_riders as u64) as usize;
    let point = ContactPoint::new((idx % per_rider) as u8)?;
    Some(Slot { rider, point })
}

#[derive(Clone, Copy, Debug)]
struct PointMemo {
    /// Last frame folded up to.
    frame: i64,
    /// Next keyframe to fold.
    cursor: usize,
    active: Option<usize>,
    last_known: Option<Vec2>,
}

impl Default for PointMemo {
    fn default() -> Self {
        Self {
            frame: i64::MIN,
            cursor: 0,
            active: None,
            last_known: None,
        }
    }
}

#[derive(Debug)]
struct RiderTrack {
    keyframes: Vec<Keyframe>,
    frames: Vec<i64>,
    memo: [PointMemo; POINTS_PER_RIDER],
}

impl RiderTrack {
    fn new(mut keyframes: Vec<Keyframe>, fps: i64) -> Self {
        sort_keyframes(&mut keyframes, fps);
        let frames = keyframes.iter().map(|kf| kf.frame(fps)).collect();
        Self {
            keyframes,
            frames,
            memo: [PointMemo::default(); POINTS_PER_RIDER],
        }
    }

    fn reset_memo(&mut self) {
        self.memo = [PointMemo::default(); POINTS_PER_RIDER];
    }

    /// Advance (or restart) the fold for `point` up to `frame`.
    fn advance(&mut self, rider: usize, point: ContactPoint, frame: i64, soft: Vec2) -> PointMemo {
        let memo = &mut self.memo[point.index()];
        if frame < memo.frame {
            *memo = PointMemo::default();
        }
        fold(&self.keyframes, &self.frames, memo, rider, point, frame, soft);
        *memo
    }

    /// Same as [`RiderTrack::advance`] without touching the memo.
    fn peek(&self, rider: usize, point: ContactPoint, frame: i64, soft: Vec2) -> PointMemo {
        let mut memo = self.memo[point.index()];
        if frame < memo.frame {
            memo = PointMemo::default();
        }
        fold(&self.keyframes, &self.frames, &mut memo, rider, point, frame, soft);
        memo
    }
}

fn fold(
    keyframes: &[Keyframe],
    frames: &[i64],
    memo: &mut PointMemo,
    rider: usize,
    point: ContactPoint,
    frame: i64,
    soft: Vec2,
) {
    while memo.cursor < keyframes.len() && frames[memo.cursor] <= frame {
        let kf = &keyframes[memo.cursor];
        if kf.covers(point) {
            if !kf.is_transient() {
                let ctx = KeyframeContext {
                    rider,
                    point,
                    frame: frames[memo.cursor],
                    snapshot: None,
                    last_gravity: memo.last_known.unwrap_or(soft),
                };
                if let Some(g) = kf.instruction.resolve(&ctx) {
                    memo.last_known = Some(g);
                }
            }
            memo.active = Some(memo.cursor);
        }
        memo.cursor += 1;
    }
    memo.frame = frame;
}

/// Owns the keyframe table of every rider and answers gravity queries.
#[derive(Debug)]
pub struct Engine {
    cfg: Config,
    riders: Vec<RiderTrack>,
    counter: u64,
    stats: EngineStats,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Engine {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            riders: Vec::new(),
            counter: 0,
            stats: EngineStats::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Replace every rider's keyframes. Resets the call counter, the
    /// per-point memos and the stats.
    pub fn setup(&mut self, stream: KeyframeStream) {
        let fps = self.cfg.frames_per_second;
        self.riders = stream
            .into_iter()
            .map(|kfs| RiderTrack::new(kfs, fps))
            .collect();
        self.counter = 0;
        self.stats = EngineStats::default();
        log::debug!(
            "gravity engine set up: {} riders, {} keyframes",
            self.riders.len(),
            self.riders.iter().map(|r| r.keyframes.len()).sum::<usize>()
        );
    }

    /// Append keyframes to one rider without disturbing the others.
    pub fn extend_rider(&mut self, rider: usize, keyframes: impl IntoIterator<Item = Keyframe>) -> Result<()> {
        let fps = self.cfg.frames_per_second;
        let track = self
            .riders
            .get_mut(rider)
            .ok_or(GravityError::UnknownRider(rider as u32))?;
        let mut all = std::mem::take(&mut track.keyframes);
        all.extend(keyframes);
        *track = RiderTrack::new(all, fps);
        Ok(())
    }

    /// Riders in the keyframe table.
    pub fn rider_count(&self) -> usize {
        self.riders.len()
    }

    pub fn keyframes(&self, rider: usize) -> Option<&[Keyframe]> {
        self.riders.get(rider).map(|r| r.keyframes.as_slice())
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Restart the round robin, e.g. when the host re-simulates from the
    /// first frame.
    pub fn reset_counter(&mut self) {
        self.counter = 0;
    }

    /// Drop the per-point memos; the next queries refold from scratch.
    pub fn invalidate(&mut self) {
        for track in &mut self.riders {
            track.reset_memo();
        }
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// The host accessor: one call per contact point per rider per frame.
    /// With no riders the soft default is returned and nothing advances.
    pub fn next_gravity<H: SimulationHost + ?Sized>(&mut self, host: &H) -> Vec2 {
        let num_riders = host.rider_count();
        if num_riders == 0 {
            return self.cfg.soft_default;
        }
        self.counter += 1;
        let Some(slot) = round_robin(self.counter, num_riders) else {
            return self.cfg.soft_default;
        };
        let frame = host.frame_index();
        self.evaluate(slot.rider, slot.point, frame, || {
            host.rider_snapshot(frame - 1, slot.rider)
        })
    }

    /// Gravity for an explicit `(rider, point, frame)`; `snapshot` is the
    /// rider's state at `frame - 1`.
    pub fn gravity_at(
        &mut self,
        rider: usize,
        point: ContactPoint,
        frame: i64,
        snapshot: Option<&RiderSnapshot>,
    ) -> Vec2 {
        self.evaluate(rider, point, frame, || snapshot.cloned())
    }

    fn evaluate<F>(&mut self, rider: usize, point: ContactPoint, frame: i64, fetch: F) -> Vec2
    where
        F: FnOnce() -> Option<RiderSnapshot>,
    {
        self.stats.calls += 1;
        let soft = self.cfg.soft_default;
        let Some(track) = self.riders.get_mut(rider) else {
            return soft;
        };
        let memo = track.advance(rider, point, frame, soft);
        let ambient = memo.last_known.unwrap_or(soft);
        let Some(kf) = memo.active.and_then(|i| track.keyframes.get(i)) else {
            return ambient;
        };
        if !kf.is_transient() {
            return ambient;
        }
        match &kf.instruction {
            Instruction::Constant(g) => *g,
            Instruction::LastGravity => ambient,
            instruction => {
                self.stats.computed_evaluations += 1;
                let snapshot = fetch();
                let ctx = KeyframeContext {
                    rider,
                    point,
                    frame,
                    snapshot: snapshot.as_ref(),
                    last_gravity: ambient,
                };
                match instruction.resolve(&ctx) {
                    Some(g) if g.is_finite() => {
                        log::trace!("rider {rider} {point} @{frame}: {} -> {g:?}", instruction.describe());
                        g
                    }
                    _ => {
                        self.stats.fallbacks += 1;
                        log::trace!("rider {rider} {point} @{frame}: {} fell back", instruction.describe());
                        ambient
                    }
                }
            }
        }
    }

    /// Per rider, per point view of what applies at `frame`.
    pub fn debug_states(&self, frame: i64) -> Vec<Vec<PointDebugState>> {
        let soft = self.cfg.soft_default;
        self.riders
            .iter()
            .enumerate()
            .map(|(rider, track)| {
                ContactPoint::all()
                    .map(|point| {
                        let memo = track.peek(rider, point, frame, soft);
                        let active = memo.active.and_then(|i| track.keyframes.get(i).map(|kf| (i, kf)));
                        PointDebugState {
                            point,
                            active: active.map(|(_, kf)| kf.instruction.describe()),
                            active_frame: active.map(|(i, _)| track.frames[i]),
                            transient: active.map_or(false, |(_, kf)| kf.is_transient()),
                            last_known: memo.last_known,
                        }
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::PointSet;

    #[test]
    fn round_robin_walks_points_then_riders() {
        assert_eq!(round_robin(0, 2), None);
        assert_eq!(round_robin(5, 0), None);
        let s = round_robin(1, 2).unwrap();
        assert_eq!((s.rider, s.point), (0, ContactPoint::PEG));
        let s = round_robin(18, 2).unwrap();
        assert_eq!((s.rider, s.point), (1, ContactPoint::PEG));
        let s = round_robin(35, 2).unwrap();
        assert_eq!((s.rider, s.point), (0, ContactPoint::PEG));
        let s = round_robin(34, 2).unwrap();
        assert_eq!((s.rider, s.point), (1, ContactPoint::SCARF_6));
    }

    #[test]
    fn unknown_rider_gets_soft_default() {
        let mut engine = Engine::default();
        engine.setup(vec![vec![Keyframe::new(0, PointSet::ALL, Instruction::constant(1.0, 1.0))]]);
        assert_eq!(
            engine.gravity_at(3, ContactPoint::PEG, 10, None),
            Config::default().soft_default
        );
        assert_eq!(engine.stats().calls, 1);
    }

    #[test]
    fn extend_rider_resorts() {
        let mut engine = Engine::default();
        engine.setup(vec![vec![Keyframe::new(10, PointSet::ALL, Instruction::constant(1.0, 0.0))]]);
        assert_eq!(engine.gravity_at(0, ContactPoint::TAIL, 12, None), Vec2::new(1.0, 0.0));
        engine
            .extend_rider(0, [Keyframe::new(11, PointSet::ALL, Instruction::constant(2.0, 0.0))])
            .unwrap();
        assert_eq!(engine.gravity_at(0, ContactPoint::TAIL, 12, None), Vec2::new(2.0, 0.0));
        assert!(engine.extend_rider(4, Vec::new()).is_err());
    }
}
