//! Seams to the host simulator.
//!
//! The host owns the physics loop. On the read side it reports the frame
//! being computed and the committed state of earlier frames; on the write
//! side it accepts riders and track commits.

use crate::data::RiderSnapshot;
use crate::engine::Engine;
use crate::error::Result;
use crate::rider::Rider;
use crate::timeline::Choreography;

/// Read access to the running simulation, used by the gravity accessor.
pub trait SimulationHost {
    /// Frame currently being computed.
    fn frame_index(&self) -> i64;
    fn rider_count(&self) -> usize;
    /// Committed state of `rider` at `frame`, if the host has it.
    fn rider_snapshot(&self, frame: i64, rider: usize) -> Option<RiderSnapshot>;
}

/// Write access to the host's track state.
pub trait TrackHost {
    fn set_riders(&mut self, riders: &[Rider]) -> Result<()>;
    fn commit_track_changes(&mut self) -> Result<()>;
    /// Drop cached simulation frames so they are recomputed with the new
    /// gravity.
    fn invalidate_playback_cache(&mut self) -> Result<()>;
}

/// Pushes a finished choreography to a host and the engine together.
pub struct Session<'h, H: TrackHost + ?Sized> {
    host: &'h mut H,
}

impl<'h, H: TrackHost + ?Sized> Session<'h, H> {
    pub fn new(host: &'h mut H) -> Self {
        Self { host }
    }

    /// Set riders, load the keyframe stream into the engine, commit, then
    /// invalidate cached frames.
    pub fn commit(&mut self, choreography: &Choreography, engine: &mut Engine) -> Result<()> {
        self.host.set_riders(choreography.riders())?;
        engine.setup(choreography.keyframe_stream());
        self.host.commit_track_changes()?;
        self.host.invalidate_playback_cache()?;
        log::debug!("committed {} riders to host", choreography.len());
        Ok(())
    }
}
