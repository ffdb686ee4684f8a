use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    scripts: HashMap<String, String>,
    streams: HashMap<String, String>,
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn load_json<T: DeserializeOwned>(rel: &str) -> Result<T> {
    let text = read_to_string(rel)?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse JSON fixture {rel}"))
}

fn lookup<'a>(map: &'a HashMap<String, String>, kind: &str, name: &str) -> Result<&'a str> {
    map.get(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

/// Choreography scripts (`gravkey_core::Script` JSON).
pub mod scripts {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.scripts.keys().cloned().collect()
    }

    pub fn json(name: &str) -> Result<String> {
        read_to_string(lookup(&MANIFEST.scripts, "script", name)?)
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        super::load_json(lookup(&MANIFEST.scripts, "script", name)?)
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        Ok(resolve_path(lookup(&MANIFEST.scripts, "script", name)?))
    }
}

/// Raw keyframe streams as the browser host would send them.
pub mod streams {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.streams.keys().cloned().collect()
    }

    pub fn json(name: &str) -> Result<String> {
        read_to_string(lookup(&MANIFEST.streams, "stream", name)?)
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        super::load_json(lookup(&MANIFEST.streams, "stream", name)?)
    }
}

/// In-memory stand-in for the browser simulator.
pub mod host {
    use gravkey_core::geometry::integrate;
    use gravkey_core::shape::DEFAULT_SHAPE;
    use gravkey_core::{
        ContactPoint, Engine, PointState, Rider, RiderSnapshot, SimulationHost, Vec2,
    };

    /// Integrates every point with the host's Euler step
    /// (`vel += acc; pos += vel`) and keeps every committed frame.
    /// Frame 0 is the initial state; `frame_index` is the frame being
    /// computed.
    #[derive(Clone, Debug)]
    pub struct EulerHost {
        history: Vec<Vec<RiderSnapshot>>,
    }

    impl EulerHost {
        pub fn new(initial: Vec<RiderSnapshot>) -> Self {
            Self {
                history: vec![initial],
            }
        }

        /// Riders in the stock pose at their start positions, moving at
        /// their start velocities.
        pub fn from_riders(riders: &[Rider]) -> Self {
            let initial = riders
                .iter()
                .map(|r| {
                    RiderSnapshot::new(
                        ContactPoint::all()
                            .map(|cp| {
                                let offset = DEFAULT_SHAPE.get(cp).unwrap_or(Vec2::ZERO);
                                PointState::new(r.start_position + offset, r.start_velocity)
                            })
                            .collect(),
                    )
                })
                .collect();
            Self::new(initial)
        }

        /// `count` riders stacked 50 units apart, at rest.
        pub fn at_rest(count: usize) -> Self {
            let riders: Vec<Rider> = (0..count)
                .map(|i| {
                    Rider::new(format!("r{i}")).with_start_position(Vec2::new(0.0, 50.0 * i as f64))
                })
                .collect();
            Self::from_riders(&riders)
        }

        pub fn frames(&self) -> usize {
            self.history.len()
        }

        pub fn state(&self, frame: usize, rider: usize) -> Option<&RiderSnapshot> {
            self.history.get(frame).and_then(|f| f.get(rider))
        }

        pub fn point(&self, frame: usize, rider: usize, cp: ContactPoint) -> Option<PointState> {
            self.state(frame, rider).and_then(|s| s.point(cp)).copied()
        }

        pub fn latest(&self, rider: usize, cp: ContactPoint) -> Option<PointState> {
            self.point(self.history.len() - 1, rider, cp)
        }

        /// Compute one frame, querying the engine in host order. Returns the
        /// accelerations applied, per rider and point.
        pub fn step(&mut self, engine: &mut Engine) -> Vec<Vec<Vec2>> {
            let riders = self.rider_count();
            let mut accelerations = Vec::with_capacity(riders);
            for _ in 0..riders {
                let per_point: Vec<Vec2> = ContactPoint::all()
                    .map(|_| engine.next_gravity(&*self))
                    .collect();
                accelerations.push(per_point);
            }
            let last = self.history.last().cloned().unwrap_or_default();
            let next = last
                .iter()
                .zip(&accelerations)
                .map(|(snap, accs)| {
                    RiderSnapshot::new(
                        snap.points
                            .iter()
                            .zip(accs)
                            .map(|(state, acc)| integrate(state, *acc))
                            .collect(),
                    )
                })
                .collect();
            self.history.push(next);
            accelerations
        }

        pub fn run(&mut self, engine: &mut Engine, frames: usize) {
            for _ in 0..frames {
                self.step(engine);
            }
        }
    }

    impl SimulationHost for EulerHost {
        fn frame_index(&self) -> i64 {
            self.history.len() as i64
        }

        fn rider_count(&self) -> usize {
            self.history.first().map_or(0, Vec::len)
        }

        fn rider_snapshot(&self, frame: i64, rider: usize) -> Option<RiderSnapshot> {
            let frame = usize::try_from(frame).ok()?;
            self.state(frame, rider).cloned()
        }
    }
}
