//! JSON choreography scripts: riders plus timed effects, compiled into a
//! [`Choreography`].
//!
//! ```json
//! {
//!   "riders": [{ "id": "crew", "groups": ["crew"], "repeat": { "count": 4, "position_step": { "x": 0, "y": 25 } } }],
//!   "effects": [
//!     { "at": [0, 2, 0], "group": "crew", "effect": { "kind": "pulse", "x": 0.3, "y": 0, "duration": 5 },
//!       "interval": { "kind": "stagger", "frames": 10 } }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::config::Config;
use crate::contact::PointSet;
use crate::data::Vec2;
use crate::effects::{self, DockTarget, Effect, Sequence, Step, TeleportOptions};
use crate::error::{GravityError, Result};
use crate::rider::{generate_rider_array, Rider, RiderModifiers};
use crate::time::Timestamp;
use crate::timeline::{Choreography, Filter, Interval};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub config: Option<Config>,
    #[serde(default)]
    pub riders: Vec<RiderSpec>,
    #[serde(default)]
    pub effects: Vec<EffectEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiderSpec {
    pub id: String,
    #[serde(default)]
    pub start_position: Vec2,
    #[serde(default)]
    pub start_velocity: Vec2,
    #[serde(default)]
    pub start_angle: f64,
    #[serde(default)]
    pub remountable: Option<bool>,
    /// Defaults to the config's rider gravity.
    #[serde(default)]
    pub default_gravity: Option<Vec2>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub repeat: Option<RepeatSpec>,
}

/// Expand one rider spec into `count` riders stepped per index.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepeatSpec {
    pub count: usize,
    pub position_step: Vec2,
    pub velocity_step: Vec2,
    pub angle_step: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointSelector {
    /// Group name (`"sled"`, `"scarf"`) or single point name (`"lhand"`).
    Named(String),
    Points(PointSet),
}

impl PointSelector {
    pub fn resolve(&self) -> Result<PointSet> {
        match self {
            PointSelector::Named(name) => {
                PointSet::from_group(name).ok_or_else(|| GravityError::UnknownGroup(name.clone()))
            }
            PointSelector::Points(set) => Ok(*set),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectEntry {
    /// `[minutes, seconds, frames]`.
    pub at: JsonValue,
    /// Rider group; all riders when absent.
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub points: Option<PointSelector>,
    pub effect: EffectSpec,
    #[serde(default)]
    pub interval: Interval,
    #[serde(default)]
    pub filter: Filter,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectSpec {
    Set {
        x: f64,
        y: f64,
    },
    Default,
    Pulse {
        x: f64,
        y: f64,
        #[serde(default)]
        duration: i64,
    },
    Pop {
        x: f64,
        y: f64,
        #[serde(default)]
        duration: i64,
    },
    Teleport(TeleportOptions),
    Kramual {
        #[serde(default)]
        rotation: f64,
        #[serde(default)]
        launch: Option<Vec2>,
    },
    RiderToSled,
    TeleportTo {
        x: f64,
        y: f64,
        #[serde(default)]
        stop: bool,
    },
    TeleportBy {
        x: f64,
        y: f64,
        #[serde(default)]
        stop: bool,
    },
    Dock {
        target: DockTarget,
        #[serde(default = "default_true")]
        maintain_velocity: bool,
    },
    Sequence {
        steps: Vec<StepSpec>,
    },
}

/// A number waits that many frames; an object is an effect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepSpec {
    Wait(i64),
    Effect(EffectSpec),
}

impl EffectSpec {
    pub fn build(&self) -> Box<dyn Effect> {
        match self {
            EffectSpec::Set { x, y } => Box::new(effects::set_gravity(*x, *y)),
            EffectSpec::Default => Box::new(effects::DefaultGravity),
            EffectSpec::Pulse { x, y, duration } => {
                Box::new(effects::pulse(Vec2::new(*x, *y), *duration))
            }
            EffectSpec::Pop { x, y, duration } => Box::new(effects::pop(Vec2::new(*x, *y), *duration)),
            EffectSpec::Teleport(opts) => Box::new(effects::teleport(opts.clone())),
            EffectSpec::Kramual { rotation, launch } => match launch {
                Some(v) => Box::new(effects::kramual_with_launch(*rotation, *v)),
                None => Box::new(effects::kramual(*rotation)),
            },
            EffectSpec::RiderToSled => Box::new(effects::teleport_rider_to_sled()),
            EffectSpec::TeleportTo { x, y, stop } => Box::new(effects::TeleportTo {
                target: Vec2::new(*x, *y),
                stop: *stop,
            }),
            EffectSpec::TeleportBy { x, y, stop } => Box::new(effects::TeleportBy {
                offset: Vec2::new(*x, *y),
                stop: *stop,
            }),
            EffectSpec::Dock {
                target,
                maintain_velocity,
            } => Box::new(effects::Dock {
                target: *target,
                maintain_velocity: *maintain_velocity,
            }),
            EffectSpec::Sequence { steps } => {
                let mut seq = Sequence::new();
                for step in steps {
                    seq.push(match step {
                        StepSpec::Wait(frames) => Step::Wait(*frames),
                        StepSpec::Effect(spec) => Step::Effect(spec.build()),
                    });
                }
                Box::new(seq)
            }
        }
    }
}

pub fn parse_script_json(json: &str) -> Result<Script> {
    Ok(serde_json::from_str(json)?)
}

impl Script {
    /// Build riders, then apply every effect entry in order. `cfg` is used
    /// unless the script carries its own.
    pub fn compile(&self, cfg: &Config) -> Result<Choreography> {
        let cfg = self.config.clone().unwrap_or_else(|| cfg.clone());
        cfg.validate()?;
        let mut choreo = Choreography::new(cfg);
        for spec in &self.riders {
            let base = spec.to_rider(choreo.config());
            match &spec.repeat {
                Some(repeat) => {
                    let mods = RiderModifiers::new()
                        .position_step(repeat.position_step)
                        .velocity_step(repeat.velocity_step)
                        .angle_step(repeat.angle_step);
                    choreo.add_riders(generate_rider_array(&base, repeat.count, &mods)?);
                }
                None => {
                    if base.id.is_empty() {
                        return Err(GravityError::MissingRiderId);
                    }
                    choreo.add_rider(base);
                }
            }
        }
        for entry in &self.effects {
            let at = Timestamp::from_json(&entry.at)?;
            let points = match &entry.points {
                Some(sel) => sel.resolve()?,
                None => PointSet::ALL,
            };
            let targets = entry.filter.apply(&choreo.targets(entry.group.as_deref(), points));
            let effect = entry.effect.build();
            choreo.apply_gravity(&targets, at, &*effect, &entry.interval)?;
        }
        log::debug!(
            "compiled script: {} riders, {} effect entries",
            choreo.len(),
            self.effects.len()
        );
        Ok(choreo)
    }
}

impl RiderSpec {
    fn to_rider(&self, cfg: &Config) -> Rider {
        let mut rider = Rider::new(self.id.clone())
            .with_start_position(self.start_position)
            .with_start_velocity(self.start_velocity)
            .with_start_angle(self.start_angle)
            .with_remountable(self.remountable.unwrap_or(true))
            .with_default_gravity(self.default_gravity.unwrap_or(cfg.default_rider_gravity));
        for g in &self.groups {
            rider = rider.with_group(g.clone());
        }
        rider
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"{
        "riders": [
            { "id": "lead", "groups": ["front"] },
            { "id": "crew", "groups": ["crew"], "repeat": { "count": 3, "position_step": { "x": 0, "y": 25 } } }
        ],
        "effects": [
            { "at": [0, 1, 0], "group": "crew", "effect": { "kind": "set", "x": 0, "y": -0.1 },
              "interval": { "kind": "stagger", "frames": 2 } },
            { "at": [0, 0, 5], "points": "scarf", "effect": { "kind": "pulse", "x": 1, "y": 0, "duration": 1 } }
        ]
    }"#;

    #[test]
    fn compiles_riders_and_effects() {
        let script = parse_script_json(SCRIPT).unwrap();
        let choreo = script.compile(&Config::default()).unwrap();
        assert_eq!(choreo.len(), 4);
        assert_eq!(choreo.riders()[3].id, "crew_2");
        assert_eq!(choreo.riders()[3].start_position, Vec2::new(0.0, 50.0));
        let stream = choreo.keyframe_stream();
        // lead: scarf pulse only; crew: staggered set plus pulse.
        assert_eq!(stream[0].len(), 2);
        assert_eq!(stream[3].len(), 3);
        assert_eq!(stream[3][2].frame(40), 44);
        assert_eq!(stream[0][0].points, PointSet::SCARF);
    }

    #[test]
    fn authoring_errors_surface() {
        let bad_ts = r#"{ "riders": [{ "id": "a" }],
            "effects": [{ "at": "soon", "effect": { "kind": "default" } }] }"#;
        let err = parse_script_json(bad_ts).unwrap().compile(&Config::default()).unwrap_err();
        assert!(matches!(err, GravityError::MalformedTimestamp(_)));

        let no_group = r#"{ "riders": [{ "id": "a" }],
            "effects": [{ "at": [0, 0, 0], "group": "ghosts", "effect": { "kind": "default" } }] }"#;
        let err = parse_script_json(no_group).unwrap().compile(&Config::default()).unwrap_err();
        assert!(matches!(err, GravityError::NoTargets));

        assert!(matches!(parse_script_json("{ nope"), Err(GravityError::Script(_))));

        let frozen = r#"{ "config": { "frames_per_second": 0 }, "riders": [{ "id": "a" }] }"#;
        let err = parse_script_json(frozen).unwrap().compile(&Config::default()).unwrap_err();
        assert!(matches!(err, GravityError::InvalidFrameRate(0)));
    }

    #[test]
    fn sequences_nest() {
        let spec: EffectSpec = serde_json::from_str(
            r#"{ "kind": "sequence", "steps": [ { "kind": "pulse", "x": 1, "y": 0, "duration": 0 }, 5, { "kind": "default" } ] }"#,
        )
        .unwrap();
        let kfs = spec
            .build()
            .keyframes(0, &crate::effects::EffectContext::new(Vec2::ZERO, PointSet::ALL))
            .unwrap();
        let frames: Vec<i64> = kfs.iter().map(|kf| kf.frame(40)).collect();
        assert_eq!(frames, vec![0, 1, 7]);
    }
}
