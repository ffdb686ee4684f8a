use js_sys::{Function, Reflect, JSON};
use serde::Serialize;
use serde_wasm_bindgen as swb;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use gravkey_core::{
    parse_script_json, Choreography, Config, ContactPoint, Engine, GravityError, Instruction,
    Keyframe, KeyframeContext, KeyframeStream, PointSet, Resolve, Rider, RiderSnapshot, Session,
    SimulationHost, Timestamp, TrackHost, Vec2,
};

#[wasm_bindgen]
pub struct GravKey {
    core: Engine,
}

fn jsvalue_is_undefined_or_null(v: &JsValue) -> bool {
    v.is_undefined() || v.is_null()
}

fn fps_or_default(fps: Option<i32>) -> Result<i64, JsError> {
    let fps = fps.map(i64::from).unwrap_or(Config::default().frames_per_second);
    gravkey_core::time::check_fps(fps).map_err(|e| JsError::new(&format!("{e}")))
}

/// Read side of the host, backed by a JS `lookup(frame, rider)` callback that
/// returns a rider snapshot (`{ points: [{ pos, vel }] }`) or null.
struct JsHost {
    frame_index: i64,
    rider_count: usize,
    lookup: Function,
}

impl SimulationHost for JsHost {
    fn frame_index(&self) -> i64 {
        self.frame_index
    }

    fn rider_count(&self) -> usize {
        self.rider_count
    }

    fn rider_snapshot(&self, frame: i64, rider: usize) -> Option<RiderSnapshot> {
        let val = self
            .lookup
            .call2(
                &JsValue::UNDEFINED,
                &JsValue::from_f64(frame as f64),
                &JsValue::from_f64(rider as f64),
            )
            .ok()?;
        if jsvalue_is_undefined_or_null(&val) {
            return None;
        }
        match swb::from_value::<RiderSnapshot>(val) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                log::warn!("rider {rider} snapshot at frame {frame} rejected: {e}");
                None
            }
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsKeyframeContext<'a> {
    rider: usize,
    point: ContactPoint,
    frame: i64,
    snapshot: Option<&'a RiderSnapshot>,
    last_gravity: Vec2,
}

/// Custom instruction evaluated by a JS function `f(ctx) -> {x, y} | null`.
struct JsInstruction {
    f: Function,
}

impl Resolve for JsInstruction {
    fn resolve(&self, ctx: &KeyframeContext<'_>) -> Option<Vec2> {
        let arg = swb::to_value(&JsKeyframeContext {
            rider: ctx.rider,
            point: ctx.point,
            frame: ctx.frame,
            snapshot: ctx.snapshot,
            last_gravity: ctx.last_gravity,
        })
        .ok()?;
        let val = self.f.call1(&JsValue::UNDEFINED, &arg).ok()?;
        if jsvalue_is_undefined_or_null(&val) {
            return None;
        }
        swb::from_value::<Vec2>(val).ok()
    }
}

/// Write side of the host: an object with `setRiders(riders)`,
/// `commitTrackChanges()` and `invalidatePlaybackCache()`.
struct JsTrackHost {
    actions: JsValue,
}

impl JsTrackHost {
    fn action(&self, name: &str) -> Result<Function, GravityError> {
        Reflect::get(&self.actions, &JsValue::from_str(name))
            .ok()
            .and_then(|f| f.dyn_into::<Function>().ok())
            .ok_or_else(|| GravityError::host(format!("host action `{name}` is not a function")))
    }

    fn call(&self, name: &str, arg: Option<&JsValue>) -> gravkey_core::Result<()> {
        let f = self.action(name)?;
        let res = match arg {
            Some(arg) => f.call1(&self.actions, arg),
            None => f.call0(&self.actions),
        };
        res.map(|_| ())
            .map_err(|e| GravityError::host(format!("{name} failed: {e:?}")))
    }
}

impl TrackHost for JsTrackHost {
    fn set_riders(&mut self, riders: &[Rider]) -> gravkey_core::Result<()> {
        let arg = swb::to_value(&riders).map_err(|e| GravityError::host(e.to_string()))?;
        self.call("setRiders", Some(&arg))
    }

    fn commit_track_changes(&mut self) -> gravkey_core::Result<()> {
        self.call("commitTrackChanges", None)
    }

    fn invalidate_playback_cache(&mut self) -> gravkey_core::Result<()> {
        self.call("invalidatePlaybackCache", None)
    }
}

impl GravKey {
    fn compile_script(&self, script: JsValue) -> Result<Choreography, JsError> {
        if jsvalue_is_undefined_or_null(&script) {
            return Err(JsError::new("script is null/undefined"));
        }
        let s = JSON::stringify(&script)
            .map_err(|e| JsError::new(&format!("script stringify error: {:?}", e)))?
            .as_string()
            .ok_or_else(|| JsError::new("script stringify produced non-string"))?;
        let parsed = parse_script_json(&s).map_err(|e| JsError::new(&format!("script parse error: {e}")))?;
        parsed
            .compile(self.core.config())
            .map_err(|e| JsError::new(&format!("script compile error: {e}")))
    }
}

#[wasm_bindgen]
impl GravKey {
    /// Create an engine. Pass a JSON config object or undefined/null for defaults.
    ///   new GravKey({ frames_per_second: 40 })
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<GravKey, JsError> {
        console_error_panic_hook::set_once();

        let cfg: Config = if jsvalue_is_undefined_or_null(&config) {
            Config::default()
        } else {
            swb::from_value(config).map_err(|e| JsError::new(&format!("config error: {e}")))?
        };
        cfg.validate()
            .map_err(|e| JsError::new(&format!("config error: {e}")))?;

        Ok(GravKey {
            core: Engine::new(cfg),
        })
    }

    /// Load a keyframe stream (one array of keyframes per rider). Returns the
    /// number of riders.
    #[wasm_bindgen]
    pub fn setup(&mut self, stream: JsValue) -> Result<u32, JsError> {
        let stream: KeyframeStream = if jsvalue_is_undefined_or_null(&stream) {
            Vec::new()
        } else {
            swb::from_value(stream).map_err(|e| JsError::new(&format!("keyframe stream error: {e}")))?
        };
        self.core.setup(stream);
        Ok(self.core.rider_count() as u32)
    }

    /// Append a keyframe whose gravity comes from a JS callback
    /// `f({ rider, point, frame, snapshot, lastGravity }) -> {x, y} | null`.
    /// `points` is an array of contact point indices, or null for all.
    #[wasm_bindgen(js_name = add_keyframe_fn)]
    pub fn add_keyframe_fn(
        &mut self,
        rider: u32,
        frame: i32,
        points: JsValue,
        f: Function,
        computed: bool,
    ) -> Result<(), JsError> {
        let points: PointSet = if jsvalue_is_undefined_or_null(&points) {
            PointSet::ALL
        } else {
            swb::from_value(points).map_err(|e| JsError::new(&format!("points error: {e}")))?
        };
        let instruction = Instruction::custom(JsInstruction { f });
        let kf = if computed {
            Keyframe::transient(i64::from(frame), points, instruction)
        } else {
            Keyframe::new(i64::from(frame), points, instruction)
        };
        self.core
            .extend_rider(rider as usize, [kf])
            .map_err(|e| JsError::new(&format!("add_keyframe_fn: {e}")))
    }

    /// Compile a choreography script and load its keyframes. Returns the
    /// rider definitions for the host to place.
    #[wasm_bindgen(js_name = load_script)]
    pub fn load_script(&mut self, script: JsValue) -> Result<JsValue, JsError> {
        let choreo = self.compile_script(script)?;
        self.core.setup(choreo.keyframe_stream());
        swb::to_value(&choreo.riders()).map_err(|e| JsError::new(&format!("serialize riders error: {e}")))
    }

    /// Compile a script and push it through the host `actions` object
    /// (`setRiders`, `commitTrackChanges`, `invalidatePlaybackCache`).
    #[wasm_bindgen(js_name = commit_script)]
    pub fn commit_script(&mut self, script: JsValue, actions: JsValue) -> Result<u32, JsError> {
        let choreo = self.compile_script(script)?;
        let mut host = JsTrackHost { actions };
        Session::new(&mut host)
            .commit(&choreo, &mut self.core)
            .map_err(|e| JsError::new(&format!("commit error: {e}")))?;
        Ok(choreo.len() as u32)
    }

    /// The per-point accessor. Call once per contact point per rider per
    /// frame; `lookup(frame, rider)` returns committed rider state.
    #[wasm_bindgen]
    pub fn gravity(&mut self, frame_index: i32, rider_count: u32, lookup: Function) -> Result<JsValue, JsError> {
        let host = JsHost {
            frame_index: i64::from(frame_index),
            rider_count: rider_count as usize,
            lookup,
        };
        let g = self.core.next_gravity(&host);
        swb::to_value(&g).map_err(|e| JsError::new(&format!("serialize gravity error: {e}")))
    }

    /// Gravity for an explicit rider, point and frame. `snapshot` is the
    /// rider state at `frame - 1`, or null.
    #[wasm_bindgen(js_name = gravity_at)]
    pub fn gravity_at(&mut self, rider: u32, point: u8, frame: i32, snapshot: JsValue) -> Result<JsValue, JsError> {
        let point = ContactPoint::try_from(point).map_err(|e| JsError::new(&format!("gravity_at: {e}")))?;
        let snapshot: Option<RiderSnapshot> = if jsvalue_is_undefined_or_null(&snapshot) {
            None
        } else {
            Some(swb::from_value(snapshot).map_err(|e| JsError::new(&format!("snapshot error: {e}")))?)
        };
        let g = self
            .core
            .gravity_at(rider as usize, point, i64::from(frame), snapshot.as_ref());
        swb::to_value(&g).map_err(|e| JsError::new(&format!("serialize gravity error: {e}")))
    }

    #[wasm_bindgen]
    pub fn stats(&self) -> Result<JsValue, JsError> {
        swb::to_value(self.core.stats()).map_err(|e| JsError::new(&format!("serialize stats error: {e}")))
    }

    /// Per rider, per point view of the keyframe that applies at `frame`.
    #[wasm_bindgen(js_name = debug_states)]
    pub fn debug_states(&self, frame: i32) -> Result<JsValue, JsError> {
        swb::to_value(&self.core.debug_states(i64::from(frame)))
            .map_err(|e| JsError::new(&format!("serialize debug states error: {e}")))
    }

    #[wasm_bindgen(js_name = reset_counter)]
    pub fn reset_counter(&mut self) {
        self.core.reset_counter();
    }

    #[wasm_bindgen(js_name = rider_count)]
    pub fn rider_count(&self) -> u32 {
        self.core.rider_count() as u32
    }
}

/// `[minutes, seconds, frames]` to an absolute frame index.
#[wasm_bindgen(js_name = to_frames)]
pub fn to_frames(timestamp: JsValue, fps: Option<i32>) -> Result<f64, JsError> {
    let raw: serde_json::Value =
        swb::from_value(timestamp).map_err(|e| JsError::new(&format!("timestamp error: {e}")))?;
    let ts = Timestamp::from_json(&raw).map_err(|e| JsError::new(&format!("{e}")))?;
    ts.checked_to_frames(fps_or_default(fps)?)
        .map(|f| f as f64)
        .ok_or_else(|| JsError::new(&format!("timestamp {ts} is out of range")))
}

/// Absolute frame index to a normalized `[minutes, seconds, frames]`.
#[wasm_bindgen(js_name = to_timestamp)]
pub fn to_timestamp(frames: i32, fps: Option<i32>) -> Result<JsValue, JsError> {
    let ts = gravkey_core::to_timestamp(i64::from(frames), fps_or_default(fps)?)
        .map_err(|e| JsError::new(&format!("{e}")))?;
    swb::to_value(&ts).map_err(|e| JsError::new(&format!("serialize timestamp error: {e}")))
}

#[wasm_bindgen]
pub fn abi_version() -> u32 {
    1
}
