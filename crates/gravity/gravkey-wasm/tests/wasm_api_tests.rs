#![cfg(target_arch = "wasm32")]
use gravkey_wasm::{abi_version, to_frames, to_timestamp, GravKey};
use js_sys::{Function, Reflect, JSON};
use serde_json::json;
use serde_wasm_bindgen as swb;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn js(v: serde_json::Value) -> JsValue {
    JSON::parse(&v.to_string()).unwrap()
}

fn xy(v: JsValue) -> (f64, f64) {
    let x = Reflect::get(&v, &JsValue::from_str("x")).unwrap().as_f64().unwrap();
    let y = Reflect::get(&v, &JsValue::from_str("y")).unwrap().as_f64().unwrap();
    (x, y)
}

fn no_lookup() -> Function {
    Function::new_with_args("frame, rider", "return null;")
}

#[wasm_bindgen_test]
fn abi_is_1() {
    assert_eq!(abi_version(), 1);
}

#[wasm_bindgen_test]
fn timestamp_helpers_use_default_fps() {
    assert_eq!(to_frames(js(json!([1, 2, 3])), None).unwrap(), 2483.0);
    let ts: Vec<i64> = swb::from_value(to_timestamp(2483, None).unwrap()).unwrap();
    assert_eq!(ts, vec![1, 2, 3]);
    assert!(to_frames(js(json!([1, 2])), None).is_err());
}

#[wasm_bindgen_test]
fn non_positive_frame_rates_are_rejected() {
    assert!(to_timestamp(10, Some(0)).is_err());
    assert!(to_frames(js(json!([0, 1, 0])), Some(-1)).is_err());
    assert!(GravKey::new(js(json!({ "frames_per_second": 0 }))).is_err());
    assert!(to_frames(js(json!([i64::MAX / 2, 0, 0])), None).is_err());
}

#[wasm_bindgen_test]
fn zero_riders_returns_soft_default() {
    let mut gk = GravKey::new(JsValue::NULL).unwrap();
    let g = xy(gk.gravity(5, 0, no_lookup()).unwrap());
    assert_eq!(g, (0.0, 0.175));
}

#[wasm_bindgen_test]
fn setup_and_gravity_at_follow_latest_keyframe() {
    let mut gk = GravKey::new(JsValue::UNDEFINED).unwrap();
    let stream = json!([[
        { "at": 0, "instruction": { "type": "constant", "x": 0.0, "y": 1.0 } },
        { "at": 10, "instruction": { "type": "constant", "x": 0.0, "y": 2.0 } },
        { "at": 20, "instruction": { "type": "constant", "x": 0.0, "y": 3.0 } }
    ]]);
    assert_eq!(gk.setup(js(stream)).unwrap(), 1);

    let g = xy(gk.gravity_at(0, 0, 15, JsValue::NULL).unwrap());
    assert_eq!(g, (0.0, 2.0));
    let g = xy(gk.gravity_at(0, 0, 25, JsValue::NULL).unwrap());
    assert_eq!(g, (0.0, 3.0));
}

#[wasm_bindgen_test]
fn custom_keyframe_fn_receives_context() {
    let mut gk = GravKey::new(JsValue::NULL).unwrap();
    gk.setup(js(json!([[]]))).unwrap();
    let f = Function::new_with_args("ctx", "return { x: ctx.frame, y: ctx.lastGravity.y };");
    gk.add_keyframe_fn(0, 4, JsValue::NULL, f, true).unwrap();

    let g = xy(gk.gravity_at(0, 3, 4, JsValue::NULL).unwrap());
    assert_eq!(g, (4.0, 0.175));

    assert!(gk.add_keyframe_fn(7, 0, JsValue::NULL, no_lookup(), true).is_err());
}

#[wasm_bindgen_test]
fn load_script_returns_riders_and_stats_count_calls() {
    let mut gk = GravKey::new(JsValue::NULL).unwrap();
    let script = json!({
        "riders": [{ "id": "a" }, { "id": "b" }],
        "effects": [{ "at": [0, 0, 10], "effect": { "kind": "set", "x": 0.0, "y": -1.0 } }]
    });
    let riders = gk.load_script(js(script)).unwrap();
    assert_eq!(js_sys::Array::from(&riders).length(), 2);
    assert_eq!(gk.rider_count(), 2);

    for _ in 0..34 {
        gk.gravity(12, 2, no_lookup()).unwrap();
    }
    let stats: serde_json::Value = swb::from_value(gk.stats().unwrap()).unwrap();
    assert_eq!(stats["calls"], json!(34));

    let debug: serde_json::Value = swb::from_value(gk.debug_states(12).unwrap()).unwrap();
    assert_eq!(debug.as_array().unwrap().len(), 2);
    assert_eq!(debug[0].as_array().unwrap().len(), 17);
}

#[wasm_bindgen_test]
fn commit_script_drives_host_actions() {
    let mut gk = GravKey::new(JsValue::NULL).unwrap();
    let actions = js_sys::Function::new_no_args(
        "const log = [];
         return {
           log,
           setRiders(r) { log.push('riders:' + r.length); },
           commitTrackChanges() { log.push('commit'); },
           invalidatePlaybackCache() { log.push('invalidate'); },
         };",
    )
    .call0(&JsValue::UNDEFINED)
    .unwrap();
    let script = json!({ "riders": [{ "id": "solo" }] });
    assert_eq!(gk.commit_script(js(script), actions.clone()).unwrap(), 1);

    let log: Vec<String> =
        swb::from_value(Reflect::get(&actions, &JsValue::from_str("log")).unwrap()).unwrap();
    assert_eq!(log, vec!["riders:1", "commit", "invalidate"]);
}
