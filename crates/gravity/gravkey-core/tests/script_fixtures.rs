use gravkey_core::{
    config::Config,
    contact::{ContactPoint, PointSet},
    data::Vec2,
    engine::Engine,
    keyframe::KeyframeStream,
    script::{parse_script_json, Script},
    timeline::Choreography,
};
use gravkey_test_fixtures::{host::EulerHost, scripts, streams};

fn approx(a: Vec2, b: Vec2, eps: f64) {
    assert!(a.approx_eq(b, eps), "left={a:?} right={b:?} eps={eps}");
}

fn compile(name: &str) -> Choreography {
    let json = scripts::json(name).unwrap();
    parse_script_json(&json)
        .unwrap()
        .compile(&Config::default())
        .unwrap()
}

fn simulate(choreo: &Choreography, frames: usize) -> (EulerHost, Engine, Vec<Vec<Vec<Vec2>>>) {
    let mut engine = Engine::new(choreo.config().clone());
    engine.setup(choreo.keyframe_stream());
    let mut host = EulerHost::from_riders(choreo.riders());
    let accs = (0..frames).map(|_| host.step(&mut engine)).collect();
    (host, engine, accs)
}

#[test]
fn every_script_fixture_compiles() {
    for name in scripts::keys() {
        let script: Script = scripts::load(&name).unwrap();
        let choreo = script.compile(&Config::default()).unwrap();
        assert!(!choreo.is_empty(), "{name}");
    }
}

#[test]
fn pulse_wave_staggers_riders() {
    let choreo = compile("pulse-wave");
    assert_eq!(choreo.len(), 4);
    assert_eq!(choreo.group("wave").len(), 4);
    let (_, _, accs) = simulate(&choreo, 50);
    let at = |frame: usize, rider: usize| accs[frame - 1][rider][ContactPoint::PEG.index()];

    let up = Vec2::new(0.0, -0.6);
    let soft = Vec2::new(0.0, 0.175);
    assert_eq!(at(10, 0), up);
    assert_eq!(at(14, 0), up);
    assert_eq!(at(15, 0), soft);
    assert_eq!(at(10, 1), soft);
    assert_eq!(at(15, 1), up);
    assert_eq!(at(25, 3), up);
    // Odd riders switch at one second.
    assert_eq!(at(45, 1), Vec2::new(0.05, 0.175));
    assert_eq!(at(45, 3), Vec2::new(0.05, 0.175));
    assert_eq!(at(45, 2), soft);
}

#[test]
fn kramual_line_then_regroup() {
    let choreo = compile("kramual-line");
    let (host, engine, _) = simulate(&choreo, 40);

    for rider in 0..2 {
        let tail = host.point(20, rider, ContactPoint::TAIL).unwrap().pos;
        let string = host.point(20, rider, ContactPoint::STRING).unwrap().pos;
        approx(string - tail, Vec2::new(21.18, 0.0), 1e-9);
    }
    // Lead lands at 30, tail three frames later; both come to rest.
    approx(host.point(30, 0, ContactPoint::PEG).unwrap().pos, Vec2::new(500.0, -200.0), 1e-9);
    approx(host.point(33, 1, ContactPoint::PEG).unwrap().pos, Vec2::new(500.0, -200.0), 1e-9);
    assert_eq!(host.point(31, 0, ContactPoint::NOSE).unwrap().vel, Vec2::ZERO);
    assert_eq!(host.point(34, 1, ContactPoint::NOSE).unwrap().vel, Vec2::ZERO);
    assert_eq!(engine.stats().fallbacks, 0);
}

#[test]
fn legacy_dock_stays_finite() {
    let choreo = compile("legacy-dock");
    let (host, engine, accs) = simulate(&choreo, 40);
    assert!(accs.iter().flatten().flatten().all(|a| a.is_finite()));
    approx(host.point(15, 0, ContactPoint::PEG).unwrap().pos, Vec2::new(100.0, 100.0), 1e-9);
    assert_eq!(host.point(16, 0, ContactPoint::PEG).unwrap().vel, Vec2::ZERO);
    // Scarf pop: -1 up for three frames from 25, rider default afterwards.
    let scarf = |frame: usize| accs[frame - 1][0][ContactPoint::SCARF_2.index()];
    assert_eq!(scarf(25), Vec2::new(0.0, -1.0));
    assert_eq!(scarf(27), Vec2::new(0.0, -1.0));
    assert_eq!(scarf(28), Vec2::new(0.0, 0.15));
    assert_eq!(engine.stats().fallbacks, 0);
    assert!(engine.stats().computed_evaluations > 0);
}

#[test]
fn hand_teleport_stream() {
    let stream: KeyframeStream = streams::load("teleport-hands").unwrap();
    let mut engine = Engine::default();
    engine.setup(stream);
    let mut host = EulerHost::at_rest(1);
    let start_hand = host.point(0, 0, ContactPoint::RHAND).unwrap().pos;
    let start_peg = host.point(0, 0, ContactPoint::PEG).unwrap().pos;
    host.run(&mut engine, 12);

    approx(host.latest(0, ContactPoint::RHAND).unwrap().pos, start_hand + Vec2::new(0.0, -30.0), 1e-9);
    approx(host.latest(0, ContactPoint::LHAND).unwrap().pos, start_hand + Vec2::new(0.0, -30.0), 1e-9);
    assert_eq!(host.latest(0, ContactPoint::PEG).unwrap().pos, start_peg);
    // The unknown kind on PEG from frame 9 falls back each frame.
    assert_eq!(engine.stats().fallbacks, 4);
    let hands: PointSet = [ContactPoint::LHAND, ContactPoint::RHAND].into_iter().collect();
    assert_eq!(engine.keyframes(0).unwrap()[1].points, hands);
}
