use gravkey_core::{
    config::Config,
    error::GravityError,
    time::{to_frames, to_timestamp, FrameRef, Timestamp},
};
use serde_json::json;

const FPS: i64 = 40;

#[test]
fn frames_survive_timestamp_round_trip() {
    for f in (0..10_000).chain([143_999, 144_000, 1_000_003]) {
        assert_eq!(to_frames(to_timestamp(f, FPS).unwrap(), FPS), f, "frame {f}");
    }
}

#[test]
fn normalizing_is_idempotent() {
    let raw = [
        Timestamp::new(0, 0, 0),
        Timestamp::new(0, 59, 39),
        Timestamp::new(0, 0, 400),
        Timestamp::new(2, 75, 41),
        Timestamp::new(1, -1, 0),
    ];
    for ts in raw {
        let once = ts.normalize(FPS).unwrap();
        assert!(once.is_normalized(FPS), "{ts:?} -> {once:?}");
        assert_eq!(once.normalize(FPS).unwrap(), once);
        assert_eq!(once.to_frames(FPS), ts.to_frames(FPS));
        // Normalized timestamps map to themselves.
        assert_eq!(to_timestamp(to_frames(once, FPS), FPS).unwrap(), once);
    }
}

#[test]
fn unnormalized_input_is_accepted() {
    assert_eq!(Timestamp::new(0, 0, 400).to_frames(FPS), 400);
    assert_eq!(to_timestamp(400, FPS).unwrap(), Timestamp::new(0, 10, 0));
    assert_eq!(Timestamp::new(0, -1, 0).to_frames(FPS), -40);
}

#[test]
fn other_frame_rates() {
    assert_eq!(Timestamp::new(1, 1, 1).to_frames(60), 3661);
    assert_eq!(to_timestamp(3661, 60).unwrap(), Timestamp::new(1, 1, 1));
}

#[test]
fn zero_frame_rate_is_an_error_not_a_panic() {
    let cfg: Config = serde_json::from_str(r#"{ "frames_per_second": 0 }"#).unwrap();
    assert!(matches!(
        to_timestamp(10, cfg.frames_per_second),
        Err(GravityError::InvalidFrameRate(0))
    ));
    assert!(matches!(cfg.validate(), Err(GravityError::InvalidFrameRate(0))));
    assert!(Config::default().validate().is_ok());
}

#[test]
fn timestamps_must_be_three_element_arrays() {
    for bad in [json!(12), json!("0:1:0"), json!([0, 1]), json!([0, 1, 2, 3]), json!([0, "1", 0]), json!(null)] {
        let err = Timestamp::from_json(&bad).unwrap_err();
        assert!(matches!(err, GravityError::MalformedTimestamp(_)), "{bad}");
    }
    assert_eq!(
        Timestamp::from_json(&json!([1, 2, 3])).unwrap(),
        Timestamp::new(1, 2, 3)
    );
}

#[test]
fn frame_refs_serialize_in_their_own_form() {
    let frame = FrameRef::from(42i64);
    let ts = FrameRef::from(Timestamp::new(0, 1, 2));
    assert_eq!(serde_json::to_string(&frame).unwrap(), "42");
    assert_eq!(serde_json::to_string(&ts).unwrap(), "[0,1,2]");
    assert_eq!(ts.resolve(FPS), 42);
}
