use super::{CommandDefaults, CommandIntent, Direction, Envelope, ProtocolError, TelemetryMessage};
use proptest::prelude::*;
use serde_json::{Value, json};

#[test]
fn test_parse_accepts_sensor_and_action_tag_keys() {
    let sensor = Envelope::parse(br#"{"sensor": "lidar", "data": "1.2,3.4", "timestamp": 12.5}"#)
        .unwrap();
    assert_eq!(sensor.tag(), "lidar");
    assert_eq!(sensor.data(), &json!("1.2,3.4"));
    assert!((sensor.timestamp() - 12.5).abs() < f64::EPSILON);

    let action = Envelope::parse(br#"{"action": "hover", "data": {}, "timestamp": 3}"#).unwrap();
    assert_eq!(action.tag(), "hover");
    assert!((action.timestamp() - 3.0).abs() < f64::EPSILON);
}

#[test]
fn test_parse_ignores_unknown_fields() {
    let env = Envelope::parse(
        br#"{"tag": "telemetry", "data": {"lidar": "", "gpr": "", "extra": 1}, "timestamp": 1.0, "seq": 7}"#,
    )
    .unwrap();
    let reparsed = Envelope::parse(&env.serialize()).unwrap();
    assert_eq!(env, reparsed);
    let as_value: Value = serde_json::from_slice(&env.serialize()).unwrap();
    assert!(as_value.get("seq").is_none());
}

#[test]
fn test_parse_rejects_malformed_envelopes() {
    let cases: [(&[u8], fn(&ProtocolError) -> bool); 8] = [
        (b"", |e| matches!(e, ProtocolError::Syntax(_))),
        (b"{not json", |e| matches!(e, ProtocolError::Syntax(_))),
        (b"[1, 2, 3]", |e| matches!(e, ProtocolError::NotAnObject)),
        (br#"{"data": 1, "timestamp": 1}"#, |e| *e == ProtocolError::MissingField("tag")),
        (br#"{"tag": "", "data": 1, "timestamp": 1}"#, |e| *e == ProtocolError::InvalidField("tag")),
        (br#"{"tag": 4, "data": 1, "timestamp": 1}"#, |e| *e == ProtocolError::InvalidField("tag")),
        (br#"{"tag": "land", "timestamp": 1}"#, |e| *e == ProtocolError::MissingField("data")),
        (br#"{"tag": "land", "data": {}, "timestamp": "now"}"#, |e| {
            *e == ProtocolError::InvalidField("timestamp")
        }),
    ];
    for (bytes, check) in cases {
        let err = Envelope::parse(bytes).unwrap_err();
        assert!(check(&err), "unexpected error {err:?} for {:?}", String::from_utf8_lossy(bytes));
    }
}

#[test]
fn test_telemetry_envelope() {
    let msg = TelemetryMessage::new("0.1,0.2,0.9".into(), String::new(), 1000.0);
    let parsed = TelemetryMessage::parse(&msg.to_envelope().serialize()).unwrap();
    assert_eq!(parsed, msg);
    assert_eq!(parsed.missing_sensors(), vec!["gpr"]);

    let wrong_tag = CommandIntent::Hover.to_envelope(1.0);
    assert_eq!(
        TelemetryMessage::from_envelope(&wrong_tag).unwrap_err(),
        ProtocolError::UnknownTag("hover".to_string())
    );
    let bad_data = Envelope::new(TelemetryMessage::TAG, json!({"lidar": 4}), 1.0);
    assert_eq!(
        TelemetryMessage::from_envelope(&bad_data).unwrap_err(),
        ProtocolError::InvalidField("data")
    );
}

#[test]
fn test_command_envelopes() {
    let defaults = CommandDefaults::default();
    let commands = [
        CommandIntent::Takeoff { altitude: 12.5 },
        CommandIntent::Land,
        CommandIntent::Move { direction: Direction::Left, speed: 3.0 },
        CommandIntent::Hover,
    ];
    for cmd in commands {
        let bytes = cmd.to_envelope(50.0).serialize();
        assert_eq!(CommandIntent::parse(&bytes, &defaults).unwrap(), cmd);
    }
}

#[test]
fn test_command_defaults_fill_missing_parameters() {
    let defaults = CommandDefaults { altitude: 30.0, speed: 4.0, direction: Direction::Right };
    let takeoff = CommandIntent::parse(br#"{"action": "takeoff", "data": {}, "timestamp": 0}"#, &defaults);
    assert_eq!(takeoff.unwrap(), CommandIntent::Takeoff { altitude: 30.0 });
    let mv = CommandIntent::parse(
        br#"{"action": "move", "data": {"direction": "BACKWARD"}, "timestamp": 0}"#,
        &defaults,
    );
    assert_eq!(mv.unwrap(), CommandIntent::Move { direction: Direction::Backward, speed: 4.0 });
    let mv = CommandIntent::parse(br#"{"tag": "move", "data": null, "timestamp": 0}"#, &defaults);
    assert_eq!(mv.unwrap(), CommandIntent::Move { direction: Direction::Right, speed: 4.0 });
}

#[test]
fn test_command_rejects_bad_parameters() {
    let defaults = CommandDefaults::default();
    let unknown = CommandIntent::parse(br#"{"tag": "barrel-roll", "data": {}, "timestamp": 0}"#, &defaults);
    assert_eq!(unknown.unwrap_err(), ProtocolError::UnknownTag("barrel-roll".to_string()));
    let bad_dir = CommandIntent::parse(
        br#"{"tag": "move", "data": {"direction": "up"}, "timestamp": 0}"#,
        &defaults,
    );
    assert_eq!(bad_dir.unwrap_err(), ProtocolError::InvalidField("direction"));
    let bad_speed = CommandIntent::parse(
        br#"{"tag": "move", "data": {"speed": -2}, "timestamp": 0}"#,
        &defaults,
    );
    assert_eq!(bad_speed.unwrap_err(), ProtocolError::InvalidField("speed"));
    let bad_alt = CommandIntent::parse(
        br#"{"tag": "takeoff", "data": {"altitude": "high"}, "timestamp": 0}"#,
        &defaults,
    );
    assert_eq!(bad_alt.unwrap_err(), ProtocolError::InvalidField("altitude"));
    let bad_data = CommandIntent::parse(br#"{"tag": "takeoff", "data": 5, "timestamp": 0}"#, &defaults);
    assert_eq!(bad_data.unwrap_err(), ProtocolError::InvalidField("data"));
}

fn arb_json_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        (-1.0e6f64..1.0e6).prop_map(|x| json!(x)),
        "[a-z0-9,. ]{0,16}".prop_map(Value::String),
    ]
}

fn arb_json() -> impl Strategy<Value = Value> {
    arb_json_leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            proptest::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

proptest! {
    /// Arbitrary bytes either parse into a valid envelope or fail with a ProtocolError.
    #[test]
    fn parse_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        if let Ok(env) = Envelope::parse(&bytes) {
            prop_assert!(!env.tag().is_empty());
            prop_assert!(env.timestamp().is_finite());
        }
    }

    /// JSON documents without the required shape are rejected, never accepted.
    #[test]
    fn parse_rejects_non_envelope_json(value in arb_json()) {
        let is_envelope = value.as_object().is_some_and(|obj| {
            let tag_ok = ["tag", "sensor", "action"]
                .iter()
                .find_map(|k| obj.get(*k))
                .is_some_and(|t| t.as_str().is_some_and(|s| !s.is_empty()));
            tag_ok && obj.contains_key("data") && obj.get("timestamp").is_some_and(Value::is_number)
        });
        let parsed = Envelope::parse(value.to_string().as_bytes());
        prop_assert_eq!(parsed.is_ok(), is_envelope);
    }

    /// Well-formed envelopes survive serialize/parse field for field.
    #[test]
    fn envelope_round_trip(
        tag in "[a-z_]{1,12}",
        data in arb_json(),
        timestamp in -1.0e12f64..1.0e12,
    ) {
        let env = Envelope::new(tag, data, timestamp);
        let parsed = Envelope::parse(&env.serialize()).unwrap();
        prop_assert_eq!(&parsed, &env);
        prop_assert_eq!(parsed.serialize(), env.serialize());
    }
}
