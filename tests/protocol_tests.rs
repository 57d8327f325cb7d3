use cube_tetris::adapter::protocol::{
    create_command, create_hello, parse_message, parse_server_message, ParsedMessage,
    ServerMessage, PROTOCOL_VERSION,
};
use cube_tetris::adapter::server::{build_observation, state_hash};
use cube_tetris::core::{GameSnapshot, Session};
use cube_tetris::types::{FaceDirection, Intent};

#[test]
fn hello_and_command_survive_the_wire() {
    let hello = create_hello(1, "bot", PROTOCOL_VERSION, "red");
    let line = serde_json::to_string(&hello).unwrap();
    match parse_message(&line).unwrap() {
        ParsedMessage::Hello(parsed) => {
            assert_eq!(parsed.room, "red");
            assert_eq!(parsed.client.name, "bot");
        }
        other => panic!("expected hello, got {:?}", other),
    }

    let intents = [
        Intent::Start,
        Intent::MoveLeft,
        Intent::MoveRight,
        Intent::SoftDrop,
        Intent::HardDrop,
        Intent::Rotate,
        Intent::ChangeFace(FaceDirection::Next),
        Intent::ChangeFace(FaceDirection::Previous),
    ];
    let line = serde_json::to_string(&create_command(2, &intents)).unwrap();
    match parse_message(&line).unwrap() {
        ParsedMessage::Command(parsed) => assert_eq!(parsed.intents.0.as_slice(), &intents[..]),
        other => panic!("expected command, got {:?}", other),
    }
}

#[test]
fn malformed_lines_are_errors_not_panics() {
    assert!(parse_message("not json").is_err());
    assert!(parse_message(r#"{"type":"command","seq":1}"#).is_err());
    assert!(parse_message(r#"{"type":"hello","seq":1,"ts":0}"#).is_err());
}

#[test]
fn observation_carries_every_face_and_the_state_hash() {
    let mut session = Session::new(1);
    session.apply_intent(Intent::Start);
    session.apply_intent(Intent::HardDrop);

    let mut snap = GameSnapshot::default();
    session.snapshot_into(&mut snap);
    let event = session.take_last_event().map(Into::into);
    let obs = build_observation("red", 4, &snap, 12, event);

    let json = serde_json::to_string(&obs).unwrap();
    let v: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(v["type"], "observation");
    assert_eq!(v["player_id"], 4);
    assert_eq!(v["faces"].as_array().unwrap().len(), 4);
    assert_eq!(v["faces"][0]["width"], 10);
    assert_eq!(v["faces"][0]["height"], 20);
    assert_eq!(v["last_event"]["lines_cleared"], 0);
    assert_eq!(v["my_faces"], serde_json::json!([0, 1, 2, 3]));
    assert_eq!(v["state_hash"].as_str().unwrap().len(), 16);
    assert!(v["timers"].get("lock_ms").is_some());

    match parse_server_message(&json).unwrap() {
        ServerMessage::Observation(parsed) => {
            assert_eq!(parsed.state_hash, state_hash(&snap));
            assert_eq!(parsed.faces[0].cells, snap.faces[0]);
        }
        other => panic!("expected observation, got {:?}", other),
    }
}
