//! Protocol module - JSON message types for the room relay
//!
//! Line-delimited JSON. All messages have: type, seq (sequence number),
//! ts (timestamp in ms).

use serde::{Deserialize, Serialize};

use crate::types::{Intent, LockEvent, PieceKind, NUM_FACES};

use arrayvec::ArrayVec;

/// Protocol version spoken by this server
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Room joined when a hello does not name one
pub const DEFAULT_ROOM: &str = "lobby";

/// Most intents accepted in a single command
pub const MAX_INTENTS_PER_COMMAND: usize = 32;

// ============== Client -> Server Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum HelloType {
    #[serde(rename = "hello")]
    #[default]
    Hello,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CommandType {
    #[serde(rename = "command")]
    #[default]
    Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LeaveType {
    #[serde(rename = "leave")]
    #[default]
    Leave,
}

/// Client hello message (first message; joins a room)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: HelloType,
    pub seq: u64,
    pub ts: u64,
    pub client: ClientInfo,
    pub protocol_version: String,
    #[serde(default = "default_room")]
    pub room: String,
}

fn default_room() -> String {
    DEFAULT_ROOM.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

/// Command message: intents applied in order to the sender's session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: CommandType,
    pub seq: u64,
    pub ts: u64,
    pub intents: IntentList,
}

/// Leave message: drop out of the current room but keep the connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: LeaveType,
    pub seq: u64,
    pub ts: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IntentList(pub ArrayVec<Intent, MAX_INTENTS_PER_COMMAND>);

impl<'de> Deserialize<'de> for IntentList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;
        impl<'de> serde::de::Visitor<'de> for V {
            type Value = IntentList;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "an array of intent strings")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut out = ArrayVec::<Intent, MAX_INTENTS_PER_COMMAND>::new();
                while let Some(name) = seq.next_element::<&str>()? {
                    let intent = Intent::from_str(name).ok_or_else(|| {
                        serde::de::Error::custom(format!("unknown intent: {}", name))
                    })?;
                    out.try_push(intent)
                        .map_err(|_| serde::de::Error::custom("too many intents"))?;
                }
                Ok(IntentList(out))
            }
        }

        deserializer.deserialize_seq(V)
    }
}

impl Serialize for IntentList {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for intent in &self.0 {
            seq.serialize_element(intent.as_str())?;
        }
        seq.end()
    }
}

// ============== Server -> Client Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WelcomeType {
    #[serde(rename = "welcome")]
    Welcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignmentType {
    #[serde(rename = "assignment")]
    Assignment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckType {
    #[serde(rename = "ack")]
    Ack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckStatus {
    #[serde(rename = "ok")]
    Ok,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    #[serde(rename = "error")]
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "handshake_required")]
    HandshakeRequired,
    #[serde(rename = "protocol_mismatch")]
    ProtocolMismatch,
    #[serde(rename = "invalid_command")]
    InvalidCommand,
    #[serde(rename = "not_in_room")]
    NotInRoom,
    #[serde(rename = "backpressure")]
    Backpressure,
}

/// Welcome message (response to hello)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeMessage {
    #[serde(rename = "type")]
    pub msg_type: WelcomeType,
    pub seq: u64,
    pub ts: u64,
    pub protocol_version: String,
    pub client_id: u64,
    pub room: String,
    /// Faces this client controls (empty for observers)
    pub faces: Vec<usize>,
    pub members: usize,
    pub game_id: String,
}

/// Sent when a membership change re-partitions the faces of a room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentMessage {
    #[serde(rename = "type")]
    pub msg_type: AssignmentType,
    pub seq: u64,
    pub ts: u64,
    pub room: String,
    pub faces: Vec<usize>,
    pub members: usize,
}

/// Acknowledgment for command receipt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckMessage {
    #[serde(rename = "type")]
    pub msg_type: AckType,
    pub seq: u64,
    pub ts: u64,
    pub status: AckStatus,
    /// Intents that changed the session
    #[serde(default)]
    pub applied: usize,
}

/// Error message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    #[serde(rename = "type")]
    pub msg_type: ErrorType,
    pub seq: u64,
    pub ts: u64,
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObservationType {
    #[serde(rename = "observation")]
    Observation,
}

/// One player's session state, relayed to every member of the room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationMessage {
    #[serde(rename = "type")]
    pub msg_type: ObservationType,
    pub seq: u64,
    pub ts: u64,
    pub room: String,
    /// Client id of the player whose session this is
    pub player_id: u64,
    pub playable: bool,
    pub phase: String,
    pub game_over: bool,
    pub locking: bool,
    pub episode_id: u32,
    pub seed: u32,
    pub piece_id: u32,
    pub faces: Vec<FaceSnapshot>,
    pub active_face: usize,
    pub my_faces: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<PieceSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ghost_y: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PieceKindLower>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_event: Option<LastEvent>,
    pub state_hash: StateHash,
    pub score: u32,
    pub level: u32,
    pub lines: u32,
    pub timers: TimersSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceSnapshot {
    pub face: usize,
    pub revision: u32,
    pub width: u8,
    pub height: u8,
    pub cells: [[u8; 10]; 20], // 0 = empty, 1-7 = piece kind
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PieceSnapshot {
    pub kind: PieceKindLower,
    pub x: i32,
    pub y: i32,
    /// Shape rows, '#' for filled cells and '.' for empty ones
    pub shape: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKindLower {
    #[serde(rename = "i")]
    I,
    #[serde(rename = "o")]
    O,
    #[serde(rename = "t")]
    T,
    #[serde(rename = "s")]
    S,
    #[serde(rename = "z")]
    Z,
    #[serde(rename = "j")]
    J,
    #[serde(rename = "l")]
    L,
}

impl From<PieceKind> for PieceKindLower {
    fn from(value: PieceKind) -> Self {
        match value {
            PieceKind::I => Self::I,
            PieceKind::O => Self::O,
            PieceKind::T => Self::T,
            PieceKind::S => Self::S,
            PieceKind::Z => Self::Z,
            PieceKind::J => Self::J,
            PieceKind::L => Self::L,
        }
    }
}

impl From<PieceKindLower> for PieceKind {
    fn from(value: PieceKindLower) -> Self {
        match value {
            PieceKindLower::I => Self::I,
            PieceKindLower::O => Self::O,
            PieceKindLower::T => Self::T,
            PieceKindLower::S => Self::S,
            PieceKindLower::Z => Self::Z,
            PieceKindLower::J => Self::J,
            PieceKindLower::L => Self::L,
        }
    }
}

/// Deterministic state hash serialized as lowercase hex (without heap allocation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateHash(pub u64);

impl Serialize for StateHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut buf = [0u8; 16];
        let mut v = self.0;
        for i in 0..16 {
            let nib = (v & 0x0f) as usize;
            buf[15 - i] = HEX[nib];
            v >>= 4;
        }
        // Every byte comes from HEX, so this never fails.
        let s = std::str::from_utf8(&buf).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(s)
    }
}

impl<'de> Deserialize<'de> for StateHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <&str>::deserialize(deserializer)?;
        let s = s.trim();
        if s.len() > 16 {
            return Err(serde::de::Error::custom("hash longer than 16 hex digits"));
        }
        let mut v: u64 = 0;
        for b in s.as_bytes() {
            let d = match b {
                b'0'..=b'9' => (b - b'0') as u64,
                b'a'..=b'f' => (b - b'a' + 10) as u64,
                b'A'..=b'F' => (b - b'A' + 10) as u64,
                _ => return Err(serde::de::Error::custom("invalid hex")),
            };
            v = (v << 4) | d;
        }
        Ok(StateHash(v))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastEvent {
    pub lines_cleared: u32,
    pub score_delta: u32,
    pub faces_written: [bool; NUM_FACES],
}

impl From<LockEvent> for LastEvent {
    fn from(value: LockEvent) -> Self {
        Self {
            lines_cleared: value.lines_cleared,
            score_delta: value.score_delta,
            faces_written: value.faces_written,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimersSnapshot {
    pub drop_ms: u32,
    pub lock_ms: u32,
    pub game_over_ms: u32,
}

// ============== Message Parsing ==============

/// Parse a JSON message from a string
pub fn parse_message(json: &str) -> Result<ParsedMessage, serde_json::Error> {
    #[derive(Debug, Deserialize)]
    #[serde(tag = "type")]
    enum InboundMessage {
        #[serde(rename = "hello")]
        Hello(HelloMessage),
        #[serde(rename = "command")]
        Command(CommandMessage),
        #[serde(rename = "leave")]
        Leave(LeaveMessage),
    }

    match serde_json::from_str::<InboundMessage>(json) {
        Ok(InboundMessage::Hello(m)) => Ok(ParsedMessage::Hello(m)),
        Ok(InboundMessage::Command(m)) => Ok(ParsedMessage::Command(m)),
        Ok(InboundMessage::Leave(m)) => Ok(ParsedMessage::Leave(m)),
        Err(e) => {
            // Unknown message type is not a hard parse error for the protocol.
            #[derive(Debug, Deserialize)]
            struct TypeOnly<'a> {
                #[serde(rename = "type")]
                #[serde(borrow)]
                msg_type: Option<&'a str>,
            }
            let msg_type = serde_json::from_str::<TypeOnly>(json)?
                .msg_type
                .unwrap_or("unknown");
            if !matches!(msg_type, "hello" | "command" | "leave") {
                #[derive(Debug, Deserialize)]
                struct SeqOnly {
                    seq: Option<u64>,
                }
                let seq = serde_json::from_str::<SeqOnly>(json)?.seq.unwrap_or(0);
                return Ok(ParsedMessage::Unknown(UnknownMessage { seq }));
            }
            Err(e)
        }
    }
}

/// Parsed incoming message
#[derive(Debug, Clone)]
pub enum ParsedMessage {
    Hello(HelloMessage),
    Command(CommandMessage),
    Leave(LeaveMessage),
    Unknown(UnknownMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownMessage {
    pub seq: u64,
}

/// Inbound message parsed from a server line (used by clients)
#[derive(Debug, Clone)]
pub enum ServerMessage {
    Welcome(WelcomeMessage),
    Assignment(AssignmentMessage),
    Ack(AckMessage),
    Error(ErrorMessage),
    Observation(Box<ObservationMessage>),
}

/// Parse a line sent by the server
pub fn parse_server_message(json: &str) -> Result<ServerMessage, serde_json::Error> {
    #[derive(Debug, Deserialize)]
    struct TypeOnly<'a> {
        #[serde(rename = "type")]
        #[serde(borrow)]
        msg_type: &'a str,
    }

    match serde_json::from_str::<TypeOnly>(json)?.msg_type {
        "welcome" => Ok(ServerMessage::Welcome(serde_json::from_str(json)?)),
        "assignment" => Ok(ServerMessage::Assignment(serde_json::from_str(json)?)),
        "ack" => Ok(ServerMessage::Ack(serde_json::from_str(json)?)),
        "observation" => Ok(ServerMessage::Observation(Box::new(serde_json::from_str(
            json,
        )?))),
        _ => Ok(ServerMessage::Error(serde_json::from_str(json)?)),
    }
}

// ============== Utility Functions ==============

/// Create a hello message
pub fn create_hello(seq: u64, client_name: &str, protocol_version: &str, room: &str) -> HelloMessage {
    HelloMessage {
        msg_type: HelloType::Hello,
        seq,
        ts: current_timestamp_ms(),
        client: ClientInfo {
            name: client_name.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        protocol_version: protocol_version.to_string(),
        room: room.to_string(),
    }
}

/// Create a command message
pub fn create_command(seq: u64, intents: &[Intent]) -> CommandMessage {
    let mut list = ArrayVec::new();
    for &intent in intents.iter().take(MAX_INTENTS_PER_COMMAND) {
        list.push(intent);
    }
    CommandMessage {
        msg_type: CommandType::Command,
        seq,
        ts: current_timestamp_ms(),
        intents: IntentList(list),
    }
}

/// Create a leave message
pub fn create_leave(seq: u64) -> LeaveMessage {
    LeaveMessage {
        msg_type: LeaveType::Leave,
        seq,
        ts: current_timestamp_ms(),
    }
}

/// Create a welcome message
pub fn create_welcome(
    seq: u64,
    protocol_version: &str,
    client_id: u64,
    room: &str,
    faces: &[usize],
    members: usize,
) -> WelcomeMessage {
    WelcomeMessage {
        msg_type: WelcomeType::Welcome,
        seq,
        ts: current_timestamp_ms(),
        protocol_version: protocol_version.to_string(),
        client_id,
        room: room.to_string(),
        faces: faces.to_vec(),
        members,
        game_id: "cube-tetris".to_string(),
    }
}

/// Create a face assignment notice
pub fn create_assignment(seq: u64, room: &str, faces: &[usize], members: usize) -> AssignmentMessage {
    AssignmentMessage {
        msg_type: AssignmentType::Assignment,
        seq,
        ts: current_timestamp_ms(),
        room: room.to_string(),
        faces: faces.to_vec(),
        members,
    }
}

/// Create an acknowledgment
pub fn create_ack(seq: u64, applied: usize) -> AckMessage {
    AckMessage {
        msg_type: AckType::Ack,
        seq,
        ts: current_timestamp_ms(),
        status: AckStatus::Ok,
        applied,
    }
}

/// Create an error message
pub fn create_error(seq: u64, code: ErrorCode, message: &str) -> ErrorMessage {
    ErrorMessage {
        msg_type: ErrorType::Error,
        seq,
        ts: current_timestamp_ms(),
        code,
        message: message.to_string(),
    }
}

/// Get current timestamp in milliseconds
pub(crate) fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FaceDirection;

    #[test]
    fn test_parse_hello() {
        let json = r#"{"type":"hello","seq":1,"ts":1234567890,"client":{"name":"test-bot","version":"1.0.0"},"protocol_version":"1.0.0","room":"blue"}"#;
        let result = parse_message(json).unwrap();

        match result {
            ParsedMessage::Hello(msg) => {
                assert_eq!(msg.msg_type, HelloType::Hello);
                assert_eq!(msg.seq, 1);
                assert_eq!(msg.client.name, "test-bot");
                assert_eq!(msg.protocol_version, "1.0.0");
                assert_eq!(msg.room, "blue");
            }
            _ => panic!("Expected Hello message"),
        }
    }

    #[test]
    fn test_parse_hello_defaults_room() {
        let json = r#"{"type":"hello","seq":1,"ts":0,"client":{"name":"x","version":"0"},"protocol_version":"1.0.0"}"#;
        match parse_message(json).unwrap() {
            ParsedMessage::Hello(msg) => assert_eq!(msg.room, DEFAULT_ROOM),
            _ => panic!("Expected Hello message"),
        }
    }

    #[test]
    fn test_parse_command_intents() {
        let json = r#"{"type":"command","seq":2,"ts":1234567900,"intents":["moveLeft","ROTATE","changeFaceNext","hardDrop"]}"#;
        let result = parse_message(json).unwrap();

        match result {
            ParsedMessage::Command(msg) => {
                let intents = msg.intents.0;
                assert_eq!(intents.len(), 4);
                assert_eq!(intents[0], Intent::MoveLeft);
                assert_eq!(intents[1], Intent::Rotate);
                assert_eq!(intents[2], Intent::ChangeFace(FaceDirection::Next));
                assert_eq!(intents[3], Intent::HardDrop);
            }
            _ => panic!("Expected Command message"),
        }
    }

    #[test]
    fn test_unknown_intent_is_parse_error() {
        let json = r#"{"type":"command","seq":2,"ts":0,"intents":["hold"]}"#;
        assert!(parse_message(json).is_err());
    }

    #[test]
    fn test_too_many_intents_is_parse_error() {
        let names = vec!["\"softDrop\""; MAX_INTENTS_PER_COMMAND + 1].join(",");
        let json = format!(r#"{{"type":"command","seq":2,"ts":0,"intents":[{}]}}"#, names);
        assert!(parse_message(&json).is_err());
    }

    #[test]
    fn test_parse_leave() {
        let json = r#"{"type":"leave","seq":9,"ts":0}"#;
        match parse_message(json).unwrap() {
            ParsedMessage::Leave(msg) => assert_eq!(msg.seq, 9),
            _ => panic!("Expected Leave message"),
        }
    }

    #[test]
    fn test_unknown_type_keeps_seq() {
        let json = r#"{"type":"control","seq":4,"ts":0}"#;
        match parse_message(json).unwrap() {
            ParsedMessage::Unknown(msg) => assert_eq!(msg.seq, 4),
            _ => panic!("Expected Unknown message"),
        }
    }

    #[test]
    fn test_create_welcome() {
        let welcome = create_welcome(1, PROTOCOL_VERSION, 7, "blue", &[0, 2], 2);
        assert_eq!(welcome.msg_type, WelcomeType::Welcome);
        assert_eq!(welcome.seq, 1);
        assert_eq!(welcome.client_id, 7);
        assert_eq!(welcome.room, "blue");
        assert_eq!(welcome.faces, vec![0, 2]);
        assert_eq!(welcome.game_id, "cube-tetris");
    }

    #[test]
    fn test_error_code_wire_names() {
        let error = create_error(5, ErrorCode::NotInRoom, "join a room first");
        let v: serde_json::Value = serde_json::to_value(&error).unwrap();
        assert_eq!(v["type"], "error");
        assert_eq!(v["code"], "not_in_room");
    }

    #[test]
    fn test_command_serializes_intent_names() {
        let cmd = create_command(3, &[Intent::ChangeFace(FaceDirection::Previous), Intent::Start]);
        let line = serde_json::to_string(&cmd).unwrap();
        assert!(line.contains(r#""intents":["changeFacePrev","start"]"#));
        match parse_message(&line).unwrap() {
            ParsedMessage::Command(parsed) => assert_eq!(parsed.intents, cmd.intents),
            _ => panic!("Expected Command message"),
        }
    }

    #[test]
    fn test_state_hash_hex() {
        let v = serde_json::to_value(StateHash(0xab)).unwrap();
        assert_eq!(v, "00000000000000ab");
        let parsed: StateHash = serde_json::from_str("\"00000000000000AB\"").unwrap();
        assert_eq!(parsed, StateHash(0xab));
    }

    #[test]
    fn test_parse_server_message_kinds() {
        let ack = serde_json::to_string(&create_ack(4, 2)).unwrap();
        assert!(matches!(parse_server_message(&ack), Ok(ServerMessage::Ack(a)) if a.applied == 2));

        let assignment = serde_json::to_string(&create_assignment(5, "r", &[1], 3)).unwrap();
        assert!(matches!(
            parse_server_message(&assignment),
            Ok(ServerMessage::Assignment(a)) if a.faces == vec![1]
        ));

        let err = serde_json::to_string(&create_error(6, ErrorCode::Backpressure, "full")).unwrap();
        assert!(matches!(
            parse_server_message(&err),
            Ok(ServerMessage::Error(e)) if e.code == ErrorCode::Backpressure
        ));
    }

    #[test]
    fn test_last_event_from_lock_event() {
        let ev = LockEvent {
            lines_cleared: 2,
            score_delta: 400,
            faces_written: [true, true, false, false],
        };
        let mapped = LastEvent::from(ev);
        assert_eq!(mapped.lines_cleared, 2);
        assert_eq!(mapped.score_delta, 400);
        assert_eq!(mapped.faces_written, [true, true, false, false]);
    }
}
