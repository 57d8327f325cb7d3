//! Adapter - multiplayer rooms over a TCP socket with a JSON protocol
//!
//! Players connect, join a room by name and share the four faces of the cube
//! between them. Every player keeps its own session on the room's shared
//! cube; the room decides which faces each one may play, hands every commit
//! to the other sessions and relays every session's state to all members.
//!
//! # Protocol Overview
//!
//! The adapter implements a **line-delimited JSON protocol** over TCP:
//!
//! 1. **Connection**: Client connects to TCP socket (default: 127.0.0.1:7878)
//! 2. **Handshake**: Client sends `hello` naming a room, server responds with `welcome`
//! 3. **Face assignment**: With `n` players (at most four), player `i` owns faces `f % n == i`
//! 4. **Commanding**: Clients send intents; the server acks with how many applied
//! 5. **Observation Streaming**: Sessions are published to the room whenever they change
//!
//! # Message Types
//!
//! ## Client → Server
//!
//! - **hello**: Handshake with client info and the room to join
//! - **command**: Ordered list of intents (`start`, `moveLeft`, `changeFaceNext`, ...)
//! - **leave**: Leave the room but keep the connection
//!
//! ## Server → Client
//!
//! - **welcome**: Client id, room, owned faces
//! - **assignment**: Owned faces changed because someone joined or left
//! - **observation**: One player's full session (four faces, piece, score, ...)
//! - **ack**: Command acknowledgment
//! - **error**: Error response with code and message
//!
//! # Environment Variables
//!
//! - `CUBE_TETRIS_HOST`: Bind address (default: "127.0.0.1")
//! - `CUBE_TETRIS_PORT`: Port number (default: 7878)
//! - `CUBE_TETRIS_MAX_PENDING`: Bounded command queue size (default: 64)
//! - `CUBE_TETRIS_LOG_PATH`: Append every wire line to this JSONL file
//! - `CUBE_TETRIS_RANDOMIZER`: `uniform` (default) or `bag`
//! - `CUBE_TETRIS_SEED`: Base seed for new sessions (default: 1)
//!
//! # Example Protocol Flow
//!
//! ```text
//! Client -> Server: {"type":"hello","seq":1,"ts":0,"client":{"name":"ann","version":"0.1.0"},"protocol_version":"1.0.0","room":"red"}
//! Server -> Client: {"type":"welcome","seq":1,"ts":0,"protocol_version":"1.0.0","client_id":1,"room":"red","faces":[0,1,2,3],"members":1,"game_id":"cube-tetris"}
//! Client -> Server: {"type":"command","seq":2,"ts":0,"intents":["start","changeFaceNext","hardDrop"]}
//! Server -> Client: {"type":"ack","seq":2,"ts":0,"status":"ok","applied":3}
//! Server -> Client: {"type":"observation","seq":1,"ts":0,"room":"red","player_id":1,...}
//! ```
//!
//! # Implementation
//!
//! - [`server`]: tokio TCP server; handshake, sequencing, backpressure
//! - [`runtime`]: [`Adapter`] bridges the async server to a sync game loop
//! - [`relay`]: [`Relay`] applies commands and publishes observations
//! - [`lobby`]: Room registry and face partitioning
//! - [`protocol`]: Message structure definitions

pub mod lobby;
pub mod protocol;
pub mod relay;
pub mod runtime;
pub mod server;

pub use cube_tetris_core as core;
pub use cube_tetris_types as types;

// Re-export protocol types for convenience
pub use lobby::{partition_faces, FaceSet, JoinOutcome, LeaveOutcome, Lobby, Member, Room};
pub use protocol::*;
pub use relay::Relay;
pub use runtime::{Adapter, InboundCommand, InboundPayload, OutboundMessage};
pub use server::*;
