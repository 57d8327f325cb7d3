//! Relay - the synchronous game loop side of the adapter
//!
//! Owns the [`Lobby`], applies inbound commands in arrival order and turns
//! session changes into outbound messages. Observations are published only
//! when a session's state hash changes, and go to every member of the room
//! so teammates see each other's faces.

use std::sync::Arc;

use crate::core::{GameSnapshot, Phase, Randomizer};
use crate::lobby::{FaceSet, Lobby};
use crate::protocol::{
    create_ack, create_assignment, create_error, create_welcome, ErrorCode, LastEvent,
    PROTOCOL_VERSION,
};
use crate::runtime::{InboundCommand, InboundPayload, OutboundMessage};
use crate::server::{build_observation, state_hash, ServerConfig};

pub struct Relay {
    lobby: Lobby,
    protocol_version: String,
    /// Server-side sequence for outbound messages not answering a client seq
    seq: u64,
    snapshot: GameSnapshot,
    recipients: Vec<usize>,
}

impl Relay {
    pub fn new(seed: u32, randomizer: Randomizer) -> Self {
        Self {
            lobby: Lobby::new(seed, randomizer),
            protocol_version: PROTOCOL_VERSION.to_string(),
            seq: 0,
            snapshot: GameSnapshot::default(),
            recipients: Vec::new(),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        let mut relay = Self::new(config.seed, config.randomizer);
        relay.protocol_version = config.protocol_version.clone();
        relay
    }

    pub fn lobby(&self) -> &Lobby {
        &self.lobby
    }

    pub fn lobby_mut(&mut self) -> &mut Lobby {
        &mut self.lobby
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    /// Apply one inbound command, emitting replies through `out`
    pub fn handle<F>(&mut self, cmd: InboundCommand, out: &mut F)
    where
        F: FnMut(OutboundMessage),
    {
        let client_id = cmd.client_id;
        match cmd.payload {
            InboundPayload::Join { room, name } => {
                let outcome = self.lobby.join(client_id, &name, &room);
                if outcome.created {
                    println!("[Lobby] Room {} created", outcome.room);
                }
                println!(
                    "[Lobby] Client {} ({}) joined {} with faces {:?}",
                    client_id,
                    name,
                    outcome.room,
                    outcome.faces.as_slice()
                );

                out(OutboundMessage::Welcome {
                    client_id,
                    msg: create_welcome(
                        cmd.seq,
                        &self.protocol_version,
                        client_id as u64,
                        &outcome.room,
                        &outcome.faces,
                        outcome.members,
                    ),
                });
                self.send_assignments(&outcome.room, outcome.members, &outcome.reassigned, out);
                self.send_room_state(client_id, &outcome.room, out);
            }

            InboundPayload::Command(intents) => match self.lobby.apply_intents(client_id, &intents) {
                Some(applied) => out(OutboundMessage::Ack {
                    client_id,
                    msg: create_ack(cmd.seq, applied),
                }),
                None => out(OutboundMessage::Error {
                    client_id,
                    msg: create_error(cmd.seq, ErrorCode::NotInRoom, "Send hello to join a room first"),
                }),
            },

            InboundPayload::Leave => {
                let msg = if self.leave(client_id, out) {
                    OutboundMessage::Ack {
                        client_id,
                        msg: create_ack(cmd.seq, 0),
                    }
                } else {
                    OutboundMessage::Error {
                        client_id,
                        msg: create_error(cmd.seq, ErrorCode::NotInRoom, "Not in a room"),
                    }
                };
                out(msg);
            }

            InboundPayload::Disconnect => {
                self.leave(client_id, out);
            }
        }
    }

    fn leave<F>(&mut self, client_id: usize, out: &mut F) -> bool
    where
        F: FnMut(OutboundMessage),
    {
        let Some(outcome) = self.lobby.leave(client_id) else {
            return false;
        };
        println!("[Lobby] Client {} left {}", client_id, outcome.room);
        if outcome.deleted {
            println!("[Lobby] Room {} deleted", outcome.room);
        }
        self.send_assignments(&outcome.room, outcome.members, &outcome.reassigned, out);
        true
    }

    fn send_assignments<F>(
        &mut self,
        room: &str,
        members: usize,
        reassigned: &[(usize, FaceSet)],
        out: &mut F,
    ) where
        F: FnMut(OutboundMessage),
    {
        for (client_id, faces) in reassigned {
            println!("[Lobby] Client {} now owns faces {:?} in {}", client_id, faces.as_slice(), room);
            let seq = self.next_seq();
            out(OutboundMessage::Assignment {
                client_id: *client_id,
                msg: create_assignment(seq, room, faces, members),
            });
        }
    }

    /// Send the current observation of every other member to a new joiner
    fn send_room_state<F>(&mut self, joiner: usize, room_id: &str, out: &mut F)
    where
        F: FnMut(OutboundMessage),
    {
        let Some(room) = self.lobby.room(room_id) else {
            return;
        };
        for member in room.members().iter().filter(|m| m.client_id() != joiner) {
            member.session().snapshot_into(&mut self.snapshot);
            self.seq += 1;
            let msg = build_observation(room_id, member.client_id() as u64, &self.snapshot, self.seq, None);
            out(OutboundMessage::Observation {
                client_id: joiner,
                msg: Arc::new(msg),
            });
        }
    }

    /// Advance every session and publish observations that changed
    pub fn tick<F>(&mut self, elapsed_ms: u32, out: &mut F)
    where
        F: FnMut(OutboundMessage),
    {
        self.lobby.tick(elapsed_ms);
        self.publish(out);
    }

    /// Publish an observation for every session whose state hash changed
    pub fn publish<F>(&mut self, out: &mut F)
    where
        F: FnMut(OutboundMessage),
    {
        for room in self.lobby.rooms_mut() {
            self.recipients.clear();
            self.recipients.extend(room.member_ids());
            let room_id = room.id().to_string();

            for member in room.members_mut() {
                let player_id = member.client_id();
                let session = member.session_mut();
                session.snapshot_into(&mut self.snapshot);
                let last_event = session.take_last_event().map(LastEvent::from);

                let hash = state_hash(&self.snapshot);
                if member.last_hash == Some(hash.0) && last_event.is_none() {
                    continue;
                }
                member.last_hash = Some(hash.0);

                if self.snapshot.phase == Phase::GameOver {
                    println!(
                        "[Lobby] Client {} game over in {} (score {}, lines {})",
                        player_id, room_id, self.snapshot.score, self.snapshot.lines
                    );
                }

                self.seq += 1;
                let msg = Arc::new(build_observation(
                    &room_id,
                    player_id as u64,
                    &self.snapshot,
                    self.seq,
                    last_event,
                ));
                for &client_id in &self.recipients {
                    out(OutboundMessage::Observation {
                        client_id,
                        msg: Arc::clone(&msg),
                    });
                }
            }
        }
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new(1, Randomizer::Uniform)
    }
}
