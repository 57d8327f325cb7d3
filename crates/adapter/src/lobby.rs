//! Lobby module - room registry and face partitioning
//!
//! Rooms are keyed by id. A room is created by the first join and removed when
//! its last member leaves. Members are ordered by join time; with `n` members
//! (at most four players) member `i` owns every face `f` with `f % n == i`.
//! Members past the fourth own no faces and only watch.
//!
//! Every member runs its own [`Session`] (piece, phase, score) on the room's
//! single cube: whenever a member commits a piece, the room takes that
//! member's grids as the cube and every other member adopts them, so a row is
//! cleared once the players together fill it on all four faces. The lobby is
//! plain synchronous state, driven by the game loop.

use std::collections::HashMap;

use arrayvec::ArrayVec;

use crate::core::{CubeGrids, Phase, Randomizer, Session};
use crate::types::{Intent, NUM_FACES};

/// Faces owned by one member
pub type FaceSet = ArrayVec<usize, NUM_FACES>;

/// Faces owned by the member at `index` in a room of `members` players
pub fn partition_faces(index: usize, members: usize) -> FaceSet {
    let players = members.min(NUM_FACES);
    if players == 0 || index >= players {
        return FaceSet::new();
    }
    (0..NUM_FACES).filter(|f| f % players == index).collect()
}

#[derive(Debug, Clone)]
pub struct Member {
    client_id: usize,
    name: String,
    session: Session,
    /// Hash of the last published observation of this member's session
    pub(crate) last_hash: Option<u64>,
}

impl Member {
    pub fn client_id(&self) -> usize {
        self.client_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn faces(&self) -> &[usize] {
        self.session.my_faces()
    }

    pub fn is_observer(&self) -> bool {
        self.session.my_faces().is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Room {
    id: String,
    members: Vec<Member>,
    /// The cube shared by every member
    grids: CubeGrids,
}

impl Room {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            members: Vec::new(),
            grids: CubeGrids::new(),
        }
    }

    pub fn grids(&self) -> &CubeGrids {
        &self.grids
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn members_mut(&mut self) -> &mut [Member] {
        &mut self.members
    }

    pub fn member_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().map(|m| m.client_id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn index_of(&self, client_id: usize) -> Option<usize> {
        self.members.iter().position(|m| m.client_id == client_id)
    }

    /// Run `f` on one member's session and keep the shared cube in step.
    ///
    /// A start while a teammate is still playing joins the live cube; a start
    /// with nobody playing begins a fresh one. Any commit becomes the cube for
    /// the whole room.
    fn drive<R>(&mut self, index: usize, f: impl FnOnce(&mut Session) -> R) -> R {
        let teammate_playing = self
            .members
            .iter()
            .enumerate()
            .any(|(i, m)| i != index && m.session.phase().accepts_input());

        let session = &mut self.members[index].session;
        let phase = session.phase();
        let piece_id = session.piece_id();
        let result = f(session);

        let started = matches!(phase, Phase::NotStarted | Phase::GameOver) && session.phase() != phase;
        if started && teammate_playing {
            session.sync_grids(&self.grids);
        } else if session.piece_id() != piece_id {
            self.grids.clone_from(session.grids());
            self.share_grids(index);
        }
        result
    }

    /// Push the cube to every member except `from`
    fn share_grids(&mut self, from: usize) {
        for (i, member) in self.members.iter_mut().enumerate() {
            if i != from {
                member.session.sync_grids(&self.grids);
            }
        }
    }

    /// Recompute every member's faces; returns members whose faces changed
    fn repartition(&mut self) -> Vec<(usize, FaceSet)> {
        let n = self.members.len();
        let mut changed = Vec::new();
        for (index, member) in self.members.iter_mut().enumerate() {
            let faces = partition_faces(index, n);
            if member.session.my_faces() != faces.as_slice() {
                member.session.set_face_assignment(&faces);
                changed.push((member.client_id, faces));
            }
        }
        changed
    }
}

/// Result of a join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub room: String,
    pub created: bool,
    /// Faces of the joining member
    pub faces: FaceSet,
    pub members: usize,
    /// Other members whose faces changed
    pub reassigned: Vec<(usize, FaceSet)>,
}

/// Result of a leave
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub room: String,
    pub deleted: bool,
    pub members: usize,
    pub reassigned: Vec<(usize, FaceSet)>,
}

/// Room registry
#[derive(Debug, Clone)]
pub struct Lobby {
    rooms: HashMap<String, Room>,
    /// client id -> room id
    membership: HashMap<usize, String>,
    seed: u32,
    randomizer: Randomizer,
}

impl Lobby {
    pub fn new(seed: u32, randomizer: Randomizer) -> Self {
        Self {
            rooms: HashMap::new(),
            membership: HashMap::new(),
            seed,
            randomizer,
        }
    }

    /// Add a client to `room_id`, creating the room if needed.
    ///
    /// A client already in another room leaves it first.
    pub fn join(&mut self, client_id: usize, name: &str, room_id: &str) -> JoinOutcome {
        if self.membership.contains_key(&client_id) {
            self.leave(client_id);
        }

        let created = !self.rooms.contains_key(room_id);
        let room = self
            .rooms
            .entry(room_id.to_string())
            .or_insert_with(|| Room::new(room_id));

        let seed = self.seed.wrapping_add(client_id as u32);
        let mut session = Session::with_randomizer(seed, self.randomizer);
        session.sync_grids(&room.grids);
        room.members.push(Member {
            client_id,
            name: name.to_string(),
            session,
            last_hash: None,
        });

        let mut reassigned = room.repartition();
        reassigned.retain(|(id, _)| *id != client_id);
        let faces = room
            .members
            .last()
            .map(|m| m.faces().iter().copied().collect())
            .unwrap_or_default();
        let members = room.len();

        self.membership.insert(client_id, room_id.to_string());

        JoinOutcome {
            room: room_id.to_string(),
            created,
            faces,
            members,
            reassigned,
        }
    }

    /// Remove a client from its room. Returns `None` if it was not in one.
    pub fn leave(&mut self, client_id: usize) -> Option<LeaveOutcome> {
        let room_id = self.membership.remove(&client_id)?;
        let room = self.rooms.get_mut(&room_id)?;
        room.members.retain(|m| m.client_id != client_id);

        if room.is_empty() {
            self.rooms.remove(&room_id);
            return Some(LeaveOutcome {
                room: room_id,
                deleted: true,
                members: 0,
                reassigned: Vec::new(),
            });
        }

        let reassigned = room.repartition();
        Some(LeaveOutcome {
            members: room.len(),
            room: room_id,
            deleted: false,
            reassigned,
        })
    }

    /// Apply intents in order to the client's session.
    ///
    /// Returns how many intents changed the session, or `None` if the client
    /// is not in a room.
    pub fn apply_intents(&mut self, client_id: usize, intents: &[Intent]) -> Option<usize> {
        let room_id = self.membership.get(&client_id)?;
        let room = self.rooms.get_mut(room_id)?;
        let index = room.index_of(client_id)?;
        Some(
            intents
                .iter()
                .filter(|&&intent| room.drive(index, |session| session.apply_intent(intent)))
                .count(),
        )
    }

    /// Advance every session by `elapsed_ms`
    pub fn tick(&mut self, elapsed_ms: u32) {
        for room in self.rooms.values_mut() {
            for index in 0..room.members.len() {
                room.drive(index, |session| session.tick(elapsed_ms));
            }
        }
    }

    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn room_mut(&mut self, room_id: &str) -> Option<&mut Room> {
        self.rooms.get_mut(room_id)
    }

    pub fn rooms_mut(&mut self) -> impl Iterator<Item = &mut Room> {
        self.rooms.values_mut()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room_of(&self, client_id: usize) -> Option<&str> {
        self.membership.get(&client_id).map(|s| s.as_str())
    }

    pub fn member(&self, client_id: usize) -> Option<&Member> {
        let room = self.rooms.get(self.room_of(client_id)?)?;
        room.members.iter().find(|m| m.client_id == client_id)
    }

    pub fn session(&self, client_id: usize) -> Option<&Session> {
        self.member(client_id).map(|m| &m.session)
    }

}

impl Default for Lobby {
    fn default() -> Self {
        Self::new(1, Randomizer::Uniform)
    }
}
