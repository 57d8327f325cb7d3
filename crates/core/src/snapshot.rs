use arrayvec::ArrayVec;

use crate::piece::Piece;
use crate::session::Phase;
use crate::types::{PieceKind, FACE_HEIGHT, FACE_WIDTH, NUM_FACES};

/// One face as `u8` cell codes (0 = empty, 1..=7 piece kinds)
pub type FaceCodes = [[u8; FACE_WIDTH as usize]; FACE_HEIGHT as usize];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TimersSnapshot {
    pub drop_ms: u32,
    pub lock_ms: u32,
    pub game_over_ms: u32,
}

/// Plain-data view of a session, reusable via `Session::snapshot_into`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GameSnapshot {
    pub faces: [FaceCodes; NUM_FACES],
    pub face_revisions: [u32; NUM_FACES],
    pub active_face: usize,
    pub my_faces: ArrayVec<usize, NUM_FACES>,
    pub current: Option<Piece>,
    pub next: Option<PieceKind>,
    pub ghost_y: Option<i32>,
    pub phase: Phase,
    pub is_locking: bool,
    pub is_game_over: bool,
    pub episode_id: u32,
    pub seed: u32,
    pub piece_id: u32,
    pub score: u32,
    pub level: u32,
    pub lines: u32,
    pub timers: TimersSnapshot,
}

impl GameSnapshot {
    pub fn clear(&mut self) {
        self.faces = [[[0u8; FACE_WIDTH as usize]; FACE_HEIGHT as usize]; NUM_FACES];
        self.face_revisions = [0; NUM_FACES];
        self.active_face = 0;
        self.my_faces.clear();
        self.current = None;
        self.next = None;
        self.ghost_y = None;
        self.phase = Phase::NotStarted;
        self.is_locking = false;
        self.is_game_over = false;
        self.episode_id = 0;
        self.seed = 0;
        self.piece_id = 0;
        self.score = 0;
        self.level = 1;
        self.lines = 0;
        self.timers = TimersSnapshot::default();
    }

    /// Whether the session behind this snapshot accepts movement input
    pub fn playable(&self) -> bool {
        self.phase.accepts_input() && !self.my_faces.is_empty()
    }

    /// Cell code at (`x`, `y`) on `face`, 0 when out of range
    pub fn cell(&self, face: usize, x: usize, y: usize) -> u8 {
        self.faces
            .get(face)
            .and_then(|rows| rows.get(y))
            .and_then(|row| row.get(x))
            .copied()
            .unwrap_or(0)
    }
}

impl Default for GameSnapshot {
    fn default() -> Self {
        let mut s = Self {
            faces: [[[0u8; FACE_WIDTH as usize]; FACE_HEIGHT as usize]; NUM_FACES],
            face_revisions: [0; NUM_FACES],
            active_face: 0,
            my_faces: ArrayVec::new(),
            current: None,
            next: None,
            ghost_y: None,
            phase: Phase::NotStarted,
            is_locking: false,
            is_game_over: false,
            episode_id: 0,
            seed: 0,
            piece_id: 0,
            score: 0,
            level: 1,
            lines: 0,
            timers: TimersSnapshot::default(),
        };
        s.clear();
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::types::Intent;

    #[test]
    fn test_snapshot_into_reuses_buffer() {
        let mut session = Session::new(11);
        session.start();

        let mut buf = GameSnapshot::default();
        session.snapshot_into(&mut buf);
        assert_eq!(buf, session.snapshot());
        assert_eq!(buf.phase, Phase::Active);
        assert!(buf.playable());

        session.apply_intent(Intent::HardDrop);
        session.snapshot_into(&mut buf);
        assert_eq!(buf, session.snapshot());
        assert_eq!(buf.piece_id, 2);
    }

    #[test]
    fn test_committed_cells_show_up_as_codes() {
        let mut session = Session::new(11);
        session.start();
        let kind = session.current().unwrap().kind;
        let before = session.snapshot().face_revisions;
        session.apply_intent(Intent::HardDrop);

        let snap = session.snapshot();
        let filled: Vec<u8> = snap.faces[0]
            .iter()
            .flatten()
            .copied()
            .filter(|&c| c != 0)
            .collect();
        assert_eq!(filled.len(), 4);
        assert!(filled.iter().all(|&c| c == kind.code()));
        assert!(snap.face_revisions[0] > before[0]);
        assert_eq!(snap.face_revisions[1..], before[1..]);
    }

    #[test]
    fn test_cell_out_of_range_is_empty() {
        let snap = GameSnapshot::default();
        assert_eq!(snap.cell(7, 0, 0), 0);
        assert_eq!(snap.cell(0, 10, 0), 0);
        assert_eq!(snap.cell(0, 0, 20), 0);
    }
}
