//! Session module - the per-player game state machine
//!
//! A session owns the four face grids, the falling piece and the counters,
//! and moves through these phases:
//!
//! ```text
//! NotStarted --start--> Active <--cancel-- Locking --grace--> commit
//!                         ^                                     |
//!                         +---------- spawn fits ---------------+
//!                                                               |
//!        GameOver <--delay-- GameOverPending <-- spawn overlaps-+
//! ```
//!
//! All operations are synchronous. Rejected intents leave the session
//! untouched and report `false`.

use arrayvec::ArrayVec;

use crate::collision::{drop_distance, is_grounded, piece_fits};
use crate::grid::CubeGrids;
use crate::movement::{hard_drop_target, try_rotate, try_shift};
use crate::piece::Piece;
use crate::placement::commit;
use crate::rng::{PieceQueue, Randomizer};
use crate::scoring::{drop_interval_ms, level_for_lines, line_clear_score};
use crate::snapshot::{GameSnapshot, TimersSnapshot};
use crate::types::{
    FaceDirection, Intent, LockEvent, PieceKind, GAME_OVER_DELAY_MS, LOCK_DELAY_MS, NUM_FACES,
};

/// Lifecycle phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    #[default]
    NotStarted,
    /// A piece is falling and accepts input
    Active,
    /// The piece cannot fall; it commits once the grace elapses
    Locking,
    /// The freshly spawned piece overlaps the stack
    GameOverPending,
    GameOver,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::NotStarted => "not_started",
            Phase::Active => "active",
            Phase::Locking => "locking",
            Phase::GameOverPending => "game_over_pending",
            Phase::GameOver => "game_over",
        }
    }

    /// Whether movement intents are accepted in this phase
    pub fn accepts_input(&self) -> bool {
        matches!(self, Phase::Active | Phase::Locking)
    }
}

/// Complete game state for one player
#[derive(Debug, Clone)]
pub struct Session {
    grids: CubeGrids,
    /// Faces this controller may cycle through, in cycling order
    my_faces: ArrayVec<usize, NUM_FACES>,
    active_face: usize,
    current: Option<Piece>,
    next: Option<PieceKind>,
    queue: PieceQueue,
    phase: Phase,
    score: u32,
    level: u32,
    lines: u32,
    drop_timer_ms: u32,
    lock_timer_ms: u32,
    game_over_timer_ms: u32,
    /// Monotonic episode id (increments on restart)
    episode_id: u32,
    /// Monotonic id for spawned pieces
    piece_id: u32,
    /// Last commit event (consumed by observers)
    last_event: Option<LockEvent>,
}

impl Session {
    /// Create a solo session owning all four faces, with uniform piece draws
    pub fn new(seed: u32) -> Self {
        Self::with_randomizer(seed, Randomizer::Uniform)
    }

    pub fn with_randomizer(seed: u32, randomizer: Randomizer) -> Self {
        Self {
            grids: CubeGrids::new(),
            my_faces: (0..NUM_FACES).collect(),
            active_face: 0,
            current: None,
            next: None,
            queue: PieceQueue::new(seed, randomizer),
            phase: Phase::NotStarted,
            score: 0,
            level: 1,
            lines: 0,
            drop_timer_ms: 0,
            lock_timer_ms: 0,
            game_over_timer_ms: 0,
            episode_id: 0,
            piece_id: 0,
            last_event: None,
        }
    }

    /// Start a new game.
    ///
    /// Only valid from `NotStarted` or `GameOver`. Resets the grids and
    /// counters, moves to the first owned face and spawns the first piece.
    pub fn start(&mut self) -> bool {
        match self.phase {
            Phase::NotStarted => {}
            Phase::GameOver => self.episode_id = self.episode_id.wrapping_add(1),
            _ => return false,
        }

        self.grids.clear();
        self.active_face = self.my_faces.first().copied().unwrap_or(0);
        self.current = None;
        self.next = None;
        self.score = 0;
        self.level = level_for_lines(0);
        self.lines = 0;
        self.drop_timer_ms = 0;
        self.lock_timer_ms = 0;
        self.game_over_timer_ms = 0;
        self.last_event = None;
        self.spawn_piece();
        true
    }

    /// Apply one player intent. Returns `true` if the session changed.
    pub fn apply_intent(&mut self, intent: Intent) -> bool {
        if intent == Intent::Start {
            return self.start();
        }
        if !self.phase.accepts_input() || self.my_faces.is_empty() {
            return false;
        }

        match intent {
            Intent::MoveLeft => self.try_move_horizontal(-1),
            Intent::MoveRight => self.try_move_horizontal(1),
            Intent::SoftDrop => self.soft_drop(),
            Intent::HardDrop => self.hard_drop(),
            Intent::Rotate => self.rotate(),
            Intent::ChangeFace(direction) => self.change_face(direction),
            Intent::Start => false,
        }
    }

    /// Advance timers by `elapsed_ms`. Returns `true` if the session changed.
    pub fn tick(&mut self, elapsed_ms: u32) -> bool {
        match self.phase {
            Phase::NotStarted | Phase::GameOver => false,
            Phase::GameOverPending => {
                self.game_over_timer_ms = self.game_over_timer_ms.saturating_add(elapsed_ms);
                if self.game_over_timer_ms >= GAME_OVER_DELAY_MS {
                    self.phase = Phase::GameOver;
                    return true;
                }
                false
            }
            Phase::Locking => {
                self.lock_timer_ms = self.lock_timer_ms.saturating_add(elapsed_ms);
                if self.lock_timer_ms >= LOCK_DELAY_MS {
                    self.lock_piece();
                    return true;
                }
                false
            }
            Phase::Active => {
                self.drop_timer_ms = self.drop_timer_ms.saturating_add(elapsed_ms);
                if self.drop_timer_ms < self.drop_interval_ms() {
                    return false;
                }
                self.drop_timer_ms = 0;
                if !self.step_down() {
                    self.enter_locking();
                }
                true
            }
        }
    }

    /// Replace the owned faces.
    ///
    /// Out-of-range and duplicate faces are ignored. If the active face is no
    /// longer owned, play moves to the first owned face; the falling piece is
    /// re-spawned there when it does not fit at its current position.
    /// Returns `true` if the active face changed.
    pub fn set_face_assignment(&mut self, faces: &[usize]) -> bool {
        self.my_faces.clear();
        for &face in faces {
            if face < NUM_FACES && !self.my_faces.contains(&face) {
                self.my_faces.push(face);
            }
        }

        let Some(&first) = self.my_faces.first() else {
            return false;
        };
        if self.my_faces.contains(&self.active_face) {
            return false;
        }

        self.active_face = first;
        if self.phase.accepts_input() {
            self.refit_current();
        }
        true
    }

    /// Adopt grids committed by another controller of the same cube.
    ///
    /// Sessions that are over (or about to be) keep their frozen grids. A
    /// falling piece that no longer fits is handled like a reassignment.
    /// Returns `true` if the grids were replaced.
    pub fn sync_grids(&mut self, grids: &CubeGrids) -> bool {
        if matches!(self.phase, Phase::GameOverPending | Phase::GameOver) || &self.grids == grids {
            return false;
        }
        self.grids.clone_from(grids);
        if self.phase.accepts_input() {
            self.refit_current();
        }
        true
    }

    /// Re-check the falling piece after its surroundings changed.
    ///
    /// Locking restarts from `Active`; a piece that no longer fits goes back
    /// to the spawn position, and an overlapping spawn ends the game.
    fn refit_current(&mut self) {
        self.cancel_locking();
        let Some(piece) = self.current else {
            return;
        };
        if piece_fits(&self.grids, self.active_face, &piece) {
            return;
        }
        let respawned = Piece::spawn(piece.kind);
        self.current = Some(respawned);
        if !piece_fits(&self.grids, self.active_face, &respawned) {
            self.enter_game_over_pending();
        }
    }

    fn try_move_horizontal(&mut self, dx: i32) -> bool {
        let Some(piece) = self.current else {
            return false;
        };
        let Some(placement) = try_shift(&self.grids, self.active_face, &piece, dx, 0) else {
            return false;
        };
        // Wrapping onto a face owned by someone else is not allowed.
        if !self.my_faces.contains(&placement.face) {
            return false;
        }

        self.active_face = placement.face;
        self.current = Some(placement.piece);
        self.cancel_locking();
        true
    }

    fn soft_drop(&mut self) -> bool {
        if self.step_down() {
            return true;
        }
        self.enter_locking();
        false
    }

    fn hard_drop(&mut self) -> bool {
        let Some(piece) = self.current else {
            return false;
        };
        self.current = Some(hard_drop_target(&self.grids, self.active_face, &piece));
        self.lock_piece();
        true
    }

    fn rotate(&mut self) -> bool {
        let Some(piece) = self.current else {
            return false;
        };
        let Some(rotated) = try_rotate(&self.grids, self.active_face, &piece) else {
            return false;
        };
        self.current = Some(rotated);
        self.cancel_locking();
        true
    }

    fn change_face(&mut self, direction: FaceDirection) -> bool {
        let Some(piece) = self.current else {
            return false;
        };
        let Some(index) = self.my_faces.iter().position(|&f| f == self.active_face) else {
            return false;
        };

        let len = self.my_faces.len() as isize;
        let target = self.my_faces[(index as isize + direction.step()).rem_euclid(len) as usize];
        if target == self.active_face || !piece_fits(&self.grids, target, &piece) {
            return false;
        }

        self.active_face = target;
        self.cancel_locking();
        true
    }

    /// Move the piece one row down if possible. The column and face stay put.
    fn step_down(&mut self) -> bool {
        let Some(piece) = self.current else {
            return false;
        };
        if is_grounded(&self.grids, self.active_face, &piece) {
            return false;
        }
        self.current = Some(piece.moved(0, 1));
        true
    }

    fn enter_locking(&mut self) {
        // An already running grace is not restarted.
        if self.phase == Phase::Active {
            self.phase = Phase::Locking;
            self.lock_timer_ms = 0;
        }
    }

    fn cancel_locking(&mut self) {
        if self.phase == Phase::Locking {
            self.phase = Phase::Active;
            self.lock_timer_ms = 0;
        }
    }

    fn enter_game_over_pending(&mut self) {
        self.phase = Phase::GameOverPending;
        self.game_over_timer_ms = 0;
        self.lock_timer_ms = 0;
    }

    /// Commit the falling piece, update the counters and spawn the next one
    fn lock_piece(&mut self) {
        let Some(piece) = self.current.take() else {
            return;
        };

        let outcome = commit(&mut self.grids, self.active_face, &piece);
        let lines_cleared = outcome.lines_cleared();
        let score_delta = line_clear_score(lines_cleared);

        self.score = self.score.saturating_add(score_delta);
        self.lines = self.lines.saturating_add(lines_cleared);
        self.level = level_for_lines(self.lines);

        self.last_event = Some(LockEvent {
            lines_cleared,
            score_delta,
            faces_written: outcome.faces_written,
        });

        self.spawn_piece();
    }

    /// Hand the preview piece over and draw a new preview.
    ///
    /// An overlapping spawn stays visible as the current piece but is never
    /// committed; the session goes to `GameOverPending` instead.
    fn spawn_piece(&mut self) {
        let kind = match self.next.take() {
            Some(kind) => kind,
            None => self.queue.draw(),
        };
        self.next = Some(self.queue.draw());

        let piece = Piece::spawn(kind);
        self.current = Some(piece);
        self.piece_id = self.piece_id.wrapping_add(1);
        self.drop_timer_ms = 0;
        self.lock_timer_ms = 0;

        if piece_fits(&self.grids, self.active_face, &piece) {
            self.phase = Phase::Active;
        } else {
            self.enter_game_over_pending();
        }
    }

    /// Take and clear the last commit event.
    pub fn take_last_event(&mut self) -> Option<LockEvent> {
        self.last_event.take()
    }

    /// Row the current piece would land on if hard dropped
    pub fn ghost_y(&self) -> Option<i32> {
        let piece = self.current?;
        Some(piece.y + drop_distance(&self.grids, self.active_face, &piece))
    }

    /// Current gravity interval
    pub fn drop_interval_ms(&self) -> u32 {
        drop_interval_ms(self.level)
    }

    pub fn grids(&self) -> &CubeGrids {
        &self.grids
    }

    pub fn active_face(&self) -> usize {
        self.active_face
    }

    pub fn my_faces(&self) -> &[usize] {
        &self.my_faces
    }

    pub fn current(&self) -> Option<Piece> {
        self.current
    }

    pub fn next(&self) -> Option<PieceKind> {
        self.next
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn lines(&self) -> u32 {
        self.lines
    }

    pub fn is_locking(&self) -> bool {
        self.phase == Phase::Locking
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    pub fn episode_id(&self) -> u32 {
        self.episode_id
    }

    pub fn piece_id(&self) -> u32 {
        self.piece_id
    }

    pub fn randomizer(&self) -> Randomizer {
        self.queue.randomizer()
    }

    pub fn snapshot_into(&self, out: &mut GameSnapshot) {
        for (face, grid) in self.grids.faces().iter().enumerate() {
            grid.write_u8_grid(&mut out.faces[face]);
        }
        out.face_revisions = self.grids.revisions();
        out.active_face = self.active_face;
        out.my_faces.clear();
        out.my_faces.extend(self.my_faces.iter().copied());
        out.current = self.current;
        out.next = self.next;
        out.ghost_y = self.ghost_y();
        out.phase = self.phase;
        out.is_locking = self.is_locking();
        out.is_game_over = self.is_game_over();
        out.episode_id = self.episode_id;
        out.seed = self.queue.seed();
        out.piece_id = self.piece_id;
        out.score = self.score;
        out.level = self.level;
        out.lines = self.lines;
        out.timers = TimersSnapshot {
            drop_ms: self.drop_timer_ms,
            lock_ms: self.lock_timer_ms,
            game_over_ms: self.game_over_timer_ms,
        };
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let mut s = GameSnapshot::default();
        self.snapshot_into(&mut s);
        s
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FACE_HEIGHT, FACE_WIDTH, TICK_MS};

    fn started(seed: u32) -> Session {
        let mut session = Session::new(seed);
        assert!(session.start());
        session
    }

    /// Replace the falling piece and preview with a fixed kind
    fn force_piece(session: &mut Session, kind: PieceKind) {
        session.current = Some(Piece::spawn(kind));
        session.next = Some(kind);
    }

    fn fill_row_except(session: &mut Session, y: i32, holes: &[(usize, i32)]) {
        for face in 0..NUM_FACES {
            for x in 0..FACE_WIDTH as i32 {
                if !holes.contains(&(face, x)) {
                    session.grids.face_mut(face).set(x, y, Some(PieceKind::Z));
                }
            }
        }
    }

    #[test]
    fn test_new_session_is_not_started() {
        let mut session = Session::new(1);
        assert_eq!(session.phase(), Phase::NotStarted);
        assert!(session.current().is_none());
        assert!(!session.tick(10_000));
        assert!(!session.apply_intent(Intent::MoveLeft));
        assert_eq!(session.my_faces(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_start_spawns_current_and_next() {
        let session = started(3);
        assert_eq!(session.phase(), Phase::Active);
        assert_eq!(session.active_face(), 0);
        assert!(session.current().is_some());
        assert!(session.next().is_some());
        assert_eq!(session.score(), 0);
        assert_eq!(session.level(), 1);
        assert_eq!(session.lines(), 0);
    }

    #[test]
    fn test_start_is_rejected_while_playing() {
        let mut session = started(3);
        assert!(!session.apply_intent(Intent::Start));
        assert_eq!(session.piece_id(), 1);
    }

    #[test]
    fn test_gravity_moves_piece_after_interval() {
        let mut session = started(5);
        let y = session.current().unwrap().y;

        assert!(!session.tick(session.drop_interval_ms() - 1));
        assert_eq!(session.current().unwrap().y, y);
        assert!(session.tick(1));
        assert_eq!(session.current().unwrap().y, y + 1);
    }

    #[test]
    fn test_gravity_enters_locking_then_commits() {
        let mut session = started(5);
        force_piece(&mut session, PieceKind::O);
        session.current = Some(Piece::spawn(PieceKind::O).moved(0, 18));

        assert!(session.tick(session.drop_interval_ms()));
        assert!(session.is_locking());

        assert!(!session.tick(LOCK_DELAY_MS - 1));
        assert!(session.is_locking());
        assert!(session.tick(1));

        assert_eq!(session.phase(), Phase::Active);
        assert!(session.grids().face(0).is_occupied(4, 19));
        let event = session.take_last_event().unwrap();
        assert_eq!(event.lines_cleared, 0);
        assert_eq!(event.faces_written, [true, false, false, false]);
        assert!(session.take_last_event().is_none());
    }

    #[test]
    fn test_soft_drop_on_floor_starts_locking() {
        let mut session = started(9);
        session.current = Some(Piece::spawn(PieceKind::O).moved(0, 18));
        assert!(!session.apply_intent(Intent::SoftDrop));
        assert!(session.is_locking());
    }

    #[test]
    fn test_horizontal_move_cancels_lock() {
        let mut session = started(9);
        session.current = Some(Piece::spawn(PieceKind::O).moved(0, 18));
        session.apply_intent(Intent::SoftDrop);
        assert!(session.is_locking());

        assert!(session.apply_intent(Intent::MoveLeft));
        assert_eq!(session.phase(), Phase::Active);
    }

    #[test]
    fn test_repeated_locking_does_not_restart_grace() {
        let mut session = started(9);
        session.current = Some(Piece::spawn(PieceKind::O).moved(0, 18));
        session.apply_intent(Intent::SoftDrop);
        session.tick(300);
        session.apply_intent(Intent::SoftDrop);
        assert!(session.tick(LOCK_DELAY_MS - 300));
        assert!(session.take_last_event().is_some());
    }

    #[test]
    fn test_gravity_keeps_kicked_piece_on_its_columns() {
        let mut session = started(3);
        session.current = Some(Piece::spawn(PieceKind::I).rotated().with_x(0).moved(0, 10));
        session.grids.face_mut(0).set(3, 10, Some(PieceKind::Z));

        // The unkicked bar would cover (3, 10), so the -1 kick hangs it over face 3.
        assert!(session.apply_intent(Intent::Rotate));
        let kicked = session.current().unwrap();
        assert_eq!((session.active_face(), kicked.x, kicked.y), (0, -1, 10));

        assert!(session.tick(session.drop_interval_ms()));
        assert_eq!(session.active_face(), 0);
        assert_eq!(session.current().unwrap(), kicked.moved(0, 1));

        assert!(session.apply_intent(Intent::SoftDrop));
        assert_eq!(session.active_face(), 0);
        assert_eq!(session.current().unwrap(), kicked.moved(0, 2));
    }

    #[test]
    fn test_vertical_moves_past_right_edge_keep_columns() {
        let mut session = started(3);
        // x == FACE_WIDTH: every cell resolves onto face 3 while face 2 stays active.
        let hanging = Piece::spawn(PieceKind::O).with_x(FACE_WIDTH as i32).moved(0, 4);
        session.current = Some(hanging);
        session.active_face = 2;

        assert!(session.apply_intent(Intent::SoftDrop));
        assert_eq!(session.active_face(), 2);
        assert_eq!(session.current().unwrap(), hanging.moved(0, 1));

        assert!(session.apply_intent(Intent::HardDrop));
        assert!(session.grids().face(3).is_occupied(0, 19));
        assert!(session.grids().face(3).is_occupied(1, 19));
        assert!(!session.grids().face(2).is_occupied(0, 19));
    }

    #[test]
    fn test_sync_grids_adopts_cube_and_refits_piece() {
        let mut session = started(6);
        force_piece(&mut session, PieceKind::O);
        session.current = Some(Piece::spawn(PieceKind::O).moved(0, 10));

        let mut shared = CubeGrids::new();
        shared.face_mut(0).set(4, 11, Some(PieceKind::L));
        assert!(session.sync_grids(&shared));
        assert_eq!(session.grids(), &shared);
        assert_eq!(session.current().unwrap(), Piece::spawn(PieceKind::O));
        assert_eq!(session.phase(), Phase::Active);
        assert!(!session.sync_grids(&shared));
    }

    #[test]
    fn test_sync_grids_leaves_finished_game_frozen() {
        let mut session = started(8);
        while session.phase() != Phase::GameOverPending {
            force_piece(&mut session, PieceKind::O);
            session.apply_intent(Intent::HardDrop);
        }
        let frozen = session.grids().clone();
        assert!(!session.sync_grids(&CubeGrids::new()));
        assert_eq!(session.grids(), &frozen);
    }

    #[test]
    fn test_move_wraps_to_previous_face() {
        let mut session = started(2);
        session.current = Some(Piece::spawn(PieceKind::O).with_x(0).moved(0, 5));
        assert!(session.apply_intent(Intent::MoveLeft));
        assert_eq!(session.active_face(), 3);
        assert_eq!(session.current().unwrap().x, FACE_WIDTH as i32 - 1);
    }

    #[test]
    fn test_wrap_onto_unowned_face_is_rejected() {
        let mut session = started(2);
        session.set_face_assignment(&[0, 2]);
        session.current = Some(Piece::spawn(PieceKind::O).with_x(0).moved(0, 5));
        let before = session.snapshot();

        assert!(!session.apply_intent(Intent::MoveLeft));
        assert_eq!(session.snapshot(), before);
    }

    #[test]
    fn test_change_face_cycles_owned_faces() {
        let mut session = started(2);
        assert!(session.apply_intent(Intent::ChangeFace(FaceDirection::Next)));
        assert_eq!(session.active_face(), 1);
        assert!(session.apply_intent(Intent::ChangeFace(FaceDirection::Previous)));
        assert!(session.apply_intent(Intent::ChangeFace(FaceDirection::Previous)));
        assert_eq!(session.active_face(), 3);
    }

    #[test]
    fn test_change_face_rejection_leaves_state_unchanged() {
        let mut session = started(2);
        let piece = session.current().unwrap();
        for (x, y) in piece.cells() {
            session.grids.face_mut(1).set(x, y.max(0), Some(PieceKind::I));
        }
        let before = session.snapshot();

        assert!(!session.apply_intent(Intent::ChangeFace(FaceDirection::Next)));
        assert_eq!(session.snapshot(), before);
    }

    #[test]
    fn test_change_face_with_single_owned_face_is_noop() {
        let mut session = started(2);
        session.set_face_assignment(&[2]);
        assert_eq!(session.active_face(), 2);
        assert!(!session.apply_intent(Intent::ChangeFace(FaceDirection::Next)));
    }

    #[test]
    fn test_reassignment_remaps_active_face() {
        let mut session = started(2);
        assert!(!session.set_face_assignment(&[3, 0]));
        assert_eq!(session.active_face(), 0);

        assert!(session.set_face_assignment(&[1, 3, 1, 9]));
        assert_eq!(session.my_faces(), &[1, 3]);
        assert_eq!(session.active_face(), 1);
    }

    #[test]
    fn test_empty_assignment_rejects_movement() {
        let mut session = started(2);
        session.set_face_assignment(&[]);
        assert!(!session.apply_intent(Intent::MoveRight));
        assert!(!session.apply_intent(Intent::HardDrop));
        // Gravity still runs.
        assert!(session.tick(session.drop_interval_ms()));
    }

    #[test]
    fn test_hard_drop_commits_immediately() {
        let mut session = started(4);
        force_piece(&mut session, PieceKind::I);
        assert!(session.apply_intent(Intent::HardDrop));
        for x in 3..7 {
            assert!(session.grids().face(0).is_occupied(x, FACE_HEIGHT as i32 - 1));
        }
        assert_eq!(session.piece_id(), 2);
    }

    #[test]
    fn test_quadratic_scoring_through_session() {
        let mut session = started(4);
        let holes: Vec<(usize, i32)> = (3..7).map(|x| (0, x)).collect();
        fill_row_except(&mut session, 19, &holes);

        force_piece(&mut session, PieceKind::I);
        session.apply_intent(Intent::HardDrop);
        assert_eq!(session.score(), 100);
        assert_eq!(session.lines(), 1);

        fill_row_except(&mut session, 18, &[(0, 4), (0, 5)]);
        fill_row_except(&mut session, 19, &[(0, 4), (0, 5)]);
        force_piece(&mut session, PieceKind::O);
        session.apply_intent(Intent::HardDrop);
        assert_eq!(session.lines(), 3);
        assert_eq!(session.score(), 100 + 400);
        assert_eq!(session.take_last_event().unwrap().score_delta, 400);
    }

    #[test]
    fn test_level_follows_lines() {
        let mut session = started(4);
        session.lines = 9;
        let holes: Vec<(usize, i32)> = (3..7).map(|x| (0, x)).collect();
        fill_row_except(&mut session, 19, &holes);
        force_piece(&mut session, PieceKind::I);
        session.apply_intent(Intent::HardDrop);
        assert_eq!(session.lines(), 10);
        assert_eq!(session.level(), 2);
    }

    #[test]
    fn test_stacking_o_pieces_ends_game() {
        let mut session = started(8);
        let mut drops = 0;
        while session.phase() != Phase::GameOverPending {
            force_piece(&mut session, PieceKind::O);
            assert!(session.apply_intent(Intent::HardDrop));
            drops += 1;
            assert!(drops <= 10);
        }
        // Ten O pieces fill rows 0..20 of columns 4 and 5.
        assert_eq!(drops, 10);
        assert!(!session.is_game_over());

        // Input is rejected while the game over is pending.
        assert!(!session.apply_intent(Intent::MoveLeft));
        let frozen = session.grids().clone();

        assert!(!session.tick(GAME_OVER_DELAY_MS - 1));
        assert!(session.tick(1));
        assert!(session.is_game_over());

        for intent in [Intent::MoveRight, Intent::Rotate, Intent::HardDrop, Intent::SoftDrop] {
            assert!(!session.apply_intent(intent));
        }
        assert!(!session.tick(10 * TICK_MS));
        assert_eq!(session.grids(), &frozen);
    }

    #[test]
    fn test_restart_after_game_over() {
        let mut session = started(8);
        while session.phase() != Phase::GameOverPending {
            force_piece(&mut session, PieceKind::O);
            session.apply_intent(Intent::HardDrop);
        }
        session.tick(GAME_OVER_DELAY_MS);

        assert!(session.apply_intent(Intent::Start));
        assert_eq!(session.phase(), Phase::Active);
        assert_eq!(session.episode_id(), 1);
        assert!(session
            .grids()
            .faces()
            .iter()
            .all(|f| f.cells().iter().all(|c| c.is_none())));
    }

    #[test]
    fn test_ghost_y_matches_hard_drop() {
        let mut session = started(6);
        let ghost = session.ghost_y().unwrap();
        let piece = session.current().unwrap();
        assert_eq!(ghost, FACE_HEIGHT as i32 - piece.shape.height() as i32);
    }

    #[test]
    fn test_same_seed_same_game() {
        let mut a = started(77);
        let mut b = started(77);
        for _ in 0..30 {
            a.apply_intent(Intent::HardDrop);
            b.apply_intent(Intent::HardDrop);
        }
        assert_eq!(a.snapshot(), b.snapshot());
    }
}
