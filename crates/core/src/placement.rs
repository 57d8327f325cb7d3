//! Placement module - committing a piece and clearing full-cube rows

use arrayvec::ArrayVec;

use crate::grid::CubeGrids;
use crate::piece::Piece;
use crate::topology::resolve;
use crate::types::{FACE_HEIGHT, FACE_WIDTH, NUM_FACES};

/// What a commit changed
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommitOutcome {
    /// Cleared row indices, top to bottom
    pub cleared_rows: ArrayVec<usize, { FACE_HEIGHT as usize }>,
    /// Faces that received at least one cell
    pub faces_written: [bool; NUM_FACES],
}

impl CommitOutcome {
    pub fn lines_cleared(&self) -> u32 {
        self.cleared_rows.len() as u32
    }
}

/// Write the piece into the grids and clear every row that is now full on all
/// four faces.
///
/// Each filled cell is resolved onto its face exactly like the collision
/// check, so a piece straddling a seam writes into two faces. Cells outside
/// the grid after resolving are dropped.
pub fn commit(grids: &mut CubeGrids, active_face: usize, piece: &Piece) -> CommitOutcome {
    let mut outcome = CommitOutcome::default();

    for (abs_x, abs_y) in piece.cells() {
        if abs_y < 0 || abs_y >= FACE_HEIGHT as i32 {
            continue;
        }
        let (face, x) = resolve(active_face, abs_x);
        if x < 0 || x >= FACE_WIDTH as i32 {
            continue;
        }
        if grids.face_mut(face).set(x, abs_y, Some(piece.kind)) {
            outcome.faces_written[face] = true;
        }
    }

    outcome.cleared_rows = grids.clear_full_rows();
    outcome
}
