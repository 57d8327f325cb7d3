//! Collision module - placement validity across the four faces
//!
//! A candidate placement is checked cell by cell against the grid the cell
//! resolves to (see [`crate::topology::resolve`]). Cells on a face's boundary
//! column also test the neighbouring face's matching column: both columns sit
//! on the same physical cube edge, so a block on either side occupies the seam.
//!
//! The check is read-only and never mutates the grids.

use crate::grid::CubeGrids;
use crate::piece::{Piece, Shape};
use crate::topology::{next_face, previous_face, resolve};
use crate::types::{FACE_HEIGHT, FACE_WIDTH};

/// Check whether `shape` fits with its top-left cell at (`x`, `y`) relative to
/// `active_face`.
///
/// - Rows at or below the floor (`y >= FACE_HEIGHT`) are invalid.
/// - Rows above the grid (`y < 0`) are always clear.
/// - Columns are resolved onto the neighbouring face when they cross a side
///   edge; a column still outside the face after resolving is invalid.
pub fn is_valid_placement(
    grids: &CubeGrids,
    active_face: usize,
    shape: &Shape,
    x: i32,
    y: i32,
) -> bool {
    let width = FACE_WIDTH as i32;
    let height = FACE_HEIGHT as i32;

    for (dx, dy) in shape.filled() {
        let abs_x = x + dx;
        let abs_y = y + dy;

        if abs_y >= height {
            return false;
        }
        if abs_y < 0 {
            continue;
        }

        let (face, check_x) = resolve(active_face, abs_x);
        if check_x < 0 || check_x >= width {
            return false;
        }

        if grids.is_occupied(face, check_x, abs_y) {
            return false;
        }

        // Shared edge with the neighbouring face.
        if check_x == 0 && grids.is_occupied(previous_face(face), width - 1, abs_y) {
            return false;
        }
        if check_x == width - 1 && grids.is_occupied(next_face(face), 0, abs_y) {
            return false;
        }
    }

    true
}

/// Check a whole piece at its own position
#[inline]
pub fn piece_fits(grids: &CubeGrids, active_face: usize, piece: &Piece) -> bool {
    is_valid_placement(grids, active_face, &piece.shape, piece.x, piece.y)
}

/// Check if the piece is resting on something (cannot fall one row)
pub fn is_grounded(grids: &CubeGrids, active_face: usize, piece: &Piece) -> bool {
    !is_valid_placement(grids, active_face, &piece.shape, piece.x, piece.y + 1)
}

/// Rows the piece can still fall before it would collide
pub fn drop_distance(grids: &CubeGrids, active_face: usize, piece: &Piece) -> i32 {
    let mut distance = 0;
    while is_valid_placement(
        grids,
        active_face,
        &piece.shape,
        piece.x,
        piece.y + distance + 1,
    ) {
        distance += 1;
    }
    distance
}
