//! Movement module - shifting, wrapping and rotating the falling piece
//!
//! All functions are pure: they take the current piece and return the new
//! piece (and the face it now belongs to) when the move is legal.

use crate::collision::{drop_distance, is_valid_placement, piece_fits};
use crate::grid::CubeGrids;
use crate::piece::Piece;
use crate::topology::resolve;
use crate::types::ROTATION_KICKS;

/// Where a piece ended up after a successful move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub face: usize,
    pub piece: Piece,
}

/// Try to move the piece by (dx, dy) on `active_face`.
///
/// The target is validated in the active face's coordinates. If a sideways
/// move puts the target column outside the face, the piece changes resident
/// face and its x is rewritten into that face's coordinates. Vertical moves
/// never change the face, even for a kicked piece whose x is out of range.
pub fn try_shift(
    grids: &CubeGrids,
    active_face: usize,
    piece: &Piece,
    dx: i32,
    dy: i32,
) -> Option<Placement> {
    let target = piece.moved(dx, dy);
    if !piece_fits(grids, active_face, &target) {
        return None;
    }
    if dx == 0 {
        return Some(Placement {
            face: active_face,
            piece: target,
        });
    }

    let (face, x) = resolve(active_face, target.x);
    Some(Placement {
        face,
        piece: target.with_x(x),
    })
}

/// Rotate clockwise and search the kick offsets in priority order.
///
/// Returns the first kicked piece that fits on `active_face`, or `None` if
/// every offset collides. Kicks never change the face.
pub fn try_rotate(grids: &CubeGrids, active_face: usize, piece: &Piece) -> Option<Piece> {
    let rotated = piece.rotated();
    ROTATION_KICKS
        .iter()
        .map(|&dx| rotated.moved(dx, 0))
        .find(|candidate| {
            is_valid_placement(
                grids,
                active_face,
                &candidate.shape,
                candidate.x,
                candidate.y,
            )
        })
}

/// The piece moved straight down to the last row where it still fits
pub fn hard_drop_target(grids: &CubeGrids, active_face: usize, piece: &Piece) -> Piece {
    piece.moved(0, drop_distance(grids, active_face, piece))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PieceKind, FACE_HEIGHT, FACE_WIDTH};

    #[test]
    fn test_shift_inside_face() {
        let grids = CubeGrids::new();
        let piece = Piece::spawn(PieceKind::T);
        let moved = try_shift(&grids, 2, &piece, 1, 0).unwrap();
        assert_eq!(moved.face, 2);
        assert_eq!(moved.piece.x, piece.x + 1);
    }

    #[test]
    fn test_shift_left_past_edge_wraps_to_previous_face() {
        let grids = CubeGrids::new();
        let piece = Piece::spawn(PieceKind::O).with_x(0);
        let moved = try_shift(&grids, 0, &piece, -1, 0).unwrap();
        assert_eq!(moved.face, 3);
        assert_eq!(moved.piece.x, FACE_WIDTH as i32 - 1);
    }

    #[test]
    fn test_round_trip_wrap_returns_to_origin() {
        let grids = CubeGrids::new();
        let start = Piece::spawn(PieceKind::O).with_x(0);

        let left = try_shift(&grids, 0, &start, -1, 0).unwrap();
        assert_eq!(left.face, 3);

        let back = try_shift(&grids, left.face, &left.piece, 1, 0).unwrap();
        assert_eq!(back.face, 0);
        assert_eq!(back.piece, start);
    }

    #[test]
    fn test_shift_down_keeps_out_of_range_x() {
        let grids = CubeGrids::new();
        // Horizontal I hanging one column over the left edge of face 0.
        let piece = Piece::spawn(PieceKind::I).with_x(-1).moved(0, 10);
        let moved = try_shift(&grids, 0, &piece, 0, 1).unwrap();
        assert_eq!(moved.face, 0);
        assert_eq!(moved.piece, piece.moved(0, 1));
    }

    #[test]
    fn test_shift_down_blocked_by_floor() {
        let grids = CubeGrids::new();
        let piece = Piece::spawn(PieceKind::I).moved(0, FACE_HEIGHT as i32 - 1);
        assert!(try_shift(&grids, 0, &piece, 0, 1).is_none());
    }

    #[test]
    fn test_rotation_without_obstacles_uses_no_kick() {
        let grids = CubeGrids::new();
        let piece = Piece::spawn(PieceKind::T).moved(0, 5);
        let rotated = try_rotate(&grids, 0, &piece).unwrap();
        assert_eq!(rotated.x, piece.x);
        assert_eq!(rotated.shape, piece.shape.rotated_cw());
    }

    #[test]
    fn test_rotation_lands_on_minus_two_kick() {
        let mut grids = CubeGrids::new();
        // Vertical I at x=5 rotates into a 4-wide bar on row y.
        let piece = Piece::spawn(PieceKind::I).rotated().with_x(5).moved(0, 10);
        let y = piece.y;
        // Block columns so offsets 0, -1, +1 and +2 collide but -2 (cols 3..=6) fits.
        grids.face_mut(0).set(7, y, Some(PieceKind::Z));
        grids.face_mut(0).set(2, y, Some(PieceKind::Z));

        let rotated = try_rotate(&grids, 0, &piece).unwrap();
        assert_eq!(rotated.x, 3);
        assert_eq!(rotated.shape.width(), 4);
    }

    #[test]
    fn test_rotation_rejected_when_no_kick_fits() {
        let mut grids = CubeGrids::new();
        let piece = Piece::spawn(PieceKind::I).rotated().with_x(5).moved(0, 10);
        for x in [1, 2, 7, 8] {
            grids.face_mut(0).set(x, piece.y, Some(PieceKind::Z));
        }
        // With column 4 blocked too, every kick window overlaps a filled cell.
        grids.face_mut(0).set(4, piece.y, Some(PieceKind::Z));
        assert!(try_rotate(&grids, 0, &piece).is_none());
    }

    #[test]
    fn test_hard_drop_target_rests_on_stack() {
        let mut grids = CubeGrids::new();
        grids.face_mut(1).set(4, 19, Some(PieceKind::L));
        let piece = Piece::spawn(PieceKind::O);
        let landed = hard_drop_target(&grids, 1, &piece);
        assert_eq!(landed.y, 17);
    }
}
