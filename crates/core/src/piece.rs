//! Piece module - tetromino shape matrices and the falling piece value
//!
//! Shapes are small row-major matrices (at most 4x4) with the origin at the
//! top-left cell. Rotation is a plain matrix rotation, so non-square shapes
//! swap their width and height when turned.
//!
//! [`Piece`] is an immutable `Copy` value: every move or rotation returns a new
//! piece and leaves the original untouched.

use crate::types::{Cell, PieceKind, FACE_WIDTH};

/// Largest matrix side used by any tetromino
pub const MAX_SHAPE_SIDE: usize = 4;

/// A tetromino shape matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    width: u8,
    height: u8,
    /// Indexed `[row][col]`; only the `height x width` corner is meaningful
    cells: [[Cell; MAX_SHAPE_SIDE]; MAX_SHAPE_SIDE],
}

impl Shape {
    /// Spawn orientation of each kind
    pub fn spawn(kind: PieceKind) -> Self {
        match kind {
            PieceKind::I => Self::from_mask(kind, &[&[1, 1, 1, 1]]),
            PieceKind::O => Self::from_mask(kind, &[&[1, 1], &[1, 1]]),
            PieceKind::T => Self::from_mask(kind, &[&[0, 1, 0], &[1, 1, 1]]),
            PieceKind::S => Self::from_mask(kind, &[&[0, 1, 1], &[1, 1, 0]]),
            PieceKind::Z => Self::from_mask(kind, &[&[1, 1, 0], &[0, 1, 1]]),
            PieceKind::J => Self::from_mask(kind, &[&[1, 0, 0], &[1, 1, 1]]),
            PieceKind::L => Self::from_mask(kind, &[&[0, 0, 1], &[1, 1, 1]]),
        }
    }

    /// Build a shape from a 0/1 mask, one slice per row.
    ///
    /// Rows longer than [`MAX_SHAPE_SIDE`] (or more rows than that) are truncated.
    pub fn from_mask(kind: PieceKind, rows: &[&[u8]]) -> Self {
        let height = rows.len().min(MAX_SHAPE_SIDE);
        let width = rows
            .iter()
            .take(height)
            .map(|r| r.len())
            .max()
            .unwrap_or(0)
            .min(MAX_SHAPE_SIDE);

        let mut cells = [[None; MAX_SHAPE_SIDE]; MAX_SHAPE_SIDE];
        for (row, mask) in rows.iter().take(height).enumerate() {
            for (col, &bit) in mask.iter().take(width).enumerate() {
                if bit != 0 {
                    cells[row][col] = Some(kind);
                }
            }
        }

        Self {
            width: width as u8,
            height: height as u8,
            cells,
        }
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    /// Cell at (col, row); `None` outside the matrix
    pub fn get(&self, col: usize, row: usize) -> Cell {
        if col >= self.width as usize || row >= self.height as usize {
            return None;
        }
        self.cells[row][col]
    }

    /// Rotate 90° clockwise: transpose, then reverse each row.
    pub fn rotated_cw(&self) -> Self {
        let (w, h) = (self.width as usize, self.height as usize);
        let mut cells = [[None; MAX_SHAPE_SIDE]; MAX_SHAPE_SIDE];
        for (row, out_row) in cells.iter_mut().enumerate().take(w) {
            for (col, out) in out_row.iter_mut().enumerate().take(h) {
                *out = self.cells[h - 1 - col][row];
            }
        }
        Self {
            width: self.height,
            height: self.width,
            cells,
        }
    }

    /// Shape-local (col, row) of every filled cell, row-major
    pub fn filled(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        (0..self.height as usize).flat_map(move |row| {
            (0..self.width as usize)
                .filter(move |&col| self.cells[row][col].is_some())
                .map(move |col| (col as i32, row as i32))
        })
    }

    /// Render rows as strings (`#` filled, `.` empty) for tests and debugging
    pub fn to_rows(&self) -> Vec<String> {
        (0..self.height as usize)
            .map(|row| {
                (0..self.width as usize)
                    .map(|col| if self.cells[row][col].is_some() { '#' } else { '.' })
                    .collect()
            })
            .collect()
    }
}

/// The falling piece: kind, current shape matrix, and the face-relative
/// position of the matrix's top-left cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub kind: PieceKind,
    pub shape: Shape,
    pub x: i32,
    pub y: i32,
}

impl Piece {
    /// Create a piece at the spawn position (horizontally centered, row 0)
    pub fn spawn(kind: PieceKind) -> Self {
        let shape = Shape::spawn(kind);
        Self {
            kind,
            shape,
            x: (FACE_WIDTH as i32 - shape.width() as i32) / 2,
            y: 0,
        }
    }

    pub fn moved(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    pub fn with_x(&self, x: i32) -> Self {
        Self { x, ..*self }
    }

    /// Same position, shape rotated clockwise
    pub fn rotated(&self) -> Self {
        Self {
            shape: self.shape.rotated_cw(),
            ..*self
        }
    }

    /// Absolute (x, y) of every filled cell, relative to the active face
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.shape
            .filled()
            .map(move |(dx, dy)| (self.x + dx, self.y + dy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_shapes_have_four_cells() {
        for kind in PieceKind::ALL {
            let shape = Shape::spawn(kind);
            assert_eq!(shape.filled().count(), 4, "{:?}", kind);
        }
    }

    #[test]
    fn test_spawn_positions_are_centered() {
        assert_eq!(Piece::spawn(PieceKind::I).x, 3);
        assert_eq!(Piece::spawn(PieceKind::O).x, 4);
        assert_eq!(Piece::spawn(PieceKind::T).x, 3);
        for kind in PieceKind::ALL {
            assert_eq!(Piece::spawn(kind).y, 0);
        }
    }

    #[test]
    fn test_rotate_t_clockwise() {
        let t = Shape::spawn(PieceKind::T);
        assert_eq!(t.to_rows(), vec![".#.", "###"]);

        let r = t.rotated_cw();
        assert_eq!(r.width(), 2);
        assert_eq!(r.height(), 3);
        assert_eq!(r.to_rows(), vec!["#.", "##", "#."]);
    }

    #[test]
    fn test_rotate_i_swaps_dimensions() {
        let i = Shape::spawn(PieceKind::I);
        assert_eq!((i.width(), i.height()), (4, 1));
        let r = i.rotated_cw();
        assert_eq!((r.width(), r.height()), (1, 4));
        assert_eq!(r.filled().count(), 4);
    }

    #[test]
    fn test_four_rotations_are_identity() {
        for kind in PieceKind::ALL {
            let shape = Shape::spawn(kind);
            let back = shape.rotated_cw().rotated_cw().rotated_cw().rotated_cw();
            assert_eq!(shape, back, "{:?}", kind);
        }
    }

    #[test]
    fn test_moved_returns_new_value() {
        let piece = Piece::spawn(PieceKind::L);
        let moved = piece.moved(-2, 3);
        assert_eq!((piece.x, piece.y), (3, 0));
        assert_eq!((moved.x, moved.y), (1, 3));
        assert_eq!(moved.shape, piece.shape);
    }

    #[test]
    fn test_cells_are_offset_by_position() {
        let piece = Piece::spawn(PieceKind::O).moved(0, 5);
        let cells: Vec<_> = piece.cells().collect();
        assert_eq!(cells, vec![(4, 5), (5, 5), (4, 6), (5, 6)]);
    }
}
