//! Cube topology - how the four faces connect
//!
//! Faces form a ring: face `f`'s right edge is shared with face `f + 1`'s left
//! edge. A horizontal coordinate one step past either side of a face lands on
//! the neighbouring face. Vertical coordinates never wrap.

use crate::types::{FACE_WIDTH, NUM_FACES};

/// Face to the right of `face`
#[inline]
pub fn next_face(face: usize) -> usize {
    (face + 1) % NUM_FACES
}

/// Face to the left of `face`
#[inline]
pub fn previous_face(face: usize) -> usize {
    (face + NUM_FACES - 1) % NUM_FACES
}

/// Map a column relative to `active_face` to the face it lives on and the
/// column within that face.
///
/// Only a single step is taken: columns further than one face width away
/// stay out of `0..FACE_WIDTH` and are rejected by callers.
///
/// ```
/// use cube_tetris_core::topology::resolve;
///
/// assert_eq!(resolve(0, 4), (0, 4));
/// assert_eq!(resolve(0, -1), (3, 9));
/// assert_eq!(resolve(3, 10), (0, 0));
/// ```
pub fn resolve(active_face: usize, x: i32) -> (usize, i32) {
    let width = FACE_WIDTH as i32;
    if x < 0 {
        (previous_face(active_face), x + width)
    } else if x >= width {
        (next_face(active_face), x - width)
    } else {
        (active_face, x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_range_columns_stay_on_face() {
        for face in 0..NUM_FACES {
            for x in 0..FACE_WIDTH as i32 {
                assert_eq!(resolve(face, x), (face, x));
            }
        }
    }

    #[test]
    fn test_one_past_edges_wraps_to_neighbours() {
        let w = FACE_WIDTH as i32;
        for face in 0..NUM_FACES {
            assert_eq!(resolve(face, -1), ((face + 3) % 4, w - 1));
            assert_eq!(resolve(face, w), ((face + 1) % 4, 0));
        }
    }

    #[test]
    fn test_ring_neighbours() {
        assert_eq!(next_face(3), 0);
        assert_eq!(previous_face(0), 3);
        for face in 0..NUM_FACES {
            assert_eq!(previous_face(next_face(face)), face);
        }
    }
}
