//! Grid module - the four face grids around the cube
//!
//! Each face is a 10x20 grid where each cell can be empty or filled with a piece kind.
//! Uses a flat array for better cache locality and zero-allocation.
//! Coordinates: (x, y) where x ranges 0..9 (left to right), y ranges 0..19 (top to bottom).
//!
//! Every mutation bumps the face's revision counter, so observers can tell
//! which faces changed between two snapshots without diffing cells.

use arrayvec::ArrayVec;

use crate::types::{Cell, FACE_HEIGHT, FACE_WIDTH, NUM_FACES};

/// Total number of cells on one face
const FACE_SIZE: usize = (FACE_WIDTH as usize) * (FACE_HEIGHT as usize);

/// One face of the cube - 10 columns x 20 rows using flat array storage
#[derive(Debug, Clone, PartialEq)]
pub struct FaceGrid {
    /// Flat array of cells, row-major order (y * WIDTH + x)
    cells: [Cell; FACE_SIZE],
    revision: u32,
}

impl FaceGrid {
    /// Create a new empty face
    pub fn new() -> Self {
        Self {
            cells: [None; FACE_SIZE],
            revision: 0,
        }
    }

    /// Calculate flat index from (x, y) coordinates
    #[inline(always)]
    fn index(x: i32, y: i32) -> Option<usize> {
        if x < 0 || x >= FACE_WIDTH as i32 || y < 0 || y >= FACE_HEIGHT as i32 {
            return None;
        }
        Some((y as usize) * (FACE_WIDTH as usize) + (x as usize))
    }

    /// Get cell at position (x, y)
    /// Returns None if out of bounds
    pub fn get(&self, x: i32, y: i32) -> Option<Cell> {
        Self::index(x, y).map(|idx| self.cells[idx])
    }

    /// Set cell at position (x, y)
    /// Returns false if out of bounds
    pub fn set(&mut self, x: i32, y: i32, cell: Cell) -> bool {
        match Self::index(x, y) {
            Some(idx) => {
                self.cells[idx] = cell;
                self.revision = self.revision.wrapping_add(1);
                true
            }
            None => false,
        }
    }

    /// Check if position is occupied (within bounds and filled)
    pub fn is_occupied(&self, x: i32, y: i32) -> bool {
        matches!(self.get(x, y), Some(Some(_)))
    }

    /// Check if a row is completely filled
    pub fn is_row_full(&self, y: usize) -> bool {
        if y >= FACE_HEIGHT as usize {
            return false;
        }
        let start = y * FACE_WIDTH as usize;
        let end = start + FACE_WIDTH as usize;
        self.cells[start..end].iter().all(|cell| cell.is_some())
    }

    /// Remove every row flagged in `full` and insert empty rows at the top.
    ///
    /// Uses a two-pointer pass from the bottom, so the grid keeps exactly
    /// `FACE_HEIGHT` rows and surviving rows keep their relative order.
    fn compact(&mut self, full: &[bool; FACE_HEIGHT as usize]) {
        let width = FACE_WIDTH as usize;
        let mut write_y = FACE_HEIGHT as usize;

        for read_y in (0..FACE_HEIGHT as usize).rev() {
            if full[read_y] {
                continue;
            }
            write_y -= 1;
            if write_y != read_y {
                let src_start = read_y * width;
                let dst_start = write_y * width;
                self.cells
                    .copy_within(src_start..src_start + width, dst_start);
            }
        }

        for cell in &mut self.cells[..write_y * width] {
            *cell = None;
        }

        self.revision = self.revision.wrapping_add(1);
    }

    /// Get a reference to the internal cells array
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Mutation counter; changes whenever any cell may have changed
    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Clear the entire face
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            *cell = None;
        }
        self.revision = self.revision.wrapping_add(1);
    }

    /// Write cell codes (0 = empty, 1..=7 piece kinds) into a fixed grid
    pub fn write_u8_grid(&self, out: &mut [[u8; FACE_WIDTH as usize]; FACE_HEIGHT as usize]) {
        let width = FACE_WIDTH as usize;
        for (y, row) in out.iter_mut().enumerate() {
            for (x, code) in row.iter_mut().enumerate() {
                *code = self.cells[y * width + x].map(|k| k.code()).unwrap_or(0);
            }
        }
    }

    /// Convert to 2D vector for testing/display
    pub fn to_cells(&self) -> Vec<Vec<Cell>> {
        let width = FACE_WIDTH as usize;
        (0..FACE_HEIGHT as usize)
            .map(|y| {
                let start = y * width;
                self.cells[start..start + width].to_vec()
            })
            .collect()
    }
}

impl Default for FaceGrid {
    fn default() -> Self {
        Self::new()
    }
}

/// The four faces of the cube, indexed in ring order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CubeGrids {
    faces: [FaceGrid; NUM_FACES],
}

impl CubeGrids {
    pub fn new() -> Self {
        Self::default()
    }

    /// Face by index; panics if `face >= NUM_FACES`
    pub fn face(&self, face: usize) -> &FaceGrid {
        &self.faces[face]
    }

    pub fn face_mut(&mut self, face: usize) -> &mut FaceGrid {
        &mut self.faces[face]
    }

    pub fn faces(&self) -> &[FaceGrid; NUM_FACES] {
        &self.faces
    }

    /// Occupancy of (x, y) on `face`; anything out of bounds reads as empty
    pub fn is_occupied(&self, face: usize, x: i32, y: i32) -> bool {
        self.faces
            .get(face)
            .map(|f| f.is_occupied(x, y))
            .unwrap_or(false)
    }

    /// A row is full only when it is full on every face
    pub fn is_cube_row_full(&self, y: usize) -> bool {
        self.faces.iter().all(|f| f.is_row_full(y))
    }

    /// Clear all full-cube rows from every face at once.
    ///
    /// Returns the cleared row indices, top to bottom. Faces are only touched
    /// when at least one row is cleared.
    pub fn clear_full_rows(&mut self) -> ArrayVec<usize, { FACE_HEIGHT as usize }> {
        let mut full = [false; FACE_HEIGHT as usize];
        let mut cleared = ArrayVec::new();

        for (y, flag) in full.iter_mut().enumerate() {
            if self.is_cube_row_full(y) {
                *flag = true;
                cleared.push(y);
            }
        }

        if !cleared.is_empty() {
            for face in &mut self.faces {
                face.compact(&full);
            }
        }

        cleared
    }

    pub fn clear(&mut self) {
        for face in &mut self.faces {
            face.clear();
        }
    }

    pub fn revisions(&self) -> [u32; NUM_FACES] {
        std::array::from_fn(|i| self.faces[i].revision())
    }
}
