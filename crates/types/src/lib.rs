//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental types used throughout the workspace.
//! All types are pure data structures with no external dependencies, making them
//! usable in any context (core logic, lobby relay, input decoding).
//!
//! # Cube Dimensions
//!
//! The playfield is the lateral surface of a cube: four faces in a ring
//! (0 → 1 → 2 → 3 → 0), each a standard Tetris well.
//!
//! - **Faces**: 4 (indexed 0-3)
//! - **Width**: 10 columns per face (indexed 0-9)
//! - **Height**: 20 rows per face (indexed 0-19, row 0 at the top)
//!
//! # Game Timing Constants
//!
//! Timing values are in milliseconds:
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `TICK_MS` | 16 | Fixed timestep interval (~60 FPS) |
//! | `START_DROP_MS` | 1000 | Gravity at level 1 |
//! | `DROP_STEP_MS` | 75 | Gravity speed-up per level |
//! | `MIN_DROP_MS` | 100 | Gravity floor |
//! | `LOCK_DELAY_MS` | 500 | Grace before a grounded piece commits |
//! | `GAME_OVER_DELAY_MS` | 600 | Collision flash before the terminal state |
//!
//! # Examples
//!
//! ```
//! use cube_tetris_types::{FaceDirection, Intent, PieceKind, FACE_HEIGHT, FACE_WIDTH, NUM_FACES};
//!
//! let piece = PieceKind::from_str("t").unwrap();
//! assert_eq!(piece, PieceKind::T);
//!
//! let intent = Intent::from_str("changeFaceNext").unwrap();
//! assert_eq!(intent, Intent::ChangeFace(FaceDirection::Next));
//!
//! assert_eq!(NUM_FACES, 4);
//! assert_eq!(FACE_WIDTH, 10);
//! assert_eq!(FACE_HEIGHT, 20);
//! ```

/// Number of faces around the cube
pub const NUM_FACES: usize = 4;

/// Face width in cells (10 columns)
pub const FACE_WIDTH: u8 = 10;

/// Face height in cells (20 rows)
pub const FACE_HEIGHT: u8 = 20;

/// Fixed timestep interval in milliseconds (16ms ≈ 60 FPS)
pub const TICK_MS: u32 = 16;

/// Gravity interval at level 1
pub const START_DROP_MS: u32 = 1000;

/// Gravity interval reduction per level
pub const DROP_STEP_MS: u32 = 75;

/// Gravity never gets faster than this
pub const MIN_DROP_MS: u32 = 100;

/// Lock grace once a piece can no longer fall
pub const LOCK_DELAY_MS: u32 = 500;

/// Delay between the spawn overlap and the terminal game-over flag
pub const GAME_OVER_DELAY_MS: u32 = 600;

/// Base points per cleared row; a commit clearing `k` rows scores `k * POINTS_PER_LINE * k`
pub const POINTS_PER_LINE: u32 = 100;

/// Cleared rows needed to advance one level
pub const LINES_PER_LEVEL: u32 = 10;

/// Horizontal kick offsets tried after a rotation, in priority order
pub const ROTATION_KICKS: [i32; 5] = [0, -1, 1, -2, 2];

/// The seven tetromino piece kinds
///
/// - **I**: horizontal bar
/// - **O**: 2x2 square
/// - **T**: T-shaped
/// - **S** / **Z**: skew pieces (mirrors)
/// - **J** / **L**: hooks (mirrors)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl PieceKind {
    /// All kinds, in code order
    pub const ALL: [PieceKind; 7] = [
        PieceKind::I,
        PieceKind::O,
        PieceKind::T,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::J,
        PieceKind::L,
    ];

    /// Parse piece kind from string (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use cube_tetris_types::PieceKind;
    ///
    /// assert_eq!(PieceKind::from_str("i"), Some(PieceKind::I));
    /// assert_eq!(PieceKind::from_str("O"), Some(PieceKind::O));
    /// assert_eq!(PieceKind::from_str("unknown"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "i" => Some(PieceKind::I),
            "o" => Some(PieceKind::O),
            "t" => Some(PieceKind::T),
            "s" => Some(PieceKind::S),
            "z" => Some(PieceKind::Z),
            "j" => Some(PieceKind::J),
            "l" => Some(PieceKind::L),
            _ => None,
        }
    }

    /// Convert to lowercase string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PieceKind::I => "i",
            PieceKind::O => "o",
            PieceKind::T => "t",
            PieceKind::S => "s",
            PieceKind::Z => "z",
            PieceKind::J => "j",
            PieceKind::L => "l",
        }
    }

    /// Cell code used by snapshots and the wire format (1..=7, 0 is empty)
    pub fn code(&self) -> u8 {
        match self {
            PieceKind::I => 1,
            PieceKind::O => 2,
            PieceKind::T => 3,
            PieceKind::S => 4,
            PieceKind::Z => 5,
            PieceKind::J => 6,
            PieceKind::L => 7,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1..=7 => Some(Self::ALL[(code - 1) as usize]),
            _ => None,
        }
    }
}

/// Direction of a controller-initiated face change around the ring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceDirection {
    /// Towards the next owned face (ring order)
    Next,
    /// Towards the previous owned face
    Previous,
}

impl FaceDirection {
    /// Step applied to the index within the owned face list
    pub fn step(&self) -> isize {
        match self {
            FaceDirection::Next => 1,
            FaceDirection::Previous => -1,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "next" | "+" => Some(FaceDirection::Next),
            "prev" | "previous" | "-" => Some(FaceDirection::Previous),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FaceDirection::Next => "next",
            FaceDirection::Previous => "prev",
        }
    }
}

/// Discrete player intents accepted by a game session
///
/// Input decoders (keyboard, network) translate raw events into these.
/// Every intent except [`Intent::Start`] is ignored once the game is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    /// Move piece one cell left (may wrap onto the previous face)
    MoveLeft,
    /// Move piece one cell right (may wrap onto the next face)
    MoveRight,
    /// Drop piece one cell down
    SoftDrop,
    /// Drop piece to the lowest valid row and commit it immediately
    HardDrop,
    /// Rotate piece 90° clockwise with kick search
    Rotate,
    /// Switch the controlled face within the owned faces
    ChangeFace(FaceDirection),
    /// Start a new game (from not-started or game over)
    Start,
}

impl Intent {
    /// Parse intent from its protocol name (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use cube_tetris_types::Intent;
    ///
    /// assert_eq!(Intent::from_str("hardDrop"), Some(Intent::HardDrop));
    /// assert_eq!(Intent::from_str("start"), Some(Intent::Start));
    /// assert_eq!(Intent::from_str("unknown"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "moveleft" => Some(Intent::MoveLeft),
            "moveright" => Some(Intent::MoveRight),
            "softdrop" => Some(Intent::SoftDrop),
            "harddrop" => Some(Intent::HardDrop),
            "rotate" => Some(Intent::Rotate),
            "changefacenext" => Some(Intent::ChangeFace(FaceDirection::Next)),
            "changefaceprev" | "changefaceprevious" => {
                Some(Intent::ChangeFace(FaceDirection::Previous))
            }
            "start" => Some(Intent::Start),
            _ => None,
        }
    }

    /// Convert to camelCase protocol name
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::MoveLeft => "moveLeft",
            Intent::MoveRight => "moveRight",
            Intent::SoftDrop => "softDrop",
            Intent::HardDrop => "hardDrop",
            Intent::Rotate => "rotate",
            Intent::ChangeFace(FaceDirection::Next) => "changeFaceNext",
            Intent::ChangeFace(FaceDirection::Previous) => "changeFacePrev",
            Intent::Start => "start",
        }
    }
}

/// Core-side event emitted after a piece commits.
///
/// Consumed once by observers (see `Session::take_last_event`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LockEvent {
    pub lines_cleared: u32,
    pub score_delta: u32,
    /// Faces that received at least one cell of the committed piece
    pub faces_written: [bool; NUM_FACES],
}

/// A cell on a face grid
///
/// - `None`: Empty cell
/// - `Some(PieceKind)`: Cell filled with the specified piece kind
pub type Cell = Option<PieceKind>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_defaults() {
        assert_eq!(TICK_MS, 16);
        assert_eq!(START_DROP_MS, 1000);
        assert!(MIN_DROP_MS < START_DROP_MS);
        assert_eq!(LOCK_DELAY_MS, 500);
        assert_eq!(POINTS_PER_LINE, 100);
        assert_eq!(LINES_PER_LEVEL, 10);
    }

    #[test]
    fn kick_order_is_fixed() {
        assert_eq!(ROTATION_KICKS, [0, -1, 1, -2, 2]);
    }

    #[test]
    fn piece_codes_roundtrip() {
        for kind in PieceKind::ALL {
            assert_eq!(PieceKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(PieceKind::from_code(0), None);
        assert_eq!(PieceKind::from_code(8), None);
    }

    #[test]
    fn intent_names() {
        assert_eq!(Intent::from_str("moveLeft"), Some(Intent::MoveLeft));
        assert_eq!(Intent::from_str("ROTATE"), Some(Intent::Rotate));
        assert_eq!(
            Intent::from_str("changeFacePrev"),
            Some(Intent::ChangeFace(FaceDirection::Previous))
        );
        assert_eq!(Intent::from_str("hold"), None);
        assert_eq!(Intent::ChangeFace(FaceDirection::Next).as_str(), "changeFaceNext");
    }
}
