//! Core game logic - pure, deterministic, and testable
//!
//! This crate contains the rules of four-face cube Tetris: four linked face
//! grids, the wrap rule that carries a piece onto the neighbouring face, the
//! shared-edge collision rule, rotation with kick search, committing, and
//! rows that only clear once they are full on all four faces.
//!
//! It has **zero dependencies** on UI, networking, or I/O:
//!
//! - **Deterministic**: Same seed produces identical games
//! - **Synchronous**: Every operation returns immediately; timers advance only via `tick`
//! - **Silent rejection**: Illegal moves return `false` and change nothing
//!
//! # Module Structure
//!
//! - [`piece`]: Shape matrices and the immutable falling piece
//! - [`grid`]: The four 10x20 face grids with revision counters
//! - [`topology`]: Face ring and the `resolve` wrap rule
//! - [`collision`]: Placement validity across faces
//! - [`movement`]: Shift, wrap, rotate with kicks, hard drop target
//! - [`placement`]: Commit and full-cube row clearing
//! - [`scoring`]: Quadratic line-clear score, levels, gravity curve
//! - [`rng`]: Seeded uniform or 7-bag piece generation
//! - [`session`]: The per-player state machine
//! - [`snapshot`]: Plain-data session view
//!
//! # Example
//!
//! ```
//! use cube_tetris_core::{Phase, Session};
//! use cube_tetris_types::{FaceDirection, Intent};
//!
//! let mut session = Session::new(12345);
//! session.apply_intent(Intent::Start);
//! assert_eq!(session.phase(), Phase::Active);
//!
//! session.apply_intent(Intent::ChangeFace(FaceDirection::Next));
//! assert_eq!(session.active_face(), 1);
//!
//! session.apply_intent(Intent::HardDrop);
//! assert_eq!(session.score(), 0);
//! ```
//!
//! # Timing
//!
//! - **Gravity**: 1000ms at level 1, 75ms faster per level, never below 100ms
//! - **Lock grace**: 500ms once the piece cannot fall
//! - **Game over**: 600ms after the spawn overlaps before the session freezes
//!
//! Call [`Session::tick`](session::Session::tick) with the elapsed time.

pub mod collision;
pub mod grid;
pub mod movement;
pub mod piece;
pub mod placement;
pub mod rng;
pub mod scoring;
pub mod session;
pub mod snapshot;
pub mod topology;

pub use cube_tetris_types as types;

// Re-export commonly used types for convenience
pub use collision::{is_grounded, is_valid_placement, piece_fits};
pub use grid::{CubeGrids, FaceGrid};
pub use movement::{hard_drop_target, try_rotate, try_shift, Placement};
pub use piece::{Piece, Shape};
pub use placement::{commit, CommitOutcome};
pub use rng::{PieceQueue, Randomizer, SimpleRng};
pub use scoring::{drop_interval_ms, level_for_lines, line_clear_score};
pub use session::{Phase, Session};
pub use snapshot::{FaceCodes, GameSnapshot, TimersSnapshot};
pub use topology::resolve;
