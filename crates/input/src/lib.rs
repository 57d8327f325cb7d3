//! Terminal input module.
//!
//! Maps `crossterm` key events into [`crate::types::Intent`]s and batches
//! them for sending. Independent of any UI framework.

pub mod map;

pub use cube_tetris_types as types;

pub use map::{map_key, should_quit, IntentBatch, MAX_BATCH};
