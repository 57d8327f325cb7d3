//! Cube Tetris (workspace facade crate).
//!
//! Exposes `cube_tetris::{core,adapter,input,types}` while the implementation
//! lives in dedicated crates under `crates/`. The keyboard client used by the
//! `play` subcommand lives in [`client`].

pub mod client;

pub use cube_tetris_adapter as adapter;
pub use cube_tetris_core as core;
pub use cube_tetris_input as input;
pub use cube_tetris_types as types;
