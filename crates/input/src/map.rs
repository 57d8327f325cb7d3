//! Key mapping from terminal events to game intents.

use arrayvec::ArrayVec;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::types::{FaceDirection, Intent};

/// Most intents gathered between two sends
pub const MAX_BATCH: usize = 32;

/// Map keyboard input to a game intent.
pub fn map_key(key: KeyEvent) -> Option<Intent> {
    if key.kind == KeyEventKind::Release {
        return None;
    }

    match key.code {
        // Movement
        KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::Char('a') | KeyCode::Char('A') => {
            Some(Intent::MoveLeft)
        }
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('L') | KeyCode::Char('d') | KeyCode::Char('D') => {
            Some(Intent::MoveRight)
        }
        KeyCode::Down | KeyCode::Char('j') | KeyCode::Char('J') | KeyCode::Char('s') | KeyCode::Char('S') => {
            Some(Intent::SoftDrop)
        }

        // Rotation
        KeyCode::Up
        | KeyCode::Char('k')
        | KeyCode::Char('K')
        | KeyCode::Char('w')
        | KeyCode::Char('W') => Some(Intent::Rotate),

        // Face change
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Char('[') => {
            Some(Intent::ChangeFace(FaceDirection::Previous))
        }
        KeyCode::Char('e') | KeyCode::Char('E') | KeyCode::Char(']') => {
            Some(Intent::ChangeFace(FaceDirection::Next))
        }

        KeyCode::Char(' ') => Some(Intent::HardDrop),

        // Start / restart
        KeyCode::Enter | KeyCode::Char('r') | KeyCode::Char('R') => Some(Intent::Start),

        _ => None,
    }
}

/// Check if key should quit the client.
///
/// `q` changes face, so only Esc and Ctrl-C quit.
pub fn should_quit(key: KeyEvent) -> bool {
    key.code == KeyCode::Esc
        || (matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
            && key.modifiers.contains(KeyModifiers::CONTROL))
}

/// Intents collected from key presses until the next send.
#[derive(Debug, Clone, Default)]
pub struct IntentBatch {
    intents: ArrayVec<Intent, MAX_BATCH>,
}

impl IntentBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map and queue a key. Returns false if the key is unmapped or the batch is full.
    pub fn push_key(&mut self, key: KeyEvent) -> bool {
        match map_key(key) {
            Some(intent) => self.intents.try_push(intent).is_ok(),
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn as_slice(&self) -> &[Intent] {
        &self.intents
    }

    pub fn clear(&mut self) {
        self.intents.clear();
    }
}
