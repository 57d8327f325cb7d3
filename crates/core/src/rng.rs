//! RNG module - deterministic piece generation
//!
//! Pieces are drawn independently and uniformly from the seven kinds by
//! default, so long runs of the same kind are possible. A 7-bag randomizer
//! (each bag holds one of every kind, shuffled) is available as an opt-in.
//!
//! Both use a simple LCG so the same seed always produces the same game.

use crate::types::PieceKind;

/// Simple LCG (Linear Congruential Generator) RNG
/// Uses constants from Numerical Recipes
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u32,
}

impl SimpleRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u32) -> Self {
        // Avoid 0 seed which would produce all zeros
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u32
    pub fn next_u32(&mut self) -> u32 {
        // LCG formula: (a * state + c) mod m
        // Using Numerical Recipes constants: a=1664525, c=1013904223, m=2^32
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }

    /// Generate random value in range [0, max)
    pub fn next_range(&mut self, max: u32) -> u32 {
        // The high bits of an LCG are far better distributed than the low ones.
        ((self.next_u32() >> 16) % max.max(1)) as u32
    }

    /// Shuffle a slice using Fisher-Yates
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.next_range((i + 1) as u32) as usize;
            slice.swap(i, j);
        }
    }

    pub fn state(&self) -> u32 {
        self.state
    }
}

/// How the next piece kind is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Randomizer {
    /// Independent uniform draws over the seven kinds
    #[default]
    Uniform,
    /// Shuffled bags of all seven kinds
    Bag,
}

impl Randomizer {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "uniform" | "random" => Some(Randomizer::Uniform),
            "bag" | "7bag" | "7-bag" => Some(Randomizer::Bag),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Randomizer::Uniform => "uniform",
            Randomizer::Bag => "bag",
        }
    }
}

/// Piece generator
#[derive(Debug, Clone)]
pub struct PieceQueue {
    randomizer: Randomizer,
    /// Current bag of pieces (bag mode only)
    bag: [PieceKind; 7],
    /// Index into current bag
    bag_index: usize,
    rng: SimpleRng,
}

impl PieceQueue {
    /// Create a new piece queue with the given seed
    pub fn new(seed: u32, randomizer: Randomizer) -> Self {
        Self {
            randomizer,
            bag: PieceKind::ALL,
            // Forces a fresh shuffle on the first bag draw.
            bag_index: 7,
            rng: SimpleRng::new(seed),
        }
    }

    /// Generate a new shuffled bag
    fn refill_bag(&mut self) {
        self.bag = PieceKind::ALL;
        self.rng.shuffle(&mut self.bag);
        self.bag_index = 0;
    }

    /// Draw the next piece from the queue
    pub fn draw(&mut self) -> PieceKind {
        match self.randomizer {
            Randomizer::Uniform => PieceKind::ALL[self.rng.next_range(7) as usize],
            Randomizer::Bag => {
                if self.bag_index >= 7 {
                    self.refill_bag();
                }
                let piece = self.bag[self.bag_index];
                self.bag_index += 1;
                piece
            }
        }
    }

    pub fn randomizer(&self) -> Randomizer {
        self.randomizer
    }

    /// Get the current RNG state (for restarting game with same sequence)
    pub fn seed(&self) -> u32 {
        self.rng.state()
    }
}

impl Default for PieceQueue {
    fn default() -> Self {
        Self::new(1, Randomizer::Uniform)
    }
}
