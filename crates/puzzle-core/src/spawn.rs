use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::board::{Board, PlacedTile};

/// Probability that a spawned tile is a 4 rather than a 2.
pub const DEFAULT_FOUR_PROBABILITY: f64 = 0.1;

/// Tile spawner with an injected, seedable RNG so runs are reproducible.
#[derive(Debug)]
pub struct SpawnPolicy {
    rng: StdRng,
    four_probability: f64,
}

impl SpawnPolicy {
    pub fn new(seed: u64) -> Self {
        Self::with_four_probability(seed, DEFAULT_FOUR_PROBABILITY)
    }

    pub fn with_four_probability(seed: u64, four_probability: f64) -> Self {
        SpawnPolicy {
            rng: StdRng::seed_from_u64(seed),
            four_probability: four_probability.clamp(0.0, 1.0),
        }
    }

    /// Reseed the RNG, e.g. at new-game.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Insert one tile (4 with `four_probability`, else 2) into a uniformly
    /// chosen empty cell. `None` on a full board: the guard is silent
    /// because a changing slide always frees a cell first, so a full board
    /// here is unreachable through normal play.
    pub fn spawn(&mut self, board: &mut Board) -> Option<PlacedTile> {
        let value = if self.rng.gen_bool(self.four_probability) {
            4
        } else {
            2
        };
        self.insert(board, value)
    }

    /// Manual insertion: always a 4, bypassing the probability split.
    /// `None` on a full board.
    pub fn force_four(&mut self, board: &mut Board) -> Option<PlacedTile> {
        self.insert(board, 4)
    }

    fn insert(&mut self, board: &mut Board, value: u32) -> Option<PlacedTile> {
        let empties = board.empty_positions();
        if empties.is_empty() {
            return None;
        }
        let pos = empties[self.rng.gen_range(0..empties.len())];
        Some(board.place_new(pos, value))
    }
}
