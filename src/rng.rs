//! Seeded permutations for fragment reordering.
//!
//! Reordered flights must be reproducible, so the shuffle never draws from
//! the thread-local generator: a fresh [`StdRng`] seeded from
//! `Bugs::reorder_seed` is created for every flight.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Deterministic random number generator.
pub struct SeededRng {
    inner: StdRng,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    /// Permute `items` in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.inner);
    }
}

impl std::fmt::Debug for SeededRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeededRng").finish()
    }
}
