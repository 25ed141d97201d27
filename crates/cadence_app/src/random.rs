//! Randomness collaborator.
//!
//! Spawning systems ask a [`RandomProvider`] for an independent stream per
//! key instead of sharing one generator, so batches running on different
//! workers draw the same numbers no matter how they interleave.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Source of deterministic random streams.
pub trait RandomProvider: Send + Sync + 'static {
    /// Generator type handed out per stream.
    type Rng: RngCore;

    /// Returns the stream for `key`. Equal keys yield equal streams.
    fn stream(&self, key: u64) -> Self::Rng;
}

/// ChaCha8 streams derived from one seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededRandom {
    seed: u64,
}

impl SeededRandom {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RandomProvider for SeededRandom {
    type Rng = ChaCha8Rng;

    fn stream(&self, key: u64) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        rng.set_stream(key);
        rng
    }
}

/// Packs a frame number and batch index into a stream key.
#[must_use]
pub fn stream_key(frame: u64, batch: usize) -> u64 {
    (frame << 32) ^ batch as u64
}
