//! Frame clock.
//!
//! A single-writer, multi-reader scalar holding the elapsed time of the
//! current cycle. The controlling thread writes it once between join and
//! dispatch; systems read it freely while the cycle runs.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;

/// The per-cycle elapsed time, shared with every worker.
#[derive(Debug, Default)]
pub struct FrameClock {
    /// `f64` bits of the current delta.
    delta: AtomicU64,
    /// Number of updates so far.
    frame: AtomicU64,
}

impl FrameClock {
    /// Create a clock reading zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish the elapsed seconds for the next cycle.
    ///
    /// Negative or non-finite input is clamped to zero.
    pub fn update(&self, delta: f64) {
        let delta = if delta.is_finite() && delta >= 0.0 {
            delta
        } else {
            warn!(delta, "invalid frame delta, clamping to zero");
            0.0
        };
        // Release pairs with the pool's queue handoff, which already orders
        // this write before any subtask of the next dispatch.
        self.delta.store(delta.to_bits(), Ordering::Release);
        self.frame.fetch_add(1, Ordering::Release);
    }

    /// Elapsed seconds since the previous cycle.
    #[must_use]
    pub fn elapsed(&self) -> f64 {
        f64::from_bits(self.delta.load(Ordering::Acquire))
    }

    /// Number of times [`FrameClock::update`] has been called.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_starts_at_zero() {
        let clock = FrameClock::new();
        assert_eq!(clock.elapsed(), 0.0);
        assert_eq!(clock.frame(), 0);
    }

    #[test]
    fn test_update_publishes_delta() {
        let clock = FrameClock::new();
        clock.update(1.0 / 60.0);
        assert_eq!(clock.elapsed(), 1.0 / 60.0);
        assert_eq!(clock.frame(), 1);
    }

    #[test]
    fn test_invalid_delta_clamped() {
        let clock = FrameClock::new();
        clock.update(-1.0);
        assert_eq!(clock.elapsed(), 0.0);
        clock.update(f64::NAN);
        assert_eq!(clock.elapsed(), 0.0);
        clock.update(f64::INFINITY);
        assert_eq!(clock.elapsed(), 0.0);
        assert_eq!(clock.frame(), 3);
    }

    #[test]
    fn test_readers_see_stable_value() {
        let clock = Arc::new(FrameClock::new());
        clock.update(0.25);
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let clock = Arc::clone(&clock);
                std::thread::spawn(move || (0..1000).all(|_| clock.elapsed() == 0.25))
            })
            .collect();
        for reader in readers {
            assert!(reader.join().unwrap());
        }
    }
}
