//! Periodic spawn trigger.

use std::time::Duration;

/// Accumulates elapsed time and fires once per `interval`.
///
/// The ticker only measures time. Whether a firing actually produces an
/// item (spawning enabled, global cap not reached) is decided by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticker {
    interval: Duration,
    elapsed: Duration,
}

impl Ticker {
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            elapsed: Duration::ZERO,
        }
    }

    /// Adds `dt` to the timer. Returns `true` when the timer reached the
    /// interval, in which case it restarts from zero.
    ///
    /// At most one firing per call, however large `dt` is.
    pub fn advance(&mut self, dt: Duration) -> bool {
        self.elapsed = self.elapsed.saturating_add(dt);
        if self.elapsed >= self.interval {
            self.elapsed = Duration::ZERO;
            true
        } else {
            false
        }
    }

    /// Time accumulated since the last firing.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn fires_when_interval_reached() {
        let mut ticker = Ticker::new(MS * 10);
        assert!(!ticker.advance(MS * 4));
        assert!(!ticker.advance(MS * 5));
        assert!(ticker.advance(MS));
        assert_eq!(ticker.elapsed(), Duration::ZERO);
    }

    #[test]
    fn overshoot_is_discarded() {
        let mut ticker = Ticker::new(MS * 10);
        assert!(ticker.advance(MS * 35));
        assert_eq!(ticker.elapsed(), Duration::ZERO);
        assert!(!ticker.advance(MS * 9));
    }

    #[test]
    fn zero_interval_fires_every_advance() {
        let mut ticker = Ticker::new(Duration::ZERO);
        assert!(ticker.advance(Duration::ZERO));
        assert!(ticker.advance(MS));
    }
}
