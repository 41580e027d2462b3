//! Virtual clock for the discrete-event simulation.
//!
//! The [`SimClock`] tracks virtual time independently of wall-clock time,
//! advancing only when events are dispatched. This enables deterministic,
//! repeatable runs regardless of host machine speed.

use serde::{Deserialize, Serialize};

/// Microseconds per second of virtual time.
pub const US_PER_SEC: f64 = 1_000_000.0;

/// Convert a duration in seconds to integer microseconds.
///
/// Negative durations are a programming error; they are clamped to zero (the
/// scheduler never travels backwards).
pub fn secs_to_us(secs: f64) -> u64 {
    debug_assert!(secs >= 0.0, "negative duration: {secs}");
    (secs.max(0.0) * US_PER_SEC).round() as u64
}

/// Convert integer microseconds to seconds.
pub fn us_to_secs(us: u64) -> f64 {
    us as f64 / US_PER_SEC
}

/// Virtual simulation clock.
///
/// Time is tracked in microseconds internally for exact heap ordering;
/// configuration and reported values use seconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimClock {
    current_us: u64,
}

impl SimClock {
    /// Create a new clock starting at time zero.
    pub fn new() -> Self {
        Self { current_us: 0 }
    }

    /// Current time in microseconds.
    pub fn now_us(&self) -> u64 {
        self.current_us
    }

    /// Current time in seconds.
    pub fn now_secs(&self) -> f64 {
        us_to_secs(self.current_us)
    }

    /// Advance the clock to a specific time in microseconds.
    ///
    /// # Panics
    ///
    /// Panics if `us` is in the past; a backwards clock corrupts every
    /// reproducibility guarantee the simulator makes.
    pub fn advance_to_us(&mut self, us: u64) {
        assert!(
            us >= self.current_us,
            "cannot move clock backwards: current={}us, target={}us",
            self.current_us,
            us,
        );
        self.current_us = us;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clock_starts_at_zero() {
        let clock = SimClock::new();
        assert_eq!(clock.now_us(), 0);
        assert_eq!(clock.now_secs(), 0.0);
    }

    #[test]
    fn test_advance_to_us() {
        let mut clock = SimClock::new();
        clock.advance_to_us(1_500_000);
        assert_eq!(clock.now_us(), 1_500_000);
        assert!((clock.now_secs() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_advance_to_same_instant_is_allowed() {
        let mut clock = SimClock::new();
        clock.advance_to_us(100);
        clock.advance_to_us(100);
        assert_eq!(clock.now_us(), 100);
    }

    #[test]
    #[should_panic(expected = "cannot move clock backwards")]
    fn test_cannot_go_backwards() {
        let mut clock = SimClock::new();
        clock.advance_to_us(100);
        clock.advance_to_us(50);
    }

    #[test]
    fn test_secs_round_trip() {
        assert_eq!(secs_to_us(0.96), 960_000);
        assert_eq!(secs_to_us(0.0), 0);
        assert!((us_to_secs(secs_to_us(123.456)) - 123.456).abs() < 1e-6);
    }
}
