//! Monotonic time source.
//!
//! Every freshness, jitter and countdown computation in the HMI core is
//! measured against a single monotonic clock that is constructed once and
//! handed to each component. Wall-clock time is never consulted for safety
//! decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Monotonic clock abstraction.
///
/// Readings start near zero when the clock is created and never go backwards.
pub trait MonotonicClock: Send + Sync {
    /// Nanoseconds elapsed since the clock origin.
    fn elapsed_ns(&self) -> u64;

    /// Microseconds elapsed since the clock origin.
    fn elapsed_us(&self) -> u64 {
        self.elapsed_ns() / 1_000
    }

    /// Milliseconds elapsed since the clock origin.
    fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns() / 1_000_000
    }
}

/// Clock backed by [`std::time::Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose origin is now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for SystemClock {
    fn elapsed_ns(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

/// Manually advanced clock for deterministic tests and replay tools.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ns: AtomicU64,
}

impl ManualClock {
    /// Create a clock reading zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock reading `ms` milliseconds.
    pub fn starting_at_ms(ms: u64) -> Self {
        let clock = Self::new();
        clock.set_ms(ms);
        clock
    }

    /// Advance by `ms` milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.now_ns.fetch_add(ms * 1_000_000, Ordering::SeqCst);
    }

    /// Advance by `us` microseconds.
    pub fn advance_us(&self, us: u64) {
        self.now_ns.fetch_add(us * 1_000, Ordering::SeqCst);
    }

    /// Jump to an absolute reading. Callers must not move the clock backwards.
    pub fn set_ms(&self, ms: u64) {
        self.now_ns.store(ms * 1_000_000, Ordering::SeqCst);
    }
}

impl MonotonicClock for ManualClock {
    fn elapsed_ns(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_units() {
        let clock = ManualClock::new();
        clock.advance_ms(3);
        clock.advance_us(250);

        assert_eq!(clock.elapsed_ns(), 3_250_000);
        assert_eq!(clock.elapsed_us(), 3_250);
        assert_eq!(clock.elapsed_ms(), 3);
    }

    #[test]
    fn test_manual_clock_set() {
        let clock = ManualClock::starting_at_ms(1_000);
        assert_eq!(clock.elapsed_ms(), 1_000);

        clock.set_ms(1_500);
        assert_eq!(clock.elapsed_ms(), 1_500);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let first = clock.elapsed_ns();
        let second = clock.elapsed_ns();
        assert!(second >= first);
    }
}
