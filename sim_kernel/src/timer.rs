//! # Simulated Clock
//!
//! Deterministic cycle counter for testing.
//!
//! ## Philosophy
//!
//! **Determinism enables thorough testing.**
//!
//! The clock only advances when told to: explicitly through `advance_*`,
//! or implicitly by a fixed step on every read when auto-advance is set.
//! Auto-advance is what lets busy-wait loops (which poll the cycle counter
//! until enough time passed) terminate under test.

/// Simulated monotonic clock with nanosecond resolution
///
/// # Examples
///
/// ```
/// use sim_kernel::timer::SimClock;
///
/// let mut clock = SimClock::new();
/// assert_eq!(clock.now_nanos(), 0);
///
/// clock.advance_millis(2);
/// assert_eq!(clock.now_micros(), 2_000);
/// ```
#[derive(Debug, Clone)]
pub struct SimClock {
    /// Current time in nanoseconds
    nanos: u64,
    /// Nanoseconds added after each syscall read
    step_per_read: u64,
}

impl SimClock {
    /// Creates a clock starting at 0 without auto-advance
    pub fn new() -> Self {
        Self {
            nanos: 0,
            step_per_read: 0,
        }
    }

    /// Creates a clock starting at a given microsecond count
    ///
    /// Useful for tests that need a non-zero baseline.
    pub fn with_initial_micros(micros: u64) -> Self {
        Self {
            nanos: micros * 1_000,
            step_per_read: 0,
        }
    }

    /// Makes every read advance the clock by `step_nanos`
    pub fn with_auto_advance(mut self, step_nanos: u64) -> Self {
        self.step_per_read = step_nanos;
        self
    }

    /// Advances the clock by nanoseconds
    ///
    /// # Panics
    ///
    /// Panics if advancing would overflow u64.
    pub fn advance_nanos(&mut self, delta: u64) {
        self.nanos = self.nanos.checked_add(delta).expect("Clock overflow");
    }

    /// Advances the clock by microseconds
    pub fn advance_micros(&mut self, delta: u64) {
        self.advance_nanos(delta * 1_000);
    }

    /// Advances the clock by milliseconds
    pub fn advance_millis(&mut self, delta: u64) {
        self.advance_nanos(delta * 1_000_000);
    }

    /// Sets the clock to an absolute nanosecond count
    ///
    /// # Panics
    ///
    /// Panics if `nanos` is in the past (would violate monotonicity).
    pub fn set_nanos(&mut self, nanos: u64) {
        assert!(
            nanos >= self.nanos,
            "Cannot set clock backwards: {} < {}",
            nanos,
            self.nanos
        );
        self.nanos = nanos;
    }

    /// Current time in nanoseconds, without advancing
    pub fn now_nanos(&self) -> u64 {
        self.nanos
    }

    /// Current time in microseconds, without advancing
    pub fn now_micros(&self) -> u64 {
        self.nanos / 1_000
    }

    /// Reads the clock the way a syscall does: returns the current time,
    /// then applies the auto-advance step
    pub fn read(&mut self) -> u64 {
        let now = self.nanos;
        self.nanos = self.nanos.saturating_add(self.step_per_read);
        now
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}
