//! Time-related syscall arguments

use serde::{Deserialize, Serialize};

/// Unit of a cycle counter read
///
/// The kernel converts the raw cycle count before writing it into the
/// exchange area, so callers never need to know the core frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Precision {
    /// Raw cycles
    Cycle,
    /// Nanoseconds since boot
    Nanoseconds,
    /// Microseconds since boot
    Microseconds,
    /// Milliseconds since boot
    Milliseconds,
}

impl Precision {
    /// Converts a nanosecond count to this precision
    ///
    /// `Cycle` is treated as nanoseconds (one cycle per nanosecond), which is
    /// how simulated kernels report it.
    pub const fn from_nanos(self, nanos: u64) -> u64 {
        match self {
            Precision::Cycle | Precision::Nanoseconds => nanos,
            Precision::Microseconds => nanos / 1_000,
            Precision::Milliseconds => nanos / 1_000_000,
        }
    }
}

/// Alarm control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlarmFlag {
    /// One-shot alarm, replacing any pending one
    Start,
    /// Periodic alarm, replacing any pending one
    StartPeriodic,
    /// Cancel the pending alarm
    Stop,
}

/// Sleep depth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SleepMode {
    /// Wake up on any event for the task
    Shallow,
    /// Wake up only when the duration elapsed
    Deep,
}

/// Sleep duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SleepDuration {
    D1ms,
    D2ms,
    D5ms,
    D10ms,
    D20ms,
    D50ms,
    ArbitraryMs(u32),
}

impl SleepDuration {
    /// Returns the duration in milliseconds
    pub const fn as_millis(&self) -> u32 {
        match self {
            SleepDuration::D1ms => 1,
            SleepDuration::D2ms => 2,
            SleepDuration::D5ms => 5,
            SleepDuration::D10ms => 10,
            SleepDuration::D20ms => 20,
            SleepDuration::D50ms => 50,
            SleepDuration::ArbitraryMs(ms) => *ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precision_conversion() {
        let nanos = 1_234_567_890;
        assert_eq!(Precision::Nanoseconds.from_nanos(nanos), 1_234_567_890);
        assert_eq!(Precision::Microseconds.from_nanos(nanos), 1_234_567);
        assert_eq!(Precision::Milliseconds.from_nanos(nanos), 1_234);
        assert_eq!(Precision::Cycle.from_nanos(nanos), nanos);
    }

    #[test]
    fn test_sleep_duration_millis() {
        assert_eq!(SleepDuration::D1ms.as_millis(), 1);
        assert_eq!(SleepDuration::D50ms.as_millis(), 50);
        assert_eq!(SleepDuration::ArbitraryMs(1500).as_millis(), 1500);
    }
}
