//! # Clocks and sleeping
//!
//! POSIX time value types, the cycle-counter readers every other module
//! builds on, `clock_gettime` and `nanosleep`.
//!
//! ## Design Principles
//!
//! - **One clock**: only the kernel's monotonic cycle counter exists; every
//!   other POSIX clock is rejected
//! - **No floating point**: all conversions are integer arithmetic
//! - **Checked conversions**: durations that do not fit the kernel's 32-bit
//!   millisecond argument are rejected, never wrapped

use crate::errno::Errno;
use kernel_api::{Kernel, Precision, SleepDuration, SleepMode};
use serde::{Deserialize, Serialize};

pub const NSEC_PER_SEC: i64 = 1_000_000_000;
pub const NSEC_PER_MSEC: i64 = 1_000_000;
pub const NSEC_PER_USEC: i64 = 1_000;
pub const USEC_PER_SEC: u64 = 1_000_000;

/// Seconds and nanoseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timespec {
    pub tv_sec: u64,
    pub tv_nsec: i64,
}

impl Timespec {
    pub const ZERO: Timespec = Timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };

    pub const fn new(tv_sec: u64, tv_nsec: i64) -> Self {
        Self { tv_sec, tv_nsec }
    }

    /// Splits a microsecond count
    pub const fn from_micros(micros: u64) -> Self {
        Self {
            tv_sec: micros / USEC_PER_SEC,
            tv_nsec: ((micros % USEC_PER_SEC) * 1_000) as i64,
        }
    }

    /// Splits a millisecond count
    pub const fn from_millis(millis: u32) -> Self {
        Self::from_micros(millis as u64 * 1_000)
    }

    pub const fn is_zero(&self) -> bool {
        self.tv_sec == 0 && self.tv_nsec == 0
    }

    /// Whether the nanosecond field is in `[0, 1e9)`
    pub const fn is_normalized(&self) -> bool {
        self.tv_nsec >= 0 && self.tv_nsec < NSEC_PER_SEC
    }

    /// Whether the value is at least one millisecond
    pub const fn is_at_least_one_milli(&self) -> bool {
        self.tv_sec > 0 || self.tv_nsec >= NSEC_PER_MSEC
    }

    /// Converts to whole milliseconds, `None` if not normalized or if the
    /// result does not fit 32 bits
    pub fn to_millis(&self) -> Option<u32> {
        if !self.is_normalized() {
            return None;
        }
        let millis = self
            .tv_sec
            .checked_mul(1_000)?
            .checked_add((self.tv_nsec / NSEC_PER_MSEC) as u64)?;
        u32::try_from(millis).ok()
    }
}

/// Timer setting: first expiry and reload period
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItimerSpec {
    pub it_interval: Timespec,
    pub it_value: Timespec,
}

impl ItimerSpec {
    pub const ZERO: ItimerSpec = ItimerSpec {
        it_interval: Timespec::ZERO,
        it_value: Timespec::ZERO,
    };

    /// One-shot setting
    pub const fn oneshot(value: Timespec) -> Self {
        Self {
            it_interval: Timespec::ZERO,
            it_value: value,
        }
    }

    /// Periodic setting
    pub const fn periodic(value: Timespec, interval: Timespec) -> Self {
        Self {
            it_interval: interval,
            it_value: value,
        }
    }
}

/// POSIX clock identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum ClockId {
    Monotonic = 0,
    Realtime,
    RealtimeAlarm,
    Boottime,
    BoottimeAlarm,
}

/// Reads the cycle counter at the given precision
///
/// `Perm` if the task may not read the counter, `Inval` if the kernel left
/// no value in the exchange area.
pub fn read_time<K: Kernel>(kernel: &mut K, precision: Precision) -> Result<u64, Errno> {
    kernel
        .get_cycle(precision)
        .into_result()
        .map_err(|_| Errno::Perm)?;
    kernel.exchange().read_u64().map_err(|_| Errno::Inval)
}

pub fn read_time_us<K: Kernel>(kernel: &mut K) -> Result<u64, Errno> {
    read_time(kernel, Precision::Microseconds)
}

pub fn read_time_ms<K: Kernel>(kernel: &mut K) -> Result<u64, Errno> {
    read_time(kernel, Precision::Milliseconds)
}

pub fn read_time_ns<K: Kernel>(kernel: &mut K) -> Result<u64, Errno> {
    read_time(kernel, Precision::Nanoseconds)
}

/// Current value of `clock`
///
/// # Errors
///
/// - `Inval` for any clock other than [`ClockId::Monotonic`]
/// - `Perm` when the cycle counter cannot be read
pub fn clock_gettime<K: Kernel>(kernel: &mut K, clock: ClockId) -> Result<Timespec, Errno> {
    if clock != ClockId::Monotonic {
        return Err(Errno::Inval);
    }
    read_time_us(kernel).map(Timespec::from_micros)
}

/// Suspends the caller for `req`
///
/// Requests of a second or more go to the kernel sleep syscall with
/// millisecond granularity. Sub-second requests busy-wait on the microsecond
/// counter, since the kernel cannot sleep for less than its tick.
///
/// Returns the unslept remainder, always zero as sleeps are never cut short
/// without an error.
///
/// # Errors
///
/// - `Inval` if `tv_nsec` is outside `[0, 1e9)` or the duration does not
///   fit the kernel's millisecond argument
/// - `Intr` if the kernel sleep fails
/// - `Perm` if the busy-wait cannot read the clock
pub fn nanosleep<K: Kernel>(kernel: &mut K, req: &Timespec) -> Result<Timespec, Errno> {
    if !req.is_normalized() {
        return Err(Errno::Inval);
    }
    if req.tv_sec > 0 {
        let millis = req.to_millis().ok_or(Errno::Inval)?;
        kernel
            .sleep(SleepDuration::ArbitraryMs(millis), SleepMode::Shallow)
            .into_result()
            .map_err(|_| Errno::Intr)?;
        return Ok(Timespec::ZERO);
    }

    let wait_us = (req.tv_nsec / NSEC_PER_USEC) as u64;
    if wait_us == 0 {
        return Ok(Timespec::ZERO);
    }
    let start = read_time_us(kernel)?;
    loop {
        let now = read_time_us(kernel)?;
        if now.saturating_sub(start) >= wait_us {
            break;
        }
    }
    Ok(Timespec::ZERO)
}
