//! # C Library Contract Tests
//!
//! This crate provides "golden" tests for the C library's binary and
//! behavioral contracts to ensure they don't drift accidentally over time.
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: ABI values are written out as literals
//! - **Testability first**: Contract tests fail when a value or a wire
//!   layout changes
//! - **Mechanism not policy**: Define what must be stable, not how to use it
//!
//! ## Structure
//!
//! Each area has a module with contract tests that verify:
//! - Numeric values shared with C callers (errno, flags, signal numbers)
//! - The datagram layout of message queues
//! - End-to-end timer behavior over the simulated kernel
//! - Serialized representations of the value types

pub mod errno;
pub mod message_queue;
pub mod signals;
pub mod timers;

/// Common test helpers for contract validation
pub mod test_helpers {
    use libc_core::{Errno, Libc};
    use serde::Serialize;
    use sim_kernel::SimulatedKernel;

    /// Creates a C library instance over a fresh simulated kernel
    pub fn create_test_libc() -> Libc<SimulatedKernel> {
        Libc::new(SimulatedKernel::new())
    }

    /// Advances virtual time one millisecond at a time, running the timer
    /// entry point whenever the kernel alarm expires
    ///
    /// Returns how many times the entry point ran.
    pub fn drive_alarms(libc: &mut Libc<SimulatedKernel>, millis: u64) -> usize {
        let mut runs = 0;
        for _ in 0..millis {
            libc.kernel_mut().advance_millis(1);
            if libc.kernel_mut().take_due_alarm() {
                assert_eq!(libc.timer_handler(), 0, "timer entry point failed");
                runs += 1;
            }
        }
        runs
    }

    /// Verifies a call failed with the expected sentinel and errno
    pub fn verify_failure(libc: &Libc<SimulatedKernel>, ret: i64, expected: Errno) {
        assert_eq!(ret, -1, "Expected failure sentinel, got {}", ret);
        assert_eq!(
            libc.errno(),
            Some(expected),
            "errno changed: expected {:?}, got {:?}",
            expected,
            libc.errno()
        );
    }

    /// Verifies the JSON form of a value stays the same
    pub fn verify_json<T: Serialize>(value: &T, expected: &str) {
        let json = serde_json::to_string(value).expect("Failed to serialize value");
        assert_eq!(
            json, expected,
            "Serialized form changed: expected '{}', got '{}'",
            expected, json
        );
    }
}
