//! Timer contract tests
//!
//! End-to-end timer behavior as observed by a task: what the kernel alarm
//! is programmed with, when callbacks run and what `timer_gettime` reports.

use libc_core::{ItimerSpec, Timespec};

// ===== Canonical Settings =====
const ONE_SHOT_50MS: ItimerSpec = ItimerSpec::oneshot(Timespec::new(0, 50_000_000));
const PERIODIC_10MS_EVERY_20MS: ItimerSpec =
    ItimerSpec::periodic(Timespec::new(0, 10_000_000), Timespec::new(0, 20_000_000));

// ===== Contract Tests =====
