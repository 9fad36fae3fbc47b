//! Signal contract tests
//!
//! Signal numbers are assigned by the kernel and must match it.

use libc_core::Signal;

// ===== Canonical Values =====
const GOLDEN_SIGNALS: [(Signal, u32); 12] = [
    (Signal::Abort, 1),
    (Signal::Alarm, 2),
    (Signal::Bus, 3),
    (Signal::Cont, 4),
    (Signal::Ill, 5),
    (Signal::Io, 6),
    (Signal::Pipe, 7),
    (Signal::Poll, 8),
    (Signal::Term, 9),
    (Signal::Trap, 10),
    (Signal::Usr1, 11),
    (Signal::Usr2, 12),
];

// ===== Contract Tests =====
