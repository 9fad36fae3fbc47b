//! # Kernel API
//!
//! This crate defines the syscall surface a task sees from the microkernel.
//!
//! ## Philosophy
//!
//! The kernel provides **mechanisms** reached through a handful of syscalls:
//! - IPC send and event wait (one event per wait)
//! - A single per-task alarm
//! - Cycle counter reads at a chosen precision
//! - Signals and entropy
//!
//! Every syscall returns a [`Status`]. Results that carry data (an event, a
//! timestamp, entropy) are delivered through the task's [`ExchangeArea`],
//! a small fixed region shared with the kernel.
//!
//! ## Design Goals
//!
//! 1. **Testability**: The whole surface is a trait, so it can be simulated
//! 2. **No allocation**: Usable from `no_std` code with static memory only
//! 3. **Explicitness**: Payloads only move through the exchange area
//!
//! ## Non-Goals
//!
//! This is NOT the POSIX layer. POSIX semantics (errno, queues, timers)
//! are built on top of it by `libc_core`.

#![cfg_attr(not(test), no_std)]

pub mod error;
pub mod exchange;
pub mod kernel;
pub mod time;

pub use error::Status;
pub use exchange::{
    EventHeader, ExchangeArea, ExchangeEvent, EXCHANGE_AREA_LEN, EXCHANGE_HEADER_LEN,
    EXCHANGE_PAYLOAD_LEN,
};
pub use kernel::{EventKind, Kernel, TaskHandle, WaitTimeout};
pub use time::{AlarmFlag, Precision, SleepDuration, SleepMode};
