//! # Error numbers
//!
//! POSIX error categories with the platform's hardened values, and the
//! per-thread last-error slots.
//!
//! The numeric values are 32-bit constants with a large hamming distance
//! between each other and no zero value, so that a corrupted or uninitialised
//! errno never reads as a valid code.

use crate::config::MAX_THREADS_PER_TASK;
use core::sync::atomic::{AtomicU32, Ordering};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// POSIX error identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[repr(u32)]
pub enum Errno {
    #[error("operation not permitted")]
    Perm = 0x2af5_e248,
    #[error("no such entry")]
    NoEnt = 0x3999_3cc3,
    #[error("no such process")]
    Srch = 0x3f34_f248,
    #[error("interrupted system call")]
    Intr = 0x41de_4352,
    #[error("I/O error")]
    Io = 0x455a_5555,
    #[error("argument too big")]
    TooBig = 0x6a55_5a5a,
    #[error("bad descriptor")]
    BadF = 0x753c_95a5,
    #[error("try again")]
    Again = 0x7aaa_5aa5,
    #[error("out of memory")]
    NoMem = 0x7f38_a4df,
    #[error("permission denied")]
    Acces = 0xc9a9_de4d,
    #[error("bad address")]
    Fault = 0xc9b3_682b,
    #[error("resource busy")]
    Busy = 0xcb0b_87b8,
    #[error("already exists")]
    Exist = 0xcc1a_0dcf,
    #[error("invalid argument")]
    Inval = 0xcfdc_42ff,
    #[error("result out of range")]
    Range = 0xf811_0a2d,
    #[error("operation not supported")]
    NotSup = 0xfbac_fec0,
}

impl Errno {
    const ALL: [Errno; 16] = [
        Errno::Perm,
        Errno::NoEnt,
        Errno::Srch,
        Errno::Intr,
        Errno::Io,
        Errno::TooBig,
        Errno::BadF,
        Errno::Again,
        Errno::NoMem,
        Errno::Acces,
        Errno::Fault,
        Errno::Busy,
        Errno::Exist,
        Errno::Inval,
        Errno::Range,
        Errno::NotSup,
    ];

    /// Raw errno value
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Decodes a raw value; anything else (including 0) is `None`
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.code() == code)
    }
}

/// Last-error slots, one per thread of the task
///
/// A slot holds 0 until the first failing call on that thread.
#[derive(Debug)]
pub struct ErrnoTable {
    slots: [AtomicU32; MAX_THREADS_PER_TASK],
}

impl ErrnoTable {
    pub const fn new() -> Self {
        Self {
            slots: [const { AtomicU32::new(0) }; MAX_THREADS_PER_TASK],
        }
    }

    /// Records `errno` for `thread`; out-of-range threads are ignored
    pub fn set(&self, thread: usize, errno: Errno) {
        if let Some(slot) = self.slots.get(thread) {
            slot.store(errno.code(), Ordering::SeqCst);
        }
    }

    /// Last error of `thread`, `None` if never set
    pub fn get(&self, thread: usize) -> Option<Errno> {
        self.slots
            .get(thread)
            .and_then(|slot| Errno::from_code(slot.load(Ordering::SeqCst)))
    }

    /// Resets every slot to "never set"
    pub fn clear(&self) {
        for slot in &self.slots {
            slot.store(0, Ordering::SeqCst);
        }
    }
}

impl Default for ErrnoTable {
    fn default() -> Self {
        Self::new()
    }
}
