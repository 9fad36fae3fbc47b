//! # libc_core
//!
//! The stateful part of the C library of a task running on the
//! capability microkernel: error numbers, message queues, timers, clocks,
//! signals and random numbers, built on the syscall surface of
//! [`kernel_api`]. A few stateless helpers (byte order, absolute values)
//! sit alongside.
//!
//! ## Philosophy
//!
//! - **No heap**: every table has a fixed capacity set in [`config`]
//! - **Kernel as a trait**: everything is generic over
//!   [`kernel_api::Kernel`], so the same code runs on the real kernel and on
//!   `sim_kernel` under test
//! - **Typed core, C edge**: the engines return `Result<_, Errno>`;
//!   [`Libc`] turns that into sentinel returns and errno
//!
//! ## Example
//!
//! ```ignore
//! use libc_core::{Libc, MsgFlags};
//!
//! let mut libc = Libc::new(kernel);
//! let qid = libc.msgget(peer, MsgFlags::CREAT);
//! if libc.msgsnd(qid, 1, b"hello", MsgFlags::empty()) < 0 {
//!     log::warn!("send failed: {:?}", libc.errno());
//! }
//! ```

#![cfg_attr(not(test), no_std)]

pub mod assert;
pub mod config;
pub mod context;
pub mod errno;
pub mod inet;
pub mod msg;
pub mod random;
pub mod signal;
pub mod stdlib;
pub mod time;
pub mod timer;

pub use context::{Libc, MsgBuf, PthreadT};
pub use errno::{Errno, ErrnoTable};
pub use inet::{htonl, htons, ntohl, ntohs};
pub use msg::{MsgFlags, MsgQueueEngine, Received, IPC_PRIVATE};
pub use random::{Lcg, RAND_MAX};
pub use signal::{NotifyFn, SigEvent, SigSet, SigVal, SigevNotify, Signal};
pub use stdlib::{abs, imaxabs, labs, llabs};
pub use time::{ClockId, ItimerSpec, Timespec};
pub use timer::{TimerEngine, TimerId, TimerState};
