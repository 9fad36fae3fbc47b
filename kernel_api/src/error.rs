//! Kernel status codes

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status returned by every syscall
///
/// The kernel never reports errors any other way: data-carrying syscalls
/// return `Ok` and leave their result in the exchange area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[repr(u32)]
pub enum Status {
    /// Syscall succeeded
    #[error("ok")]
    Ok = 0,
    /// Invalid argument or target
    #[error("invalid")]
    Invalid,
    /// The task lacks the capability for this syscall
    #[error("denied")]
    Denied,
    /// Target entity does not exist
    #[error("no entity")]
    NoEntity,
    /// Target is busy (e.g. receiver inbox full)
    #[error("busy")]
    Busy,
    /// Resource already mapped
    #[error("already mapped")]
    AlreadyMapped,
    /// Wait timed out
    #[error("timeout")]
    Timeout,
    /// Unrecoverable kernel-side failure
    #[error("critical")]
    Critical,
    /// Nothing available right now, try again
    #[error("again")]
    Again,
    /// Interrupted before completion
    #[error("interrupted")]
    Intr,
    /// The wait would deadlock
    #[error("deadlock")]
    Deadlk,
}

impl Status {
    /// Returns true for [`Status::Ok`]
    pub const fn is_ok(self) -> bool {
        matches!(self, Status::Ok)
    }

    /// Converts the status into a `Result`, keeping non-`Ok` codes as errors
    pub fn into_result(self) -> Result<(), Status> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(self)
        }
    }
}
