//! Kernel syscall trait and task-facing identifiers

use crate::{AlarmFlag, ExchangeArea, Precision, SleepDuration, SleepMode, Status};
use core::fmt;
use serde::{Deserialize, Serialize};

/// Handle of a task as the kernel names it
///
/// Handles are opaque 32-bit values. They are the only way to address
/// another task: IPC targets, signal targets and message-queue keys are
/// all task handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskHandle(u32);

impl TaskHandle {
    /// Creates a handle from its raw kernel value
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw kernel value
    pub const fn as_raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task:{:#010x}", self.0)
    }
}

/// Kind of event delivered by `wait_for_event`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum EventKind {
    /// No event (empty exchange area)
    None = 0,
    /// IPC datagram from another task
    Ipc = 1,
    /// Signal from another task or the kernel
    Signal = 2,
    /// Hardware interrupt owned by the task
    Irq = 3,
    /// DMA stream notification
    Dma = 4,
}

impl EventKind {
    /// Decodes the raw header value, `None` for unknown kinds
    pub const fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(EventKind::None),
            1 => Some(EventKind::Ipc),
            2 => Some(EventKind::Signal),
            3 => Some(EventKind::Irq),
            4 => Some(EventKind::Dma),
            _ => None,
        }
    }
}

/// How long `wait_for_event` may block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitTimeout {
    /// Block until an event arrives
    Forever,
    /// Return immediately with `Status::Again` when nothing is pending
    NoWait,
    /// Block at most this many milliseconds
    Millis(u32),
}

/// The kernel syscall surface
///
/// Multiple implementations are possible:
/// - The real kernel (supervisor calls)
/// - The simulated kernel in `sim_kernel` (for testing)
///
/// # Exchange Area
///
/// Syscalls that produce data write it into the exchange area and return
/// `Status::Ok`; callers then copy it out with [`ExchangeArea::copy_to_user`].
/// Syscalls that consume data (IPC send) read what the caller staged with
/// [`ExchangeArea::copy_from_user`].
///
/// # Alarm callback
///
/// When the alarm armed with [`Kernel::alarm`] expires, the kernel invokes
/// the task's alarm entry point. That entry point is not part of this trait:
/// it is owned by the POSIX layer and runs to completion before the kernel
/// returns control to any blocked syscall.
pub trait Kernel {
    /// Read access to the exchange area
    fn exchange(&self) -> &ExchangeArea;

    /// Write access to the exchange area
    fn exchange_mut(&mut self) -> &mut ExchangeArea;

    /// Sends the first `len` staged bytes of the exchange area to `target`
    fn send_ipc(&mut self, target: TaskHandle, len: usize) -> Status;

    /// Waits for an event of the given kind
    ///
    /// On `Status::Ok` the event header and payload are in the exchange area.
    fn wait_for_event(&mut self, kind: EventKind, timeout: WaitTimeout) -> Status;

    /// Arms, rearms or stops the task's single alarm
    fn alarm(&mut self, delay_ms: u32, flag: AlarmFlag) -> Status;

    /// Reads the cycle counter, converted to `precision`, as a u64 in the
    /// exchange area
    fn get_cycle(&mut self, precision: Precision) -> Status;

    /// Suspends the task
    fn sleep(&mut self, duration: SleepDuration, mode: SleepMode) -> Status;

    /// Sends `signal` to `target`
    fn send_signal(&mut self, target: TaskHandle, signal: u32) -> Status;

    /// Draws 32 bits of entropy from the kernel RNG into the exchange area
    fn get_random(&mut self) -> Status;
}
