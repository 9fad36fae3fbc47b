//! # Signals
//!
//! Signal numbers, fixed-size signal sets, pending-signal collection and
//! `kill`, plus the notification descriptor timers are created with.
//!
//! Signals are kernel events: a task never has handlers installed, it polls
//! its pending signals with [`sigpending`].

use crate::config::SIGNUM;
use crate::errno::Errno;
use kernel_api::{EventKind, Kernel, TaskHandle, WaitTimeout};
use serde::{Deserialize, Serialize};

/// Signals known to the kernel, numbered from 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum Signal {
    Abort = 1,
    Alarm,
    Bus,
    Cont,
    Ill,
    Io,
    Pipe,
    Poll,
    Term,
    Trap,
    Usr1,
    Usr2,
}

impl Signal {
    const ALL: [Signal; SIGNUM] = [
        Signal::Abort,
        Signal::Alarm,
        Signal::Bus,
        Signal::Cont,
        Signal::Ill,
        Signal::Io,
        Signal::Pipe,
        Signal::Poll,
        Signal::Term,
        Signal::Trap,
        Signal::Usr1,
        Signal::Usr2,
    ];

    pub const fn number(self) -> u32 {
        self as u32
    }

    /// Decodes a signal number, `None` outside `1..=SIGNUM`
    pub fn from_number(signo: i32) -> Option<Self> {
        if signo < 1 {
            return None;
        }
        Self::ALL.get(signo as usize - 1).copied()
    }
}

/// A set of signals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigSet {
    members: [bool; SIGNUM],
}

fn index(signo: i32) -> Result<usize, Errno> {
    Signal::from_number(signo)
        .map(|signal| signal.number() as usize - 1)
        .ok_or(Errno::Inval)
}

impl SigSet {
    pub const fn empty() -> Self {
        Self {
            members: [false; SIGNUM],
        }
    }

    pub const fn full() -> Self {
        Self {
            members: [true; SIGNUM],
        }
    }

    /// Removes every signal
    pub fn clear(&mut self) {
        self.members = [false; SIGNUM];
    }

    /// Adds every signal
    pub fn fill(&mut self) {
        self.members = [true; SIGNUM];
    }

    pub fn add(&mut self, signo: i32) -> Result<(), Errno> {
        self.members[index(signo)?] = true;
        Ok(())
    }

    pub fn remove(&mut self, signo: i32) -> Result<(), Errno> {
        self.members[index(signo)?] = false;
        Ok(())
    }

    pub fn contains(&self, signo: i32) -> Result<bool, Errno> {
        Ok(self.members[index(signo)?])
    }

    pub fn is_empty(&self) -> bool {
        !self.members.iter().any(|m| *m)
    }

    /// Member signals in ascending order
    pub fn iter(&self) -> impl Iterator<Item = Signal> + '_ {
        Signal::ALL
            .iter()
            .zip(self.members.iter())
            .filter(|(_, member)| **member)
            .map(|(signal, _)| *signal)
    }
}

/// Collects every signal the kernel has queued for the task into `set`
///
/// Drains the pending signal events without blocking. Signals already in
/// `set` are kept.
///
/// # Errors
///
/// `Inval` if the kernel delivers something that is not a known signal;
/// signals collected before it stay in `set`.
pub fn sigpending<K: Kernel>(kernel: &mut K, set: &mut SigSet) -> Result<(), Errno> {
    loop {
        if !kernel
            .wait_for_event(EventKind::Signal, WaitTimeout::NoWait)
            .is_ok()
        {
            return Ok(());
        }
        let event = kernel.exchange().event().ok_or(Errno::Inval)?;
        if event.header.kind != EventKind::Signal || event.payload.len() < 4 {
            return Err(Errno::Inval);
        }
        let signo = u32::from_le_bytes([
            event.payload[0],
            event.payload[1],
            event.payload[2],
            event.payload[3],
        ]);
        let signo = i32::try_from(signo).map_err(|_| Errno::Inval)?;
        log::trace!("pending signal {} from {}", signo, event.header.source);
        set.add(signo)?;
    }
}

/// Sends signal `sig` to task `pid`
///
/// # Errors
///
/// `Inval` for a negative signal number or if the kernel refuses the send.
pub fn kill<K: Kernel>(kernel: &mut K, pid: TaskHandle, sig: i32) -> Result<(), Errno> {
    let sig = u32::try_from(sig).map_err(|_| Errno::Inval)?;
    kernel.send_signal(pid, sig).into_result().map_err(|status| {
        log::debug!("kill {} sig {} refused: {}", pid, sig, status);
        Errno::Inval
    })
}

/// Value handed to a notification callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SigVal {
    Int(i32),
    Ptr(usize),
}

impl Default for SigVal {
    fn default() -> Self {
        SigVal::Int(0)
    }
}

/// Callback run on timer expiry, in the task's alarm context
pub type NotifyFn = fn(SigVal);

/// How an event is notified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigevNotify {
    /// Deliver a signal (not supported by timers)
    Signal,
    /// Do nothing
    None,
    /// Call the callback
    Thread,
}

/// Notification descriptor
#[derive(Debug, Clone, Copy)]
pub struct SigEvent {
    pub notify: SigevNotify,
    pub signo: i32,
    pub value: SigVal,
    pub function: Option<NotifyFn>,
}

impl SigEvent {
    /// Silent notification
    pub const fn none() -> Self {
        Self {
            notify: SigevNotify::None,
            signo: 0,
            value: SigVal::Int(0),
            function: None,
        }
    }

    /// Callback notification
    pub const fn thread(function: NotifyFn, value: SigVal) -> Self {
        Self {
            notify: SigevNotify::Thread,
            signo: 0,
            value,
            function: Some(function),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_api::Status;
    use sim_kernel::fault_injection::{FaultPlan, Syscall, SyscallFault};
    use sim_kernel::SimulatedKernel;

    const PEER: TaskHandle = TaskHandle::from_raw(0x1234);

    #[test]
    fn test_signal_numbers() {
        assert_eq!(Signal::Abort.number(), 1);
        assert_eq!(Signal::Usr2.number(), SIGNUM as u32);
        assert_eq!(Signal::from_number(9), Some(Signal::Term));
        assert_eq!(Signal::from_number(0), None);
        assert_eq!(Signal::from_number(13), None);
        assert_eq!(Signal::from_number(-1), None);
    }

    #[test]
    fn test_empty_and_full() {
        let mut set = SigSet::full();
        for signo in 1..=SIGNUM as i32 {
            assert_eq!(set.contains(signo), Ok(true));
        }
        set.clear();
        assert!(set.is_empty());
        set.fill();
        assert_eq!(set, SigSet::full());
    }

    #[test]
    fn test_add_remove() {
        let mut set = SigSet::empty();
        set.add(Signal::Usr1.number() as i32).unwrap();
        assert_eq!(set.contains(11), Ok(true));
        assert_eq!(set.contains(12), Ok(false));
        set.remove(11).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_invalid_signal_numbers() {
        let mut set = SigSet::empty();
        assert_eq!(set.add(0), Err(Errno::Inval));
        assert_eq!(set.add(13), Err(Errno::Inval));
        assert_eq!(set.remove(-4), Err(Errno::Inval));
        assert_eq!(set.contains(100), Err(Errno::Inval));
        assert!(set.is_empty());
    }

    #[test]
    fn test_iter() {
        let mut set = SigSet::empty();
        set.add(9).unwrap();
        set.add(2).unwrap();
        let members: Vec<_> = set.iter().collect();
        assert_eq!(members, vec![Signal::Alarm, Signal::Term]);
    }

    #[test]
    fn test_sigpending_drains_signals() {
        let mut kernel = SimulatedKernel::new();
        kernel.raise_signal(PEER, 3).unwrap();
        kernel.raise_signal(PEER, 12).unwrap();
        kernel.deliver_datagram(PEER, b"not a signal").unwrap();

        let mut set = SigSet::empty();
        sigpending(&mut kernel, &mut set).unwrap();
        assert_eq!(set.contains(3), Ok(true));
        assert_eq!(set.contains(12), Ok(true));
        assert_eq!(set.iter().count(), 2);
        assert_eq!(kernel.inbox().len(), 1);
    }

    #[test]
    fn test_sigpending_nothing_pending() {
        let mut kernel = SimulatedKernel::new();
        let mut set = SigSet::empty();
        sigpending(&mut kernel, &mut set).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_sigpending_unknown_signal() {
        let mut kernel = SimulatedKernel::new();
        kernel.raise_signal(PEER, 1).unwrap();
        kernel.raise_signal(PEER, 40).unwrap();

        let mut set = SigSet::empty();
        assert_eq!(sigpending(&mut kernel, &mut set), Err(Errno::Inval));
        assert_eq!(set.contains(1), Ok(true));
    }

    #[test]
    fn test_kill() {
        let mut kernel = SimulatedKernel::new();
        kill(&mut kernel, PEER, Signal::Term.number() as i32).unwrap();
        assert_eq!(kernel.signals(), &[(PEER, 9)]);
    }

    #[test]
    fn test_kill_refused() {
        let plan = FaultPlan::new().with_fault(SyscallFault::FailAlways {
            syscall: Syscall::SendSignal,
            status: Status::Denied,
        });
        let mut kernel = SimulatedKernel::new().with_fault_plan(plan);
        assert_eq!(kill(&mut kernel, PEER, 1), Err(Errno::Inval));
        assert_eq!(kill(&mut kernel, PEER, -1), Err(Errno::Inval));
    }
}
