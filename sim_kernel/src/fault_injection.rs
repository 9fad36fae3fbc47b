//! Deterministic fault injection for testing
//!
//! This module lets tests force a syscall of the simulated kernel to return
//! a chosen status instead of doing its work.
//!
//! ## Design Philosophy
//!
//! - **Deterministic**: Faults fire on exact call counts, never randomly
//! - **Composable**: Several faults can target different syscalls
//! - **Test-focused**: Not intended for production use
//!
//! ## Example
//!
//! ```
//! use sim_kernel::fault_injection::{FaultPlan, Syscall, SyscallFault};
//! use kernel_api::Status;
//!
//! let plan = FaultPlan::new()
//!     .with_fault(SyscallFault::FailNext { syscall: Syscall::SendIpc, status: Status::Busy, count: 1 })
//!     .with_fault(SyscallFault::FailAlways { syscall: Syscall::GetRandom, status: Status::Denied });
//! ```

use kernel_api::Status;

/// Syscalls that can be targeted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Syscall {
    SendIpc,
    WaitForEvent,
    Alarm,
    GetCycle,
    Sleep,
    SendSignal,
    GetRandom,
}

/// A fault to inject into a syscall
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallFault {
    /// Fail the next N calls of `syscall` with `status`
    FailNext {
        syscall: Syscall,
        status: Status,
        count: usize,
    },

    /// Fail every call of `syscall` with `status`
    FailAlways { syscall: Syscall, status: Status },

    /// Let the first `skip` calls through, then fail the following one
    FailAfter {
        syscall: Syscall,
        status: Status,
        skip: usize,
    },
}

impl SyscallFault {
    fn syscall(&self) -> Syscall {
        match self {
            SyscallFault::FailNext { syscall, .. }
            | SyscallFault::FailAlways { syscall, .. }
            | SyscallFault::FailAfter { syscall, .. } => *syscall,
        }
    }
}

/// A plan describing all faults to inject
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    faults: Vec<SyscallFault>,
}

impl FaultPlan {
    /// Creates a new empty fault plan
    pub fn new() -> Self {
        Self { faults: Vec::new() }
    }

    /// Adds a fault to the plan
    pub fn with_fault(mut self, fault: SyscallFault) -> Self {
        self.faults.push(fault);
        self
    }

    /// Returns the configured faults
    pub fn faults(&self) -> &[SyscallFault] {
        &self.faults
    }
}

/// Fault injector that applies a plan to syscalls
///
/// This keeps per-fault state (remaining counts) so that `FailNext` and
/// `FailAfter` fire exactly as often as configured.
#[derive(Debug)]
pub struct FaultInjector {
    plan: FaultPlan,
    remaining: Vec<usize>,
    calls: Vec<(Syscall, usize)>,
}

impl FaultInjector {
    /// Creates an injector for a plan
    pub fn new(plan: FaultPlan) -> Self {
        let remaining = plan
            .faults()
            .iter()
            .map(|fault| match fault {
                SyscallFault::FailNext { count, .. } => *count,
                SyscallFault::FailAlways { .. } => usize::MAX,
                SyscallFault::FailAfter { .. } => 1,
            })
            .collect();
        Self {
            plan,
            remaining,
            calls: Vec::new(),
        }
    }

    /// Number of times `syscall` was issued so far
    pub fn call_count(&self, syscall: Syscall) -> usize {
        self.calls
            .iter()
            .find(|(s, _)| *s == syscall)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    /// Records a call and returns the status to force, if any
    pub fn on_syscall(&mut self, syscall: Syscall) -> Option<Status> {
        let previous_calls = self.call_count(syscall);
        match self.calls.iter_mut().find(|(s, _)| *s == syscall) {
            Some((_, n)) => *n += 1,
            None => self.calls.push((syscall, 1)),
        }

        for (index, fault) in self.plan.faults.iter().enumerate() {
            if fault.syscall() != syscall || self.remaining[index] == 0 {
                continue;
            }
            match *fault {
                SyscallFault::FailNext { status, .. } => {
                    self.remaining[index] -= 1;
                    return Some(status);
                }
                SyscallFault::FailAlways { status, .. } => return Some(status),
                SyscallFault::FailAfter { status, skip, .. } => {
                    if previous_calls == skip {
                        self.remaining[index] = 0;
                        return Some(status);
                    }
                }
            }
        }
        None
    }
}
