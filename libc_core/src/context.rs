//! # POSIX entry points
//!
//! [`Libc`] owns everything the C library keeps per task: the kernel
//! handle, the errno slots, the timer and queue tables and the `rand`
//! state. Its methods follow the C calling convention of the functions they
//! stand for: a sentinel return (`-1`, or `0` for pure queries) and the
//! error left in the calling thread's errno.
//!
//! The typed engines ([`TimerEngine`], [`MsgQueueEngine`]) return
//! `Result` and can be used directly by Rust callers.

use crate::config::MAX_THREADS_PER_TASK;
use crate::errno::{Errno, ErrnoTable};
use crate::msg::{MsgFlags, MsgQueueEngine};
use crate::random::{self, Lcg};
use crate::signal::{self, SigEvent, SigSet};
use crate::time::{self, ClockId, ItimerSpec, Timespec};
use crate::timer::{TimerEngine, TimerId};
use kernel_api::{Kernel, TaskHandle};

/// Thread identifier returned by [`Libc::pthread_self`]
pub type PthreadT = usize;

/// Message buffer for [`Libc::msgrcv`]
#[derive(Debug)]
pub struct MsgBuf<'a> {
    pub mtype: i32,
    pub mtext: &'a mut [u8],
}

/// Per-task C library state
pub struct Libc<K: Kernel> {
    kernel: K,
    errno: ErrnoTable,
    thread: usize,
    timers: TimerEngine,
    queues: MsgQueueEngine,
    lcg: Lcg,
}

fn queue_id(msqid: i32) -> Result<usize, Errno> {
    usize::try_from(msqid).map_err(|_| Errno::Inval)
}

impl<K: Kernel> Libc<K> {
    pub fn new(kernel: K) -> Self {
        Self {
            kernel,
            errno: ErrnoTable::new(),
            thread: 0,
            timers: TimerEngine::new(),
            queues: MsgQueueEngine::new(),
            lcg: Lcg::new(),
        }
    }

    /// Seeds `rand` (the task startup passes its stack-protector seed)
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.lcg = Lcg::with_seed(seed);
        self
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn kernel_mut(&mut self) -> &mut K {
        &mut self.kernel
    }

    pub fn into_kernel(self) -> K {
        self.kernel
    }

    pub fn timers(&self) -> &TimerEngine {
        &self.timers
    }

    pub fn queues(&self) -> &MsgQueueEngine {
        &self.queues
    }

    /// Selects the thread subsequent calls run on
    pub fn set_thread(&mut self, thread: usize) -> Result<(), Errno> {
        if thread >= MAX_THREADS_PER_TASK {
            return Err(Errno::Inval);
        }
        self.thread = thread;
        Ok(())
    }

    pub fn thread(&self) -> usize {
        self.thread
    }

    /// Identifier of the calling thread (its index within the task)
    pub fn pthread_self(&self) -> PthreadT {
        self.thread
    }

    /// errno of the current thread, `None` if no call failed on it yet
    pub fn errno(&self) -> Option<Errno> {
        self.errno.get(self.thread)
    }

    fn record<T>(&self, result: Result<T, Errno>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(errno) => {
                self.errno.set(self.thread, errno);
                None
            }
        }
    }

    fn status(&self, result: Result<(), Errno>) -> i32 {
        self.record(result).map_or(-1, |()| 0)
    }

    // Message queues

    pub fn msgget(&mut self, key: TaskHandle, msgflg: MsgFlags) -> i32 {
        let result = self.queues.get(key, msgflg);
        self.record(result).map_or(-1, |msqid| msqid as i32)
    }

    pub fn msgsnd(&mut self, msqid: i32, mtype: i32, mtext: &[u8], msgflg: MsgFlags) -> i32 {
        let result = queue_id(msqid)
            .and_then(|id| self.queues.send(&mut self.kernel, id, mtype, mtext, msgflg));
        self.status(result)
    }

    /// Returns the number of bytes copied, or -1
    pub fn msgrcv(
        &mut self,
        msqid: i32,
        msgp: &mut MsgBuf<'_>,
        msgtyp: i64,
        msgflg: MsgFlags,
    ) -> isize {
        let result = queue_id(msqid).and_then(|id| {
            self.queues
                .recv(&mut self.kernel, id, &mut *msgp.mtext, msgtyp, msgflg)
        });
        match self.record(result) {
            Some(received) => {
                msgp.mtype = received.mtype;
                received.len as isize
            }
            None => -1,
        }
    }

    // Timers

    pub fn timer_create(
        &mut self,
        clockid: ClockId,
        sevp: &SigEvent,
        timerid: &mut TimerId,
    ) -> i32 {
        let result = self.timers.create(&mut self.kernel, clockid, sevp);
        self.status(result.map(|id| *timerid = id))
    }

    /// `flags` is accepted for compatibility; only relative settings exist
    pub fn timer_settime(
        &mut self,
        timerid: TimerId,
        _flags: i32,
        new_value: &ItimerSpec,
        old_value: Option<&mut ItimerSpec>,
    ) -> i32 {
        let result = self.timers.settime(&mut self.kernel, timerid, new_value);
        self.status(result.map(|old| {
            if let Some(out) = old_value {
                *out = old;
            }
        }))
    }

    pub fn timer_gettime(&mut self, timerid: TimerId, curr_value: &mut ItimerSpec) -> i32 {
        let result = self.timers.gettime(&mut self.kernel, timerid);
        self.status(result.map(|curr| *curr_value = curr))
    }

    /// Alarm entry point the kernel calls when the task's alarm expires
    pub fn timer_handler(&mut self) -> i32 {
        let result = self.timers.handle_expiry(&mut self.kernel);
        self.status(result)
    }

    // Clocks

    pub fn clock_gettime(&mut self, clockid: ClockId, tp: &mut Timespec) -> i32 {
        let result = time::clock_gettime(&mut self.kernel, clockid);
        self.status(result.map(|now| *tp = now))
    }

    pub fn nanosleep(&mut self, req: &Timespec, rem: Option<&mut Timespec>) -> i32 {
        let result = time::nanosleep(&mut self.kernel, req);
        self.status(result.map(|left| {
            if let Some(out) = rem {
                *out = left;
            }
        }))
    }

    // Signals

    pub fn sigemptyset(&self, set: &mut SigSet) -> i32 {
        set.clear();
        0
    }

    pub fn sigfillset(&self, set: &mut SigSet) -> i32 {
        set.fill();
        0
    }

    pub fn sigaddset(&self, set: &mut SigSet, signum: i32) -> i32 {
        self.status(set.add(signum))
    }

    pub fn sigdelset(&self, set: &mut SigSet, signum: i32) -> i32 {
        self.status(set.remove(signum))
    }

    /// 1 if member, 0 if not, -1 on error
    pub fn sigismember(&self, set: &SigSet, signum: i32) -> i32 {
        self.record(set.contains(signum)).map_or(-1, i32::from)
    }

    pub fn sigpending(&mut self, set: &mut SigSet) -> i32 {
        let result = signal::sigpending(&mut self.kernel, set);
        self.status(result)
    }

    pub fn kill(&mut self, pid: TaskHandle, sig: i32) -> i32 {
        let result = signal::kill(&mut self.kernel, pid, sig);
        self.status(result)
    }

    // Random numbers

    pub fn rand(&mut self) -> i32 {
        self.lcg.rand()
    }

    pub fn srand(&mut self, seed: u32) {
        self.lcg.srand(seed);
    }

    pub fn rand_r(&self, seedp: &mut u32) -> i32 {
        random::rand_r(seedp)
    }

    /// Returns the number of bytes written, or -1
    pub fn getrandom(&mut self, buf: &mut [u8]) -> isize {
        let result = random::getrandom(&mut self.kernel, &mut self.lcg, buf);
        self.record(result).map_or(-1, |len| len as isize)
    }
}
