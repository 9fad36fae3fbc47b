//! # Simulated Kernel
//!
//! This crate provides a simulated implementation of the kernel syscall API.
//!
//! ## Purpose
//!
//! The simulated kernel allows testing the POSIX layer without hardware:
//! - Runs under `cargo test`
//! - Deterministic (virtual clock, scripted events, no real concurrency)
//! - Inspectable (every alarm, send, signal and sleep is journaled)
//!
//! ## Philosophy
//!
//! **Testability is a first-class design constraint.**
//!
//! The simulation never blocks. A wait with nothing queued reports a
//! timeout instead of hanging the test, and time only moves when a test
//! advances the clock (or enables auto-advance on reads).
//!
//! The alarm is not delivered by the simulation itself: tests check
//! [`SimulatedKernel::alarm_due`] and call the task's expiry entry point,
//! which is exactly what the real kernel does on the task's behalf.

pub mod fault_injection;
pub mod message_queue;
pub mod test_utils;
pub mod timer;

use fault_injection::{FaultInjector, FaultPlan, Syscall};
use kernel_api::{
    AlarmFlag, EventKind, ExchangeArea, Kernel, Precision, SleepDuration, SleepMode, Status,
    TaskHandle, WaitTimeout, EXCHANGE_AREA_LEN,
};
use message_queue::{EventQueue, PendingEvent, QueueError};
use timer::SimClock;

/// Default number of events the inbox holds
pub const DEFAULT_INBOX_CAPACITY: usize = 64;

/// An alarm request as seen by the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmRecord {
    pub delay_ms: u32,
    pub flag: AlarmFlag,
    /// Clock value (ns) when the request was made
    pub requested_at: u64,
}

/// An IPC datagram emitted by the task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentIpc {
    pub target: TaskHandle,
    pub payload: Vec<u8>,
}

/// A wait request as seen by the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitRecord {
    pub kind: EventKind,
    pub timeout: WaitTimeout,
    pub status: Status,
}

/// Simulated kernel state
///
/// This holds everything a real kernel would hold for one task.
/// Unlike a real kernel, this state is directly accessible for testing.
pub struct SimulatedKernel {
    /// Task-local exchange area
    exchange: ExchangeArea,
    /// Virtual clock
    clock: SimClock,
    /// Events waiting for `wait_for_event`
    inbox: EventQueue,
    /// Deadline (ns) of the pending alarm
    alarm_deadline: Option<u64>,
    /// Period (ms) of the pending alarm, for periodic alarms
    alarm_period: Option<u32>,
    /// Journal of alarm requests
    alarms: Vec<AlarmRecord>,
    /// Journal of IPC sends
    sent: Vec<SentIpc>,
    /// Journal of waits
    waits: Vec<WaitRecord>,
    /// Journal of signals sent
    signals: Vec<(TaskHandle, u32)>,
    /// Journal of sleeps
    sleeps: Vec<(SleepDuration, SleepMode)>,
    /// xorshift state for the entropy source
    entropy_state: u32,
    /// Fault injector (optional, for testing)
    fault_injector: Option<FaultInjector>,
}

impl SimulatedKernel {
    /// Creates a new simulated kernel
    pub fn new() -> Self {
        Self {
            exchange: ExchangeArea::new(),
            clock: SimClock::new(),
            inbox: EventQueue::with_capacity(DEFAULT_INBOX_CAPACITY),
            alarm_deadline: None,
            alarm_period: None,
            alarms: Vec::new(),
            sent: Vec::new(),
            waits: Vec::new(),
            signals: Vec::new(),
            sleeps: Vec::new(),
            entropy_state: 0x2545_f491,
            fault_injector: None,
        }
    }

    /// Replaces the virtual clock
    pub fn with_clock(mut self, clock: SimClock) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the inbox capacity
    pub fn with_inbox_capacity(mut self, capacity: usize) -> Self {
        self.inbox = EventQueue::with_capacity(capacity);
        self
    }

    /// Seeds the entropy source (zero is replaced by a fixed non-zero seed)
    pub fn with_entropy_seed(mut self, seed: u32) -> Self {
        self.entropy_state = if seed == 0 { 0x2545_f491 } else { seed };
        self
    }

    /// Sets the fault plan for this kernel
    ///
    /// Faults are checked before each syscall does its work.
    pub fn with_fault_plan(mut self, plan: FaultPlan) -> Self {
        self.fault_injector = Some(FaultInjector::new(plan));
        self
    }

    /// Mutable access to the clock
    pub fn clock_mut(&mut self) -> &mut SimClock {
        &mut self.clock
    }

    /// Current time in microseconds (does not auto-advance)
    pub fn now_micros(&self) -> u64 {
        self.clock.now_micros()
    }

    /// Advances virtual time
    pub fn advance_millis(&mut self, millis: u64) {
        self.clock.advance_millis(millis);
    }

    /// Advances virtual time
    pub fn advance_micros(&mut self, micros: u64) {
        self.clock.advance_micros(micros);
    }

    /// Queues an event for a future wait
    pub fn push_event(
        &mut self,
        kind: EventKind,
        source: TaskHandle,
        payload: &[u8],
    ) -> Result<(), QueueError> {
        self.inbox.push(PendingEvent {
            kind,
            source,
            payload: payload.to_vec(),
        })
    }

    /// Queues a raw IPC datagram from `source`
    pub fn deliver_datagram(&mut self, source: TaskHandle, payload: &[u8]) -> Result<(), QueueError> {
        self.push_event(EventKind::Ipc, source, payload)
    }

    /// Queues a signal from `source`
    pub fn raise_signal(&mut self, source: TaskHandle, signal: u32) -> Result<(), QueueError> {
        self.push_event(EventKind::Signal, source, &signal.to_le_bytes())
    }

    /// The event inbox
    pub fn inbox(&self) -> &EventQueue {
        &self.inbox
    }

    /// Journal of alarm requests, oldest first
    pub fn alarms(&self) -> &[AlarmRecord] {
        &self.alarms
    }

    /// The last alarm request, if any
    pub fn last_alarm(&self) -> Option<AlarmRecord> {
        self.alarms.last().copied()
    }

    /// Deadline (ns) of the pending alarm
    pub fn alarm_deadline(&self) -> Option<u64> {
        self.alarm_deadline
    }

    /// Whether the pending alarm has expired at the current virtual time
    pub fn alarm_due(&self) -> bool {
        self.alarm_deadline
            .map(|deadline| deadline <= self.clock.now_nanos())
            .unwrap_or(false)
    }

    /// Consumes the expired alarm, as the kernel does right before calling
    /// the task's alarm entry point
    ///
    /// Returns false when no alarm is due. Periodic alarms are re-armed
    /// one period later.
    pub fn take_due_alarm(&mut self) -> bool {
        if !self.alarm_due() {
            return false;
        }
        self.alarm_deadline = self
            .alarm_period
            .map(|period| self.clock.now_nanos() + u64::from(period) * 1_000_000);
        true
    }

    /// Journal of IPC sends, oldest first
    pub fn sent(&self) -> &[SentIpc] {
        &self.sent
    }

    /// Journal of waits, oldest first
    pub fn waits(&self) -> &[WaitRecord] {
        &self.waits
    }

    /// Journal of signals sent
    pub fn signals(&self) -> &[(TaskHandle, u32)] {
        &self.signals
    }

    /// Journal of sleeps
    pub fn sleeps(&self) -> &[(SleepDuration, SleepMode)] {
        &self.sleeps
    }

    /// Number of times a syscall was issued (only tracked with a fault plan)
    pub fn call_count(&self, syscall: Syscall) -> usize {
        self.fault_injector
            .as_ref()
            .map(|injector| injector.call_count(syscall))
            .unwrap_or(0)
    }

    fn fault(&mut self, syscall: Syscall) -> Option<Status> {
        self.fault_injector
            .as_mut()
            .and_then(|injector| injector.on_syscall(syscall))
    }

    fn next_entropy(&mut self) -> u32 {
        let mut x = self.entropy_state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.entropy_state = x;
        x
    }
}

impl Default for SimulatedKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel for SimulatedKernel {
    fn exchange(&self) -> &ExchangeArea {
        &self.exchange
    }

    fn exchange_mut(&mut self) -> &mut ExchangeArea {
        &mut self.exchange
    }

    fn send_ipc(&mut self, target: TaskHandle, len: usize) -> Status {
        if let Some(status) = self.fault(Syscall::SendIpc) {
            return status;
        }
        if len > EXCHANGE_AREA_LEN {
            return Status::Invalid;
        }
        self.sent.push(SentIpc {
            target,
            payload: self.exchange.as_bytes()[..len].to_vec(),
        });
        Status::Ok
    }

    fn wait_for_event(&mut self, kind: EventKind, timeout: WaitTimeout) -> Status {
        let status = match self.fault(Syscall::WaitForEvent) {
            Some(status) => status,
            None => match self.inbox.pop_kind(kind) {
                Some(event) => self.exchange.write_event(event.kind, event.source, &event.payload),
                None => match timeout {
                    WaitTimeout::NoWait => Status::Again,
                    // A blocked task with nothing to receive would hang
                    // forever; report it instead.
                    WaitTimeout::Forever => Status::Timeout,
                    WaitTimeout::Millis(ms) => {
                        self.clock.advance_millis(u64::from(ms));
                        Status::Timeout
                    }
                },
            },
        };
        self.waits.push(WaitRecord {
            kind,
            timeout,
            status,
        });
        status
    }

    fn alarm(&mut self, delay_ms: u32, flag: AlarmFlag) -> Status {
        if let Some(status) = self.fault(Syscall::Alarm) {
            return status;
        }
        let now = self.clock.now_nanos();
        self.alarms.push(AlarmRecord {
            delay_ms,
            flag,
            requested_at: now,
        });
        match flag {
            AlarmFlag::Start => {
                self.alarm_deadline = Some(now + u64::from(delay_ms) * 1_000_000);
                self.alarm_period = None;
            }
            AlarmFlag::StartPeriodic => {
                self.alarm_deadline = Some(now + u64::from(delay_ms) * 1_000_000);
                self.alarm_period = Some(delay_ms);
            }
            AlarmFlag::Stop => {
                self.alarm_deadline = None;
                self.alarm_period = None;
            }
        }
        Status::Ok
    }

    fn get_cycle(&mut self, precision: Precision) -> Status {
        if let Some(status) = self.fault(Syscall::GetCycle) {
            return status;
        }
        let nanos = self.clock.read();
        self.exchange.write_u64(precision.from_nanos(nanos))
    }

    fn sleep(&mut self, duration: SleepDuration, mode: SleepMode) -> Status {
        if let Some(status) = self.fault(Syscall::Sleep) {
            return status;
        }
        self.sleeps.push((duration, mode));
        self.clock.advance_millis(u64::from(duration.as_millis()));
        Status::Ok
    }

    fn send_signal(&mut self, target: TaskHandle, signal: u32) -> Status {
        if let Some(status) = self.fault(Syscall::SendSignal) {
            return status;
        }
        self.signals.push((target, signal));
        Status::Ok
    }

    fn get_random(&mut self) -> Status {
        if let Some(status) = self.fault(Syscall::GetRandom) {
            return status;
        }
        let value = self.next_entropy();
        self.exchange.write_u32(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fault_injection::SyscallFault;

    const PEER: TaskHandle = TaskHandle::from_raw(0x42);

    #[test]
    fn test_get_cycle_precision() {
        let mut kernel = SimulatedKernel::new().with_clock(SimClock::with_initial_micros(1_500));
        assert_eq!(kernel.get_cycle(Precision::Microseconds), Status::Ok);
        assert_eq!(kernel.exchange().read_u64(), Ok(1_500));
        assert_eq!(kernel.get_cycle(Precision::Milliseconds), Status::Ok);
        assert_eq!(kernel.exchange().read_u64(), Ok(1));
        assert_eq!(kernel.get_cycle(Precision::Nanoseconds), Status::Ok);
        assert_eq!(kernel.exchange().read_u64(), Ok(1_500_000));
    }

    #[test]
    fn test_wait_delivers_into_exchange() {
        let mut kernel = SimulatedKernel::new();
        kernel.deliver_datagram(PEER, b"ping").unwrap();

        assert_eq!(kernel.wait_for_event(EventKind::Ipc, WaitTimeout::Forever), Status::Ok);
        let event = kernel.exchange().event().unwrap();
        assert_eq!(event.header.source, PEER);
        assert_eq!(event.payload, b"ping");
    }

    #[test]
    fn test_wait_on_empty_inbox() {
        let mut kernel = SimulatedKernel::new();
        assert_eq!(kernel.wait_for_event(EventKind::Ipc, WaitTimeout::NoWait), Status::Again);
        assert_eq!(kernel.wait_for_event(EventKind::Ipc, WaitTimeout::Forever), Status::Timeout);
        assert_eq!(
            kernel.wait_for_event(EventKind::Ipc, WaitTimeout::Millis(5)),
            Status::Timeout
        );
        assert_eq!(kernel.now_micros(), 5_000);
        assert_eq!(kernel.waits().len(), 3);
    }

    #[test]
    fn test_inbox_capacity() {
        let mut kernel = SimulatedKernel::new().with_inbox_capacity(1);
        kernel.deliver_datagram(PEER, b"a").unwrap();
        assert_eq!(kernel.deliver_datagram(PEER, b"b"), Err(QueueError::Full));
        assert_eq!(kernel.inbox().capacity(), 1);
    }

    #[test]
    fn test_clock_mut_auto_advance() {
        let mut kernel = SimulatedKernel::new();
        *kernel.clock_mut() = SimClock::with_initial_micros(10).with_auto_advance(1_000);
        assert_eq!(kernel.get_cycle(Precision::Microseconds), Status::Ok);
        assert_eq!(kernel.exchange().read_u64(), Ok(10));
        assert_eq!(kernel.now_micros(), 11);
    }

    #[test]
    fn test_wait_filters_by_kind() {
        let mut kernel = SimulatedKernel::new();
        kernel.raise_signal(PEER, 3).unwrap();
        assert_eq!(kernel.wait_for_event(EventKind::Ipc, WaitTimeout::NoWait), Status::Again);
        assert_eq!(kernel.wait_for_event(EventKind::Signal, WaitTimeout::NoWait), Status::Ok);
        assert_eq!(kernel.exchange().event().unwrap().payload, &3u32.to_le_bytes());
    }

    #[test]
    fn test_send_ipc_journals_staged_bytes() {
        let mut kernel = SimulatedKernel::new();
        kernel.exchange_mut().copy_from_user(b"abcdef");
        assert_eq!(kernel.send_ipc(PEER, 4), Status::Ok);
        assert_eq!(kernel.sent()[0].target, PEER);
        assert_eq!(kernel.sent()[0].payload, b"abcd");
    }

    #[test]
    fn test_alarm_lifecycle() {
        let mut kernel = SimulatedKernel::new();
        assert_eq!(kernel.alarm(10, AlarmFlag::Start), Status::Ok);
        assert!(!kernel.alarm_due());

        kernel.advance_millis(10);
        assert!(kernel.alarm_due());
        assert!(kernel.take_due_alarm());
        assert!(!kernel.alarm_due());
        assert_eq!(kernel.alarm_deadline(), None);
    }

    #[test]
    fn test_periodic_alarm_rearms() {
        let mut kernel = SimulatedKernel::new();
        kernel.alarm(5, AlarmFlag::StartPeriodic);
        kernel.advance_millis(5);
        assert!(kernel.take_due_alarm());
        assert_eq!(kernel.alarm_deadline(), Some(10_000_000));
    }

    #[test]
    fn test_alarm_stop() {
        let mut kernel = SimulatedKernel::new();
        kernel.alarm(10, AlarmFlag::Start);
        kernel.alarm(0, AlarmFlag::Stop);
        kernel.advance_millis(20);
        assert!(!kernel.alarm_due());
        assert_eq!(kernel.alarms().len(), 2);
    }

    #[test]
    fn test_sleep_advances_clock() {
        let mut kernel = SimulatedKernel::new();
        assert_eq!(
            kernel.sleep(SleepDuration::ArbitraryMs(1_250), SleepMode::Shallow),
            Status::Ok
        );
        assert_eq!(kernel.now_micros(), 1_250_000);
    }

    #[test]
    fn test_entropy_is_deterministic_per_seed() {
        let mut a = SimulatedKernel::new().with_entropy_seed(7);
        let mut b = SimulatedKernel::new().with_entropy_seed(7);
        a.get_random();
        b.get_random();
        assert_eq!(a.exchange().read_u32(), b.exchange().read_u32());
    }

    #[test]
    fn test_fault_plan_overrides_status() {
        let plan = FaultPlan::new().with_fault(SyscallFault::FailNext {
            syscall: Syscall::SendIpc,
            status: Status::Busy,
            count: 1,
        });
        let mut kernel = SimulatedKernel::new().with_fault_plan(plan);

        assert_eq!(kernel.send_ipc(PEER, 0), Status::Busy);
        assert_eq!(kernel.send_ipc(PEER, 0), Status::Ok);
        assert_eq!(kernel.sent().len(), 1);
        assert_eq!(kernel.call_count(Syscall::SendIpc), 2);
    }
}
