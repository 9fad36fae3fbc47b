//! # POSIX Timers
//!
//! Software timers multiplexed over the single kernel alarm of the task.
//!
//! ## Philosophy
//!
//! The kernel gives a task exactly one alarm. Any number of timers (up to
//! [`TIMER_MAX`]) are kept in two fixed tables:
//!
//! - the **unset** table holds created timers that are not running
//! - the **active** table holds running timers, sorted by time to expiry
//!
//! The kernel alarm always tracks the head of the active table. When it
//! fires, the task's expiry entry point calls [`TimerEngine::handle_expiry`].
//!
//! ## Postponement
//!
//! Re-arming a running timer does not edit it in place: the running entry is
//! marked *postponed* and a fresh copy is inserted. Postponed entries are
//! dropped silently when they reach the head, so a re-arm never races a
//! pending expiry.
//!
//! ## Identity
//!
//! A timer is named by a [`TimerId`] fixed at creation (the creation time in
//! nanoseconds, bumped to stay unique). Each entry also carries a baseline
//! timestamp in microseconds, refreshed on every arm and every periodic
//! reload, from which its time to expiry is computed.

use crate::config::TIMER_MAX;
use crate::errno::Errno;
use crate::signal::{NotifyFn, SigEvent, SigVal, SigevNotify};
use crate::time::{read_time_ns, read_time_us, ClockId, ItimerSpec, Timespec};
use core::cmp::Ordering;
use kernel_api::{AlarmFlag, Kernel, Status};
use serde::{Deserialize, Serialize};

/// Stable identifier of a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerId(u64);

impl TimerId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_raw(&self) -> u64 {
        self.0
    }
}

/// Lifecycle state of a timer entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerState {
    /// Created, not running
    Unset,
    /// Running
    Active,
    /// Superseded by a re-arm, waiting to be retired
    Postponed,
}

/// What happens when a timer expires
#[derive(Debug, Clone, Copy)]
enum Notify {
    None,
    Thread(NotifyFn),
}

/// One slot of a timer table
#[derive(Debug, Clone, Copy)]
pub struct TimerEntry {
    key: TimerId,
    /// Baseline (µs) the expiry is counted from
    id: u64,
    duration_ms: u32,
    period_ms: u32,
    notify: Notify,
    value: SigVal,
    set: bool,
    postponed: bool,
    periodic: bool,
    valid: bool,
}

impl TimerEntry {
    const EMPTY: TimerEntry = TimerEntry {
        key: TimerId(0),
        id: 0,
        duration_ms: 0,
        period_ms: 0,
        notify: Notify::None,
        value: SigVal::Int(0),
        set: false,
        postponed: false,
        periodic: false,
        valid: false,
    };

    pub fn key(&self) -> TimerId {
        self.key
    }

    /// Baseline timestamp in microseconds
    pub fn baseline_us(&self) -> u64 {
        self.id
    }

    pub fn duration_ms(&self) -> u32 {
        self.duration_ms
    }

    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }

    pub fn is_set(&self) -> bool {
        self.set
    }

    pub fn is_postponed(&self) -> bool {
        self.postponed
    }

    pub fn is_periodic(&self) -> bool {
        self.periodic
    }

    pub fn state(&self) -> TimerState {
        if !self.set {
            TimerState::Unset
        } else if self.postponed {
            TimerState::Postponed
        } else {
            TimerState::Active
        }
    }

    /// Microseconds until expiry, negative once overdue
    pub fn eta_us(&self, now_us: u64) -> i64 {
        let deadline = self.id as i128 + i128::from(self.duration_ms) * 1_000;
        (deadline - now_us as i128).clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    fn setting(&self) -> ItimerSpec {
        let interval = if self.periodic {
            Timespec::from_millis(self.period_ms)
        } else {
            Timespec::ZERO
        };
        ItimerSpec::periodic(Timespec::from_millis(self.duration_ms), interval)
    }

    /// Copy of the entry as it sits in the unset table
    fn unarmed(&self) -> TimerEntry {
        TimerEntry {
            id: 0,
            duration_ms: 0,
            period_ms: 0,
            set: false,
            postponed: false,
            periodic: false,
            valid: true,
            ..*self
        }
    }
}

fn by_expiry(a: &TimerEntry, b: &TimerEntry, now_us: u64) -> Ordering {
    match (a.valid, b.valid) {
        (false, false) => Ordering::Equal,
        (false, true) => Ordering::Greater,
        (true, false) => Ordering::Less,
        (true, true) => a.eta_us(now_us).cmp(&b.eta_us(now_us)),
    }
}

/// Fixed-capacity table of timer entries
#[derive(Debug, Clone)]
struct TimerTable {
    entries: [TimerEntry; TIMER_MAX],
}

impl TimerTable {
    const fn new() -> Self {
        Self {
            entries: [TimerEntry::EMPTY; TIMER_MAX],
        }
    }

    fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.valid).count()
    }

    fn has_room(&self) -> bool {
        self.entries.iter().any(|e| !e.valid)
    }

    fn find(&self, key: TimerId) -> Option<usize> {
        self.entries.iter().position(|e| e.valid && e.key == key)
    }

    /// Running (non-postponed) entry of `key`
    fn find_live(&self, key: TimerId) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.valid && !e.postponed && e.key == key)
    }

    fn insert(&mut self, entry: TimerEntry) -> Result<usize, Errno> {
        let index = self
            .entries
            .iter()
            .position(|e| !e.valid)
            .ok_or(Errno::NoMem)?;
        self.entries[index] = TimerEntry {
            valid: true,
            ..entry
        };
        Ok(index)
    }

    fn remove(&mut self, index: usize) -> TimerEntry {
        let entry = self.entries[index];
        self.entries[index] = TimerEntry::EMPTY;
        entry
    }

    /// Stable insertion sort: valid entries by time to expiry, then free slots
    fn sort(&mut self, now_us: u64) {
        for i in 1..TIMER_MAX {
            let mut j = i;
            while j > 0
                && by_expiry(&self.entries[j - 1], &self.entries[j], now_us) == Ordering::Greater
            {
                self.entries.swap(j - 1, j);
                j -= 1;
            }
        }
    }

    fn iter(&self) -> impl Iterator<Item = &TimerEntry> {
        self.entries.iter().filter(|e| e.valid)
    }
}

fn alarm_error(status: Status) -> Errno {
    match status {
        Status::Denied => Errno::Perm,
        _ => Errno::Again,
    }
}

/// The timer engine of one task
#[derive(Debug, Clone)]
pub struct TimerEngine {
    unset: TimerTable,
    active: TimerTable,
    last_key: u64,
    alarm_armed: bool,
    in_handler: bool,
}

impl TimerEngine {
    pub const fn new() -> Self {
        Self {
            unset: TimerTable::new(),
            active: TimerTable::new(),
            last_key: 0,
            alarm_armed: false,
            in_handler: false,
        }
    }

    /// Creates an unarmed timer
    ///
    /// # Errors
    ///
    /// - `Inval` for [`ClockId::Realtime`], for signal notification and for
    ///   thread notification without a callback
    /// - `NotSup` for the alarm and boot-time clocks
    /// - `NoMem` when the unset table is full
    /// - `Perm` when the clock cannot be read
    pub fn create<K: Kernel>(
        &mut self,
        kernel: &mut K,
        clock: ClockId,
        sevp: &SigEvent,
    ) -> Result<TimerId, Errno> {
        match clock {
            ClockId::Monotonic => {}
            ClockId::Realtime => return Err(Errno::Inval),
            _ => return Err(Errno::NotSup),
        }
        let notify = match sevp.notify {
            SigevNotify::Signal => return Err(Errno::Inval),
            SigevNotify::None => Notify::None,
            SigevNotify::Thread => Notify::Thread(sevp.function.ok_or(Errno::Inval)?),
        };
        if !self.unset.has_room() {
            return Err(Errno::NoMem);
        }

        let now_ns = read_time_ns(kernel)?;
        let key = now_ns.max(self.last_key + 1);
        self.last_key = key;

        self.unset.insert(TimerEntry {
            key: TimerId(key),
            notify,
            value: sevp.value,
            ..TimerEntry::EMPTY
        })?;
        log::debug!("timer {} created", key);
        Ok(TimerId(key))
    }

    /// Arms, re-arms or disarms a timer and returns its previous setting
    ///
    /// A zero `it_value` disarms. A non-zero `it_interval` makes the timer
    /// periodic.
    ///
    /// # Errors
    ///
    /// - `Inval` for an unknown timer, a value or non-zero interval below one
    ///   millisecond, a nanosecond field outside `[0, 1e9)`, or a duration
    ///   that does not fit 32-bit milliseconds
    /// - `NoMem` when the destination table is full
    /// - `Perm`/`Again` when the kernel alarm cannot be programmed
    pub fn settime<K: Kernel>(
        &mut self,
        kernel: &mut K,
        key: TimerId,
        new: &ItimerSpec,
    ) -> Result<ItimerSpec, Errno> {
        if new.it_value.is_zero() {
            return self.disarm(kernel, key);
        }

        let value = &new.it_value;
        let interval = &new.it_interval;
        if !value.is_normalized() || !value.is_at_least_one_milli() {
            return Err(Errno::Inval);
        }
        let periodic = !interval.is_zero();
        if periodic && (!interval.is_normalized() || !interval.is_at_least_one_milli()) {
            return Err(Errno::Inval);
        }
        let duration_ms = value.to_millis().ok_or(Errno::Inval)?;
        let period_ms = if periodic {
            interval.to_millis().ok_or(Errno::Inval)?
        } else {
            0
        };

        let now_us;
        let old = if let Some(index) = self.unset.find(key) {
            if !self.active.has_room() {
                return Err(Errno::NoMem);
            }
            now_us = read_time_us(kernel)?;
            let entry = self.unset.remove(index);
            self.start(entry, now_us, duration_ms, period_ms, periodic)?;
            ItimerSpec::ZERO
        } else if let Some(index) = self.active.find_live(key) {
            if !self.active.has_room() {
                return Err(Errno::NoMem);
            }
            now_us = read_time_us(kernel)?;
            let running = self.active.entries[index];
            self.active.entries[index].postponed = true;
            self.active.entries[index].periodic = false;
            self.start(running, now_us, duration_ms, period_ms, periodic)?;
            log::trace!("timer {} postponed", key.as_raw());
            running.setting()
        } else {
            return Err(Errno::Inval);
        };

        self.active.sort(now_us);
        log::debug!(
            "timer {} armed for {} ms (period {} ms)",
            key.as_raw(),
            duration_ms,
            period_ms
        );
        self.sync_alarm(kernel, now_us)?;
        Ok(old)
    }

    fn start(
        &mut self,
        entry: TimerEntry,
        now_us: u64,
        duration_ms: u32,
        period_ms: u32,
        periodic: bool,
    ) -> Result<usize, Errno> {
        self.active.insert(TimerEntry {
            id: now_us,
            duration_ms,
            period_ms,
            periodic,
            set: true,
            postponed: false,
            ..entry
        })
    }

    fn disarm<K: Kernel>(&mut self, kernel: &mut K, key: TimerId) -> Result<ItimerSpec, Errno> {
        let in_unset = self.unset.find(key).is_some();
        let running = self.active.find_live(key).map(|index| self.active.entries[index]);
        if running.is_none() && !in_unset {
            return Err(Errno::Inval);
        }
        if running.is_some() && !self.unset.has_room() {
            return Err(Errno::NoMem);
        }

        // Postponed copies outlive the entry that replaced them
        let mut purged = false;
        while let Some(stale) = self.active.find(key) {
            self.active.remove(stale);
            purged = true;
        }
        if !purged {
            return Ok(ItimerSpec::ZERO);
        }
        if let Some(running) = running {
            self.unset.insert(running.unarmed())?;
        }

        let now_us = read_time_us(kernel)?;
        self.active.sort(now_us);
        log::debug!("timer {} disarmed", key.as_raw());
        self.sync_alarm(kernel, now_us)?;
        Ok(running.map_or(ItimerSpec::ZERO, |entry| entry.setting()))
    }

    /// Time left before the next expiry, and the reload period
    ///
    /// An unarmed timer reports zeros. An overdue timer reports zero time
    /// left.
    ///
    /// # Errors
    ///
    /// `Inval` for an unknown timer, `Perm` if the clock cannot be read.
    pub fn gettime<K: Kernel>(&self, kernel: &mut K, key: TimerId) -> Result<ItimerSpec, Errno> {
        if let Some(index) = self.active.find_live(key) {
            let entry = &self.active.entries[index];
            let now_us = read_time_us(kernel)?;
            let remaining = entry.eta_us(now_us).max(0) as u64;
            let interval = if entry.periodic {
                Timespec::from_millis(entry.period_ms)
            } else {
                Timespec::ZERO
            };
            return Ok(ItimerSpec::periodic(Timespec::from_micros(remaining), interval));
        }
        if self.unset.find(key).is_some() {
            return Ok(ItimerSpec::ZERO);
        }
        Err(Errno::Inval)
    }

    /// Alarm entry point: fires the head timer if it is due
    ///
    /// Postponed entries reaching the head are dropped without notification.
    /// A due one-shot timer goes back to the unset table; a due periodic
    /// timer is reloaded with its period. The kernel alarm is then moved to
    /// the new head, or stopped if nothing is running.
    ///
    /// # Panics
    ///
    /// Traps if re-entered.
    pub fn handle_expiry<K: Kernel>(&mut self, kernel: &mut K) -> Result<(), Errno> {
        crate::libc_assert!(!self.in_handler);
        self.in_handler = true;
        let result = self.expire_head(kernel);
        self.in_handler = false;
        result
    }

    fn expire_head<K: Kernel>(&mut self, kernel: &mut K) -> Result<(), Errno> {
        let now_us = read_time_us(kernel)?;

        while self.active.entries[0].valid && self.active.entries[0].postponed {
            let retired = self.active.remove(0);
            log::trace!("dropping postponed timer {}", retired.key.as_raw());
            self.active.sort(now_us);
        }

        let head = self.active.entries[0];
        if !head.valid || head.eta_us(now_us) > 0 {
            return self.sync_alarm(kernel, now_us);
        }

        if let Notify::Thread(function) = head.notify {
            function(head.value);
        }

        let mut result = Ok(());
        if head.periodic {
            let entry = &mut self.active.entries[0];
            entry.id = now_us;
            entry.duration_ms = entry.period_ms;
        } else {
            self.active.remove(0);
            if let Err(errno) = self.unset.insert(head.unarmed()) {
                log::warn!("timer {} lost on expiry: unset table full", head.key.as_raw());
                result = Err(errno);
            }
        }

        self.active.sort(now_us);
        self.sync_alarm(kernel, now_us)?;
        result
    }

    /// Points the kernel alarm at the head of the active table
    fn sync_alarm<K: Kernel>(&mut self, kernel: &mut K, now_us: u64) -> Result<(), Errno> {
        let head = &self.active.entries[0];
        if !head.valid {
            if self.alarm_armed {
                kernel
                    .alarm(0, AlarmFlag::Stop)
                    .into_result()
                    .map_err(alarm_error)?;
                self.alarm_armed = false;
            }
            return Ok(());
        }

        let eta_us = head.eta_us(now_us).max(0) as u64;
        let delay_ms = u32::try_from(eta_us.div_ceil(1_000))
            .unwrap_or(u32::MAX)
            .max(1);
        kernel
            .alarm(delay_ms, AlarmFlag::Start)
            .into_result()
            .map_err(alarm_error)?;
        self.alarm_armed = true;
        Ok(())
    }

    /// Where `key` currently is, `None` if unknown
    pub fn state_of(&self, key: TimerId) -> Option<TimerState> {
        if self.active.find_live(key).is_some() {
            Some(TimerState::Active)
        } else if self.unset.find(key).is_some() {
            Some(TimerState::Unset)
        } else {
            None
        }
    }

    /// Active entries in expiry order, postponed ones included
    pub fn active_entries(&self) -> impl Iterator<Item = &TimerEntry> {
        self.active.iter()
    }

    pub fn unset_entries(&self) -> impl Iterator<Item = &TimerEntry> {
        self.unset.iter()
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn unset_len(&self) -> usize {
        self.unset.len()
    }
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new()
    }
}
