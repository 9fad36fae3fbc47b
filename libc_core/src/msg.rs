//! # SysV Message Queues
//!
//! Message queues on top of kernel IPC datagrams.
//!
//! ## Philosophy
//!
//! There is no queue object in the kernel. A queue is a local slot bound to
//! a peer task: its key is the peer's [`TaskHandle`], and the kernel's IPC
//! channel to that task is the transport.
//!
//! ## Wire Format
//!
//! A message is framed as a 4-byte little-endian type tag followed by the
//! text, then cut into [`MSG_CHUNK_LEN`]-byte datagrams. A datagram shorter
//! than a full chunk ends the message, so a framed length that is an exact
//! multiple of the chunk size is followed by an empty datagram. A reader
//! also takes the message as soon as it holds as many text bytes as the
//! reader asked for.
//!
//! ## Depth
//!
//! Each slot buffers at most one complete message. Datagrams are read in
//! arrival order whatever their source; one belonging to another bound slot
//! is reassembled there.

use crate::config::{
    MSGQ_BUFFER_LEN, MSGQ_MAX, MSG_CHUNK_LEN, MSG_MAX_SIZE, MSG_PERM_DEFAULT, MSG_PERM_READ_ONLY,
    MSG_TAG_LEN,
};
use crate::errno::Errno;
use crate::time::read_time_us;
use bitflags::bitflags;
use kernel_api::{EventKind, Kernel, Status, TaskHandle, WaitTimeout};

/// Key requesting a queue without lookup
pub const IPC_PRIVATE: TaskHandle = TaskHandle::from_raw(0);

bitflags! {
    /// `msgget`/`msgsnd`/`msgrcv` flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MsgFlags: u32 {
        /// Create the queue if the key is not bound
        const CREAT = 0o1000;
        /// With `CREAT`, fail if the key is already bound
        const EXCL = 0o2000;
        /// Do not block
        const NOWAIT = 0o4000;
        /// Truncate messages longer than the receive buffer
        const NOERROR = 0o10000;
        /// Receive the first message whose type differs from `msgtyp`
        const EXCEPT = 0o20000;
    }
}

/// A message handed to the caller of [`MsgQueueEngine::recv`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Received {
    pub mtype: i32,
    /// Bytes copied into the caller's buffer
    pub len: usize,
}

enum Deposit {
    Partial,
    Complete,
    Dropped,
}

/// One queue slot
#[derive(Debug, Clone)]
pub struct QueueSlot {
    key: TaskHandle,
    perm: u16,
    rtime_us: u64,
    msg: [u8; MSGQ_BUFFER_LEN],
    msg_size: usize,
    set: bool,
    available: bool,
}

impl QueueSlot {
    const EMPTY: QueueSlot = QueueSlot {
        key: IPC_PRIVATE,
        perm: 0,
        rtime_us: 0,
        msg: [0; MSGQ_BUFFER_LEN],
        msg_size: 0,
        set: false,
        available: false,
    };

    pub fn key(&self) -> TaskHandle {
        self.key
    }

    pub fn perm(&self) -> u16 {
        self.perm
    }

    /// Time (µs) of the last successful receive
    pub fn rtime_us(&self) -> u64 {
        self.rtime_us
    }

    /// Bytes reassembled so far, type tag included
    pub fn buffered(&self) -> usize {
        self.msg_size
    }

    /// Whether a complete message is waiting
    pub fn is_available(&self) -> bool {
        self.available
    }

    fn mtype(&self) -> i32 {
        i32::from_le_bytes([self.msg[0], self.msg[1], self.msg[2], self.msg[3]])
    }

    fn text(&self) -> &[u8] {
        &self.msg[MSG_TAG_LEN..self.msg_size]
    }

    fn matches(&self, msgtyp: i64, flags: MsgFlags) -> bool {
        let mtype = i64::from(self.mtype());
        if msgtyp == 0 {
            true
        } else if flags.contains(MsgFlags::EXCEPT) {
            mtype != msgtyp
        } else {
            mtype == msgtyp
        }
    }

    fn discard_message(&mut self) {
        self.msg = [0; MSGQ_BUFFER_LEN];
        self.msg_size = 0;
        self.available = false;
    }

    /// Appends a datagram to the reassembly buffer
    ///
    /// The message completes on a short datagram, or once its text reaches
    /// `wanted` bytes when a reader is waiting on this slot.
    fn deposit(&mut self, datagram: &[u8], wanted: Option<usize>) -> Result<Deposit, Errno> {
        if self.available {
            return Ok(Deposit::Dropped);
        }
        if datagram.is_empty() && self.msg_size == 0 {
            // Terminator of a message already completed by length
            return Ok(Deposit::Partial);
        }
        let end = self.msg_size + datagram.len();
        if end > MSGQ_BUFFER_LEN {
            self.discard_message();
            return Err(Errno::BadF);
        }
        self.msg[self.msg_size..end].copy_from_slice(datagram);
        self.msg_size = end;

        let reached = wanted.is_some_and(|len| self.msg_size >= MSG_TAG_LEN + len);
        if datagram.len() == MSG_CHUNK_LEN && !reached {
            return Ok(Deposit::Partial);
        }
        if self.msg_size < MSG_TAG_LEN {
            self.discard_message();
            return Ok(Deposit::Dropped);
        }
        self.available = true;
        Ok(Deposit::Complete)
    }
}

fn wait_error(status: Status) -> Errno {
    match status {
        Status::Invalid => Errno::Inval,
        Status::Denied => Errno::Acces,
        Status::Again | Status::Timeout => Errno::Again,
        _ => Errno::Inval,
    }
}

fn send_error(status: Status) -> Errno {
    match status {
        Status::Invalid => Errno::Inval,
        Status::Denied => Errno::Acces,
        Status::Busy => Errno::Again,
        _ => Errno::Inval,
    }
}

/// The message-queue table of one task
#[derive(Debug, Clone)]
pub struct MsgQueueEngine {
    slots: [QueueSlot; MSGQ_MAX],
}

impl MsgQueueEngine {
    pub const fn new() -> Self {
        Self {
            slots: [QueueSlot::EMPTY; MSGQ_MAX],
        }
    }

    fn find(&self, key: TaskHandle) -> Option<usize> {
        self.slots.iter().position(|s| s.set && s.key == key)
    }

    fn bound(&self, msqid: usize) -> Result<&QueueSlot, Errno> {
        self.slots
            .get(msqid)
            .filter(|s| s.set)
            .ok_or(Errno::Inval)
    }

    /// Slot bound as `msqid`
    pub fn slot(&self, msqid: usize) -> Option<&QueueSlot> {
        self.bound(msqid).ok()
    }

    /// Number of bound slots
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.set).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the queue bound to `key`, creating it if asked to
    ///
    /// # Errors
    ///
    /// - `Exist` if `key` is bound and `EXCL` is given
    /// - `NoEnt` if `key` is not bound and neither `CREAT` nor
    ///   [`IPC_PRIVATE`] is given
    /// - `NoMem` if every slot is in use
    pub fn get(&mut self, key: TaskHandle, flags: MsgFlags) -> Result<usize, Errno> {
        if let Some(msqid) = self.find(key) {
            if flags.contains(MsgFlags::EXCL) {
                return Err(Errno::Exist);
            }
            return Ok(msqid);
        }
        if key != IPC_PRIVATE && !flags.contains(MsgFlags::CREAT) {
            return Err(Errno::NoEnt);
        }
        let msqid = self
            .slots
            .iter()
            .position(|s| !s.set)
            .ok_or(Errno::NoMem)?;
        self.slots[msqid] = QueueSlot {
            key,
            perm: MSG_PERM_DEFAULT,
            set: true,
            ..QueueSlot::EMPTY
        };
        log::debug!("queue {} bound to {}", msqid, key);
        Ok(msqid)
    }

    /// Changes the permission bits of a bound queue
    ///
    /// [`MSG_PERM_READ_ONLY`] makes the queue receive-only.
    pub fn set_perm(&mut self, msqid: usize, perm: u16) -> Result<(), Errno> {
        self.bound(msqid)?;
        self.slots[msqid].perm = perm;
        Ok(())
    }

    /// Sends a typed message to the queue's peer
    ///
    /// The slot is released once the transfer was attempted, whatever its
    /// outcome.
    ///
    /// # Errors
    ///
    /// - `Inval` if `msqid` is not bound
    /// - `TooBig` if `mtext` exceeds [`MSG_MAX_SIZE`]
    /// - `Perm` on a receive-only queue
    /// - `Acces`/`Again`/`Inval` as reported by the kernel send
    pub fn send<K: Kernel>(
        &mut self,
        kernel: &mut K,
        msqid: usize,
        mtype: i32,
        mtext: &[u8],
        _flags: MsgFlags,
    ) -> Result<(), Errno> {
        let slot = self.bound(msqid)?;
        if mtext.len() > MSG_MAX_SIZE {
            return Err(Errno::TooBig);
        }
        if slot.perm == MSG_PERM_READ_ONLY {
            return Err(Errno::Perm);
        }
        let key = slot.key;

        let result = transmit(kernel, key, mtype, mtext);
        self.slots[msqid] = QueueSlot::EMPTY;
        match result {
            Ok(()) => log::trace!("sent {} bytes of type {} to {}", mtext.len(), mtype, key),
            Err(errno) => log::debug!("send to {} failed: {}", key, errno),
        }
        result
    }

    /// Receives a message from the queue
    ///
    /// `msgtyp` selects the message: 0 takes any type, a non-zero value
    /// takes that type (or, with `EXCEPT`, any other type).
    ///
    /// # Errors
    ///
    /// - `Inval` if `msqid` is not bound
    /// - `NoMem` if a complete message of another type is already buffered
    /// - `Again` if nothing matching could be received (with `NOWAIT`, or
    ///   when the kernel reports a timeout)
    /// - `TooBig` if the message is longer than `mtext` without `NOERROR`;
    ///   the message stays buffered
    /// - `BadF` if the incoming message overflows the slot
    /// - `Acces` if the kernel refuses the wait
    pub fn recv<K: Kernel>(
        &mut self,
        kernel: &mut K,
        msqid: usize,
        mtext: &mut [u8],
        msgtyp: i64,
        flags: MsgFlags,
    ) -> Result<Received, Errno> {
        self.bound(msqid)?;
        let nowait = flags.contains(MsgFlags::NOWAIT);
        let timeout = if nowait {
            WaitTimeout::NoWait
        } else {
            WaitTimeout::Forever
        };

        loop {
            let slot = &self.slots[msqid];
            if slot.available {
                if slot.matches(msgtyp, flags) {
                    return self.deliver(kernel, msqid, mtext, flags);
                }
                return Err(Errno::NoMem);
            }

            kernel
                .wait_for_event(EventKind::Ipc, timeout)
                .into_result()
                .map_err(wait_error)?;

            let mut datagram = [0u8; MSG_CHUNK_LEN];
            let (source, len) = {
                let event = kernel.exchange().event().ok_or(Errno::Inval)?;
                if event.header.kind != EventKind::Ipc || event.payload.len() > MSG_CHUNK_LEN {
                    return Err(Errno::Inval);
                }
                datagram[..event.payload.len()].copy_from_slice(event.payload);
                (event.header.source, event.payload.len())
            };

            let target = if self.slots[msqid].key == source {
                msqid
            } else if let Some(other) = self.find(source) {
                log::trace!("datagram from {} routed to queue {}", source, other);
                other
            } else {
                log::warn!("dropping datagram from unbound {}", source);
                continue;
            };

            let wanted = (target == msqid).then_some(mtext.len());
            match self.slots[target].deposit(&datagram[..len], wanted) {
                Err(errno) if target == msqid => {
                    log::warn!("queue {} overflowed, message discarded", msqid);
                    return Err(errno);
                }
                Err(_) => log::warn!("queue {} overflowed, message discarded", target),
                Ok(Deposit::Dropped) => {
                    log::warn!("queue {} dropped a datagram from {}", target, source)
                }
                Ok(Deposit::Complete) if target == msqid => {
                    crate::libc_assert!(self.slots[msqid].msg_size <= MSGQ_BUFFER_LEN);
                    if self.slots[msqid].matches(msgtyp, flags) {
                        return self.deliver(kernel, msqid, mtext, flags);
                    }
                    if nowait {
                        return Err(Errno::Again);
                    }
                }
                Ok(_) => {}
            }
        }
    }

    fn deliver<K: Kernel>(
        &mut self,
        kernel: &mut K,
        msqid: usize,
        mtext: &mut [u8],
        flags: MsgFlags,
    ) -> Result<Received, Errno> {
        let text_len = self.slots[msqid].text().len();
        if text_len > mtext.len() && !flags.contains(MsgFlags::NOERROR) {
            return Err(Errno::TooBig);
        }
        let now_us = read_time_us(kernel).unwrap_or(0);

        let slot = &mut self.slots[msqid];
        let len = text_len.min(mtext.len());
        mtext[..len].copy_from_slice(&slot.text()[..len]);
        let mtype = slot.mtype();
        slot.discard_message();
        slot.rtime_us = now_us;
        Ok(Received { mtype, len })
    }
}

impl Default for MsgQueueEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Frames and sends one message, chunk by chunk
fn transmit<K: Kernel>(
    kernel: &mut K,
    target: TaskHandle,
    mtype: i32,
    mtext: &[u8],
) -> Result<(), Errno> {
    let tag = mtype.to_le_bytes();
    let total = MSG_TAG_LEN + mtext.len();
    let mut offset = 0;
    loop {
        let len = (total - offset).min(MSG_CHUNK_LEN);
        let mut chunk = [0u8; MSG_CHUNK_LEN];
        for (i, byte) in chunk[..len].iter_mut().enumerate() {
            let pos = offset + i;
            *byte = if pos < MSG_TAG_LEN {
                tag[pos]
            } else {
                mtext[pos - MSG_TAG_LEN]
            };
        }
        kernel
            .exchange_mut()
            .copy_from_user(&chunk[..len])
            .into_result()
            .map_err(send_error)?;
        kernel
            .send_ipc(target, len)
            .into_result()
            .map_err(send_error)?;
        offset += len;
        if len < MSG_CHUNK_LEN {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_kernel::fault_injection::{FaultPlan, Syscall, SyscallFault};
    use sim_kernel::test_utils::{tagged_message, PeerTask};
    use sim_kernel::SimulatedKernel;

    const PEER: PeerTask = PeerTask::new(0x100);
    const OTHER: PeerTask = PeerTask::new(0x200);

    fn bound(engine: &mut MsgQueueEngine, peer: PeerTask) -> usize {
        engine.get(peer.handle(), MsgFlags::CREAT).unwrap()
    }

    #[test]
    fn test_get_binds_and_finds() {
        let mut engine = MsgQueueEngine::new();
        let id = bound(&mut engine, PEER);
        assert_eq!(engine.get(PEER.handle(), MsgFlags::empty()), Ok(id));
        assert_eq!(engine.slot(id).unwrap().perm(), MSG_PERM_DEFAULT);
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_get_flags() {
        let mut engine = MsgQueueEngine::new();
        assert_eq!(
            engine.get(PEER.handle(), MsgFlags::empty()),
            Err(Errno::NoEnt)
        );
        bound(&mut engine, PEER);
        assert_eq!(
            engine.get(PEER.handle(), MsgFlags::CREAT | MsgFlags::EXCL),
            Err(Errno::Exist)
        );
        assert!(engine.get(IPC_PRIVATE, MsgFlags::empty()).is_ok());
    }

    #[test]
    fn test_get_table_full() {
        let mut engine = MsgQueueEngine::new();
        for raw in 1..=MSGQ_MAX as u32 {
            engine
                .get(TaskHandle::from_raw(raw), MsgFlags::CREAT)
                .unwrap();
        }
        assert_eq!(
            engine.get(TaskHandle::from_raw(0x999), MsgFlags::CREAT),
            Err(Errno::NoMem)
        );
    }

    #[test]
    fn test_send_short_message() {
        let mut kernel = SimulatedKernel::new();
        let mut engine = MsgQueueEngine::new();
        let id = bound(&mut engine, PEER);

        engine
            .send(&mut kernel, id, 5, b"hello", MsgFlags::empty())
            .unwrap();
        assert_eq!(kernel.sent().len(), 1);
        assert_eq!(PEER.received(&kernel), vec![(5, b"hello".to_vec())]);
        // The slot is released by the send
        assert!(engine.slot(id).is_none());
    }

    #[test]
    fn test_send_chunks_long_message() {
        let mut kernel = SimulatedKernel::new();
        let mut engine = MsgQueueEngine::new();
        let id = bound(&mut engine, PEER);
        let text: Vec<u8> = (0..200u8).collect();

        engine
            .send(&mut kernel, id, 1, &text, MsgFlags::empty())
            .unwrap();
        let lens: Vec<usize> = kernel.sent().iter().map(|s| s.payload.len()).collect();
        assert_eq!(lens, vec![MSG_CHUNK_LEN, 204 - MSG_CHUNK_LEN]);
        assert_eq!(PEER.received(&kernel), vec![(1, text)]);
    }

    #[test]
    fn test_send_exact_multiple_adds_terminator() {
        let mut kernel = SimulatedKernel::new();
        let mut engine = MsgQueueEngine::new();
        let id = bound(&mut engine, PEER);
        let text = vec![7u8; MSG_CHUNK_LEN - MSG_TAG_LEN];

        engine
            .send(&mut kernel, id, 2, &text, MsgFlags::empty())
            .unwrap();
        let lens: Vec<usize> = kernel.sent().iter().map(|s| s.payload.len()).collect();
        assert_eq!(lens, vec![MSG_CHUNK_LEN, 0]);
        assert_eq!(PEER.received(&kernel), vec![(2, text)]);
    }

    #[test]
    fn test_send_rejections() {
        let mut kernel = SimulatedKernel::new();
        let mut engine = MsgQueueEngine::new();
        assert_eq!(
            engine.send(&mut kernel, 0, 1, b"x", MsgFlags::empty()),
            Err(Errno::Inval)
        );
        assert_eq!(
            engine.send(&mut kernel, MSGQ_MAX, 1, b"x", MsgFlags::empty()),
            Err(Errno::Inval)
        );

        let id = bound(&mut engine, PEER);
        let big = vec![0u8; MSG_MAX_SIZE + 1];
        assert_eq!(
            engine.send(&mut kernel, id, 1, &big, MsgFlags::empty()),
            Err(Errno::TooBig)
        );
        assert!(engine.slot(id).is_some());

        engine.set_perm(id, MSG_PERM_READ_ONLY).unwrap();
        assert_eq!(
            engine.send(&mut kernel, id, 1, b"x", MsgFlags::empty()),
            Err(Errno::Perm)
        );
        assert!(kernel.sent().is_empty());
    }

    #[test]
    fn test_send_busy_releases_slot() {
        let plan = FaultPlan::new().with_fault(SyscallFault::FailNext {
            syscall: Syscall::SendIpc,
            status: Status::Busy,
            count: 1,
        });
        let mut kernel = SimulatedKernel::new().with_fault_plan(plan);
        let mut engine = MsgQueueEngine::new();
        let id = bound(&mut engine, PEER);

        assert_eq!(
            engine.send(&mut kernel, id, 1, b"x", MsgFlags::empty()),
            Err(Errno::Again)
        );
        assert!(engine.slot(id).is_none());
    }

    #[test]
    fn test_send_denied() {
        let plan = FaultPlan::new().with_fault(SyscallFault::FailAlways {
            syscall: Syscall::SendIpc,
            status: Status::Denied,
        });
        let mut kernel = SimulatedKernel::new().with_fault_plan(plan);
        let mut engine = MsgQueueEngine::new();
        let id = bound(&mut engine, PEER);
        assert_eq!(
            engine.send(&mut kernel, id, 1, b"x", MsgFlags::empty()),
            Err(Errno::Acces)
        );
    }

    #[test]
    fn test_recv_single_chunk() {
        let mut kernel = SimulatedKernel::new();
        let mut engine = MsgQueueEngine::new();
        let id = bound(&mut engine, PEER);
        PEER.send_message(&mut kernel, 3, b"ping").unwrap();

        let mut buf = [0u8; 16];
        let got = engine
            .recv(&mut kernel, id, &mut buf, 0, MsgFlags::empty())
            .unwrap();
        assert_eq!(got, Received { mtype: 3, len: 4 });
        assert_eq!(&buf[..4], b"ping");
        assert!(!engine.slot(id).unwrap().is_available());
    }

    #[test]
    fn test_recv_reassembles_max_message() {
        let mut kernel = SimulatedKernel::new();
        let mut engine = MsgQueueEngine::new();
        let id = bound(&mut engine, PEER);
        let text: Vec<u8> = (0..MSG_MAX_SIZE).map(|i| i as u8).collect();
        PEER.send_message(&mut kernel, -9, &text).unwrap();

        let mut buf = [0u8; MSG_MAX_SIZE];
        let got = engine
            .recv(&mut kernel, id, &mut buf, 0, MsgFlags::empty())
            .unwrap();
        assert_eq!(got, Received { mtype: -9, len: MSG_MAX_SIZE });
        assert_eq!(&buf[..], &text[..]);
    }

    #[test]
    fn test_recv_exact_multiple() {
        let mut kernel = SimulatedKernel::new();
        let mut engine = MsgQueueEngine::new();
        let id = bound(&mut engine, PEER);
        let text = vec![0x5au8; 2 * MSG_CHUNK_LEN - MSG_TAG_LEN];
        PEER.send_message(&mut kernel, 1, &text).unwrap();

        let mut buf = [0u8; MSG_MAX_SIZE];
        let got = engine
            .recv(&mut kernel, id, &mut buf, 0, MsgFlags::empty())
            .unwrap();
        assert_eq!(got.len, text.len());
        assert_eq!(&buf[..got.len], &text[..]);
        assert!(kernel.inbox().is_empty());
    }

    #[test]
    fn test_recv_completes_at_requested_length() {
        let mut kernel = SimulatedKernel::new();
        let mut engine = MsgQueueEngine::new();
        let id = bound(&mut engine, PEER);
        let text = vec![0x3cu8; MSG_CHUNK_LEN - MSG_TAG_LEN];
        kernel
            .deliver_datagram(PEER.handle(), &tagged_message(7, &text))
            .unwrap();

        let mut buf = [0u8; MSG_CHUNK_LEN - MSG_TAG_LEN];
        let got = engine
            .recv(&mut kernel, id, &mut buf, 7, MsgFlags::NOWAIT)
            .unwrap();
        assert_eq!(got, Received { mtype: 7, len: text.len() });
        assert_eq!(&buf[..], &text[..]);
        assert_eq!(engine.slot(id).unwrap().buffered(), 0);
    }

    #[test]
    fn test_recv_skips_terminator_after_length_completion() {
        let mut kernel = SimulatedKernel::new();
        let mut engine = MsgQueueEngine::new();
        let id = bound(&mut engine, PEER);
        let text = vec![9u8; MSG_CHUNK_LEN - MSG_TAG_LEN];
        PEER.send_message(&mut kernel, 1, &text).unwrap();
        PEER.send_message(&mut kernel, 2, b"next").unwrap();

        let mut buf = [0u8; MSG_CHUNK_LEN - MSG_TAG_LEN];
        let got = engine
            .recv(&mut kernel, id, &mut buf, 0, MsgFlags::NOWAIT)
            .unwrap();
        assert_eq!(got.len, text.len());
        // The empty terminator is still queued and is consumed quietly
        assert_eq!(kernel.inbox().len(), 2);

        let got = engine
            .recv(&mut kernel, id, &mut buf, 0, MsgFlags::NOWAIT)
            .unwrap();
        assert_eq!(got, Received { mtype: 2, len: 4 });
        assert_eq!(&buf[..4], b"next");
        assert!(kernel.inbox().is_empty());
    }

    #[test]
    fn test_recv_allowed_on_read_only_queue() {
        let mut kernel = SimulatedKernel::new();
        let mut engine = MsgQueueEngine::new();
        let id = bound(&mut engine, PEER);
        engine.set_perm(id, MSG_PERM_READ_ONLY).unwrap();
        PEER.send_message(&mut kernel, 5, b"ro").unwrap();

        let mut buf = [0u8; 8];
        let got = engine
            .recv(&mut kernel, id, &mut buf, 0, MsgFlags::empty())
            .unwrap();
        assert_eq!(got, Received { mtype: 5, len: 2 });
        assert_eq!(engine.slot(id).unwrap().perm(), MSG_PERM_READ_ONLY);
    }

    #[test]
    fn test_recv_partial_message_nowait() {
        let mut kernel = SimulatedKernel::new();
        let mut engine = MsgQueueEngine::new();
        let id = bound(&mut engine, PEER);
        let text = vec![1u8; 200];
        PEER.send_partial(&mut kernel, 1, &text, 1).unwrap();

        let mut buf = [0u8; MSG_MAX_SIZE];
        assert_eq!(
            engine.recv(&mut kernel, id, &mut buf, 0, MsgFlags::NOWAIT),
            Err(Errno::Again)
        );
        assert_eq!(engine.slot(id).unwrap().buffered(), MSG_CHUNK_LEN);

        // The rest arrives later
        kernel
            .deliver_datagram(PEER.handle(), &vec![1u8; 204 - MSG_CHUNK_LEN])
            .unwrap();
        let got = engine
            .recv(&mut kernel, id, &mut buf, 0, MsgFlags::NOWAIT)
            .unwrap();
        assert_eq!(got.len, 200);
    }

    #[test]
    fn test_recv_type_filter() {
        let mut kernel = SimulatedKernel::new();
        let mut engine = MsgQueueEngine::new();
        let id = bound(&mut engine, PEER);
        PEER.send_message(&mut kernel, 4, b"four").unwrap();

        let mut buf = [0u8; 16];
        assert_eq!(
            engine.recv(&mut kernel, id, &mut buf, 7, MsgFlags::NOWAIT),
            Err(Errno::Again)
        );
        // Buffered, but not the requested type
        assert_eq!(
            engine.recv(&mut kernel, id, &mut buf, 7, MsgFlags::empty()),
            Err(Errno::NoMem)
        );
        assert_eq!(
            engine.recv(&mut kernel, id, &mut buf, 4, MsgFlags::EXCEPT),
            Err(Errno::NoMem)
        );
        let got = engine
            .recv(&mut kernel, id, &mut buf, 7, MsgFlags::EXCEPT)
            .unwrap();
        assert_eq!(got.mtype, 4);
    }

    #[test]
    fn test_recv_too_big_keeps_message() {
        let mut kernel = SimulatedKernel::new();
        let mut engine = MsgQueueEngine::new();
        let id = bound(&mut engine, PEER);
        PEER.send_message(&mut kernel, 1, b"0123456789").unwrap();

        let mut small = [0u8; 4];
        assert_eq!(
            engine.recv(&mut kernel, id, &mut small, 0, MsgFlags::empty()),
            Err(Errno::TooBig)
        );
        assert!(engine.slot(id).unwrap().is_available());

        let got = engine
            .recv(&mut kernel, id, &mut small, 0, MsgFlags::NOERROR)
            .unwrap();
        assert_eq!(got.len, 4);
        assert_eq!(&small, b"0123");
        assert!(!engine.slot(id).unwrap().is_available());
    }

    #[test]
    fn test_recv_nothing_pending() {
        let mut kernel = SimulatedKernel::new();
        let mut engine = MsgQueueEngine::new();
        let id = bound(&mut engine, PEER);
        let mut buf = [0u8; 8];

        assert_eq!(
            engine.recv(&mut kernel, id, &mut buf, 0, MsgFlags::NOWAIT),
            Err(Errno::Again)
        );
        assert_eq!(kernel.waits()[0].timeout, WaitTimeout::NoWait);

        assert_eq!(
            engine.recv(&mut kernel, id, &mut buf, 0, MsgFlags::empty()),
            Err(Errno::Again)
        );
        assert_eq!(kernel.waits()[1].timeout, WaitTimeout::Forever);
    }

    #[test]
    fn test_recv_unbound() {
        let mut kernel = SimulatedKernel::new();
        let mut engine = MsgQueueEngine::new();
        let mut buf = [0u8; 8];
        assert_eq!(
            engine.recv(&mut kernel, 2, &mut buf, 0, MsgFlags::NOWAIT),
            Err(Errno::Inval)
        );
    }

    #[test]
    fn test_recv_routes_other_peers_datagrams() {
        let mut kernel = SimulatedKernel::new();
        let mut engine = MsgQueueEngine::new();
        let mine = bound(&mut engine, PEER);
        let theirs = bound(&mut engine, OTHER);
        OTHER.send_message(&mut kernel, 8, b"for other").unwrap();

        let mut buf = [0u8; 32];
        assert_eq!(
            engine.recv(&mut kernel, mine, &mut buf, 0, MsgFlags::NOWAIT),
            Err(Errno::Again)
        );
        assert!(engine.slot(theirs).unwrap().is_available());

        let waits_before = kernel.waits().len();
        let got = engine
            .recv(&mut kernel, theirs, &mut buf, 0, MsgFlags::NOWAIT)
            .unwrap();
        assert_eq!(got, Received { mtype: 8, len: 9 });
        assert_eq!(kernel.waits().len(), waits_before);
    }

    #[test]
    fn test_recv_drops_unbound_sources() {
        let mut kernel = SimulatedKernel::new();
        let mut engine = MsgQueueEngine::new();
        let id = bound(&mut engine, PEER);
        OTHER.send_message(&mut kernel, 1, b"stranger").unwrap();
        PEER.send_message(&mut kernel, 2, b"friend").unwrap();

        let mut buf = [0u8; 32];
        let got = engine
            .recv(&mut kernel, id, &mut buf, 0, MsgFlags::empty())
            .unwrap();
        assert_eq!(got.mtype, 2);
        assert_eq!(&buf[..got.len], b"friend");
    }

    #[test]
    fn test_recv_overflow() {
        let mut kernel = SimulatedKernel::new();
        let mut engine = MsgQueueEngine::new();
        let id = bound(&mut engine, PEER);
        let full = [0xffu8; MSG_CHUNK_LEN];
        for _ in 0..3 {
            kernel.deliver_datagram(PEER.handle(), &full).unwrap();
        }

        let mut buf = [0u8; MSG_MAX_SIZE];
        assert_eq!(
            engine.recv(&mut kernel, id, &mut buf, 0, MsgFlags::empty()),
            Err(Errno::BadF)
        );
        assert_eq!(engine.slot(id).unwrap().buffered(), 0);
    }

    #[test]
    fn test_recv_wait_denied() {
        let plan = FaultPlan::new().with_fault(SyscallFault::FailAlways {
            syscall: Syscall::WaitForEvent,
            status: Status::Denied,
        });
        let mut kernel = SimulatedKernel::new().with_fault_plan(plan);
        let mut engine = MsgQueueEngine::new();
        let id = bound(&mut engine, PEER);
        let mut buf = [0u8; 8];
        assert_eq!(
            engine.recv(&mut kernel, id, &mut buf, 0, MsgFlags::empty()),
            Err(Errno::Acces)
        );
    }

    #[test]
    fn test_recv_records_time() {
        let mut kernel = SimulatedKernel::new();
        kernel.advance_millis(3);
        let mut engine = MsgQueueEngine::new();
        let id = bound(&mut engine, PEER);
        PEER.send_message(&mut kernel, 1, b"t").unwrap();

        let mut buf = [0u8; 8];
        engine
            .recv(&mut kernel, id, &mut buf, 0, MsgFlags::empty())
            .unwrap();
        assert_eq!(engine.slot(id).unwrap().rtime_us(), 3_000);
    }
}
