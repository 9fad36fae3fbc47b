//! Message queue contract tests
//!
//! These tests define the stable contract between a task's message queues
//! and the peer tasks it talks to: flag values, sizes and the datagram
//! layout on the IPC channel.

use libc_core::config::{MSGQ_BUFFER_LEN, MSG_CHUNK_LEN, MSG_MAX_SIZE, MSG_TAG_LEN};
use libc_core::MsgFlags;

// ===== Flag Values =====
const GOLDEN_FLAGS: [(MsgFlags, u32); 5] = [
    (MsgFlags::CREAT, 0o1000),
    (MsgFlags::EXCL, 0o2000),
    (MsgFlags::NOWAIT, 0o4000),
    (MsgFlags::NOERROR, 0o10000),
    (MsgFlags::EXCEPT, 0o20000),
];

// ===== Sizes =====
const GOLDEN_CHUNK_LEN: usize = 120;
const GOLDEN_TAG_LEN: usize = 4;
const GOLDEN_MAX_SIZE: usize = 252;

// ===== Contract Tests =====
