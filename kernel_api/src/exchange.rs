//! # Exchange Area
//!
//! The fixed shared region between a task and the kernel.
//!
//! ## Layout
//!
//! When the kernel delivers an event, the area holds a header followed by
//! the event payload:
//!
//! ```text
//! offset 0  u16  event kind
//! offset 2  u16  payload length
//! offset 4  u32  source task handle
//! offset 8  ...  payload (EXCHANGE_PAYLOAD_LEN bytes)
//! ```
//!
//! All fields are little endian. For every other syscall the area is a raw
//! byte buffer starting at offset 0: the task stages outgoing IPC data there,
//! and the kernel leaves cycle counts and entropy there.

use crate::{EventKind, Status, TaskHandle};

/// Total size of the exchange area in bytes
pub const EXCHANGE_AREA_LEN: usize = 128;

/// Size of the event header
pub const EXCHANGE_HEADER_LEN: usize = 8;

/// Maximum event payload
pub const EXCHANGE_PAYLOAD_LEN: usize = EXCHANGE_AREA_LEN - EXCHANGE_HEADER_LEN;

/// Decoded event header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventHeader {
    pub kind: EventKind,
    pub length: u16,
    pub source: TaskHandle,
}

/// An event as currently held in the exchange area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeEvent<'a> {
    pub header: EventHeader,
    pub payload: &'a [u8],
}

/// The task-local exchange area
#[derive(Clone)]
pub struct ExchangeArea {
    bytes: [u8; EXCHANGE_AREA_LEN],
}

impl ExchangeArea {
    /// Creates a zeroed area
    pub const fn new() -> Self {
        Self {
            bytes: [0; EXCHANGE_AREA_LEN],
        }
    }

    /// Raw view of the whole area
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Zeroes the whole area
    pub fn clear(&mut self) {
        self.bytes = [0; EXCHANGE_AREA_LEN];
    }

    /// Stages `data` at the start of the area (task to kernel)
    pub fn copy_from_user(&mut self, data: &[u8]) -> Status {
        if data.len() > EXCHANGE_AREA_LEN {
            return Status::Invalid;
        }
        self.bytes[..data.len()].copy_from_slice(data);
        Status::Ok
    }

    /// Copies the start of the area into `out` (kernel to task)
    pub fn copy_to_user(&self, out: &mut [u8]) -> Status {
        if out.len() > EXCHANGE_AREA_LEN {
            return Status::Invalid;
        }
        out.copy_from_slice(&self.bytes[..out.len()]);
        Status::Ok
    }

    /// Reads a little-endian u32 left by the kernel
    pub fn read_u32(&self) -> Result<u32, Status> {
        let mut raw = [0u8; 4];
        self.copy_to_user(&mut raw).into_result()?;
        Ok(u32::from_le_bytes(raw))
    }

    /// Reads a little-endian u64 left by the kernel
    pub fn read_u64(&self) -> Result<u64, Status> {
        let mut raw = [0u8; 8];
        self.copy_to_user(&mut raw).into_result()?;
        Ok(u64::from_le_bytes(raw))
    }

    /// Writes a little-endian u32 at the start of the area
    pub fn write_u32(&mut self, value: u32) -> Status {
        self.copy_from_user(&value.to_le_bytes())
    }

    /// Writes a little-endian u64 at the start of the area
    pub fn write_u64(&mut self, value: u64) -> Status {
        self.copy_from_user(&value.to_le_bytes())
    }

    /// Writes an event header and payload (kernel side)
    pub fn write_event(&mut self, kind: EventKind, source: TaskHandle, payload: &[u8]) -> Status {
        if payload.len() > EXCHANGE_PAYLOAD_LEN {
            return Status::Invalid;
        }
        self.bytes[0..2].copy_from_slice(&(kind as u16).to_le_bytes());
        self.bytes[2..4].copy_from_slice(&(payload.len() as u16).to_le_bytes());
        self.bytes[4..8].copy_from_slice(&source.as_raw().to_le_bytes());
        self.bytes[EXCHANGE_HEADER_LEN..EXCHANGE_HEADER_LEN + payload.len()]
            .copy_from_slice(payload);
        Status::Ok
    }

    /// Decodes the event currently held in the area
    ///
    /// Returns `None` when the header kind is unknown or the announced
    /// length exceeds the payload capacity.
    pub fn event(&self) -> Option<ExchangeEvent<'_>> {
        let kind = EventKind::from_raw(u16::from_le_bytes([self.bytes[0], self.bytes[1]]))?;
        let length = u16::from_le_bytes([self.bytes[2], self.bytes[3]]);
        if usize::from(length) > EXCHANGE_PAYLOAD_LEN {
            return None;
        }
        let source = TaskHandle::from_raw(u32::from_le_bytes([
            self.bytes[4],
            self.bytes[5],
            self.bytes[6],
            self.bytes[7],
        ]));
        let end = EXCHANGE_HEADER_LEN + usize::from(length);
        Some(ExchangeEvent {
            header: EventHeader {
                kind,
                length,
                source,
            },
            payload: &self.bytes[EXCHANGE_HEADER_LEN..end],
        })
    }
}

impl Default for ExchangeArea {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for ExchangeArea {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ExchangeArea")
            .field("event", &self.event().map(|e| e.header))
            .finish()
    }
}
