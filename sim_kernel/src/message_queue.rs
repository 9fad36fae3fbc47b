//! Bounded inbox of kernel events waiting for `wait_for_event`.
//!
//! Provides deterministic FIFO ordering per event kind with an explicit
//! capacity limit.

use kernel_api::{EventKind, TaskHandle, EXCHANGE_PAYLOAD_LEN};
use std::collections::VecDeque;
use thiserror::Error;

/// Queue error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("event inbox is full")]
    Full,
    #[error("event payload of {0} bytes exceeds the exchange area")]
    Oversize(usize),
}

/// An event the kernel will deliver on a future wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEvent {
    pub kind: EventKind,
    pub source: TaskHandle,
    pub payload: Vec<u8>,
}

/// Bounded FIFO queue of pending events.
#[derive(Debug, Clone)]
pub struct EventQueue {
    capacity: usize,
    events: VecDeque<PendingEvent>,
}

impl EventQueue {
    /// Creates a queue with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            events: VecDeque::new(),
        }
    }

    /// Returns the configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of queued events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns how many events of `kind` are queued.
    pub fn count_of(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    /// Pushes an event onto the queue.
    pub fn push(&mut self, event: PendingEvent) -> Result<(), QueueError> {
        if event.payload.len() > EXCHANGE_PAYLOAD_LEN {
            return Err(QueueError::Oversize(event.payload.len()));
        }
        if self.events.len() >= self.capacity {
            return Err(QueueError::Full);
        }
        self.events.push_back(event);
        Ok(())
    }

    /// Pops the oldest event of the given kind, leaving the others queued.
    pub fn pop_kind(&mut self, kind: EventKind) -> Option<PendingEvent> {
        let index = self.events.iter().position(|e| e.kind == kind)?;
        self.events.remove(index)
    }
}
