//! Test utilities for driving the POSIX layer through the simulation
//!
//! A [`PeerTask`] plays the remote end of a message queue: it frames typed
//! messages the same way the POSIX layer does (4-byte little-endian type tag
//! followed by the text, cut into exchange-sized chunks, with an empty
//! terminator chunk when the framed length is an exact multiple of the
//! chunk size) and decodes what the task under test sent.

use crate::message_queue::QueueError;
use crate::{SentIpc, SimulatedKernel};
use kernel_api::{TaskHandle, EXCHANGE_PAYLOAD_LEN};

/// Size of the type tag in front of every message
pub const TAG_LEN: usize = 4;

/// Builds the framed (tag + text) representation of a message
pub fn tagged_message(mtype: i32, mtext: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(TAG_LEN + mtext.len());
    framed.extend_from_slice(&mtype.to_le_bytes());
    framed.extend_from_slice(mtext);
    framed
}

/// Cuts a framed message into the datagrams a sender emits
pub fn chunk_message(mtype: i32, mtext: &[u8]) -> Vec<Vec<u8>> {
    let framed = tagged_message(mtype, mtext);
    let mut chunks: Vec<Vec<u8>> = framed
        .chunks(EXCHANGE_PAYLOAD_LEN)
        .map(|chunk| chunk.to_vec())
        .collect();
    if framed.len() % EXCHANGE_PAYLOAD_LEN == 0 {
        chunks.push(Vec::new());
    }
    chunks
}

/// Reassembles the datagrams sent to `target` into (type, text) messages
pub fn decode_sent(sent: &[SentIpc], target: TaskHandle) -> Vec<(i32, Vec<u8>)> {
    let mut messages = Vec::new();
    let mut current: Vec<u8> = Vec::new();
    for datagram in sent.iter().filter(|s| s.target == target) {
        current.extend_from_slice(&datagram.payload);
        if datagram.payload.len() < EXCHANGE_PAYLOAD_LEN {
            if current.len() >= TAG_LEN {
                let mtype = i32::from_le_bytes([current[0], current[1], current[2], current[3]]);
                messages.push((mtype, current[TAG_LEN..].to_vec()));
            }
            current.clear();
        }
    }
    messages
}

/// A remote task exchanging messages with the task under test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerTask {
    handle: TaskHandle,
}

impl PeerTask {
    /// Creates a peer with the given handle
    pub const fn new(raw: u32) -> Self {
        Self {
            handle: TaskHandle::from_raw(raw),
        }
    }

    /// The peer's handle (the message-queue key on the task side)
    pub fn handle(&self) -> TaskHandle {
        self.handle
    }

    /// Queues a complete typed message for the task under test
    pub fn send_message(
        &self,
        kernel: &mut SimulatedKernel,
        mtype: i32,
        mtext: &[u8],
    ) -> Result<(), QueueError> {
        for chunk in chunk_message(mtype, mtext) {
            kernel.deliver_datagram(self.handle, &chunk)?;
        }
        Ok(())
    }

    /// Queues only the first `count` datagrams of a message
    pub fn send_partial(
        &self,
        kernel: &mut SimulatedKernel,
        mtype: i32,
        mtext: &[u8],
        count: usize,
    ) -> Result<(), QueueError> {
        for chunk in chunk_message(mtype, mtext).into_iter().take(count) {
            kernel.deliver_datagram(self.handle, &chunk)?;
        }
        Ok(())
    }

    /// Messages the task under test sent to this peer
    pub fn received(&self, kernel: &SimulatedKernel) -> Vec<(i32, Vec<u8>)> {
        decode_sent(kernel.sent(), self.handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_api::Kernel;

    #[test]
    fn test_short_message_is_one_chunk() {
        let chunks = chunk_message(7, b"payload");
        assert_eq!(chunks.len(), 1);
        assert_eq!(&chunks[0][..4], &7i32.to_le_bytes());
        assert_eq!(&chunks[0][4..], b"payload");
    }

    #[test]
    fn test_long_message_is_chunked() {
        let text = vec![0xa5u8; 200];
        let chunks = chunk_message(1, &text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), EXCHANGE_PAYLOAD_LEN);
        assert_eq!(chunks[1].len(), 204 - EXCHANGE_PAYLOAD_LEN);
    }

    #[test]
    fn test_exact_multiple_gets_terminator() {
        let text = vec![1u8; EXCHANGE_PAYLOAD_LEN - TAG_LEN];
        let chunks = chunk_message(1, &text);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].is_empty());
    }

    #[test]
    fn test_peer_send_and_decode() {
        let peer = PeerTask::new(0x77);
        let mut kernel = SimulatedKernel::new();
        peer.send_message(&mut kernel, 3, b"hi").unwrap();
        assert_eq!(kernel.inbox().len(), 1);

        // Echo the framed message back as if the task had sent it
        let framed = tagged_message(9, b"back");
        kernel.exchange_mut().copy_from_user(&framed);
        kernel.send_ipc(peer.handle(), framed.len());
        assert_eq!(peer.received(&kernel), vec![(9, b"back".to_vec())]);
    }
}
