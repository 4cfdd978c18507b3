// Variable-length SPSC ring: header-framed, block-aligned messages over a byte buffer

use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU64};

use crate::SPSC::Structs::MessageHeader;

/// Byte storage of a [`VariableQueue`], aligned so every block boundary is aligned for
/// [`MessageHeader`].
#[repr(C, align(64))]
pub(crate) struct Storage<const CAP: usize>(pub(crate) UnsafeCell<[u8; CAP]>);

/// A lock-free single-producer/single-consumer ring of variable-length messages.
///
/// Messages are laid out back to back in a `CAP`-byte buffer. Each one is a
/// [`MessageHeader`] followed by its payload, padded to a multiple of `BLOCK`. When a
/// message does not fit between the write position and the end of the buffer, the
/// producer leaves a one-block wrap sentinel there and writes the message at offset 0.
///
/// ```text
/// offset 0                                                            CAP
/// ┌──────────┬──────────────┬──────────┬─────────┬─────────┬───────────┐
/// │ hdr│ msg │ hdr│ msg     │   free   │ hdr│msg │ hdr│msg │ WRAP │pad │
/// └──────────┴──────────────┴──────────┴─────────┴─────────┴───────────┘
///                           ^ tail     ^ head
/// ```
///
/// ### Concurrency Design:
/// - `tail` and `head` are monotonically increasing byte cursors; the buffer offset of a
///   cursor is `cursor % CAP`. `tail - head` is the number of bytes in use, so a full ring
///   and an empty ring are told apart without sacrificing a block.
/// - **Producer**: reserves space with `alloc`, writes header and payload, then
///   release-stores the new `tail`.
/// - **Consumer**: acquire-loads `tail`, reads the message at `head`, and release-stores
///   the new `head` once it is done with the payload.
#[repr(C)]
pub struct VariableQueue<const CAP: usize> {
    /// Byte cursor one past the last published message. Written only by the producer.
    pub(crate) tail: CachePadded<AtomicU64>,

    /// Byte cursor of the oldest unread message. Written only by the consumer.
    pub(crate) head: CachePadded<AtomicU64>,

    /// Set while a [`VariableProducer`] is alive.
    pub(crate) producer_claimed: AtomicBool,

    /// Set while a [`VariableConsumer`] is alive.
    pub(crate) consumer_claimed: AtomicBool,

    pub(crate) storage: Storage<CAP>,
}

// Buffer regions are partitioned by the head/tail protocol; each cursor has one writer.
unsafe impl<const CAP: usize> Send for VariableQueue<CAP> {}
unsafe impl<const CAP: usize> Sync for VariableQueue<CAP> {}

/// Space reserved by `alloc` and not yet published.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Reservation {
    /// Cursor of the message header (past the wrap sentinel, if one was written).
    pub(crate) start: u64,
    /// Cursor one past the message.
    pub(crate) end: u64,
}

/// Write end of a [`VariableQueue`]. At most one exists per queue.
pub struct VariableProducer<'a, const CAP: usize> {
    pub(crate) queue: &'a VariableQueue<CAP>,

    /// Local copy of `queue.tail`; the producer is its only writer.
    pub(crate) tail: u64,

    /// Last observed `queue.head`. Refreshed only when the ring looks full.
    pub(crate) cached_head: u64,

    pub(crate) pending: Option<Reservation>,
}

/// Read end of a [`VariableQueue`]. At most one exists per queue.
pub struct VariableConsumer<'a, const CAP: usize> {
    pub(crate) queue: &'a VariableQueue<CAP>,

    /// Local copy of `queue.head`; the consumer is its only writer.
    pub(crate) head: u64,
}

/// Borrowed view of the message at the front of a [`VariableQueue`].
///
/// The payload is read in place; nothing is copied.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Message<'a> {
    pub(crate) header: MessageHeader,
    pub(crate) payload: &'a [u8],
}

impl<'a> Message<'a> {
    pub fn header(&self) -> MessageHeader {
        self.header
    }

    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Bytes the message occupies in the ring, header and padding included.
    pub fn total_size(&self) -> usize {
        self.header.total_size as usize
    }
}
