// Fixed-slot SPSC ring: N slots of one element type, two single-writer indices

use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicUsize};

/// A lock-free single-producer/single-consumer ring of `N` slots.
///
/// This struct is the whole queue: it can be placed on the stack, boxed, or constructed in
/// place inside shared memory. It is marked `#[repr(C)]` so the layout is stable.
///
/// ### Concurrency Design:
/// - **Producer**: owns `tail`, the next slot to write. It reserves slot `tail` with
///   `alloc`, writes into it, then publishes it with a release store of `tail + 1`.
/// - **Consumer**: owns `head`, the next slot to read. It acquire-loads `tail` to see
///   published slots and release-stores `head + 1` to hand a slot back.
/// - One slot is always left empty: `head == tail` is empty, `tail + 1 == head`
///   (mod `N`) is full, so at most `N - 1` elements are live.
#[repr(C)]
pub struct FixedQueue<T, const N: usize> {
    /// Next slot the producer writes. Written only by the producer.
    pub(crate) tail: CachePadded<AtomicUsize>,

    /// Next slot the consumer reads. Written only by the consumer.
    pub(crate) head: CachePadded<AtomicUsize>,

    /// Set while a [`FixedProducer`] is alive.
    pub(crate) producer_claimed: AtomicBool,

    /// Set while a [`FixedConsumer`] is alive.
    pub(crate) consumer_claimed: AtomicBool,

    pub(crate) slots: [UnsafeCell<T>; N],
}

// Slot access is partitioned by the head/tail protocol; each index has one writer.
unsafe impl<T: Send, const N: usize> Send for FixedQueue<T, N> {}
unsafe impl<T: Send, const N: usize> Sync for FixedQueue<T, N> {}

/// Write end of a [`FixedQueue`]. At most one exists per queue.
pub struct FixedProducer<'a, T, const N: usize> {
    pub(crate) queue: &'a FixedQueue<T, N>,

    /// Local copy of `queue.tail`; the producer is its only writer.
    pub(crate) tail: usize,

    /// Last observed `queue.head`. Refreshed only when the ring looks full.
    pub(crate) cached_head: usize,

    /// A slot was handed out by `alloc` and not yet published.
    pub(crate) pending: bool,
}

/// Read end of a [`FixedQueue`]. At most one exists per queue.
pub struct FixedConsumer<'a, T, const N: usize> {
    pub(crate) queue: &'a FixedQueue<T, N>,

    /// Local copy of `queue.head`; the consumer is its only writer.
    pub(crate) head: usize,
}
