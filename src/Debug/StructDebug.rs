use std::fmt;
use std::sync::atomic::Ordering;

use crate::Core::region::SharedRegion;
use crate::SPSC::Fixed::{FixedConsumer, FixedProducer, FixedQueue};
use crate::SPSC::InPlace;
use crate::SPSC::Variable::{VariableConsumer, VariableProducer, VariableQueue};

/// Debug function for FixedQueue
///
/// Shows cursors and claims only; slot contents are never read, since the producer may
/// be writing one of them.
pub fn debug_fixed_queue<T: Copy + Default, const N: usize>(
    queue: &FixedQueue<T, N>,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    f.debug_struct("FixedQueue")
        .field("slots", &N)
        .field("capacity", &queue.capacity())
        .field("head", &queue.head.load(Ordering::Relaxed))
        .field("tail", &queue.tail.load(Ordering::Relaxed))
        .field("producer_claimed", &queue.producer_claimed.load(Ordering::Relaxed))
        .field("consumer_claimed", &queue.consumer_claimed.load(Ordering::Relaxed))
        .finish()
}

pub fn debug_fixed_producer<T: Copy + Default, const N: usize>(
    producer: &FixedProducer<'_, T, N>,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    f.debug_struct("FixedProducer")
        .field("queue", &format_args!("{:p}", producer.queue))
        .field("tail", &producer.tail)
        .field("cached_head", &producer.cached_head)
        .field("pending", &producer.pending)
        .finish()
}

pub fn debug_fixed_consumer<T: Copy + Default, const N: usize>(
    consumer: &FixedConsumer<'_, T, N>,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    f.debug_struct("FixedConsumer")
        .field("queue", &format_args!("{:p}", consumer.queue))
        .field("head", &consumer.head)
        .finish()
}

/// Debug function for VariableQueue
///
/// Shows cursors, their buffer offsets and the bytes in use. The message buffer itself is
/// left out.
pub fn debug_variable_queue<const CAP: usize>(
    queue: &VariableQueue<CAP>,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    let head = queue.head.load(Ordering::Relaxed);
    let tail = queue.tail.load(Ordering::Relaxed);
    f.debug_struct("VariableQueue")
        .field("capacity", &CAP)
        .field("head", &head)
        .field("tail", &tail)
        .field("head_offset", &(head % CAP as u64))
        .field("tail_offset", &(tail % CAP as u64))
        .field("used_bytes", &tail.wrapping_sub(head))
        .field("producer_claimed", &queue.producer_claimed.load(Ordering::Relaxed))
        .field("consumer_claimed", &queue.consumer_claimed.load(Ordering::Relaxed))
        .finish_non_exhaustive()
}

pub fn debug_variable_producer<const CAP: usize>(
    producer: &VariableProducer<'_, CAP>,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    f.debug_struct("VariableProducer")
        .field("queue", &format_args!("{:p}", producer.queue))
        .field("tail", &producer.tail)
        .field("cached_head", &producer.cached_head)
        .field("pending", &producer.pending)
        .finish()
}

pub fn debug_variable_consumer<const CAP: usize>(
    consumer: &VariableConsumer<'_, CAP>,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    f.debug_struct("VariableConsumer")
        .field("queue", &format_args!("{:p}", consumer.queue))
        .field("head", &consumer.head)
        .finish()
}

/// Debug function for SharedRegion
///
/// Shows:
/// - Region name and role (creator or attacher)
/// - Header pointer location and initialization status
/// - Opaque reference to the mapping
pub fn debug_shared_region<Q: InPlace>(
    region: &SharedRegion<Q>,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    f.debug_struct("SharedRegion")
        .field("shm", &"<opaque>")
        .field("name", &region.name())
        .field("creator", &region.is_creator())
        .field("header", &format_args!("{:p}", region.header_ptr()))
        .field("kind", &Q::KIND)
        .field("mapped_size", &region.mapped_size())
        .field("initialized", &region.is_initialized())
        .finish()
}
