use std::cell::UnsafeCell;
use std::io;
use std::mem::MaybeUninit;
use std::ptr::{self, addr_of_mut};
use std::slice;
use std::sync::atomic::Ordering::{Acquire, Relaxed, Release};
use std::sync::atomic::{AtomicBool, AtomicU64};

use crossbeam_utils::CachePadded;

use super::layout::{frame_size, Frame, BLOCK, HEADER_SIZE};
use super::Variable::{
    Message, Reservation, Storage, VariableConsumer, VariableProducer, VariableQueue,
};
use crate::trace::{debug, trace, warn};
use crate::SPSC::Structs::MessageHeader;
use crate::SPSC::{boxed_in_place, InPlace};

impl<const CAP: usize> VariableQueue<CAP> {
    const VALID: () = {
        assert!(CAP % BLOCK == 0, "VariableQueue capacity must be a multiple of BLOCK");
        assert!(CAP >= 2 * BLOCK, "VariableQueue capacity must hold at least two blocks");
        assert!(CAP <= u32::MAX as usize, "VariableQueue capacity must fit in a u32");
    };

    /// Create an empty queue by value.
    ///
    /// For large `CAP` prefer [`VariableQueue::boxed`], which never builds the queue on the
    /// stack.
    pub fn new() -> Self {
        let () = Self::VALID;
        Self {
            tail: CachePadded::new(AtomicU64::new(0)),
            head: CachePadded::new(AtomicU64::new(0)),
            producer_claimed: AtomicBool::new(false),
            consumer_claimed: AtomicBool::new(false),
            storage: Storage(UnsafeCell::new([0; CAP])),
        }
    }

    /// Create an empty queue directly on the heap.
    pub fn boxed() -> Box<Self> {
        boxed_in_place()
    }

    /// Construct an empty queue inside caller-provided storage.
    pub fn init(storage: &mut MaybeUninit<Self>) -> &mut Self {
        unsafe {
            Self::init_in_place(storage.as_mut_ptr());
            storage.assume_init_mut()
        }
    }

    /// Size of the message buffer in bytes.
    pub const fn capacity(&self) -> usize {
        CAP
    }

    /// Largest payload `alloc` can ever accept.
    ///
    /// A message of this size only fits when the write position is at the start of the
    /// buffer. With the write position at offset `o`, an emptied queue takes frames of up
    /// to `max(CAP - o, o)` bytes, since a wrapped message must also leave room for the
    /// skipped tail end. Payloads up to `CAP / 2 - HEADER_SIZE` therefore always fit once
    /// the consumer catches up, wherever the write position is; larger ones may be refused
    /// until smaller messages move the write position.
    pub const fn max_message_size(&self) -> usize {
        CAP - HEADER_SIZE
    }

    /// Bytes currently taken by published, unread messages (headers, padding and wrap
    /// gaps included).
    pub fn used_bytes(&self) -> usize {
        let head = self.head.load(Acquire);
        let tail = self.tail.load(Acquire);
        tail.wrapping_sub(head) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.head.load(Acquire) == self.tail.load(Acquire)
    }

    /// Split an exclusively borrowed queue into its two ends.
    pub fn split(&mut self) -> (VariableProducer<'_, CAP>, VariableConsumer<'_, CAP>) {
        *self.producer_claimed.get_mut() = true;
        *self.consumer_claimed.get_mut() = true;
        let queue = &*self;
        (VariableProducer::attach(queue), VariableConsumer::attach(queue))
    }

    /// Claim the producer role.
    ///
    /// Returns `None` while another producer handle for this queue is alive, including one
    /// held by another process sharing the queue.
    pub fn producer(&self) -> Option<VariableProducer<'_, CAP>> {
        if self
            .producer_claimed
            .compare_exchange(false, true, Acquire, Relaxed)
            .is_err()
        {
            warn!("variable queue producer already claimed");
            return None;
        }
        Some(VariableProducer::attach(self))
    }

    /// Claim the consumer role. Returns `None` while another consumer handle is alive.
    pub fn consumer(&self) -> Option<VariableConsumer<'_, CAP>> {
        if self
            .consumer_claimed
            .compare_exchange(false, true, Acquire, Relaxed)
            .is_err()
        {
            warn!("variable queue consumer already claimed");
            return None;
        }
        Some(VariableConsumer::attach(self))
    }

    #[inline]
    fn base(&self) -> *mut u8 {
        self.storage.0.get() as *mut u8
    }

    #[inline]
    const fn offset_of(cursor: u64) -> usize {
        (cursor % CAP as u64) as usize
    }

    /// # Safety
    /// `offset` must be block aligned and below `CAP`, and the block must not be written
    /// concurrently.
    #[inline]
    unsafe fn read_frame(&self, offset: usize) -> Frame {
        Frame::decode(ptr::read(self.base().add(offset) as *const MessageHeader))
    }

    /// # Safety
    /// `offset` must be block aligned and below `CAP`, and the block must be owned by the
    /// producer.
    #[inline]
    unsafe fn write_frame(&self, offset: usize, frame: Frame) {
        ptr::write(self.base().add(offset) as *mut MessageHeader, frame.encode());
    }
}

impl<const CAP: usize> Default for VariableQueue<CAP> {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl<const CAP: usize> InPlace for VariableQueue<CAP> {
    const KIND: u32 = 2;
    const CAPACITY: u64 = CAP as u64;
    const ELEMENT_SIZE: u64 = 1;

    unsafe fn init_in_place(ptr: *mut Self) {
        let () = Self::VALID;
        addr_of_mut!((*ptr).tail).write(CachePadded::new(AtomicU64::new(0)));
        addr_of_mut!((*ptr).head).write(CachePadded::new(AtomicU64::new(0)));
        addr_of_mut!((*ptr).producer_claimed).write(AtomicBool::new(false));
        addr_of_mut!((*ptr).consumer_claimed).write(AtomicBool::new(false));
        // Zeroed so every byte a consumer can observe is initialized.
        ptr::write_bytes(addr_of_mut!((*ptr).storage) as *mut u8, 0, CAP);
    }
}

impl<'a, const CAP: usize> VariableProducer<'a, CAP> {
    fn attach(queue: &'a VariableQueue<CAP>) -> Self {
        trace!("variable queue producer attached");
        Self {
            queue,
            tail: queue.tail.load(Relaxed),
            cached_head: queue.head.load(Acquire),
            pending: None,
        }
    }

    /// Reserve room for a message with `payload_len` bytes of payload.
    ///
    /// On success the header is already written and the returned slice is the payload
    /// region, right behind it. Nothing is visible to the consumer until
    /// [`push`](Self::push). Returns `None` if the ring has no room for the message right
    /// now, or ever (see [`VariableQueue::max_message_size`]).
    pub fn alloc(&mut self, payload_len: usize) -> Option<&mut [u8]> {
        let total = match frame_size(payload_len) {
            Some(total) if total <= CAP => total,
            _ => {
                debug!(payload_len, capacity = CAP, "message can never fit the queue");
                return None;
            }
        };

        let offset = VariableQueue::<CAP>::offset_of(self.tail);
        let room_to_end = CAP - offset;
        let start = if room_to_end >= total {
            self.tail
        } else {
            // Skip the tail end of the buffer; the message goes to offset 0.
            self.tail + room_to_end as u64
        };
        let end = start + total as u64;

        if !self.has_room(end) {
            return None;
        }

        let at = VariableQueue::<CAP>::offset_of(start);
        let header = MessageHeader {
            total_size: total as u32,
            payload_len: payload_len as u32,
        };
        unsafe {
            // [tail, end) lies outside the consumer's region [head, tail).
            if start != self.tail {
                debug_assert!(room_to_end >= BLOCK);
                self.queue.write_frame(offset, Frame::Wrap);
            }
            self.queue.write_frame(at, Frame::Message(header));
            self.pending = Some(Reservation { start, end });
            Some(slice::from_raw_parts_mut(
                self.queue.base().add(at + HEADER_SIZE),
                payload_len,
            ))
        }
    }

    #[inline]
    fn has_room(&mut self, end: u64) -> bool {
        if end - self.cached_head <= CAP as u64 {
            return true;
        }
        self.cached_head = self.queue.head.load(Acquire);
        end - self.cached_head <= CAP as u64
    }

    /// Publish the message reserved by the last successful [`alloc`](Self::alloc).
    ///
    /// Returns `false`, and changes nothing, if no message is pending.
    #[inline]
    pub fn push(&mut self) -> bool {
        let Some(reservation) = self.pending.take() else {
            return false;
        };
        debug_assert!(reservation.start >= self.tail);
        self.tail = reservation.end;
        self.queue.tail.store(self.tail, Release);
        true
    }

    /// Copy `payload` into the queue as one message.
    ///
    /// # Returns
    /// * `Ok(())` if the message was published
    /// * `Err(io::Error)` with `InvalidInput` if the message can never fit the queue, or
    ///   cannot fit from the current write position even though the queue is empty
    /// * `Err(io::Error)` with `WouldBlock` if there is no room until the consumer catches up
    pub fn send<M: AsRef<[u8]>>(&mut self, payload: M) -> io::Result<()> {
        let payload = payload.as_ref();
        if payload.len() > self.max_message_size() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "Message too large ({} > {})",
                    payload.len(),
                    self.max_message_size()
                ),
            ));
        }

        if let Some(buf) = self.alloc(payload.len()) {
            buf.copy_from_slice(payload);
            self.push();
            return Ok(());
        }

        // `alloc` refreshed `cached_head` before refusing.
        if self.cached_head == self.tail {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "Message of {} bytes cannot fit from current write position (offset {})",
                    payload.len(),
                    VariableQueue::<CAP>::offset_of(self.tail)
                ),
            ));
        }
        Err(io::Error::new(
            io::ErrorKind::WouldBlock,
            "Failed to enqueue message - queue full",
        ))
    }

    pub fn max_message_size(&self) -> usize {
        self.queue.max_message_size()
    }
}

impl<const CAP: usize> Drop for VariableProducer<'_, CAP> {
    fn drop(&mut self) {
        self.queue.producer_claimed.store(false, Release);
    }
}

impl<'a, const CAP: usize> VariableConsumer<'a, CAP> {
    fn attach(queue: &'a VariableQueue<CAP>) -> Self {
        trace!("variable queue consumer attached");
        Self {
            queue,
            head: queue.head.load(Relaxed),
        }
    }

    /// Find the next real message: its cursor and header. A wrap sentinel at `head` is
    /// skipped, without moving `head`.
    fn locate(&self) -> Option<(u64, MessageHeader)> {
        let tail = self.queue.tail.load(Acquire);
        let mut cursor = self.head;
        if cursor == tail {
            return None;
        }

        let mut offset = VariableQueue::<CAP>::offset_of(cursor);
        // Everything in [head, tail) was published by the release store observed above.
        let mut frame = unsafe { self.queue.read_frame(offset) };
        if frame == Frame::Wrap {
            cursor += (CAP - offset) as u64;
            if cursor == tail {
                return None;
            }
            offset = 0;
            frame = unsafe { self.queue.read_frame(0) };
        }

        match frame {
            Frame::Message(header) if Frame::fits(&header, offset, CAP) => Some((cursor, header)),
            _ => {
                warn!(cursor, offset, "corrupt frame in variable queue");
                None
            }
        }
    }

    /// Peek at the oldest published message.
    ///
    /// Returns `None` if the queue is empty. Wrap sentinels are never returned. Repeated
    /// calls without [`pop`](Self::pop) return the same message.
    pub fn front(&self) -> Option<Message<'_>> {
        let (cursor, header) = self.locate()?;
        let offset = VariableQueue::<CAP>::offset_of(cursor);
        let payload = unsafe {
            slice::from_raw_parts(
                self.queue.base().add(offset + HEADER_SIZE),
                header.payload_len as usize,
            )
        };
        Some(Message { header, payload })
    }

    /// Release the oldest message, and any wrap sentinel in front of it, back to the
    /// producer.
    ///
    /// Returns `false`, and changes nothing, if the queue is empty.
    pub fn pop(&mut self) -> bool {
        let Some((cursor, header)) = self.locate() else {
            return false;
        };
        self.head = cursor + header.total_size as u64;
        self.queue.head.store(self.head, Release);
        true
    }

    /// Copy out and release the oldest message, if any.
    pub fn receive(&mut self) -> Option<Vec<u8>> {
        let data = self.front()?.payload().to_vec();
        self.pop();
        Some(data)
    }

    pub fn is_empty(&self) -> bool {
        self.locate().is_none()
    }
}

impl<const CAP: usize> Drop for VariableConsumer<'_, CAP> {
    fn drop(&mut self) {
        self.queue.consumer_claimed.store(false, Release);
    }
}
