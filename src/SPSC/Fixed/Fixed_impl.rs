use std::io;
use std::mem::{size_of, MaybeUninit};
use std::ptr::addr_of_mut;
use std::sync::atomic::Ordering::{Acquire, Relaxed, Release};
use std::sync::atomic::{AtomicBool, AtomicUsize};

use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;

use super::Fixed::{FixedConsumer, FixedProducer, FixedQueue};
use crate::trace::{trace, warn};
use crate::SPSC::{boxed_with, InPlace, Pod};

#[inline]
const fn next_index<const N: usize>(index: usize) -> usize {
    if index + 1 == N {
        0
    } else {
        index + 1
    }
}

impl<T: Copy + Default, const N: usize> FixedQueue<T, N> {
    const VALID: () = assert!(N >= 2, "FixedQueue needs at least two slots");

    /// Create an empty queue by value.
    ///
    /// For large `N` prefer [`FixedQueue::boxed`], which never builds the queue on the stack.
    pub fn new() -> Self {
        let () = Self::VALID;
        Self {
            tail: CachePadded::new(AtomicUsize::new(0)),
            head: CachePadded::new(AtomicUsize::new(0)),
            producer_claimed: AtomicBool::new(false),
            consumer_claimed: AtomicBool::new(false),
            slots: std::array::from_fn(|_| UnsafeCell::new(T::default())),
        }
    }

    /// Create an empty queue directly on the heap.
    pub fn boxed() -> Box<Self> {
        unsafe { boxed_with(Self::construct) }
    }

    /// Construct an empty queue inside caller-provided storage.
    pub fn init(storage: &mut MaybeUninit<Self>) -> &mut Self {
        unsafe {
            Self::construct(storage.as_mut_ptr());
            storage.assume_init_mut()
        }
    }

    /// Maximum number of elements the queue holds at once (`N - 1`).
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Number of published, unread elements. Only a snapshot when both ends are active.
    pub fn len(&self) -> usize {
        let head = self.head.load(Acquire);
        let tail = self.tail.load(Acquire);
        (tail + N - head) % N
    }

    pub fn is_empty(&self) -> bool {
        self.head.load(Acquire) == self.tail.load(Acquire)
    }

    /// Split an exclusively borrowed queue into its two ends.
    ///
    /// Any claim left behind by a leaked handle is reset, since `&mut self` proves no
    /// handle is alive.
    pub fn split(&mut self) -> (FixedProducer<'_, T, N>, FixedConsumer<'_, T, N>) {
        *self.producer_claimed.get_mut() = true;
        *self.consumer_claimed.get_mut() = true;
        let queue = &*self;
        (FixedProducer::attach(queue), FixedConsumer::attach(queue))
    }

    /// Claim the producer role.
    ///
    /// Returns `None` while another producer handle for this queue is alive, including one
    /// held by another process sharing the queue.
    pub fn producer(&self) -> Option<FixedProducer<'_, T, N>> {
        if self
            .producer_claimed
            .compare_exchange(false, true, Acquire, Relaxed)
            .is_err()
        {
            warn!("fixed queue producer already claimed");
            return None;
        }
        Some(FixedProducer::attach(self))
    }

    /// Claim the consumer role. Returns `None` while another consumer handle is alive.
    pub fn consumer(&self) -> Option<FixedConsumer<'_, T, N>> {
        if self
            .consumer_claimed
            .compare_exchange(false, true, Acquire, Relaxed)
            .is_err()
        {
            warn!("fixed queue consumer already claimed");
            return None;
        }
        Some(FixedConsumer::attach(self))
    }

    /// # Safety
    /// `ptr` must be valid for writes of `size_of::<Self>()` bytes and aligned for `Self`.
    unsafe fn construct(ptr: *mut Self) {
        let () = Self::VALID;
        addr_of_mut!((*ptr).tail).write(CachePadded::new(AtomicUsize::new(0)));
        addr_of_mut!((*ptr).head).write(CachePadded::new(AtomicUsize::new(0)));
        addr_of_mut!((*ptr).producer_claimed).write(AtomicBool::new(false));
        addr_of_mut!((*ptr).consumer_claimed).write(AtomicBool::new(false));

        let slots = addr_of_mut!((*ptr).slots) as *mut UnsafeCell<T>;
        for i in 0..N {
            slots.add(i).write(UnsafeCell::new(T::default()));
        }
    }
}

impl<T: Copy + Default, const N: usize> Default for FixedQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

// Only plain-old-data elements may be seen by another process.
unsafe impl<T: Pod + Default, const N: usize> InPlace for FixedQueue<T, N> {
    const KIND: u32 = 1;
    const CAPACITY: u64 = N as u64;
    const ELEMENT_SIZE: u64 = size_of::<T>() as u64;

    unsafe fn init_in_place(ptr: *mut Self) {
        Self::construct(ptr);
    }
}

impl<'a, T: Copy + Default, const N: usize> FixedProducer<'a, T, N> {
    fn attach(queue: &'a FixedQueue<T, N>) -> Self {
        trace!("fixed queue producer attached");
        Self {
            queue,
            tail: queue.tail.load(Relaxed),
            cached_head: queue.head.load(Acquire),
            pending: false,
        }
    }

    /// Reserve the next slot for writing.
    ///
    /// Returns `None` if the queue is full. The slot stays invisible to the consumer until
    /// [`push`](Self::push). Calling `alloc` again before `push` returns the same slot.
    #[inline]
    pub fn alloc(&mut self) -> Option<&mut T> {
        let next = next_index::<N>(self.tail);
        if next == self.cached_head {
            self.cached_head = self.queue.head.load(Acquire);
            if next == self.cached_head {
                return None;
            }
        }

        self.pending = true;
        // The consumer never touches slot `tail`: it only reads slots in [head, tail).
        Some(unsafe { &mut *self.queue.slots[self.tail].get() })
    }

    /// Publish the slot reserved by the last successful [`alloc`](Self::alloc).
    ///
    /// Returns `false`, and changes nothing, if no slot is pending.
    #[inline]
    pub fn push(&mut self) -> bool {
        if !std::mem::take(&mut self.pending) {
            return false;
        }
        self.tail = next_index::<N>(self.tail);
        self.queue.tail.store(self.tail, Release);
        true
    }

    /// Copy `value` into the queue.
    ///
    /// # Returns
    /// * `Ok(())` if the value was published
    /// * `Err(io::Error)` with `WouldBlock` if the queue is full
    pub fn send(&mut self, value: T) -> io::Result<()> {
        match self.alloc() {
            Some(slot) => {
                *slot = value;
                self.push();
                Ok(())
            }
            None => Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                "Failed to enqueue value - queue full",
            )),
        }
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}

impl<T, const N: usize> Drop for FixedProducer<'_, T, N> {
    fn drop(&mut self) {
        self.queue.producer_claimed.store(false, Release);
    }
}

impl<'a, T: Copy + Default, const N: usize> FixedConsumer<'a, T, N> {
    fn attach(queue: &'a FixedQueue<T, N>) -> Self {
        trace!("fixed queue consumer attached");
        Self {
            queue,
            head: queue.head.load(Relaxed),
        }
    }

    /// Peek at the oldest published element.
    ///
    /// Returns `None` if the queue is empty. Repeated calls without [`pop`](Self::pop)
    /// return the same slot.
    #[inline]
    pub fn front(&self) -> Option<&T> {
        if self.head == self.queue.tail.load(Acquire) {
            return None;
        }
        // Slot `head` was published by the release store the acquire load above observed.
        Some(unsafe { &*self.queue.slots[self.head].get() })
    }

    /// Release the oldest element back to the producer.
    ///
    /// Returns `false`, and changes nothing, if the queue is empty.
    #[inline]
    pub fn pop(&mut self) -> bool {
        if self.head == self.queue.tail.load(Acquire) {
            return false;
        }
        self.head = next_index::<N>(self.head);
        self.queue.head.store(self.head, Release);
        true
    }

    /// Copy out and release the oldest element, if any.
    pub fn receive(&mut self) -> Option<T> {
        let value = *self.front()?;
        self.pop();
        Some(value)
    }

    pub fn is_empty(&self) -> bool {
        self.front().is_none()
    }
}

impl<T, const N: usize> Drop for FixedConsumer<'_, T, N> {
    fn drop(&mut self) {
        self.queue.consumer_claimed.store(false, Release);
    }
}
