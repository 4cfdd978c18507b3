use std::alloc::{alloc, handle_alloc_error, Layout};

mod builder;
mod debug;

pub use builder::RegionBuilder;

pub mod Fixed {
    pub mod Fixed;
    pub mod Fixed_impl;
    pub use Fixed::{FixedConsumer, FixedProducer, FixedQueue}; // re-export for stable path
}

pub mod Variable {
    pub mod Variable;
    pub mod Variable_impl;
    pub mod layout;
    pub use Variable::{Message, VariableConsumer, VariableProducer, VariableQueue}; // re-export for stable path
    pub use layout::{frame_size, Frame, BLOCK, HEADER_SIZE};
}

pub mod Structs {
    pub mod Message_Structs;
    pub use Message_Structs::MessageHeader; // re-export for stable path
}

/// Queue types that can be constructed directly inside memory the caller provides.
///
/// Used for heap placement without a stack copy ([`boxed_in_place`]) and for placing a
/// queue inside a shared-memory mapping ([`crate::Core::region::SharedRegion`]). The
/// constants are recorded in the region header; an attaching process must match all of
/// them.
///
/// # Safety
/// After `init_in_place` returns, every byte of `Self` must be initialized and valid.
/// `Self` must not contain pointers into process-local memory, since a mapped queue can be
/// observed from another address space. Any bit pattern another process may leave in the
/// queue's element storage must be a valid element.
pub unsafe trait InPlace: Sized {
    /// Identifier recorded in shared-memory region headers.
    const KIND: u32;

    /// Slot count (`N`) or byte capacity (`CAP`).
    const CAPACITY: u64;

    /// `size_of` one element; 1 for byte queues.
    const ELEMENT_SIZE: u64;

    /// Writes a freshly constructed, empty queue at `ptr`.
    ///
    /// # Safety
    /// `ptr` must be valid for writes of `size_of::<Self>()` bytes and aligned for `Self`.
    /// Any previous value at `ptr` is overwritten without being dropped.
    unsafe fn init_in_place(ptr: *mut Self);
}

/// Plain-old-data element types that may be shared between processes.
///
/// # Safety
/// Every bit pattern of `size_of::<Self>()` bytes must be a valid value, and the type must
/// not hold pointers or references. `bool`, `char`, references and most enums do not
/// qualify.
///
/// ```compile_fail
/// use dmxp_spsc::Core::region::SharedRegion;
/// use dmxp_spsc::SPSC::Fixed::FixedQueue;
///
/// let _ = SharedRegion::<FixedQueue<bool, 8>>::create("flags");
/// ```
pub unsafe trait Pod: Copy + 'static {}

macro_rules! impl_pod {
    ($($t:ty),*) => {
        $(unsafe impl Pod for $t {})*
    };
}

impl_pod!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64);

unsafe impl<T: Pod, const M: usize> Pod for [T; M] {}

/// Allocate `Q` on the heap and construct it there with `init`.
///
/// Large queues never pass through the stack, unlike `Box::new(Q::new())`.
///
/// # Safety
/// `init` must fully initialize the `Q` it is given a pointer to.
pub(crate) unsafe fn boxed_with<Q>(init: unsafe fn(*mut Q)) -> Box<Q> {
    let layout = Layout::new::<Q>();
    let ptr = alloc(layout) as *mut Q;
    if ptr.is_null() {
        handle_alloc_error(layout);
    }
    init(ptr);
    Box::from_raw(ptr)
}

/// Allocate `Q` on the heap and construct it there directly.
pub(crate) fn boxed_in_place<Q: InPlace>() -> Box<Q> {
    unsafe { boxed_with(Q::init_in_place) }
}
