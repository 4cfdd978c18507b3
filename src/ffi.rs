use crate::trace::warn;
use crate::Core::region::SharedRegion;
use crate::SPSC::Variable::{VariableConsumer, VariableProducer, VariableQueue};
use crate::SPSC::RegionBuilder;
use std::ffi::CStr;
use std::mem::ManuallyDrop;
use std::os::raw::c_char;
use std::ptr;

// Error codes
const DMXP_SUCCESS: i32 = 0;
const DMXP_ERROR_NULL_POINTER: i32 = -1;
const DMXP_ERROR_INVALID_ARG: i32 = -2;
const DMXP_ERROR_QUEUE_FULL: i32 = -4;
const DMXP_ERROR_EMPTY: i32 = -5;
const DMXP_ERROR_NOTHING_PENDING: i32 = -7;

/// Byte capacity of the queue behind the C API.
pub const FFI_QUEUE_CAPACITY: usize = 1024 * 1024;

/// Queue type placed in shared memory by the C API.
pub type FfiQueue = VariableQueue<FFI_QUEUE_CAPACITY>;

/// Handle to a producer instance (opaque pointer)
pub struct ProducerHandle {
    // Borrows `*region`; dropped before it.
    inner: ManuallyDrop<VariableProducer<'static, FFI_QUEUE_CAPACITY>>,
    region: *mut SharedRegion<FfiQueue>,
}

/// Handle to a consumer instance (opaque pointer)
pub struct ConsumerHandle {
    inner: ManuallyDrop<VariableConsumer<'static, FFI_QUEUE_CAPACITY>>,
    region: *mut SharedRegion<FfiQueue>,
}

impl Drop for ProducerHandle {
    fn drop(&mut self) {
        unsafe {
            ManuallyDrop::drop(&mut self.inner);
            drop(Box::from_raw(self.region));
        }
    }
}

impl Drop for ConsumerHandle {
    fn drop(&mut self) {
        unsafe {
            ManuallyDrop::drop(&mut self.inner);
            drop(Box::from_raw(self.region));
        }
    }
}

fn region_name<'a>(name: *const c_char) -> Option<&'a str> {
    if name.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(name) }.to_str().ok()
}

/// Move the region to the heap so the handle can borrow it for as long as it lives.
fn leak_region(region: SharedRegion<FfiQueue>) -> (*mut SharedRegion<FfiQueue>, &'static FfiQueue) {
    let region = Box::into_raw(Box::new(region));
    let queue: &'static FfiQueue = unsafe { (*region).queue() };
    (region, queue)
}

// -----------------------------------------------------------------------------
// Producer API
// -----------------------------------------------------------------------------

/// Create a producer on the queue region `name`, creating the region if it does not exist.
///
/// # Returns
/// * Pointer to `ProducerHandle`, or NULL on failure (including when another producer is
///   attached to the queue).
#[no_mangle]
pub extern "C" fn dmxp_spsc_producer_new(name: *const c_char) -> *mut ProducerHandle {
    let Some(name) = region_name(name) else {
        return ptr::null_mut();
    };

    let region = match RegionBuilder::new().with_name(name).open_or_create::<FfiQueue>() {
        Ok(region) => region,
        Err(_e) => {
            warn!(name, error = %_e, "FFI: failed to open queue region");
            return ptr::null_mut();
        }
    };

    let (region, queue) = leak_region(region);
    match queue.producer() {
        Some(producer) => Box::into_raw(Box::new(ProducerHandle {
            inner: ManuallyDrop::new(producer),
            region,
        })),
        None => {
            unsafe { drop(Box::from_raw(region)) };
            ptr::null_mut()
        }
    }
}

/// Reserve room for a `len`-byte message.
///
/// # Returns
/// * Pointer to the payload area (write exactly `len` bytes, then call
///   `dmxp_spsc_producer_push`), or NULL if the queue has no room.
#[no_mangle]
pub extern "C" fn dmxp_spsc_producer_alloc(handle: *mut ProducerHandle, len: usize) -> *mut u8 {
    if handle.is_null() {
        return ptr::null_mut();
    }
    let producer = unsafe { &mut (*handle).inner };
    match producer.alloc(len) {
        Some(buf) => buf.as_mut_ptr(),
        None => ptr::null_mut(),
    }
}

/// Publish the message reserved by the last successful `dmxp_spsc_producer_alloc`.
#[no_mangle]
pub extern "C" fn dmxp_spsc_producer_push(handle: *mut ProducerHandle) -> i32 {
    if handle.is_null() {
        return DMXP_ERROR_NULL_POINTER;
    }
    let producer = unsafe { &mut (*handle).inner };
    if producer.push() {
        DMXP_SUCCESS
    } else {
        DMXP_ERROR_NOTHING_PENDING
    }
}

/// Copy and publish a message.
///
/// # Returns
/// * 0 on success, negative error code otherwise.
#[no_mangle]
pub extern "C" fn dmxp_spsc_producer_send(
    handle: *mut ProducerHandle,
    data: *const u8,
    len: usize,
) -> i32 {
    if handle.is_null() || (data.is_null() && len != 0) {
        return DMXP_ERROR_NULL_POINTER;
    }

    let producer = unsafe { &mut (*handle).inner };
    let slice: &[u8] = if len == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(data, len) }
    };

    match producer.send(slice) {
        Ok(()) => DMXP_SUCCESS,
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => DMXP_ERROR_QUEUE_FULL,
        Err(_) => DMXP_ERROR_INVALID_ARG,
    }
}

/// Free a producer handle.
#[no_mangle]
pub extern "C" fn dmxp_spsc_producer_free(handle: *mut ProducerHandle) {
    if !handle.is_null() {
        unsafe {
            let _ = Box::from_raw(handle); // Dropped automatically
        }
    }
}

// -----------------------------------------------------------------------------
// Consumer API
// -----------------------------------------------------------------------------

/// Create a consumer on the existing queue region `name`.
///
/// # Returns
/// * Pointer to `ConsumerHandle`, or NULL on failure.
#[no_mangle]
pub extern "C" fn dmxp_spsc_consumer_new(name: *const c_char) -> *mut ConsumerHandle {
    let Some(name) = region_name(name) else {
        return ptr::null_mut();
    };

    let region = match RegionBuilder::new().with_name(name).attach::<FfiQueue>() {
        Ok(region) => region,
        Err(_e) => {
            warn!(name, error = %_e, "FFI: failed to attach to queue region");
            return ptr::null_mut();
        }
    };

    let (region, queue) = leak_region(region);
    match queue.consumer() {
        Some(consumer) => Box::into_raw(Box::new(ConsumerHandle {
            inner: ManuallyDrop::new(consumer),
            region,
        })),
        None => {
            unsafe { drop(Box::from_raw(region)) };
            ptr::null_mut()
        }
    }
}

/// Peek at the oldest message without copying it.
///
/// # Returns
/// * Pointer to the payload (valid until `dmxp_spsc_consumer_pop`) with its length in
///   `*out_len`, or NULL if the queue is empty.
#[no_mangle]
pub extern "C" fn dmxp_spsc_consumer_front(
    handle: *mut ConsumerHandle,
    out_len: *mut usize,
) -> *const u8 {
    if handle.is_null() || out_len.is_null() {
        return ptr::null();
    }
    let consumer = unsafe { &(*handle).inner };
    match consumer.front() {
        Some(message) => {
            unsafe { *out_len = message.len() };
            message.payload().as_ptr()
        }
        None => ptr::null(),
    }
}

/// Release the oldest message.
#[no_mangle]
pub extern "C" fn dmxp_spsc_consumer_pop(handle: *mut ConsumerHandle) -> i32 {
    if handle.is_null() {
        return DMXP_ERROR_NULL_POINTER;
    }
    let consumer = unsafe { &mut (*handle).inner };
    if consumer.pop() {
        DMXP_SUCCESS
    } else {
        DMXP_ERROR_EMPTY
    }
}

/// Copy out and release the oldest message.
///
/// # Arguments
/// * `out_buf` - Buffer to write message into.
/// * `out_len` - Input: size of buf, Output: size of message received.
///
/// # Returns
/// * 0 on success.
/// * DMXP_ERROR_EMPTY if the queue is empty.
/// * DMXP_ERROR_INVALID_ARG if the buffer is too small; the message stays queued and
///   `*out_len` holds its size.
#[no_mangle]
pub extern "C" fn dmxp_spsc_consumer_receive(
    handle: *mut ConsumerHandle,
    out_buf: *mut u8,
    out_len: *mut usize,
) -> i32 {
    if handle.is_null() || out_len.is_null() {
        return DMXP_ERROR_NULL_POINTER;
    }

    let consumer = unsafe { &mut (*handle).inner };
    let max_len = unsafe { *out_len };

    let len = match consumer.front() {
        Some(message) => {
            let payload = message.payload();
            if payload.len() > max_len || (out_buf.is_null() && !payload.is_empty()) {
                unsafe { *out_len = payload.len() };
                return DMXP_ERROR_INVALID_ARG; // Buffer too small
            }
            if !payload.is_empty() {
                unsafe { ptr::copy_nonoverlapping(payload.as_ptr(), out_buf, payload.len()) };
            }
            payload.len()
        }
        None => return DMXP_ERROR_EMPTY,
    };

    consumer.pop();
    unsafe { *out_len = len };
    DMXP_SUCCESS
}

/// Free a consumer handle.
#[no_mangle]
pub extern "C" fn dmxp_spsc_consumer_free(handle: *mut ConsumerHandle) {
    if !handle.is_null() {
        unsafe {
            let _ = Box::from_raw(handle);
        }
    }
}
