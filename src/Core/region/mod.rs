use crate::Core::SharedMemory::{
    attach_shared_memory, create_shared_memory, unlink_shared_memory, SharedMemoryBackend,
};
use crate::trace::{debug, info, warn};
use crate::SPSC::InPlace;
use crate::SPSC::Variable::BLOCK;
use std::io;
use std::mem::{align_of, size_of};
use std::ops::Deref;
use std::sync::atomic::{AtomicU32, Ordering};
mod debug;
mod getters;

const MAGIC_NUMBER: u64 = 0x444D_5850_5350_5343; // "DMXPSPSC"

/// Version of the region and queue memory layout. Bumped whenever either changes.
pub const LAYOUT_VERSION: u32 = 2;

/// Alignment of the region header and of the queue placed after it.
pub const REGION_ALIGN: usize = 128;

const READY: u32 = 1;

/// The header located at the very beginning of a shared-memory region.
///
/// It lets an attaching process check that the region holds the queue type it expects,
/// built with the same layout, before touching the queue.
#[repr(C, align(128))]
pub struct RegionHeader {
    /// A "magic number" identifying the memory region as a DMXP-SPSC queue region.
    pub magic: u64,

    /// The version of the memory layout.
    pub version: u32,

    /// `InPlace::KIND` of the queue stored in the region.
    pub kind: u32,

    /// `BLOCK` of the creating build.
    pub block: u32,

    /// Reserved/padding.
    pub reserved: u32,

    /// Byte offset from the start of the region to the queue.
    pub queue_offset: u64,

    /// `size_of` the queue type.
    pub queue_size: u64,

    /// `align_of` the queue type.
    pub queue_align: u64,

    /// `InPlace::CAPACITY` of the queue: slot count or byte capacity.
    pub capacity: u64,

    /// `InPlace::ELEMENT_SIZE` of the queue.
    pub element_size: u64,

    /// Set (release) once the queue is fully constructed.
    pub ready: AtomicU32,
}

/// A queue constructed in place inside a named shared-memory region.
///
/// The creating side writes a [`RegionHeader`] followed by an empty queue; other processes
/// attach by name and get a reference to the same queue. The creator removes the name
/// when it is dropped; existing mappings stay usable until they are dropped as well.
///
/// ```text
/// ┌────────────────────────────────────────┐ 0
/// │ RegionHeader    (128-byte aligned)     │
/// ├────────────────────────────────────────┤ queue_offset
/// │ Q               (FixedQueue or         │
/// │                  VariableQueue)        │
/// └────────────────────────────────────────┘ queue_offset + size_of::<Q>()
/// ```
pub struct SharedRegion<Q: InPlace> {
    shm: Box<dyn SharedMemoryBackend>,
    header: *mut RegionHeader,
    queue: *mut Q,
    name: String,
    creator: bool,
}

// The queue inside synchronizes its own users; the region only hands out `&Q`.
unsafe impl<Q: InPlace + Sync> Send for SharedRegion<Q> {}
unsafe impl<Q: InPlace + Sync> Sync for SharedRegion<Q> {}

impl<Q: InPlace> SharedRegion<Q> {
    /// Offset of the queue from the start of the region.
    pub fn queue_offset() -> usize {
        let align = align_of::<Q>().max(REGION_ALIGN);
        (size_of::<RegionHeader>() + align - 1) & !(align - 1)
    }

    /// Bytes a region holding `Q` needs.
    pub fn required_size() -> usize {
        Self::queue_offset() + size_of::<Q>()
    }

    /// Create a region called `name` and construct an empty queue in it.
    pub fn create(name: &str) -> io::Result<Self> {
        let size = Self::required_size();
        let shm = create_shared_memory(size, Some(name)).map_err(|e| {
            io::Error::new(
                e.kind(),
                format!(
                    "Failed to create shared memory:\n\
                    ├─ Region:     {name}\n\
                    ├─ Queue size: {}\n\
                    ╰─ Error: {e}",
                    size_of::<Q>()
                ),
            )
        })?;

        let base = shm.as_ptr();
        // From here on, dropping `region` removes the name again.
        let region = Self {
            header: base as *mut RegionHeader,
            queue: unsafe { base.add(Self::queue_offset()) } as *mut Q,
            shm,
            name: name.to_owned(),
            creator: true,
        };

        if (base as usize) % REGION_ALIGN != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Shared memory not properly aligned",
            ));
        }

        unsafe {
            std::ptr::write(
                region.header,
                RegionHeader {
                    magic: MAGIC_NUMBER,
                    version: LAYOUT_VERSION,
                    kind: Q::KIND,
                    block: BLOCK as u32,
                    reserved: 0,
                    queue_offset: Self::queue_offset() as u64,
                    queue_size: size_of::<Q>() as u64,
                    queue_align: align_of::<Q>() as u64,
                    capacity: Q::CAPACITY,
                    element_size: Q::ELEMENT_SIZE,
                    ready: AtomicU32::new(0),
                },
            );
            Q::init_in_place(region.queue);
            (*region.header).ready.store(READY, Ordering::Release);
        }

        info!(name, size, kind = Q::KIND, capacity = Q::CAPACITY, "created shared queue region");
        Ok(region)
    }

    /// Attach to the region called `name`, checking that it holds a `Q`.
    pub fn attach(name: &str) -> io::Result<Self> {
        let shm = attach_shared_memory(name, size_of::<RegionHeader>())?;

        let base = shm.as_ptr();
        if (base as usize) % REGION_ALIGN != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Shared memory not properly aligned",
            ));
        }

        let header = base as *mut RegionHeader;
        Self::validate(unsafe { &*header }, shm.size())?;

        debug!(name, "attached to shared queue region");
        Ok(Self {
            header,
            queue: unsafe { base.add(Self::queue_offset()) } as *mut Q,
            shm,
            name: name.to_owned(),
            creator: false,
        })
    }

    fn validate(header: &RegionHeader, mapped: usize) -> io::Result<()> {
        let invalid =
            |msg: String| -> io::Result<()> { Err(io::Error::new(io::ErrorKind::InvalidData, msg)) };

        if header.ready.load(Ordering::Acquire) != READY {
            return Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                "Shared queue region is still being initialized",
            ));
        }
        if header.magic != MAGIC_NUMBER {
            return invalid(format!(
                "Invalid magic number {:#x} - not a queue region",
                header.magic
            ));
        }
        if header.version != LAYOUT_VERSION {
            return invalid(format!(
                "Layout version mismatch: region {}, expected {}",
                header.version, LAYOUT_VERSION
            ));
        }
        if header.kind != Q::KIND {
            return invalid(format!(
                "Queue kind mismatch: region {}, expected {}",
                header.kind,
                Q::KIND
            ));
        }
        if header.block as usize != BLOCK {
            return invalid(format!(
                "Block size mismatch: region {}, expected {}",
                header.block, BLOCK
            ));
        }
        if header.capacity != Q::CAPACITY || header.element_size != Q::ELEMENT_SIZE {
            return invalid(format!(
                "Queue shape mismatch: region (capacity {}, element size {}), expected (capacity {}, element size {})",
                header.capacity,
                header.element_size,
                Q::CAPACITY,
                Q::ELEMENT_SIZE
            ));
        }
        if header.queue_offset as usize != Self::queue_offset()
            || header.queue_size as usize != size_of::<Q>()
            || header.queue_align as usize != align_of::<Q>()
        {
            return invalid(format!(
                "Queue layout mismatch: region (offset {}, size {}, align {}), expected (offset {}, size {}, align {})",
                header.queue_offset,
                header.queue_size,
                header.queue_align,
                Self::queue_offset(),
                size_of::<Q>(),
                align_of::<Q>()
            ));
        }
        if mapped < Self::required_size() {
            return invalid(format!(
                "Shared memory too small for queue: expected at least {}, got {}",
                Self::required_size(),
                mapped
            ));
        }
        Ok(())
    }

    /// The queue stored in the region.
    pub fn queue(&self) -> &Q {
        unsafe { &*self.queue }
    }
}

impl<Q: InPlace> Deref for SharedRegion<Q> {
    type Target = Q;

    fn deref(&self) -> &Q {
        self.queue()
    }
}

impl<Q: InPlace> Drop for SharedRegion<Q> {
    fn drop(&mut self) {
        if !self.creator {
            return;
        }
        if let Err(_e) = unlink_shared_memory(&self.name) {
            warn!(name = %self.name, error = %_e, "failed to remove shared queue region");
            return;
        }
        debug!(name = %self.name, "removed shared queue region");
    }
}
