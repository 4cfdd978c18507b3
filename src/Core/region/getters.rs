use super::*;
use crate::Core::SharedMemory::RawHandle;

/// Getter methods for SharedRegion
///
/// These methods provide access to the private fields of SharedRegion for debugging and
/// monitoring purposes.
impl<Q: InPlace> SharedRegion<Q> {
    /// Get a reference to the underlying shared memory backend
    pub fn shm(&self) -> &dyn SharedMemoryBackend {
        &*self.shm
    }

    /// Get the raw pointer to the RegionHeader
    pub fn header_ptr(&self) -> *const RegionHeader {
        self.header
    }

    /// Name of the region under /dev/shm
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this handle created the region (and removes it on drop)
    pub fn is_creator(&self) -> bool {
        self.creator
    }

    /// Size of the mapping in bytes
    pub fn mapped_size(&self) -> usize {
        self.shm.size()
    }

    pub fn raw_handle(&self) -> RawHandle {
        self.shm.raw_handle()
    }

    /// Check that the header carries the magic number and the ready flag.
    pub fn is_initialized(&self) -> bool {
        // Safety: the header pointer is valid for as long as the mapping exists
        unsafe {
            !self.header.is_null()
                && (*self.header).magic == MAGIC_NUMBER
                && (*self.header).ready.load(Ordering::Acquire) == READY
        }
    }
}
