// Shared memory backend abstraction for Linux
// Uses files under /dev/shm + mmap so unrelated processes can map the same pages by name

use std::fmt::Debug;
use std::io;

/// Shared memory backend trait for cross-platform memory mapping
pub trait SharedMemoryBackend: Send + Sync + Debug {
    /// Get a pointer to the mapped memory region
    fn as_ptr(&self) -> *mut u8;

    /// Get the size of the mapped region in bytes
    fn size(&self) -> usize;

    /// Get the underlying file descriptor
    fn raw_handle(&self) -> RawHandle;
}

/// Platform-specific handle type
#[derive(Debug, Clone, Copy)]
pub enum RawHandle {
    /// Unix file descriptor (Linux)
    Fd(i32),
}

/// Default region name used when none is given.
pub const DEFAULT_SHM_NAME: &str = "dmxp_spsc";

/// Create a new shared memory region with the specified size
///
/// # Arguments
/// * `size` - Size of the shared memory region in bytes
/// * `name` - Optional name for the shared memory region (for cross-process access)
///
/// # Returns
/// A boxed trait object implementing SharedMemoryBackend. The memory is zero-filled.
/// Fails with `AlreadyExists` if a region with that name is already present.
#[cfg(target_os = "linux")]
pub fn create_shared_memory(
    size: usize,
    name: Option<&str>,
) -> io::Result<Box<dyn SharedMemoryBackend>> {
    Ok(Box::new(LinuxSharedMemory::create(
        size,
        name.unwrap_or(DEFAULT_SHM_NAME),
    )?))
}

/// Attach to an existing shared memory region
///
/// # Arguments
/// * `name` - Name of the shared memory region to attach to
/// * `size` - Minimum size the region must have
///
/// # Returns
/// A boxed trait object implementing SharedMemoryBackend, mapping the whole region
#[cfg(target_os = "linux")]
pub fn attach_shared_memory(name: &str, size: usize) -> io::Result<Box<dyn SharedMemoryBackend>> {
    Ok(Box::new(LinuxSharedMemory::attach(name, size)?))
}

/// Remove a named region. Existing mappings stay valid until they are dropped.
#[cfg(target_os = "linux")]
pub fn unlink_shared_memory(name: &str) -> io::Result<()> {
    std::fs::remove_file(shm_path(name)?)
}

#[cfg(not(target_os = "linux"))]
pub fn create_shared_memory(
    _size: usize,
    _name: Option<&str>,
) -> io::Result<Box<dyn SharedMemoryBackend>> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "Shared memory only supported on Linux",
    ))
}

#[cfg(not(target_os = "linux"))]
pub fn attach_shared_memory(_name: &str, _size: usize) -> io::Result<Box<dyn SharedMemoryBackend>> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "Shared memory only supported on Linux",
    ))
}

#[cfg(not(target_os = "linux"))]
pub fn unlink_shared_memory(_name: &str) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "Shared memory only supported on Linux",
    ))
}

#[cfg(target_os = "linux")]
fn shm_path(name: &str) -> io::Result<std::path::PathBuf> {
    if name.is_empty() || name.contains('/') || name == "." || name == ".." {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Invalid shared memory name: {:?}", name),
        ));
    }
    Ok(std::path::Path::new("/dev/shm").join(name))
}

#[cfg(target_os = "linux")]
pub use linux::LinuxSharedMemory;

#[cfg(target_os = "linux")]
mod linux {
    use super::{shm_path, RawHandle, SharedMemoryBackend};
    use std::fs::{File, OpenOptions};
    use std::io;
    use std::os::fd::{AsRawFd, IntoRawFd};
    use std::os::unix::fs::OpenOptionsExt;
    use std::ptr::{self, NonNull};

    #[derive(Debug)]
    pub struct LinuxSharedMemory {
        ptr: NonNull<u8>,
        size: usize,
        fd: i32,
    }

    // The mapping is plain memory; synchronization is the job of whatever lives in it.
    unsafe impl Send for LinuxSharedMemory {}
    unsafe impl Sync for LinuxSharedMemory {}

    impl LinuxSharedMemory {
        /// Create a new, zero-filled shared memory region using /dev/shm
        pub fn create(size: usize, name: &str) -> io::Result<Self> {
            if size == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "Shared memory size must be greater than zero",
                ));
            }
            let path = shm_path(name)?;

            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create_new(true)
                .mode(0o600)
                .open(&path)
                .map_err(|e| {
                    io::Error::new(
                        e.kind(),
                        format!(
                            "Failed to create shared memory file at {}: {}",
                            path.display(),
                            e
                        ),
                    )
                })?;

            // A fresh file is extended with zeros.
            if unsafe { libc::ftruncate(file.as_raw_fd(), size as libc::off_t) } != 0 {
                let err = io::Error::last_os_error();
                let _ = std::fs::remove_file(&path);
                return Err(err);
            }

            Self::map(file, size).map_err(|e| {
                let _ = std::fs::remove_file(&path);
                e
            })
        }

        /// Map an existing region created by [`LinuxSharedMemory::create`]
        pub fn attach(name: &str, min_size: usize) -> io::Result<Self> {
            let path = shm_path(name)?;
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .open(&path)
                .map_err(|e| {
                    io::Error::new(
                        e.kind(),
                        format!("Failed to open shared memory at {}: {}", path.display(), e),
                    )
                })?;

            let file_size = file.metadata()?.len() as usize;
            if file_size < min_size.max(1) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "Shared memory size too small: expected at least {} bytes, got {}",
                        min_size, file_size
                    ),
                ));
            }

            Self::map(file, file_size)
        }

        fn map(file: File, size: usize) -> io::Result<Self> {
            // mmap hands back page-aligned memory.
            let ptr = unsafe {
                libc::mmap(
                    ptr::null_mut(),
                    size,
                    libc::PROT_READ | libc::PROT_WRITE,
                    libc::MAP_SHARED,
                    file.as_raw_fd(),
                    0,
                )
            };
            if ptr == libc::MAP_FAILED {
                return Err(io::Error::last_os_error());
            }

            let ptr = NonNull::new(ptr as *mut u8).ok_or_else(|| {
                io::Error::new(io::ErrorKind::Other, "mmap returned a null mapping")
            })?;

            // Keep the file descriptor alive for the lifetime of the mapping
            Ok(Self {
                ptr,
                size,
                fd: file.into_raw_fd(),
            })
        }
    }

    impl Drop for LinuxSharedMemory {
        fn drop(&mut self) {
            unsafe {
                libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.size);
                libc::close(self.fd);
            }
        }
    }

    impl SharedMemoryBackend for LinuxSharedMemory {
        fn as_ptr(&self) -> *mut u8 {
            self.ptr.as_ptr()
        }

        fn size(&self) -> usize {
            self.size
        }

        fn raw_handle(&self) -> RawHandle {
            RawHandle::Fd(self.fd)
        }
    }
}
