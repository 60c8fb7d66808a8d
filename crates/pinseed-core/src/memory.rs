//! Memory hardening for seed material
//!
//! - [`disable_core_dumps`] sets `RLIMIT_CORE` to zero so a crash never writes
//!   a decrypted seed to disk.
//! - [`LockedBuffer`] keeps bytes in mlock'd pages and zeroizes them before the
//!   pages are unlocked and freed. [`crate::seed::RawSeed`] is built on it.
//!
//! Both are best-effort: containers and unprivileged users often cannot mlock,
//! so failures are logged and the buffer keeps working unlocked.

use std::sync::atomic::{AtomicBool, Ordering};
use zeroize::Zeroize;

static CORE_DUMPS_DISABLED: AtomicBool = AtomicBool::new(false);

/// Disable core dumps for the current process.
///
/// Call once, early in `main`. Returns `true` if core dumps are off.
pub fn disable_core_dumps() -> bool {
    if CORE_DUMPS_DISABLED.swap(true, Ordering::SeqCst) {
        return true;
    }

    #[cfg(unix)]
    {
        sys::disable_core_dumps()
    }

    #[cfg(not(unix))]
    {
        log::warn!("core dump prevention is not supported on this platform");
        false
    }
}

/// Heap buffer that is mlock'd while alive and zeroized on drop.
pub struct LockedBuffer {
    data: Vec<u8>,
    locked: bool,
}

impl LockedBuffer {
    /// Zero-filled buffer of `len` bytes.
    pub fn new(len: usize) -> Self {
        let data = vec![0u8; len];
        let locked = lock_region(&data);
        Self { data, locked }
    }

    /// Copy `bytes` into a fresh locked buffer.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut buf = Self::new(bytes.len());
        buf.data.copy_from_slice(bytes);
        buf
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the pages are actually pinned in RAM.
    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl Clone for LockedBuffer {
    fn clone(&self) -> Self {
        Self::from_slice(&self.data)
    }
}

impl Drop for LockedBuffer {
    fn drop(&mut self) {
        // Zeroize while still locked, then release the pages
        self.data.zeroize();
        if self.locked && self.data.capacity() > 0 {
            #[cfg(unix)]
            sys::munlock(self.data.as_ptr(), self.data.capacity());
        }
    }
}

fn lock_region(data: &[u8]) -> bool {
    if data.is_empty() {
        return true;
    }

    #[cfg(unix)]
    let locked = sys::mlock(data.as_ptr(), data.len());
    #[cfg(not(unix))]
    let locked = false;

    if !locked {
        log::warn!(
            "failed to mlock {} bytes; seed material may be swappable",
            data.len()
        );
    }
    locked
}

#[cfg(unix)]
mod sys {
    pub fn disable_core_dumps() -> bool {
        let rlim = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        // SAFETY: setrlimit only reads the struct we pass by reference
        let result = unsafe { libc::setrlimit(libc::RLIMIT_CORE, &rlim) };
        if result != 0 {
            log::warn!(
                "failed to disable core dumps: {}",
                std::io::Error::last_os_error()
            );
            return false;
        }
        true
    }

    pub fn mlock(ptr: *const u8, len: usize) -> bool {
        // SAFETY: callers pass a pointer/length pair taken from a live Vec
        unsafe { libc::mlock(ptr as *const libc::c_void, len) == 0 }
    }

    pub fn munlock(ptr: *const u8, len: usize) -> bool {
        // SAFETY: same region that was handed to mlock
        unsafe { libc::munlock(ptr as *const libc::c_void, len) == 0 }
    }
}
