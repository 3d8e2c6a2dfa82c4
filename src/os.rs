// src/os.rs
//! Anonymous virtual-memory mappings.
//!
//! The thinnest layer of the allocator: ask the operating system for
//! page-aligned, read-write, private, zero-filled memory. Nothing is
//! tracked here; pools and directories own their mappings for the life
//! of the process, except where the directory layer retires one
//! explicitly after growth.

use std::ptr::{self, NonNull};

#[cfg(not(unix))]
compile_error!("mapalloc requires a Unix-like target with anonymous mmap support");

/// Maps `size` bytes of anonymous, private, read-write memory.
///
/// The returned region is page-aligned and zero-filled. `None` means the
/// OS refused the mapping (address-space or memory exhaustion).
pub(crate) fn map(size: usize) -> Option<NonNull<u8>> {
    debug_assert!(size > 0);

    // SAFETY: anonymous mapping with no backing fd; the kernel picks the
    // address, so no live memory can be clobbered.
    let base = unsafe {
        libc::mmap(
            ptr::null_mut(),
            size,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        )
    };
    if base == libc::MAP_FAILED {
        return None;
    }
    NonNull::new(base.cast::<u8>())
}

/// Releases a mapping obtained from [`map`].
///
/// # Safety
///
/// `base` must be the exact pointer returned by `map(size)` with the same
/// `size`, and nothing may reference any byte of the mapping afterwards.
pub(crate) unsafe fn unmap(base: NonNull<u8>, size: usize) {
    // A failure here means the arguments broke the contract above; there
    // is no recovery either way.
    unsafe { libc::munmap(base.as_ptr().cast(), size) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_is_page_aligned_and_zeroed() {
        let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
        let base = map(page).unwrap();
        assert_eq!(base.as_ptr().addr() % page, 0);

        let bytes = unsafe { std::slice::from_raw_parts(base.as_ptr(), page) };
        assert!(bytes.iter().all(|&b| b == 0));

        unsafe { unmap(base, page) };
    }

    #[test]
    fn test_map_is_writable() {
        let base = map(4096).unwrap();
        unsafe {
            base.as_ptr().write_bytes(0xA5, 4096);
            assert_eq!(base.as_ptr().add(4095).read(), 0xA5);
            unmap(base, 4096);
        }
    }
}
