// src/abi.rs
//! Process-wide C allocator symbols, exported when the `libc-override`
//! feature is enabled.
//!
//! With the feature on, every `malloc`/`free` in the process -- including
//! those issued by libraries -- resolves to this allocator, so the
//! thread-affinity contract extends to the whole process: memory must be
//! released by the thread that allocated it. Programs that hand heap
//! pointers between threads must not enable the override.

use std::ffi::{c_int, c_void};
use std::ptr;

use crate::api;
use crate::error::AllocError;

/// C `malloc`: allocates `size` bytes, or returns null.
///
/// # Safety
///
/// The returned pointer must be released exactly once -- via [`free`] or
/// `realloc` -- on the calling thread.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn malloc(size: usize) -> *mut c_void {
    match api::alloc(size) {
        Some(region) => region.as_ptr().cast(),
        None => ptr::null_mut(),
    }
}

/// C `calloc`: allocates zeroed space for `nmemb * size` bytes, or
/// returns null.
///
/// # Safety
///
/// As for [`malloc`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn calloc(nmemb: usize, size: usize) -> *mut c_void {
    match api::calloc(nmemb, size) {
        Some(region) => region.as_ptr().cast(),
        None => ptr::null_mut(),
    }
}

/// C `realloc`: resizes a region, or returns null leaving it valid.
///
/// # Safety
///
/// `ptr` must be null or a live region allocated on the calling thread.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn realloc(ptr: *mut c_void, size: usize) -> *mut c_void {
    match unsafe { api::realloc(ptr.cast(), size) } {
        Some(region) => region.as_ptr().cast(),
        None => ptr::null_mut(),
    }
}

/// C `free`. Null is a no-op.
///
/// # Safety
///
/// `ptr` must be null or a live region allocated on the calling thread,
/// released at most once.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free(ptr: *mut c_void) {
    unsafe { api::free(ptr.cast()) }
}

/// C `posix_memalign`: returns 0 on success, `EINVAL` for a bad
/// alignment (leaving `*memptr` unchanged) or `ENOMEM` when exhausted.
///
/// # Safety
///
/// `memptr` must be valid for one pointer write; the stored region
/// follows the [`malloc`] contract.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn posix_memalign(
    memptr: *mut *mut c_void,
    alignment: usize,
    size: usize,
) -> c_int {
    match api::memalign(alignment, size) {
        Ok(Some(region)) => {
            unsafe { memptr.write(region.as_ptr().cast()) };
            0
        }
        Ok(None) => {
            unsafe { memptr.write(ptr::null_mut()) };
            0
        }
        Err(AllocError::InvalidAlignment) => libc::EINVAL,
        Err(AllocError::OutOfMemory) => libc::ENOMEM,
    }
}
