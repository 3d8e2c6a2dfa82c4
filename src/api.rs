// src/api.rs
//! The allocator's public face: `alloc`, `calloc`, `realloc`,
//! `memalign` and `free`, with the standard C allocator's contracts.
//!
//! # Thread affinity
//!
//! Every region is owned by the thread that allocated it. Releasing or
//! resizing a region from another thread is a data race on its header
//! and is not supported; move data between threads by copying it into a
//! region the receiving thread owns.

use std::ptr::{self, NonNull};

use crate::error::{AllocError, Result};
use crate::pool::{Cursor, HEADER, Rank, WORD, quantize};
use crate::thread;

/// Allocates `size` bytes and returns the payload pointer.
///
/// The size rounds up to the allocation quantum (64 bytes on 64-bit
/// targets), and the rounded length is readable at `ptr - W` until the
/// region is freed. Returns `None` when `size` is zero or no memory
/// could be obtained; a failed attempt leaves the allocator unchanged
/// apart from always-safe reclamation of pending frees.
pub fn alloc(size: usize) -> Option<NonNull<u8>> {
    if size == 0 {
        return None;
    }
    let size = quantize(size)?;
    thread::with_arena(|arena| arena.alloc(size))
}

/// Allocates zeroed space for `nmemb` elements of `size` bytes each.
///
/// Returns `None` when the product is zero, overflows, or memory is
/// exhausted.
pub fn calloc(nmemb: usize, size: usize) -> Option<NonNull<u8>> {
    let total = nmemb.checked_mul(size)?;
    let region = alloc(total)?;
    // A reused block still carries its previous payload bytes.
    unsafe { ptr::write_bytes(region.as_ptr(), 0, total) };
    Some(region)
}

/// Resizes `region` to at least `size` bytes.
///
/// A null `region` allocates `size + size / 2` bytes, over-reserving so
/// an early growth sequence settles quickly. When the existing block
/// already covers `size`, the pointer is returned unchanged -- a shrink
/// leaves the block's full prior footprint in place. Otherwise a new
/// block of `size + length / 2` bytes (or exactly `size` when that
/// fails) is allocated, the old contents copied, and the old block
/// marked for reclamation. On failure the original region stays valid.
///
/// # Safety
///
/// `region` must be null or a pointer previously returned by this
/// allocator on the calling thread and not yet freed.
pub unsafe fn realloc(region: *mut u8, size: usize) -> Option<NonNull<u8>> {
    let Some(old) = NonNull::new(region) else {
        return alloc(size.saturating_add(size / 2));
    };

    // SAFETY: per contract, `old` is a live region of this allocator.
    let header = unsafe { Cursor::from_payload(old.as_ptr()) };
    let length = unsafe { header.len() };
    if length >= size {
        return Some(old);
    }

    let grown = alloc(size.saturating_add(length / 2)).or_else(|| alloc(size))?;
    // SAFETY: both regions are live and disjoint; the old header stays
    // writable until its pool reclaims it.
    unsafe {
        ptr::copy_nonoverlapping(old.as_ptr(), grown.as_ptr(), length);
        header.set_rank(Rank::Tbf);
    }
    Some(grown)
}

/// Allocates `size` bytes at an address that is a multiple of
/// `alignment`.
///
/// `alignment` must be a power of two and a multiple of the pointer
/// size. A zero `size` succeeds with `Ok(None)`.
pub fn memalign(alignment: usize, size: usize) -> Result<Option<NonNull<u8>>> {
    if size == 0 {
        return Ok(None);
    }
    if !alignment.is_power_of_two() || alignment % WORD != 0 {
        return Err(AllocError::InvalidAlignment);
    }
    // Block payloads are two-word aligned by layout; small alignments
    // need no carving.
    if alignment <= HEADER {
        return alloc(size).map(Some).ok_or(AllocError::OutOfMemory);
    }

    let padded = alignment
        .checked_mul(2)
        .and_then(|pad| size.checked_add(pad))
        .ok_or(AllocError::OutOfMemory)?;
    let base = alloc(padded).ok_or(AllocError::OutOfMemory)?;

    let addr = base.as_ptr().addr();
    let aligned_addr = ((addr + alignment - 1) & !(alignment - 1)) + alignment;
    let slack = aligned_addr - addr;
    let aligned = base.as_ptr().wrapping_add(slack);

    // Split the block in-band at the aligned boundary: the lead-in
    // becomes a block awaiting reclamation, the remainder keeps the
    // allocation.
    // SAFETY: `base` is a live region and `aligned` lies at least one
    // header past its start (slack >= alignment > HEADER).
    let head = unsafe { Cursor::from_payload(base.as_ptr()) };
    let length = unsafe { head.len() };
    debug_assert!(slack > HEADER && length - slack >= size);
    let aligned_head = unsafe { Cursor::from_payload(aligned) };
    unsafe {
        head.set_rank(Rank::Tbf);
        head.set_len(slack - HEADER);
        aligned_head.set_rank(Rank::Used);
        aligned_head.set_len(length - slack);
    }
    Ok(NonNull::new(aligned))
}

/// Releases a region. Null is a no-op.
///
/// The block is only stamped "to be freed"; its bytes are credited back
/// and the block coalesced by the next scan of its pool. A single
/// header write -- no locks, no pool lookup.
///
/// # Safety
///
/// `region` must be null or a pointer previously returned by this
/// allocator on the calling thread, released at most once. Releasing a
/// region allocated by another thread is a data race on its header.
pub unsafe fn free(region: *mut u8) {
    if region.is_null() {
        return;
    }
    debug_assert!(
        thread::owns_region(region),
        "freed region does not belong to a pool of the calling thread"
    );
    // SAFETY: per contract, `region` is a live region of this allocator.
    unsafe { Cursor::from_payload(region).set_rank(Rank::Tbf) };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::layout::QUANTUM;

    #[test]
    fn test_zero_size_requests_fail() {
        assert!(alloc(0).is_none());
        assert!(calloc(0, 16).is_none());
        assert!(calloc(16, 0).is_none());
    }

    #[test]
    fn test_calloc_rejects_overflowing_product() {
        assert!(calloc(usize::MAX, 2).is_none());
    }

    #[test]
    fn test_alloc_length_is_normalized() {
        let region = alloc(10).unwrap();
        unsafe {
            assert_eq!(Cursor::from_payload(region.as_ptr()).len(), QUANTUM);
            free(region.as_ptr());
        }
    }

    #[test]
    fn test_calloc_zeroes_reused_storage() {
        let region = alloc(4 * QUANTUM).unwrap();
        unsafe {
            region.as_ptr().write_bytes(0xFF, 4 * QUANTUM);
            free(region.as_ptr());
        }

        let zeroed = calloc(4, QUANTUM).unwrap();
        assert_eq!(zeroed, region);
        let bytes = unsafe { std::slice::from_raw_parts(zeroed.as_ptr(), 4 * QUANTUM) };
        assert!(bytes.iter().all(|&byte| byte == 0));
        unsafe { free(zeroed.as_ptr()) };
    }

    #[test]
    fn test_realloc_of_null_allocates() {
        let region = unsafe { realloc(ptr::null_mut(), 32) }.unwrap();
        unsafe { free(region.as_ptr()) };
    }

    #[test]
    fn test_realloc_shrink_returns_same_region() {
        let region = alloc(4 * QUANTUM).unwrap();
        let shrunk = unsafe { realloc(region.as_ptr(), QUANTUM) }.unwrap();
        assert_eq!(shrunk, region);
        // The block keeps its full prior footprint.
        unsafe {
            assert_eq!(Cursor::from_payload(shrunk.as_ptr()).len(), 4 * QUANTUM);
            free(shrunk.as_ptr());
        }
    }

    #[test]
    fn test_realloc_growth_preserves_contents() {
        let region = alloc(QUANTUM).unwrap();
        unsafe { region.as_ptr().write_bytes(0xC3, QUANTUM) };

        let grown = unsafe { realloc(region.as_ptr(), 8 * QUANTUM) }.unwrap();
        assert_ne!(grown, region);
        let bytes = unsafe { std::slice::from_raw_parts(grown.as_ptr(), QUANTUM) };
        assert!(bytes.iter().all(|&byte| byte == 0xC3));
        // The old block is pending reclamation.
        unsafe {
            assert_eq!(Cursor::from_payload(region.as_ptr()).rank(), Rank::Tbf);
            free(grown.as_ptr());
        }
    }

    #[test]
    fn test_memalign_validates_alignment() {
        assert_eq!(memalign(0, 16), Err(AllocError::InvalidAlignment));
        assert_eq!(memalign(3, 16), Err(AllocError::InvalidAlignment));
        assert_eq!(memalign(24, 16), Err(AllocError::InvalidAlignment));
        if WORD == 8 {
            assert_eq!(memalign(4, 16), Err(AllocError::InvalidAlignment));
        }
    }

    #[test]
    fn test_memalign_zero_size_is_ok_none() {
        assert_eq!(memalign(64, 0), Ok(None));
    }

    #[test]
    fn test_memalign_alignments() {
        for alignment in [WORD, 2 * WORD, 64, 512, 4096] {
            let region = memalign(alignment, 100).unwrap().unwrap();
            assert_eq!(region.as_ptr().addr() % alignment, 0);
            unsafe {
                assert_eq!(Cursor::from_payload(region.as_ptr()).rank(), Rank::Used);
                assert!(Cursor::from_payload(region.as_ptr()).len() >= 100);
                free(region.as_ptr());
            }
        }
    }
}
