// src/directory.rs
//! The per-thread pool directory: a dynamic array of pool base pointers
//! living in its own anonymous mapping.
//!
//! Layout, in words: the capacity `N` (a power of two), a link word the
//! recycler threads its free list through, then `N` pool slots. The
//! directory grows by doubling into a fresh mapping; the superseded
//! mapping is released once the slots have been copied out.

use std::ptr::{self, NonNull};
use std::slice;

use zeroize::Zeroize;

use crate::os;
use crate::pool::{Pool, WORD};

/// Number of pool slots in a fresh directory.
pub(crate) const INIT_SLOTS: usize = 64;

const CAPACITY_WORD: usize = 0;
const LINK_WORD: usize = 1;
const SLOT_BASE: usize = 2;

/// Handle to one directory mapping.
///
/// Copyable raw handle; the owning thread (or the recycler, between
/// threads) keeps the mapping alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Directory {
    base: NonNull<usize>,
}

impl Directory {
    /// Maps and formats a directory with [`INIT_SLOTS`] empty slots.
    pub(crate) fn create() -> Option<Directory> {
        let base = os::map((INIT_SLOTS + SLOT_BASE) * WORD)?;
        let dir = Directory { base: base.cast() };
        // SAFETY: the mapping covers the full word span just requested.
        unsafe {
            slice::from_raw_parts_mut(dir.base.as_ptr(), INIT_SLOTS + SLOT_BASE).zeroize();
        }
        dir.set_word(CAPACITY_WORD, INIT_SLOTS);
        Some(dir)
    }

    /// Rebuilds a handle from an address stored on the recycler list.
    ///
    /// # Safety
    ///
    /// `addr` must be the address of a live directory mapping, as
    /// recorded by [`Directory::addr`].
    #[inline]
    pub(crate) unsafe fn from_addr(addr: usize) -> Directory {
        debug_assert!(addr != 0);
        Directory {
            base: unsafe { NonNull::new_unchecked(addr as *mut usize) },
        }
    }

    /// Address of the mapping, used as the recycler's list key.
    #[inline]
    pub(crate) fn addr(self) -> usize {
        self.base.as_ptr().addr()
    }

    #[inline]
    fn word(self, index: usize) -> usize {
        // SAFETY: `index` stays within the header or the slot span of a
        // live mapping (callers bound it by the stored capacity).
        unsafe { self.base.as_ptr().add(index).read() }
    }

    #[inline]
    fn set_word(self, index: usize, value: usize) {
        // SAFETY: as for `word`.
        unsafe { self.base.as_ptr().add(index).write(value) }
    }

    /// Current capacity in pool slots.
    #[inline]
    pub(crate) fn capacity(self) -> usize {
        self.word(CAPACITY_WORD)
    }

    /// Next-directory address while on the recycler list (zero
    /// terminates the list). Unused while the directory is live on a
    /// thread.
    #[inline]
    pub(crate) fn link(self) -> usize {
        self.word(LINK_WORD)
    }

    #[inline]
    pub(crate) fn set_link(self, addr: usize) {
        self.set_word(LINK_WORD, addr)
    }

    /// The pool recorded in `slot`, if any.
    pub(crate) fn slot(self, index: usize) -> Option<Pool> {
        debug_assert!(index < self.capacity());
        let addr = self.word(SLOT_BASE + index);
        // SAFETY: non-null slot words are pool bases this directory
        // installed.
        NonNull::new(addr as *mut u8).map(|base| unsafe { Pool::from_base(base) })
    }

    pub(crate) fn set_slot(self, index: usize, pool: Pool) {
        debug_assert!(index < self.capacity());
        self.set_word(SLOT_BASE + index, pool.base().as_ptr().addr());
    }

    /// Doubles the capacity into a fresh mapping, copying the populated
    /// slots and releasing the old mapping. Returns the old capacity,
    /// which is also the index of the first slot the growth opened up.
    pub(crate) fn grow(&mut self) -> Option<usize> {
        let old_slots = self.capacity();
        let new_slots = old_slots.checked_mul(2)?;

        let base = os::map((new_slots + SLOT_BASE) * WORD)?;
        let grown = Directory { base: base.cast() };
        grown.set_word(CAPACITY_WORD, new_slots);
        // SAFETY: both spans are live; the fresh mapping's upper half and
        // link word stay zero.
        unsafe {
            ptr::copy_nonoverlapping(
                self.base.as_ptr().add(SLOT_BASE),
                grown.base.as_ptr().add(SLOT_BASE),
                old_slots,
            );
        }

        let old = std::mem::replace(self, grown);
        // SAFETY: every live pool pointer now resides in the new
        // mapping; nothing references the old one.
        unsafe { os::unmap(old.base.cast(), (old_slots + SLOT_BASE) * WORD) };
        Some(old_slots)
    }
}
