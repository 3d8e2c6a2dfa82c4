// src/thread.rs
//! Thread-local arena lifecycle and the process-global directory
//! recycler.
//!
//! Each thread lazily builds an arena -- a pool directory plus a current
//! pool -- on its first allocation. When the thread exits, the arena's
//! drop hands the directory and every pool it owns to the recycler, a
//! mutex-guarded intrusive list threaded through directory word 1. The
//! next thread to perform a first allocation adopts the most recently
//! retired directory instead of mapping fresh memory.

use std::cell::RefCell;
use std::ptr::NonNull;
use std::sync::Mutex;

use crate::directory::Directory;
use crate::os;
use crate::pool::{HEADER, POOL_DEFAULT_SIZE, POOL_OVERHEAD, Pool};

// ---------------------------------------------------------------------------
// Recycler
// ---------------------------------------------------------------------------

/// Intrusive LIFO of retired directories.
///
/// The head is the address of the most recently retired directory; each
/// directory's link word holds the next address, zero terminating the
/// list.
pub(crate) struct Recycler {
    head: Mutex<usize>,
}

impl Recycler {
    pub(crate) const fn new() -> Recycler {
        Recycler {
            head: Mutex::new(0),
        }
    }

    /// Pops the most recently retired directory, if any.
    pub(crate) fn adopt(&self) -> Option<Directory> {
        let mut head = self.head.lock().unwrap();
        if *head == 0 {
            return None;
        }
        // SAFETY: only live directory addresses are pushed onto the
        // list, and their mappings are never released.
        let directory = unsafe { Directory::from_addr(*head) };
        *head = directory.link();
        Some(directory)
    }

    /// Pushes a departing thread's directory. Runs during thread
    /// teardown, so it stays allocation-free: one lock, two word writes.
    pub(crate) fn retire(&self, directory: Directory) {
        let mut head = self.head.lock().unwrap();
        directory.set_link(*head);
        *head = directory.addr();
    }
}

static RECYCLER: Recycler = Recycler::new();

// ---------------------------------------------------------------------------
// Thread arena
// ---------------------------------------------------------------------------

/// One thread's allocation state: its directory and the pool the next
/// allocation will try first.
pub(crate) struct ThreadArena {
    directory: Directory,
    current: Pool,
}

impl ThreadArena {
    /// First-allocation setup: adopt a recycled directory when one is
    /// available, otherwise map a fresh directory and initial pool.
    fn bootstrap() -> Option<ThreadArena> {
        let directory = match RECYCLER.adopt() {
            Some(directory) => directory,
            None => Directory::create()?,
        };
        let current = match directory.slot(0) {
            // An adopted directory's slot 0 is its original default-size
            // pool; wipe it so the new owner starts pristine. Later
            // slots keep their block structure for scans to reclaim.
            Some(pool) => pool.reinit(),
            None => {
                let base = os::map(POOL_DEFAULT_SIZE)?;
                let pool = unsafe { Pool::init(base, POOL_DEFAULT_SIZE) };
                directory.set_slot(0, pool);
                pool
            }
        };
        Some(ThreadArena { directory, current })
    }

    /// Allocates one normalized request.
    ///
    /// Fast-rejects on the current pool's cached free count, then
    /// rescans it (reclaiming pending frees), then walks the directory,
    /// and keeps switching pools until one admits the request or memory
    /// is exhausted.
    pub(crate) fn alloc(&mut self, size: usize) -> Option<NonNull<u8>> {
        let need = size + HEADER;
        let mut pool = self.current;

        if pool.bfree() < need && pool.update() < need {
            pool = self.change_pool(size)?;
        }
        loop {
            if let Some(region) = pool.try_alloc(size) {
                return Some(region);
            }
            pool = self.change_pool(size)?;
        }
    }

    /// Scans the directory for a pool whose contiguous free span covers
    /// the request, refreshing cached metadata along the way; falls back
    /// to creating a new pool in the first empty slot, growing the
    /// directory when every slot is taken.
    fn change_pool(&mut self, size: usize) -> Option<Pool> {
        let need = size + HEADER;
        for index in 0..self.directory.capacity() {
            let Some(pool) = self.directory.slot(index) else {
                return self.new_pool(size, index);
            };
            if pool == self.current {
                continue;
            }
            if pool.update() >= need {
                self.current = pool;
                return Some(pool);
            }
        }
        let first_fresh = self.directory.grow()?;
        self.new_pool(size, first_fresh)
    }

    /// Maps and formats a pool big enough for one `size` block, installs
    /// it at `index` and makes it current.
    fn new_pool(&mut self, size: usize, index: usize) -> Option<Pool> {
        let target = pool_mapping_size(size)?;
        let (base, mapped) = match os::map(target) {
            Some(base) => (base, target),
            None => {
                // Last resort: a mapping with no spare room at all.
                let exact = size.checked_add(POOL_OVERHEAD)?;
                (os::map(exact)?, exact)
            }
        };
        let pool = unsafe { Pool::init(base, mapped) };
        self.directory.set_slot(index, pool);
        self.current = pool;
        Some(pool)
    }
}

impl Drop for ThreadArena {
    fn drop(&mut self) {
        RECYCLER.retire(self.directory);
    }
}

/// Mapping size for a pool that must hold one `size` block: the default
/// pool size when the request and both headers fit, else the needed
/// bytes rounded up to a multiple of the default size.
fn pool_mapping_size(size: usize) -> Option<usize> {
    let need = size.checked_add(POOL_OVERHEAD)?;
    if need <= POOL_DEFAULT_SIZE {
        return Some(POOL_DEFAULT_SIZE);
    }
    need.checked_next_multiple_of(POOL_DEFAULT_SIZE)
}

// ---------------------------------------------------------------------------
// Thread-local access
// ---------------------------------------------------------------------------

thread_local! {
    static ARENA: RefCell<Option<ThreadArena>> = const { RefCell::new(None) };
}

/// Runs `f` against the calling thread's arena, building the arena on
/// first use. `None` when it cannot be built (mapping failure) or when
/// thread-local storage is already being torn down.
pub(crate) fn with_arena<R>(f: impl FnOnce(&mut ThreadArena) -> Option<R>) -> Option<R> {
    ARENA
        .try_with(|cell| {
            let mut slot = cell.borrow_mut();
            if slot.is_none() {
                *slot = ThreadArena::bootstrap();
            }
            slot.as_mut().and_then(f)
        })
        .ok()
        .flatten()
}

/// Whether `ptr` lies inside a pool owned by the calling thread.
///
/// Backs the debug-build ownership assertion in `free`. Errs permissive
/// when the arena is unavailable (teardown, or a release racing thread
/// exit).
pub(crate) fn owns_region(ptr: *mut u8) -> bool {
    ARENA
        .try_with(|cell| {
            let slot = cell.borrow();
            let Some(arena) = slot.as_ref() else {
                return true;
            };
            (0..arena.directory.capacity())
                .filter_map(|index| arena.directory.slot(index))
                .any(|pool| pool.contains(ptr))
        })
        .unwrap_or(true)
}
