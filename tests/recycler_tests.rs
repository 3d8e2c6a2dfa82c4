// tests/recycler_tests.rs
//! Directory recycling across thread exits.
//!
//! Kept in its own test binary: the assertions depend on the global
//! recycler, which every allocating thread in a process touches.

use mapalloc::prelude::*;
use std::thread;

const HDR: usize = 2 * size_of::<usize>();

/// Spawns a thread, performs its first allocation, and reports the base
/// address of the pool that allocation landed in.
fn pool_base_of_first_allocation() -> usize {
    thread::spawn(|| {
        let p = alloc(10).unwrap().as_ptr();
        let base = p.addr() - 2 * HDR;
        unsafe { free(p) };
        base
    })
    .join()
    .unwrap()
}

#[test]
fn exiting_thread_donates_arena_to_next() {
    let first = pool_base_of_first_allocation();
    let second = pool_base_of_first_allocation();
    let third = pool_base_of_first_allocation();

    // Each thread adopts the arena the previous one retired, so the
    // initial pool sits at the same address every time -- no fresh
    // directory or pool mapping is issued after the first thread.
    assert_eq!(first, second);
    assert_eq!(second, third);

    // An adopted arena still behaves like a fresh one.
    in_adopted_thread_allocations_are_clean(first);
}

fn in_adopted_thread_allocations_are_clean(expected_base: usize) {
    thread::spawn(move || {
        let p = alloc(64).unwrap().as_ptr();
        assert_eq!(p.addr() - 2 * HDR, expected_base);

        let bytes = unsafe { std::slice::from_raw_parts(p, 64) };
        assert!(bytes.iter().all(|&byte| byte == 0));
        unsafe { free(p) };
    })
    .join()
    .unwrap();
}
