// demos/thread_churn.rs
//! Waves of short-lived worker threads hammering alloc/free.
//!
//! After the first wave every new thread adopts a recycled arena from a
//! finished one instead of mapping fresh memory, so later waves start
//! warm.

use mapalloc::prelude::*;
use std::time::Instant;

fn churn(rounds: usize) {
    for round in 0..rounds {
        let size = 64 + (round % 7) * 128;
        let region = alloc(size).expect("failed to allocate memory");
        unsafe {
            region.as_ptr().write_bytes(0xA5, size);
            free(region.as_ptr());
        }
    }
}

fn main() {
    for wave in 0..4 {
        let start = Instant::now();
        let workers: Vec<_> = (0..8).map(|_| std::thread::spawn(|| churn(10_000))).collect();
        for worker in workers {
            worker.join().unwrap();
        }
        println!(
            "wave {wave}: 8 threads x 10k alloc/free cycles in {:?}",
            start.elapsed()
        );
    }
}
