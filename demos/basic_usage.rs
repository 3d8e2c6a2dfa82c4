// demos/basic_usage.rs
//! Allocate a region, copy a message into it, read it back, release it.

use mapalloc::prelude::*;

fn main() {
    let message = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "hello from mapalloc".to_string());
    let bytes = message.as_bytes();

    let region = alloc(bytes.len() + 1).expect("failed to allocate memory");
    unsafe {
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), region.as_ptr(), bytes.len());
        region.as_ptr().add(bytes.len()).write(0);
    }

    let copied = unsafe { std::slice::from_raw_parts(region.as_ptr(), bytes.len()) };
    println!("region contents: {}", String::from_utf8_lossy(copied));

    unsafe { free(region.as_ptr()) };
}
