// src/pool/mod.rs
//! Pool arenas and their in-band block layout.

pub(crate) mod arena;
pub(crate) mod layout;

pub(crate) use arena::Pool;
pub(crate) use layout::{Cursor, HEADER, POOL_DEFAULT_SIZE, POOL_OVERHEAD, Rank, WORD, quantize};
