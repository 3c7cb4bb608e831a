//! # bufstore-core
//!
//! Fixed-size packet buffer pool for a single address space network stack.
//!
//! One contiguous, page-aligned arena is carved into equally sized buffers at
//! construction. Buffers are handed out from a LIFO free list, and a per-buffer
//! lock bitmap lets drivers keep a buffer outstanding across a normal release
//! (zero-copy transmit, DMA in flight).
//!
//! ### Key Submodules:
//! - `alloc::arena`: the raw allocation and its page-aligned layout
//! - `alloc::bitmap`: lock bits stored inside the arena header
//! - `alloc::ownership`: address validation (`Pooled` vs `Foreign`)
//! - `alloc::pool`: the `BufferStore` itself
//! - `alloc::stats`: counters and snapshots for observability
//!
//! The pool is single-threaded: every mutating operation takes `&mut self`
//! and none of them block.

pub mod alloc;
pub mod error;

pub mod prelude {
    pub use crate::alloc::*;
    pub use crate::error::*;
}

pub use alloc::{
    ArenaLayout, BufferId, BufferStore, ForeignDisposal, LockControl, Ownership, PoolStats,
    TraceForeign, PAGE_SIZE,
};
pub use error::PoolError;
