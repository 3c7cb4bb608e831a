//! ## bufstore-core::alloc
//! **Page-aligned arena and the fixed-size buffer pool built on top of it**
//!
//! ### Key Submodules:
//! - `arena/`: single allocation holding the lock bitmap and the data region
//! - `bitmap/`: per-buffer lock bits
//! - `ownership/`: decides whether an address belongs to the arena
//! - `pool/`: LIFO free list, acquire/release/unlock paths
//! - `stats/`: usage counters and snapshots
//!
//! ### Memory layout
//! ```text
//! raw ─┬─ slack ─┬─ lock bitmap ─┬─ buffer 0 ─┬─ buffer 1 ─┬ ... ┬─ buffer N-1 ─┬─ slack ─┐
//!      │         │ ⌈N/32⌉ x u32  │ base (4 KiB aligned)                        │         │
//! ```

pub mod arena;
pub mod bitmap;
pub mod ownership;
pub mod pool;
pub mod stats;

pub use arena::{Arena, ArenaLayout, PAGE_SIZE};
pub use bitmap::LockBitmap;
pub use ownership::{BufferId, Ownership};
pub use pool::{BufferStore, ForeignDisposal, LockControl, TraceForeign};
pub use stats::PoolStats;
