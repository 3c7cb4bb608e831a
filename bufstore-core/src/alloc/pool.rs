//! ## bufstore-core::alloc::pool
//! **Fixed-size buffer pool with a LIFO free list and lock bits**
//!
//! Buffers are identified by address. `acquire` pops the most recently
//! released buffer; `release` pushes it back unless its lock bit is set;
//! `unlock_and_release` clears the bit and always pushes. Addresses this
//! pool did not issue are passed to a [`ForeignDisposal`] instead.

use std::ptr::NonNull;

use tracing::{debug, error, trace, warn};

use super::arena::{Arena, ArenaLayout};
use super::bitmap::LockBitmap;
use super::ownership::{BufferId, Ownership};
use super::stats::{PoolCounters, PoolStats};
use crate::error::PoolError;

/// Receives addresses handed to `release`/`unlock_and_release` that do not
/// belong to the pool.
///
/// Whoever allocated such a buffer knows how to free it; the pool does not.
/// Closures `FnMut(NonNull<u8>)` implement this trait.
pub trait ForeignDisposal {
    fn dispose(&mut self, addr: NonNull<u8>);
}

impl<F> ForeignDisposal for F
where
    F: FnMut(NonNull<u8>),
{
    #[inline]
    fn dispose(&mut self, addr: NonNull<u8>) {
        self(addr)
    }
}

/// Default disposal: logs the address and leaves ownership with the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct TraceForeign;

impl ForeignDisposal for TraceForeign {
    fn dispose(&mut self, addr: NonNull<u8>) {
        warn!(addr = ?addr, "Released buffer is not owned by this pool, leaving it to its allocator");
    }
}

/// Fixed-size buffer pool.
///
/// Not thread-safe; every mutating call needs `&mut self`.
pub struct BufferStore<D = TraceForeign> {
    arena: Arena,
    locked: LockBitmap,
    available: Vec<BufferId>,
    disposal: D,
    counters: PoolCounters,
}

impl BufferStore<TraceForeign> {
    /// Creates a pool of `buffer_count` buffers of `buffer_size` bytes each.
    ///
    /// # Arguments
    ///
    /// * `buffer_count` - Number of slots, fixed for the lifetime of the pool.
    /// * `buffer_size` - Bytes per slot, fixed for the lifetime of the pool.
    pub fn new(buffer_count: usize, buffer_size: usize) -> Result<Self, PoolError> {
        Self::with_disposal(buffer_count, buffer_size, TraceForeign)
    }
}

impl<D: ForeignDisposal> BufferStore<D> {
    /// Creates a pool that hands foreign addresses to `disposal`.
    pub fn with_disposal(
        buffer_count: usize,
        buffer_size: usize,
        disposal: D,
    ) -> Result<Self, PoolError> {
        let layout = ArenaLayout::new(buffer_count, buffer_size)?;
        let arena = Arena::new(layout)?;

        // SAFETY: the arena reserves bitmap_words aligned words in front of
        // its base and outlives the bitmap, both being owned by the store.
        let mut locked =
            unsafe { LockBitmap::from_raw(arena.bitmap_ptr(), layout.bitmap_words, buffer_count) };
        locked.zero_all();

        // Pushed from the last buffer down so the first pop yields the base.
        let available: Vec<BufferId> = (0..buffer_count).rev().map(BufferId::new).collect();
        debug_assert_eq!(available.len(), buffer_count);
        debug_assert_eq!(
            available.last().map(|id| arena.buffer_ptr(*id)),
            Some(arena.base())
        );

        debug!(buffer_count, buffer_size, "Buffer store ready");

        Ok(Self {
            arena,
            locked,
            available,
            disposal,
            counters: PoolCounters::default(),
        })
    }

    /// Takes the most recently released buffer.
    ///
    /// Fails with [`PoolError::Exhausted`] when every buffer is outstanding.
    /// The pool never grows.
    #[inline]
    pub fn acquire(&mut self) -> Result<NonNull<u8>, PoolError> {
        match self.available.pop() {
            Some(id) => {
                self.counters.acquisitions += 1;
                Ok(self.arena.buffer_ptr(id))
            }
            None => {
                self.counters.exhaustion_failures += 1;
                let capacity = self.capacity();
                error!(capacity, "Storage pool exhausted");
                Err(PoolError::Exhausted { capacity })
            }
        }
    }

    /// Like [`acquire`](Self::acquire) but treats exhaustion as fatal.
    ///
    /// # Panics
    /// If the pool is exhausted.
    pub fn acquire_or_panic(&mut self) -> NonNull<u8> {
        match self.acquire() {
            Ok(buffer) => buffer,
            Err(e) => panic!("{e}, pool size cannot be increased"),
        }
    }

    /// Returns a buffer to the pool.
    ///
    /// Locked pool buffers stay outstanding. Foreign addresses go to the
    /// disposal collaborator.
    pub fn release(&mut self, addr: NonNull<u8>) {
        match self.arena.classify(addr.as_ptr()) {
            Ownership::Pooled(id) if self.locked.get(id.index()) => {
                trace!(index = id.index(), "Release skipped, buffer is locked");
                self.counters.locked_release_skips += 1;
            }
            Ownership::Pooled(id) => {
                self.push_free(id);
                self.counters.releases += 1;
                trace!(index = id.index(), "Buffer released");
            }
            Ownership::Foreign => self.dispose_foreign(addr),
        }
    }

    /// Clears the buffer's lock bit and returns it to the pool.
    ///
    /// This is the only path that recycles a locked buffer.
    pub fn unlock_and_release(&mut self, addr: NonNull<u8>) {
        match self.arena.classify(addr.as_ptr()) {
            Ownership::Pooled(id) => {
                self.locked.reset(id.index());
                self.push_free(id);
                self.counters.unlock_releases += 1;
                trace!(index = id.index(), "Buffer unlocked and released");
            }
            Ownership::Foreign => self.dispose_foreign(addr),
        }
    }

    /// Number of buffers on the free list.
    #[inline]
    pub fn available_count(&self) -> usize {
        self.available.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.arena.layout().buffer_count
    }

    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.arena.layout().buffer_size
    }

    /// Page-aligned address of buffer 0.
    #[inline]
    pub fn base(&self) -> NonNull<u8> {
        self.arena.base()
    }

    #[inline]
    pub fn layout(&self) -> &ArenaLayout {
        self.arena.layout()
    }

    /// Bytes of the raw allocation in front of the data region.
    #[inline]
    pub fn header_len(&self) -> usize {
        self.arena.header_len()
    }

    #[inline]
    pub fn is_from_pool(&self, addr: *const u8) -> bool {
        self.arena.is_from_pool(addr)
    }

    #[inline]
    pub fn is_buffer(&self, addr: *const u8) -> bool {
        self.arena.is_buffer(addr)
    }

    #[inline]
    pub fn classify(&self, addr: *const u8) -> Ownership {
        self.arena.classify(addr)
    }

    /// Buffer index of `addr`, if it is a buffer of this pool.
    #[inline]
    pub fn index_of(&self, addr: *const u8) -> Option<BufferId> {
        self.classify(addr).buffer_id()
    }

    /// Address of the buffer identified by `id`.
    #[inline]
    pub fn buffer_ptr(&self, id: BufferId) -> NonNull<u8> {
        self.arena.buffer_ptr(id)
    }

    /// Whether `addr` is a pool buffer with its lock bit set.
    pub fn is_locked(&self, addr: *const u8) -> bool {
        self.index_of(addr)
            .is_some_and(|id| self.locked.get(id.index()))
    }

    /// Grants access to the lock bits.
    ///
    /// Deciding when a buffer must outlive a normal release (hardware still
    /// reading it, deferred consumer) belongs to the caller.
    pub fn lock_control(&mut self) -> LockControl<'_> {
        LockControl {
            arena: &self.arena,
            bitmap: &mut self.locked,
        }
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats::new(
            self.capacity(),
            self.available_count(),
            self.locked.count_set(),
            &self.counters,
        )
    }

    #[inline]
    fn push_free(&mut self, id: BufferId) {
        debug_assert!(
            !self.available.contains(&id),
            "buffer {} released twice",
            id.index()
        );
        self.available.push(id);
    }

    fn dispose_foreign(&mut self, addr: NonNull<u8>) {
        debug!(addr = ?addr, "Foreign buffer released");
        self.counters.foreign_releases += 1;
        self.disposal.dispose(addr);
    }
}

impl<D> Drop for BufferStore<D> {
    fn drop(&mut self) {
        let outstanding = self.arena.layout().buffer_count - self.available.len();
        if outstanding > 0 {
            warn!(outstanding, "Buffer store dropped with buffers still outstanding");
        }
    }
}

impl<D> std::fmt::Debug for BufferStore<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferStore")
            .field("arena", &self.arena)
            .field("available", &self.available.len())
            .field("locked", &self.locked)
            .finish()
    }
}

/// Lock-bit access granted to trusted collaborators such as drivers.
///
/// Indices use the pool's own addressing, `(addr - base) / buffer_size`.
pub struct LockControl<'a> {
    arena: &'a Arena,
    bitmap: &'a mut LockBitmap,
}

impl LockControl<'_> {
    /// Buffer index of `addr`, if it is a buffer of this pool.
    #[inline]
    pub fn index_of(&self, addr: *const u8) -> Option<BufferId> {
        self.arena.classify(addr).buffer_id()
    }

    /// Marks the buffer so that a normal `release` leaves it outstanding.
    #[inline]
    pub fn lock(&mut self, id: BufferId) {
        self.bitmap.set(id.index());
    }

    #[inline]
    pub fn unlock(&mut self, id: BufferId) {
        self.bitmap.reset(id.index());
    }

    #[inline]
    pub fn is_locked(&self, id: BufferId) -> bool {
        self.bitmap.get(id.index())
    }

    /// Locks the buffer at `addr`. Returns `None` for foreign addresses.
    pub fn lock_addr(&mut self, addr: *const u8) -> Option<BufferId> {
        let id = self.index_of(addr)?;
        self.lock(id);
        Some(id)
    }

    /// Clears every lock bit.
    pub fn clear_all(&mut self) {
        self.bitmap.zero_all();
    }
}
