//! ## bufstore-core::alloc::arena
//! **Single page-aligned allocation backing the whole pool**
//!
//! The arena requests `PAGE_SIZE - 1 + N * B + ⌈N / 32⌉ * 4` bytes in one
//! allocation. The data region starts at the first page boundary that leaves
//! room for the lock bitmap directly in front of it, so the bitmap lives in
//! what would otherwise be alignment slack. The whole region is returned to
//! the allocator in one step when the arena is dropped.

use std::alloc::{self, Layout};
use std::mem;
use std::ptr::NonNull;

use serde::Serialize;
use tracing::info;

use super::ownership::BufferId;
use crate::error::PoolError;

/// Alignment of the data region.
pub const PAGE_SIZE: usize = 0x1000;

const BITS_PER_WORD: usize = u32::BITS as usize;

/// Sizes derived from the pool parameters before anything is allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArenaLayout {
    /// Number of fixed-size slots.
    pub buffer_count: usize,
    /// Size of each slot in bytes.
    pub buffer_size: usize,
    /// `buffer_count * buffer_size`.
    pub data_size: usize,
    /// 32-bit words in the lock bitmap, `⌈buffer_count / 32⌉`.
    pub bitmap_words: usize,
    /// Bytes requested from the allocator, alignment slack included.
    pub raw_size: usize,
}

impl ArenaLayout {
    /// Validates the pool parameters and computes the arena size.
    pub fn new(buffer_count: usize, buffer_size: usize) -> Result<Self, PoolError> {
        if buffer_count == 0 {
            return Err(PoolError::ZeroBufferCount);
        }
        if buffer_size == 0 {
            return Err(PoolError::ZeroBufferSize);
        }

        let overflow = || PoolError::SizeOverflow {
            buffer_count,
            buffer_size,
        };
        let data_size = buffer_count.checked_mul(buffer_size).ok_or_else(overflow)?;
        let bitmap_words = buffer_count.div_ceil(BITS_PER_WORD);
        let raw_size = (PAGE_SIZE - 1)
            .checked_add(data_size)
            .and_then(|n| n.checked_add(bitmap_words * mem::size_of::<u32>()))
            .ok_or_else(overflow)?;

        Ok(Self {
            buffer_count,
            buffer_size,
            data_size,
            bitmap_words,
            raw_size,
        })
    }

    /// Size of the lock bitmap in bytes.
    #[inline]
    pub fn bitmap_bytes(&self) -> usize {
        self.bitmap_words * mem::size_of::<u32>()
    }
}

/// Owned arena memory.
///
/// `base` is page aligned and followed by `data_size` bytes of buffer space;
/// the lock bitmap occupies the `bitmap_bytes()` immediately before `base`.
pub struct Arena {
    raw: NonNull<u8>,
    raw_layout: Layout,
    base: NonNull<u8>,
    layout: ArenaLayout,
}

impl Arena {
    /// Allocates the arena described by `layout`.
    ///
    /// The memory is left uninitialised; callers zero the bitmap themselves.
    pub fn new(layout: ArenaLayout) -> Result<Self, PoolError> {
        let raw_layout = Layout::from_size_align(layout.raw_size, mem::align_of::<u32>())
            .map_err(|_| PoolError::SizeOverflow {
                buffer_count: layout.buffer_count,
                buffer_size: layout.buffer_size,
            })?;

        // SAFETY: raw_size is at least PAGE_SIZE, so the layout is non-zero.
        let raw = NonNull::new(unsafe { alloc::alloc(raw_layout) }).ok_or(
            PoolError::AllocationFailed {
                bytes: layout.raw_size,
            },
        )?;

        let raw_addr = raw.as_ptr() as usize;
        let padding = (raw_addr + layout.bitmap_bytes()).next_multiple_of(PAGE_SIZE) - raw_addr;

        // SAFETY: bitmap_bytes <= padding <= bitmap_bytes + PAGE_SIZE - 1, so
        // both the bitmap and the data region stay inside the allocation.
        let base = unsafe { NonNull::new_unchecked(raw.as_ptr().add(padding)) };

        info!(
            raw = ?raw,
            base = ?base,
            buffer_count = layout.buffer_count,
            buffer_size = layout.buffer_size,
            bitmap_words = layout.bitmap_words,
            raw_size = layout.raw_size,
            "Buffer arena allocated"
        );

        Ok(Self {
            raw,
            raw_layout,
            base,
            layout,
        })
    }

    /// First byte of buffer 0. Always a multiple of [`PAGE_SIZE`].
    #[inline]
    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    #[inline]
    pub fn base_addr(&self) -> usize {
        self.base.as_ptr() as usize
    }

    /// One past the last byte of the data region.
    #[inline]
    pub fn end_addr(&self) -> usize {
        self.base_addr() + self.layout.data_size
    }

    #[inline]
    pub fn layout(&self) -> &ArenaLayout {
        &self.layout
    }

    /// Bytes between the start of the raw allocation and `base`.
    #[inline]
    pub fn header_len(&self) -> usize {
        self.base_addr() - self.raw.as_ptr() as usize
    }

    /// Start of the lock bitmap words.
    pub(crate) fn bitmap_ptr(&self) -> NonNull<u32> {
        // SAFETY: header_len() >= bitmap_bytes(), checked at construction.
        unsafe {
            NonNull::new_unchecked(self.base.as_ptr().sub(self.layout.bitmap_bytes())).cast()
        }
    }

    /// Address of the buffer identified by `id`.
    ///
    /// # Panics
    /// If `id` was issued by an arena with more buffers than this one.
    #[inline]
    pub fn buffer_ptr(&self, id: BufferId) -> NonNull<u8> {
        assert!(
            id.index() < self.layout.buffer_count,
            "buffer index {} outside arena of {} buffers",
            id.index(),
            self.layout.buffer_count
        );
        // SAFETY: index < buffer_count keeps the offset inside the data region.
        unsafe {
            NonNull::new_unchecked(
                self.base
                    .as_ptr()
                    .add(id.index() * self.layout.buffer_size),
            )
        }
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        // SAFETY: raw was allocated in `new` with exactly this layout.
        unsafe { alloc::dealloc(self.raw.as_ptr(), self.raw_layout) }
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("raw", &self.raw)
            .field("base", &self.base)
            .field("layout", &self.layout)
            .finish()
    }
}

// SAFETY: the arena exclusively owns its allocation; nothing else aliases it.
unsafe impl Send for Arena {}
