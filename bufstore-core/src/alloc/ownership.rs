//! ## bufstore-core::alloc::ownership
//! **Decides whether an address was issued by an arena**
//!
//! An address is a pool buffer only if it lies inside the data region *and*
//! sits exactly on a buffer boundary. Interior pointers are treated as
//! foreign, since dividing them down to an index would alias a real buffer.

use super::arena::Arena;

/// Index of a buffer inside its arena.
///
/// Only produced by address validation, so it always names a real slot of
/// the arena that validated it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferId(usize);

impl BufferId {
    #[inline]
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position `k` of the buffer at `base + k * buffer_size`.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Result of validating an address against an arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Start of a buffer in this arena.
    Pooled(BufferId),
    /// Anything else: outside the arena or not on a buffer boundary.
    Foreign,
}

impl Ownership {
    #[inline]
    pub fn buffer_id(self) -> Option<BufferId> {
        match self {
            Ownership::Pooled(id) => Some(id),
            Ownership::Foreign => None,
        }
    }
}

impl Arena {
    /// `base <= addr < base + N * B`.
    #[inline]
    pub fn is_from_pool(&self, addr: *const u8) -> bool {
        let addr = addr as usize;
        addr >= self.base_addr() && addr < self.end_addr()
    }

    /// `(addr - base) % B == 0`.
    ///
    /// Only meaningful for addresses that also pass [`is_from_pool`](Self::is_from_pool).
    #[inline]
    pub fn is_buffer(&self, addr: *const u8) -> bool {
        (addr as usize).wrapping_sub(self.base_addr()) % self.layout().buffer_size == 0
    }

    pub fn classify(&self, addr: *const u8) -> Ownership {
        if self.is_from_pool(addr) && self.is_buffer(addr) {
            let offset = addr as usize - self.base_addr();
            Ownership::Pooled(BufferId::new(offset / self.layout().buffer_size))
        } else {
            Ownership::Foreign
        }
    }
}
