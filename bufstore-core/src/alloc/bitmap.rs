//! ## bufstore-core::alloc::bitmap
//! **Per-buffer lock bits stored in the arena header**
//!
//! A plain fixed-size bit vector over `u32` words. Bit `k` belongs to the
//! buffer at `base + k * buffer_size`; anyone setting bits must use the same
//! indexing (see [`BufferId`](super::ownership::BufferId)).

use std::ptr::NonNull;
use std::slice;

const BITS_PER_WORD: usize = u32::BITS as usize;

/// Lock bitmap view over words owned by an [`Arena`](super::arena::Arena).
pub struct LockBitmap {
    words: NonNull<u32>,
    word_count: usize,
    bits: usize,
}

impl LockBitmap {
    /// Wraps `word_count` words at `words`, covering `bits` buffers.
    ///
    /// The contents are not touched; call [`zero_all`](Self::zero_all) before
    /// the first read.
    ///
    /// # Safety
    /// `words` must point to `word_count` writable, `u32`-aligned words that
    /// stay valid and unaliased for the lifetime of the bitmap, and
    /// `bits <= word_count * 32`.
    pub unsafe fn from_raw(words: NonNull<u32>, word_count: usize, bits: usize) -> Self {
        debug_assert!(bits <= word_count * BITS_PER_WORD);
        Self {
            words,
            word_count,
            bits,
        }
    }

    #[inline]
    fn as_words(&self) -> &[u32] {
        // SAFETY: upheld by the contract of `from_raw`.
        unsafe { slice::from_raw_parts(self.words.as_ptr(), self.word_count) }
    }

    #[inline]
    fn as_words_mut(&mut self) -> &mut [u32] {
        // SAFETY: upheld by the contract of `from_raw`; `&mut self` is unique.
        unsafe { slice::from_raw_parts_mut(self.words.as_ptr(), self.word_count) }
    }

    #[inline]
    fn locate(&self, index: usize) -> (usize, u32) {
        assert!(
            index < self.bits,
            "lock bit {} out of range ({} bits)",
            index,
            self.bits
        );
        (index / BITS_PER_WORD, 1 << (index % BITS_PER_WORD))
    }

    /// Number of addressable bits.
    #[inline]
    pub fn len(&self) -> usize {
        self.bits
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    #[inline]
    pub fn get(&self, index: usize) -> bool {
        let (word, mask) = self.locate(index);
        self.as_words()[word] & mask != 0
    }

    #[inline]
    pub fn set(&mut self, index: usize) {
        let (word, mask) = self.locate(index);
        self.as_words_mut()[word] |= mask;
    }

    #[inline]
    pub fn reset(&mut self, index: usize) {
        let (word, mask) = self.locate(index);
        self.as_words_mut()[word] &= !mask;
    }

    pub fn zero_all(&mut self) {
        self.as_words_mut().fill(0);
    }

    /// Number of set bits.
    pub fn count_set(&self) -> usize {
        self.as_words()
            .iter()
            .map(|word| word.count_ones() as usize)
            .sum()
    }
}

impl std::fmt::Debug for LockBitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockBitmap")
            .field("bits", &self.bits)
            .field("set", &self.count_set())
            .finish()
    }
}

// SAFETY: the words are owned by the arena that travels with the bitmap.
unsafe impl Send for LockBitmap {}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_bitmap(words: &mut [u32], bits: usize, f: impl FnOnce(&mut LockBitmap)) {
        let ptr = NonNull::new(words.as_mut_ptr()).unwrap();
        // SAFETY: `words` outlives the bitmap built here.
        let mut bitmap = unsafe { LockBitmap::from_raw(ptr, words.len(), bits) };
        f(&mut bitmap);
    }

    #[test]
    fn set_get_reset() {
        let mut words = [0u32; 2];
        with_bitmap(&mut words, 40, |bitmap| {
            bitmap.set(0);
            bitmap.set(31);
            bitmap.set(39);
            assert!(bitmap.get(0) && bitmap.get(31) && bitmap.get(39));
            assert!(!bitmap.get(1) && !bitmap.get(32));
            assert_eq!(bitmap.count_set(), 3);

            bitmap.reset(31);
            assert!(!bitmap.get(31));
            assert_eq!(bitmap.count_set(), 2);
        });
        assert_eq!(words, [1, 1 << 7]);
    }

    #[test]
    fn zero_all_clears_stale_contents() {
        let mut words = [u32::MAX; 3];
        with_bitmap(&mut words, 70, |bitmap| {
            assert!(bitmap.get(69));
            bitmap.zero_all();
            assert_eq!(bitmap.count_set(), 0);
            assert!((0..70).all(|i| !bitmap.get(i)));
        });
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn rejects_index_past_len() {
        let mut words = [0u32; 1];
        with_bitmap(&mut words, 4, |bitmap| {
            bitmap.get(4);
        });
    }
}
