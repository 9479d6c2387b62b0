//! Input history carried across chunk boundaries
//!
//! The buffer holds `keep` retained samples followed by the samples of the
//! chunk being processed. Positions are addressed relative to the first
//! sample of the current chunk, so retained samples have negative indices.

use crate::sample::Sample;

#[derive(Debug, Clone)]
pub(crate) struct History<T> {
    buf: Vec<T>,
    keep: usize,
}

impl<T: Sample> History<T> {
    /// Empty history of `keep` zero samples
    pub fn new(keep: usize) -> Self {
        Self {
            buf: vec![T::default(); keep],
            keep,
        }
    }

    /// Append a chunk after the retained samples
    pub fn append(&mut self, chunk: &[T]) {
        debug_assert_eq!(self.buf.len(), self.keep, "append before commit");
        self.buf.extend_from_slice(chunk);
    }

    /// `len` consecutive samples ending at chunk position `newest`, oldest
    /// first. `newest` may be negative down to `len - keep - 1`.
    #[inline]
    pub fn window(&self, newest: isize, len: usize) -> &[T] {
        let end = self.keep as isize + newest + 1;
        let start = end - len as isize;
        assert!(
            start >= 0 && end as usize <= self.buf.len(),
            "window [{}, {}) outside history of {}",
            start,
            end,
            self.buf.len()
        );
        &self.buf[start as usize..end as usize]
    }

    /// Drop everything but the newest `keep` samples
    pub fn commit(&mut self) {
        let excess = self.buf.len() - self.keep;
        if excess > 0 {
            self.buf.drain(..excess);
        }
    }

    /// Zero the retained samples
    pub fn clear(&mut self) {
        self.buf.clear();
        self.buf.resize(self.keep, T::default());
    }
}
