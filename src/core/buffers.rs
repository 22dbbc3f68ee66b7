// src/core/buffers.rs

//! Scratch amplitude buffers recycled across allocate/deallocate and kernel
//! calls so that exponentially large vectors are not reallocated per call.

use num_complex::Complex64;
use num_traits::Zero;
use rayon::prelude::*;
use std::mem;

use super::constants::PARALLEL_MIN_LEN;

/// Two retained scratch vectors.
///
/// `primary` always has at least the capacity of `secondary`. Contents are
/// garbage: every `take_*` overwrites the returned buffer before handing it out.
#[derive(Debug, Default)]
pub(crate) struct BufferPool {
    primary: Vec<Complex64>,
    secondary: Vec<Complex64>,
}

impl BufferPool {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Hands out an empty buffer able to hold `len` amplitudes, preferring the
    /// smallest retained buffer that fits.
    pub(crate) fn take(&mut self, len: usize) -> Vec<Complex64> {
        let mut buf = if self.secondary.capacity() >= len {
            mem::take(&mut self.secondary)
        } else if self.primary.capacity() >= len {
            let buf = mem::take(&mut self.primary);
            mem::swap(&mut self.primary, &mut self.secondary);
            buf
        } else {
            Vec::with_capacity(len)
        };
        buf.clear();
        buf
    }

    /// A buffer of `len` zeros.
    pub(crate) fn take_zeroed(&mut self, len: usize) -> Vec<Complex64> {
        let mut buf = self.take(len);
        buf.resize(len, Complex64::zero());
        buf
    }

    /// A buffer holding a copy of `src`.
    pub(crate) fn take_copy(&mut self, src: &[Complex64]) -> Vec<Complex64> {
        self.take_padded(src, src.len())
    }

    /// A buffer of length `len` starting with a copy of `src`, zero-padded.
    pub(crate) fn take_padded(&mut self, src: &[Complex64], len: usize) -> Vec<Complex64> {
        debug_assert!(src.len() <= len);
        let mut buf = self.take(len);
        buf.extend_from_slice(src);
        buf.resize(len, Complex64::zero());
        buf
    }

    /// Returns a buffer to the pool. The two largest buffers are retained and
    /// the smallest of the three candidates is dropped.
    pub(crate) fn recycle(&mut self, mut buf: Vec<Complex64>) {
        if buf.capacity() > self.primary.capacity() {
            mem::swap(&mut buf, &mut self.primary);
        }
        if buf.capacity() > self.secondary.capacity() {
            mem::swap(&mut buf, &mut self.secondary);
        }
    }

    /// Capacity currently retained by the pool.
    pub(crate) fn retained_capacity(&self) -> usize {
        self.primary.capacity() + self.secondary.capacity()
    }
}

/// Copies `src` into `dst` element-wise, in parallel for long vectors.
pub(crate) fn copy_amplitudes(dst: &mut [Complex64], src: &[Complex64]) {
    debug_assert_eq!(dst.len(), src.len());
    if dst.len() >= PARALLEL_MIN_LEN {
        dst.par_iter_mut().zip(src.par_iter()).for_each(|(d, s)| *d = *s);
    } else {
        dst.copy_from_slice(src);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_retained_capacity() {
        let mut pool = BufferPool::new();
        let buf = pool.take_zeroed(16);
        let ptr = buf.as_ptr();
        pool.recycle(buf);

        let again = pool.take_zeroed(8);
        assert_eq!(again.as_ptr(), ptr, "a large enough retained buffer must be reused");
        assert_eq!(again.len(), 8);
        assert!(again.iter().all(|a| a.is_zero()));
    }

    #[test]
    fn keeps_two_largest() {
        let mut pool = BufferPool::new();
        pool.recycle(Vec::with_capacity(4));
        pool.recycle(Vec::with_capacity(16));
        pool.recycle(Vec::with_capacity(8));
        assert_eq!(pool.primary.capacity(), 16);
        assert_eq!(pool.secondary.capacity(), 8);
        assert_eq!(pool.retained_capacity(), 24);
    }

    #[test]
    fn prefers_smallest_fitting_buffer() {
        let mut pool = BufferPool::new();
        pool.recycle(Vec::with_capacity(32));
        pool.recycle(Vec::with_capacity(8));

        let small = pool.take_copy(&[Complex64::new(1.0, 0.0); 4]);
        assert_eq!(small.capacity(), 8);
        let large = pool.take_zeroed(20);
        assert_eq!(large.capacity(), 32);
        assert_eq!(pool.retained_capacity(), 0);
    }
}
