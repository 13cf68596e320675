//! Parallel processing utilities.
//!
//! Splits a mutable slice into a handful of contiguous chunks per rayon thread
//! and hands each chunk to the worker together with the index of its first
//! element (or first unit, for unit-aligned splitting). Workers never share
//! output memory, so results do not depend on scheduling.

use rayon::prelude::*;

#[cfg(test)]
mod tests;

/// Multiplier for number of chunks relative to CPU threads.
/// Using 3x threads provides good load balancing when some chunks finish faster.
const CHUNKS_PER_THREAD: usize = 3;

/// Number of units each chunk should hold so that `len` units are spread over
/// `CHUNKS_PER_THREAD` chunks per thread.
#[inline]
pub fn auto_chunk_size(len: usize) -> usize {
    let num_chunks = rayon::current_num_threads() * CHUNKS_PER_THREAD;
    (len / num_chunks).max(1)
}

/// Extension trait for automatically sized parallel chunking of mutable slices.
pub trait ParChunksMutAuto<T: Send> {
    /// Element-wise chunking. Yields `(offset, chunk)` where `offset` is the
    /// index of `chunk[0]` in the whole slice.
    fn par_chunks_mut_auto<'a>(
        &'a mut self,
    ) -> impl IndexedParallelIterator<Item = (usize, &'a mut [T])>
    where
        T: 'a;

    /// Chunking aligned to units of `unit_len` elements (rows of an image,
    /// planes of a volume). Yields `(first_unit, chunk)` where `chunk` holds a
    /// whole number of units.
    ///
    /// # Panics
    ///
    /// Panics if `unit_len` is 0 or does not divide the slice length.
    fn par_units_mut_auto<'a>(
        &'a mut self,
        unit_len: usize,
    ) -> impl IndexedParallelIterator<Item = (usize, &'a mut [T])>
    where
        T: 'a;
}

impl<T: Send> ParChunksMutAuto<T> for [T] {
    fn par_chunks_mut_auto<'a>(
        &'a mut self,
    ) -> impl IndexedParallelIterator<Item = (usize, &'a mut [T])>
    where
        T: 'a,
    {
        let chunk_len = auto_chunk_size(self.len());
        self.par_chunks_mut(chunk_len)
            .enumerate()
            .map(move |(idx, chunk)| (idx * chunk_len, chunk))
    }

    fn par_units_mut_auto<'a>(
        &'a mut self,
        unit_len: usize,
    ) -> impl IndexedParallelIterator<Item = (usize, &'a mut [T])>
    where
        T: 'a,
    {
        assert!(unit_len > 0, "unit_len must be > 0");
        assert_eq!(
            self.len() % unit_len,
            0,
            "slice length {} is not a multiple of unit_len {}",
            self.len(),
            unit_len
        );
        let units = self.len() / unit_len;
        let units_per_chunk = auto_chunk_size(units);
        self.par_chunks_mut(unit_len * units_per_chunk)
            .enumerate()
            .map(move |(idx, chunk)| (idx * units_per_chunk, chunk))
    }
}
