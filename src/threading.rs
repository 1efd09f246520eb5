//! Fork-join execution for bulk passes.
//!
//! Work is described as a count of independent items (major offsets of a
//! block plan). When the pass is large enough, the items are cut into one
//! contiguous chunk per worker of a process-wide rayon pool and the caller
//! blocks until every chunk is done. Each chunk writes a statically assigned
//! destination range, so output placement does not depend on completion order.

#[cfg(feature = "parallel")]
use std::sync::OnceLock;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::MIN_PARALLEL_LEN;

/// A raw pointer wrapper that is `Send` + `Sync`.
///
/// # Safety
/// Whoever dereferences it must guarantee that the pointee outlives the
/// parallel section and that different workers touch disjoint positions.
pub(crate) struct SendPtr<T>(pub(crate) *mut T);

impl<T> Clone for SendPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SendPtr<T> {}

unsafe impl<T> Send for SendPtr<T> {}
unsafe impl<T> Sync for SendPtr<T> {}

impl<T> SendPtr<T> {
    #[inline]
    pub(crate) fn as_ptr(self) -> *mut T {
        self.0
    }
}

/// Worker pool sized by rayon's defaults (`RAYON_NUM_THREADS` or the number
/// of logical CPUs). Built on first use; `None` if the OS refused threads.
#[cfg(feature = "parallel")]
fn pool() -> Option<&'static rayon::ThreadPool> {
    static POOL: OnceLock<Option<rayon::ThreadPool>> = OnceLock::new();
    POOL.get_or_init(|| {
        match rayon::ThreadPoolBuilder::new()
            .thread_name(|i| format!("ndarray-worker-{i}"))
            .build()
        {
            Ok(pool) => {
                tracing::debug!(threads = pool.current_num_threads(), "worker pool created");
                Some(pool)
            }
            Err(err) => {
                tracing::warn!(%err, "worker pool unavailable, running on the calling thread");
                None
            }
        }
    })
    .as_ref()
}

/// Number of workers a parallel pass is split across.
pub fn num_workers() -> usize {
    #[cfg(feature = "parallel")]
    {
        pool().map_or(1, |p| p.current_num_threads())
    }
    #[cfg(not(feature = "parallel"))]
    {
        1
    }
}

/// Contiguous chunks `(start, len)` covering `0..count`, at most `parts` of them.
pub(crate) fn chunk_ranges(count: usize, parts: usize) -> Vec<(usize, usize)> {
    if count == 0 {
        return Vec::new();
    }
    let parts = parts.clamp(1, count);
    let chunk = count.div_ceil(parts);
    (0..count)
        .step_by(chunk)
        .map(|start| (start, chunk.min(count - start)))
        .collect()
}

/// Run `f(start, len)` over contiguous chunks of `0..count`.
///
/// `elements` is the total number of scalars the pass touches; below
/// [`MIN_PARALLEL_LEN`] (or without the `parallel` feature) the whole range is
/// handed to `f` on the calling thread.
pub(crate) fn for_each_chunk<F>(count: usize, elements: usize, f: F)
where
    F: Fn(usize, usize) + Sync,
{
    if count == 0 {
        return;
    }
    #[cfg(feature = "parallel")]
    if elements >= MIN_PARALLEL_LEN && count > 1 {
        if let Some(pool) = pool() {
            let workers = pool.current_num_threads();
            if workers > 1 {
                let chunks = chunk_ranges(count, workers);
                pool.install(|| {
                    chunks
                        .par_iter()
                        .for_each(|&(start, len)| f(start, len));
                });
                return;
            }
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = (elements, MIN_PARALLEL_LEN);
    f(0, count);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_chunk_ranges_cover_everything() {
        assert_eq!(chunk_ranges(10, 3), vec![(0, 4), (4, 4), (8, 2)]);
        assert_eq!(chunk_ranges(2, 8), vec![(0, 1), (1, 1)]);
        assert_eq!(chunk_ranges(5, 1), vec![(0, 5)]);
        assert!(chunk_ranges(0, 4).is_empty());
    }

    #[test]
    fn test_small_pass_runs_once() {
        let calls = AtomicUsize::new(0);
        for_each_chunk(100, 100, |start, len| {
            assert_eq!((start, len), (0, 100));
            calls.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_large_pass_covers_all_items() {
        let covered = AtomicUsize::new(0);
        let count = 1000;
        for_each_chunk(count, MIN_PARALLEL_LEN * 4, |_start, len| {
            covered.fetch_add(len, Ordering::SeqCst);
        });
        assert_eq!(covered.load(Ordering::SeqCst), count);
    }

    #[test]
    fn test_disjoint_writes_through_send_ptr() {
        let mut out = vec![0usize; 4096];
        let ptr = SendPtr(out.as_mut_ptr());
        for_each_chunk(out.len(), MIN_PARALLEL_LEN, |start, len| {
            let p = ptr;
            for i in start..start + len {
                // SAFETY: chunks are disjoint and `out` outlives the pass.
                unsafe { *p.as_ptr().add(i) = i };
            }
        });
        assert!(out.iter().enumerate().all(|(i, &v)| i == v));
    }

    #[test]
    fn test_num_workers_positive() {
        assert!(num_workers() >= 1);
    }
}
