//! Offset sequences over strided layouts.
//!
//! An odometer walks a logical shape in row-major order (last axis fastest)
//! and keeps a running linear offset per operand. A step without carry costs
//! one addition per operand; a carry rewinds the finished axis and moves on
//! to the next slower one.

use smallvec::SmallVec;

use crate::layout::volume;

/// Stack-allocated Vec for per-axis state. 8 covers nearly all practical ranks.
type SVec<T> = SmallVec<[T; 8]>;

/// Odometer over `shape` carrying `N` independent stride vectors.
#[derive(Clone, Debug)]
pub struct MultiOffsetIter<const N: usize> {
    shape: SVec<usize>,
    strides: [SVec<isize>; N],
    index: SVec<usize>,
    offsets: [isize; N],
    remaining: usize,
    started: bool,
}

impl<const N: usize> MultiOffsetIter<N> {
    /// Walk the whole of `shape`.
    pub fn new(shape: &[usize], strides: [&[isize]; N]) -> Self {
        Self::with_range(shape, strides, 0, volume(shape))
    }

    /// Walk `len` positions of `shape`, starting at row-major position `start`.
    ///
    /// Used to hand disjoint pieces of one sequence to separate workers.
    pub fn with_range(shape: &[usize], strides: [&[isize]; N], start: usize, len: usize) -> Self {
        for s in strides.iter() {
            assert_eq!(
                shape.len(),
                s.len(),
                "shape {:?} and strides {:?} differ in rank",
                shape,
                s
            );
        }
        let total = volume(shape);
        assert!(
            start + len <= total,
            "offset range {}..{} exceeds volume {}",
            start,
            start + len,
            total
        );

        let mut index: SVec<usize> = SmallVec::from_elem(0, shape.len());
        if total > 0 {
            let mut rest = start;
            for (i, &n) in shape.iter().enumerate().rev() {
                index[i] = rest % n;
                rest /= n;
            }
        }
        let offsets: [isize; N] = std::array::from_fn(|k| {
            strides[k]
                .iter()
                .zip(index.iter())
                .map(|(&s, &i)| s * i as isize)
                .sum::<isize>()
        });
        let strides: [SVec<isize>; N] =
            std::array::from_fn(|k| strides[k].iter().copied().collect());

        Self {
            shape: shape.iter().copied().collect(),
            strides,
            index,
            offsets,
            remaining: len,
            started: false,
        }
    }

    #[inline]
    fn advance(&mut self) {
        for axis in (0..self.shape.len()).rev() {
            self.index[axis] += 1;
            if self.index[axis] < self.shape[axis] {
                for k in 0..N {
                    self.offsets[k] += self.strides[k][axis];
                }
                return;
            }
            let rewind = self.shape[axis] as isize - 1;
            for k in 0..N {
                self.offsets[k] -= self.strides[k][axis] * rewind;
            }
            self.index[axis] = 0;
        }
    }
}

impl<const N: usize> Iterator for MultiOffsetIter<N> {
    type Item = [isize; N];

    #[inline]
    fn next(&mut self) -> Option<[isize; N]> {
        if self.remaining == 0 {
            return None;
        }
        if self.started {
            self.advance();
        } else {
            self.started = true;
        }
        self.remaining -= 1;
        Some(self.offsets)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<const N: usize> ExactSizeIterator for MultiOffsetIter<N> {}

/// Linear offsets of every element of a single strided layout.
#[derive(Clone, Debug)]
pub struct OffsetIter(MultiOffsetIter<1>);

impl OffsetIter {
    pub fn new(shape: &[usize], strides: &[isize]) -> Self {
        Self(MultiOffsetIter::new(shape, [strides]))
    }

    pub fn with_range(shape: &[usize], strides: &[isize], start: usize, len: usize) -> Self {
        Self(MultiOffsetIter::with_range(shape, [strides], start, len))
    }
}

impl Iterator for OffsetIter {
    type Item = isize;

    #[inline]
    fn next(&mut self) -> Option<isize> {
        self.0.next().map(|[o]| o)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl ExactSizeIterator for OffsetIter {}

/// Offsets of two layouts over the same shape, advanced in lockstep.
#[derive(Clone, Debug)]
pub struct PairedOffsetIter(MultiOffsetIter<2>);

impl PairedOffsetIter {
    pub fn new(shape: &[usize], lhs: &[isize], rhs: &[isize]) -> Self {
        Self(MultiOffsetIter::new(shape, [lhs, rhs]))
    }

    pub fn with_range(
        shape: &[usize],
        lhs: &[isize],
        rhs: &[isize],
        start: usize,
        len: usize,
    ) -> Self {
        Self(MultiOffsetIter::with_range(shape, [lhs, rhs], start, len))
    }
}

impl Iterator for PairedOffsetIter {
    type Item = (isize, isize);

    #[inline]
    fn next(&mut self) -> Option<(isize, isize)> {
        self.0.next().map(|[a, b]| (a, b))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl ExactSizeIterator for PairedOffsetIter {}

/// Offsets of `strides` over `shape`, in row-major order.
pub fn offsets(shape: &[usize], strides: &[isize]) -> OffsetIter {
    OffsetIter::new(shape, strides)
}

/// Paired offsets of two stride vectors over the same `shape`.
pub fn paired_offsets(shape: &[usize], lhs: &[isize], rhs: &[isize]) -> PairedOffsetIter {
    PairedOffsetIter::new(shape, lhs, rhs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{contiguous_strides, index_offset};

    fn reference(shape: &[usize], strides: &[isize]) -> Vec<isize> {
        let mut out = Vec::new();
        let total = volume(shape);
        for linear in 0..total {
            let mut idx = vec![0; shape.len()];
            let mut rest = linear;
            for i in (0..shape.len()).rev() {
                idx[i] = rest % shape[i];
                rest /= shape[i];
            }
            out.push(index_offset(strides, &idx));
        }
        out
    }

    #[test]
    fn test_contiguous_offsets_count_up() {
        let shape = [2, 3, 4];
        let got: Vec<_> = offsets(&shape, &contiguous_strides(&shape)).collect();
        assert_eq!(got, (0..24).collect::<Vec<isize>>());
    }

    #[test]
    fn test_rank_zero_yields_one() {
        let got: Vec<_> = offsets(&[], &[]).collect();
        assert_eq!(got, vec![0]);
    }

    #[test]
    fn test_zero_dim_yields_nothing() {
        assert_eq!(offsets(&[3, 0, 2], &[2, 2, 1]).count(), 0);
        assert_eq!(offsets(&[0], &[1]).len(), 0);
    }

    #[test]
    fn test_matches_dot_product() {
        let cases: [(&[usize], &[isize]); 4] = [
            (&[3, 2], &[1, 3]),
            (&[2, 3], &[-3, 1]),
            (&[4, 3], &[0, 1]),
            (&[2, 2, 3], &[7, -3, 2]),
        ];
        for (shape, strides) in cases {
            let got: Vec<_> = offsets(shape, strides).collect();
            assert_eq!(got, reference(shape, strides), "shape {:?}", shape);
        }
    }

    #[test]
    fn test_paired_lockstep() {
        let shape = [2, 3];
        let got: Vec<_> = paired_offsets(&shape, &[3, 1], &[1, 2]).collect();
        assert_eq!(
            got,
            vec![(0, 0), (1, 2), (2, 4), (3, 1), (4, 3), (5, 5)]
        );
    }

    #[test]
    fn test_with_range_resumes_mid_sequence() {
        let shape = [3, 4];
        let strides = [1isize, 3];
        let full: Vec<_> = offsets(&shape, &strides).collect();
        let tail: Vec<_> = OffsetIter::with_range(&shape, &strides, 5, 6).collect();
        assert_eq!(tail, full[5..11].to_vec());
    }

    #[test]
    fn test_independent_iterators() {
        let shape = [2, 2];
        let strides = [2isize, 1];
        let mut a = offsets(&shape, &strides);
        a.next();
        let b: Vec<_> = offsets(&shape, &strides).collect();
        assert_eq!(b, vec![0, 1, 2, 3]);
        assert_eq!(a.collect::<Vec<_>>(), vec![1, 2, 3]);
    }
}
