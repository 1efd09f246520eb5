//! Subscripting: view extraction and scatter writes.
//!
//! Every subscript entry is an [`IndexElem`], a `(start, end, stride)` triple:
//! - `stride == None` with a `start`: a single index that drops the axis
//! - `stride == None` without a `start`: the whole axis, passed through
//! - `stride == Some(s)`: the half-open range `[start, end)` stepped by `s`
//!
//! Negative `start`/`end` count from the end of the axis. With a negative
//! step the range is walked from `end - 1` down to `start`.
//!
//! The [`s!`](crate::s) macro builds a subscript list from integers and
//! ranges, with `;step` after a range to set its stride:
//!
//! ```rust
//! use strided_ndarray::{s, NDArray};
//!
//! let a = NDArray::range(7);
//! assert_eq!(a.get(s![..6;-2]).elements(), vec![5.0, 3.0, 1.0]);
//! ```

use std::ops::{Range, RangeFrom, RangeFull, RangeInclusive, RangeTo, RangeToInclusive};

use crate::array::NDArray;
use crate::buffer::Buffer;
use crate::dispatch;
use crate::layout::normalize_index;
use crate::provider::provider;

/// One subscript entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexElem {
    start: Option<isize>,
    end: Option<isize>,
    stride: Option<isize>,
}

impl IndexElem {
    /// Pass the axis through unchanged.
    pub const FULL: IndexElem = IndexElem {
        start: None,
        end: None,
        stride: None,
    };

    /// Select one position and drop the axis.
    pub const fn single(index: isize) -> Self {
        IndexElem {
            start: Some(index),
            end: None,
            stride: None,
        }
    }

    /// Half-open range with a step.
    ///
    /// # Panics
    /// Panics if `stride == 0`, or if both bounds are given, `start > end`,
    /// and `end` is not a from-the-end index.
    pub fn range(start: Option<isize>, end: Option<isize>, stride: isize) -> Self {
        assert!(stride != 0, "range stride must be nonzero");
        if let (Some(s), Some(e)) = (start, end) {
            assert!(
                (e < 0 && s >= 0) || s <= e,
                "invalid range {}..{}",
                s,
                e
            );
        }
        IndexElem {
            start,
            end,
            stride: Some(stride),
        }
    }

    /// Same range with step `stride`.
    ///
    /// # Panics
    /// Panics on a single index or a zero stride.
    pub fn step(self, stride: isize) -> Self {
        assert!(
            !(self.stride.is_none() && self.start.is_some()),
            "cannot step a single index"
        );
        IndexElem::range(self.start, self.end, stride)
    }

    #[inline]
    pub fn start(&self) -> Option<isize> {
        self.start
    }

    #[inline]
    pub fn end(&self) -> Option<isize> {
        self.end
    }

    #[inline]
    pub fn stride(&self) -> Option<isize> {
        self.stride
    }
}

impl From<isize> for IndexElem {
    fn from(index: isize) -> Self {
        IndexElem::single(index)
    }
}

impl From<RangeFull> for IndexElem {
    fn from(_: RangeFull) -> Self {
        IndexElem::FULL
    }
}

impl From<Range<isize>> for IndexElem {
    fn from(r: Range<isize>) -> Self {
        IndexElem::range(Some(r.start), Some(r.end), 1)
    }
}

impl From<RangeFrom<isize>> for IndexElem {
    fn from(r: RangeFrom<isize>) -> Self {
        IndexElem::range(Some(r.start), None, 1)
    }
}

impl From<RangeTo<isize>> for IndexElem {
    fn from(r: RangeTo<isize>) -> Self {
        IndexElem::range(None, Some(r.end), 1)
    }
}

impl From<RangeInclusive<isize>> for IndexElem {
    fn from(r: RangeInclusive<isize>) -> Self {
        IndexElem::range(Some(*r.start()), Some(*r.end() + 1), 1)
    }
}

impl From<RangeToInclusive<isize>> for IndexElem {
    fn from(r: RangeToInclusive<isize>) -> Self {
        IndexElem::range(None, Some(r.end + 1), 1)
    }
}

/// Build a subscript list (`&[IndexElem; N]`, which coerces to `&[IndexElem]`).
///
/// Entries are integers (single index), ranges, or `..` (whole axis). A range
/// may be followed by `;step`.
///
/// ```rust
/// use strided_ndarray::{s, IndexElem};
///
/// let idx = s![1, .., 0..4;2];
/// assert_eq!(idx[0], IndexElem::single(1));
/// assert_eq!(idx[1], IndexElem::FULL);
/// assert_eq!(idx[2], IndexElem::range(Some(0), Some(4), 2));
/// ```
#[macro_export]
macro_rules! s {
    ($($e:expr $(; $step:expr)?),* $(,)?) => {
        &[$($crate::IndexElem::from($e)$(.step($step))?),*]
    };
}

/// Layout selected by a subscript list.
struct Selection {
    shape: Vec<usize>,
    strides: Vec<isize>,
    offset: usize,
}

fn select(shape: &[usize], strides: &[isize], offset: usize, indices: &[IndexElem]) -> Selection {
    assert!(
        indices.len() <= shape.len(),
        "too many indices ({}) for array of shape {:?}",
        indices.len(),
        shape
    );
    let mut out_shape = Vec::with_capacity(shape.len());
    let mut out_strides = Vec::with_capacity(shape.len());
    let mut offset = offset as isize;

    for (i, ie) in indices.iter().enumerate() {
        let n = shape[i] as isize;
        let Some(step) = ie.stride else {
            match ie.start {
                None => {
                    out_shape.push(shape[i]);
                    out_strides.push(strides[i]);
                }
                Some(k) => {
                    let k = normalize_index(k, shape[i]);
                    offset += k as isize * strides[i];
                }
            }
            continue;
        };

        let mut start = ie.start.unwrap_or(0);
        if start < 0 {
            start += n;
        }
        let mut end = ie.end.unwrap_or(n);
        if end < 0 {
            end += n;
        }
        assert!(
            0 <= start && start <= n && 0 <= end && end <= n,
            "range {:?}..{:?} out of bounds for axis {} of size {}",
            ie.start,
            ie.end,
            i,
            n
        );
        let len = (end - start).max(0);
        let size = (len + step.abs() - 1) / step.abs();
        out_shape.push(size as usize);
        out_strides.push(step * strides[i]);
        if size > 0 {
            let first = if step > 0 { start } else { end - 1 };
            offset += first * strides[i];
        }
    }

    out_shape.extend_from_slice(&shape[indices.len()..]);
    out_strides.extend_from_slice(&strides[indices.len()..]);

    Selection {
        shape: out_shape,
        strides: out_strides,
        offset: offset as usize,
    }
}

impl NDArray {
    /// View selected by `indices`; axes past `indices.len()` pass through.
    ///
    /// # Panics
    /// Panics on too many indices or an index out of range.
    pub fn get(&self, indices: &[IndexElem]) -> NDArray {
        let sel = select(self.shape(), self.strides(), self.base_offset(), indices);
        NDArray::with_layout(sel.shape, sel.strides, sel.offset, self.buffer().clone())
    }

    /// Overwrite the positions selected by `indices` with `value`, broadcast
    /// to the selection's shape.
    ///
    /// `self` is first made contiguous and sole owner of its buffer, so no
    /// other array observes the write.
    ///
    /// # Panics
    /// Panics on bad indices or if `value` cannot broadcast to the selection.
    pub fn set(&mut self, indices: &[IndexElem], value: &NDArray) {
        self.make_unique_contiguous();
        let sel = select(self.shape(), self.strides(), self.base_offset(), indices);
        let src = value.broadcast_to(&sel.shape);
        let buffer = self.buffer_mut().as_mut_slice();
        dispatch::scatter(provider(), buffer, &sel.shape, &sel.strides, sel.offset, &src);
    }

    /// [`set`](Self::set) with a scalar right-hand side.
    pub fn set_scalar(&mut self, indices: &[IndexElem], value: f32) {
        self.set(indices, &NDArray::scalar(value));
    }

    /// Turn `self` into a canonical layout over a buffer nobody else holds.
    fn make_unique_contiguous(&mut self) {
        let spans_buffer =
            self.is_contiguous() && self.base_offset() == 0 && self.volume() == self.buffer().len();
        if spans_buffer {
            self.buffer_mut().ensure_uniquely_owned();
            return;
        }
        let data: Buffer = dispatch::gather_buffer(provider(), self, true);
        *self = NDArray::from_buffer(self.shape(), data);
    }
}
