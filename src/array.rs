//! The [`NDArray`] value type.

use std::fmt;

use crate::buffer::Buffer;
use crate::dispatch;
use crate::index::IndexElem;
use crate::iter::offsets;
use crate::layout::{contiguous_strides, index_offset, is_contiguous, normalize_index, offset_bounds, volume};
use crate::provider::provider;

/// Strided view `(shape, strides, base_offset)` over a copy-on-write [`Buffer`].
///
/// Element `idx` lives at `base_offset + sum(idx[i] * strides[i])`. Strides may
/// be zero (broadcast axis) or negative (reversed axis). Cloning is cheap and
/// shares the buffer.
#[derive(Clone)]
pub struct NDArray {
    shape: Vec<usize>,
    strides: Vec<isize>,
    base_offset: usize,
    buffer: Buffer,
}

impl NDArray {
    /// Array of `shape` holding `elements` in row-major order.
    ///
    /// # Panics
    /// Panics if `elements.len()` differs from the volume of `shape`.
    pub fn new(shape: &[usize], elements: Vec<f32>) -> Self {
        assert_eq!(
            volume(shape),
            elements.len(),
            "shape {:?} needs {} elements, got {}",
            shape,
            volume(shape),
            elements.len()
        );
        Self::from_buffer(shape, Buffer::from_vec(elements))
    }

    /// Rank-1 array.
    pub fn from_vec(elements: Vec<f32>) -> Self {
        let n = elements.len();
        Self::new(&[n], elements)
    }

    /// Rank-0 array holding `value`.
    pub fn scalar(value: f32) -> Self {
        Self::new(&[], vec![value])
    }

    /// Array over an explicit layout.
    ///
    /// # Panics
    /// Panics if the ranks differ or any reachable offset falls outside `buffer`.
    pub fn from_parts(shape: &[usize], strides: &[isize], base_offset: usize, buffer: Buffer) -> Self {
        assert_eq!(
            shape.len(),
            strides.len(),
            "shape {:?} and strides {:?} differ in rank",
            shape,
            strides
        );
        if let Some((lo, hi)) = offset_bounds(shape, strides, base_offset as isize) {
            assert!(
                lo >= 0 && (hi as usize) < buffer.len(),
                "layout shape={:?} strides={:?} offset={} reaches {}..={} outside buffer of {}",
                shape,
                strides,
                base_offset,
                lo,
                hi,
                buffer.len()
            );
        }
        Self::with_layout(shape.to_vec(), strides.to_vec(), base_offset, buffer)
    }

    /// Contiguous row-major array over `buffer`.
    pub(crate) fn from_buffer(shape: &[usize], buffer: Buffer) -> Self {
        debug_assert_eq!(volume(shape), buffer.len());
        Self::with_layout(shape.to_vec(), contiguous_strides(shape), 0, buffer)
    }

    /// Layout constructor for callers that already guarantee the bounds.
    pub(crate) fn with_layout(
        shape: Vec<usize>,
        strides: Vec<isize>,
        base_offset: usize,
        buffer: Buffer,
    ) -> Self {
        debug_assert_eq!(shape.len(), strides.len());
        Self {
            shape,
            strides,
            base_offset,
            buffer,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    #[inline]
    pub fn base_offset(&self) -> usize {
        self.base_offset
    }

    #[inline]
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    #[inline]
    pub fn volume(&self) -> usize {
        volume(&self.shape)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.volume() == 0
    }

    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    /// True when the strides are canonical row-major for the shape.
    #[inline]
    pub fn is_contiguous(&self) -> bool {
        is_contiguous(&self.shape, &self.strides)
    }

    /// True when both arrays read from the same buffer.
    pub fn shares_buffer_with(&self, other: &NDArray) -> bool {
        self.buffer.ptr_eq(&other.buffer)
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut Buffer {
        &mut self.buffer
    }

    /// The single element of a rank-0 array.
    ///
    /// # Panics
    /// Panics if the array is not rank 0.
    pub fn as_scalar(&self) -> f32 {
        assert!(
            self.is_scalar(),
            "array of shape {:?} is not a scalar",
            self.shape
        );
        self.buffer.read(self.base_offset)
    }

    /// Element at a multi-index; negative entries count from the end.
    ///
    /// # Panics
    /// Panics if the index rank differs from `ndim` or an entry is out of range.
    pub fn element(&self, index: &[isize]) -> f32 {
        assert_eq!(
            index.len(),
            self.ndim(),
            "index {:?} does not match shape {:?}",
            index,
            self.shape
        );
        let idx: Vec<usize> = index
            .iter()
            .zip(&self.shape)
            .map(|(&i, &n)| normalize_index(i, n))
            .collect();
        let offset = self.base_offset as isize + index_offset(&self.strides, &idx);
        self.buffer.read(offset as usize)
    }

    /// Elements in row-major order.
    pub fn elements(&self) -> Vec<f32> {
        dispatch::gather(provider(), self)
    }

    /// Canonical contiguous array with the same elements.
    ///
    /// Returns a clone sharing the buffer when the layout is already
    /// contiguous and spans the whole buffer.
    pub fn as_contiguous(&self) -> NDArray {
        NDArray::from_buffer(&self.shape, dispatch::gather_buffer(provider(), self, false))
    }

    /// Subarrays along axis 0.
    ///
    /// # Panics
    /// Panics on a rank-0 array.
    pub fn rows(&self) -> Rows<'_> {
        assert!(self.ndim() > 0, "cannot iterate over a rank-0 array");
        Rows {
            array: self,
            next: 0,
            end: self.shape[0],
        }
    }
}

// ============================================================================
// Row iteration
// ============================================================================

/// Iterator over the subarrays of an [`NDArray`] along axis 0.
pub struct Rows<'a> {
    array: &'a NDArray,
    next: usize,
    end: usize,
}

impl Iterator for Rows<'_> {
    type Item = NDArray;

    fn next(&mut self) -> Option<NDArray> {
        if self.next >= self.end {
            return None;
        }
        let row = self.array.get(&[IndexElem::single(self.next as isize)]);
        self.next += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.end - self.next;
        (n, Some(n))
    }
}

impl DoubleEndedIterator for Rows<'_> {
    fn next_back(&mut self) -> Option<NDArray> {
        if self.next >= self.end {
            return None;
        }
        self.end -= 1;
        Some(self.array.get(&[IndexElem::single(self.end as isize)]))
    }
}

impl ExactSizeIterator for Rows<'_> {}

impl<'a> IntoIterator for &'a NDArray {
    type Item = NDArray;
    type IntoIter = Rows<'a>;

    fn into_iter(self) -> Rows<'a> {
        self.rows()
    }
}

// ============================================================================
// Equality and formatting
// ============================================================================

impl PartialEq for NDArray {
    /// Structural equality: same shape and same elements in row-major order.
    fn eq(&self, other: &NDArray) -> bool {
        self.shape == other.shape && self.elements() == other.elements()
    }
}

impl From<f32> for NDArray {
    fn from(value: f32) -> Self {
        NDArray::scalar(value)
    }
}

impl From<Vec<f32>> for NDArray {
    fn from(elements: Vec<f32>) -> Self {
        NDArray::from_vec(elements)
    }
}

/// Elements shown by `Debug` before the listing is cut off.
const DEBUG_PREVIEW: usize = 8;

impl fmt::Debug for NDArray {
    /// Layout plus the first few elements in row-major order. Reads them
    /// through the offset iterator, so large arrays are not gathered.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.buffer.as_slice();
        let base = self.base_offset as isize;
        let preview: Vec<f32> = offsets(&self.shape, &self.strides)
            .take(DEBUG_PREVIEW)
            .map(|o| data[(base + o) as usize])
            .collect();
        f.debug_struct("NDArray")
            .field("shape", &self.shape)
            .field("strides", &self.strides)
            .field("base_offset", &self.base_offset)
            .field("volume", &self.volume())
            .field("head", &preview)
            .finish()
    }
}

fn write_nested(f: &mut fmt::Formatter<'_>, shape: &[usize], data: &[f32]) -> fmt::Result {
    match shape.split_first() {
        None => write!(f, "{}", data[0]),
        Some((&n, rest)) => {
            let chunk = volume(rest);
            write!(f, "[")?;
            for i in 0..n {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_nested(f, rest, &data[i * chunk..(i + 1) * chunk])?;
            }
            write!(f, "]")
        }
    }
}

impl fmt::Display for NDArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_nested(f, &self.shape, &self.elements())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_accessors() {
        let a = NDArray::new(&[2, 3], (0..6).map(|x| x as f32).collect());
        assert_eq!(a.shape(), &[2, 3]);
        assert_eq!(a.strides(), &[3, 1]);
        assert_eq!(a.ndim(), 2);
        assert_eq!(a.volume(), 6);
        assert!(a.is_contiguous());
        assert!(!a.is_scalar());
        assert_eq!(a.element(&[1, 2]), 5.0);
        assert_eq!(a.element(&[-1, -3]), 3.0);
    }

    #[test]
    #[should_panic(expected = "needs 6 elements, got 5")]
    fn test_new_volume_mismatch() {
        NDArray::new(&[2, 3], vec![0.0; 5]);
    }

    #[test]
    fn test_scalar() {
        let s = NDArray::scalar(3.5);
        assert!(s.is_scalar());
        assert_eq!(s.volume(), 1);
        assert_eq!(s.as_scalar(), 3.5);
        assert_eq!(s.elements(), vec![3.5]);
        assert_eq!(s.element(&[]), 3.5);
    }

    #[test]
    #[should_panic(expected = "is not a scalar")]
    fn test_as_scalar_on_vector() {
        NDArray::from_vec(vec![1.0]).as_scalar();
    }

    #[test]
    fn test_from_parts_strided() {
        let buf = Buffer::from_vec((0..6).map(|x| x as f32).collect());
        let a = NDArray::from_parts(&[3, 2], &[1, 3], 0, buf);
        assert_eq!(a.elements(), vec![0.0, 3.0, 1.0, 4.0, 2.0, 5.0]);
        let buf = Buffer::from_vec(vec![7.0]);
        let b = NDArray::from_parts(&[2, 2], &[0, 0], 0, buf);
        assert_eq!(b.elements(), vec![7.0; 4]);
    }

    #[test]
    #[should_panic(expected = "outside buffer")]
    fn test_from_parts_out_of_bounds() {
        NDArray::from_parts(&[3], &[2], 0, Buffer::new(5));
    }

    #[test]
    fn test_equality_is_structural() {
        let a = NDArray::new(&[2, 2], vec![1.0, 2.0, 3.0, 4.0]);
        let buf = Buffer::from_vec(vec![1.0, 3.0, 2.0, 4.0]);
        let b = NDArray::from_parts(&[2, 2], &[1, 2], 0, buf);
        assert_eq!(a, b);
        assert_ne!(a, NDArray::new(&[4], vec![1.0, 2.0, 3.0, 4.0]));
        assert_ne!(a, NDArray::new(&[2, 2], vec![1.0, 2.0, 3.0, 5.0]));
    }

    #[test]
    fn test_empty_arrays() {
        let a = NDArray::new(&[3, 0, 2], vec![]);
        assert!(a.is_empty());
        assert_eq!(a.elements(), Vec::<f32>::new());
        assert_eq!(a, NDArray::new(&[3, 0, 2], vec![]));
    }

    #[test]
    fn test_rows() {
        let a = NDArray::new(&[3, 2], (0..6).map(|x| x as f32).collect());
        let rows: Vec<_> = a.rows().map(|r| r.elements()).collect();
        assert_eq!(rows, vec![vec![0.0, 1.0], vec![2.0, 3.0], vec![4.0, 5.0]]);
        let last = (&a).into_iter().next_back().unwrap();
        assert_eq!(last.elements(), vec![4.0, 5.0]);
        assert_eq!(a.rows().len(), 3);
    }

    #[test]
    fn test_display() {
        let a = NDArray::new(&[2, 2], vec![1.0, 2.0, 3.0, 4.5]);
        assert_eq!(a.to_string(), "[[1, 2], [3, 4.5]]");
        assert_eq!(NDArray::scalar(2.0).to_string(), "2");
        assert_eq!(NDArray::new(&[0], vec![]).to_string(), "[]");
    }

    #[test]
    fn test_debug_shows_layout_and_head() {
        let a = NDArray::new(&[4, 5], (0..20).map(|x| x as f32).collect()).transposed();
        let text = format!("{:?}", a);
        assert!(text.contains("shape: [5, 4]"));
        assert!(text.contains("strides: [1, 5]"));
        assert!(text.contains("volume: 20"));
        assert!(text.contains("head: [0.0, 5.0, 10.0, 15.0, 1.0, 6.0, 11.0, 16.0]"));
        assert!(!text.contains("2.0"));
        assert!(format!("{:?}", NDArray::new(&[0], vec![])).contains("head: []"));
    }

    #[test]
    fn test_as_contiguous_shares_when_possible() {
        let a = NDArray::new(&[2, 2], vec![1.0, 2.0, 3.0, 4.0]);
        let c = a.as_contiguous();
        assert!(c.shares_buffer_with(&a));
        let t = a.transposed();
        let tc = t.as_contiguous();
        assert!(!tc.shares_buffer_with(&a));
        assert_eq!(tc.strides(), &[2, 1]);
        assert_eq!(tc.elements(), vec![1.0, 3.0, 2.0, 4.0]);
    }
}
