//! Zero-copy view transformations.
//!
//! Every method here rewrites `(shape, strides, base_offset)` and shares the
//! buffer, except [`NDArray::reshaped`] on a non-contiguous layout, which
//! gathers first.

use crate::array::NDArray;
use crate::dispatch;
use crate::layout::{contiguous_strides, normalize_axis, volume};
use crate::provider::provider;

impl NDArray {
    /// Reorder axes: output axis `i` is input axis `axes[i]`.
    ///
    /// # Panics
    /// Panics if `axes` is not a permutation of `0..ndim`.
    pub fn permuted(&self, axes: &[usize]) -> NDArray {
        let rank = self.ndim();
        assert_eq!(
            axes.len(),
            rank,
            "permutation {:?} does not match rank {}",
            axes,
            rank
        );
        let mut seen = vec![false; rank];
        for &p in axes {
            assert!(
                p < rank && !seen[p],
                "{:?} is not a permutation of 0..{}",
                axes,
                rank
            );
            seen[p] = true;
        }
        let shape: Vec<usize> = axes.iter().map(|&p| self.shape()[p]).collect();
        let strides: Vec<isize> = axes.iter().map(|&p| self.strides()[p]).collect();
        NDArray::with_layout(shape, strides, self.base_offset(), self.buffer().clone())
    }

    /// Reverse the order of all axes.
    pub fn transposed(&self) -> NDArray {
        let axes: Vec<usize> = (0..self.ndim()).rev().collect();
        self.permuted(&axes)
    }

    /// Move axis `from` to position `to`, keeping the others in order.
    pub fn move_axis(&self, from: isize, to: isize) -> NDArray {
        let from = normalize_axis(from, self.ndim());
        let to = normalize_axis(to, self.ndim());
        let mut axes: Vec<usize> = (0..self.ndim()).filter(|&i| i != from).collect();
        axes.insert(to, from);
        self.permuted(&axes)
    }

    /// Exchange two axes.
    pub fn swap_axes(&self, a: isize, b: isize) -> NDArray {
        let a = normalize_axis(a, self.ndim());
        let b = normalize_axis(b, self.ndim());
        let mut axes: Vec<usize> = (0..self.ndim()).collect();
        axes.swap(a, b);
        self.permuted(&axes)
    }

    /// Reverse the element order along `axis`.
    pub fn flipped(&self, axis: isize) -> NDArray {
        let axis = normalize_axis(axis, self.ndim());
        let mut strides = self.strides().to_vec();
        let n = self.shape()[axis];
        let mut base = self.base_offset() as isize;
        if n > 0 {
            base += (n as isize - 1) * strides[axis];
        }
        strides[axis] = -strides[axis];
        NDArray::with_layout(
            self.shape().to_vec(),
            strides,
            base as usize,
            self.buffer().clone(),
        )
    }

    /// Same elements under a new shape of equal volume.
    ///
    /// Zero-copy when the current layout is canonical row-major; otherwise
    /// the elements are gathered into a fresh buffer first.
    ///
    /// # Panics
    /// Panics if the volumes differ.
    pub fn reshaped(&self, shape: &[usize]) -> NDArray {
        assert_eq!(
            volume(shape),
            self.volume(),
            "cannot reshape {:?} into {:?}",
            self.shape(),
            shape
        );
        if self.is_contiguous() {
            return NDArray::with_layout(
                shape.to_vec(),
                contiguous_strides(shape),
                self.base_offset(),
                self.buffer().clone(),
            );
        }
        NDArray::from_buffer(shape, dispatch::gather_buffer(provider(), self, false))
    }

    /// [`reshaped`](Self::reshaped) where one entry may be `-1` and is
    /// inferred from the volume.
    ///
    /// # Panics
    /// Panics on more than one `-1`, any other negative entry, or a volume
    /// that the known entries do not divide.
    pub fn reshaped_inferred(&self, shape: &[isize]) -> NDArray {
        let mut inferred = None;
        let mut known = 1usize;
        for (i, &n) in shape.iter().enumerate() {
            match n {
                -1 => {
                    assert!(inferred.is_none(), "more than one -1 in shape {:?}", shape);
                    inferred = Some(i);
                }
                n if n < 0 => panic!("negative dimension in shape {:?}", shape),
                n => known *= n as usize,
            }
        }
        let mut resolved: Vec<usize> = shape.iter().map(|&n| n.max(0) as usize).collect();
        if let Some(i) = inferred {
            assert!(
                known != 0 && self.volume() % known == 0,
                "cannot reshape {:?} into {:?}",
                self.shape(),
                shape
            );
            resolved[i] = self.volume() / known;
        }
        self.reshaped(&resolved)
    }

    /// Rank-1 view (or copy) of all elements.
    pub fn raveled(&self) -> NDArray {
        self.reshaped(&[self.volume()])
    }

    /// Insert a size-1 axis at `axis`, which may range over `ndim + 1` positions.
    pub fn expand_dims(&self, axis: isize) -> NDArray {
        let axis = normalize_axis(axis, self.ndim() + 1);
        let mut shape = self.shape().to_vec();
        let mut strides = self.strides().to_vec();
        shape.insert(axis, 1);
        strides.insert(axis, 0);
        NDArray::with_layout(shape, strides, self.base_offset(), self.buffer().clone())
    }

    /// Drop every size-1 axis.
    pub fn squeezed(&self) -> NDArray {
        let (shape, strides): (Vec<usize>, Vec<isize>) = self
            .shape()
            .iter()
            .zip(self.strides())
            .filter(|&(&n, _)| n != 1)
            .map(|(&n, &s)| (n, s))
            .unzip();
        NDArray::with_layout(shape, strides, self.base_offset(), self.buffer().clone())
    }

    /// Drop one size-1 axis.
    ///
    /// # Panics
    /// Panics if the axis does not have size 1.
    pub fn squeezed_axis(&self, axis: isize) -> NDArray {
        let axis = normalize_axis(axis, self.ndim());
        assert_eq!(
            self.shape()[axis],
            1,
            "cannot squeeze axis {} of shape {:?}",
            axis,
            self.shape()
        );
        let mut shape = self.shape().to_vec();
        let mut strides = self.strides().to_vec();
        shape.remove(axis);
        strides.remove(axis);
        NDArray::with_layout(shape, strides, self.base_offset(), self.buffer().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arange(shape: &[usize]) -> NDArray {
        NDArray::new(shape, (0..volume(shape)).map(|x| x as f32).collect())
    }

    #[test]
    fn test_transposed() {
        let a = arange(&[2, 3]);
        let t = a.transposed();
        assert_eq!(t.shape(), &[3, 2]);
        assert_eq!(t.strides(), &[1, 3]);
        assert!(t.shares_buffer_with(&a));
        assert_eq!(t.elements(), vec![0.0, 3.0, 1.0, 4.0, 2.0, 5.0]);
    }

    #[test]
    fn test_permuted_round_trip() {
        let a = arange(&[2, 3, 4]);
        let p = a.permuted(&[2, 0, 1]);
        assert_eq!(p.shape(), &[4, 2, 3]);
        assert_eq!(p.permuted(&[1, 2, 0]), a);
    }

    #[test]
    #[should_panic(expected = "is not a permutation")]
    fn test_permuted_duplicate_axis() {
        arange(&[2, 3]).permuted(&[0, 0]);
    }

    #[test]
    fn test_move_and_swap_axes() {
        let a = arange(&[2, 3, 4]);
        assert_eq!(a.move_axis(0, -1).shape(), &[3, 4, 2]);
        assert_eq!(a.move_axis(-1, 0).shape(), &[4, 2, 3]);
        assert_eq!(a.swap_axes(0, 2).shape(), &[4, 3, 2]);
        assert_eq!(a.swap_axes(0, 2), a.transposed());
    }

    #[test]
    fn test_flipped() {
        let a = arange(&[2, 3]);
        let f = a.flipped(1);
        assert_eq!(f.strides(), &[3, -1]);
        assert_eq!(f.base_offset(), 2);
        assert_eq!(f.elements(), vec![2.0, 1.0, 0.0, 5.0, 4.0, 3.0]);
        assert_eq!(a.flipped(0).elements(), vec![3.0, 4.0, 5.0, 0.0, 1.0, 2.0]);
        assert_eq!(f.flipped(1), a);
    }

    #[test]
    fn test_flipped_zero_stride() {
        let a = NDArray::from_vec(vec![1.0, 2.0]).broadcast_to(&[3, 2]);
        let f = a.flipped(0);
        assert_eq!(f.elements(), a.elements());
        assert_eq!(a.flipped(1).elements(), vec![2.0, 1.0, 2.0, 1.0, 2.0, 1.0]);
    }

    #[test]
    fn test_reshaped_contiguous_is_zero_copy() {
        let a = arange(&[2, 3]);
        let r = a.reshaped(&[3, 2]);
        assert!(r.shares_buffer_with(&a));
        assert_eq!(r.elements(), a.elements());
        assert_eq!(r.reshaped(&[2, 3]), a);
    }

    #[test]
    fn test_reshaped_non_contiguous_gathers() {
        let a = arange(&[2, 3]);
        let r = a.transposed().reshaped(&[6]);
        assert!(!r.shares_buffer_with(&a));
        assert_eq!(r.elements(), vec![0.0, 3.0, 1.0, 4.0, 2.0, 5.0]);
    }

    #[test]
    fn test_reshaped_inferred() {
        let a = arange(&[2, 3, 4]);
        assert_eq!(a.reshaped_inferred(&[-1, 4]).shape(), &[6, 4]);
        assert_eq!(a.reshaped_inferred(&[2, -1]).shape(), &[2, 12]);
        assert_eq!(a.raveled().shape(), &[24]);
    }

    #[test]
    #[should_panic(expected = "cannot reshape")]
    fn test_reshaped_volume_mismatch() {
        arange(&[2, 3]).reshaped(&[4]);
    }

    #[test]
    fn test_expand_dims_and_squeeze() {
        let a = arange(&[2, 3]);
        assert_eq!(a.expand_dims(0).shape(), &[1, 2, 3]);
        assert_eq!(a.expand_dims(-1).shape(), &[2, 3, 1]);
        assert_eq!(a.expand_dims(1).shape(), &[2, 1, 3]);
        let e = a.expand_dims(1).expand_dims(0);
        assert_eq!(e.squeezed().shape(), &[2, 3]);
        assert_eq!(e.squeezed(), a);
        assert_eq!(e.squeezed_axis(2).shape(), &[1, 2, 3]);
    }
}
