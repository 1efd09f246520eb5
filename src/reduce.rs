//! Reductions and summary statistics.
//!
//! Global reductions return `f32` (or a flat index). Axis reductions return a
//! new array that drops the axis, or keeps it with size 1 when `keep_dims` is
//! set. Variance is the population variance `mean(x^2) - mean(x)^2`.

use crate::array::NDArray;
use crate::dispatch::{index_reduce_all, index_reduce_axis, reduce_all, reduce_axis};
use crate::layout::normalize_axis;
use crate::provider::{provider, IndexReduceOp, ReduceOp};

impl NDArray {
    // ------------------------------------------------------------------
    // Global
    // ------------------------------------------------------------------

    /// Sum of all elements; 0 for an empty array.
    pub fn sum(&self) -> f32 {
        reduce_all(provider(), ReduceOp::Sum, self)
    }

    /// Mean of all elements; NaN for an empty array.
    pub fn mean(&self) -> f32 {
        reduce_all(provider(), ReduceOp::Mean, self)
    }

    /// # Panics
    /// Panics on an empty array.
    pub fn min(&self) -> f32 {
        reduce_all(provider(), ReduceOp::Min, self)
    }

    /// # Panics
    /// Panics on an empty array.
    pub fn max(&self) -> f32 {
        reduce_all(provider(), ReduceOp::Max, self)
    }

    /// Flat row-major index of the smallest element. Ties go to the first.
    pub fn argmin(&self) -> usize {
        index_reduce_all(provider(), IndexReduceOp::ArgMin, self)
    }

    /// Flat row-major index of the largest element. Ties go to the first.
    pub fn argmax(&self) -> usize {
        index_reduce_all(provider(), IndexReduceOp::ArgMax, self)
    }

    /// Population variance of all elements.
    pub fn variance(&self) -> f32 {
        let mean = self.mean();
        reduce_all(provider(), ReduceOp::SumOfSquares, self) / self.volume() as f32 - mean * mean
    }

    /// Population standard deviation of all elements.
    pub fn stddev(&self) -> f32 {
        self.variance().max(0.0).sqrt()
    }

    /// Euclidean norm of all elements.
    pub fn norm(&self) -> f32 {
        reduce_all(provider(), ReduceOp::SumOfSquares, self).sqrt()
    }

    // ------------------------------------------------------------------
    // Along an axis
    // ------------------------------------------------------------------

    fn reduce_along(&self, op: ReduceOp, axis: isize, keep_dims: bool) -> NDArray {
        let axis = normalize_axis(axis, self.ndim());
        reduce_axis(provider(), op, self, axis, keep_dims)
    }

    pub fn sum_axis(&self, axis: isize, keep_dims: bool) -> NDArray {
        self.reduce_along(ReduceOp::Sum, axis, keep_dims)
    }

    pub fn mean_axis(&self, axis: isize, keep_dims: bool) -> NDArray {
        self.reduce_along(ReduceOp::Mean, axis, keep_dims)
    }

    pub fn min_axis(&self, axis: isize, keep_dims: bool) -> NDArray {
        self.reduce_along(ReduceOp::Min, axis, keep_dims)
    }

    pub fn max_axis(&self, axis: isize, keep_dims: bool) -> NDArray {
        self.reduce_along(ReduceOp::Max, axis, keep_dims)
    }

    /// Index of the smallest element of every run along `axis`.
    pub fn argmin_indices(&self, axis: isize) -> Vec<usize> {
        let axis = normalize_axis(axis, self.ndim());
        index_reduce_axis(provider(), IndexReduceOp::ArgMin, self, axis)
    }

    /// Index of the largest element of every run along `axis`.
    pub fn argmax_indices(&self, axis: isize) -> Vec<usize> {
        let axis = normalize_axis(axis, self.ndim());
        index_reduce_axis(provider(), IndexReduceOp::ArgMax, self, axis)
    }

    /// [`argmin_indices`](Self::argmin_indices) as an array (indices stored
    /// as `f32`) shaped like the input without `axis`.
    pub fn argmin_axis(&self, axis: isize) -> NDArray {
        self.indices_array(self.argmin_indices(axis), axis)
    }

    /// [`argmax_indices`](Self::argmax_indices) as an array.
    pub fn argmax_axis(&self, axis: isize) -> NDArray {
        self.indices_array(self.argmax_indices(axis), axis)
    }

    fn indices_array(&self, indices: Vec<usize>, axis: isize) -> NDArray {
        let mut shape = self.shape().to_vec();
        shape.remove(normalize_axis(axis, self.ndim()));
        NDArray::new(&shape, indices.into_iter().map(|i| i as f32).collect())
    }

    /// Mean and population variance along `axis`.
    pub fn moments(&self, axis: isize, keep_dims: bool) -> (NDArray, NDArray) {
        let n = self.shape()[normalize_axis(axis, self.ndim())] as f32;
        let mean = self.mean_axis(axis, keep_dims);
        let mean_sq = self.reduce_along(ReduceOp::SumOfSquares, axis, keep_dims) / n;
        let variance = &mean_sq - &mean.square();
        (mean, variance)
    }

    pub fn variance_axis(&self, axis: isize, keep_dims: bool) -> NDArray {
        self.moments(axis, keep_dims).1
    }

    pub fn stddev_axis(&self, axis: isize, keep_dims: bool) -> NDArray {
        self.variance_axis(axis, keep_dims).clip_low(0.0).sqrt()
    }

    /// Euclidean norm of every run along `axis`.
    pub fn vector_norm(&self, axis: isize, keep_dims: bool) -> NDArray {
        self.reduce_along(ReduceOp::SumOfSquares, axis, keep_dims).sqrt()
    }

    /// Frobenius norm over the two `axes`.
    ///
    /// # Panics
    /// Panics if the axes coincide.
    pub fn matrix_norm(&self, axes: [isize; 2], keep_dims: bool) -> NDArray {
        let a0 = normalize_axis(axes[0], self.ndim());
        let a1 = normalize_axis(axes[1], self.ndim());
        assert!(a0 != a1, "matrix_norm axes {:?} must differ", axes);
        let summed = self
            .reduce_along(ReduceOp::SumOfSquares, a0 as isize, true)
            .sum_axis(a1 as isize, true)
            .sqrt();
        if keep_dims {
            return summed;
        }
        let (hi, lo) = (a0.max(a1), a0.min(a1));
        summed.squeezed_axis(hi as isize).squeezed_axis(lo as isize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s;
    use approx::assert_relative_eq;

    fn arange(shape: &[usize]) -> NDArray {
        let n = shape.iter().product::<usize>();
        NDArray::new(shape, (0..n).map(|x| x as f32).collect())
    }

    #[test]
    fn test_global_reductions() {
        let a = arange(&[2, 3]);
        assert_eq!(a.sum(), 15.0);
        assert_eq!(a.mean(), 2.5);
        assert_eq!(a.min(), 0.0);
        assert_eq!(a.max(), 5.0);
        assert_eq!(a.transposed().get(s![1..]).sum(), 12.0);
        assert_eq!(NDArray::zeros(&[0]).sum(), 0.0);
    }

    #[test]
    fn test_axis_reductions() {
        let a = arange(&[2, 3]);
        assert_eq!(a.sum_axis(0, false).elements(), vec![3.0, 5.0, 7.0]);
        assert_eq!(a.sum_axis(-1, false).elements(), vec![3.0, 12.0]);
        assert_eq!(a.mean_axis(1, true).shape(), &[2, 1]);
        assert_eq!(a.mean_axis(1, true).elements(), vec![1.0, 4.0]);
        assert_eq!(a.min_axis(0, false).elements(), vec![0.0, 1.0, 2.0]);
        assert_eq!(a.max_axis(1, false).elements(), vec![2.0, 5.0]);
    }

    #[test]
    fn test_max_axis_of_empty() {
        let r = NDArray::zeros(&[3, 0, 2]).max_axis(0, false);
        assert_eq!(r, NDArray::zeros(&[0, 2]));
    }

    #[test]
    #[should_panic(expected = "zero-length axis")]
    fn test_reduce_empty_axis() {
        NDArray::zeros(&[3, 0, 2]).max_axis(1, false);
    }

    #[test]
    fn test_argmin_argmax() {
        let a = NDArray::new(&[2, 3], vec![4.0, 1.0, 1.0, -2.0, 7.0, 7.0]);
        assert_eq!(a.argmin(), 3);
        assert_eq!(a.argmax(), 4);
        assert_eq!(a.argmin_indices(1), vec![1, 0]);
        assert_eq!(a.argmax_indices(1), vec![0, 1]);
        assert_eq!(a.argmin_axis(0).elements(), vec![1.0, 0.0, 0.0]);
        assert_eq!(a.argmax_axis(-1).shape(), &[2]);
    }

    #[test]
    fn test_variance_and_stddev() {
        let a = NDArray::from_vec(vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_relative_eq!(a.variance(), 4.0, epsilon = 1e-5);
        assert_relative_eq!(a.stddev(), 2.0, epsilon = 1e-5);

        let m = NDArray::new(&[2, 3], vec![1.0, 2.0, 3.0, 0.0, 6.0, 6.0]);
        let (mean, var) = m.moments(1, false);
        assert_eq!(mean.elements(), vec![2.0, 4.0]);
        assert_relative_eq!(var.elements()[0], 2.0 / 3.0, epsilon = 1e-5);
        assert_relative_eq!(var.elements()[1], 8.0, epsilon = 1e-5);
        assert_relative_eq!(m.stddev_axis(1, true).elements()[1], 8.0f32.sqrt(), epsilon = 1e-5);
    }

    #[test]
    fn test_norms() {
        let a = NDArray::new(&[2, 2], vec![3.0, 4.0, 0.0, 0.0]);
        assert_eq!(a.norm(), 5.0);
        assert_eq!(a.vector_norm(1, false).elements(), vec![5.0, 0.0]);
        assert_eq!(a.matrix_norm([0, 1], false).as_scalar(), 5.0);
        let b = arange(&[2, 2, 2]);
        let n = b.matrix_norm([-1, 0], true);
        assert_eq!(n.shape(), &[1, 2, 1]);
        assert_relative_eq!(n.elements()[0], (0.0f32 + 1.0 + 16.0 + 25.0).sqrt());
    }
}
