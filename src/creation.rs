//! Array constructors beyond [`NDArray::new`].

use crate::array::NDArray;
use crate::buffer::Buffer;
use crate::layout::volume;

impl NDArray {
    /// Array of `shape` with every element set to `value`.
    pub fn filled(value: f32, shape: &[usize]) -> NDArray {
        NDArray::from_buffer(shape, Buffer::filled(value, volume(shape)))
    }

    pub fn zeros(shape: &[usize]) -> NDArray {
        NDArray::filled(0.0, shape)
    }

    pub fn ones(shape: &[usize]) -> NDArray {
        NDArray::filled(1.0, shape)
    }

    /// Fresh zero-initialized array.
    pub fn empty(shape: &[usize]) -> NDArray {
        NDArray::from_buffer(shape, Buffer::new(volume(shape)))
    }

    /// `n x n` identity matrix.
    pub fn eye(n: usize) -> NDArray {
        let mut data = vec![0.0f32; n * n];
        for i in 0..n {
            data[i * n + i] = 1.0;
        }
        NDArray::new(&[n, n], data)
    }

    /// Diagonal matrices built from the last axis of `v`.
    ///
    /// A `[.., n]` argument gives `[.., n, n]`; a rank-0 argument is returned
    /// unchanged.
    pub fn diagonal(v: &NDArray) -> NDArray {
        if v.is_scalar() {
            return v.clone();
        }
        let n = v.shape()[v.ndim() - 1];
        &NDArray::eye(n) * &v.expand_dims(-1)
    }

    /// `[0, 1, ..., n - 1]`.
    pub fn range(n: usize) -> NDArray {
        NDArray::from_vec((0..n).map(|x| x as f32).collect())
    }

    /// `[start, start + 1, ..., end - 1]`; empty when `end <= start`.
    pub fn range_between(start: isize, end: isize) -> NDArray {
        NDArray::from_vec((start..end).map(|x| x as f32).collect())
    }

    /// Values `from, from + by, ...` strictly before `to`.
    ///
    /// # Panics
    /// Panics if `by` is zero or not finite.
    pub fn stride(from: f32, to: f32, by: f32) -> NDArray {
        assert!(by != 0.0 && by.is_finite(), "invalid step {}", by);
        let count = ((to - from) / by).ceil().max(0.0) as usize;
        NDArray::from_vec((0..count).map(|i| from + i as f32 * by).collect())
    }

    /// `count` evenly spaced values from `low` to `high` inclusive.
    pub fn linspace(low: f32, high: f32, count: usize) -> NDArray {
        let data = match count {
            0 => vec![],
            1 => vec![low],
            _ => {
                let step = (high - low) / (count - 1) as f32;
                let mut data: Vec<f32> = (0..count).map(|i| low + i as f32 * step).collect();
                data[count - 1] = high;
                data
            }
        };
        NDArray::from_vec(data)
    }

    /// Array whose element at each multi-index is `f(index)`, filled in
    /// row-major order.
    pub fn from_fn<F>(shape: &[usize], mut f: F) -> NDArray
    where
        F: FnMut(&[usize]) -> f32,
    {
        let total = volume(shape);
        let mut data = Vec::with_capacity(total);
        let mut index = vec![0usize; shape.len()];
        for _ in 0..total {
            data.push(f(&index));
            for axis in (0..shape.len()).rev() {
                index[axis] += 1;
                if index[axis] < shape[axis] {
                    break;
                }
                index[axis] = 0;
            }
        }
        NDArray::new(shape, data)
    }
}
