//! Broadcasting: pairwise and to a target shape.
//!
//! Shapes are aligned on their trailing axes. A size-1 axis stretches to the
//! other side's size by taking stride 0; any other size mismatch is a
//! contract violation.

use crate::array::NDArray;

/// Broadcast shape of `a` and `b`, or `None` if they are incompatible.
pub fn broadcast_shapes(a: &[usize], b: &[usize]) -> Option<Vec<usize>> {
    let rank = a.len().max(b.len());
    let mut result = vec![0usize; rank];

    for i in 0..rank {
        let a_dim = if i < a.len() { a[a.len() - 1 - i] } else { 1 };
        let b_dim = if i < b.len() { b[b.len() - 1 - i] } else { 1 };

        result[rank - 1 - i] = if a_dim == b_dim || b_dim == 1 {
            a_dim
        } else if a_dim == 1 {
            b_dim
        } else {
            return None;
        };
    }

    Some(result)
}

/// Broadcast two arrays against each other.
///
/// Both results have the same shape and share their inputs' buffers.
///
/// # Panics
/// Panics if the shapes are incompatible.
pub fn broadcast_pair(a: &NDArray, b: &NDArray) -> (NDArray, NDArray) {
    if a.shape() == b.shape() {
        return (a.clone(), b.clone());
    }
    let shape = broadcast_shapes(a.shape(), b.shape()).unwrap_or_else(|| {
        panic!(
            "cannot broadcast shapes {:?} and {:?}",
            a.shape(),
            b.shape()
        )
    });
    (a.broadcast_to(&shape), b.broadcast_to(&shape))
}

impl NDArray {
    /// View of `self` stretched to `shape`.
    ///
    /// Missing leading axes are added with stride 0, and size-1 axes that
    /// must grow get stride 0.
    ///
    /// # Panics
    /// Panics if `self` has more axes than `shape` or an axis cannot stretch.
    pub fn broadcast_to(&self, shape: &[usize]) -> NDArray {
        if self.shape() == shape {
            return self.clone();
        }
        assert!(
            self.ndim() <= shape.len(),
            "cannot broadcast shape {:?} to lower rank shape {:?}",
            self.shape(),
            shape
        );
        let pad = shape.len() - self.ndim();
        let mut strides = vec![0isize; shape.len()];
        for (i, (&n, &s)) in self.shape().iter().zip(self.strides()).enumerate() {
            let target = shape[pad + i];
            strides[pad + i] = if n == target {
                s
            } else if n == 1 {
                0
            } else {
                panic!("cannot broadcast shape {:?} to {:?}", self.shape(), shape)
            };
        }
        NDArray::with_layout(
            shape.to_vec(),
            strides,
            self.base_offset(),
            self.buffer().clone(),
        )
    }
}
