//! Sorting along an axis.
//!
//! NaNs order by [`f32::total_cmp`]: positive NaN after `+inf`, negative NaN
//! before `-inf`. A descending sort is the exact reverse of that order.

use std::cmp::Ordering;

use crate::array::NDArray;
use crate::layout::normalize_axis;

fn compare(ascending: bool) -> impl Fn(&f32, &f32) -> Ordering {
    move |a, b| {
        if ascending {
            a.total_cmp(b)
        } else {
            b.total_cmp(a)
        }
    }
}

impl NDArray {
    /// Copy with every run along `axis` sorted, ascending or descending.
    pub fn sort(&self, axis: isize, ascending: bool) -> NDArray {
        let axis = normalize_axis(axis, self.ndim());
        let n = self.shape()[axis];
        let moved = self.move_axis(axis as isize, -1);
        let mut data = moved.elements();
        if n > 0 {
            let cmp = compare(ascending);
            for run in data.chunks_mut(n) {
                run.sort_unstable_by(&cmp);
            }
        }
        NDArray::new(moved.shape(), data)
            .move_axis(-1, axis as isize)
            .as_contiguous()
    }

    /// Indices that sort a rank-1 array. Equal elements keep their order in
    /// both directions.
    ///
    /// # Panics
    /// Panics unless the array has rank 1.
    pub fn argsort(&self, ascending: bool) -> Vec<usize> {
        assert_eq!(
            self.ndim(),
            1,
            "argsort needs a rank-1 array, got shape {:?}",
            self.shape()
        );
        let data = self.elements();
        let cmp = compare(ascending);
        let mut order: Vec<usize> = (0..data.len()).collect();
        order.sort_by(|&i, &j| cmp(&data[i], &data[j]));
        order
    }
}
