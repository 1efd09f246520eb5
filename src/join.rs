//! Joining arrays and selecting rows.
//!
//! Results are assembled by scatter writes into a fresh array, so inputs may
//! have any layout.

use crate::array::NDArray;
use crate::index::IndexElem;
use crate::layout::normalize_axis;

/// Join `arrays` along an existing `axis`.
///
/// # Panics
/// Panics if `arrays` is empty, the ranks differ, or any dimension other
/// than `axis` differs.
pub fn concat(arrays: &[NDArray], axis: isize) -> NDArray {
    let Some(first) = arrays.first() else {
        panic!("concat needs at least one array");
    };
    let rank = first.ndim();
    let axis = normalize_axis(axis, rank);

    let mut shape = first.shape().to_vec();
    shape[axis] = 0;
    for a in arrays {
        assert!(
            a.ndim() == rank
                && a.shape()
                    .iter()
                    .zip(first.shape())
                    .enumerate()
                    .all(|(i, (&n, &m))| i == axis || n == m),
            "cannot concat shape {:?} with {:?} along axis {}",
            a.shape(),
            first.shape(),
            axis
        );
        shape[axis] += a.shape()[axis];
    }

    let mut out = NDArray::zeros(&shape);
    let mut index = vec![IndexElem::FULL; axis + 1];
    let mut start = 0isize;
    for a in arrays {
        let end = start + a.shape()[axis] as isize;
        index[axis] = IndexElem::range(Some(start), Some(end), 1);
        out.set(&index, a);
        start = end;
    }
    out
}

/// Join equally shaped `arrays` along a new axis inserted at `axis`.
///
/// # Panics
/// Panics if `arrays` is empty or the shapes differ.
pub fn stack(arrays: &[NDArray], axis: isize) -> NDArray {
    let Some(first) = arrays.first() else {
        panic!("stack needs at least one array");
    };
    for a in arrays {
        assert_eq!(
            a.shape(),
            first.shape(),
            "cannot stack shape {:?} with {:?}",
            a.shape(),
            first.shape()
        );
    }
    let axis = normalize_axis(axis, first.ndim() + 1) as isize;
    let expanded: Vec<NDArray> = arrays.iter().map(|a| a.expand_dims(axis)).collect();
    concat(&expanded, axis)
}

impl NDArray {
    /// Rows `indices` along axis 0, in the given order.
    ///
    /// An empty selection gives shape `[0, rest...]`.
    ///
    /// # Panics
    /// Panics on a rank-0 array or an index out of range.
    pub fn select(&self, indices: &[usize]) -> NDArray {
        assert!(self.ndim() > 0, "cannot select rows of a rank-0 array");
        let mut shape = self.shape().to_vec();
        shape[0] = indices.len();
        let mut out = NDArray::zeros(&shape);
        for (dst, &src) in indices.iter().enumerate() {
            let row = self.get(&[IndexElem::single(src as isize)]);
            out.set(&[IndexElem::single(dst as isize)], &row);
        }
        out
    }

    /// Rows along axis 0 whose `mask` entry is true.
    ///
    /// # Panics
    /// Panics if `mask.len()` differs from the size of axis 0.
    pub fn select_mask(&self, mask: &[bool]) -> NDArray {
        assert!(self.ndim() > 0, "cannot select rows of a rank-0 array");
        assert_eq!(
            mask.len(),
            self.shape()[0],
            "mask of length {} does not match axis 0 of shape {:?}",
            mask.len(),
            self.shape()
        );
        let indices: Vec<usize> = (0..mask.len()).filter(|&i| mask[i]).collect();
        self.select(&indices)
    }

    /// Rows along axis 0 for which `predicate` holds.
    pub fn select_where<F>(&self, predicate: F) -> NDArray
    where
        F: Fn(&NDArray) -> bool,
    {
        let indices: Vec<usize> = self
            .rows()
            .enumerate()
            .filter(|(_, row)| predicate(row))
            .map(|(i, _)| i)
            .collect();
        self.select(&indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arange(shape: &[usize]) -> NDArray {
        let n = shape.iter().product::<usize>();
        NDArray::new(shape, (0..n).map(|x| x as f32).collect())
    }

    #[test]
    fn test_concat() {
        let a = arange(&[2, 2]);
        let b = NDArray::new(&[1, 2], vec![9.0, 9.0]);
        let r = concat(&[a.clone(), b], 0);
        assert_eq!(r.shape(), &[3, 2]);
        assert_eq!(r.elements(), vec![0.0, 1.0, 2.0, 3.0, 9.0, 9.0]);

        let r = concat(&[a.clone(), a.transposed()], 1);
        assert_eq!(r.shape(), &[2, 4]);
        assert_eq!(r.elements(), vec![0.0, 1.0, 0.0, 2.0, 2.0, 3.0, 1.0, 3.0]);
    }

    #[test]
    fn test_concat_doubles_axis() {
        let a = arange(&[2, 3, 4]);
        for axis in 0..3 {
            let r = concat(&[a.clone(), a.clone()], axis);
            let mut expected = a.shape().to_vec();
            expected[axis as usize] *= 2;
            assert_eq!(r.shape(), expected.as_slice());
        }
    }

    #[test]
    #[should_panic(expected = "cannot concat")]
    fn test_concat_mismatch() {
        concat(&[arange(&[2, 2]), arange(&[2, 3])], 0);
    }

    #[test]
    fn test_stack() {
        let a = arange(&[2, 3]);
        for k in 0..3 {
            let r = stack(&[a.clone(), a.clone(), a.clone()], k);
            let mut expected = a.shape().to_vec();
            expected.insert(k as usize, 3);
            assert_eq!(r.shape(), expected.as_slice());
        }
        let r = stack(&[NDArray::from_vec(vec![1.0, 2.0]), NDArray::from_vec(vec![3.0, 4.0])], -1);
        assert_eq!(r.elements(), vec![1.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn test_select() {
        let a = arange(&[3, 2]);
        assert_eq!(a.select(&[2, 0]).elements(), vec![4.0, 5.0, 0.0, 1.0]);
        assert_eq!(a.select(&[]).shape(), &[0, 2]);
        assert_eq!(
            a.select_mask(&[true, false, true]).elements(),
            vec![0.0, 1.0, 4.0, 5.0]
        );
        let big = a.select_where(|row| row.sum() > 2.0);
        assert_eq!(big.shape(), &[2, 2]);
        assert_eq!(a.select_where(|_| false).shape(), &[0, 2]);
    }
}
