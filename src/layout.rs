//! Shape and stride utilities.
//!
//! Pure functions over `(shape, strides)` pairs. Every function that takes both
//! asserts that they have the same length.

#[inline]
fn check_rank(shape: &[usize], strides: &[isize]) {
    assert_eq!(
        shape.len(),
        strides.len(),
        "shape {:?} and strides {:?} differ in rank",
        shape,
        strides
    );
}

/// Number of elements described by `shape`. Rank 0 has volume 1.
#[inline]
pub fn volume(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Canonical row-major strides (last axis fastest).
///
/// Built by a right-to-left cumulative product; rank 0 gives an empty vector.
pub fn contiguous_strides(shape: &[usize]) -> Vec<isize> {
    let rank = shape.len();
    if rank == 0 {
        return vec![];
    }
    let mut strides = vec![1isize; rank];
    for i in (0..rank - 1).rev() {
        strides[i] = strides[i + 1] * shape[i + 1] as isize;
    }
    strides
}

/// True when `strides` address `shape` in canonical row-major order.
///
/// Strides of size-1 axes never affect addressing and are ignored.
pub fn is_contiguous(shape: &[usize], strides: &[isize]) -> bool {
    check_rank(shape, strides);
    let mut expected = 1isize;
    for (&n, &s) in shape.iter().zip(strides).rev() {
        if n == 1 {
            continue;
        }
        if s != expected {
            return false;
        }
        expected *= n as isize;
    }
    true
}

/// True when the strides are a permutation of some contiguous layout of `shape`.
///
/// Axes of size 1 and axes with stride 0 are ignored; the remaining axes,
/// sorted by stride magnitude, must form an unbroken cumulative product
/// starting at 1. Negative strides are accepted because the physical
/// footprint is still one contiguous run.
pub fn is_dense(shape: &[usize], strides: &[isize]) -> bool {
    check_rank(shape, strides);
    let mut pairs: Vec<(usize, usize)> = shape
        .iter()
        .zip(strides)
        .filter(|&(&n, &s)| n > 1 && s != 0)
        .map(|(&n, &s)| (s.unsigned_abs(), n))
        .collect();
    pairs.sort_unstable();

    let mut expected = 1usize;
    for (stride, n) in pairs {
        if stride != expected {
            return false;
        }
        expected *= n;
    }
    true
}

/// Number of physical slots touched by a dense layout.
///
/// This is the product of the sizes of all axes with a nonzero stride; a
/// broadcast axis repeats slots rather than adding new ones.
pub fn dense_data_count(shape: &[usize], strides: &[isize]) -> usize {
    check_rank(shape, strides);
    shape
        .iter()
        .zip(strides)
        .filter(|&(_, &s)| s != 0)
        .map(|(&n, _)| n)
        .product()
}

/// Lowest and highest offset reached from `base`, or `None` for an empty shape.
pub fn offset_bounds(shape: &[usize], strides: &[isize], base: isize) -> Option<(isize, isize)> {
    check_rank(shape, strides);
    if shape.iter().any(|&n| n == 0) {
        return None;
    }
    let mut lo = base;
    let mut hi = base;
    for (&n, &s) in shape.iter().zip(strides) {
        let end = s * (n as isize - 1);
        if end >= 0 {
            hi += end;
        } else {
            lo += end;
        }
    }
    Some((lo, hi))
}

/// Dot product of `strides` and a multi-index.
#[inline]
pub fn index_offset(strides: &[isize], index: &[usize]) -> isize {
    assert_eq!(
        strides.len(),
        index.len(),
        "index {:?} does not match rank {}",
        index,
        strides.len()
    );
    strides
        .iter()
        .zip(index)
        .map(|(&s, &i)| s * i as isize)
        .sum()
}

/// Axis with the smallest stride magnitude. Ties go to the later axis.
///
/// # Panics
/// Panics if `strides` is empty.
pub fn least_stride_axis(strides: &[isize]) -> usize {
    assert!(!strides.is_empty(), "least_stride_axis of a rank-0 layout");
    let mut best = 0;
    for (i, s) in strides.iter().enumerate() {
        if s.unsigned_abs() <= strides[best].unsigned_abs() {
            best = i;
        }
    }
    best
}

/// [`strided_dims_from`] starting at the last axis. Rank 0 gives 0.
pub fn strided_dims(shape: &[usize], strides: &[isize]) -> usize {
    match shape.len() {
        0 => 0,
        n => strided_dims_from(shape, strides, n - 1),
    }
}

/// Count the axes `axis, axis-1, ...` that fold into one arithmetic run.
///
/// Size-1 axes count unconditionally. Every other axis must have a stride
/// equal to the running product of the axes already folded, measured in the
/// direction (sign) of the first folded axis that has more than one element.
pub fn strided_dims_from(shape: &[usize], strides: &[isize], axis: usize) -> usize {
    check_rank(shape, strides);
    assert!(
        axis < shape.len(),
        "axis {} out of range for ndim {}",
        axis,
        shape.len()
    );
    let mut count = 0;
    let mut sign = 1isize;
    let mut next: Option<isize> = None;
    for i in (0..=axis).rev() {
        if shape[i] == 1 {
            count += 1;
            continue;
        }
        match next {
            None => {
                sign = if strides[i] < 0 { -1 } else { 1 };
                next = Some(strides[i] * sign * shape[i] as isize);
            }
            Some(expected) => {
                if strides[i] * sign != expected {
                    break;
                }
                next = Some(expected * shape[i] as isize);
            }
        }
        count += 1;
    }
    count
}

/// Stride of the run formed by the `dims` axes ending at `axis`.
///
/// This is the stride of the innermost axis in the run with more than one
/// element, or 1 when every axis in the run has size 1.
pub fn run_stride(shape: &[usize], strides: &[isize], axis: usize, dims: usize) -> isize {
    check_rank(shape, strides);
    (axis + 1 - dims..=axis)
        .rev()
        .find(|&i| shape[i] != 1)
        .map_or(1, |i| strides[i])
}

/// Wrap a possibly negative axis into `0..ndim`.
///
/// # Panics
/// Panics if the axis is out of range.
#[inline]
pub fn normalize_axis(axis: isize, ndim: usize) -> usize {
    let n = ndim as isize;
    let a = if axis < 0 { axis + n } else { axis };
    assert!(
        0 <= a && a < n,
        "axis {} out of range for ndim {}",
        axis,
        ndim
    );
    a as usize
}

/// Wrap a possibly negative index into `0..size`.
///
/// # Panics
/// Panics if the index is out of range.
#[inline]
pub fn normalize_index(index: isize, size: usize) -> usize {
    let n = size as isize;
    let i = if index < 0 { index + n } else { index };
    assert!(
        0 <= i && i < n,
        "index {} out of bounds for axis of size {}",
        index,
        size
    );
    i as usize
}
