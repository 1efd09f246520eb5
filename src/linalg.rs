//! Linear algebra over stacks of matrices.
//!
//! Every routine treats the last two axes as the matrix and any leading axes
//! as a batch. The numeric work goes through the active provider, one call
//! per matrix; provider failures are returned as [`LinalgError`](crate::LinalgError).

use crate::array::NDArray;
use crate::broadcast::broadcast_shapes;
use crate::layout::volume;
use crate::provider::{provider, VectorMathProvider};
use crate::Result;

/// Singular value decomposition `a = u @ diag(s) @ vt`.
#[derive(Clone, Debug)]
pub struct Svd {
    pub u: NDArray,
    /// Singular values in descending order.
    pub s: NDArray,
    pub vt: NDArray,
}

/// Leading batch shape and matrix dimensions of `a`.
fn split_matrix(a: &NDArray, routine: &str) -> (Vec<usize>, usize, usize) {
    assert!(
        a.ndim() >= 2,
        "{} needs at least 2 dimensions, got shape {:?}",
        routine,
        a.shape()
    );
    let r = a.ndim();
    (a.shape()[..r - 2].to_vec(), a.shape()[r - 2], a.shape()[r - 1])
}

fn split_square(a: &NDArray, routine: &str) -> (Vec<usize>, usize) {
    let (batch, m, n) = split_matrix(a, routine);
    assert_eq!(
        m,
        n,
        "{} needs square matrices, got shape {:?}",
        routine,
        a.shape()
    );
    (batch, n)
}

fn with_matrix(batch: &[usize], rows: usize, cols: usize) -> Vec<usize> {
    let mut shape = batch.to_vec();
    shape.push(rows);
    shape.push(cols);
    shape
}

/// Matrix product with NumPy promotion rules.
///
/// A rank-1 left operand is treated as a row vector and a rank-1 right
/// operand as a column vector; the promoted axis is removed from the result.
/// Leading batch axes broadcast.
///
/// # Panics
/// Panics on a rank-0 operand, mismatched inner dimensions, or batch shapes
/// that do not broadcast.
pub fn matmul(a: &NDArray, b: &NDArray) -> NDArray {
    assert!(
        a.ndim() >= 1 && b.ndim() >= 1,
        "matmul needs operands of rank >= 1, got {:?} and {:?}",
        a.shape(),
        b.shape()
    );
    let lhs = if a.ndim() == 1 { a.expand_dims(0) } else { a.clone() };
    let rhs = if b.ndim() == 1 { b.expand_dims(-1) } else { b.clone() };
    let (lb, m, k) = split_matrix(&lhs, "matmul");
    let (rb, k2, n) = split_matrix(&rhs, "matmul");
    assert_eq!(
        k,
        k2,
        "matmul inner dimensions differ: {:?} and {:?}",
        a.shape(),
        b.shape()
    );
    let batch = broadcast_shapes(&lb, &rb).unwrap_or_else(|| {
        panic!(
            "cannot broadcast matmul batch shapes {:?} and {:?}",
            lb,
            rb
        )
    });

    let lhs = lhs.broadcast_to(&with_matrix(&batch, m, k)).as_contiguous();
    let rhs = rhs.broadcast_to(&with_matrix(&batch, k, n)).as_contiguous();
    let count = volume(&batch);
    tracing::trace!(batch = count, m, k, n, "matmul");

    let (ld, rd) = (lhs.buffer().as_slice(), rhs.buffer().as_slice());
    let mut out = vec![0.0f32; count * m * n];
    for i in 0..count {
        provider().matmul(
            m,
            k,
            n,
            &ld[i * m * k..(i + 1) * m * k],
            &rd[i * k * n..(i + 1) * k * n],
            &mut out[i * m * n..(i + 1) * m * n],
        );
    }

    let mut result = NDArray::new(&with_matrix(&batch, m, n), out);
    if b.ndim() == 1 {
        result = result.squeezed_axis(-1);
    }
    if a.ndim() == 1 {
        result = result.squeezed_axis(if b.ndim() == 1 { -1 } else { -2 });
    }
    result
}

impl NDArray {
    /// Same as [`matmul`].
    pub fn dot(&self, other: &NDArray) -> NDArray {
        matmul(self, other)
    }
}

/// Determinant of every square matrix in the last two axes.
///
/// # Errors
/// [`LinalgError::SingularMatrix`](crate::LinalgError::SingularMatrix) when
/// LU factorization meets a zero pivot.
pub fn determinant(a: &NDArray) -> Result<NDArray> {
    let (batch, n) = split_square(a, "determinant");
    let count = volume(&batch);
    tracing::trace!(batch = count, n, "determinant");
    let data = a.as_contiguous();
    let data = data.buffer().as_slice();

    let mut dets = Vec::with_capacity(count);
    let mut lu = vec![0.0f32; n * n];
    let mut pivots = vec![0usize; n];
    for i in 0..count {
        lu.copy_from_slice(&data[i * n * n..(i + 1) * n * n]);
        provider().lu_factor(n, &mut lu, &mut pivots)?;
        let mut det = 1.0f32;
        for (j, &p) in pivots.iter().enumerate() {
            det *= lu[j * n + j];
            if p != j {
                det = -det;
            }
        }
        dets.push(det);
    }
    Ok(NDArray::new(&batch, dets))
}

/// Inverse of every square matrix in the last two axes.
///
/// # Errors
/// [`LinalgError::SingularMatrix`](crate::LinalgError::SingularMatrix) when
/// LU factorization meets a zero pivot.
pub fn inv(a: &NDArray) -> Result<NDArray> {
    let (batch, n) = split_square(a, "inv");
    let count = volume(&batch);
    tracing::trace!(batch = count, n, "inv");
    let data = a.as_contiguous();
    let data = data.buffer().as_slice();

    let mut out = vec![0.0f32; count * n * n];
    let mut lu = vec![0.0f32; n * n];
    let mut pivots = vec![0usize; n];
    for i in 0..count {
        let range = i * n * n..(i + 1) * n * n;
        lu.copy_from_slice(&data[range.clone()]);
        provider().lu_factor(n, &mut lu, &mut pivots)?;
        provider().lu_inverse(n, &lu, &pivots, &mut out[range])?;
    }
    Ok(NDArray::new(a.shape(), out))
}

/// Singular value decomposition of every matrix in the last two axes.
///
/// With `k = min(m, n)`, `u` has shape `[.., m, m]` and `vt` `[.., n, n]`
/// when `full_matrices` is set, otherwise `[.., m, k]` and `[.., k, n]`.
/// `s` has shape `[.., k]`.
///
/// # Errors
/// Propagates provider failures such as
/// [`LinalgError::NotConverged`](crate::LinalgError::NotConverged).
pub fn svd(a: &NDArray, full_matrices: bool) -> Result<Svd> {
    let (batch, m, n) = split_matrix(a, "svd");
    let k = m.min(n);
    let count = volume(&batch);
    tracing::trace!(batch = count, m, n, full_matrices, "svd");
    let data = a.as_contiguous();
    let data = data.buffer().as_slice();

    let (u_cols, vt_rows) = if full_matrices { (m, n) } else { (k, k) };
    let mut u = Vec::with_capacity(count * m * u_cols);
    let mut s = Vec::with_capacity(count * k);
    let mut vt = Vec::with_capacity(count * vt_rows * n);
    for i in 0..count {
        let f = provider().svd(m, n, &data[i * m * n..(i + 1) * m * n], full_matrices)?;
        debug_assert_eq!((f.u_cols, f.vt_rows), (u_cols, vt_rows));
        u.extend_from_slice(&f.u);
        s.extend_from_slice(&f.s);
        vt.extend_from_slice(&f.vt);
    }

    let mut s_shape = batch.clone();
    s_shape.push(k);
    Ok(Svd {
        u: NDArray::new(&with_matrix(&batch, m, u_cols), u),
        s: NDArray::new(&s_shape, s),
        vt: NDArray::new(&with_matrix(&batch, vt_rows, n), vt),
    })
}

/// Moore-Penrose pseudo-inverse of a matrix.
///
/// Singular values `<= rcond * max(s)` are treated as zero.
///
/// # Panics
/// Panics unless `a` has rank 2.
pub fn pinv(a: &NDArray, rcond: f32) -> Result<NDArray> {
    assert_eq!(a.ndim(), 2, "pinv needs a matrix, got shape {:?}", a.shape());
    let Svd { u, s, vt } = svd(a, false)?;
    if s.is_empty() {
        return Ok(NDArray::zeros(&[a.shape()[1], a.shape()[0]]));
    }
    let cutoff = rcond * s.max();
    let s_inv = s.map_elements(|x| if x > cutoff { 1.0 / x } else { 0.0 });
    Ok(matmul(&vt.transposed(), &(&s_inv.expand_dims(-1) * &u.transposed())))
}

/// Number of singular values above `tol`.
///
/// The default tolerance is `max(s) * max(m, n) * f32::EPSILON`. A matrix
/// with fewer than two rows or columns has rank 1 if any element is nonzero,
/// else 0.
///
/// # Panics
/// Panics unless `a` has rank 2.
pub fn matrix_rank(a: &NDArray, tol: Option<f32>) -> Result<usize> {
    assert_eq!(
        a.ndim(),
        2,
        "matrix_rank needs a matrix, got shape {:?}",
        a.shape()
    );
    let (m, n) = (a.shape()[0], a.shape()[1]);
    if m < 2 || n < 2 {
        return Ok(usize::from(a.elements().iter().any(|&x| x != 0.0)));
    }
    let s = svd(a, false)?.s.elements();
    let tol = tol.unwrap_or_else(|| {
        let s_max = s.iter().copied().fold(0.0f32, f32::max);
        s_max * m.max(n) as f32 * f32::EPSILON
    });
    Ok(s.iter().filter(|&&x| x > tol).count())
}

/// Covariance matrix. Each row of `a` is a variable and each column an
/// observation; a rank-1 argument is a single variable.
///
/// Normalized by the number of observations.
///
/// # Panics
/// Panics unless `a` has rank 1 or 2.
pub fn cov(a: &NDArray) -> NDArray {
    let x = match a.ndim() {
        1 => a.expand_dims(0),
        2 => a.clone(),
        _ => panic!("cov needs a rank-1 or rank-2 array, got shape {:?}", a.shape()),
    };
    let centered = &x - &x.mean_axis(1, true);
    let n = x.shape()[1] as f32;
    matmul(&centered, &centered.transposed()) / n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LinalgError;
    use approx::assert_abs_diff_eq;

    fn assert_close(a: &NDArray, b: &NDArray, eps: f32) {
        assert_eq!(a.shape(), b.shape());
        for (x, y) in a.elements().iter().zip(b.elements()) {
            assert_abs_diff_eq!(*x, y, epsilon = eps);
        }
    }

    fn m(rows: usize, cols: usize, data: &[f32]) -> NDArray {
        NDArray::new(&[rows, cols], data.to_vec())
    }

    #[test]
    fn test_matmul_shapes() {
        let a = NDArray::range(6).reshaped(&[2, 3]);
        let b = NDArray::range(6).reshaped(&[3, 2]);
        let c = matmul(&a, &b);
        assert_eq!(c.elements(), vec![10.0, 13.0, 28.0, 40.0]);

        let v = NDArray::from_vec(vec![1.0, 1.0, 1.0]);
        assert_eq!(matmul(&a, &v).elements(), vec![3.0, 12.0]);
        assert_eq!(matmul(&v, &b).elements(), vec![6.0, 9.0]);
        assert_eq!(matmul(&v, &v).shape(), &[] as &[usize]);
        assert_eq!(matmul(&v, &v).as_scalar(), 3.0);
    }

    #[test]
    fn test_matmul_batch_broadcast() {
        let a = NDArray::range(12).reshaped(&[2, 2, 3]);
        let b = NDArray::range(6).reshaped(&[3, 2]);
        let c = matmul(&a, &b);
        assert_eq!(c.shape(), &[2, 2, 2]);
        assert_eq!(&c.elements()[..4], &[10.0, 13.0, 28.0, 40.0]);
        let t = matmul(&b.transposed(), &a.swap_axes(-1, -2));
        assert_eq!(t.shape(), &[2, 2, 2]);
        assert_eq!(t.get(crate::s![1]).transposed(), c.get(crate::s![1]));
    }

    #[test]
    #[should_panic(expected = "inner dimensions differ")]
    fn test_matmul_mismatch() {
        matmul(&NDArray::zeros(&[2, 3]), &NDArray::zeros(&[2, 3]));
    }

    #[test]
    fn test_determinant() {
        let d = determinant(&m(2, 2, &[1.0, 2.0, 3.0, 4.0])).unwrap();
        assert!(d.is_scalar());
        assert_abs_diff_eq!(d.as_scalar(), -2.0, epsilon = 1e-5);
        let d = determinant(&m(3, 3, &[0.0, 2.0, 1.0, 1.0, 2.0, 0.0, 0.0, 0.0, 1.0])).unwrap();
        assert_abs_diff_eq!(d.as_scalar(), -2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_inverse() {
        let a = m(3, 3, &[1.0, 2.0, 3.0, 1.0, 3.0, 5.0, 2.0, 4.0, 5.0]);
        let ai = inv(&a).unwrap();
        let expected = m(3, 3, &[5.0, -2.0, -1.0, -5.0, 1.0, 2.0, 2.0, 0.0, -1.0]);
        assert_close(&ai, &expected, 1e-5);
        assert_close(&matmul(&a, &ai), &NDArray::eye(3), 1e-5);
    }

    #[test]
    fn test_singular() {
        let a = m(3, 3, &[1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 1.0, 1.0, 1.0]);
        assert_eq!(inv(&a).unwrap_err(), LinalgError::SingularMatrix);
        assert_eq!(determinant(&a).unwrap_err(), LinalgError::SingularMatrix);
    }

    #[test]
    fn test_svd_reconstructs() {
        let a = m(3, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let Svd { u, s, vt } = svd(&a, false).unwrap();
        assert_eq!(u.shape(), &[3, 2]);
        assert_eq!(s.shape(), &[2]);
        assert_eq!(vt.shape(), &[2, 2]);
        let r = matmul(&(&u * &s), &vt);
        assert_close(&r, &a, 1e-4);

        let full = svd(&a.transposed(), true).unwrap();
        assert_eq!(full.u.shape(), &[2, 2]);
        assert_eq!(full.vt.shape(), &[3, 3]);
    }

    #[test]
    fn test_pinv_and_rank() {
        let a = m(3, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let p = pinv(&a, 1e-5).unwrap();
        assert_eq!(p.shape(), &[2, 3]);
        assert_close(&matmul(&matmul(&a, &p), &a), &a, 1e-4);
        assert_eq!(matrix_rank(&a, None).unwrap(), 2);
        let r1 = m(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        assert_eq!(matrix_rank(&r1, None).unwrap(), 1);
        assert_eq!(matrix_rank(&NDArray::zeros(&[1, 3]), None).unwrap(), 0);
        assert_eq!(matrix_rank(&m(1, 2, &[0.0, 1.0]), None).unwrap(), 1);
    }

    #[test]
    fn test_cov() {
        let a = m(2, 3, &[0.0, 1.0, 2.0, 2.0, 1.0, 0.0]);
        let c = cov(&a);
        let expected = m(2, 2, &[2.0 / 3.0, -2.0 / 3.0, -2.0 / 3.0, 2.0 / 3.0]);
        assert_close(&c, &expected, 1e-6);
        assert_eq!(cov(&NDArray::from_vec(vec![1.0, 3.0])).elements(), vec![1.0]);
    }
}
