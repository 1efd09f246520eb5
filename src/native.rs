//! Hand-rolled provider: plain loops, LU with partial pivoting, and a
//! one-sided Jacobi SVD.
//!
//! Unit-stride runs are handed to the compiler as slices so the elementwise
//! loops auto-vectorize; other strides go through the span accessors.

use crate::provider::{
    BinaryOp, IndexReduceOp, ReduceOp, Span, SpanMut, SvdFactors, UnaryOp, VectorMathProvider,
};
use crate::{LinalgError, Result};

/// Sweeps of the Jacobi SVD before giving up.
const MAX_SWEEPS: usize = 64;

/// Relative off-diagonal threshold below which two columns count as orthogonal.
const JACOBI_TOL: f64 = 1e-15;

/// Loop-based [`VectorMathProvider`] with no external dependencies.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeProvider;

impl NativeProvider {
    pub const fn new() -> Self {
        NativeProvider
    }
}

impl VectorMathProvider for NativeProvider {
    fn unary(&self, op: UnaryOp, src: Span<'_>, dst: &mut SpanMut<'_>) {
        assert_eq!(src.len(), dst.len(), "unary span length mismatch");
        if let Some(s) = src.as_slice() {
            if let Some(d) = dst.as_mut_slice() {
                for (d, &x) in d.iter_mut().zip(s) {
                    *d = op.apply(x);
                }
                return;
            }
        }
        for i in 0..src.len() {
            dst.set(i, op.apply(src.get(i)));
        }
    }

    fn binary(&self, op: BinaryOp, lhs: Span<'_>, rhs: Span<'_>, dst: &mut SpanMut<'_>) {
        assert!(
            lhs.len() == rhs.len() && lhs.len() == dst.len(),
            "binary span length mismatch: {} {} {}",
            lhs.len(),
            rhs.len(),
            dst.len()
        );
        if let (Some(a), Some(b)) = (lhs.as_slice(), rhs.as_slice()) {
            if let Some(d) = dst.as_mut_slice() {
                for ((d, &x), &y) in d.iter_mut().zip(a).zip(b) {
                    *d = op.apply(x, y);
                }
                return;
            }
        }
        for i in 0..lhs.len() {
            dst.set(i, op.apply(lhs.get(i), rhs.get(i)));
        }
    }

    fn reduce(&self, op: ReduceOp, src: Span<'_>) -> f32 {
        assert!(!src.is_empty(), "cannot reduce an empty run");
        match op {
            ReduceOp::Sum => src.iter().sum(),
            ReduceOp::Mean => src.iter().sum::<f32>() / src.len() as f32,
            ReduceOp::SumOfSquares => src.iter().map(|x| x * x).sum(),
            ReduceOp::Min => src.iter().fold(f32::INFINITY, f32::min),
            ReduceOp::Max => src.iter().fold(f32::NEG_INFINITY, f32::max),
        }
    }

    fn index_reduce(&self, op: IndexReduceOp, src: Span<'_>) -> (f32, isize) {
        assert!(!src.is_empty(), "cannot reduce an empty run");
        let mut best = src.get(0);
        let mut best_i = 0usize;
        for i in 1..src.len() {
            let x = src.get(i);
            let better = match op {
                IndexReduceOp::ArgMin => x < best,
                IndexReduceOp::ArgMax => x > best,
            };
            if better {
                best = x;
                best_i = i;
            }
        }
        (best, best_i as isize * src.stride())
    }

    fn matmul(&self, m: usize, k: usize, n: usize, a: &[f32], b: &[f32], c: &mut [f32]) {
        assert!(
            a.len() >= m * k && b.len() >= k * n && c.len() >= m * n,
            "matmul buffers too small for {}x{} * {}x{}",
            m,
            k,
            k,
            n
        );
        c[..m * n].fill(0.0);
        for i in 0..m {
            let c_row = &mut c[i * n..(i + 1) * n];
            for p in 0..k {
                let aip = a[i * k + p];
                if aip == 0.0 {
                    continue;
                }
                let b_row = &b[p * n..(p + 1) * n];
                for (c, &b) in c_row.iter_mut().zip(b_row) {
                    *c += aip * b;
                }
            }
        }
    }

    fn lu_factor(&self, n: usize, a: &mut [f32], pivots: &mut [usize]) -> Result<()> {
        if a.len() < n * n {
            return Err(LinalgError::InvalidArgument {
                routine: "lu_factor",
                position: 2,
            });
        }
        if pivots.len() < n {
            return Err(LinalgError::InvalidArgument {
                routine: "lu_factor",
                position: 3,
            });
        }
        for col in 0..n {
            let mut p = col;
            let mut p_abs = a[col * n + col].abs();
            for row in col + 1..n {
                let v = a[row * n + col].abs();
                if v > p_abs {
                    p = row;
                    p_abs = v;
                }
            }
            pivots[col] = p;
            if p_abs == 0.0 {
                return Err(LinalgError::SingularMatrix);
            }
            if p != col {
                for j in 0..n {
                    a.swap(col * n + j, p * n + j);
                }
            }
            let d = a[col * n + col];
            for row in col + 1..n {
                let factor = a[row * n + col] / d;
                a[row * n + col] = factor;
                if factor != 0.0 {
                    for j in col + 1..n {
                        a[row * n + j] -= factor * a[col * n + j];
                    }
                }
            }
        }
        Ok(())
    }

    fn lu_inverse(&self, n: usize, lu: &[f32], pivots: &[usize], out: &mut [f32]) -> Result<()> {
        if lu.len() < n * n {
            return Err(LinalgError::InvalidArgument {
                routine: "lu_inverse",
                position: 2,
            });
        }
        if out.len() < n * n {
            return Err(LinalgError::InvalidArgument {
                routine: "lu_inverse",
                position: 4,
            });
        }
        if (0..n).any(|i| lu[i * n + i] == 0.0) {
            return Err(LinalgError::SingularMatrix);
        }

        let mut x = vec![0.0f32; n];
        for col in 0..n {
            // P * e_col
            x.fill(0.0);
            x[col] = 1.0;
            for (i, &p) in pivots.iter().enumerate().take(n) {
                x.swap(i, p);
            }
            // L y = P e (unit diagonal)
            for i in 0..n {
                let mut acc = x[i];
                for j in 0..i {
                    acc -= lu[i * n + j] * x[j];
                }
                x[i] = acc;
            }
            // U x = y
            for i in (0..n).rev() {
                let mut acc = x[i];
                for j in i + 1..n {
                    acc -= lu[i * n + j] * x[j];
                }
                x[i] = acc / lu[i * n + i];
            }
            for i in 0..n {
                out[i * n + col] = x[i];
            }
        }
        Ok(())
    }

    fn svd(&self, m: usize, n: usize, a: &[f32], full_matrices: bool) -> Result<SvdFactors> {
        if a.len() < m * n {
            return Err(LinalgError::InvalidArgument {
                routine: "svd",
                position: 3,
            });
        }
        if a[..m * n].iter().any(|x| x.is_nan()) {
            return Err(LinalgError::InvalidArgument {
                routine: "svd",
                position: 3,
            });
        }
        let k = m.min(n);

        // Jacobi works on the columns of a tall matrix; transpose wide input.
        let tall = m >= n;
        let (rows, cols) = if tall { (m, n) } else { (n, m) };
        let mut w: Vec<Vec<f64>> = (0..cols)
            .map(|j| {
                (0..rows)
                    .map(|i| {
                        let v = if tall { a[i * n + j] } else { a[j * n + i] };
                        v as f64
                    })
                    .collect()
            })
            .collect();
        let mut v: Vec<Vec<f64>> = (0..cols)
            .map(|j| (0..cols).map(|i| if i == j { 1.0 } else { 0.0 }).collect())
            .collect();

        jacobi_sweeps(&mut w, &mut v)?;

        let mut order: Vec<(f64, usize)> =
            w.iter().enumerate().map(|(j, c)| (norm(c), j)).collect();
        order.sort_by(|x, y| y.0.total_cmp(&x.0));

        let sigma_max = order.first().map_or(0.0, |o| o.0);
        let cutoff = sigma_max * rows as f64 * f64::EPSILON;

        // Left vectors of the tall problem, right vectors from the rotations.
        let mut left: Vec<Vec<f64>> = Vec::with_capacity(rows);
        let mut right: Vec<Vec<f64>> = Vec::with_capacity(cols);
        let mut s = Vec::with_capacity(k);
        for &(sigma, j) in &order {
            s.push(sigma as f32);
            right.push(v[j].clone());
            if sigma > cutoff {
                left.push(w[j].iter().map(|x| x / sigma).collect());
            } else {
                left.push(Vec::new());
            }
        }
        complete_basis(&mut left, rows, if full_matrices { rows } else { cols });
        complete_basis(&mut right, cols, cols);

        // Map back: A = L S R^T when tall, A^T = L S R^T otherwise.
        let (u_vecs, v_vecs) = if tall { (left, right) } else { (right, left) };
        let u_cols = if full_matrices { m } else { k };
        let vt_rows = if full_matrices { n } else { k };

        let mut u = vec![0.0f32; m * u_cols];
        for (j, col) in u_vecs.iter().take(u_cols).enumerate() {
            for i in 0..m {
                u[i * u_cols + j] = col[i] as f32;
            }
        }
        let mut vt = vec![0.0f32; vt_rows * n];
        for (j, col) in v_vecs.iter().take(vt_rows).enumerate() {
            for i in 0..n {
                vt[j * n + i] = col[i] as f32;
            }
        }

        Ok(SvdFactors {
            u,
            u_cols,
            s,
            vt,
            vt_rows,
        })
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

/// One-sided Jacobi rotations until every column pair of `w` is orthogonal.
/// The same rotations are accumulated into `v`.
fn jacobi_sweeps(w: &mut [Vec<f64>], v: &mut [Vec<f64>]) -> Result<()> {
    let cols = w.len();
    for sweep in 0..MAX_SWEEPS {
        let mut rotated = false;
        for i in 0..cols {
            for j in i + 1..cols {
                let alpha = dot(&w[i], &w[i]);
                let beta = dot(&w[j], &w[j]);
                let gamma = dot(&w[i], &w[j]);
                if gamma == 0.0 || gamma.abs() <= JACOBI_TOL * (alpha * beta).sqrt() {
                    continue;
                }
                rotated = true;
                let zeta = (beta - alpha) / (2.0 * gamma);
                let t = zeta.signum() / (zeta.abs() + (1.0 + zeta * zeta).sqrt());
                let c = 1.0 / (1.0 + t * t).sqrt();
                let s = c * t;
                rotate(w, i, j, c, s);
                rotate(v, i, j, c, s);
            }
        }
        if !rotated {
            tracing::trace!(sweeps = sweep + 1, "jacobi svd converged");
            return Ok(());
        }
    }
    Err(LinalgError::NotConverged)
}

fn rotate(m: &mut [Vec<f64>], i: usize, j: usize, c: f64, s: f64) {
    let (head, tail) = m.split_at_mut(j);
    let (ci, cj) = (&mut head[i], &mut tail[0]);
    for (x, y) in ci.iter_mut().zip(cj.iter_mut()) {
        let (a, b) = (*x, *y);
        *x = c * a - s * b;
        *y = s * a + c * b;
    }
}

/// Fill empty entries of `vecs` and extend it to `want` entries so that the
/// result is an orthonormal set in `dim` dimensions.
///
/// Candidates are the standard basis vectors, orthogonalized twice against
/// the vectors already present.
fn complete_basis(vecs: &mut Vec<Vec<f64>>, dim: usize, want: usize) {
    let mut candidate = 0;
    let mut next_unit = |present: &[Vec<f64>]| -> Vec<f64> {
        while candidate < dim {
            let mut e = vec![0.0; dim];
            e[candidate] = 1.0;
            candidate += 1;
            for _ in 0..2 {
                for q in present.iter().filter(|q| !q.is_empty()) {
                    let p = dot(&e, q);
                    for (x, y) in e.iter_mut().zip(q) {
                        *x -= p * y;
                    }
                }
            }
            let len = norm(&e);
            if len > 1e-6 {
                return e.into_iter().map(|x| x / len).collect();
            }
        }
        vec![0.0; dim]
    };

    for idx in 0..vecs.len() {
        if vecs[idx].is_empty() {
            let unit = next_unit(vecs);
            vecs[idx] = unit;
        }
    }
    while vecs.len() < want {
        let unit = next_unit(vecs);
        vecs.push(unit);
    }
}
