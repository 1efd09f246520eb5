//! faer-backed provider.
//!
//! Matrix multiplication goes through `faer::linalg::matmul::matmul_with_conj`;
//! everything else is delegated to [`NativeProvider`].

use crate::native::NativeProvider;
use crate::provider::{
    BinaryOp, IndexReduceOp, ReduceOp, Span, SpanMut, SvdFactors, UnaryOp, VectorMathProvider,
};
use crate::Result;
use faer::linalg::matmul::matmul_with_conj;
use faer::mat::{MatMut, MatRef};
use faer::{Accum, Conj, Par};

/// [`VectorMathProvider`] using faer's GEMM kernel.
#[derive(Clone, Copy, Debug, Default)]
pub struct FaerProvider {
    native: NativeProvider,
}

impl FaerProvider {
    pub const fn new() -> Self {
        FaerProvider {
            native: NativeProvider::new(),
        }
    }
}

impl VectorMathProvider for FaerProvider {
    fn unary(&self, op: UnaryOp, src: Span<'_>, dst: &mut SpanMut<'_>) {
        self.native.unary(op, src, dst)
    }

    fn binary(&self, op: BinaryOp, lhs: Span<'_>, rhs: Span<'_>, dst: &mut SpanMut<'_>) {
        self.native.binary(op, lhs, rhs, dst)
    }

    fn reduce(&self, op: ReduceOp, src: Span<'_>) -> f32 {
        self.native.reduce(op, src)
    }

    fn index_reduce(&self, op: IndexReduceOp, src: Span<'_>) -> (f32, isize) {
        self.native.index_reduce(op, src)
    }

    fn matmul(&self, m: usize, k: usize, n: usize, a: &[f32], b: &[f32], c: &mut [f32]) {
        assert!(
            a.len() == m * k && b.len() == k * n && c.len() == m * n,
            "matmul buffer sizes {} {} {} do not match {}x{}x{}",
            a.len(),
            b.len(),
            c.len(),
            m,
            k,
            n
        );
        if m == 0 || n == 0 {
            return;
        }
        if k == 0 {
            c.fill(0.0);
            return;
        }
        // SAFETY: lengths checked above; all three are row-major and `c`
        // does not alias `a` or `b`.
        unsafe {
            let a_mat: MatRef<'_, f32> = MatRef::from_raw_parts(a.as_ptr(), m, k, k as isize, 1);
            let b_mat: MatRef<'_, f32> = MatRef::from_raw_parts(b.as_ptr(), k, n, n as isize, 1);
            let c_mat: MatMut<'_, f32> =
                MatMut::from_raw_parts_mut(c.as_mut_ptr(), m, n, n as isize, 1);
            matmul_with_conj(
                c_mat,
                Accum::Replace,
                a_mat,
                Conj::No,
                b_mat,
                Conj::No,
                1.0f32,
                Par::Seq,
            );
        }
    }

    fn lu_factor(&self, n: usize, a: &mut [f32], pivots: &mut [usize]) -> Result<()> {
        self.native.lu_factor(n, a, pivots)
    }

    fn lu_inverse(&self, n: usize, lu: &[f32], pivots: &[usize], out: &mut [f32]) -> Result<()> {
        self.native.lu_inverse(n, lu, pivots, out)
    }

    fn svd(&self, m: usize, n: usize, a: &[f32], full_matrices: bool) -> Result<SvdFactors> {
        self.native.svd(m, n, a, full_matrices)
    }
}
