//! Numeric backend abstraction.
//!
//! The dispatch layer never computes anything itself. It arranges strided
//! runs into [`Span`]/[`SpanMut`] descriptors and hands them to a
//! [`VectorMathProvider`] together with a tagged operation ([`UnaryOp`],
//! [`BinaryOp`], [`ReduceOp`], [`IndexReduceOp`]). Matrix multiplication and
//! the LU/SVD decompositions go through the same trait.
//!
//! [`ActiveProvider`] is the single point of backend selection based on Cargo
//! features, and [`provider()`] returns the process-wide instance used by the
//! array API.

use std::marker::PhantomData;

use crate::Result;

// ============================================================================
// Span descriptors
// ============================================================================

fn check_span(data_len: usize, start: usize, stride: isize, len: usize) {
    if len == 0 {
        return;
    }
    let last = start as isize + stride * (len as isize - 1);
    assert!(
        start < data_len && last >= 0 && (last as usize) < data_len,
        "span start={} stride={} len={} out of bounds for buffer of {}",
        start,
        stride,
        len,
        data_len
    );
}

/// Read-only strided run `data[start + i * stride]` for `i in 0..len`.
#[derive(Clone, Copy, Debug)]
pub struct Span<'a> {
    data: &'a [f32],
    start: usize,
    stride: isize,
    len: usize,
}

impl<'a> Span<'a> {
    /// # Panics
    /// Panics if the first or last element falls outside `data`.
    pub fn new(data: &'a [f32], start: usize, stride: isize, len: usize) -> Self {
        check_span(data.len(), start, stride, len);
        Self {
            data,
            start,
            stride,
            len,
        }
    }

    /// The whole slice as a unit-stride span.
    pub fn contiguous(data: &'a [f32]) -> Self {
        Self::new(data, 0, 1, data.len())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn stride(&self) -> isize {
        self.stride
    }

    #[inline]
    pub fn get(&self, i: usize) -> f32 {
        debug_assert!(i < self.len, "span index {} >= len {}", i, self.len);
        self.data[(self.start as isize + i as isize * self.stride) as usize]
    }

    /// The run as a plain slice when it has unit stride.
    #[inline]
    pub fn as_slice(&self) -> Option<&'a [f32]> {
        match (self.stride, self.len) {
            (_, 0) => Some(&[]),
            (1, len) => Some(&self.data[self.start..self.start + len]),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = f32> + 'a {
        let span = *self;
        (0..span.len).map(move |i| span.get(i))
    }
}

/// Writable strided run.
///
/// Holds a raw pointer so that several spans over disjoint positions of one
/// buffer can be handed to different workers. The bounds of the run are
/// validated on construction, so every position `0..len` is in bounds.
#[derive(Debug)]
pub struct SpanMut<'a> {
    ptr: *mut f32,
    start: usize,
    stride: isize,
    len: usize,
    _marker: PhantomData<&'a mut [f32]>,
}

impl<'a> SpanMut<'a> {
    /// # Panics
    /// Panics if the first or last element falls outside `data`.
    pub fn new(data: &'a mut [f32], start: usize, stride: isize, len: usize) -> Self {
        check_span(data.len(), start, stride, len);
        Self {
            ptr: data.as_mut_ptr(),
            start,
            stride,
            len,
            _marker: PhantomData,
        }
    }

    /// The whole slice as a unit-stride span.
    pub fn contiguous(data: &'a mut [f32]) -> Self {
        let len = data.len();
        Self::new(data, 0, 1, len)
    }

    /// # Safety
    /// `ptr` must be valid for writes over `data_len` elements for `'a`, and
    /// no other live reference may access the positions this span covers.
    pub(crate) unsafe fn from_raw_parts(
        ptr: *mut f32,
        data_len: usize,
        start: usize,
        stride: isize,
        len: usize,
    ) -> Self {
        check_span(data_len, start, stride, len);
        Self {
            ptr,
            start,
            stride,
            len,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn position(&self, i: usize) -> usize {
        debug_assert!(i < self.len, "span index {} >= len {}", i, self.len);
        (self.start as isize + i as isize * self.stride) as usize
    }

    #[inline]
    pub fn get(&self, i: usize) -> f32 {
        let pos = self.position(i);
        // SAFETY: positions 0..len were bounds-checked at construction.
        unsafe { *self.ptr.add(pos) }
    }

    #[inline]
    pub fn set(&mut self, i: usize, value: f32) {
        let pos = self.position(i);
        // SAFETY: positions 0..len were bounds-checked at construction.
        unsafe { *self.ptr.add(pos) = value }
    }

    /// The run as a plain mutable slice when it has unit stride.
    #[inline]
    pub fn as_mut_slice(&mut self) -> Option<&mut [f32]> {
        match (self.stride, self.len) {
            (_, 0) => Some(&mut []),
            // SAFETY: the run [start, start + len) was bounds-checked and is
            // exclusively owned by this span.
            (1, len) => Some(unsafe { std::slice::from_raw_parts_mut(self.ptr.add(self.start), len) }),
            _ => None,
        }
    }
}

// ============================================================================
// Operation tags
// ============================================================================

/// Elementwise single-argument operations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UnaryOp {
    /// Plain copy; used for gathers.
    Identity,
    Neg,
    Abs,
    Sqrt,
    Square,
    Recip,
    Exp,
    Log,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Floor,
    Ceil,
    /// Round half to even.
    Round,
    AddScalar(f32),
    /// `x - c`
    SubScalar(f32),
    /// `c - x`
    ScalarSub(f32),
    MulScalar(f32),
    /// `x / c`
    DivScalar(f32),
    /// `c / x`
    ScalarDiv(f32),
    /// `x ^ c`
    PowScalar(f32),
    /// `c ^ x`
    ScalarPow(f32),
    Clip { low: f32, high: f32 },
}

impl UnaryOp {
    #[inline]
    pub fn apply(self, x: f32) -> f32 {
        match self {
            UnaryOp::Identity => x,
            UnaryOp::Neg => -x,
            UnaryOp::Abs => x.abs(),
            UnaryOp::Sqrt => x.sqrt(),
            UnaryOp::Square => x * x,
            UnaryOp::Recip => x.recip(),
            UnaryOp::Exp => x.exp(),
            UnaryOp::Log => x.ln(),
            UnaryOp::Sin => x.sin(),
            UnaryOp::Cos => x.cos(),
            UnaryOp::Tan => x.tan(),
            UnaryOp::Asin => x.asin(),
            UnaryOp::Acos => x.acos(),
            UnaryOp::Atan => x.atan(),
            UnaryOp::Sinh => x.sinh(),
            UnaryOp::Cosh => x.cosh(),
            UnaryOp::Tanh => x.tanh(),
            UnaryOp::Floor => x.floor(),
            UnaryOp::Ceil => x.ceil(),
            UnaryOp::Round => x.round_ties_even(),
            UnaryOp::AddScalar(c) => x + c,
            UnaryOp::SubScalar(c) => x - c,
            UnaryOp::ScalarSub(c) => c - x,
            UnaryOp::MulScalar(c) => x * c,
            UnaryOp::DivScalar(c) => x / c,
            UnaryOp::ScalarDiv(c) => c / x,
            UnaryOp::PowScalar(c) => x.powf(c),
            UnaryOp::ScalarPow(c) => c.powf(x),
            UnaryOp::Clip { low, high } => x.max(low).min(high),
        }
    }
}

/// Elementwise two-argument operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Min,
    Max,
    /// `lhs ^ rhs`
    Pow,
    /// Magnitude of `lhs` with the sign of `rhs`.
    CopySign,
}

impl BinaryOp {
    #[inline]
    pub fn apply(self, a: f32, b: f32) -> f32 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Min => a.min(b),
            BinaryOp::Max => a.max(b),
            BinaryOp::Pow => a.powf(b),
            BinaryOp::CopySign => a.copysign(b),
        }
    }
}

/// Folds of a strided run into one value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReduceOp {
    Sum,
    Mean,
    Min,
    Max,
    SumOfSquares,
}

/// Folds that also report where the extreme value sits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexReduceOp {
    ArgMin,
    ArgMax,
}

/// Singular value decomposition of one row-major `m x n` matrix.
///
/// `u` is `m x u_cols`, `vt` is `vt_rows x n`, both row-major, and `s` holds
/// `min(m, n)` singular values in descending order.
#[derive(Clone, Debug, PartialEq)]
pub struct SvdFactors {
    pub u: Vec<f32>,
    pub u_cols: usize,
    pub s: Vec<f32>,
    pub vt: Vec<f32>,
    pub vt_rows: usize,
}

// ============================================================================
// Provider trait
// ============================================================================

/// Single-precision numeric backend.
///
/// Kernels receive runs that the dispatch layer has already bounds-checked.
/// Implementations must be `Send + Sync` because large passes call into the
/// provider from several worker threads at once.
pub trait VectorMathProvider: Send + Sync {
    /// `dst[i] = op(src[i])`. Both spans have the same length.
    fn unary(&self, op: UnaryOp, src: Span<'_>, dst: &mut SpanMut<'_>);

    /// `dst[i] = op(lhs[i], rhs[i])`. All spans have the same length.
    fn binary(&self, op: BinaryOp, lhs: Span<'_>, rhs: Span<'_>, dst: &mut SpanMut<'_>);

    /// Fold a non-empty run.
    fn reduce(&self, op: ReduceOp, src: Span<'_>) -> f32;

    /// Extreme value of a non-empty run and its physical offset from the
    /// start of the run (`index * stride`). Ties resolve to the first index.
    fn index_reduce(&self, op: IndexReduceOp, src: Span<'_>) -> (f32, isize);

    /// `c = a * b` for row-major `a: m x k`, `b: k x n`, `c: m x n`.
    fn matmul(&self, m: usize, k: usize, n: usize, a: &[f32], b: &[f32], c: &mut [f32]);

    /// In-place LU factorization with partial pivoting of a row-major `n x n`
    /// matrix. `pivots[i]` receives the row swapped with row `i`.
    fn lu_factor(&self, n: usize, a: &mut [f32], pivots: &mut [usize]) -> Result<()>;

    /// Inverse of a matrix from its [`lu_factor`](Self::lu_factor) output.
    fn lu_inverse(&self, n: usize, lu: &[f32], pivots: &[usize], out: &mut [f32]) -> Result<()>;

    /// Singular value decomposition of a row-major `m x n` matrix.
    fn svd(&self, m: usize, n: usize, a: &[f32], full_matrices: bool) -> Result<SvdFactors>;
}

// ============================================================================
// Backend selection
// ============================================================================

/// Provider used by the array API. Chosen by Cargo features.
#[cfg(feature = "faer")]
pub type ActiveProvider = crate::faer_provider::FaerProvider;

/// Provider used by the array API. Chosen by Cargo features.
#[cfg(not(feature = "faer"))]
pub type ActiveProvider = crate::native::NativeProvider;

static PROVIDER: ActiveProvider = ActiveProvider::new();

/// Process-wide provider instance.
#[inline]
pub fn provider() -> &'static ActiveProvider {
    &PROVIDER
}
