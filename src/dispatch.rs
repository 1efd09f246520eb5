//! Dispatch layer: turns strided layouts into provider calls.
//!
//! Elementwise passes pick one of four [`Path`]s:
//!
//! - [`Path::Contiguous`]: the operands are canonical row-major, so the whole
//!   pass is one unit-stride run (split across workers when large).
//! - [`Path::Dense`]: the input strides are a permutation of a contiguous
//!   layout. The physical footprint is one run; the kernel walks it in memory
//!   order and the output keeps the input's strides over a fresh buffer.
//! - [`Path::Block`]: the innermost axes that fold into one arithmetic run form
//!   a block; the remaining outer axes are walked with an offset odometer and
//!   the provider is called once per block.
//! - [`Path::Gathered`]: blocks would be shorter than [`MIN_BLOCK_LEN`], so the
//!   operands are gathered into contiguous scratch first and the kernel runs
//!   once over the whole pass.
//!
//! Every entry point is generic over the provider so tests and benchmarks can
//! substitute their own backend. The `*_gathered` functions skip every fast
//! path; they are the reference the fast paths must agree with.

use crate::array::NDArray;
use crate::broadcast::broadcast_pair;
use crate::buffer::Buffer;
use crate::iter::{offsets, MultiOffsetIter, OffsetIter};
use crate::layout::{
    contiguous_strides, dense_data_count, is_dense, least_stride_axis, offset_bounds, run_stride,
    strided_dims, strided_dims_from, volume,
};
use crate::provider::{BinaryOp, IndexReduceOp, ReduceOp, Span, SpanMut, UnaryOp, VectorMathProvider};
use crate::threading::{for_each_chunk, SendPtr};

/// Blocks shorter than this are not worth one provider call each.
pub const MIN_BLOCK_LEN: usize = 4;

/// Code path an elementwise pass takes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Path {
    Contiguous,
    Dense,
    Block,
    Gathered,
}

// ============================================================================
// Block plans
// ============================================================================

/// Split of a shape into outer axes and one foldable block of inner axes,
/// carrying `N` stride vectors (operands and destination) in lockstep.
struct BlockPlan<const N: usize> {
    outer_shape: Vec<usize>,
    outer_strides: [Vec<isize>; N],
    block_len: usize,
    run_strides: [isize; N],
}

impl<const N: usize> BlockPlan<N> {
    /// Fold axes `axis + 1 - dims ..= axis` into the block.
    fn new(shape: &[usize], strides: [&[isize]; N], axis: usize, dims: usize) -> Self {
        let first = axis + 1 - dims;
        let outer = |i: &usize| *i < first || *i > axis;
        let outer_shape = (0..shape.len()).filter(outer).map(|i| shape[i]).collect();
        let outer_strides =
            std::array::from_fn(|k| (0..shape.len()).filter(outer).map(|i| strides[k][i]).collect());
        let run_strides = std::array::from_fn(|k| run_stride(shape, strides[k], axis, dims));
        Self {
            outer_shape,
            outer_strides,
            block_len: volume(&shape[first..=axis]),
            run_strides,
        }
    }

    /// Number of blocks.
    fn count(&self) -> usize {
        volume(&self.outer_shape)
    }

    /// Block start offsets `start..start + len`, in row-major block order.
    fn offsets(&self, start: usize, len: usize) -> MultiOffsetIter<N> {
        let strides: [&[isize]; N] = std::array::from_fn(|k| self.outer_strides[k].as_slice());
        MultiOffsetIter::with_range(&self.outer_shape, strides, start, len)
    }
}

/// Block plan for reading `a` into a contiguous destination.
///
/// The block is grown outward from the axis with the smallest stride, so a
/// transposed or flipped operand still gets long runs.
fn unary_plan(a: &NDArray) -> BlockPlan<2> {
    let shape = a.shape();
    let masked: Vec<isize> = shape
        .iter()
        .zip(a.strides())
        .map(|(&n, &s)| if n == 1 { isize::MAX } else { s })
        .collect();
    let axis = least_stride_axis(&masked);
    let dims = strided_dims_from(shape, a.strides(), axis);
    let dst = contiguous_strides(shape);
    BlockPlan::new(shape, [a.strides(), &dst], axis, dims)
}

/// Block plan over the trailing axes that both operands can fold.
fn binary_plan(l: &NDArray, r: &NDArray, dst: &[isize]) -> BlockPlan<3> {
    let shape = l.shape();
    let dims = strided_dims(shape, l.strides()).min(strided_dims(shape, r.strides()));
    BlockPlan::new(shape, [l.strides(), r.strides(), dst], shape.len() - 1, dims)
}

/// Path [`map_unary`] takes for `a`.
pub fn unary_path(a: &NDArray) -> Path {
    if a.is_contiguous() {
        Path::Contiguous
    } else if is_dense(a.shape(), a.strides()) {
        Path::Dense
    } else if unary_plan(a).block_len >= MIN_BLOCK_LEN {
        Path::Block
    } else {
        Path::Gathered
    }
}

/// Path [`zip_binary`] takes for `lhs` and `rhs` after broadcasting.
pub fn binary_path(lhs: &NDArray, rhs: &NDArray) -> Path {
    let (l, r) = broadcast_pair(lhs, rhs);
    if l.is_contiguous() && r.is_contiguous() {
        Path::Contiguous
    } else if binary_plan(&l, &r, &contiguous_strides(l.shape())).block_len >= MIN_BLOCK_LEN {
        Path::Block
    } else {
        Path::Gathered
    }
}

#[inline]
fn at(base: usize, offset: isize) -> usize {
    (base as isize + offset) as usize
}

// ============================================================================
// Unary passes
// ============================================================================

/// `dst = op(src)` over two equal-length contiguous slices.
fn unary_contiguous<P>(p: &P, op: UnaryOp, src: &[f32], dst: &mut [f32])
where
    P: VectorMathProvider + ?Sized,
{
    let n = dst.len();
    debug_assert_eq!(src.len(), n);
    let out = SendPtr(dst.as_mut_ptr());
    for_each_chunk(n, n, |start, len| {
        let out = out;
        let src = Span::new(src, start, 1, len);
        // SAFETY: chunks cover disjoint ranges of `dst`, which outlives the pass.
        let mut dst = unsafe { SpanMut::from_raw_parts(out.as_ptr(), n, start, 1, len) };
        p.unary(op, src, &mut dst);
    });
}

/// `dst = op(a)` with `dst` in canonical row-major order.
fn unary_into<P>(p: &P, op: UnaryOp, a: &NDArray, dst: &mut [f32])
where
    P: VectorMathProvider + ?Sized,
{
    let total = dst.len();
    debug_assert_eq!(a.volume(), total);
    if total == 0 {
        return;
    }
    let data = a.buffer().as_slice();
    let base = a.base_offset();
    if a.is_contiguous() {
        unary_contiguous(p, op, &data[base..base + total], dst);
        return;
    }

    let plan = unary_plan(a);
    if plan.block_len < MIN_BLOCK_LEN {
        let scratch: Vec<f32> = offsets(a.shape(), a.strides())
            .map(|o| data[at(base, o)])
            .collect();
        unary_contiguous(p, op, &scratch, dst);
        return;
    }

    let out = SendPtr(dst.as_mut_ptr());
    let [src_stride, dst_stride] = plan.run_strides;
    for_each_chunk(plan.count(), total, |start, len| {
        let out = out;
        for [s, d] in plan.offsets(start, len) {
            let src = Span::new(data, at(base, s), src_stride, plan.block_len);
            // SAFETY: blocks write disjoint positions of `dst`, which outlives the pass.
            let mut dst = unsafe {
                SpanMut::from_raw_parts(out.as_ptr(), total, d as usize, dst_stride, plan.block_len)
            };
            p.unary(op, src, &mut dst);
        }
    });
}

/// Apply `op` to every element of `a`.
///
/// On the dense path the result keeps `a`'s strides; otherwise it is
/// canonical row-major.
pub fn map_unary<P>(p: &P, op: UnaryOp, a: &NDArray) -> NDArray
where
    P: VectorMathProvider + ?Sized,
{
    let shape = a.shape();
    if a.is_empty() {
        return NDArray::from_buffer(shape, Buffer::new(0));
    }
    let path = unary_path(a);
    tracing::debug!(?op, ?shape, ?path, "unary pass");

    if path == Path::Dense {
        if let Some((lo, _)) = offset_bounds(shape, a.strides(), a.base_offset() as isize) {
            let lo = lo as usize;
            let count = dense_data_count(shape, a.strides());
            let mut out = vec![0.0f32; count];
            unary_contiguous(p, op, &a.buffer().as_slice()[lo..lo + count], &mut out);
            return NDArray::with_layout(
                shape.to_vec(),
                a.strides().to_vec(),
                a.base_offset() - lo,
                Buffer::from_vec(out),
            );
        }
    }

    let mut out = vec![0.0f32; a.volume()];
    unary_into(p, op, a, &mut out);
    NDArray::from_buffer(shape, Buffer::from_vec(out))
}

/// Elements of `a` in row-major order.
pub fn gather<P>(p: &P, a: &NDArray) -> Vec<f32>
where
    P: VectorMathProvider + ?Sized,
{
    let mut out = vec![0.0f32; a.volume()];
    unary_into(p, UnaryOp::Identity, a, &mut out);
    out
}

/// Buffer holding the elements of `a` in row-major order.
///
/// When `a` is contiguous and spans its whole buffer the buffer is shared
/// rather than copied, unless `force_unique` asks for a private copy.
pub fn gather_buffer<P>(p: &P, a: &NDArray, force_unique: bool) -> Buffer
where
    P: VectorMathProvider + ?Sized,
{
    let total = a.volume();
    if a.is_contiguous() {
        let base = a.base_offset();
        if !force_unique && base == 0 && total == a.buffer().len() {
            return a.buffer().clone();
        }
        return a.buffer().slice(base..base + total);
    }
    tracing::trace!(shape = ?a.shape(), "gather into fresh buffer");
    Buffer::from_vec(gather(p, a))
}

// ============================================================================
// Binary passes
// ============================================================================

/// `op(lhs, rhs)` with broadcasting. The result is canonical row-major.
///
/// # Panics
/// Panics if the shapes do not broadcast.
pub fn zip_binary<P>(p: &P, op: BinaryOp, lhs: &NDArray, rhs: &NDArray) -> NDArray
where
    P: VectorMathProvider + ?Sized,
{
    let (l, r) = broadcast_pair(lhs, rhs);
    let shape = l.shape();
    let total = l.volume();
    let mut out = vec![0.0f32; total];
    if total == 0 {
        return NDArray::from_buffer(shape, Buffer::from_vec(out));
    }
    let (ld, rd) = (l.buffer().as_slice(), r.buffer().as_slice());
    let (lb, rb) = (l.base_offset(), r.base_offset());

    if l.is_contiguous() && r.is_contiguous() {
        tracing::debug!(?op, ?shape, path = ?Path::Contiguous, "binary pass");
        let dst = SendPtr(out.as_mut_ptr());
        for_each_chunk(total, total, |start, len| {
            let dst = dst;
            let lhs = Span::new(ld, lb + start, 1, len);
            let rhs = Span::new(rd, rb + start, 1, len);
            // SAFETY: chunks cover disjoint ranges of `out`.
            let mut dst = unsafe { SpanMut::from_raw_parts(dst.as_ptr(), total, start, 1, len) };
            p.binary(op, lhs, rhs, &mut dst);
        });
        return NDArray::from_buffer(shape, Buffer::from_vec(out));
    }

    let cs = contiguous_strides(shape);
    let plan = binary_plan(&l, &r, &cs);
    if plan.block_len < MIN_BLOCK_LEN {
        tracing::debug!(?op, ?shape, path = ?Path::Gathered, "binary pass");
        let lg = gather(p, &l);
        let rg = gather(p, &r);
        p.binary(
            op,
            Span::contiguous(&lg),
            Span::contiguous(&rg),
            &mut SpanMut::contiguous(&mut out),
        );
        return NDArray::from_buffer(shape, Buffer::from_vec(out));
    }

    tracing::debug!(?op, ?shape, path = ?Path::Block, block_len = plan.block_len, "binary pass");
    let dst = SendPtr(out.as_mut_ptr());
    let [ls, rs, ds] = plan.run_strides;
    for_each_chunk(plan.count(), total, |start, len| {
        let dst = dst;
        for [lo, ro, d] in plan.offsets(start, len) {
            let lhs = Span::new(ld, at(lb, lo), ls, plan.block_len);
            let rhs = Span::new(rd, at(rb, ro), rs, plan.block_len);
            // SAFETY: blocks write disjoint positions of `out`.
            let mut dst = unsafe {
                SpanMut::from_raw_parts(dst.as_ptr(), total, d as usize, ds, plan.block_len)
            };
            p.binary(op, lhs, rhs, &mut dst);
        }
    });
    NDArray::from_buffer(shape, Buffer::from_vec(out))
}

/// Copy `src` into the positions `(shape, strides, offset)` of `dst`.
///
/// `src` must already have `shape`. Negative strides on either side are
/// honored by the spans themselves.
pub(crate) fn scatter<P>(
    p: &P,
    dst: &mut [f32],
    shape: &[usize],
    strides: &[isize],
    offset: usize,
    src: &NDArray,
) where
    P: VectorMathProvider + ?Sized,
{
    debug_assert_eq!(shape, src.shape());
    let total = volume(shape);
    if total == 0 {
        return;
    }
    let data = src.buffer().as_slice();
    let base = src.base_offset();
    if shape.is_empty() {
        let mut out = SpanMut::new(dst, offset, 1, 1);
        p.unary(UnaryOp::Identity, Span::new(data, base, 1, 1), &mut out);
        return;
    }

    let dims = strided_dims(shape, strides).min(strided_dims(shape, src.strides()));
    let plan = BlockPlan::new(shape, [src.strides(), strides], shape.len() - 1, dims);
    tracing::trace!(?shape, block_len = plan.block_len, "scatter");
    let dst_len = dst.len();
    let out = SendPtr(dst.as_mut_ptr());
    let [ss, ds] = plan.run_strides;
    for_each_chunk(plan.count(), total, |start, len| {
        let out = out;
        for [s, d] in plan.offsets(start, len) {
            let from = Span::new(data, at(base, s), ss, plan.block_len);
            // SAFETY: a subscript selection never visits a position twice, so
            // blocks write disjoint positions of `dst`.
            let mut to = unsafe {
                SpanMut::from_raw_parts(out.as_ptr(), dst_len, at(offset, d), ds, plan.block_len)
            };
            p.unary(UnaryOp::Identity, from, &mut to);
        }
    });
}

// ============================================================================
// Reductions
// ============================================================================

/// Fold every element of `a`.
///
/// An empty array sums to 0 and has a NaN mean.
///
/// # Panics
/// Panics on `Min`/`Max` of an empty array.
pub fn reduce_all<P>(p: &P, op: ReduceOp, a: &NDArray) -> f32
where
    P: VectorMathProvider + ?Sized,
{
    let total = a.volume();
    if total == 0 {
        return match op {
            ReduceOp::Sum | ReduceOp::SumOfSquares => 0.0,
            ReduceOp::Mean => f32::NAN,
            ReduceOp::Min | ReduceOp::Max => {
                panic!("cannot take {:?} of empty array with shape {:?}", op, a.shape())
            }
        };
    }
    if a.is_contiguous() {
        return p.reduce(op, Span::new(a.buffer().as_slice(), a.base_offset(), 1, total));
    }
    // A dense layout without broadcast axes touches every slot of its
    // footprint exactly once. Sums fold in row-major order; only min and max
    // may walk the footprint in memory order.
    let order_free = matches!(op, ReduceOp::Min | ReduceOp::Max);
    if order_free
        && dense_data_count(a.shape(), a.strides()) == total
        && is_dense(a.shape(), a.strides())
    {
        if let Some((lo, _)) = offset_bounds(a.shape(), a.strides(), a.base_offset() as isize) {
            return p.reduce(op, Span::new(a.buffer().as_slice(), lo as usize, 1, total));
        }
    }
    let scratch = gather(p, a);
    p.reduce(op, Span::contiguous(&scratch))
}

/// Shape and strides of `a` with `axis` removed.
fn without_axis(a: &NDArray, axis: usize) -> (Vec<usize>, Vec<isize>) {
    let mut shape = a.shape().to_vec();
    let mut strides = a.strides().to_vec();
    shape.remove(axis);
    strides.remove(axis);
    (shape, strides)
}

fn check_reduce_axis(a: &NDArray, axis: usize) -> usize {
    assert!(
        axis < a.ndim(),
        "axis {} out of range for ndim {}",
        axis,
        a.ndim()
    );
    let n = a.shape()[axis];
    assert!(
        n > 0,
        "cannot reduce along zero-length axis {} of shape {:?}",
        axis,
        a.shape()
    );
    n
}

/// Fold every run along `axis`.
///
/// The result drops `axis`, or keeps it with size 1 when `keep_dims` is set.
///
/// # Panics
/// Panics if `axis` is out of range or has length 0.
pub fn reduce_axis<P>(p: &P, op: ReduceOp, a: &NDArray, axis: usize, keep_dims: bool) -> NDArray
where
    P: VectorMathProvider + ?Sized,
{
    let n = check_reduce_axis(a, axis);
    let (mut shape, strides) = without_axis(a, axis);
    let count = volume(&shape);
    let mut out = vec![0.0f32; count];

    let data = a.buffer().as_slice();
    let base = a.base_offset();
    let stride = a.strides()[axis];
    let dst = SendPtr(out.as_mut_ptr());
    for_each_chunk(count, a.volume(), |start, len| {
        let dst = dst;
        for (k, o) in OffsetIter::with_range(&shape, &strides, start, len).enumerate() {
            let v = p.reduce(op, Span::new(data, at(base, o), stride, n));
            // SAFETY: each chunk owns `out[start..start + len]`.
            unsafe { *dst.as_ptr().add(start + k) = v };
        }
    });

    if keep_dims {
        shape.insert(axis, 1);
    }
    NDArray::from_buffer(&shape, Buffer::from_vec(out))
}

/// Logical index of the extreme value of every run along `axis`, in
/// row-major order of the remaining axes.
///
/// # Panics
/// Panics if `axis` is out of range or has length 0.
pub fn index_reduce_axis<P>(p: &P, op: IndexReduceOp, a: &NDArray, axis: usize) -> Vec<usize>
where
    P: VectorMathProvider + ?Sized,
{
    let n = check_reduce_axis(a, axis);
    let (shape, strides) = without_axis(a, axis);
    let data = a.buffer().as_slice();
    let base = a.base_offset();
    let stride = a.strides()[axis];
    OffsetIter::new(&shape, &strides)
        .map(|o| {
            let (_, steps) = p.index_reduce(op, Span::new(data, at(base, o), stride, n));
            if stride == 0 {
                0
            } else {
                (steps / stride) as usize
            }
        })
        .collect()
}

/// Flat row-major index of the extreme value of `a`. Ties go to the first.
///
/// # Panics
/// Panics on an empty array.
pub fn index_reduce_all<P>(p: &P, op: IndexReduceOp, a: &NDArray) -> usize
where
    P: VectorMathProvider + ?Sized,
{
    assert!(
        !a.is_empty(),
        "cannot take {:?} of empty array with shape {:?}",
        op,
        a.shape()
    );
    if a.is_contiguous() {
        let span = Span::new(a.buffer().as_slice(), a.base_offset(), 1, a.volume());
        return p.index_reduce(op, span).1 as usize;
    }
    let scratch = gather(p, a);
    p.index_reduce(op, Span::contiguous(&scratch)).1 as usize
}

// ============================================================================
// Reference paths
// ============================================================================

/// [`map_unary`] through an element-by-element gather, with no fast paths.
pub fn map_unary_gathered<P>(p: &P, op: UnaryOp, a: &NDArray) -> NDArray
where
    P: VectorMathProvider + ?Sized,
{
    let data = a.buffer().as_slice();
    let base = a.base_offset();
    let src: Vec<f32> = offsets(a.shape(), a.strides())
        .map(|o| data[at(base, o)])
        .collect();
    let mut out = vec![0.0f32; src.len()];
    p.unary(op, Span::contiguous(&src), &mut SpanMut::contiguous(&mut out));
    NDArray::new(a.shape(), out)
}

/// [`zip_binary`] through element-by-element gathers, with no fast paths.
pub fn zip_binary_gathered<P>(p: &P, op: BinaryOp, lhs: &NDArray, rhs: &NDArray) -> NDArray
where
    P: VectorMathProvider + ?Sized,
{
    let (l, r) = broadcast_pair(lhs, rhs);
    let collect = |a: &NDArray| -> Vec<f32> {
        let data = a.buffer().as_slice();
        offsets(a.shape(), a.strides())
            .map(|o| data[at(a.base_offset(), o)])
            .collect()
    };
    let (lg, rg) = (collect(&l), collect(&r));
    let mut out = vec![0.0f32; lg.len()];
    p.binary(
        op,
        Span::contiguous(&lg),
        Span::contiguous(&rg),
        &mut SpanMut::contiguous(&mut out),
    );
    NDArray::new(l.shape(), out)
}
