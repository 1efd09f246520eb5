//! Copy-on-write strided N-dimensional arrays of `f32`.
//!
//! An [`NDArray`] is a `(shape, strides, base_offset, buffer)` tuple over a
//! reference-counted [`Buffer`]. Indexing, transposition, flipping, reshaping
//! of contiguous data, and broadcasting only rewrite metadata; the buffer is
//! shared until a write forces a copy.
//!
//! # Core Types
//!
//! - [`NDArray`]: the array value
//! - [`Buffer`]: copy-on-write storage
//! - [`IndexElem`] and the [`s!`] macro: subscript specifiers
//! - [`VectorMathProvider`]: the numeric backend seam, with [`NativeProvider`]
//!   (and `FaerProvider` under the `faer` feature)
//!
//! # Code Paths
//!
//! Elementwise passes pick, in order:
//! - a dense pass over the physical footprint when the strides are a
//!   permutation of a contiguous layout ([`layout::is_dense`])
//! - a strided-block pass that folds the innermost run of axes
//!   ([`layout::strided_dims_from`]) and calls the provider once per block
//! - a full gather when neither applies
//!
//! # Example
//!
//! ```rust
//! use strided_ndarray::{s, NDArray};
//!
//! let a = NDArray::range(6).reshaped(&[2, 3]);
//! let t = a.transposed();
//! assert_eq!(t.shape(), &[3, 2]);
//! assert_eq!(t.elements(), vec![0.0, 3.0, 1.0, 4.0, 2.0, 5.0]);
//!
//! let b = &a + &NDArray::from_vec(vec![10.0, 20.0, 30.0]);
//! assert_eq!(b.get(s![1]).elements(), vec![13.0, 24.0, 35.0]);
//! ```
//!
//! # Errors
//!
//! Shape, axis, and index contract violations panic with the offending
//! values in the message. Only the decompositions in [`linalg`] return
//! [`Result`].

mod array;
mod broadcast;
mod buffer;
mod creation;
pub mod dispatch;
#[cfg(feature = "faer")]
mod faer_provider;
mod index;
mod iter;
mod join;
pub mod layout;
pub mod linalg;
mod native;
mod ops;
mod provider;
mod reduce;
mod sort;
mod threading;
mod view;

// ============================================================================
// Core types
// ============================================================================
pub use array::{NDArray, Rows};
pub use buffer::Buffer;

// ============================================================================
// Iteration and indexing
// ============================================================================
pub use index::IndexElem;
pub use iter::{offsets, paired_offsets, MultiOffsetIter, OffsetIter, PairedOffsetIter};

// ============================================================================
// Numeric backends
// ============================================================================
#[cfg(feature = "faer")]
pub use faer_provider::FaerProvider;
pub use native::NativeProvider;
pub use provider::{
    provider, ActiveProvider, BinaryOp, IndexReduceOp, ReduceOp, Span, SpanMut, SvdFactors,
    UnaryOp, VectorMathProvider,
};

// ============================================================================
// Free functions
// ============================================================================
pub use broadcast::{broadcast_pair, broadcast_shapes};
pub use join::{concat, stack};
pub use linalg::{cov, determinant, inv, matmul, matrix_rank, pinv, svd, Svd};
pub use ops::{copysign, copysign_scalar, maximum, minimum};
pub use threading::num_workers;

// ============================================================================
// Constants
// ============================================================================

/// Minimum number of elements before a pass is split across workers.
/// Matches Julia's `MINTHREADLENGTH = 1 << 15`.
pub const MIN_PARALLEL_LEN: usize = 1 << 15;

// ============================================================================
// Error types
// ============================================================================

/// Recoverable failures of the linear-algebra routines.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinalgError {
    /// A native routine rejected one of its arguments.
    #[error("invalid argument {position} to {routine}")]
    InvalidArgument {
        routine: &'static str,
        position: usize,
    },

    /// LU factorization met an exactly zero pivot.
    #[error("singular matrix")]
    SingularMatrix,

    /// The iterative SVD did not converge.
    #[error("decomposition did not converge")]
    NotConverged,
}

/// Result type for the linear-algebra routines.
pub type Result<T> = std::result::Result<T, LinalgError>;
