//! Copy-on-write backing store for [`NDArray`](crate::NDArray).
//!
//! A [`Buffer`] is a reference-counted contiguous block of `f32`. Cloning a
//! buffer (and therefore cloning an array or taking a view) only bumps the
//! reference count. Any write goes through [`Buffer::ensure_uniquely_owned`],
//! which deep-copies the storage when another owner is still alive.

use std::ops::Range;
use std::sync::Arc;

/// Reference-counted, copy-on-write block of single-precision floats.
#[derive(Clone, Default)]
pub struct Buffer {
    data: Arc<Vec<f32>>,
}

impl Buffer {
    /// Zero-initialized buffer with `size` elements.
    pub fn new(size: usize) -> Self {
        Self::filled(0.0, size)
    }

    /// Buffer with `count` copies of `value`.
    pub fn filled(value: f32, count: usize) -> Self {
        Self {
            data: Arc::new(vec![value; count]),
        }
    }

    /// Take ownership of an existing vector without copying.
    pub fn from_vec(data: Vec<f32>) -> Self {
        Self {
            data: Arc::new(data),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True when no other [`Buffer`] shares this storage.
    #[inline]
    pub fn is_uniquely_owned(&self) -> bool {
        Arc::strong_count(&self.data) == 1
    }

    /// True when both handles point at the same storage.
    #[inline]
    pub fn ptr_eq(&self, other: &Buffer) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Detach from other owners, deep-copying the storage if it is shared.
    pub fn ensure_uniquely_owned(&mut self) {
        if !self.is_uniquely_owned() {
            tracing::trace!(len = self.len(), "copy-on-write detach");
        }
        Arc::make_mut(&mut self.data);
    }

    /// Read the element at `index`.
    ///
    /// # Panics
    /// Panics if `index >= self.len()`.
    #[inline]
    pub fn read(&self, index: usize) -> f32 {
        self.data[index]
    }

    /// Write `value` at `index`, detaching from other owners first.
    ///
    /// # Panics
    /// Panics if `index >= self.len()`.
    #[inline]
    pub fn write(&mut self, index: usize, value: f32) {
        self.as_mut_slice()[index] = value;
    }

    /// Fresh, independent buffer holding a copy of `range`.
    ///
    /// # Panics
    /// Panics if `range` is out of bounds.
    pub fn slice(&self, range: Range<usize>) -> Buffer {
        assert!(
            range.start <= range.end && range.end <= self.len(),
            "buffer slice {:?} out of bounds for length {}",
            range,
            self.len()
        );
        Buffer::from_vec(self.data[range].to_vec())
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Mutable access to the storage after ensuring unique ownership.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        Arc::make_mut(&mut self.data).as_mut_slice()
    }

    /// Consume the buffer, returning the vector without copying when unique.
    pub fn into_vec(self) -> Vec<f32> {
        Arc::try_unwrap(self.data).unwrap_or_else(|shared| (*shared).clone())
    }
}

impl From<Vec<f32>> for Buffer {
    fn from(data: Vec<f32>) -> Self {
        Buffer::from_vec(data)
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("len", &self.len())
            .field("refs", &Arc::strong_count(&self.data))
            .finish()
    }
}
