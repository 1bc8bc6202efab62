//! Zero-copy views: permute, slice, range selection and reshape.
//!
//! Every function here returns an [`NdArray`] that shares the receiver's
//! buffer. The only exception is [`NdArray::reshape_or_copy`], which copies
//! when (and only when) the caller opts in.

use crate::dtype::Element;
use crate::error::{CoreError, Result};
use crate::layout::{Order, DEFAULT_ORDER};

use super::NdArray;

/// A range specification for one axis when taking a view.
///
/// Mirrors the `start:stop:step` slice notation; `stop` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceRange {
    pub start: usize,
    pub stop: usize,
    pub step: usize,
}

impl SliceRange {
    #[allow(clippy::similar_names)]
    pub fn new(start: usize, stop: usize, step: usize) -> Self {
        Self { start, stop, step }
    }

    /// Shorthand for `start..stop` with step 1.
    pub fn range(start: usize, stop: usize) -> Self {
        Self::new(start, stop, 1)
    }

    /// Select the full extent of an axis of length `len`.
    pub fn full(len: usize) -> Self {
        Self::new(0, len, 1)
    }

    /// The number of positions this range selects.
    pub fn len(&self) -> usize {
        if self.stop <= self.start || self.step == 0 {
            0
        } else {
            (self.stop - self.start).div_ceil(self.step)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Element> NdArray<T> {
    /// A view restricted to one [`SliceRange`] per dimension.
    ///
    /// ```
    /// # use tessera_core::array::{NdArray, SliceRange};
    /// let a = NdArray::from_vec((0..12).collect(), vec![3, 4]).unwrap();
    /// let v = a.get_view(&[SliceRange::range(1, 3), SliceRange::new(0, 4, 2)]).unwrap();
    /// assert_eq!(v.to_vec(), vec![4, 6, 8, 10]);
    /// assert!(v.shares_buffer(&a));
    /// ```
    pub fn get_view(&self, ranges: &[SliceRange]) -> Result<Self> {
        if ranges.len() != self.ndim() {
            return Err(CoreError::InvalidArgument {
                reason: "number of slice ranges must match array rank",
            });
        }
        let mut layout = self.layout.clone();
        for (d, r) in ranges.iter().enumerate() {
            if r.stop > self.shape()[d] {
                return Err(CoreError::IndexOutOfBounds {
                    index: vec![r.stop],
                    shape: self.shape().to_vec(),
                });
            }
            layout = layout.select_range(d, r.start.min(r.stop), r.len(), r.step)?;
        }
        Ok(self.view_unchecked(layout))
    }

    /// Reverse all dimensions. A 2-D array becomes its matrix transpose.
    pub fn transpose(&self) -> Self {
        self.view_unchecked(self.layout.transpose())
    }

    /// Reorder dimensions: dimension `i` of the result is `perm[i]` of `self`.
    pub fn permute(&self, perm: &[usize]) -> Result<Self> {
        Ok(self.view_unchecked(self.layout.permute(perm)?))
    }

    /// Fix dimension `dim` at `index`, dropping that dimension.
    pub fn select(&self, dim: usize, index: usize) -> Result<Self> {
        Ok(self.view_unchecked(self.layout.slice_dim(dim, index)?))
    }

    /// Keep `length` positions of `dim` starting at `start`, `step` apart.
    pub fn select_range(&self, dim: usize, start: usize, length: usize, step: usize) -> Result<Self> {
        Ok(self.view_unchecked(self.layout.select_range(dim, start, length, step)?))
    }

    /// Row `i` of a 2-D array.
    pub fn row(&self, i: usize) -> Result<Self> {
        self.require_matrix()?;
        self.select(0, i)
    }

    /// Column `j` of a 2-D array.
    pub fn column(&self, j: usize) -> Result<Self> {
        self.require_matrix()?;
        self.select(1, j)
    }

    /// The `rows x cols` block whose top-left corner is `(r0, c0)`.
    pub fn submatrix(&self, r0: usize, c0: usize, rows: usize, cols: usize) -> Result<Self> {
        self.require_matrix()?;
        let layout = self
            .layout
            .select_range(0, r0, rows, 1)?
            .select_range(1, c0, cols, 1)?;
        Ok(self.view_unchecked(layout))
    }

    /// The main diagonal of a 2-D array.
    pub fn diagonal(&self) -> Result<Self> {
        Ok(self.view_unchecked(self.layout.diagonal()?))
    }

    /// Read-only style view stretched to `shape`; broadcast dimensions have
    /// stride zero, so a write through them lands on every repeated element.
    pub fn broadcast_to(&self, shape: &[usize]) -> Result<Self> {
        Ok(self.view_unchecked(self.layout.broadcast_to(shape)?))
    }

    /// Reinterpret the row-major element sequence with a new shape.
    ///
    /// Never copies: a non-contiguous receiver yields
    /// [`CoreError::IllegalReshape`]. Use [`reshape_or_copy`](Self::reshape_or_copy)
    /// to opt into a copy.
    pub fn reshape(&self, shape: &[usize]) -> Result<Self> {
        self.reshape_with_order(shape, DEFAULT_ORDER)
    }

    /// Reshape reading elements in `order`. Zero-copy or
    /// [`CoreError::IllegalReshape`].
    pub fn reshape_with_order(&self, shape: &[usize], order: Order) -> Result<Self> {
        Ok(self.view_unchecked(self.layout.reshape(shape, order)?))
    }

    /// Reshape, copying into a fresh row-major buffer when the receiver is not
    /// row-major contiguous.
    pub fn reshape_or_copy(&self, shape: &[usize]) -> Result<Self> {
        match self.reshape(shape) {
            Err(CoreError::IllegalReshape { .. }) => self.copy().reshape(shape),
            other => other,
        }
    }

    /// Flatten to one dimension without copying.
    pub fn ravel(&self) -> Result<Self> {
        self.reshape(&[self.size()])
    }

    fn require_matrix(&self) -> Result<()> {
        if self.ndim() != 2 {
            return Err(CoreError::InvalidArgument {
                reason: "operation requires a 2-D array",
            });
        }
        Ok(())
    }
}
