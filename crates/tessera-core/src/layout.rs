//! Shape, stride and offset arithmetic.
//!
//! A [`Layout`] is the `(offset, shape, stride)` triple that maps a
//! multi-index onto a position in a flat buffer:
//!
//! ```text
//! position(idx) = offset + Σ idx[d] * stride[d]
//! ```
//!
//! Every view transformation (permute, slice, range selection, reshape) is a
//! pure function from one layout to another. None of them touch the buffer.

use crate::error::{CoreError, Result};

/// Memory order of a freshly allocated contiguous buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Last index varies fastest (C order).
    #[default]
    RowMajor,
    /// First index varies fastest (Fortran order).
    ColumnMajor,
}

/// Order used by every constructor that does not take one explicitly.
pub const DEFAULT_ORDER: Order = Order::RowMajor;

/// Stride of a contiguous buffer with the given shape and order.
///
/// ```
/// # use tessera_core::layout::{default_stride, Order};
/// assert_eq!(default_stride(&[2, 3, 4], Order::RowMajor), vec![12, 4, 1]);
/// assert_eq!(default_stride(&[2, 3, 4], Order::ColumnMajor), vec![1, 2, 6]);
/// ```
pub fn default_stride(shape: &[usize], order: Order) -> Vec<usize> {
    let ndim = shape.len();
    let mut stride = vec![1usize; ndim];
    match order {
        Order::RowMajor => {
            for d in (0..ndim.saturating_sub(1)).rev() {
                stride[d] = stride[d + 1] * shape[d + 1];
            }
        }
        Order::ColumnMajor => {
            for d in 1..ndim {
                stride[d] = stride[d - 1] * shape[d - 1];
            }
        }
    }
    stride
}

/// `offset + Σ idx[d] * stride[d]`, with bounds checking against `shape`.
pub fn linear_offset(offset: usize, shape: &[usize], stride: &[usize], idx: &[usize]) -> Result<usize> {
    if idx.len() != shape.len() || idx.iter().zip(shape).any(|(&i, &n)| i >= n) {
        return Err(CoreError::IndexOutOfBounds {
            index: idx.to_vec(),
            shape: shape.to_vec(),
        });
    }
    Ok(offset + idx.iter().zip(stride).map(|(&i, &s)| i * s).sum::<usize>())
}

/// Whether `stride` matches the default stride of `shape` in `order`.
///
/// Dimensions of extent 1 are ignored since their stride is never used, and
/// an empty array is contiguous in every order.
pub fn is_contiguous_in(shape: &[usize], stride: &[usize], order: Order) -> bool {
    if shape.contains(&0) {
        return true;
    }
    default_stride(shape, order)
        .iter()
        .zip(stride)
        .zip(shape)
        .all(|((&expected, &actual), &n)| n == 1 || expected == actual)
}

/// Whether `stride` equals the default stride of `shape` for either order.
pub fn is_contiguous(shape: &[usize], stride: &[usize]) -> bool {
    is_contiguous_in(shape, stride, Order::RowMajor) || is_contiguous_in(shape, stride, Order::ColumnMajor)
}

/// The inverse of a permutation of `0..n`.
///
/// ```
/// # use tessera_core::layout::invert_permutation;
/// assert_eq!(invert_permutation(&[2, 0, 1]).unwrap(), vec![1, 2, 0]);
/// ```
pub fn invert_permutation(perm: &[usize]) -> Result<Vec<usize>> {
    validate_permutation(perm)?;
    let mut inverse = vec![0; perm.len()];
    for (i, &p) in perm.iter().enumerate() {
        inverse[p] = i;
    }
    Ok(inverse)
}

fn validate_permutation(perm: &[usize]) -> Result<()> {
    let mut seen = vec![false; perm.len()];
    for &p in perm {
        if p >= perm.len() {
            return Err(CoreError::AxisOutOfBounds {
                axis: p,
                ndim: perm.len(),
            });
        }
        if seen[p] {
            return Err(CoreError::InvalidArgument {
                reason: "duplicate axis in permutation",
            });
        }
        seen[p] = true;
    }
    Ok(())
}

/// Decompose a flat row-major ordinal into a multi-index for `shape`.
pub(crate) fn unravel_row_major(mut ordinal: usize, shape: &[usize]) -> Vec<usize> {
    let mut idx = vec![0; shape.len()];
    for d in (0..shape.len()).rev() {
        if shape[d] > 0 {
            idx[d] = ordinal % shape[d];
            ordinal /= shape[d];
        }
    }
    idx
}

// ======================================================================
// Layout
// ======================================================================

/// The `(offset, shape, stride)` triple of an array or view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Layout {
    offset: usize,
    shape: Vec<usize>,
    stride: Vec<usize>,
}

impl Layout {
    /// A layout from raw parts. Callers are responsible for checking it
    /// against a buffer with [`Layout::required_len`].
    pub fn new(offset: usize, shape: Vec<usize>, stride: Vec<usize>) -> Result<Self> {
        if shape.len() != stride.len() {
            return Err(CoreError::ShapeMismatch {
                expected: shape,
                got: stride,
            });
        }
        Ok(Self { offset, shape, stride })
    }

    /// A fresh contiguous layout at offset zero.
    pub fn contiguous(shape: Vec<usize>, order: Order) -> Self {
        let stride = default_stride(&shape, order);
        Self {
            offset: 0,
            shape,
            stride,
        }
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn stride(&self) -> &[usize] {
        &self.stride
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Number of logical elements. A rank-0 layout holds one element.
    #[inline]
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    /// Smallest buffer length that holds every addressed position.
    pub fn required_len(&self) -> usize {
        if self.size() == 0 {
            return 0;
        }
        self.offset
            + self
                .shape
                .iter()
                .zip(&self.stride)
                .map(|(&n, &s)| (n - 1) * s)
                .sum::<usize>()
            + 1
    }

    /// Buffer position of a multi-index.
    #[inline]
    pub fn linear_offset(&self, idx: &[usize]) -> Result<usize> {
        linear_offset(self.offset, &self.shape, &self.stride, idx)
    }

    pub fn is_contiguous(&self) -> bool {
        is_contiguous(&self.shape, &self.stride)
    }

    pub fn is_contiguous_in(&self, order: Order) -> bool {
        is_contiguous_in(&self.shape, &self.stride, order)
    }

    fn check_axis(&self, dim: usize) -> Result<()> {
        if dim >= self.ndim() {
            return Err(CoreError::AxisOutOfBounds {
                axis: dim,
                ndim: self.ndim(),
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // View transformations
    // ------------------------------------------------------------------

    /// Reorder dimensions: output dimension `i` is input dimension `perm[i]`.
    pub fn permute(&self, perm: &[usize]) -> Result<Self> {
        if perm.len() != self.ndim() {
            return Err(CoreError::InvalidArgument {
                reason: "permutation length must match rank",
            });
        }
        validate_permutation(perm)?;
        Ok(Self {
            offset: self.offset,
            shape: perm.iter().map(|&p| self.shape[p]).collect(),
            stride: perm.iter().map(|&p| self.stride[p]).collect(),
        })
    }

    /// Reverse all dimensions.
    pub fn transpose(&self) -> Self {
        Self {
            offset: self.offset,
            shape: self.shape.iter().rev().copied().collect(),
            stride: self.stride.iter().rev().copied().collect(),
        }
    }

    /// Fix `dim` at `index`, removing that dimension.
    pub fn slice_dim(&self, dim: usize, index: usize) -> Result<Self> {
        self.check_axis(dim)?;
        if index >= self.shape[dim] {
            return Err(CoreError::IndexOutOfBounds {
                index: vec![index],
                shape: self.shape.clone(),
            });
        }
        let mut shape = self.shape.clone();
        let mut stride = self.stride.clone();
        shape.remove(dim);
        let step = stride.remove(dim);
        Ok(Self {
            offset: self.offset + index * step,
            shape,
            stride,
        })
    }

    /// Keep `length` positions of `dim` starting at `start`, `step` apart.
    pub fn select_range(&self, dim: usize, start: usize, length: usize, step: usize) -> Result<Self> {
        self.check_axis(dim)?;
        if step == 0 {
            return Err(CoreError::InvalidArgument {
                reason: "range step must be > 0",
            });
        }
        let extent = self.shape[dim];
        let in_bounds = if length == 0 {
            start <= extent
        } else {
            start + (length - 1) * step < extent
        };
        if !in_bounds {
            return Err(CoreError::IndexOutOfBounds {
                index: vec![start + length.saturating_sub(1) * step],
                shape: self.shape.clone(),
            });
        }
        let mut out = self.clone();
        out.offset += start * self.stride[dim];
        out.shape[dim] = length;
        out.stride[dim] *= step;
        Ok(out)
    }

    /// Reinterpret the elements, taken in `order`, with a new shape.
    ///
    /// Succeeds without copying only when the layout is contiguous in
    /// `order`; otherwise returns [`CoreError::IllegalReshape`] and leaves the
    /// decision to copy to the caller.
    pub fn reshape(&self, new_shape: &[usize], order: Order) -> Result<Self> {
        let new_size: usize = new_shape.iter().product();
        if new_size != self.size() {
            return Err(CoreError::ShapeMismatch {
                expected: self.shape.clone(),
                got: new_shape.to_vec(),
            });
        }
        if !self.is_contiguous_in(order) {
            return Err(CoreError::IllegalReshape {
                shape: self.shape.clone(),
                stride: self.stride.clone(),
                target: new_shape.to_vec(),
            });
        }
        Ok(Self {
            offset: self.offset,
            shape: new_shape.to_vec(),
            stride: default_stride(new_shape, order),
        })
    }

    /// Stretch to `target` by giving broadcast dimensions a zero stride.
    ///
    /// Shapes are aligned from the trailing dimension; a source extent of 1
    /// (or a missing leading dimension) broadcasts to any target extent.
    pub fn broadcast_to(&self, target: &[usize]) -> Result<Self> {
        let mismatch = || CoreError::ShapeMismatch {
            expected: target.to_vec(),
            got: self.shape.clone(),
        };
        if target.len() < self.ndim() {
            return Err(mismatch());
        }
        let lead = target.len() - self.ndim();
        let mut stride = vec![0; target.len()];
        for (d, &t) in target.iter().enumerate().skip(lead) {
            let n = self.shape[d - lead];
            if n == t {
                stride[d] = self.stride[d - lead];
            } else if n != 1 {
                return Err(mismatch());
            }
        }
        Ok(Self {
            offset: self.offset,
            shape: target.to_vec(),
            stride,
        })
    }

    /// The main diagonal of a 2-D layout.
    pub fn diagonal(&self) -> Result<Self> {
        if self.ndim() != 2 {
            return Err(CoreError::InvalidArgument {
                reason: "diagonal requires a 2-D array",
            });
        }
        Ok(Self {
            offset: self.offset,
            shape: vec![self.shape[0].min(self.shape[1])],
            stride: vec![self.stride[0] + self.stride[1]],
        })
    }

    /// Buffer positions of every element in row-major logical order.
    pub fn positions(&self) -> Positions<'_> {
        Positions {
            layout: self,
            index: vec![0; self.ndim()],
            remaining: self.size(),
        }
    }
}

/// Iterator over buffer positions, last dimension fastest.
#[derive(Debug, Clone)]
pub struct Positions<'a> {
    layout: &'a Layout,
    index: Vec<usize>,
    remaining: usize,
}

impl Iterator for Positions<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let pos = self.layout.offset
            + self
                .index
                .iter()
                .zip(&self.layout.stride)
                .map(|(&i, &s)| i * s)
                .sum::<usize>();

        // Advance the odometer
        for d in (0..self.index.len()).rev() {
            self.index[d] += 1;
            if self.index[d] < self.layout.shape[d] {
                break;
            }
            self.index[d] = 0;
        }
        Some(pos)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Positions<'_> {}
