//! Dense N-dimensional arrays over shared, strided storage.
//!
//! An [`NdArray`] is a `(buffer, offset, shape, stride)` tuple. Views built
//! with [`transpose`](NdArray::transpose), [`get_view`](NdArray::get_view),
//! [`select_range`](NdArray::select_range) or a contiguous
//! [`reshape`](NdArray::reshape) reuse the same buffer, so writes through one
//! are visible through every other. [`copy`](NdArray::copy) is the only
//! operation that breaks aliasing.
//!
//! Arrays are single-threaded (`!Send`); move data across threads with
//! [`to_vec`](NdArray::to_vec).

mod buffer;
mod create;
mod display;
mod join;
mod mask;
mod ops;
mod sort;
mod vectors;
mod view;

pub use vectors::Vectors;
pub use view::SliceRange;

use crate::dtype::{Element, ElementKind};
use crate::error::{CoreError, Result};
use crate::layout::{Layout, Order, Positions, DEFAULT_ORDER};

use buffer::Buffer;

/// An N-dimensional array or view.
///
/// `Clone` produces another handle onto the same buffer, like a view that
/// covers the whole array.
#[derive(Debug, Clone)]
pub struct NdArray<T: Element> {
    buffer: Buffer<T>,
    layout: Layout,
}

impl<T: Element> NdArray<T> {
    // ------------------------------------------------------------------
    // Construction from raw parts
    // ------------------------------------------------------------------

    /// Create a row-major array from a flat data vector and a shape.
    ///
    /// Returns an error if the product of `shape` does not equal `data.len()`.
    pub fn from_vec(data: Vec<T>, shape: Vec<usize>) -> Result<Self> {
        Self::from_vec_with_order(data, shape, DEFAULT_ORDER)
    }

    /// Create an array whose flat data is laid out in `order`.
    pub fn from_vec_with_order(data: Vec<T>, shape: Vec<usize>, order: Order) -> Result<Self> {
        let numel: usize = shape.iter().product();
        if numel != data.len() {
            return Err(CoreError::ShapeMismatch {
                expected: shape,
                got: vec![data.len()],
            });
        }
        Ok(Self {
            buffer: Buffer::new(data),
            layout: Layout::contiguous(shape, order),
        })
    }

    /// Create an array from a flat slice and a shape (copies the data).
    pub fn from_slice(data: &[T], shape: Vec<usize>) -> Result<Self> {
        Self::from_vec(data.to_vec(), shape)
    }

    /// Create a rank-0 array holding one value.
    pub fn scalar(value: T) -> Self {
        Self {
            buffer: Buffer::new(vec![value]),
            layout: Layout::contiguous(Vec::new(), DEFAULT_ORDER),
        }
    }

    /// Re-slice this array's buffer with an arbitrary layout.
    ///
    /// Fails with [`CoreError::IndexOutOfBounds`] if the layout addresses
    /// positions past the end of the buffer.
    pub fn with_layout(&self, layout: Layout) -> Result<Self> {
        let available = self.buffer.len();
        if layout.required_len() > available {
            return Err(CoreError::IndexOutOfBounds {
                index: vec![layout.required_len() - 1],
                shape: vec![available],
            });
        }
        Ok(self.view_unchecked(layout))
    }

    /// A view with a layout already derived from this array's own.
    pub(crate) fn view_unchecked(&self, layout: Layout) -> Self {
        Self {
            buffer: self.buffer.clone(),
            layout,
        }
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.layout.shape()
    }

    #[inline]
    pub fn stride(&self) -> &[usize] {
        self.layout.stride()
    }

    /// Position of the first element in the shared buffer.
    #[inline]
    pub fn offset(&self) -> usize {
        self.layout.offset()
    }

    #[inline]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.layout.ndim()
    }

    /// The total number of elements.
    #[inline]
    pub fn size(&self) -> usize {
        self.layout.size()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Storage kind of the elements.
    #[inline]
    pub fn kind(&self) -> ElementKind {
        T::KIND
    }

    pub fn is_contiguous(&self) -> bool {
        self.layout.is_contiguous()
    }

    /// Whether `self` and `other` view the same buffer.
    pub fn shares_buffer<U: Element>(&self, other: &NdArray<U>) -> bool {
        self.buffer.addr() == other.buffer.addr()
    }

    pub fn is_square(&self) -> bool {
        self.ndim() == 2 && self.shape()[0] == self.shape()[1]
    }

    /// Rows of a 2-D array.
    pub fn rows(&self) -> usize {
        self.shape().first().copied().unwrap_or(1)
    }

    /// Columns of a 2-D array.
    pub fn columns(&self) -> usize {
        self.shape().get(1).copied().unwrap_or(1)
    }

    // ------------------------------------------------------------------
    // Element access
    // ------------------------------------------------------------------

    /// The element at a multi-index.
    pub fn get(&self, index: &[usize]) -> Result<T> {
        let pos = self.layout.linear_offset(index)?;
        Ok(self.buffer.read(pos))
    }

    /// Overwrite the element at a multi-index. Visible through every view of
    /// the same buffer.
    pub fn set(&self, index: &[usize], value: T) -> Result<()> {
        let pos = self.layout.linear_offset(index)?;
        self.buffer.write(pos, value);
        Ok(())
    }

    /// Iterate over all elements in row-major logical order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            buffer: &self.buffer,
            positions: self.layout.positions(),
        }
    }

    /// All elements in row-major logical order.
    pub fn to_vec(&self) -> Vec<T> {
        let data = self.buffer.borrow();
        self.layout.positions().map(|p| data[p].clone()).collect()
    }

    /// All elements, ordered so that they form a contiguous buffer in `order`.
    pub fn to_vec_in(&self, order: Order) -> Vec<T> {
        match order {
            Order::RowMajor => self.to_vec(),
            Order::ColumnMajor => {
                let reversed = self.layout.transpose();
                let data = self.buffer.borrow();
                reversed.positions().map(|p| data[p].clone()).collect()
            }
        }
    }

    // ------------------------------------------------------------------
    // Copy / assign
    // ------------------------------------------------------------------

    /// A row-major copy on a fresh buffer.
    pub fn copy(&self) -> Self {
        self.copy_with_order(DEFAULT_ORDER)
    }

    /// A copy on a fresh buffer laid out contiguously in `order`.
    pub fn copy_with_order(&self, order: Order) -> Self {
        Self {
            buffer: Buffer::new(self.to_vec_in(order)),
            layout: Layout::contiguous(self.shape().to_vec(), order),
        }
    }

    /// Copy every element of `other` into `self`.
    ///
    /// `other` must have the same shape as `self`, or hold a single element
    /// which is then written everywhere.
    pub fn assign(&self, other: &NdArray<T>) -> Result<()> {
        self.assign_with(other, |v| v)
    }

    /// Copy `f(x)` for each element `x` of `other` into `self`.
    pub fn assign_with<U, F>(&self, other: &NdArray<U>, mut f: F) -> Result<()>
    where
        U: Element,
        F: FnMut(U) -> T,
    {
        let source = if other.shape() == self.shape() {
            other.layout.clone()
        } else if other.size() == 1 {
            let single = Layout::new(other.offset(), Vec::new(), Vec::new())?;
            single.broadcast_to(self.shape())?
        } else {
            return Err(CoreError::ShapeMismatch {
                expected: self.shape().to_vec(),
                got: other.shape().to_vec(),
            });
        };

        if self.shares_buffer(other) {
            // Source and destination alias: read everything before writing.
            let values: Vec<U> = {
                let data = other.buffer.borrow();
                source.positions().map(|p| data[p].clone()).collect()
            };
            let mut dst = self.buffer.borrow_mut();
            for (d, v) in self.layout.positions().zip(values) {
                dst[d] = f(v);
            }
        } else {
            let src = other.buffer.borrow();
            let mut dst = self.buffer.borrow_mut();
            for (d, s) in self.layout.positions().zip(source.positions()) {
                dst[d] = f(src[s].clone());
            }
        }
        Ok(())
    }

    /// Write `value` into every element.
    pub fn fill(&self, value: T) {
        let mut data = self.buffer.borrow_mut();
        for p in self.layout.positions() {
            data[p] = value.clone();
        }
    }

    // ------------------------------------------------------------------
    // Map / apply
    // ------------------------------------------------------------------

    /// Apply a function to every element, returning a new array.
    pub fn map<U, F>(&self, mut f: F) -> NdArray<U>
    where
        U: Element,
        F: FnMut(T) -> U,
    {
        let data = self.iter().map(&mut f).collect();
        NdArray {
            buffer: Buffer::new(data),
            layout: Layout::contiguous(self.shape().to_vec(), DEFAULT_ORDER),
        }
    }

    /// Apply a function element-wise to two arrays, broadcasting their
    /// shapes against each other.
    pub fn zip_map<U, V, F>(&self, other: &NdArray<U>, mut f: F) -> Result<NdArray<V>>
    where
        U: Element,
        V: Element,
        F: FnMut(T, U) -> V,
    {
        let shape = broadcast_shape(self.shape(), other.shape())?;
        let lhs = self.layout.broadcast_to(&shape)?;
        let rhs = other.layout.broadcast_to(&shape)?;
        let data = {
            let a = self.buffer.borrow();
            let b = other.buffer.borrow();
            lhs.positions()
                .zip(rhs.positions())
                .map(|(i, j)| f(a[i].clone(), b[j].clone()))
                .collect()
        };
        NdArray::from_vec(data, shape)
    }

    /// Apply a function to every element in place.
    pub fn apply<F>(&self, mut f: F)
    where
        F: FnMut(T) -> T,
    {
        let mut data = self.buffer.borrow_mut();
        for p in self.layout.positions() {
            let v = data[p].clone();
            data[p] = f(v);
        }
    }
}

impl<T: Element + PartialEq> PartialEq for NdArray<T> {
    fn eq(&self, other: &Self) -> bool {
        self.shape() == other.shape() && self.iter().eq(other.iter())
    }
}

/// Iterator over array elements in row-major logical order.
#[derive(Debug)]
pub struct Iter<'a, T: Element> {
    buffer: &'a Buffer<T>,
    positions: Positions<'a>,
}

impl<T: Element> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.positions.next().map(|p| self.buffer.read(p))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.positions.size_hint()
    }
}

impl<T: Element> ExactSizeIterator for Iter<'_, T> {}

/// The common shape two operands broadcast to.
pub(crate) fn broadcast_shape(a: &[usize], b: &[usize]) -> Result<Vec<usize>> {
    let ndim = a.len().max(b.len());
    let mut out = vec![0; ndim];
    for (i, slot) in out.iter_mut().enumerate() {
        let da = if i < ndim - a.len() { 1 } else { a[i - (ndim - a.len())] };
        let db = if i < ndim - b.len() { 1 } else { b[i - (ndim - b.len())] };
        *slot = if da == db || db == 1 {
            da
        } else if da == 1 {
            db
        } else {
            return Err(CoreError::ShapeMismatch {
                expected: a.to_vec(),
                got: b.to_vec(),
            });
        };
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec() {
        let a = NdArray::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]).unwrap();
        assert_eq!(a.shape(), &[2, 3]);
        assert_eq!(a.stride(), &[3, 1]);
        assert_eq!(a.ndim(), 2);
        assert_eq!(a.size(), 6);
        assert_eq!(a.kind(), ElementKind::Double);
    }

    #[test]
    fn test_from_vec_shape_mismatch() {
        let r = NdArray::from_vec(vec![1.0, 2.0, 3.0], vec![2, 3]);
        assert!(matches!(r, Err(CoreError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_scalar_array() {
        let a = NdArray::scalar(42_i64);
        assert_eq!(a.ndim(), 0);
        assert_eq!(a.size(), 1);
        assert_eq!(a.get(&[]).unwrap(), 42);
    }

    #[test]
    fn test_get_set() {
        let a = NdArray::from_vec(vec![1, 2, 3, 4, 5, 6], vec![2, 3]).unwrap();
        assert_eq!(a.get(&[0, 0]).unwrap(), 1);
        assert_eq!(a.get(&[1, 2]).unwrap(), 6);
        a.set(&[0, 1], 99).unwrap();
        assert_eq!(a.get(&[0, 1]).unwrap(), 99);
        assert!(a.get(&[2, 0]).is_err());
        assert!(a.set(&[0], 1).is_err());
    }

    #[test]
    fn test_generic_elements() {
        let a = NdArray::from_vec(vec!["a".to_string(), "b".to_string()], vec![2]).unwrap();
        assert_eq!(a.kind(), ElementKind::Generic);
        let t = a.transpose();
        assert_eq!(t.get(&[1]).unwrap(), "b");
        let flags = NdArray::from_vec(vec![true, false], vec![2]).unwrap();
        assert_eq!(flags.map(|b| !b).to_vec(), vec![false, true]);
    }

    #[test]
    fn test_column_major_storage() {
        let a = NdArray::from_vec_with_order(vec![1, 2, 3, 4, 5, 6], vec![2, 3], Order::ColumnMajor).unwrap();
        assert_eq!(a.stride(), &[1, 2]);
        assert_eq!(a.to_vec(), vec![1, 3, 5, 2, 4, 6]);
        assert_eq!(a.to_vec_in(Order::ColumnMajor), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_copy_breaks_aliasing() {
        let a = NdArray::from_vec(vec![1, 2, 3, 4], vec![2, 2]).unwrap();
        let t = a.transpose();
        let c = t.copy();
        assert_eq!(c, t);
        assert!(!c.shares_buffer(&a));
        assert!(c.is_contiguous());
        c.set(&[0, 1], 100).unwrap();
        assert_eq!(a.get(&[1, 0]).unwrap(), 3);
        a.set(&[0, 0], -1).unwrap();
        assert_eq!(c.get(&[0, 0]).unwrap(), 1);
    }

    #[test]
    fn test_clone_is_shared_handle() {
        let a = NdArray::from_vec(vec![0.0; 4], vec![4]).unwrap();
        let b = a.clone();
        b.set(&[2], 7.0).unwrap();
        assert_eq!(a.get(&[2]).unwrap(), 7.0);
        assert!(a.shares_buffer(&b));
    }

    #[test]
    fn test_assign_same_shape() {
        let a = NdArray::<i32>::zeros(vec![2, 2]);
        let b = NdArray::from_vec(vec![1, 2, 3, 4], vec![2, 2]).unwrap();
        a.assign(&b).unwrap();
        assert_eq!(a.to_vec(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_assign_scalar_broadcast() {
        let a = NdArray::<f64>::zeros(vec![2, 3]);
        a.assign(&NdArray::scalar(2.5)).unwrap();
        assert!(a.iter().all(|x| x == 2.5));
    }

    #[test]
    fn test_assign_shape_mismatch() {
        let a = NdArray::<i32>::zeros(vec![2, 2]);
        let b = NdArray::<i32>::zeros(vec![4]);
        assert!(matches!(a.assign(&b), Err(CoreError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_assign_from_aliasing_view() {
        let a = NdArray::from_vec(vec![1, 2, 3, 4], vec![2, 2]).unwrap();
        a.assign(&a.transpose()).unwrap();
        assert_eq!(a.to_vec(), vec![1, 3, 2, 4]);
    }

    #[test]
    fn test_assign_with_transform() {
        let a = NdArray::<f64>::zeros(vec![3]);
        let b = NdArray::from_vec(vec![1, 2, 3], vec![3]).unwrap();
        a.assign_with(&b, |x| f64::from(x) * 0.5).unwrap();
        assert_eq!(a.to_vec(), vec![0.5, 1.0, 1.5]);
    }

    #[test]
    fn test_fill_view_only() {
        let a = NdArray::<i32>::zeros(vec![3, 3]);
        a.row(1).unwrap().fill(9);
        assert_eq!(a.to_vec(), vec![0, 0, 0, 9, 9, 9, 0, 0, 0]);
    }

    #[test]
    fn test_with_layout_validates_extent() {
        let a = NdArray::<i32>::zeros(vec![6]);
        let ok = Layout::new(1, vec![2, 2], vec![3, 1]).unwrap();
        assert_eq!(a.with_layout(ok).unwrap().size(), 4);
        let bad = Layout::new(2, vec![2, 2], vec![3, 1]).unwrap();
        assert!(matches!(a.with_layout(bad), Err(CoreError::IndexOutOfBounds { .. })));
    }

    #[test]
    fn test_map_and_apply() {
        let a = NdArray::from_vec(vec![1, 2, 3, 4], vec![2, 2]).unwrap();
        let b = a.map(|x| x * 10);
        assert_eq!(b.to_vec(), vec![10, 20, 30, 40]);
        a.transpose().apply(|x| x + 1);
        assert_eq!(a.to_vec(), vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_zip_map_broadcasts() {
        let a = NdArray::from_vec(vec![1, 2, 3, 4, 5, 6], vec![2, 3]).unwrap();
        let b = NdArray::from_vec(vec![10, 20, 30], vec![3]).unwrap();
        let c = a.zip_map(&b, |x, y| x + y).unwrap();
        assert_eq!(c.shape(), &[2, 3]);
        assert_eq!(c.to_vec(), vec![11, 22, 33, 14, 25, 36]);
        let d = NdArray::from_vec(vec![1, 2], vec![2]).unwrap();
        assert!(a.zip_map(&d, |x, y| x + y).is_err());
    }

    #[test]
    fn test_broadcast_shape() {
        assert_eq!(broadcast_shape(&[2, 1], &[3]).unwrap(), vec![2, 3]);
        assert_eq!(broadcast_shape(&[], &[4]).unwrap(), vec![4]);
        assert!(broadcast_shape(&[2], &[3]).is_err());
    }
}
