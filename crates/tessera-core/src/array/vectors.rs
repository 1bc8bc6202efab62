//! 1-D vectors along one dimension, and folds over them.
//!
//! Fixing every dimension except `dim` picks out one vector. The vectors are
//! numbered by the coordinates of the remaining dimensions in row-major
//! order, so for a `[2, 3, 4]` array the vectors along `dim = 1` are
//!
//! ```text
//! i = 0 → (0, :, 0)   i = 1 → (0, :, 1)   ...   i = 4 → (1, :, 0)   ...
//! ```
//!
//! Together they cover every element exactly once.

use crate::dtype::Element;
use crate::error::{CoreError, Result};
use crate::layout::{unravel_row_major, Layout};

use super::NdArray;

impl<T: Element> NdArray<T> {
    /// Number of vectors along `dim`: the product of every other extent.
    pub fn vectors(&self, dim: usize) -> Result<usize> {
        self.check_dim(dim)?;
        Ok(self
            .shape()
            .iter()
            .enumerate()
            .filter(|&(d, _)| d != dim)
            .map(|(_, &n)| n)
            .product())
    }

    /// The `i`-th vector along `dim`, as a view.
    ///
    /// ```
    /// # use tessera_core::array::NdArray;
    /// let a = NdArray::from_vec((0..6).collect::<Vec<i32>>(), vec![2, 3]).unwrap();
    /// assert_eq!(a.get_vector(0, 2).unwrap().to_vec(), vec![2, 5]);
    /// assert_eq!(a.get_vector(1, 1).unwrap().to_vec(), vec![3, 4, 5]);
    /// ```
    pub fn get_vector(&self, dim: usize, i: usize) -> Result<Self> {
        let count = self.vectors(dim)?;
        if i >= count {
            return Err(CoreError::IndexOutOfBounds {
                index: vec![i],
                shape: vec![count],
            });
        }
        let (rest_shape, rest_stride): (Vec<usize>, Vec<usize>) = self
            .shape()
            .iter()
            .zip(self.stride())
            .enumerate()
            .filter(|&(d, _)| d != dim)
            .map(|(_, (&n, &s))| (n, s))
            .unzip();
        let coords = unravel_row_major(i, &rest_shape);
        let offset = self.offset()
            + coords
                .iter()
                .zip(&rest_stride)
                .map(|(&c, &s)| c * s)
                .sum::<usize>();
        let layout = Layout::new(offset, vec![self.shape()[dim]], vec![self.stride()[dim]])?;
        Ok(self.view_unchecked(layout))
    }

    /// Iterate over every vector along `dim`.
    ///
    /// The iterator is cheap to clone and can be recreated at any time, so a
    /// fold over it can be evaluated more than once.
    pub fn vector_iter(&self, dim: usize) -> Result<Vectors<'_, T>> {
        let count = self.vectors(dim)?;
        Ok(Vectors {
            array: self,
            dim,
            next: 0,
            count,
        })
    }

    /// Fold each vector along `dim` into one value.
    ///
    /// The result drops `dim` from the shape; its element `i` (row-major) is
    /// `f(get_vector(dim, i))`.
    ///
    /// ```
    /// # use tessera_core::array::NdArray;
    /// let a = NdArray::from_vec(vec![1, 2, 3, 4, 5, 6], vec![2, 3]).unwrap();
    /// let sums = a.reduce_vectors(1, |v| v.iter().sum::<i32>()).unwrap();
    /// assert_eq!(sums.to_vec(), vec![6, 15]);
    /// ```
    pub fn reduce_vectors<U, F>(&self, dim: usize, mut f: F) -> Result<NdArray<U>>
    where
        U: Element,
        F: FnMut(&NdArray<T>) -> U,
    {
        let values: Vec<U> = self.vector_iter(dim)?.map(|v| f(&v)).collect();
        let mut shape = self.shape().to_vec();
        shape.remove(dim);
        NdArray::from_vec(values, shape)
    }

    /// Fold the elements of each vector along `dim`, starting from `init`.
    ///
    /// ```
    /// # use tessera_core::array::NdArray;
    /// let a = NdArray::from_vec(vec![1, 2, 3, 4, 5, 6], vec![2, 3]).unwrap();
    /// let sums = a.fold_vectors(0, 0, |acc, x| acc + x).unwrap();
    /// assert_eq!(sums.to_vec(), vec![5, 7, 9]);
    /// ```
    pub fn fold_vectors<U, F>(&self, dim: usize, init: U, mut f: F) -> Result<NdArray<U>>
    where
        U: Element,
        F: FnMut(U, T) -> U,
    {
        self.reduce_vectors(dim, |v| v.iter().fold(init.clone(), &mut f))
    }

    fn check_dim(&self, dim: usize) -> Result<()> {
        if dim >= self.ndim() {
            return Err(CoreError::AxisOutOfBounds {
                axis: dim,
                ndim: self.ndim(),
            });
        }
        Ok(())
    }
}

/// Iterator over the vectors of an array along one dimension.
#[derive(Debug, Clone)]
pub struct Vectors<'a, T: Element> {
    array: &'a NdArray<T>,
    dim: usize,
    next: usize,
    count: usize,
}

impl<T: Element> Iterator for Vectors<'_, T> {
    type Item = NdArray<T>;

    fn next(&mut self) -> Option<NdArray<T>> {
        if self.next >= self.count {
            return None;
        }
        let v = self.array.get_vector(self.dim, self.next).ok()?;
        self.next += 1;
        Some(v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.count - self.next;
        (left, Some(left))
    }
}

impl<T: Element> ExactSizeIterator for Vectors<'_, T> {}
