//! Array factories analogous to `np.zeros`, `np.eye`, `np.arange`, etc.

use crate::dtype::{Element, Float, Scalar};
use crate::error::{CoreError, Result};
use crate::layout::{unravel_row_major, Layout, DEFAULT_ORDER};

use super::buffer::Buffer;
use super::NdArray;

impl<T: Element> NdArray<T> {
    /// Create an array filled with a constant value.
    pub fn full(shape: Vec<usize>, value: T) -> Self {
        let numel: usize = shape.iter().product();
        Self::from_contiguous(vec![value; numel], shape)
    }

    /// Create an array by calling `f` with every multi-index in row-major
    /// order.
    ///
    /// ```
    /// # use tessera_core::array::NdArray;
    /// let a = NdArray::from_fn(vec![2, 3], |idx| (idx[0] * 10 + idx[1]) as i32);
    /// assert_eq!(a.to_vec(), vec![0, 1, 2, 10, 11, 12]);
    /// ```
    pub fn from_fn<F>(shape: Vec<usize>, mut f: F) -> Self
    where
        F: FnMut(&[usize]) -> T,
    {
        let numel: usize = shape.iter().product();
        let data = (0..numel)
            .map(|i| f(&unravel_row_major(i, &shape)))
            .collect();
        Self::from_contiguous(data, shape)
    }

    /// Create a 2-D array from nested row data.
    ///
    /// Every row must have the same length.
    ///
    /// ```
    /// # use tessera_core::array::NdArray;
    /// let m = NdArray::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
    /// assert_eq!(m.shape(), &[2, 2]);
    /// assert_eq!(m.get(&[1, 0]).unwrap(), 3.0);
    /// ```
    pub fn from_rows<R: AsRef<[T]>>(rows: &[R]) -> Result<Self> {
        let cols = rows.first().map_or(0, |r| r.as_ref().len());
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(CoreError::ShapeMismatch {
                    expected: vec![cols],
                    got: vec![row.len()],
                });
            }
            data.extend_from_slice(row);
        }
        Self::from_vec(data, vec![rows.len(), cols])
    }

    /// `data.len()` must equal the product of `shape`.
    pub(crate) fn from_contiguous(data: Vec<T>, shape: Vec<usize>) -> Self {
        Self {
            buffer: Buffer::new(data),
            layout: Layout::contiguous(shape, DEFAULT_ORDER),
        }
    }
}

impl<T: Scalar> NdArray<T> {
    /// Create an array filled with zeros.
    ///
    /// ```
    /// # use tessera_core::array::NdArray;
    /// let a = NdArray::<f64>::zeros(vec![2, 3]);
    /// assert_eq!(a.shape(), &[2, 3]);
    /// assert!(a.iter().all(|x| x == 0.0));
    /// ```
    pub fn zeros(shape: Vec<usize>) -> Self {
        Self::full(shape, T::zero())
    }

    /// Create an array filled with ones.
    pub fn ones(shape: Vec<usize>) -> Self {
        Self::full(shape, T::one())
    }

    /// Create a 1-D array with values `[0, 1, 2, ..., n-1]`.
    ///
    /// ```
    /// # use tessera_core::array::NdArray;
    /// let a = NdArray::<i32>::arange(5);
    /// assert_eq!(a.to_vec(), vec![0, 1, 2, 3, 4]);
    /// ```
    pub fn arange(n: usize) -> Self {
        let data: Vec<T> = (0..n).map(T::from_usize).collect();
        Self::from_contiguous(data, vec![n])
    }

    /// Create an identity matrix of size `n x n`.
    pub fn eye(n: usize) -> Self {
        let mut data = vec![T::zero(); n * n];
        for i in 0..n {
            data[i * n + i] = T::one();
        }
        Self::from_contiguous(data, vec![n, n])
    }

    /// A square matrix with `diag` on its main diagonal.
    pub fn from_diagonal(diag: &[T]) -> Self {
        let n = diag.len();
        let mut data = vec![T::zero(); n * n];
        for (i, &d) in diag.iter().enumerate() {
            data[i * n + i] = d;
        }
        Self::from_contiguous(data, vec![n, n])
    }
}

impl<T: Scalar + PartialOrd> NdArray<T> {
    /// Values `start, start + step, ...` strictly below `end`.
    ///
    /// ```
    /// # use tessera_core::array::NdArray;
    /// let a = NdArray::range(2, 11, 3).unwrap();
    /// assert_eq!(a.to_vec(), vec![2, 5, 8]);
    /// ```
    pub fn range(start: T, end: T, step: T) -> Result<Self> {
        if step <= T::zero() {
            return Err(CoreError::InvalidArgument {
                reason: "range step must be > 0",
            });
        }
        let mut data = Vec::new();
        let mut value = start;
        while value < end {
            data.push(value);
            value += step;
        }
        let n = data.len();
        Ok(Self::from_contiguous(data, vec![n]))
    }
}

impl<T: Float> NdArray<T> {
    /// Create a 1-D array with `n` evenly spaced values from `start` to `end`
    /// (inclusive).
    ///
    /// Returns an error if `n < 2`.
    pub fn linspace(start: T, end: T, n: usize) -> Result<Self> {
        if n < 2 {
            return Err(CoreError::InvalidArgument {
                reason: "linspace requires n >= 2",
            });
        }
        let step = (end - start) / T::from_usize(n - 1);
        let mut data: Vec<T> = (0..n).map(|i| start + step * T::from_usize(i)).collect();
        data[n - 1] = end;
        Ok(Self::from_contiguous(data, vec![n]))
    }
}
