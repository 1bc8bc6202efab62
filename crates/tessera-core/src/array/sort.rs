//! Sorting and arg-extrema.
//!
//! Elements are compared with `partial_cmp`; incomparable pairs (NaN) are
//! treated as equal. All positions are in logical row-major order.

use core::cmp::Ordering;

use crate::dtype::Element;
use crate::error::Result;

use super::NdArray;

fn ascending<T: PartialOrd>(a: &T, b: &T) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

impl<T: Element + PartialOrd> NdArray<T> {
    /// A sorted copy with the receiver's shape, filled in row-major order.
    ///
    /// ```
    /// # use tessera_core::array::NdArray;
    /// let a = NdArray::from_rows(&[[3, 1], [4, 1]]).unwrap();
    /// assert_eq!(a.sort().to_vec(), vec![1, 1, 3, 4]);
    /// ```
    pub fn sort(&self) -> Self {
        self.sort_by(ascending)
    }

    /// Sort each vector along `dim` independently.
    pub fn sort_dim(&self, dim: usize) -> Result<Self> {
        self.sort_dim_by(dim, ascending)
    }

    /// Positions that would sort the flattened array, ascending and stable.
    pub fn argsort(&self) -> Vec<usize> {
        let values = self.to_vec();
        let mut order: Vec<usize> = (0..values.len()).collect();
        order.sort_by(|&a, &b| ascending(&values[a], &values[b]));
        order
    }

    /// Position of the first largest element; `None` when empty.
    pub fn argmax(&self) -> Option<usize> {
        self.arg_extreme(Ordering::Greater)
    }

    /// Position of the first smallest element; `None` when empty.
    pub fn argmin(&self) -> Option<usize> {
        self.arg_extreme(Ordering::Less)
    }

    fn arg_extreme(&self, wanted: Ordering) -> Option<usize> {
        let mut it = self.iter().enumerate();
        let (mut best, mut value) = it.next()?;
        for (i, v) in it {
            if v.partial_cmp(&value) == Some(wanted) {
                best = i;
                value = v;
            }
        }
        Some(best)
    }
}

impl<T: Element> NdArray<T> {
    /// A copy sorted with `cmp`, keeping the receiver's shape.
    pub fn sort_by<F>(&self, mut cmp: F) -> Self
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let mut data = self.to_vec();
        data.sort_by(&mut cmp);
        NdArray::from_contiguous(data, self.shape().to_vec())
    }

    /// Sort each vector along `dim` with `cmp`.
    pub fn sort_dim_by<F>(&self, dim: usize, mut cmp: F) -> Result<Self>
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let out = self.copy();
        for v in out.vector_iter(dim)? {
            let mut values = v.to_vec();
            values.sort_by(&mut cmp);
            let len = values.len();
            v.assign(&NdArray::from_contiguous(values, vec![len]))?;
        }
        Ok(out)
    }
}
