//! Joining arrays along a dimension and splitting them apart again.
//!
//! `concatenate` and the `*stack` helpers always allocate a fresh row-major
//! array. `split` and its variants return views into the receiver.

use crate::dtype::Element;
use crate::error::{CoreError, Result};

use super::NdArray;

impl<T: Element> NdArray<T> {
    /// Join `arrays` along `dim`.
    ///
    /// Every array must have the same rank and the same extent in every
    /// dimension other than `dim`.
    ///
    /// ```
    /// # use tessera_core::array::NdArray;
    /// let a = NdArray::from_rows(&[[1, 2], [3, 4]]).unwrap();
    /// let b = NdArray::from_rows(&[[5, 6]]).unwrap();
    /// let c = NdArray::concatenate(&[&a, &b], 0).unwrap();
    /// assert_eq!(c.shape(), &[3, 2]);
    /// assert_eq!(c.to_vec(), vec![1, 2, 3, 4, 5, 6]);
    /// ```
    pub fn concatenate(arrays: &[&NdArray<T>], dim: usize) -> Result<Self> {
        let first = arrays.first().ok_or(CoreError::InvalidArgument {
            reason: "cannot concatenate zero arrays",
        })?;
        let ndim = first.ndim();
        if dim >= ndim {
            return Err(CoreError::AxisOutOfBounds { axis: dim, ndim });
        }

        let mut shape = first.shape().to_vec();
        shape[dim] = 0;
        for a in arrays {
            let compatible = a.ndim() == ndim
                && a.shape()
                    .iter()
                    .zip(first.shape())
                    .enumerate()
                    .all(|(d, (&x, &y))| d == dim || x == y);
            if !compatible {
                return Err(CoreError::ShapeMismatch {
                    expected: first.shape().to_vec(),
                    got: a.shape().to_vec(),
                });
            }
            shape[dim] += a.shape()[dim];
        }

        let out = NdArray::full(shape, T::default());
        let mut start = 0;
        for a in arrays {
            let len = a.shape()[dim];
            out.select_range(dim, start, len, 1)?.assign(a)?;
            start += len;
        }
        Ok(out)
    }

    /// Stack matrices on top of each other. 1-D arrays count as single rows.
    pub fn vstack(arrays: &[&NdArray<T>]) -> Result<Self> {
        let rows = as_matrices(arrays, |a| vec![1, a.size()])?;
        let refs: Vec<&NdArray<T>> = rows.iter().collect();
        Self::concatenate(&refs, 0)
    }

    /// Place matrices side by side. 1-D arrays count as single columns.
    pub fn hstack(arrays: &[&NdArray<T>]) -> Result<Self> {
        let columns = as_matrices(arrays, |a| vec![a.size(), 1])?;
        let refs: Vec<&NdArray<T>> = columns.iter().collect();
        Self::concatenate(&refs, 1)
    }

    /// Cut `dim` into `parts` equally sized views.
    ///
    /// ```
    /// # use tessera_core::array::NdArray;
    /// let a = NdArray::from_vec((0..6).collect::<Vec<i32>>(), vec![6]).unwrap();
    /// let parts = a.split(3, 0).unwrap();
    /// assert_eq!(parts[1].to_vec(), vec![2, 3]);
    /// assert!(parts[1].shares_buffer(&a));
    /// ```
    pub fn split(&self, parts: usize, dim: usize) -> Result<Vec<Self>> {
        if dim >= self.ndim() {
            return Err(CoreError::AxisOutOfBounds {
                axis: dim,
                ndim: self.ndim(),
            });
        }
        let extent = self.shape()[dim];
        if parts == 0 || extent % parts != 0 {
            return Err(CoreError::InvalidArgument {
                reason: "parts must evenly divide the split dimension",
            });
        }
        let len = extent / parts;
        (0..parts)
            .map(|i| self.select_range(dim, i * len, len, 1))
            .collect()
    }

    /// Split the rows of a matrix into `parts` blocks.
    pub fn vsplit(&self, parts: usize) -> Result<Vec<Self>> {
        self.split(parts, 0)
    }

    /// Split the columns of a matrix into `parts` blocks.
    pub fn hsplit(&self, parts: usize) -> Result<Vec<Self>> {
        self.split(parts, 1)
    }
}

/// Lift 1-D operands to matrices of `shape(a)`; everything else must already
/// be 2-D.
fn as_matrices<T, F>(arrays: &[&NdArray<T>], shape: F) -> Result<Vec<NdArray<T>>>
where
    T: Element,
    F: Fn(&NdArray<T>) -> Vec<usize>,
{
    arrays
        .iter()
        .map(|a| match a.ndim() {
            1 => a.reshape_or_copy(&shape(*a)),
            2 => Ok((*a).clone()),
            _ => Err(CoreError::InvalidArgument {
                reason: "stacking requires 1-D or 2-D arrays",
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> NdArray<i32> {
        NdArray::from_vec((0..6).collect(), vec![2, 3]).unwrap()
    }

    #[test]
    fn test_concatenate_along_columns() {
        let a = grid();
        let b = NdArray::from_rows(&[[10], [20]]).unwrap();
        let c = NdArray::concatenate(&[&a, &b], 1).unwrap();
        assert_eq!(c.shape(), &[2, 4]);
        assert_eq!(c.to_vec(), vec![0, 1, 2, 10, 3, 4, 5, 20]);
        assert!(!c.shares_buffer(&a));
    }

    #[test]
    fn test_concatenate_views_and_empty_parts() {
        let a = grid();
        let t = a.transpose();
        let empty = NdArray::<i32>::zeros(vec![0, 2]);
        let c = NdArray::concatenate(&[&t, &empty, &t], 0).unwrap();
        assert_eq!(c.shape(), &[6, 2]);
        assert_eq!(&c.to_vec()[..6], &[0, 3, 1, 4, 2, 5]);
        assert_eq!(&c.to_vec()[6..], &[0, 3, 1, 4, 2, 5]);
    }

    #[test]
    fn test_concatenate_errors() {
        let a = grid();
        assert!(matches!(
            NdArray::<i32>::concatenate(&[], 0),
            Err(CoreError::InvalidArgument { .. })
        ));
        assert!(matches!(
            NdArray::concatenate(&[&a], 2),
            Err(CoreError::AxisOutOfBounds { .. })
        ));
        let b = NdArray::<i32>::zeros(vec![3, 3]);
        assert!(matches!(
            NdArray::concatenate(&[&a, &b], 1),
            Err(CoreError::ShapeMismatch { .. })
        ));
        let flat = NdArray::<i32>::zeros(vec![3]);
        assert!(NdArray::concatenate(&[&a, &flat], 0).is_err());
    }

    #[test]
    fn test_vstack_and_hstack() {
        let a = grid();
        let row = NdArray::from_vec(vec![7, 8, 9], vec![3]).unwrap();
        let v = NdArray::vstack(&[&a, &row]).unwrap();
        assert_eq!(v.shape(), &[3, 3]);
        assert_eq!(v.row(2).unwrap().to_vec(), vec![7, 8, 9]);

        let col = NdArray::from_vec(vec![-1, -2], vec![2]).unwrap();
        let h = NdArray::hstack(&[&col, &a]).unwrap();
        assert_eq!(h.shape(), &[2, 4]);
        assert_eq!(h.column(0).unwrap().to_vec(), vec![-1, -2]);

        let cube = NdArray::<i32>::zeros(vec![1, 1, 1]);
        assert!(NdArray::vstack(&[&cube]).is_err());
    }

    #[test]
    fn test_split_views() {
        let a = NdArray::from_vec((0..12).collect::<Vec<i32>>(), vec![4, 3]).unwrap();
        let rows = a.vsplit(2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].to_vec(), vec![6, 7, 8, 9, 10, 11]);

        let cols = a.hsplit(3).unwrap();
        assert_eq!(cols[2].to_vec(), vec![2, 5, 8, 11]);
        let rebuilt = NdArray::concatenate(&cols.iter().collect::<Vec<_>>(), 1).unwrap();
        assert_eq!(rebuilt, a);

        rows[0].fill(0);
        assert_eq!(a.get(&[1, 2]).unwrap(), 0);
        assert_eq!(cols[2].get(&[1]).unwrap(), 0);
    }

    #[test]
    fn test_split_errors() {
        let a = grid();
        assert!(matches!(a.split(2, 1), Err(CoreError::InvalidArgument { .. })));
        assert!(a.split(0, 0).is_err());
        assert!(matches!(a.split(1, 2), Err(CoreError::AxisOutOfBounds { .. })));
    }
}
