//! Element-wise arithmetic operators and reductions for [`NdArray`].
//!
//! Implements `Add`, `Sub`, `Mul`, `Div` for:
//! - `&NdArray<T> op &NdArray<T>` (element-wise, broadcasting)
//! - `&NdArray<T> op T` (scalar applied to every element)
//! - `Neg` for `Float` arrays
//!
//! Operands are read through their layouts, so views of any stride work.
//! Results always live in a fresh row-major buffer.

use core::ops::{Add, Div, Mul, Neg, Sub};

use crate::dtype::{Float, Scalar};
use crate::error::{CoreError, Result};

use super::NdArray;

// ======================================================================
// Array op Array  (panics when shapes do not broadcast)
// ======================================================================

macro_rules! impl_array_binop {
    ($trait:ident, $method:ident, $checked:ident, $op:tt) => {
        impl<T: Scalar> $trait for &NdArray<T> {
            type Output = NdArray<T>;

            fn $method(self, rhs: &NdArray<T>) -> NdArray<T> {
                match self.$checked(rhs) {
                    Ok(out) => out,
                    Err(e) => panic!("element-wise {}: {e}", stringify!($method)),
                }
            }
        }

        impl<T: Scalar> $trait for NdArray<T> {
            type Output = NdArray<T>;

            fn $method(self, rhs: NdArray<T>) -> NdArray<T> {
                (&self).$method(&rhs)
            }
        }

        impl<T: Scalar> NdArray<T> {
            #[doc = concat!("Element-wise `", stringify!($op), "`, returning `Err` when shapes do not broadcast.")]
            pub fn $checked(&self, other: &NdArray<T>) -> Result<NdArray<T>> {
                self.zip_map(other, |a, b| a $op b)
            }
        }
    };
}

impl_array_binop!(Add, add, add_checked, +);
impl_array_binop!(Sub, sub, sub_checked, -);
impl_array_binop!(Mul, mul, mul_checked, *);
impl_array_binop!(Div, div, div_checked, /);

// ======================================================================
// Array op scalar
// ======================================================================

macro_rules! impl_scalar_binop {
    ($trait:ident, $method:ident, $op:tt) => {
        impl<T: Scalar> $trait<T> for &NdArray<T> {
            type Output = NdArray<T>;

            fn $method(self, rhs: T) -> NdArray<T> {
                self.map(|a| a $op rhs)
            }
        }

        impl<T: Scalar> $trait<T> for NdArray<T> {
            type Output = NdArray<T>;

            fn $method(self, rhs: T) -> NdArray<T> {
                self.map(|a| a $op rhs)
            }
        }
    };
}

impl_scalar_binop!(Add, add, +);
impl_scalar_binop!(Sub, sub, -);
impl_scalar_binop!(Mul, mul, *);
impl_scalar_binop!(Div, div, /);

impl<T: Float> Neg for &NdArray<T> {
    type Output = NdArray<T>;

    fn neg(self) -> NdArray<T> {
        self.map(|a| -a)
    }
}

impl<T: Float> Neg for NdArray<T> {
    type Output = NdArray<T>;

    fn neg(self) -> NdArray<T> {
        -&self
    }
}

// ======================================================================
// Reductions
// ======================================================================

impl<T: Scalar> NdArray<T> {
    /// Sum of all elements.
    pub fn sum(&self) -> T {
        self.iter().sum()
    }

    /// Product of all elements.
    pub fn product(&self) -> T {
        self.iter().fold(T::one(), |acc, x| acc * x)
    }

    /// Sum along `axis`, producing an array with that axis removed.
    pub fn sum_axis(&self, axis: usize) -> Result<NdArray<T>> {
        self.fold_vectors(axis, T::zero(), |acc, x| acc + x)
    }

    /// Running sum over the flattened elements, in the receiver's shape.
    pub fn cumsum(&self) -> NdArray<T> {
        let mut acc = T::zero();
        self.map(|x| {
            acc += x;
            acc
        })
    }

    /// Running sum along each vector of `axis`.
    pub fn cumsum_axis(&self, axis: usize) -> Result<NdArray<T>> {
        let out = self.copy();
        for v in out.vector_iter(axis)? {
            let mut acc = T::zero();
            v.apply(|x| {
                acc += x;
                acc
            });
        }
        Ok(out)
    }

    /// Sum of the main diagonal of a (possibly rectangular) matrix.
    pub fn trace(&self) -> Result<T> {
        if self.ndim() != 2 {
            return Err(CoreError::InvalidArgument {
                reason: "trace requires a 2-D array",
            });
        }
        let k = self.rows().min(self.columns());
        Ok(self.submatrix(0, 0, k, k)?.diagonal()?.sum())
    }

    /// Outer product: `out[i, j] = self[i] * other[j]` over the flattened
    /// elements of both operands.
    ///
    /// ```
    /// # use tessera_core::array::NdArray;
    /// let a = NdArray::from_vec(vec![1, 2], vec![2]).unwrap();
    /// let b = NdArray::from_vec(vec![3, 4, 5], vec![3]).unwrap();
    /// assert_eq!(a.outer(&b).to_vec(), vec![3, 4, 5, 6, 8, 10]);
    /// ```
    pub fn outer(&self, other: &NdArray<T>) -> NdArray<T> {
        let rhs = other.to_vec();
        let data = self
            .iter()
            .flat_map(|a| rhs.iter().map(move |&b| a * b))
            .collect();
        NdArray::from_contiguous(data, vec![self.size(), rhs.len()])
    }

    /// Inner product of two 1-D arrays of equal length.
    pub fn dot(&self, other: &NdArray<T>) -> Result<T> {
        if self.ndim() != 1 || self.shape() != other.shape() {
            return Err(CoreError::ShapeMismatch {
                expected: self.shape().to_vec(),
                got: other.shape().to_vec(),
            });
        }
        Ok(self.iter().zip(other.iter()).map(|(a, b)| a * b).sum())
    }
}

impl<T: Scalar + PartialOrd> NdArray<T> {
    /// Minimum element. Returns `None` for empty arrays.
    pub fn min_element(&self) -> Option<T> {
        self.iter().reduce(|a, b| if b < a { b } else { a })
    }

    /// Maximum element. Returns `None` for empty arrays.
    pub fn max_element(&self) -> Option<T> {
        self.iter().reduce(|a, b| if b > a { b } else { a })
    }
}

impl<T: Float> NdArray<T> {
    /// Arithmetic mean. Returns `None` for empty arrays.
    pub fn mean(&self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        Some(self.sum() / T::from_usize(self.size()))
    }

    /// Mean along `axis`, producing an array with that axis removed.
    pub fn mean_axis(&self, axis: usize) -> Result<NdArray<T>> {
        let n = T::from_usize(self.shape().get(axis).copied().unwrap_or(0));
        self.reduce_vectors(axis, |v| v.sum() / n)
    }

    /// Sample variance (`n - 1` denominator) with Welford's update.
    /// `None` for fewer than two elements.
    pub fn var(&self) -> Option<T> {
        if self.size() < 2 {
            return None;
        }
        let (mut mean, mut m2) = (T::zero(), T::zero());
        for (i, x) in self.iter().enumerate() {
            let delta = x - mean;
            mean += delta / T::from_usize(i + 1);
            m2 += delta * (x - mean);
        }
        Some(m2 / T::from_usize(self.size() - 1))
    }

    /// Sample standard deviation; `None` for fewer than two elements.
    pub fn std(&self) -> Option<T> {
        self.var().map(Float::sqrt)
    }

    /// Sample variance along `axis`; NaN where a vector has fewer than two
    /// elements.
    pub fn var_axis(&self, axis: usize) -> Result<NdArray<T>> {
        self.reduce_vectors(axis, |v| v.var().unwrap_or_else(|| T::from_f64(f64::NAN)))
    }

    /// Sample standard deviation along `axis`.
    pub fn std_axis(&self, axis: usize) -> Result<NdArray<T>> {
        Ok(self.var_axis(axis)?.map(Float::sqrt))
    }

    /// Largest absolute difference between two equally shaped arrays.
    pub fn max_abs_diff(&self, other: &NdArray<T>) -> Result<T> {
        let diff = self.zip_map(other, |a, b| (a - b).abs())?;
        Ok(diff.iter().fold(T::zero(), Float::max))
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    #[test]
    fn test_add_arrays() {
        let a = NdArray::from_vec(vec![1.0, 2.0, 3.0], vec![3]).unwrap();
        let b = NdArray::from_vec(vec![4.0, 5.0, 6.0], vec![3]).unwrap();
        assert_eq!((&a + &b).to_vec(), vec![5.0, 7.0, 9.0]);
        assert_eq!((a - b).to_vec(), vec![-3.0, -3.0, -3.0]);
    }

    #[test]
    #[should_panic(expected = "element-wise mul")]
    fn test_mul_shape_mismatch_panics() {
        let a = NdArray::<i32>::zeros(vec![3]);
        let b = NdArray::<i32>::zeros(vec![2]);
        let _ = &a * &b;
    }

    #[test]
    fn test_checked_ops() {
        let a = NdArray::from_vec(vec![6, 8], vec![2]).unwrap();
        let b = NdArray::from_vec(vec![3, 2], vec![2]).unwrap();
        assert_eq!(a.div_checked(&b).unwrap().to_vec(), vec![2, 4]);
        assert!(a.add_checked(&NdArray::zeros(vec![3])).is_err());
    }

    #[test]
    fn test_ops_on_views() {
        let a = NdArray::from_vec(vec![1, 2, 3, 4], vec![2, 2]).unwrap();
        let sum = &a + &a.transpose();
        assert_eq!(sum.to_vec(), vec![2, 5, 5, 8]);
    }

    #[test]
    fn test_scalar_ops_and_neg() {
        let a = NdArray::from_vec(vec![1.0, -2.0], vec![2]).unwrap();
        assert_eq!((&a * 3.0).to_vec(), vec![3.0, -6.0]);
        assert_eq!((-&a).to_vec(), vec![-1.0, 2.0]);
    }

    #[test]
    fn test_complex_arithmetic() {
        let a = NdArray::from_vec(vec![Complex64::new(0.0, 1.0)], vec![1]).unwrap();
        let sq = &a * &a;
        assert_eq!(sq.get(&[0]).unwrap(), Complex64::new(-1.0, 0.0));
    }

    #[test]
    fn test_reductions() {
        let a = NdArray::from_vec(vec![3, 1, 4, 1, 5, 9], vec![2, 3]).unwrap();
        assert_eq!(a.sum(), 23);
        assert_eq!(a.product(), 540);
        assert_eq!(a.min_element(), Some(1));
        assert_eq!(a.max_element(), Some(9));
        assert_eq!(a.sum_axis(0).unwrap().to_vec(), vec![4, 6, 13]);
        assert_eq!(a.sum_axis(1).unwrap().to_vec(), vec![8, 15]);
        assert!(NdArray::<i32>::zeros(vec![0]).min_element().is_none());
    }

    #[test]
    fn test_mean() {
        let a = NdArray::from_vec(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]).unwrap();
        assert_eq!(a.mean(), Some(2.5));
        assert_eq!(a.mean_axis(0).unwrap().to_vec(), vec![2.0, 3.0]);
    }

    #[test]
    fn test_cumsum() {
        let a = NdArray::from_rows(&[[1, 2, 3], [4, 5, 6]]).unwrap();
        assert_eq!(a.cumsum().to_vec(), vec![1, 3, 6, 10, 15, 21]);
        assert_eq!(a.cumsum_axis(0).unwrap().to_vec(), vec![1, 2, 3, 5, 7, 9]);
        assert_eq!(a.cumsum_axis(1).unwrap().to_vec(), vec![1, 3, 6, 4, 9, 15]);
        assert_eq!(a.transpose().cumsum().to_vec(), vec![1, 5, 7, 12, 15, 21]);
        assert_eq!(a.to_vec(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_trace_and_outer() {
        let a = NdArray::from_rows(&[[1, 2, 3], [4, 5, 6]]).unwrap();
        assert_eq!(a.trace().unwrap(), 6);
        assert!(NdArray::<i32>::zeros(vec![3]).trace().is_err());

        let x = NdArray::from_vec(vec![0.0, 1.0, 2.0, 3.0], vec![4]).unwrap();
        let o = x.outer(&x.reshape(&[2, 2]).unwrap());
        assert_eq!(o.shape(), &[4, 4]);
        assert_eq!(o.row(3).unwrap().to_vec(), vec![0.0, 3.0, 6.0, 9.0]);
    }

    #[test]
    fn test_var_and_std() {
        let x = NdArray::from_vec(vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], vec![8]).unwrap();
        assert!((x.var().unwrap() - 32.0 / 7.0).abs() < 1e-12);
        assert!((x.std().unwrap() - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
        assert!(NdArray::from_vec(vec![1.0], vec![1]).unwrap().var().is_none());

        let m = NdArray::from_rows(&[[1.0, 3.0], [5.0, 11.0]]).unwrap();
        assert_eq!(m.var_axis(0).unwrap().to_vec(), vec![8.0, 32.0]);
        assert_eq!(m.std_axis(1).unwrap().to_vec(), vec![2.0_f64.sqrt(), 18.0_f64.sqrt()]);
        let single = NdArray::from_rows(&[[1.0, 2.0]]).unwrap();
        assert!(single.var_axis(0).unwrap().iter().all(f64::is_nan));
    }

    #[test]
    fn test_dot() {
        let a = NdArray::from_vec(vec![1, 2, 3], vec![3]).unwrap();
        assert_eq!(a.dot(&a).unwrap(), 14);
        assert!(a.dot(&NdArray::zeros(vec![2])).is_err());
    }
}
