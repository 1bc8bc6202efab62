//! Linear algebra on `f64` matrices.
//!
//! Everything here runs on a [`NumericKernel`]: operands are copied into
//! column-major scratch buffers, handed to the kernel, and copied back out.
//! [`LinearAlgebraRoutines`] exposes the kernel routines with shape checks
//! and status mapping, plus the high-level decompositions:
//!
//! | Decomposition | Type | Kernel routines |
//! |---------------|------|-----------------|
//! | LU | [`LuDecomposition`] | `getrf`, `getrs`, `getri` |
//! | QR | [`QrDecomposition`] | `geqrf`, `orgqr` |
//! | SVD | [`SvdDecomposition`] | `gesvd` / `gesdd` |
//! | Symmetric eigen | [`SymmetricEigen`] | `syev` / `syevr` |
//!
//! The free functions ([`solve`], [`inv`], ...) and the matching
//! [`NdArray<f64>`] methods use [`ArrayContext::global`].

pub mod decomp;
mod routines;

pub use decomp::{LuDecomposition, QrDecomposition, SvdDecomposition, SymmetricEigen};
pub use routines::{LeastSquares, LinearAlgebraRoutines};

use crate::array::NdArray;
use crate::backend::ArrayContext;
use crate::dtype::Element;
use crate::error::{CoreError, Result};
use crate::kernel::NumericKernel;
use crate::layout::{Order, DEFAULT_ORDER};

// ======================================================================
// Marshalling helpers
// ======================================================================

/// `(rows, cols)` of a 2-D operand.
pub(crate) fn matrix_dims<T: Element>(a: &NdArray<T>) -> Result<(usize, usize)> {
    match *a.shape() {
        [m, n] => Ok((m, n)),
        _ => Err(CoreError::InvalidArgument {
            reason: "expected a 2-D matrix",
        }),
    }
}

/// `(rows, cols)` of a 2-D operand that must be square.
pub(crate) fn square_dim<T: Element>(a: &NdArray<T>) -> Result<usize> {
    let (m, n) = matrix_dims(a)?;
    if m != n {
        return Err(CoreError::ShapeMismatch {
            expected: vec![m, m],
            got: vec![m, n],
        });
    }
    Ok(n)
}

/// `(rows, cols)` of a right-hand side; a vector is a single column.
pub(crate) fn rhs_dims<T: Element>(b: &NdArray<T>) -> Result<(usize, usize)> {
    match *b.shape() {
        [m] => Ok((m, 1)),
        [m, n] => Ok((m, n)),
        _ => Err(CoreError::InvalidArgument {
            reason: "right-hand side must be 1-D or 2-D",
        }),
    }
}

pub(crate) fn expect_shape<T: Element>(a: &NdArray<T>, expected: &[usize]) -> Result<()> {
    if a.shape() == expected {
        Ok(())
    } else {
        Err(CoreError::ShapeMismatch {
            expected: expected.to_vec(),
            got: a.shape().to_vec(),
        })
    }
}

/// Leading dimension for a column-major buffer with `rows` rows.
#[inline]
pub(crate) fn ld(rows: usize) -> usize {
    rows.max(1)
}

pub(crate) fn col_major<T: Element>(a: &NdArray<T>) -> Vec<T> {
    a.to_vec_in(Order::ColumnMajor)
}

/// Adopt a column-major kernel result as a fresh array in the default order,
/// so results reshape like any other new array.
pub(crate) fn from_col_major<T: Element>(data: Vec<T>, shape: Vec<usize>) -> Result<NdArray<T>> {
    let scratch = NdArray::from_vec_with_order(data, shape, Order::ColumnMajor)?;
    Ok(scratch.copy_with_order(DEFAULT_ORDER))
}

/// Copy column-major `data` back into `dst`, which may be any view.
pub(crate) fn write_back<T: Element>(dst: &NdArray<T>, data: Vec<T>) -> Result<()> {
    dst.assign(&NdArray::from_vec_with_order(data, dst.shape().to_vec(), Order::ColumnMajor)?)
}

/// Map a kernel status to a result.
pub(crate) fn status(routine: &'static str, info: i32) -> Result<()> {
    log::trace!("`{routine}` returned {info}");
    if info == 0 {
        Ok(())
    } else {
        Err(CoreError::kernel(routine, info))
    }
}

fn global() -> LinearAlgebraRoutines<'static> {
    let kernel: &'static dyn NumericKernel = ArrayContext::global().kernel();
    LinearAlgebraRoutines::new(kernel)
}

// ======================================================================
// Free functions on the global context
// ======================================================================

/// Matrix product `A B`.
///
/// ```
/// # use tessera_core::array::NdArray;
/// # use tessera_core::linalg;
/// let a = NdArray::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
/// let b = NdArray::from_rows(&[[5.0, 6.0], [7.0, 8.0]]).unwrap();
/// let c = linalg::matmul(&a, &b).unwrap();
/// assert_eq!(c.to_vec(), vec![19.0, 22.0, 43.0, 50.0]);
/// ```
pub fn matmul(a: &NdArray<f64>, b: &NdArray<f64>) -> Result<NdArray<f64>> {
    global().matmul(a, b)
}

/// Matrix-vector product `A x`.
pub fn matvec(a: &NdArray<f64>, x: &NdArray<f64>) -> Result<NdArray<f64>> {
    global().matvec(a, x)
}

/// Solve `A X = B` for square `A`.
///
/// ```
/// # use tessera_core::array::NdArray;
/// # use tessera_core::linalg;
/// let a = NdArray::from_rows(&[[2.0, 1.0], [1.0, 4.0]]).unwrap();
/// let b = NdArray::from_vec(vec![5.0, 6.0], vec![2]).unwrap();
/// let x = linalg::solve(&a, &b).unwrap();
/// assert!((x.get(&[0]).unwrap() - 2.0).abs() < 1e-12);
/// assert!((x.get(&[1]).unwrap() - 1.0).abs() < 1e-12);
/// ```
pub fn solve(a: &NdArray<f64>, b: &NdArray<f64>) -> Result<NdArray<f64>> {
    global().solve(a, b)
}

/// Inverse of a square matrix, or [`CoreError::SingularMatrix`].
pub fn inv(a: &NdArray<f64>) -> Result<NdArray<f64>> {
    global().inv(a)
}

/// Determinant of a square matrix.
///
/// ```
/// # use tessera_core::array::NdArray;
/// # use tessera_core::linalg;
/// let a = NdArray::from_rows(&[[6.0, 1.0, 1.0], [4.0, -2.0, 5.0], [2.0, 8.0, 7.0]]).unwrap();
/// assert!((linalg::det(&a).unwrap() + 306.0).abs() < 1e-10);
/// ```
pub fn det(a: &NdArray<f64>) -> Result<f64> {
    global().det(a)
}

/// Moore-Penrose pseudo-inverse.
pub fn pinv(a: &NdArray<f64>) -> Result<NdArray<f64>> {
    global().pinv(a)
}

/// Numerical rank from the singular values.
pub fn matrix_rank(a: &NdArray<f64>) -> Result<usize> {
    global().rank(a)
}

/// Minimum-norm least-squares solution of `A X ≈ B`.
pub fn lstsq(a: &NdArray<f64>, b: &NdArray<f64>) -> Result<LeastSquares> {
    global().lstsq(a, b, None)
}

impl NdArray<f64> {
    /// See [`linalg::matmul`](matmul).
    pub fn matmul(&self, other: &NdArray<f64>) -> Result<NdArray<f64>> {
        matmul(self, other)
    }

    /// See [`linalg::matvec`](matvec).
    pub fn matvec(&self, x: &NdArray<f64>) -> Result<NdArray<f64>> {
        matvec(self, x)
    }

    /// See [`linalg::solve`](solve).
    pub fn solve(&self, b: &NdArray<f64>) -> Result<NdArray<f64>> {
        solve(self, b)
    }

    /// See [`linalg::inv`](inv).
    pub fn inv(&self) -> Result<NdArray<f64>> {
        inv(self)
    }

    /// See [`linalg::det`](det).
    pub fn det(&self) -> Result<f64> {
        det(self)
    }

    /// See [`linalg::pinv`](pinv).
    pub fn pinv(&self) -> Result<NdArray<f64>> {
        pinv(self)
    }

    /// Numerical matrix rank. Not to be confused with [`ndim`](NdArray::ndim).
    pub fn matrix_rank(&self) -> Result<usize> {
        matrix_rank(self)
    }

    /// See [`linalg::lstsq`](lstsq).
    pub fn lstsq(&self, b: &NdArray<f64>) -> Result<LeastSquares> {
        lstsq(self, b)
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    fn approx_eq(a: &[f64], b: &[f64], tol: f64) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(&x, &y)| (x - y).abs() < tol)
    }

    #[test]
    fn test_write_back_into_transposed_view() {
        let a = NdArray::<f64>::zeros(vec![2, 3]);
        let at = a.transpose();
        // at is 3 x 2; column-major data for [[1, 2], [3, 4], [5, 6]].
        write_back(&at, vec![1.0, 3.0, 5.0, 2.0, 4.0, 6.0]).unwrap();
        assert_eq!(a.to_vec(), vec![1.0, 3.0, 5.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_results_reshape_without_copy() {
        let a = NdArray::from_rows(&[[4.0, 7.0], [2.0, 6.0]]).unwrap();
        let inv = a.inv().unwrap();
        assert!(inv.is_contiguous());
        assert_eq!(inv.stride(), &[2, 1]);
        let flat = inv.reshape(&[4]).unwrap();
        assert!(flat.shares_buffer(&inv));
        assert!(approx_eq(&flat.to_vec(), &[0.6, -0.7, -0.2, 0.4], 1e-12));
        assert!(inv.ravel().unwrap().shares_buffer(&inv));

        let svd = global().svd(&a, crate::kernel::SvdJob::All).unwrap();
        let u = svd.u().unwrap();
        assert_eq!(u.reshape(&[4]).unwrap().to_vec(), u.to_vec());
    }

    #[test]
    fn test_dims_helpers() {
        let v = NdArray::<f64>::zeros(vec![4]);
        assert!(matrix_dims(&v).is_err());
        assert_eq!(rhs_dims(&v).unwrap(), (4, 1));
        let m = NdArray::<f64>::zeros(vec![2, 3]);
        assert!(matches!(square_dim(&m), Err(CoreError::ShapeMismatch { .. })));
        assert_eq!(status("getrf", 2), Err(CoreError::kernel("getrf", 2)));
    }

    #[test]
    fn test_array_methods() {
        let a = NdArray::from_rows(&[[4.0, 7.0], [2.0, 6.0]]).unwrap();
        let inv = a.inv().unwrap();
        assert!(approx_eq(&inv.to_vec(), &[0.6, -0.7, -0.2, 0.4], 1e-12));
        assert!((a.det().unwrap() - 10.0).abs() < 1e-12);
        assert_eq!(a.matrix_rank().unwrap(), 2);

        let prod = a.matmul(&inv).unwrap();
        assert!(approx_eq(&prod.to_vec(), &[1.0, 0.0, 0.0, 1.0], 1e-12));

        let x = NdArray::from_vec(vec![1.0, 1.0], vec![2]).unwrap();
        assert_eq!(a.matvec(&x).unwrap().to_vec(), vec![11.0, 8.0]);
    }

    #[test]
    fn test_matmul_on_views() {
        let a = NdArray::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).unwrap();
        // Aᵗ A through a transposed view.
        let ata = a.transpose().matmul(&a).unwrap();
        assert_eq!(ata.shape(), &[3, 3]);
        assert_eq!(ata.get(&[0, 0]).unwrap(), 17.0);
        assert_eq!(ata.get(&[1, 2]).unwrap(), 36.0);
    }
}
