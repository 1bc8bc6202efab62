//! Dense numeric kernels behind a LAPACK-shaped trait.
//!
//! Every routine works on flat **column-major** `f64` slices with an explicit
//! leading dimension, and reports its outcome as a LAPACK `info` status:
//!
//! | status | meaning |
//! |--------|---------|
//! | `0`    | success |
//! | `< 0`  | argument `-status` (1-based, in LAPACK argument order) is invalid |
//! | `> 0`  | routine-specific numerical failure (e.g. a zero pivot) |
//!
//! Nothing in this module allocates an array type or logs; the checked,
//! logging layer lives in [`crate::linalg::LinearAlgebraRoutines`]. When a
//! routine returns a nonzero status its output buffers are in an undefined
//! state and must not be reused.
//!
//! [`ReferenceKernel`] is a pure-Rust implementation usable on any target.

use core::fmt;

/// Early-return a negative argument status when a precondition fails.
macro_rules! require {
    ($cond:expr, $arg:expr) => {
        if !($cond) {
            return -($arg);
        }
    };
}

mod blas;
mod eigen;
mod lu;
mod qr;
mod reference;
mod svd;

pub use reference::ReferenceKernel;

/// Whether an operand is used as stored or transposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transpose {
    #[default]
    No,
    Yes,
}

/// Which singular vectors an SVD routine computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SvdJob {
    /// Full `U` (m x m) and `Vᵗ` (n x n).
    #[default]
    All,
    /// Thin `U` (m x k) and `Vᵗ` (k x n) with `k = min(m, n)`.
    Economy,
    /// Singular values only.
    None,
}

/// Whether a symmetric eigensolver also returns eigenvectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EigenJob {
    ValuesOnly,
    #[default]
    Vectors,
}

/// Which triangle of a symmetric matrix holds the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Triangle {
    #[default]
    Upper,
    Lower,
}

/// Subset of eigenvalues requested from [`NumericKernel::syevr`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum EigenRange {
    #[default]
    All,
    /// Eigenvalues in the half-open interval `(lower, upper]`.
    Value { lower: f64, upper: f64 },
    /// The `first`-th through `last`-th smallest eigenvalues, 1-based and
    /// inclusive.
    Index { first: usize, last: usize },
}

/// Low-level dense routines with LAPACK/BLAS semantics.
///
/// Implementations must be shareable across threads, since a selected
/// backend is pinned process-wide.
#[allow(clippy::too_many_arguments)]
pub trait NumericKernel: Send + Sync + fmt::Debug {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// `C = alpha * op(A) * op(B) + beta * C` with `op(A)` m x k and
    /// `op(B)` k x n. When `beta == 0`, `C` is not read.
    fn gemm(
        &self,
        transa: Transpose,
        transb: Transpose,
        m: usize,
        n: usize,
        k: usize,
        alpha: f64,
        a: &[f64],
        lda: usize,
        b: &[f64],
        ldb: usize,
        beta: f64,
        c: &mut [f64],
        ldc: usize,
    ) -> i32;

    /// `y = alpha * op(A) * x + beta * y` for an m x n matrix `A`.
    fn gemv(
        &self,
        trans: Transpose,
        m: usize,
        n: usize,
        alpha: f64,
        a: &[f64],
        lda: usize,
        x: &[f64],
        incx: usize,
        beta: f64,
        y: &mut [f64],
        incy: usize,
    ) -> i32;

    /// LU factorization with partial pivoting, `A = P L U`, in place.
    ///
    /// `ipiv[i]` (1-based) is the row interchanged with row `i + 1`. A
    /// positive status `i` means `U[i-1, i-1]` is exactly zero; the
    /// factorization is still complete.
    fn getrf(&self, m: usize, n: usize, a: &mut [f64], lda: usize, ipiv: &mut [i32]) -> i32;

    /// Solve `op(A) X = B` using the factors produced by [`getrf`](Self::getrf).
    fn getrs(
        &self,
        trans: Transpose,
        n: usize,
        nrhs: usize,
        a: &[f64],
        lda: usize,
        ipiv: &[i32],
        b: &mut [f64],
        ldb: usize,
    ) -> i32;

    /// Inverse of a matrix from its [`getrf`](Self::getrf) factors, in place.
    fn getri(&self, n: usize, a: &mut [f64], lda: usize, ipiv: &[i32]) -> i32;

    /// Solve `A X = B`: factors `a` in place and overwrites `b` with `X`.
    fn gesv(
        &self,
        n: usize,
        nrhs: usize,
        a: &mut [f64],
        lda: usize,
        ipiv: &mut [i32],
        b: &mut [f64],
        ldb: usize,
    ) -> i32;

    /// Householder QR factorization. `R` lands on and above the diagonal,
    /// the reflectors (with implicit unit leading entry) below it.
    fn geqrf(&self, m: usize, n: usize, a: &mut [f64], lda: usize, tau: &mut [f64]) -> i32;

    /// Form the first `n` columns of `Q` from `k` reflectors left by
    /// [`geqrf`](Self::geqrf).
    fn orgqr(&self, m: usize, n: usize, k: usize, a: &mut [f64], lda: usize, tau: &[f64]) -> i32;

    /// Singular value decomposition `A = U Σ Vᵗ`. `a` is destroyed.
    fn gesvd(
        &self,
        job: SvdJob,
        m: usize,
        n: usize,
        a: &mut [f64],
        lda: usize,
        s: &mut [f64],
        u: &mut [f64],
        ldu: usize,
        vt: &mut [f64],
        ldvt: usize,
    ) -> i32;

    /// Divide-and-conquer SVD. Same contract as [`gesvd`](Self::gesvd);
    /// kernels without a separate driver reuse it.
    fn gesdd(
        &self,
        job: SvdJob,
        m: usize,
        n: usize,
        a: &mut [f64],
        lda: usize,
        s: &mut [f64],
        u: &mut [f64],
        ldu: usize,
        vt: &mut [f64],
        ldvt: usize,
    ) -> i32 {
        self.gesvd(job, m, n, a, lda, s, u, ldu, vt, ldvt)
    }

    /// Eigenvalues (ascending) of a symmetric matrix, and eigenvectors in
    /// the columns of `a` when `jobz` asks for them.
    fn syev(&self, jobz: EigenJob, uplo: Triangle, n: usize, a: &mut [f64], lda: usize, w: &mut [f64]) -> i32;

    /// Selected eigenvalues (ascending) and eigenvectors of a symmetric
    /// matrix. On success `m` holds how many were found; only `w[..m]` and
    /// the first `m` columns of `z` are written. `isuppz` receives the
    /// 1-based first/last nonzero row of each eigenvector.
    fn syevr(
        &self,
        jobz: EigenJob,
        range: EigenRange,
        uplo: Triangle,
        n: usize,
        a: &mut [f64],
        lda: usize,
        abstol: f64,
        m: &mut usize,
        w: &mut [f64],
        z: &mut [f64],
        ldz: usize,
        isuppz: &mut [i32],
    ) -> i32;

    /// Minimum-norm least-squares solution of `A X ≈ B` via a rank-revealing
    /// QR. `b` has `max(m, n)` rows; `X` overwrites its first `n` rows.
    /// `rank` receives the effective rank at tolerance `rcond`.
    fn gelsy(
        &self,
        m: usize,
        n: usize,
        nrhs: usize,
        a: &mut [f64],
        lda: usize,
        b: &mut [f64],
        ldb: usize,
        jpvt: &mut [i32],
        rcond: f64,
        rank: &mut usize,
    ) -> i32;
}

/// Minimum slice length for a column-major `rows x cols` matrix with
/// leading dimension `ld`.
pub(crate) fn matrix_len(rows: usize, cols: usize, ld: usize) -> usize {
    if rows == 0 || cols == 0 {
        0
    } else {
        ld * (cols - 1) + rows
    }
}

/// Minimum slice length for a strided vector of `n` elements.
pub(crate) fn vector_len(n: usize, inc: usize) -> usize {
    if n == 0 {
        0
    } else {
        (n - 1) * inc + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_len() {
        assert_eq!(matrix_len(3, 2, 3), 6);
        assert_eq!(matrix_len(3, 2, 5), 8);
        assert_eq!(matrix_len(0, 4, 1), 0);
        assert_eq!(vector_len(3, 2), 5);
        assert_eq!(vector_len(0, 2), 0);
    }

    #[test]
    fn test_kernel_is_object_safe() {
        let k: Box<dyn NumericKernel> = Box::new(ReferenceKernel);
        assert_eq!(k.name(), "reference");
    }
}
