//! Pure-Rust [`NumericKernel`].

use super::{blas, eigen, lu, qr, svd};
use super::{EigenJob, EigenRange, NumericKernel, SvdJob, Transpose, Triangle};

/// Portable kernel written from scratch: unblocked BLAS loops, Householder
/// QR, and Jacobi iterations for SVD and symmetric eigenproblems.
///
/// Accuracy is close to LAPACK for well-conditioned inputs; speed is not a
/// goal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceKernel;

impl NumericKernel for ReferenceKernel {
    fn name(&self) -> &str {
        "reference"
    }

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
    ) -> i32 {
        blas::gemm(transa, transb, m, n, k, alpha, a, lda, b, ldb, beta, c, ldc)
    }

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
    ) -> i32 {
        blas::gemv(trans, m, n, alpha, a, lda, x, incx, beta, y, incy)
    }

    fn getrf(&self, m: usize, n: usize, a: &mut [f64], lda: usize, ipiv: &mut [i32]) -> i32 {
        lu::getrf(m, n, a, lda, ipiv)
    }

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
    ) -> i32 {
        lu::getrs(trans, n, nrhs, a, lda, ipiv, b, ldb)
    }

    fn getri(&self, n: usize, a: &mut [f64], lda: usize, ipiv: &[i32]) -> i32 {
        lu::getri(n, a, lda, ipiv)
    }

    fn gesv(
        &self,
        n: usize,
        nrhs: usize,
        a: &mut [f64],
        lda: usize,
        ipiv: &mut [i32],
        b: &mut [f64],
        ldb: usize,
    ) -> i32 {
        lu::gesv(n, nrhs, a, lda, ipiv, b, ldb)
    }

    fn geqrf(&self, m: usize, n: usize, a: &mut [f64], lda: usize, tau: &mut [f64]) -> i32 {
        qr::geqrf(m, n, a, lda, tau)
    }

    fn orgqr(&self, m: usize, n: usize, k: usize, a: &mut [f64], lda: usize, tau: &[f64]) -> i32 {
        qr::orgqr(m, n, k, a, lda, tau)
    }

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
    ) -> i32 {
        svd::gesvd(job, m, n, a, lda, s, u, ldu, vt, ldvt)
    }

    fn syev(&self, jobz: EigenJob, uplo: Triangle, n: usize, a: &mut [f64], lda: usize, w: &mut [f64]) -> i32 {
        eigen::syev(jobz, uplo, n, a, lda, w)
    }

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
    ) -> i32 {
        eigen::syevr(jobz, range, uplo, n, a, lda, abstol, m, w, z, ldz, isuppz)
    }

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
    ) -> i32 {
        qr::gelsy(m, n, nrhs, a, lda, b, ldb, jpvt, rcond, rank)
    }
}
