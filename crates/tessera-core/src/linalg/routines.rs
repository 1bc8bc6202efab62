use crate::array::NdArray;
use crate::error::{CoreError, Result};
use crate::kernel::{EigenJob, EigenRange, NumericKernel, SvdJob, Transpose, Triangle};

use super::decomp::svd::{factor_dims, raw_svd};
use super::decomp::{LuDecomposition, QrDecomposition, SvdDecomposition, SymmetricEigen};
use super::{col_major, expect_shape, from_col_major, ld, matrix_dims, rhs_dims, square_dim, status, write_back};

/// Solution of a least-squares problem.
#[derive(Debug, Clone)]
pub struct LeastSquares {
    /// `X` with `n` rows, shaped like the right-hand side.
    pub solution: NdArray<f64>,
    /// Effective rank of `A`.
    pub rank: usize,
}

/// Checked linear-algebra routines on one [`NumericKernel`].
///
/// The LAPACK-style methods (`gemm`, `getrf`, `gesvd`, ...) take their
/// output arrays by shared reference and overwrite them, exactly like the
/// kernel routine of the same name. Outputs may be views. Any nonzero
/// kernel status becomes [`CoreError::NumericKernelFailure`]; outputs the
/// kernel already touched are then in an unspecified state.
///
/// ```
/// use tessera_core::array::NdArray;
/// use tessera_core::kernel::ReferenceKernel;
/// use tessera_core::linalg::LinearAlgebraRoutines;
///
/// let la = LinearAlgebraRoutines::new(&ReferenceKernel);
/// let a = NdArray::from_rows(&[[4.0, 3.0], [6.0, 3.0]]).unwrap();
/// assert!((la.det(&a).unwrap() + 6.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LinearAlgebraRoutines<'k> {
    kernel: &'k dyn NumericKernel,
}

fn op_dims(trans: Transpose, rows: usize, cols: usize) -> (usize, usize) {
    match trans {
        Transpose::No => (rows, cols),
        Transpose::Yes => (cols, rows),
    }
}

impl<'k> LinearAlgebraRoutines<'k> {
    pub fn new(kernel: &'k dyn NumericKernel) -> Self {
        Self { kernel }
    }

    pub fn kernel(&self) -> &'k dyn NumericKernel {
        self.kernel
    }

    // ==================================================================
    // BLAS
    // ==================================================================

    /// `C = alpha op(A) op(B) + beta C`.
    #[allow(clippy::too_many_arguments)]
    pub fn gemm(
        &self,
        transa: Transpose,
        transb: Transpose,
        alpha: f64,
        a: &NdArray<f64>,
        b: &NdArray<f64>,
        beta: f64,
        c: &NdArray<f64>,
    ) -> Result<()> {
        let (ar, ac) = matrix_dims(a)?;
        let (br, bc) = matrix_dims(b)?;
        let (m, k) = op_dims(transa, ar, ac);
        let (kb, n) = op_dims(transb, br, bc);
        if kb != k {
            return Err(CoreError::ShapeMismatch {
                expected: vec![k, n],
                got: vec![kb, n],
            });
        }
        expect_shape(c, &[m, n])?;

        let mut cd = col_major(c);
        log::trace!("gemm: {m}x{k} times {k}x{n}");
        let info = self.kernel.gemm(
            transa,
            transb,
            m,
            n,
            k,
            alpha,
            &col_major(a),
            ld(ar),
            &col_major(b),
            ld(br),
            beta,
            &mut cd,
            ld(m),
        );
        status("gemm", info)?;
        write_back(c, cd)
    }

    /// `A B` as a new matrix.
    pub fn matmul(&self, a: &NdArray<f64>, b: &NdArray<f64>) -> Result<NdArray<f64>> {
        let (m, _) = matrix_dims(a)?;
        let (_, n) = matrix_dims(b)?;
        let c = NdArray::zeros(vec![m, n]);
        self.gemm(Transpose::No, Transpose::No, 1.0, a, b, 0.0, &c)?;
        Ok(c)
    }

    /// `y = alpha op(A) x + beta y` for 1-D `x` and `y`.
    pub fn gemv(
        &self,
        trans: Transpose,
        alpha: f64,
        a: &NdArray<f64>,
        x: &NdArray<f64>,
        beta: f64,
        y: &NdArray<f64>,
    ) -> Result<()> {
        let (m, n) = matrix_dims(a)?;
        let (xlen, ylen) = match trans {
            Transpose::No => (n, m),
            Transpose::Yes => (m, n),
        };
        expect_shape(x, &[xlen])?;
        expect_shape(y, &[ylen])?;

        let mut yd = y.to_vec();
        let info = self
            .kernel
            .gemv(trans, m, n, alpha, &col_major(a), ld(m), &x.to_vec(), 1, beta, &mut yd, 1);
        status("gemv", info)?;
        write_back(y, yd)
    }

    /// `A x` as a new vector.
    pub fn matvec(&self, a: &NdArray<f64>, x: &NdArray<f64>) -> Result<NdArray<f64>> {
        let (m, _) = matrix_dims(a)?;
        let y = NdArray::zeros(vec![m]);
        self.gemv(Transpose::No, 1.0, a, x, 0.0, &y)?;
        Ok(y)
    }

    // ==================================================================
    // LAPACK: LU
    // ==================================================================

    /// Factor `A = P L U` in place; `ipiv` receives the 1-based row
    /// interchanges. A zero pivot is a failure with its 1-based index as
    /// the code; use [`lu`](Self::lu) to keep singular factorizations.
    pub fn getrf(&self, a: &NdArray<f64>, ipiv: &NdArray<i32>) -> Result<()> {
        let (m, n) = matrix_dims(a)?;
        expect_shape(ipiv, &[m.min(n)])?;
        let mut ad = col_major(a);
        let mut pd = ipiv.to_vec();
        let info = self.kernel.getrf(m, n, &mut ad, ld(m), &mut pd);
        write_back(a, ad)?;
        write_back(ipiv, pd)?;
        status("getrf", info)
    }

    /// Solve with a factorization from [`getrf`](Self::getrf), overwriting
    /// `b` with `X`.
    pub fn getrs(&self, trans: Transpose, lu: &NdArray<f64>, ipiv: &NdArray<i32>, b: &NdArray<f64>) -> Result<()> {
        let n = square_dim(lu)?;
        expect_shape(ipiv, &[n])?;
        let (rows, nrhs) = rhs_dims(b)?;
        if rows != n {
            return Err(CoreError::ShapeMismatch {
                expected: vec![n, nrhs],
                got: b.shape().to_vec(),
            });
        }
        let mut bd = col_major(b);
        let info = self
            .kernel
            .getrs(trans, n, nrhs, &col_major(lu), ld(n), &ipiv.to_vec(), &mut bd, ld(n));
        status("getrs", info)?;
        write_back(b, bd)
    }

    /// Replace a factorization from [`getrf`](Self::getrf) with the inverse.
    pub fn getri(&self, lu: &NdArray<f64>, ipiv: &NdArray<i32>) -> Result<()> {
        let n = square_dim(lu)?;
        expect_shape(ipiv, &[n])?;
        let mut ad = col_major(lu);
        let info = self.kernel.getri(n, &mut ad, ld(n), &ipiv.to_vec());
        status("getri", info)?;
        write_back(lu, ad)
    }

    /// Solve `A X = B`: `a` is overwritten with its LU factors, `ipiv` with
    /// the pivots and `b` with `X`. A zero pivot fails with code `i`, the
    /// 1-based pivot index, and leaves `b` untouched.
    pub fn gesv(&self, a: &NdArray<f64>, ipiv: &NdArray<i32>, b: &NdArray<f64>) -> Result<()> {
        let n = square_dim(a)?;
        expect_shape(ipiv, &[n])?;
        let (rows, nrhs) = rhs_dims(b)?;
        if rows != n {
            return Err(CoreError::ShapeMismatch {
                expected: vec![n, nrhs],
                got: b.shape().to_vec(),
            });
        }
        let mut ad = col_major(a);
        let mut pd = ipiv.to_vec();
        let mut bd = col_major(b);
        let info = self.kernel.gesv(n, nrhs, &mut ad, ld(n), &mut pd, &mut bd, ld(n));
        write_back(a, ad)?;
        write_back(ipiv, pd)?;
        status("gesv", info)?;
        write_back(b, bd)
    }

    // ==================================================================
    // LAPACK: QR and least squares
    // ==================================================================

    /// Householder QR in place; `tau` receives the reflector scales.
    pub fn geqrf(&self, a: &NdArray<f64>, tau: &NdArray<f64>) -> Result<()> {
        let (m, n) = matrix_dims(a)?;
        expect_shape(tau, &[m.min(n)])?;
        let mut ad = col_major(a);
        let mut td = vec![0.0; m.min(n)];
        let info = self.kernel.geqrf(m, n, &mut ad, ld(m), &mut td);
        status("geqrf", info)?;
        write_back(a, ad)?;
        write_back(tau, td)
    }

    /// Overwrite `a` (`m x n`, `n <= m`) with the first `n` columns of the
    /// `Q` defined by the first `tau.size()` reflectors stored in `a`.
    pub fn orgqr(&self, a: &NdArray<f64>, tau: &NdArray<f64>) -> Result<()> {
        let (m, n) = matrix_dims(a)?;
        if tau.ndim() != 1 {
            return Err(CoreError::InvalidArgument {
                reason: "tau must be 1-D",
            });
        }
        let mut ad = col_major(a);
        let info = self.kernel.orgqr(m, n, tau.size(), &mut ad, ld(m), &tau.to_vec());
        status("orgqr", info)?;
        write_back(a, ad)
    }

    /// Minimum-norm least squares by complete orthogonal factorization.
    ///
    /// `b` has `max(m, n)` rows; the solution lands in its first `n` rows.
    /// `jpvt` receives the 1-based column permutation. Returns the
    /// effective rank.
    pub fn gelsy(&self, a: &NdArray<f64>, b: &NdArray<f64>, jpvt: &NdArray<i32>, rcond: f64) -> Result<usize> {
        let (m, n) = matrix_dims(a)?;
        let (rows, nrhs) = rhs_dims(b)?;
        if rows != m.max(n) {
            return Err(CoreError::ShapeMismatch {
                expected: vec![m.max(n), nrhs],
                got: b.shape().to_vec(),
            });
        }
        expect_shape(jpvt, &[n])?;
        let mut ad = col_major(a);
        let mut bd = col_major(b);
        let mut pd = jpvt.to_vec();
        let mut rank = 0;
        let info = self
            .kernel
            .gelsy(m, n, nrhs, &mut ad, ld(m), &mut bd, ld(rows), &mut pd, rcond, &mut rank);
        status("gelsy", info)?;
        write_back(b, bd)?;
        write_back(jpvt, pd)?;
        Ok(rank)
    }

    // ==================================================================
    // LAPACK: SVD and symmetric eigen
    // ==================================================================

    /// Singular values into `s` and, unless `job` is [`SvdJob::None`],
    /// singular vectors into `u` and `vt` (`[m, m]`/`[n, n]` for
    /// [`SvdJob::All`], `[m, k]`/`[k, n]` for [`SvdJob::Economy`]).
    /// `a` is not modified.
    pub fn gesvd(
        &self,
        job: SvdJob,
        a: &NdArray<f64>,
        s: &NdArray<f64>,
        u: Option<&NdArray<f64>>,
        vt: Option<&NdArray<f64>>,
    ) -> Result<()> {
        self.svd_driver("gesvd", job, a, s, u, vt)
    }

    /// Same contract as [`gesvd`](Self::gesvd) through the kernel's
    /// divide-and-conquer driver.
    pub fn gesdd(
        &self,
        job: SvdJob,
        a: &NdArray<f64>,
        s: &NdArray<f64>,
        u: Option<&NdArray<f64>>,
        vt: Option<&NdArray<f64>>,
    ) -> Result<()> {
        self.svd_driver("gesdd", job, a, s, u, vt)
    }

    fn svd_driver(
        &self,
        routine: &'static str,
        job: SvdJob,
        a: &NdArray<f64>,
        s: &NdArray<f64>,
        u: Option<&NdArray<f64>>,
        vt: Option<&NdArray<f64>>,
    ) -> Result<()> {
        let (m, n) = matrix_dims(a)?;
        expect_shape(s, &[m.min(n)])?;
        let (ucols, vtrows) = factor_dims(job, m, n);
        let outputs = match (job, u, vt) {
            (SvdJob::None, _, _) => None,
            (_, Some(u), Some(vt)) => {
                expect_shape(u, &[m, ucols])?;
                expect_shape(vt, &[vtrows, n])?;
                Some((u, vt))
            }
            _ => {
                return Err(CoreError::InvalidArgument {
                    reason: "singular vectors requested without u and vt outputs",
                })
            }
        };

        let raw = raw_svd(routine, self.kernel, job, a)?;
        write_back(s, raw.s)?;
        if let Some((u, vt)) = outputs {
            write_back(u, raw.u)?;
            write_back(vt, raw.vt)?;
        }
        Ok(())
    }

    /// Eigenvalues of a symmetric matrix into `w`, ascending. With
    /// [`EigenJob::Vectors`] the matching eigenvectors overwrite `a`
    /// column by column. Only the `uplo` triangle of `a` is read.
    pub fn syev(&self, jobz: EigenJob, uplo: Triangle, a: &NdArray<f64>, w: &NdArray<f64>) -> Result<()> {
        let n = square_dim(a)?;
        expect_shape(w, &[n])?;
        let mut ad = col_major(a);
        let mut wd = vec![0.0; n];
        let info = self.kernel.syev(jobz, uplo, n, &mut ad, ld(n), &mut wd);
        status("syev", info)?;
        write_back(w, wd)?;
        if jobz == EigenJob::Vectors {
            write_back(a, ad)?;
        }
        Ok(())
    }

    /// Selected eigenpairs of a symmetric matrix.
    ///
    /// Returns `m`, the number found; only the first `m` entries of `w` and
    /// columns of `z` are written. `z` (`[n, >= m]`) is required with
    /// [`EigenJob::Vectors`]. `a` is not modified.
    #[allow(clippy::too_many_arguments)]
    pub fn syevr(
        &self,
        jobz: EigenJob,
        range: EigenRange,
        uplo: Triangle,
        a: &NdArray<f64>,
        abstol: f64,
        w: &NdArray<f64>,
        z: Option<&NdArray<f64>>,
    ) -> Result<usize> {
        let n = square_dim(a)?;
        expect_shape(w, &[n])?;
        let z = match (jobz, z) {
            (EigenJob::ValuesOnly, _) => None,
            (EigenJob::Vectors, Some(z)) => {
                let (rows, _) = matrix_dims(z)?;
                if rows != n {
                    return Err(CoreError::ShapeMismatch {
                        expected: vec![n, z.shape()[1]],
                        got: z.shape().to_vec(),
                    });
                }
                Some(z)
            }
            (EigenJob::Vectors, None) => {
                return Err(CoreError::InvalidArgument {
                    reason: "eigenvectors requested without a z output",
                })
            }
        };

        let mut ad = col_major(a);
        let mut wd = w.to_vec();
        let mut zd = z.map(col_major).unwrap_or_default();
        let zcols = z.map_or(0, NdArray::columns);
        let mut isuppz = vec![0; 2 * zcols];
        let mut found = 0;
        let info = self.kernel.syevr(
            jobz, range, uplo, n, &mut ad, ld(n), abstol, &mut found, &mut wd, &mut zd, ld(n), &mut isuppz,
        );
        status("syevr", info)?;
        write_back(w, wd)?;
        if let Some(z) = z {
            write_back(z, zd)?;
        }
        Ok(found)
    }

    // ==================================================================
    // Decompositions and conveniences
    // ==================================================================

    pub fn lu(&self, a: &NdArray<f64>) -> Result<LuDecomposition<'k>> {
        LuDecomposition::decompose(self.kernel, a)
    }

    pub fn qr(&self, a: &NdArray<f64>) -> Result<QrDecomposition<'k>> {
        QrDecomposition::decompose(self.kernel, a)
    }

    pub fn svd(&self, a: &NdArray<f64>, job: SvdJob) -> Result<SvdDecomposition> {
        SvdDecomposition::decompose(self.kernel, a, job)
    }

    /// Full symmetric eigendecomposition reading the upper triangle.
    pub fn eigh(&self, a: &NdArray<f64>) -> Result<SymmetricEigen> {
        SymmetricEigen::decompose(self.kernel, a, Triangle::Upper)
    }

    /// Solve `A X = B` for square `A` through `gesv`. Neither operand is
    /// modified. A singular `A` fails with the `gesv` status.
    pub fn solve(&self, a: &NdArray<f64>, b: &NdArray<f64>) -> Result<NdArray<f64>> {
        let n = square_dim(a)?;
        let lu = a.copy();
        let ipiv = NdArray::zeros(vec![n]);
        let x = b.copy();
        self.gesv(&lu, &ipiv, &x)?;
        Ok(x)
    }

    pub fn inv(&self, a: &NdArray<f64>) -> Result<NdArray<f64>> {
        self.lu(a)?.inverse()
    }

    pub fn det(&self, a: &NdArray<f64>) -> Result<f64> {
        self.lu(a)?.determinant()
    }

    pub fn pinv(&self, a: &NdArray<f64>) -> Result<NdArray<f64>> {
        self.svd(a, SvdJob::Economy)?.pinv(None)
    }

    /// Number of singular values above the default tolerance.
    pub fn rank(&self, a: &NdArray<f64>) -> Result<usize> {
        Ok(self.svd(a, SvdJob::None)?.rank(None))
    }

    /// Minimum-norm least-squares solution of `A X ≈ B` through `gelsy`.
    ///
    /// `b` has `m` rows; the solution has `n`. Columns whose pivoted `R`
    /// diagonal falls below `rcond` (default `max(m, n) * eps`) relative to
    /// the largest are treated as dependent.
    pub fn lstsq(&self, a: &NdArray<f64>, b: &NdArray<f64>, rcond: Option<f64>) -> Result<LeastSquares> {
        let (m, n) = matrix_dims(a)?;
        let (rows, nrhs) = rhs_dims(b)?;
        if rows != m {
            return Err(CoreError::ShapeMismatch {
                expected: vec![m, nrhs],
                got: b.shape().to_vec(),
            });
        }
        let rcond = rcond.unwrap_or(m.max(n) as f64 * f64::EPSILON);
        log::debug!("least squares on a {m}x{n} system with {nrhs} right-hand sides");

        let padded_rows = m.max(n);
        let bd = col_major(b);
        let mut padded = vec![0.0; padded_rows * nrhs];
        for j in 0..nrhs {
            padded[j * padded_rows..j * padded_rows + m].copy_from_slice(&bd[j * m..(j + 1) * m]);
        }
        let mut ad = col_major(a);
        let mut jpvt = vec![0; n];
        let mut rank = 0;
        let info = self.kernel.gelsy(
            m,
            n,
            nrhs,
            &mut ad,
            ld(m),
            &mut padded,
            ld(padded_rows),
            &mut jpvt,
            rcond,
            &mut rank,
        );
        status("gelsy", info)?;

        let mut x = Vec::with_capacity(n * nrhs);
        for j in 0..nrhs {
            x.extend_from_slice(&padded[j * padded_rows..j * padded_rows + n]);
        }
        let shape = if b.ndim() == 1 { vec![n] } else { vec![n, nrhs] };
        Ok(LeastSquares {
            solution: from_col_major(x, shape)?,
            rank,
        })
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::kernel::ReferenceKernel;

    fn la() -> LinearAlgebraRoutines<'static> {
        LinearAlgebraRoutines::new(&ReferenceKernel)
    }

    fn approx_eq(a: &[f64], b: &[f64], tol: f64) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(&x, &y)| (x - y).abs() < tol)
    }

    fn gesv_fixture() -> (NdArray<f64>, NdArray<f64>) {
        let a = NdArray::from_rows(&[
            [6.80, -6.05, -0.45, 8.32, -9.67],
            [-2.11, -3.30, 2.58, 2.71, -5.14],
            [5.66, 5.36, -2.70, 4.35, -7.26],
            [5.97, -4.44, 0.27, -7.17, 6.08],
            [8.23, 1.08, 9.04, 2.14, -6.87],
        ])
        .unwrap();
        let b = NdArray::from_rows(&[
            [4.02, -1.56, 9.81],
            [6.19, 4.00, -4.09],
            [-8.22, -8.67, -4.57],
            [-7.57, 1.75, -8.61],
            [-3.03, 2.86, 8.99],
        ])
        .unwrap();
        (a, b)
    }

    #[test]
    fn test_gemm_into_view() {
        let a = NdArray::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
        let big = NdArray::<f64>::ones(vec![3, 3]);
        let c = big.submatrix(1, 1, 2, 2).unwrap();
        la().gemm(Transpose::Yes, Transpose::No, 1.0, &a, &a, 1.0, &c).unwrap();
        // Aᵗ A = [[10, 14], [14, 20]], plus the ones already in C.
        assert_eq!(big.to_vec(), vec![1.0, 1.0, 1.0, 1.0, 11.0, 15.0, 1.0, 15.0, 21.0]);
    }

    #[test]
    fn test_gemm_shape_mismatch() {
        let a = NdArray::<f64>::zeros(vec![2, 3]);
        let c = NdArray::<f64>::zeros(vec![2, 2]);
        let err = la().gemm(Transpose::No, Transpose::No, 1.0, &a, &a, 0.0, &c).unwrap_err();
        assert!(matches!(err, CoreError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_gemv_transposed() {
        let a = NdArray::from_rows(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]).unwrap();
        let x = NdArray::from_vec(vec![1.0, 0.0, 1.0], vec![3]).unwrap();
        let y = NdArray::from_vec(vec![1.0, 1.0], vec![2]).unwrap();
        la().gemv(Transpose::Yes, 2.0, &a, &x, 1.0, &y).unwrap();
        assert_eq!(y.to_vec(), vec![13.0, 17.0]);
    }

    #[test]
    fn test_getrf_pivots_fixture() {
        let a = NdArray::from_rows(&[
            [1.80, 2.88, 2.05, -0.89],
            [5.25, -2.95, -0.95, -3.80],
            [1.58, -2.69, -2.90, -1.04],
            [-1.11, -0.66, -0.59, 0.80],
        ])
        .unwrap();
        let ipiv = NdArray::zeros(vec![4]);
        la().getrf(&a, &ipiv).unwrap();
        assert_eq!(ipiv.to_vec(), vec![2, 2, 3, 4]);
        assert_eq!(a.get(&[0, 0]).unwrap(), 5.25);
    }

    #[test]
    fn test_getrf_zero_pivot_is_failure() {
        let a = NdArray::from_rows(&[[0.0, 0.0], [0.0, 1.0]]).unwrap();
        let ipiv = NdArray::zeros(vec![2]);
        let err = la().getrf(&a, &ipiv).unwrap_err();
        assert_eq!(err, CoreError::kernel("getrf", 1));
    }

    #[test]
    fn test_gesv_fixture() {
        let (a, b) = gesv_fixture();
        let ipiv = NdArray::zeros(vec![5]);
        la().gesv(&a, &ipiv, &b).unwrap();
        assert_eq!(ipiv.to_vec(), vec![5, 5, 3, 4, 5]);
        let expected = [
            -0.80, -0.39, 0.96, -0.70, -0.55, 0.22, 0.59, 0.84, 1.90, 1.32, -0.10, 5.36, 0.57, 0.11, 4.04,
        ];
        assert!(approx_eq(&b.to_vec(), &expected, 0.01));
    }

    #[test]
    fn test_gesv_singular_reports_pivot() {
        let a = NdArray::from_rows(&[[1.0, 2.0], [2.0, 4.0]]).unwrap();
        let b = NdArray::from_vec(vec![1.0, 2.0], vec![2]).unwrap();
        let ipiv = NdArray::zeros(vec![2]);
        let err = la().gesv(&a, &ipiv, &b).unwrap_err();
        assert_eq!(err, CoreError::kernel("gesv", 2));
        assert_eq!(b.to_vec(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_getrs_and_getri() {
        let a = NdArray::from_rows(&[[4.0, 7.0], [2.0, 6.0]]).unwrap();
        let ipiv = NdArray::zeros(vec![2]);
        let lu = a.copy();
        la().getrf(&lu, &ipiv).unwrap();

        let b = NdArray::from_vec(vec![18.0, 14.0], vec![2]).unwrap();
        la().getrs(Transpose::No, &lu, &ipiv, &b).unwrap();
        assert!(approx_eq(&b.to_vec(), &[1.0, 2.0], 1e-12));

        la().getri(&lu, &ipiv).unwrap();
        assert!(approx_eq(&lu.to_vec(), &[0.6, -0.7, -0.2, 0.4], 1e-12));
    }

    #[test]
    fn test_geqrf_fixture_tau() {
        let a = NdArray::from_rows(&[
            [0.0, 2.0],
            [2.0, -1.0],
            [2.0, -1.0],
            [0.0, 1.5],
            [2.0, -1.0],
            [2.0, -1.0],
        ])
        .unwrap();
        let tau = NdArray::zeros(vec![2]);
        la().geqrf(&a, &tau).unwrap();
        assert!(approx_eq(&tau.to_vec(), &[1.0, 1.4], 1e-12));
        assert!((a.get(&[0, 0]).unwrap() + 4.0).abs() < 1e-12);

        la().orgqr(&a, &tau).unwrap();
        let qtq = la().matmul(&a.transpose(), &a).unwrap();
        assert!(approx_eq(&qtq.to_vec(), &[1.0, 0.0, 0.0, 1.0], 1e-12));
    }

    #[test]
    fn test_gesvd_economy_shapes() {
        let a = NdArray::from_rows(&[[3.0, 0.0], [0.0, 4.0], [0.0, 0.0]]).unwrap();
        let s = NdArray::zeros(vec![2]);
        let u = NdArray::zeros(vec![3, 2]);
        let vt = NdArray::zeros(vec![2, 2]);
        la().gesvd(SvdJob::Economy, &a, &s, Some(&u), Some(&vt)).unwrap();
        assert!(approx_eq(&s.to_vec(), &[4.0, 3.0], 1e-12));

        let err = la().gesdd(SvdJob::All, &a, &s, Some(&u), Some(&vt)).unwrap_err();
        assert!(matches!(err, CoreError::ShapeMismatch { .. }));
        let err = la().gesvd(SvdJob::Economy, &a, &s, None, None).unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument { .. }));
    }

    #[test]
    fn test_gesdd_matches_decomposition() {
        let a = NdArray::from_rows(&[[2.0, -1.0, 0.5], [1.0, 3.0, -2.0]]).unwrap();
        let svd = SvdDecomposition::decompose_divide_and_conquer(&ReferenceKernel, &a, SvdJob::All).unwrap();
        let s = NdArray::zeros(vec![2]);
        let u = NdArray::zeros(vec![2, 2]);
        let vt = NdArray::zeros(vec![3, 3]);
        la().gesdd(SvdJob::All, &a, &s, Some(&u), Some(&vt)).unwrap();
        assert_eq!(s.to_vec(), svd.singular_values().to_vec());
        assert_eq!(u.to_vec(), svd.u().unwrap().to_vec());
        assert_eq!(vt.to_vec(), svd.vt().unwrap().to_vec());

        let values_only = la().svd(&a, SvdJob::None).unwrap();
        assert!(values_only.u().is_none());
        assert!(approx_eq(&values_only.singular_values().to_vec(), &s.to_vec(), 1e-12));
    }

    #[test]
    fn test_syev_and_syevr() {
        let a = NdArray::from_rows(&[[2.0, 1.0], [1.0, 2.0]]).unwrap();
        let w = NdArray::zeros(vec![2]);
        la().syev(EigenJob::ValuesOnly, Triangle::Upper, &a, &w).unwrap();
        assert!(approx_eq(&w.to_vec(), &[1.0, 3.0], 1e-12));
        assert_eq!(a.to_vec(), vec![2.0, 1.0, 1.0, 2.0]);

        let w = NdArray::zeros(vec![2]);
        let z = NdArray::zeros(vec![2, 1]);
        let range = EigenRange::Index { first: 2, last: 2 };
        let m = la()
            .syevr(EigenJob::Vectors, range, Triangle::Lower, &a, 0.0, &w, Some(&z))
            .unwrap();
        assert_eq!(m, 1);
        assert!((w.get(&[0]).unwrap() - 3.0).abs() < 1e-12);
        let v = z.to_vec();
        assert!((v[0].abs() - 0.5_f64.sqrt()).abs() < 1e-12);
        assert!((v[0] - v[1]).abs() < 1e-12);
    }

    #[test]
    fn test_syevr_z_too_narrow() {
        let a = NdArray::<f64>::eye(3);
        let w = NdArray::zeros(vec![3]);
        let z = NdArray::zeros(vec![3, 1]);
        let err = la()
            .syevr(EigenJob::Vectors, EigenRange::All, Triangle::Upper, &a, 0.0, &w, Some(&z))
            .unwrap_err();
        assert_eq!(err, CoreError::kernel("syevr", -14));
    }

    #[test]
    fn test_gelsy_rank_deficient() {
        let a = NdArray::from_rows(&[[1.0, 1.0], [1.0, 1.0]]).unwrap();
        let b = NdArray::from_vec(vec![2.0, 2.0], vec![2]).unwrap();
        let jpvt = NdArray::zeros(vec![2]);
        let rank = la().gelsy(&a, &b, &jpvt, 1e-10).unwrap();
        assert_eq!(rank, 1);
        assert!(approx_eq(&b.to_vec(), &[1.0, 1.0], 1e-12));
    }

    #[test]
    fn test_lstsq_line_fit() {
        // Fit y = c0 + c1 x through (0, 1), (1, 2), (2, 4).
        let a = NdArray::from_rows(&[[1.0, 0.0], [1.0, 1.0], [1.0, 2.0]]).unwrap();
        let b = NdArray::from_vec(vec![1.0, 2.0, 4.0], vec![3]).unwrap();
        let fit = la().lstsq(&a, &b, None).unwrap();
        assert_eq!(fit.rank, 2);
        assert_eq!(fit.solution.shape(), &[2]);
        assert!(approx_eq(&fit.solution.to_vec(), &[5.0 / 6.0, 1.5], 1e-12));
    }

    #[test]
    fn test_lstsq_underdetermined_matrix_rhs() {
        let a = NdArray::from_rows(&[[1.0, 2.0, 2.0]]).unwrap();
        let b = NdArray::from_rows(&[[9.0, 18.0]]).unwrap();
        let fit = la().lstsq(&a, &b, None).unwrap();
        assert_eq!(fit.solution.shape(), &[3, 2]);
        assert!(approx_eq(&fit.solution.to_vec(), &[1.0, 2.0, 2.0, 4.0, 2.0, 4.0], 1e-12));
    }

    #[test]
    fn test_solve_leaves_operands() {
        let (a, b) = gesv_fixture();
        let before = a.to_vec();
        let x = la().solve(&a, &b).unwrap();
        assert_eq!(a.to_vec(), before);
        let residual = la().matmul(&a, &x).unwrap().max_abs_diff(&b).unwrap();
        assert!(residual < 1e-10);
    }

    #[test]
    fn test_pinv_and_rank() {
        let a = NdArray::<f64>::ones(vec![3, 2]);
        assert_eq!(la().rank(&a).unwrap(), 1);
        let p = la().pinv(&a).unwrap();
        assert_eq!(p.shape(), &[2, 3]);
        assert!(approx_eq(&p.to_vec(), &[1.0 / 6.0; 6], 1e-12));
        // A A⁺ A = A
        let apa = la().matmul(&la().matmul(&a, &p).unwrap(), &a).unwrap();
        assert!(apa.max_abs_diff(&a).unwrap() < 1e-12);
    }
}
