//! QR decomposition via Householder reflections.
//!
//! Factors an `m x n` matrix as `A = Q R` with `Q` (`m x k`) having
//! orthonormal columns and `R` (`k x n`) upper trapezoidal, `k = min(m, n)`.
//! The packed form follows LAPACK: `R` on and above the diagonal, each
//! reflector's tail below it, scales in `tau`.

use std::sync::OnceLock;

use crate::array::NdArray;
use crate::error::{CoreError, Result};
use crate::kernel::{NumericKernel, Transpose};
use crate::linalg::{col_major, from_col_major, ld, matrix_dims, rhs_dims, status};

/// Result of `geqrf` on a copy of the operand.
#[derive(Debug)]
pub struct QrDecomposition<'k> {
    kernel: &'k dyn NumericKernel,
    /// Column-major `m x n` packed factors.
    packed: Vec<f64>,
    tau: Vec<f64>,
    m: usize,
    n: usize,
    q: OnceLock<NdArray<f64>>,
    r: OnceLock<NdArray<f64>>,
}

#[allow(clippy::many_single_char_names)]
impl<'k> QrDecomposition<'k> {
    /// Factor `a` with `kernel`. `a` is left unmodified.
    ///
    /// ```
    /// # use tessera_core::array::NdArray;
    /// # use tessera_core::kernel::ReferenceKernel;
    /// # use tessera_core::linalg::QrDecomposition;
    /// let a = NdArray::from_rows(&[[12.0, -51.0, 4.0], [6.0, 167.0, -68.0], [-4.0, 24.0, -41.0]]).unwrap();
    /// let qr = QrDecomposition::decompose(&ReferenceKernel, &a).unwrap();
    /// assert!((qr.r().get(&[0, 0]).unwrap().abs() - 14.0).abs() < 1e-12);
    /// ```
    pub fn decompose(kernel: &'k dyn NumericKernel, a: &NdArray<f64>) -> Result<Self> {
        let (m, n) = matrix_dims(a)?;
        log::debug!("QR decomposition of a {m}x{n} matrix on `{}`", kernel.name());

        let mut packed = col_major(a);
        let mut tau = vec![0.0; m.min(n)];
        status("geqrf", kernel.geqrf(m, n, &mut packed, ld(m), &mut tau))?;
        Ok(Self {
            kernel,
            packed,
            tau,
            m,
            n,
            q: OnceLock::new(),
            r: OnceLock::new(),
        })
    }

    #[inline]
    fn at(&self, i: usize, j: usize) -> f64 {
        self.packed[i + j * self.m]
    }

    /// Householder scales, one per reflector.
    pub fn tau(&self) -> NdArray<f64> {
        NdArray::from_fn(vec![self.tau.len()], |idx| self.tau[idx[0]])
    }

    /// The packed factors as a fresh `m x n` array.
    pub fn packed(&self) -> Result<NdArray<f64>> {
        from_col_major(self.packed.clone(), vec![self.m, self.n])
    }

    /// `Q` with `k` orthonormal columns, built by `orgqr` on first use.
    pub fn q(&self) -> Result<&NdArray<f64>> {
        if let Some(q) = self.q.get() {
            return Ok(q);
        }
        let k = self.tau.len();
        let mut q = self.packed[..self.m * k].to_vec();
        status("orgqr", self.kernel.orgqr(self.m, k, k, &mut q, ld(self.m), &self.tau))?;
        let q = from_col_major(q, vec![self.m, k])?;
        Ok(self.q.get_or_init(|| q))
    }

    /// `R`, `k x n`.
    pub fn r(&self) -> &NdArray<f64> {
        self.r.get_or_init(|| {
            NdArray::from_fn(vec![self.tau.len(), self.n], |idx| {
                let (i, j) = (idx[0], idx[1]);
                if j >= i {
                    self.at(i, j)
                } else {
                    0.0
                }
            })
        })
    }

    /// Whether every diagonal entry of `R` is above
    /// `max(m, n) * eps * max|R_ii|`.
    pub fn is_full_rank(&self) -> bool {
        let k = self.tau.len();
        let largest = (0..k).map(|i| self.at(i, i).abs()).fold(0.0, f64::max);
        let tol = self.m.max(self.n) as f64 * f64::EPSILON * largest;
        (0..k).all(|i| self.at(i, i).abs() > tol)
    }

    /// Least-squares solution of `A X ≈ B` for `m >= n` and full rank.
    ///
    /// `b` is 1-D or 2-D with `m` rows; the solution has `n`.
    pub fn solve(&self, b: &NdArray<f64>) -> Result<NdArray<f64>> {
        let (m, n) = (self.m, self.n);
        if m < n {
            return Err(CoreError::InvalidArgument {
                reason: "QR solve needs at least as many rows as columns",
            });
        }
        let (rows, nrhs) = rhs_dims(b)?;
        if rows != m {
            return Err(CoreError::ShapeMismatch {
                expected: vec![m, nrhs],
                got: b.shape().to_vec(),
            });
        }
        if !self.is_full_rank() {
            return Err(CoreError::SingularMatrix);
        }

        // y = Qᵗ b, then back-substitute R x = y.
        let q = col_major(self.q()?);
        let mut y = vec![0.0; n * nrhs];
        let info = self.kernel.gemm(
            Transpose::Yes,
            Transpose::No,
            n,
            nrhs,
            m,
            1.0,
            &q,
            ld(m),
            &col_major(b),
            ld(m),
            0.0,
            &mut y,
            ld(n),
        );
        status("gemm", info)?;
        for col in y.chunks_mut(n.max(1)).take(nrhs) {
            for i in (0..n).rev() {
                let mut acc = col[i];
                for l in (i + 1)..n {
                    acc -= self.at(i, l) * col[l];
                }
                col[i] = acc / self.at(i, i);
            }
        }

        let shape = if b.ndim() == 1 { vec![n] } else { vec![n, nrhs] };
        from_col_major(y, shape)
    }
}
