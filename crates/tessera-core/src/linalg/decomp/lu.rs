//! LU decomposition with partial pivoting.
//!
//! Factors an `m x n` matrix as `A = P L U` where:
//! - `P` is a permutation, stored as LAPACK 1-based row interchanges
//! - `L` is `m x k` lower trapezoidal with unit diagonal
//! - `U` is `k x n` upper trapezoidal
//!
//! with `k = min(m, n)`.

use std::sync::OnceLock;

use crate::array::NdArray;
use crate::error::{CoreError, Result};
use crate::kernel::{NumericKernel, Transpose};
use crate::linalg::{col_major, from_col_major, ld, matrix_dims, rhs_dims, status};

/// Result of `getrf` on a copy of the operand.
///
/// A factorization with an exact zero on the diagonal of `U` is still a
/// valid result: it reports [`is_non_singular`](Self::is_non_singular)
/// as `false` and refuses [`inverse`](Self::inverse) and
/// [`solve`](Self::solve).
#[derive(Debug)]
pub struct LuDecomposition<'k> {
    kernel: &'k dyn NumericKernel,
    /// Packed factors, column-major `m x n`: `L` strictly below the
    /// diagonal, `U` on and above it.
    packed: Vec<f64>,
    ipiv: Vec<i32>,
    m: usize,
    n: usize,
    non_singular: OnceLock<bool>,
    determinant: OnceLock<f64>,
    upper: OnceLock<NdArray<f64>>,
    lower: OnceLock<NdArray<f64>>,
}

impl<'k> LuDecomposition<'k> {
    /// Factor `a` with `kernel`. `a` is left unmodified.
    ///
    /// ```
    /// # use tessera_core::array::NdArray;
    /// # use tessera_core::kernel::ReferenceKernel;
    /// # use tessera_core::linalg::LuDecomposition;
    /// let a = NdArray::from_rows(&[[2.0, 1.0], [1.0, 4.0]]).unwrap();
    /// let lu = LuDecomposition::decompose(&ReferenceKernel, &a).unwrap();
    /// assert!((lu.determinant().unwrap() - 7.0).abs() < 1e-12);
    /// ```
    pub fn decompose(kernel: &'k dyn NumericKernel, a: &NdArray<f64>) -> Result<Self> {
        let (m, n) = matrix_dims(a)?;
        log::debug!("LU decomposition of a {m}x{n} matrix on `{}`", kernel.name());

        let mut packed = col_major(a);
        let mut ipiv = vec![0; m.min(n)];
        let info = kernel.getrf(m, n, &mut packed, ld(m), &mut ipiv);
        if info < 0 {
            status("getrf", info)?;
        }
        if info > 0 {
            log::debug!("getrf: U({info}, {info}) is exactly zero");
        }

        Ok(Self {
            kernel,
            packed,
            ipiv,
            m,
            n,
            non_singular: OnceLock::new(),
            determinant: OnceLock::new(),
            upper: OnceLock::new(),
            lower: OnceLock::new(),
        })
    }

    #[inline]
    fn at(&self, i: usize, j: usize) -> f64 {
        self.packed[i + j * self.m]
    }

    fn require_square(&self) -> Result<usize> {
        if self.m == self.n {
            Ok(self.n)
        } else {
            Err(CoreError::ShapeMismatch {
                expected: vec![self.m, self.m],
                got: vec![self.m, self.n],
            })
        }
    }

    /// Shape of the factored matrix.
    pub fn shape(&self) -> [usize; 2] {
        [self.m, self.n]
    }

    /// The packed factors as a fresh `m x n` array.
    pub fn packed(&self) -> Result<NdArray<f64>> {
        from_col_major(self.packed.clone(), vec![self.m, self.n])
    }

    /// 1-based row interchanges: row `i` was swapped with row
    /// `pivots[i] - 1`.
    pub fn pivots(&self) -> NdArray<i32> {
        NdArray::from_fn(vec![self.ipiv.len()], |idx| self.ipiv[idx[0]])
    }

    /// Whether `U` has no exact zero on its diagonal.
    pub fn is_non_singular(&self) -> bool {
        *self
            .non_singular
            .get_or_init(|| (0..self.m.min(self.n)).all(|i| self.at(i, i) != 0.0))
    }

    /// `det(A)`: the product of `U`'s diagonal, negated once per actual
    /// row interchange.
    pub fn determinant(&self) -> Result<f64> {
        let n = self.require_square()?;
        Ok(*self.determinant.get_or_init(|| {
            let mut det: f64 = (0..n).map(|i| self.at(i, i)).product();
            for (i, &p) in self.ipiv.iter().enumerate() {
                if p as usize != i + 1 {
                    det = -det;
                }
            }
            det
        }))
    }

    /// `U`, `k x n`.
    pub fn upper(&self) -> &NdArray<f64> {
        self.upper.get_or_init(|| {
            let k = self.m.min(self.n);
            NdArray::from_fn(vec![k, self.n], |idx| {
                let (i, j) = (idx[0], idx[1]);
                if j >= i {
                    self.at(i, j)
                } else {
                    0.0
                }
            })
        })
    }

    /// `L`, `m x k` with unit diagonal.
    pub fn lower(&self) -> &NdArray<f64> {
        self.lower.get_or_init(|| {
            let k = self.m.min(self.n);
            NdArray::from_fn(vec![self.m, k], |idx| {
                let (i, j) = (idx[0], idx[1]);
                match i.cmp(&j) {
                    std::cmp::Ordering::Greater => self.at(i, j),
                    std::cmp::Ordering::Equal => 1.0,
                    std::cmp::Ordering::Less => 0.0,
                }
            })
        })
    }

    /// The `m x m` permutation `P` with `P A = L U`.
    pub fn permutation(&self) -> NdArray<f64> {
        let mut rows: Vec<usize> = (0..self.m).collect();
        for (i, &p) in self.ipiv.iter().enumerate() {
            rows.swap(i, p as usize - 1);
        }
        NdArray::from_fn(vec![self.m, self.m], |idx| if rows[idx[0]] == idx[1] { 1.0 } else { 0.0 })
    }

    /// `A⁻¹` through `getri`.
    pub fn inverse(&self) -> Result<NdArray<f64>> {
        let n = self.require_square()?;
        if !self.is_non_singular() {
            return Err(CoreError::SingularMatrix);
        }
        let mut inv = self.packed.clone();
        status("getri", self.kernel.getri(n, &mut inv, ld(n), &self.ipiv))?;
        from_col_major(inv, vec![n, n])
    }

    /// Solve `A X = B` with the stored factors. `b` is 1-D or 2-D with `n`
    /// rows; the result has the same shape.
    pub fn solve(&self, b: &NdArray<f64>) -> Result<NdArray<f64>> {
        let n = self.require_square()?;
        let (rows, nrhs) = rhs_dims(b)?;
        if rows != n {
            return Err(CoreError::ShapeMismatch {
                expected: vec![n, nrhs],
                got: b.shape().to_vec(),
            });
        }
        if !self.is_non_singular() {
            return Err(CoreError::SingularMatrix);
        }
        let mut x = col_major(b);
        let info = self
            .kernel
            .getrs(Transpose::No, n, nrhs, &self.packed, ld(n), &self.ipiv, &mut x, ld(n));
        status("getrs", info)?;
        from_col_major(x, b.shape().to_vec())
    }
}
