//! Eigendecomposition for symmetric matrices.
//!
//! Decomposes a real symmetric matrix `A` into `A = V diag(w) Vᵗ` with
//! eigenvalues `w` ascending and orthonormal eigenvectors as the columns of
//! `V`. Only one triangle of the operand is read.

use std::sync::OnceLock;

use crate::array::NdArray;
use crate::error::{CoreError, Result};
use crate::kernel::{EigenJob, EigenRange, NumericKernel, Triangle};
use crate::linalg::{col_major, from_col_major, ld, square_dim, status};

/// Eigenpairs of a symmetric matrix, possibly a selected subset.
#[derive(Debug, Clone)]
pub struct SymmetricEigen {
    /// Order of the decomposed matrix.
    n: usize,
    values: NdArray<f64>,
    /// `n x values.len()`, one eigenvector per column.
    vectors: Option<NdArray<f64>>,
    reconstruction: OnceLock<NdArray<f64>>,
}

impl SymmetricEigen {
    /// All eigenpairs through `syev`.
    ///
    /// ```
    /// # use tessera_core::array::NdArray;
    /// # use tessera_core::kernel::{ReferenceKernel, Triangle};
    /// # use tessera_core::linalg::SymmetricEigen;
    /// let a = NdArray::from_rows(&[[2.0, 1.0], [1.0, 2.0]]).unwrap();
    /// let eig = SymmetricEigen::decompose(&ReferenceKernel, &a, Triangle::Upper).unwrap();
    /// let w = eig.values().to_vec();
    /// assert!((w[0] - 1.0).abs() < 1e-12 && (w[1] - 3.0).abs() < 1e-12);
    /// ```
    pub fn decompose(kernel: &dyn NumericKernel, a: &NdArray<f64>, uplo: Triangle) -> Result<Self> {
        Self::syev(kernel, a, uplo, EigenJob::Vectors)
    }

    /// Eigenvalues only, through `syev`.
    pub fn values_only(kernel: &dyn NumericKernel, a: &NdArray<f64>, uplo: Triangle) -> Result<Self> {
        Self::syev(kernel, a, uplo, EigenJob::ValuesOnly)
    }

    fn syev(kernel: &dyn NumericKernel, a: &NdArray<f64>, uplo: Triangle, jobz: EigenJob) -> Result<Self> {
        let n = square_dim(a)?;
        log::debug!("symmetric eigendecomposition of order {n} on `{}`", kernel.name());
        let mut work = col_major(a);
        let mut w = vec![0.0; n];
        status("syev", kernel.syev(jobz, uplo, n, &mut work, ld(n), &mut w))?;
        let vectors = match jobz {
            EigenJob::Vectors => Some(from_col_major(work, vec![n, n])?),
            EigenJob::ValuesOnly => None,
        };
        Ok(Self {
            n,
            values: NdArray::from_vec(w, vec![n])?,
            vectors,
            reconstruction: OnceLock::new(),
        })
    }

    /// The eigenpairs selected by `range`, through `syevr`.
    pub fn decompose_range(
        kernel: &dyn NumericKernel,
        a: &NdArray<f64>,
        uplo: Triangle,
        range: EigenRange,
        jobz: EigenJob,
    ) -> Result<Self> {
        let n = square_dim(a)?;
        log::debug!("symmetric eigenpairs {range:?} of order {n} on `{}`", kernel.name());
        let mut work = col_major(a);
        let mut w = vec![0.0; n];
        let (mut z, mut isuppz) = match jobz {
            EigenJob::Vectors => (vec![0.0; n * n], vec![0; 2 * n]),
            EigenJob::ValuesOnly => (Vec::new(), Vec::new()),
        };
        let mut found = 0;
        let info = kernel.syevr(
            jobz, range, uplo, n, &mut work, ld(n), 0.0, &mut found, &mut w, &mut z, ld(n), &mut isuppz,
        );
        status("syevr", info)?;

        w.truncate(found);
        let vectors = match jobz {
            EigenJob::Vectors => {
                z.truncate(n * found);
                Some(from_col_major(z, vec![n, found])?)
            }
            EigenJob::ValuesOnly => None,
        };
        Ok(Self {
            n,
            values: NdArray::from_vec(w, vec![found])?,
            vectors,
            reconstruction: OnceLock::new(),
        })
    }

    /// Number of eigenpairs held.
    pub fn len(&self) -> usize {
        self.values.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Eigenvalues, ascending.
    pub fn values(&self) -> &NdArray<f64> {
        &self.values
    }

    /// Eigenvectors as columns, if computed.
    pub fn vectors(&self) -> Option<&NdArray<f64>> {
        self.vectors.as_ref()
    }

    /// `V diag(w) Vᵗ`. With every eigenpair this is the original matrix;
    /// with a subset it is the projection onto the selected eigenspaces.
    pub fn reconstruct(&self) -> Result<&NdArray<f64>> {
        if let Some(r) = self.reconstruction.get() {
            return Ok(r);
        }
        let v = self.vectors.as_ref().ok_or(CoreError::InvalidArgument {
            reason: "eigenvectors were not computed",
        })?;
        let v = col_major(v);
        let w = self.values.to_vec();
        let n = self.n;
        let r = NdArray::from_fn(vec![n, n], |idx| {
            let (i, j) = (idx[0], idx[1]);
            w.iter()
                .enumerate()
                .map(|(l, &wl)| v[i + l * n] * wl * v[j + l * n])
                .sum()
        });
        Ok(self.reconstruction.get_or_init(|| r))
    }
}
