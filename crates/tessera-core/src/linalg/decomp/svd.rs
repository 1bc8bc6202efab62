//! Singular Value Decomposition (SVD).
//!
//! Factors an `m x n` matrix as `A = U diag(s) Vᵗ` with singular values
//! non-negative and non-increasing. Which factors are produced depends on
//! [`SvdJob`]:
//!
//! | Job | `U` | `Vᵗ` |
//! |-----|-----|------|
//! | `All` | `m x m` | `n x n` |
//! | `Economy` | `m x k` | `k x n` |
//! | `None` | - | - |

use std::sync::OnceLock;

use crate::array::NdArray;
use crate::error::{CoreError, Result};
use crate::kernel::{NumericKernel, SvdJob};
use crate::linalg::{col_major, from_col_major, ld, matrix_dims, status};

/// `(columns of U, rows of Vᵗ)` that `job` produces for an `m x n` matrix.
pub(crate) fn factor_dims(job: SvdJob, m: usize, n: usize) -> (usize, usize) {
    let k = m.min(n);
    match job {
        SvdJob::All => (m, n),
        SvdJob::Economy => (k, k),
        SvdJob::None => (0, 0),
    }
}

/// Column-major kernel output of one SVD call.
pub(crate) struct RawSvd {
    pub(crate) s: Vec<f64>,
    pub(crate) u: Vec<f64>,
    pub(crate) vt: Vec<f64>,
}

/// Run `gesvd` or `gesdd` on a scratch copy of `a`.
pub(crate) fn raw_svd(routine: &'static str, kernel: &dyn NumericKernel, job: SvdJob, a: &NdArray<f64>) -> Result<RawSvd> {
    let (m, n) = matrix_dims(a)?;
    let (ucols, vtrows) = factor_dims(job, m, n);
    let mut work = col_major(a);
    let mut s = vec![0.0; m.min(n)];
    let mut u = vec![0.0; m * ucols];
    let mut vt = vec![0.0; vtrows * n];
    let info = match routine {
        "gesdd" => kernel.gesdd(job, m, n, &mut work, ld(m), &mut s, &mut u, ld(m), &mut vt, ld(vtrows)),
        _ => kernel.gesvd(job, m, n, &mut work, ld(m), &mut s, &mut u, ld(m), &mut vt, ld(vtrows)),
    };
    status(routine, info)?;
    Ok(RawSvd { s, u, vt })
}

/// Result of `gesvd` or `gesdd`. Owns its factors; the kernel is not kept.
#[derive(Debug, Clone)]
pub struct SvdDecomposition {
    job: SvdJob,
    m: usize,
    n: usize,
    s: Vec<f64>,
    u: Option<NdArray<f64>>,
    vt: Option<NdArray<f64>>,
    default_rank: OnceLock<usize>,
}

impl SvdDecomposition {
    /// SVD of `a` through the kernel's `gesvd`.
    ///
    /// ```
    /// # use tessera_core::array::NdArray;
    /// # use tessera_core::kernel::{ReferenceKernel, SvdJob};
    /// # use tessera_core::linalg::SvdDecomposition;
    /// let a = NdArray::from_rows(&[[3.0, 0.0], [0.0, 4.0]]).unwrap();
    /// let svd = SvdDecomposition::decompose(&ReferenceKernel, &a, SvdJob::None).unwrap();
    /// assert_eq!(svd.singular_values().to_vec(), vec![4.0, 3.0]);
    /// ```
    pub fn decompose(kernel: &dyn NumericKernel, a: &NdArray<f64>, job: SvdJob) -> Result<Self> {
        Self::run("gesvd", kernel, a, job)
    }

    /// SVD of `a` through the kernel's divide-and-conquer `gesdd`.
    pub fn decompose_divide_and_conquer(kernel: &dyn NumericKernel, a: &NdArray<f64>, job: SvdJob) -> Result<Self> {
        Self::run("gesdd", kernel, a, job)
    }

    fn run(routine: &'static str, kernel: &dyn NumericKernel, a: &NdArray<f64>, job: SvdJob) -> Result<Self> {
        let (m, n) = matrix_dims(a)?;
        log::debug!("SVD ({job:?}) of a {m}x{n} matrix via `{routine}` on `{}`", kernel.name());
        let (ucols, vtrows) = factor_dims(job, m, n);
        let raw = raw_svd(routine, kernel, job, a)?;

        let (u, vt) = match job {
            SvdJob::None => (None, None),
            _ => (
                Some(from_col_major(raw.u, vec![m, ucols])?),
                Some(from_col_major(raw.vt, vec![vtrows, n])?),
            ),
        };
        Ok(Self {
            job,
            m,
            n,
            s: raw.s,
            u,
            vt,
            default_rank: OnceLock::new(),
        })
    }

    pub fn job(&self) -> SvdJob {
        self.job
    }

    /// Shape of the decomposed matrix.
    pub fn shape(&self) -> [usize; 2] {
        [self.m, self.n]
    }

    /// Singular values, largest first.
    pub fn singular_values(&self) -> NdArray<f64> {
        NdArray::from_fn(vec![self.s.len()], |idx| self.s[idx[0]])
    }

    /// Left singular vectors, or `None` for [`SvdJob::None`].
    pub fn u(&self) -> Option<&NdArray<f64>> {
        self.u.as_ref()
    }

    /// Right singular vectors as rows, or `None` for [`SvdJob::None`].
    pub fn vt(&self) -> Option<&NdArray<f64>> {
        self.vt.as_ref()
    }

    /// `max(m, n) * eps * s[0]`.
    pub fn default_tolerance(&self) -> f64 {
        self.m.max(self.n) as f64 * f64::EPSILON * self.s.first().copied().unwrap_or(0.0)
    }

    /// Number of singular values above `tol`, or above
    /// [`default_tolerance`](Self::default_tolerance) when `tol` is `None`.
    pub fn rank(&self, tol: Option<f64>) -> usize {
        match tol {
            Some(tol) => self.count_above(tol),
            None => *self
                .default_rank
                .get_or_init(|| self.count_above(self.default_tolerance())),
        }
    }

    fn count_above(&self, tol: f64) -> usize {
        self.s.iter().take_while(|&&x| x > tol).count()
    }

    /// 2-norm condition number `s[0] / s[k-1]`; infinite when the smallest
    /// singular value is zero, NaN for an empty matrix.
    pub fn condition_number(&self) -> f64 {
        match (self.s.first(), self.s.last()) {
            (Some(&largest), Some(&smallest)) if smallest > 0.0 => largest / smallest,
            (Some(_), Some(_)) => f64::INFINITY,
            _ => f64::NAN,
        }
    }

    fn factors(&self) -> Result<(&NdArray<f64>, &NdArray<f64>)> {
        match (&self.u, &self.vt) {
            (Some(u), Some(vt)) => Ok((u, vt)),
            _ => Err(CoreError::InvalidArgument {
                reason: "singular vectors were not computed",
            }),
        }
    }

    /// Moore-Penrose pseudo-inverse `V diag(1/s) Uᵗ`, dropping singular
    /// values at or below `tol` (default as in [`rank`](Self::rank)).
    pub fn pinv(&self, tol: Option<f64>) -> Result<NdArray<f64>> {
        let (u, vt) = self.factors()?;
        let r = self.rank(tol);
        let u = col_major(u);
        let vt = col_major(vt);
        let (m, n) = (self.m, self.n);
        let vt_rows = vt.len() / n.max(1);
        Ok(NdArray::from_fn(vec![n, m], |idx| {
            let (j, i) = (idx[0], idx[1]);
            (0..r)
                .map(|l| vt[l + j * vt_rows] * u[i + l * m] / self.s[l])
                .sum()
        }))
    }

    /// `U diag(s) Vᵗ`.
    pub fn reconstruct(&self) -> Result<NdArray<f64>> {
        let (u, vt) = self.factors()?;
        let u = col_major(u);
        let vt = col_major(vt);
        let (m, n) = (self.m, self.n);
        let vt_rows = vt.len() / n.max(1);
        Ok(NdArray::from_fn(vec![m, n], |idx| {
            let (i, j) = (idx[0], idx[1]);
            self.s
                .iter()
                .enumerate()
                .map(|(l, &sl)| u[i + l * m] * sl * vt[l + j * vt_rows])
                .sum()
        }))
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::kernel::ReferenceKernel;

    fn svd(a: &NdArray<f64>, job: SvdJob) -> SvdDecomposition {
        SvdDecomposition::decompose(&ReferenceKernel, a, job).unwrap()
    }

    fn sample() -> NdArray<f64> {
        NdArray::from_rows(&[[2.0, 0.0, 1.0], [-1.0, 3.0, 0.5], [0.0, 1.0, 4.0], [1.5, -2.0, 0.0]]).unwrap()
    }

    fn rel_err(a: &NdArray<f64>, b: &NdArray<f64>) -> f64 {
        let scale = a.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
        a.max_abs_diff(b).unwrap() / scale
    }

    #[test]
    fn test_shapes_per_job() {
        let a = sample();
        let full = svd(&a, SvdJob::All);
        assert_eq!(full.u().unwrap().shape(), &[4, 4]);
        assert_eq!(full.vt().unwrap().shape(), &[3, 3]);

        let econ = svd(&a, SvdJob::Economy);
        assert_eq!(econ.u().unwrap().shape(), &[4, 3]);
        assert_eq!(econ.vt().unwrap().shape(), &[3, 3]);

        let wide = svd(&a.transpose(), SvdJob::Economy);
        assert_eq!(wide.u().unwrap().shape(), &[3, 3]);
        assert_eq!(wide.vt().unwrap().shape(), &[3, 4]);

        let none = svd(&a, SvdJob::None);
        assert!(none.u().is_none() && none.vt().is_none());
        assert_eq!(none.singular_values().size(), 3);
    }

    #[test]
    fn test_values_ordered_non_negative() {
        let s = svd(&sample(), SvdJob::None).singular_values().to_vec();
        assert!(s.iter().all(|&x| x >= 0.0));
        assert!(s.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_reconstruction() {
        let a = sample();
        for job in [SvdJob::All, SvdJob::Economy] {
            assert!(rel_err(&svd(&a, job).reconstruct().unwrap(), &a) < 1e-6);
        }
        let at = a.transpose();
        assert!(rel_err(&svd(&at, SvdJob::All).reconstruct().unwrap(), &at) < 1e-6);
        assert!(svd(&a, SvdJob::None).reconstruct().is_err());
    }

    #[test]
    fn test_divide_and_conquer_agrees() {
        let a = sample();
        let dc = SvdDecomposition::decompose_divide_and_conquer(&ReferenceKernel, &a, SvdJob::Economy).unwrap();
        let s1 = dc.singular_values().to_vec();
        let s2 = svd(&a, SvdJob::Economy).singular_values().to_vec();
        assert!(s1.iter().zip(&s2).all(|(x, y)| (x - y).abs() < 1e-12));
    }

    #[test]
    fn test_rank_and_condition() {
        let a = NdArray::<f64>::ones(vec![3, 2]);
        let f = svd(&a, SvdJob::None);
        assert_eq!(f.rank(None), 1);
        assert_eq!(f.rank(Some(10.0)), 0);
        assert_eq!(f.condition_number(), f64::INFINITY);

        let d = NdArray::from_rows(&[[3.0, 0.0], [0.0, 4.0]]).unwrap();
        let f = svd(&d, SvdJob::None);
        assert_eq!(f.rank(None), 2);
        assert!((f.condition_number() - 4.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_pinv_of_invertible_is_inverse() {
        let a = NdArray::from_rows(&[[4.0, 7.0], [2.0, 6.0]]).unwrap();
        let p = svd(&a, SvdJob::Economy).pinv(None).unwrap();
        let expected = [0.6, -0.7, -0.2, 0.4];
        assert!(p.to_vec().iter().zip(expected).all(|(x, y)| (x - y).abs() < 1e-12));
        assert!(svd(&a, SvdJob::None).pinv(None).is_err());
    }
}
