//! Symmetric eigensolvers by cyclic Jacobi rotations.

use super::{matrix_len, EigenJob, EigenRange, Triangle};

/// Maximum number of Jacobi sweeps.
const MAX_SWEEPS: usize = 100;

struct Eigen {
    /// Ascending eigenvalues.
    values: Vec<f64>,
    /// Matching eigenvectors as the columns of an `n x n` column-major
    /// matrix.
    vectors: Vec<f64>,
    converged: bool,
}

/// Expand the stored triangle into a full column-major `n x n` matrix.
fn symmetrize(uplo: Triangle, n: usize, a: &[f64], lda: usize) -> Vec<f64> {
    let mut s = vec![0.0; n * n];
    for j in 0..n {
        for i in 0..n {
            let stored = match uplo {
                Triangle::Upper if i <= j => a[i + j * lda],
                Triangle::Upper => a[j + i * lda],
                Triangle::Lower if i >= j => a[i + j * lda],
                Triangle::Lower => a[j + i * lda],
            };
            s[i + j * n] = stored;
        }
    }
    s
}

#[allow(clippy::many_single_char_names)]
fn jacobi(mut s: Vec<f64>, n: usize) -> Eigen {
    let mut v = vec![0.0; n * n];
    for i in 0..n {
        v[i + i * n] = 1.0;
    }

    let scale = s.iter().fold(0.0_f64, |acc, &x| acc.hypot(x));
    let tol = f64::EPSILON * 100.0 * scale.max(f64::MIN_POSITIVE);

    let mut converged = false;
    for _sweep in 0..MAX_SWEEPS {
        let off_norm = (0..n)
            .flat_map(|j| (0..j).map(move |i| (i, j)))
            .fold(0.0_f64, |acc, (i, j)| acc.hypot(s[i + j * n]));
        if off_norm < tol {
            converged = true;
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = s[p + q * n];
                if apq == 0.0 {
                    continue;
                }
                let app = s[p + p * n];
                let aqq = s[q + q * n];

                let theta = (aqq - app) / (apq + apq);
                let t = if theta >= 0.0 {
                    1.0 / (theta + (1.0 + theta * theta).sqrt())
                } else {
                    -1.0 / (-theta + (1.0 + theta * theta).sqrt())
                };
                let cs = 1.0 / (1.0 + t * t).sqrt();
                let sn = t * cs;

                s[p + p * n] = app - t * apq;
                s[q + q * n] = aqq + t * apq;
                s[p + q * n] = 0.0;
                s[q + p * n] = 0.0;
                for r in (0..n).filter(|&r| r != p && r != q) {
                    let srp = s[r + p * n];
                    let srq = s[r + q * n];
                    let new_p = cs * srp - sn * srq;
                    let new_q = sn * srp + cs * srq;
                    s[r + p * n] = new_p;
                    s[p + r * n] = new_p;
                    s[r + q * n] = new_q;
                    s[q + r * n] = new_q;
                }

                for i in 0..n {
                    let vp = v[i + p * n];
                    let vq = v[i + q * n];
                    v[i + p * n] = cs * vp - sn * vq;
                    v[i + q * n] = sn * vp + cs * vq;
                }
            }
        }
    }

    let diag: Vec<f64> = (0..n).map(|i| s[i + i * n]).collect();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| diag[a].total_cmp(&diag[b]));

    let values = order.iter().map(|&i| diag[i]).collect();
    let mut vectors = vec![0.0; n * n];
    for (new_j, &old_j) in order.iter().enumerate() {
        vectors[new_j * n..(new_j + 1) * n].copy_from_slice(&v[old_j * n..(old_j + 1) * n]);
    }
    Eigen {
        values,
        vectors,
        converged,
    }
}

pub(super) fn syev(jobz: EigenJob, uplo: Triangle, n: usize, a: &mut [f64], lda: usize, w: &mut [f64]) -> i32 {
    require!(lda >= n.max(1), 5);
    require!(a.len() >= matrix_len(n, n, lda), 4);
    require!(w.len() >= n, 6);

    let eig = jacobi(symmetrize(uplo, n, a, lda), n);
    if !eig.converged {
        return 1;
    }
    w[..n].copy_from_slice(&eig.values);
    if jobz == EigenJob::Vectors {
        for j in 0..n {
            a[j * lda..j * lda + n].copy_from_slice(&eig.vectors[j * n..(j + 1) * n]);
        }
    }
    0
}

#[allow(clippy::too_many_arguments)]
pub(super) fn syevr(
    jobz: EigenJob,
    range: EigenRange,
    uplo: Triangle,
    n: usize,
    a: &mut [f64],
    lda: usize,
    _abstol: f64,
    m: &mut usize,
    w: &mut [f64],
    z: &mut [f64],
    ldz: usize,
    isuppz: &mut [i32],
) -> i32 {
    require!(lda >= n.max(1), 6);
    require!(a.len() >= matrix_len(n, n, lda), 5);
    match range {
        EigenRange::All => {}
        EigenRange::Value { lower, upper } => require!(lower < upper, 8),
        EigenRange::Index { first, last } => {
            require!(first >= 1 && first <= n.max(1), 9);
            require!(last >= first.min(n) && last <= n, 10);
        }
    }
    require!(w.len() >= n, 13);
    let wants_vectors = jobz == EigenJob::Vectors;
    if wants_vectors {
        require!(ldz >= n.max(1), 15);
    }

    *m = 0;
    if n == 0 {
        return 0;
    }

    let eig = jacobi(symmetrize(uplo, n, a, lda), n);
    if !eig.converged {
        return 1;
    }
    let selected: Vec<usize> = match range {
        EigenRange::All => (0..n).collect(),
        EigenRange::Value { lower, upper } => (0..n)
            .filter(|&i| eig.values[i] > lower && eig.values[i] <= upper)
            .collect(),
        EigenRange::Index { first, last } => (first - 1..last).collect(),
    };

    if wants_vectors {
        require!(z.len() >= matrix_len(n, selected.len(), ldz), 14);
        require!(isuppz.len() >= 2 * selected.len(), 16);
    }
    for (out, &i) in selected.iter().enumerate() {
        w[out] = eig.values[i];
        if wants_vectors {
            let vector = &eig.vectors[i * n..(i + 1) * n];
            z[out * ldz..out * ldz + n].copy_from_slice(vector);
            let first = vector.iter().position(|&x| x != 0.0).unwrap_or(0);
            let last = vector.iter().rposition(|&x| x != 0.0).unwrap_or(0);
            isuppz[2 * out] = (first + 1) as i32;
            isuppz[2 * out + 1] = (last + 1) as i32;
        }
    }
    *m = selected.len();
    0
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    /// The 5 x 5 symmetric fixture, upper triangle only (lower is garbage).
    fn fixture() -> Vec<f64> {
        let upper = [
            [0.67, -0.20, 0.19, -1.06, 0.46],
            [0.0, 3.82, -0.13, 1.06, -0.48],
            [0.0, 0.0, 3.27, 0.11, 1.10],
            [0.0, 0.0, 0.0, 5.86, -0.98],
            [0.0, 0.0, 0.0, 0.0, 3.54],
        ];
        let mut a = vec![99.0; 25];
        for i in 0..5 {
            for j in i..5 {
                a[i + j * 5] = upper[i][j];
            }
        }
        a
    }

    const EIGENVALUES: [f64; 5] = [0.433_02, 2.144_95, 3.368_09, 4.279_15, 6.934_79];

    #[test]
    fn test_syev_fixture_ascending() {
        let mut a = fixture();
        let mut w = [0.0; 5];
        assert_eq!(syev(EigenJob::Vectors, Triangle::Upper, 5, &mut a, 5, &mut w), 0);
        for (got, want) in w.iter().zip(EIGENVALUES) {
            assert!((got - want).abs() < 1e-4, "{got} vs {want}");
        }
        // A v = λ v for the first eigenpair.
        let full = symmetrize(Triangle::Upper, 5, &fixture(), 5);
        for i in 0..5 {
            let av: f64 = (0..5).map(|j| full[i + j * 5] * a[j]).sum();
            assert!((av - w[0] * a[i]).abs() < 1e-10);
        }
    }

    #[test]
    fn test_syev_values_only_leaves_a() {
        let mut a = vec![2.0, 1.0, 1.0, 2.0];
        let mut w = [0.0; 2];
        assert_eq!(syev(EigenJob::ValuesOnly, Triangle::Lower, 2, &mut a, 2, &mut w), 0);
        assert!((w[0] - 1.0).abs() < 1e-12);
        assert!((w[1] - 3.0).abs() < 1e-12);
        assert_eq!(a, vec![2.0, 1.0, 1.0, 2.0]);
    }

    #[test]
    fn test_syevr_index_range() {
        let mut a = fixture();
        let mut w = [0.0; 5];
        let mut z = vec![0.0; 25];
        let mut isuppz = [0; 10];
        let mut m = 0;
        let info = syevr(
            EigenJob::Vectors,
            EigenRange::Index { first: 1, last: 3 },
            Triangle::Upper,
            5,
            &mut a,
            5,
            0.0,
            &mut m,
            &mut w,
            &mut z,
            5,
            &mut isuppz,
        );
        assert_eq!(info, 0);
        assert_eq!(m, 3);
        for (got, want) in w[..3].iter().zip([0.433, 2.145, 3.368]) {
            assert!((got - want).abs() < 1e-3);
        }
        assert!(z[15..].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_syevr_value_range_is_half_open() {
        let mut a = vec![1.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 3.0];
        let mut w = [0.0; 3];
        let mut m = 0;
        let info = syevr(
            EigenJob::ValuesOnly,
            EigenRange::Value { lower: 1.0, upper: 3.0 },
            Triangle::Upper,
            3,
            &mut a,
            3,
            0.0,
            &mut m,
            &mut w,
            &mut [],
            1,
            &mut [],
        );
        assert_eq!(info, 0);
        assert_eq!(m, 2);
        assert_eq!(&w[..2], &[2.0, 3.0]);
    }

    #[test]
    fn test_syevr_bad_index_range() {
        let mut a = vec![1.0; 4];
        let mut w = [0.0; 2];
        let mut m = 0;
        let range = EigenRange::Index { first: 2, last: 3 };
        let info = syevr(
            EigenJob::ValuesOnly,
            range,
            Triangle::Upper,
            2,
            &mut a,
            2,
            0.0,
            &mut m,
            &mut w,
            &mut [],
            1,
            &mut [],
        );
        assert_eq!(info, -10);
    }
}
