//! Singular value decomposition by one-sided Jacobi rotations.
//!
//! Pairs of columns are rotated until they are mutually orthogonal; the
//! column norms are then the singular values. Wide matrices are handled
//! through their transpose.

use super::{matrix_len, SvdJob};

/// Maximum number of Jacobi sweeps before giving up.
const MAX_SWEEPS: usize = 100;

/// Relative orthogonality tolerance.
const TOL: f64 = f64::EPSILON * 100.0;

struct TallSvd {
    /// Descending singular values, length `n`.
    s: Vec<f64>,
    /// Left singular vectors, `m x m` column-major.
    u: Vec<f64>,
    /// Right singular vectors, `n x n` column-major.
    v: Vec<f64>,
    /// Column pairs still above tolerance after the last sweep.
    unconverged: usize,
}

/// One-sided Jacobi on a column-major `m x n` matrix with `m >= n`.
#[allow(clippy::many_single_char_names)]
fn jacobi_tall(mut work: Vec<f64>, m: usize, n: usize) -> TallSvd {
    let mut v = vec![0.0; n * n];
    for i in 0..n {
        v[i + i * n] = 1.0;
    }

    // Columns whose squared norm falls below this are numerically zero.
    let floor = f64::EPSILON * f64::EPSILON * work.iter().map(|x| x * x).sum::<f64>();

    let mut unconverged = 0;
    for _sweep in 0..MAX_SWEEPS {
        unconverged = 0;
        for p in 0..n {
            for q in (p + 1)..n {
                let (mut app, mut aqq, mut apq) = (0.0, 0.0, 0.0);
                for i in 0..m {
                    let wp = work[i + p * m];
                    let wq = work[i + q * m];
                    app += wp * wp;
                    aqq += wq * wq;
                    apq += wp * wq;
                }
                if app <= floor || aqq <= floor || apq.abs() <= TOL * (app * aqq).sqrt() {
                    continue;
                }
                unconverged += 1;

                let tau = (aqq - app) / (apq + apq);
                let t = if tau >= 0.0 {
                    1.0 / (tau + (1.0 + tau * tau).sqrt())
                } else {
                    -1.0 / (-tau + (1.0 + tau * tau).sqrt())
                };
                let cs = 1.0 / (1.0 + t * t).sqrt();
                let sn = t * cs;

                rotate(&mut work, m, p, q, cs, sn);
                rotate(&mut v, n, p, q, cs, sn);
            }
        }
        if unconverged == 0 {
            break;
        }
    }

    let norms: Vec<f64> = (0..n)
        .map(|j| work[j * m..(j + 1) * m].iter().fold(0.0_f64, |acc, &x| acc.hypot(x)))
        .collect();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| norms[b].total_cmp(&norms[a]));

    let cutoff = order.first().map_or(0.0, |&j| norms[j] * TOL);
    let mut s = Vec::with_capacity(n);
    let mut u = vec![0.0; m * m];
    let mut filled = vec![false; m];
    let mut v_sorted = vec![0.0; n * n];
    for (new_j, &old_j) in order.iter().enumerate() {
        let sigma = norms[old_j];
        s.push(sigma);
        if sigma > cutoff {
            for i in 0..m {
                u[i + new_j * m] = work[i + old_j * m] / sigma;
            }
            filled[new_j] = true;
        }
        v_sorted[new_j * n..(new_j + 1) * n].copy_from_slice(&v[old_j * n..(old_j + 1) * n]);
    }
    complete_basis(&mut u, m, &mut filled);

    TallSvd {
        s,
        u,
        v: v_sorted,
        unconverged,
    }
}

/// Rotate columns `p` and `q` of a column-major matrix with `rows` rows.
fn rotate(a: &mut [f64], rows: usize, p: usize, q: usize, cs: f64, sn: f64) {
    for i in 0..rows {
        let ap = a[i + p * rows];
        let aq = a[i + q * rows];
        a[i + p * rows] = cs * ap - sn * aq;
        a[i + q * rows] = sn * ap + cs * aq;
    }
}

/// Fill every column of the `m x m` matrix `u` not marked in `filled` with
/// a unit vector orthogonal to all filled columns (Gram-Schmidt on the
/// standard basis, two passes).
fn complete_basis(u: &mut [f64], m: usize, filled: &mut [bool]) {
    // Some e_c always keeps at least 1/sqrt(m) of its length after
    // projection, so this threshold is always met by some candidate.
    let accept = 0.5 / (m as f64).sqrt();
    let mut candidate = 0;
    for slot in 0..m {
        if filled[slot] {
            continue;
        }
        while candidate < m {
            let mut x = vec![0.0; m];
            x[candidate] = 1.0;
            candidate += 1;
            for _pass in 0..2 {
                for k in (0..m).filter(|&k| filled[k]) {
                    let col = &u[k * m..(k + 1) * m];
                    let dot: f64 = col.iter().zip(&x).map(|(a, b)| a * b).sum();
                    for (xi, ci) in x.iter_mut().zip(col) {
                        *xi -= dot * ci;
                    }
                }
            }
            let norm = x.iter().fold(0.0_f64, |acc, &v| acc.hypot(v));
            if norm > accept {
                for (dst, xi) in u[slot * m..(slot + 1) * m].iter_mut().zip(&x) {
                    *dst = xi / norm;
                }
                filled[slot] = true;
                break;
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub(super) fn gesvd(
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
    let k = m.min(n);
    require!(lda >= m.max(1), 5);
    require!(a.len() >= matrix_len(m, n, lda), 4);
    require!(s.len() >= k, 6);
    let (ucols, vtrows) = match job {
        SvdJob::All => (m, n),
        SvdJob::Economy => (k, k),
        SvdJob::None => (0, 0),
    };
    if ucols > 0 {
        require!(ldu >= m.max(1), 8);
        require!(u.len() >= matrix_len(m, ucols, ldu), 7);
    }
    if vtrows > 0 {
        require!(ldvt >= vtrows.max(1), 10);
        require!(vt.len() >= matrix_len(vtrows, n, ldvt), 9);
    }
    if k == 0 {
        fill_identity(u, m, ucols, ldu);
        fill_identity(vt, vtrows, n, ldvt);
        return 0;
    }

    // left: m x m, right: n x n, with A = left · diag(s) · rightᵗ.
    let (sigma, left, right, unconverged) = if m >= n {
        let mut work = vec![0.0; m * n];
        for j in 0..n {
            work[j * m..(j + 1) * m].copy_from_slice(&a[j * lda..j * lda + m]);
        }
        let r = jacobi_tall(work, m, n);
        (r.s, r.u, r.v, r.unconverged)
    } else {
        let mut work = vec![0.0; n * m];
        for j in 0..n {
            for i in 0..m {
                work[j + i * n] = a[i + j * lda];
            }
        }
        let r = jacobi_tall(work, n, m);
        (r.s, r.v, r.u, r.unconverged)
    };

    s[..k].copy_from_slice(&sigma[..k]);
    for j in 0..ucols {
        u[j * ldu..j * ldu + m].copy_from_slice(&left[j * m..(j + 1) * m]);
    }
    for i in 0..vtrows {
        for j in 0..n {
            vt[i + j * ldvt] = right[j + i * n];
        }
    }
    i32::try_from(unconverged).unwrap_or(i32::MAX)
}

fn fill_identity(a: &mut [f64], rows: usize, cols: usize, ld: usize) {
    for j in 0..cols {
        for i in 0..rows {
            a[i + j * ld] = if i == j { 1.0 } else { 0.0 };
        }
    }
}

#[cfg(test)]
#[allow(clippy::many_single_char_names)]
mod tests {
    use super::*;

    /// `U[:, :k] · diag(s) · Vᵗ[:k, :]` for column-major factors.
    fn reconstruct(m: usize, n: usize, u: &[f64], ldu: usize, s: &[f64], vt: &[f64], ldvt: usize) -> Vec<f64> {
        let mut out = vec![0.0; m * n];
        for j in 0..n {
            for i in 0..m {
                out[i + j * m] = (0..s.len()).map(|p| u[i + p * ldu] * s[p] * vt[p + j * ldvt]).sum();
            }
        }
        out
    }

    fn assert_orthonormal_columns(q: &[f64], rows: usize, cols: usize) {
        for p in 0..cols {
            for r in 0..cols {
                let dot: f64 = (0..rows).map(|i| q[i + p * rows] * q[i + r * rows]).sum();
                let expected = if p == r { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-10, "columns {p}, {r}: {dot}");
            }
        }
    }

    #[test]
    fn test_gesvd_diagonal() {
        let mut a = vec![3.0, 0.0, 0.0, 4.0];
        let mut s = [0.0; 2];
        let (mut u, mut vt) = (vec![0.0; 4], vec![0.0; 4]);
        assert_eq!(gesvd(SvdJob::All, 2, 2, &mut a, 2, &mut s, &mut u, 2, &mut vt, 2), 0);
        assert!((s[0] - 4.0).abs() < 1e-12);
        assert!((s[1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_gesvd_tall_full() {
        let a0 = vec![1.0, 3.0, 5.0, 2.0, 4.0, 6.0];
        let mut a = a0.clone();
        let mut s = [0.0; 2];
        let (mut u, mut vt) = (vec![0.0; 9], vec![0.0; 4]);
        assert_eq!(gesvd(SvdJob::All, 3, 2, &mut a, 3, &mut s, &mut u, 3, &mut vt, 2), 0);
        assert!(s[0] >= s[1] && s[1] >= 0.0);
        assert_orthonormal_columns(&u, 3, 3);
        let r = reconstruct(3, 2, &u, 3, &s, &vt, 2);
        for (x, y) in r.iter().zip(&a0) {
            assert!((x - y).abs() < 1e-10);
        }
    }

    #[test]
    fn test_gesvd_wide_economy() {
        let a0 = vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0];
        let mut a = a0.clone();
        let mut s = [0.0; 2];
        let (mut u, mut vt) = (vec![0.0; 4], vec![0.0; 6]);
        assert_eq!(gesvd(SvdJob::Economy, 2, 3, &mut a, 2, &mut s, &mut u, 2, &mut vt, 2), 0);
        let r = reconstruct(2, 3, &u, 2, &s, &vt, 2);
        for (x, y) in r.iter().zip(&a0) {
            assert!((x - y).abs() < 1e-10);
        }
    }

    #[test]
    fn test_gesvd_rank_deficient_u_is_orthogonal() {
        // Rank 1: every column is a multiple of (1, 2, 3).
        let mut a = vec![1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 3.0, 6.0, 9.0];
        let mut s = [0.0; 3];
        let (mut u, mut vt) = (vec![0.0; 9], vec![0.0; 9]);
        assert_eq!(gesvd(SvdJob::All, 3, 3, &mut a, 3, &mut s, &mut u, 3, &mut vt, 3), 0);
        assert!((s[0] - 14.0).abs() < 1e-10);
        assert!(s[1] < 1e-10 && s[2] < 1e-10);
        assert_orthonormal_columns(&u, 3, 3);
    }

    #[test]
    fn test_gesvd_values_only() {
        let mut a = vec![2.0, 0.0, 0.0, -5.0];
        let mut s = [0.0; 2];
        assert_eq!(gesvd(SvdJob::None, 2, 2, &mut a, 2, &mut s, &mut [], 1, &mut [], 1), 0);
        assert!((s[0] - 5.0).abs() < 1e-12);
        assert!((s[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_gesvd_argument_errors() {
        let mut a = vec![0.0; 4];
        let mut s = [0.0; 2];
        let (mut u, mut vt) = (vec![0.0; 4], vec![0.0; 4]);
        assert_eq!(gesvd(SvdJob::All, 2, 2, &mut a, 1, &mut s, &mut u, 2, &mut vt, 2), -5);
        assert_eq!(gesvd(SvdJob::All, 2, 2, &mut a, 2, &mut s[..1], &mut u, 2, &mut vt, 2), -6);
        assert_eq!(gesvd(SvdJob::All, 2, 2, &mut a, 2, &mut s, &mut u[..3], 2, &mut vt, 2), -7);
        assert_eq!(gesvd(SvdJob::All, 2, 2, &mut a, 2, &mut s, &mut u, 2, &mut vt, 1), -10);
    }
}
