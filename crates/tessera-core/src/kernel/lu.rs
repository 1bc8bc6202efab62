//! LU factorization with partial pivoting and the routines built on it.

use super::{matrix_len, Transpose};

/// Right-looking elimination; the first row holding the largest magnitude
/// in the pivot column wins.
pub(super) fn getrf(m: usize, n: usize, a: &mut [f64], lda: usize, ipiv: &mut [i32]) -> i32 {
    require!(lda >= m.max(1), 4);
    require!(a.len() >= matrix_len(m, n, lda), 3);
    require!(ipiv.len() >= m.min(n), 5);

    let mut info = 0;
    for k in 0..m.min(n) {
        let mut p = k;
        let mut best = a[k + k * lda].abs();
        for i in (k + 1)..m {
            let v = a[i + k * lda].abs();
            if v > best {
                best = v;
                p = i;
            }
        }
        ipiv[k] = (p + 1) as i32;

        if a[p + k * lda] != 0.0 {
            if p != k {
                for j in 0..n {
                    a.swap(k + j * lda, p + j * lda);
                }
            }
            let pivot = a[k + k * lda];
            for i in (k + 1)..m {
                a[i + k * lda] /= pivot;
            }
        } else if info == 0 {
            info = (k + 1) as i32;
        }

        for j in (k + 1)..n {
            let akj = a[k + j * lda];
            if akj == 0.0 {
                continue;
            }
            for i in (k + 1)..m {
                a[i + j * lda] -= a[i + k * lda] * akj;
            }
        }
    }
    info
}

/// Triangular solves against `getrf` factors, one right-hand side column at
/// a time.
#[allow(clippy::too_many_arguments)]
pub(super) fn getrs(
    trans: Transpose,
    n: usize,
    nrhs: usize,
    a: &[f64],
    lda: usize,
    ipiv: &[i32],
    b: &mut [f64],
    ldb: usize,
) -> i32 {
    require!(lda >= n.max(1), 5);
    require!(a.len() >= matrix_len(n, n, lda), 4);
    require!(ipiv.len() >= n, 6);
    require!(ipiv[..n].iter().all(|&p| p >= 1 && p as usize <= n), 6);
    require!(ldb >= n.max(1), 8);
    require!(b.len() >= matrix_len(n, nrhs, ldb), 7);

    for r in 0..nrhs {
        let x = &mut b[r * ldb..r * ldb + n];
        match trans {
            Transpose::No => {
                for (i, &p) in ipiv[..n].iter().enumerate() {
                    x.swap(i, p as usize - 1);
                }
                // L y = P b, unit diagonal
                for j in 0..n {
                    let xj = x[j];
                    for i in (j + 1)..n {
                        x[i] -= a[i + j * lda] * xj;
                    }
                }
                // U x = y
                for j in (0..n).rev() {
                    x[j] /= a[j + j * lda];
                    let xj = x[j];
                    for i in 0..j {
                        x[i] -= a[i + j * lda] * xj;
                    }
                }
            }
            Transpose::Yes => {
                // Uᵗ y = b
                for j in 0..n {
                    let dot: f64 = (0..j).map(|i| a[i + j * lda] * x[i]).sum();
                    x[j] = (x[j] - dot) / a[j + j * lda];
                }
                // Lᵗ z = y, unit diagonal
                for j in (0..n).rev() {
                    let dot: f64 = ((j + 1)..n).map(|i| a[i + j * lda] * x[i]).sum();
                    x[j] -= dot;
                }
                for (i, &p) in ipiv[..n].iter().enumerate().rev() {
                    x.swap(i, p as usize - 1);
                }
            }
        }
    }
    0
}

/// Inverse from `getrf` factors; positive status `i` when `U[i-1, i-1]`
/// is zero.
pub(super) fn getri(n: usize, a: &mut [f64], lda: usize, ipiv: &[i32]) -> i32 {
    require!(lda >= n.max(1), 3);
    require!(a.len() >= matrix_len(n, n, lda), 2);
    require!(ipiv.len() >= n, 4);

    if let Some(i) = (0..n).find(|&i| a[i + i * lda] == 0.0) {
        return (i + 1) as i32;
    }

    let mut inv = vec![0.0; n * n];
    for i in 0..n {
        inv[i + i * n] = 1.0;
    }
    let info = getrs(Transpose::No, n, n, a, lda, ipiv, &mut inv, n.max(1));
    if info != 0 {
        return -4;
    }
    for j in 0..n {
        a[j * lda..j * lda + n].copy_from_slice(&inv[j * n..(j + 1) * n]);
    }
    0
}

/// `getrf` followed by `getrs`; stops at the factorization when a pivot is
/// zero.
#[allow(clippy::too_many_arguments)]
pub(super) fn gesv(
    n: usize,
    nrhs: usize,
    a: &mut [f64],
    lda: usize,
    ipiv: &mut [i32],
    b: &mut [f64],
    ldb: usize,
) -> i32 {
    require!(lda >= n.max(1), 4);
    require!(a.len() >= matrix_len(n, n, lda), 3);
    require!(ipiv.len() >= n, 5);
    require!(ldb >= n.max(1), 7);
    require!(b.len() >= matrix_len(n, nrhs, ldb), 6);

    let info = getrf(n, n, a, lda, ipiv);
    if info != 0 {
        return info;
    }
    getrs(Transpose::No, n, nrhs, a, lda, ipiv, b, ldb)
}
