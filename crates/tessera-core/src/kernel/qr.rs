//! Householder QR, explicit `Q`, and rank-revealing least squares.
//!
//! Reflectors follow the LAPACK convention `H = I - tau * v * vᵗ` with
//! `v[0] = 1` implicit; the rest of `v` is stored below the diagonal.

use super::matrix_len;

// ----------------------------------------------------------------------
// Reflector helpers
// ----------------------------------------------------------------------

/// Build the reflector that zeroes `A[row+1.., col]`, leaving `beta` in
/// `A[row, col]` and `v` below it. Returns `tau`.
fn householder(a: &mut [f64], lda: usize, row: usize, col: usize, m: usize) -> f64 {
    let base = col * lda;
    let alpha = a[base + row];
    let xnorm = a[base + row + 1..base + m]
        .iter()
        .fold(0.0_f64, |acc, &x| acc.hypot(x));
    if xnorm == 0.0 {
        return 0.0;
    }
    let beta = if alpha >= 0.0 {
        -alpha.hypot(xnorm)
    } else {
        alpha.hypot(xnorm)
    };
    let tau = (beta - alpha) / beta;
    let scale = 1.0 / (alpha - beta);
    for x in &mut a[base + row + 1..base + m] {
        *x *= scale;
    }
    a[base + row] = beta;
    tau
}

/// `x = (I - tau * v * vᵗ) x` where `x[0]` pairs with the implicit unit
/// entry and `x[1..]` with `tail`.
fn reflect(tail: &[f64], tau: f64, x: &mut [f64]) {
    if tau == 0.0 {
        return;
    }
    let w = x[0] + tail.iter().zip(&x[1..]).map(|(v, xi)| v * xi).sum::<f64>();
    let tw = tau * w;
    x[0] -= tw;
    for (xi, v) in x[1..].iter_mut().zip(tail) {
        *xi -= tw * v;
    }
}

/// Apply the reflector stored in column `col` (rows `row..m`) to column
/// `j > col` of the same matrix.
fn reflect_column(a: &mut [f64], lda: usize, row: usize, col: usize, tau: f64, j: usize, m: usize) {
    let (left, right) = a.split_at_mut(j * lda);
    let tail = &left[col * lda + row + 1..col * lda + m];
    reflect(tail, tau, &mut right[row..m]);
}

// ----------------------------------------------------------------------
// Routines
// ----------------------------------------------------------------------

pub(super) fn geqrf(m: usize, n: usize, a: &mut [f64], lda: usize, tau: &mut [f64]) -> i32 {
    require!(lda >= m.max(1), 4);
    require!(a.len() >= matrix_len(m, n, lda), 3);
    require!(tau.len() >= m.min(n), 5);

    for k in 0..m.min(n) {
        tau[k] = householder(a, lda, k, k, m);
        for j in (k + 1)..n {
            reflect_column(a, lda, k, k, tau[k], j, m);
        }
    }
    0
}

/// Backward accumulation of `Q = H(0) H(1) ... H(k-1)`, first `n` columns.
pub(super) fn orgqr(m: usize, n: usize, k: usize, a: &mut [f64], lda: usize, tau: &[f64]) -> i32 {
    require!(n <= m, 2);
    require!(k <= n, 3);
    require!(lda >= m.max(1), 5);
    require!(a.len() >= matrix_len(m, n, lda), 4);
    require!(tau.len() >= k, 6);

    for j in k..n {
        let col = &mut a[j * lda..j * lda + m];
        col.fill(0.0);
        col[j] = 1.0;
    }

    for i in (0..k).rev() {
        for j in (i + 1)..n {
            reflect_column(a, lda, i, i, tau[i], j, m);
        }
        let col = &mut a[i * lda..i * lda + m];
        for x in &mut col[i + 1..] {
            *x *= -tau[i];
        }
        col[i] = 1.0 - tau[i];
        col[..i].fill(0.0);
    }
    0
}

/// QR with column pivoting: the remaining column of largest norm is moved
/// to the front at every step. `jpvt[j]` (1-based) is the original index of
/// column `j`.
fn geqp3(m: usize, n: usize, a: &mut [f64], lda: usize, jpvt: &mut [i32], tau: &mut [f64]) {
    for (j, p) in jpvt[..n].iter_mut().enumerate() {
        *p = (j + 1) as i32;
    }
    for p in 0..m.min(n) {
        let norm = |a: &[f64], j: usize| {
            a[j * lda + p..j * lda + m]
                .iter()
                .fold(0.0_f64, |acc, &x| acc.hypot(x))
        };
        let mut best = p;
        let mut best_norm = norm(a, p);
        for j in (p + 1)..n {
            let nj = norm(a, j);
            if nj > best_norm {
                best = j;
                best_norm = nj;
            }
        }
        if best != p {
            for i in 0..m {
                a.swap(i + p * lda, i + best * lda);
            }
            jpvt.swap(p, best);
        }
        tau[p] = householder(a, lda, p, p, m);
        for j in (p + 1)..n {
            reflect_column(a, lda, p, p, tau[p], j, m);
        }
    }
}

/// The numerical rank is the number of leading diagonal entries of the
/// pivoted `R` with `|R[i, i]| > rcond * |R[0, 0]|`.
#[allow(clippy::too_many_arguments)]
pub(super) fn gelsy(
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
    let rows = m.max(n);
    require!(lda >= m.max(1), 5);
    require!(a.len() >= matrix_len(m, n, lda), 4);
    require!(ldb >= rows.max(1), 7);
    require!(b.len() >= matrix_len(rows, nrhs, ldb), 6);
    require!(jpvt.len() >= n, 8);
    require!(rcond >= 0.0, 9);

    *rank = 0;
    let k = m.min(n);
    if k == 0 || nrhs == 0 {
        return 0;
    }

    let mut tau = vec![0.0; k];
    geqp3(m, n, a, lda, jpvt, &mut tau);

    let r00 = a[0].abs();
    if r00 == 0.0 {
        for r in 0..nrhs {
            b[r * ldb..r * ldb + n].fill(0.0);
        }
        return 0;
    }
    let r = (0..k)
        .take_while(|&p| a[p + p * lda].abs() > rcond * r00)
        .count();
    *rank = r;

    // c = Qᵗ b
    for col in 0..nrhs {
        let bcol = &mut b[col * ldb..col * ldb + m];
        for p in 0..k {
            reflect(&a[p * lda + p + 1..p * lda + m], tau[p], &mut bcol[p..]);
        }
    }

    // y solves [R11 R12] y = c[..r] with minimum norm. When r < n the
    // trapezoid is factored as (Q2 R2)ᵗ so that y = Q2 R2⁻ᵗ c.
    let mut y = vec![0.0; n];
    let mut trap = vec![0.0; n * r];
    for i in 0..r {
        for j in i..n {
            trap[j + i * n] = a[i + j * lda];
        }
    }
    let mut tau2 = vec![0.0; r];
    if r < n {
        geqrf(n, r, &mut trap, n, &mut tau2);
    }
    for col in 0..nrhs {
        let c = &b[col * ldb..col * ldb + r];
        y.fill(0.0);
        if r == n {
            // R11 y = c, back substitution
            for i in (0..n).rev() {
                let dot: f64 = ((i + 1)..n).map(|j| a[i + j * lda] * y[j]).sum();
                y[i] = (c[i] - dot) / a[i + i * lda];
            }
        } else {
            // R2ᵗ w = c, forward substitution; R2 is upper in `trap`
            for i in 0..r {
                let dot: f64 = (0..i).map(|j| trap[j + i * n] * y[j]).sum();
                y[i] = (c[i] - dot) / trap[i + i * n];
            }
            for p in (0..r).rev() {
                reflect(&trap[p * n + p + 1..p * n + n], tau2[p], &mut y[p..]);
            }
        }
        let x = &mut b[col * ldb..col * ldb + n];
        for (i, &p) in jpvt[..n].iter().enumerate() {
            x[p as usize - 1] = y[i];
        }
    }
    0
}
