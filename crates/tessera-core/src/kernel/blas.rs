//! BLAS Level 2–3 routines on column-major slices.

use super::{matrix_len, vector_len, Transpose};

// ======================================================================
// Level 2: matrix-vector, O(mn)
// ======================================================================

/// `y = alpha * op(A) * x + beta * y`.
#[allow(clippy::too_many_arguments)]
pub(super) fn gemv(
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
    require!(lda >= m.max(1), 6);
    require!(a.len() >= matrix_len(m, n, lda), 5);
    let (xlen, ylen) = match trans {
        Transpose::No => (n, m),
        Transpose::Yes => (m, n),
    };
    require!(incx > 0, 8);
    require!(x.len() >= vector_len(xlen, incx), 7);
    require!(incy > 0, 11);
    require!(y.len() >= vector_len(ylen, incy), 10);

    for i in 0..ylen {
        let yi = &mut y[i * incy];
        *yi = if beta == 0.0 { 0.0 } else { beta * *yi };
    }
    if alpha == 0.0 {
        return 0;
    }

    match trans {
        Transpose::No => {
            for j in 0..n {
                let t = alpha * x[j * incx];
                if t == 0.0 {
                    continue;
                }
                let col = &a[j * lda..j * lda + m];
                for (i, &aij) in col.iter().enumerate() {
                    y[i * incy] += t * aij;
                }
            }
        }
        Transpose::Yes => {
            for j in 0..n {
                let col = &a[j * lda..j * lda + m];
                let dot: f64 = col.iter().enumerate().map(|(i, &aij)| aij * x[i * incx]).sum();
                y[j * incy] += alpha * dot;
            }
        }
    }
    0
}

// ======================================================================
// Level 3: matrix-matrix, O(mnk)
// ======================================================================

/// `C = alpha * op(A) * op(B) + beta * C`.
#[allow(clippy::too_many_arguments)]
pub(super) fn gemm(
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
    // Stored shapes of A and B before op() is applied.
    let (a_rows, a_cols) = match transa {
        Transpose::No => (m, k),
        Transpose::Yes => (k, m),
    };
    let (b_rows, b_cols) = match transb {
        Transpose::No => (k, n),
        Transpose::Yes => (n, k),
    };
    require!(lda >= a_rows.max(1), 8);
    require!(a.len() >= matrix_len(a_rows, a_cols, lda), 7);
    require!(ldb >= b_rows.max(1), 10);
    require!(b.len() >= matrix_len(b_rows, b_cols, ldb), 9);
    require!(ldc >= m.max(1), 13);
    require!(c.len() >= matrix_len(m, n, ldc), 12);

    let a_at = |i: usize, p: usize| match transa {
        Transpose::No => a[i + p * lda],
        Transpose::Yes => a[p + i * lda],
    };
    let b_at = |p: usize, j: usize| match transb {
        Transpose::No => b[p + j * ldb],
        Transpose::Yes => b[j + p * ldb],
    };

    for j in 0..n {
        let col = &mut c[j * ldc..j * ldc + m];
        if beta == 0.0 {
            col.fill(0.0);
        } else if beta != 1.0 {
            col.iter_mut().for_each(|v| *v *= beta);
        }
        if alpha == 0.0 {
            continue;
        }
        // i-p-j ordering keeps the inner loop on contiguous A columns for
        // the common non-transposed case.
        for p in 0..k {
            let t = alpha * b_at(p, j);
            if t == 0.0 {
                continue;
            }
            for (i, ci) in col.iter_mut().enumerate() {
                *ci += t * a_at(i, p);
            }
        }
    }
    0
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_gemm_basic() {
        // A = [[1, 2], [3, 4]], B = [[5, 6], [7, 8]] stored column-major.
        let a = [1.0, 3.0, 2.0, 4.0];
        let b = [5.0, 7.0, 6.0, 8.0];
        let mut c = [0.0; 4];
        let info = gemm(Transpose::No, Transpose::No, 2, 2, 2, 1.0, &a, 2, &b, 2, 0.0, &mut c, 2);
        assert_eq!(info, 0);
        assert_eq!(c, [19.0, 43.0, 22.0, 50.0]);
    }

    #[test]
    fn test_gemm_transposed_with_beta() {
        // op(A) = Aᵗ with A = [[1, 2], [3, 4]]: Aᵗ·I + 2·C
        let a = [1.0, 3.0, 2.0, 4.0];
        let b = [1.0, 0.0, 0.0, 1.0];
        let mut c = [1.0, 1.0, 1.0, 1.0];
        let info = gemm(Transpose::Yes, Transpose::No, 2, 2, 2, 1.0, &a, 2, &b, 2, 2.0, &mut c, 2);
        assert_eq!(info, 0);
        assert_eq!(c, [3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_gemm_beta_zero_ignores_nan() {
        let a = [1.0];
        let b = [2.0];
        let mut c = [f64::NAN];
        gemm(Transpose::No, Transpose::No, 1, 1, 1, 1.0, &a, 1, &b, 1, 0.0, &mut c, 1);
        assert_eq!(c[0], 2.0);
    }

    #[test]
    fn test_gemm_rejects_short_leading_dimension() {
        let a = [0.0; 6];
        let b = [0.0; 6];
        let mut c = [0.0; 9];
        assert_eq!(gemm(Transpose::No, Transpose::No, 3, 3, 2, 1.0, &a, 2, &b, 2, 0.0, &mut c, 3), -8);
    }

    #[test]
    fn test_gemv_both_ways() {
        // A = [[1, 2, 3], [4, 5, 6]]
        let a = [1.0, 4.0, 2.0, 5.0, 3.0, 6.0];
        let x = [1.0, 1.0, 1.0];
        let mut y = [0.0; 2];
        assert_eq!(gemv(Transpose::No, 2, 3, 1.0, &a, 2, &x, 1, 0.0, &mut y, 1), 0);
        assert_eq!(y, [6.0, 15.0]);

        let x = [1.0, 2.0];
        let mut y = [0.0; 3];
        assert_eq!(gemv(Transpose::Yes, 2, 3, 1.0, &a, 2, &x, 1, 0.0, &mut y, 1), 0);
        assert_eq!(y, [9.0, 12.0, 15.0]);
    }

    #[test]
    fn test_gemv_strided() {
        let a = [2.0, 0.0, 0.0, 3.0];
        let x = [1.0, -9.0, 1.0];
        let mut y = [1.0, -9.0, 1.0];
        assert_eq!(gemv(Transpose::No, 2, 2, 1.0, &a, 2, &x, 2, 1.0, &mut y, 2), 0);
        assert_eq!(y, [3.0, -9.0, 4.0]);
    }
}
