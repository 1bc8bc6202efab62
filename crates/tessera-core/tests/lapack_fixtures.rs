//! Decompositions checked against published LAPACK example data.

#![allow(clippy::float_cmp)]

use tessera_core::prelude::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn routines() -> LinearAlgebraRoutines<'static> {
    ArrayContext::global().linalg()
}

fn approx_eq(a: &[f64], b: &[f64], tol: f64) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(&x, &y)| (x - y).abs() < tol)
}

fn getrf_matrix() -> NdArray<f64> {
    NdArray::from_rows(&[
        [1.80, 2.88, 2.05, -0.89],
        [5.25, -2.95, -0.95, -3.80],
        [1.58, -2.69, -2.90, -1.04],
        [-1.11, -0.66, -0.59, 0.80],
    ])
    .unwrap()
}

fn gesv_system() -> (NdArray<f64>, NdArray<f64>) {
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

fn syevr_matrix() -> NdArray<f64> {
    NdArray::from_rows(&[
        [0.67, -0.20, 0.19, -1.06, 0.46],
        [-0.20, 3.82, -0.13, 1.06, -0.48],
        [0.19, -0.13, 3.27, 0.11, 1.10],
        [-1.06, 1.06, 0.11, 5.86, -0.98],
        [0.46, -0.48, 1.10, -0.98, 3.54],
    ])
    .unwrap()
}

#[test]
fn test_lu_fixture() {
    init_logging();
    let a = getrf_matrix();
    let lu = routines().lu(&a).unwrap();
    assert_eq!(lu.pivots().to_vec(), vec![2, 2, 3, 4]);
    assert!(lu.is_non_singular());

    let la = routines();
    let pa = la.matmul(&lu.permutation(), &a).unwrap();
    let product = la.matmul(lu.lower(), lu.upper()).unwrap();
    assert!(pa.max_abs_diff(&product).unwrap() < 1e-12);

    let det = lu.determinant().unwrap();
    let inv = lu.inverse().unwrap();
    assert!((det * inv.det().unwrap() - 1.0).abs() < 1e-9);
}

#[test]
fn test_gesv_fixture() {
    init_logging();
    let (a, b) = gesv_system();
    let x = a.solve(&b).unwrap();
    let expected = [
        -0.80, -0.39, 0.96, //
        -0.70, -0.55, 0.22, //
        0.59, 0.84, 1.90, //
        1.32, -0.10, 5.36, //
        0.57, 0.11, 4.04,
    ];
    assert_eq!(x.shape(), &[5, 3]);
    assert!(approx_eq(&x.to_vec(), &expected, 0.01));

    let ipiv = NdArray::zeros(vec![5]);
    let (a, b) = (a.copy(), b.copy());
    routines().gesv(&a, &ipiv, &b).unwrap();
    assert_eq!(ipiv.to_vec(), vec![5, 5, 3, 4, 5]);
}

#[test]
fn test_geqrf_fixture() {
    init_logging();
    let a = NdArray::from_rows(&[
        [0.0, 2.0],
        [2.0, -1.0],
        [2.0, -1.0],
        [0.0, 1.5],
        [2.0, -1.0],
        [2.0, -1.0],
    ])
    .unwrap();
    let qr = routines().qr(&a).unwrap();
    assert!(approx_eq(&qr.tau().to_vec(), &[1.0, 1.4], 1e-12));
    assert!(qr.is_full_rank());
    let rebuilt = routines().matmul(qr.q().unwrap(), qr.r()).unwrap();
    assert!(rebuilt.max_abs_diff(&a).unwrap() < 1e-12);
}

#[test]
fn test_syevr_index_range_fixture() {
    init_logging();
    let range = EigenRange::Index { first: 1, last: 3 };
    let eig = SymmetricEigen::decompose_range(
        ArrayContext::global().kernel(),
        &syevr_matrix(),
        Triangle::Upper,
        range,
        EigenJob::Vectors,
    )
    .unwrap();
    assert_eq!(eig.len(), 3);
    assert!(approx_eq(&eig.values().to_vec(), &[0.433, 2.145, 3.368], 1e-3));

    let full = routines().eigh(&syevr_matrix()).unwrap();
    assert!(full.reconstruct().unwrap().max_abs_diff(&syevr_matrix()).unwrap() < 1e-10);
}

#[test]
fn test_gelsy_rank_deficient() {
    init_logging();
    // The middle column is zero, so the minimum-norm solution leaves it at 0.
    let a = NdArray::from_rows(&[[1.0, 0.0, 0.0], [0.0, 0.0, 2.0], [1.0, 0.0, 1.0], [0.0, 0.0, 1.0]]).unwrap();
    let b = NdArray::from_vec(vec![1.0, 2.0, 2.0, 1.0], vec![4]).unwrap();
    let fit = a.lstsq(&b).unwrap();
    assert_eq!(fit.rank, 2);
    assert_eq!(fit.solution.shape(), &[3]);
    assert!(approx_eq(&fit.solution.to_vec(), &[1.0, 0.0, 1.0], 1e-12));
    assert_eq!(a.matrix_rank().unwrap(), 2);
}

#[test]
fn test_failures_surface() {
    init_logging();
    let singular = NdArray::from_rows(&[[1.0, 2.0], [2.0, 4.0]]).unwrap();
    let rhs = NdArray::from_vec(vec![1.0, 2.0], vec![2]).unwrap();
    assert_eq!(
        singular.solve(&rhs).unwrap_err(),
        CoreError::NumericKernelFailure { routine: "gesv", code: 2 }
    );
    assert_eq!(singular.inv().unwrap_err(), CoreError::SingularMatrix);
    assert_eq!(singular.det().unwrap(), 0.0);

    let lu = routines().lu(&singular).unwrap();
    assert!(!lu.is_non_singular());
    assert_eq!(lu.inverse().unwrap_err(), CoreError::SingularMatrix);

    let rect = NdArray::<f64>::zeros(vec![2, 3]);
    assert!(matches!(rect.det(), Err(CoreError::ShapeMismatch { .. })));
}
