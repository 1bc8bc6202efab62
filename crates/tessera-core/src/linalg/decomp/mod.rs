//! Matrix decompositions.
//!
//! | Decomposition | Module  | Factorization        |
//! |---------------|---------|----------------------|
//! | LU            | [`lu`]  | `A = P L U`          |
//! | QR            | [`qr`]  | `A = Q R`            |
//! | SVD           | [`svd`] | `A = U diag(s) Vᵗ`   |
//! | Eigen         | [`eig`] | `A = V diag(w) Vᵗ`   |
//!
//! Each result is immutable once built, owns copies of everything it was
//! derived from, and memoizes derived quantities on first access.

pub mod eig;
pub mod lu;
pub mod qr;
pub mod svd;

pub use eig::SymmetricEigen;
pub use lu::LuDecomposition;
pub use qr::QrDecomposition;
pub use svd::SvdDecomposition;
