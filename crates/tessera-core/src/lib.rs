//! `tessera-core`: strided N-dimensional arrays and dense linear algebra.
//!
//! Provides the [`NdArray`] type with zero-copy views, element kinds, a
//! pluggable numeric kernel, and LU / QR / SVD / symmetric eigen
//! decompositions built on it. The `tessera` crate re-exports everything
//! here behind its prelude.
//!
//! # Design
//!
//! - One generic array type over a closed set of element kinds
//!   ([`ElementKind`]); arithmetic through the [`Scalar`] / [`Float`] traits.
//! - Arrays share their buffer with every view derived from them. Only
//!   [`NdArray::copy`] breaks aliasing.
//! - Dense kernels sit behind [`NumericKernel`]; the pure-Rust
//!   [`ReferenceKernel`] is always available.
//! - Backends are chosen explicitly through [`ArrayContext`], or once per
//!   process by [`ArrayContext::global`].
//! - No `unsafe`.
//!
//! # Example
//!
//! ```
//! use tessera_core::prelude::*;
//!
//! let a = NdArray::from_rows(&[[4.0, 3.0], [6.0, 3.0]]).unwrap();
//! let lu = LuDecomposition::decompose(ArrayContext::global().kernel(), &a).unwrap();
//! assert!((lu.determinant().unwrap() + 6.0).abs() < 1e-12);
//! ```

pub mod array;
pub mod backend;
pub mod device;
pub mod dtype;
pub mod error;
pub mod kernel;
pub mod layout;
pub mod linalg;
pub mod random;


// Re-export key types at crate root for convenience.
pub use array::{NdArray, SliceRange};
pub use backend::{ArrayContext, Backend, BackendConfig, BackendRegistry};
pub use dtype::{Element, ElementKind, Float, Scalar};
pub use error::{CoreError, Result};
pub use kernel::{NumericKernel, ReferenceKernel};
pub use layout::{Layout, Order, DEFAULT_ORDER};

/// Items intended for glob-import: `use tessera_core::prelude::*;`
pub mod prelude {
    pub use crate::array::{NdArray, SliceRange};
    pub use crate::backend::{ArrayContext, BackendConfig};
    pub use crate::device::{DeviceContext, MixedOperandPolicy};
    pub use crate::dtype::{Element, ElementKind, Float, Scalar};
    pub use crate::error::{CoreError, Result};
    pub use crate::kernel::{EigenJob, EigenRange, NumericKernel, SvdJob, Transpose, Triangle};
    pub use crate::layout::Order;
    pub use crate::linalg::{
        LinearAlgebraRoutines, LuDecomposition, QrDecomposition, SvdDecomposition, SymmetricEigen,
    };
}
