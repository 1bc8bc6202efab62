//! # Tessera
//!
//! Dense numerical arrays for Rust: strided N-dimensional arrays with
//! zero-copy views, plus LU, QR, SVD and symmetric eigen decompositions.
//!
//! One `use tessera::prelude::*;` brings in the array type, the backend
//! context and the decompositions.
//!
//! ## Feature Flags
//!
//! | Feature | Enables |
//! |---------|---------|
//! | `core` *(default)* | Arrays, views, backends, linear algebra |
//!
//! ```
//! use tessera::prelude::*;
//!
//! let a = NdArray::from_rows(&[[2.0, 0.0], [0.0, 3.0]]).unwrap();
//! let inv = a.inv().unwrap();
//! assert!((inv.get(&[1, 1]).unwrap() - 1.0 / 3.0).abs() < 1e-15);
//! ```

pub use tessera_core as core;

/// Glob-import convenience: `use tessera::prelude::*;`
pub mod prelude {
    pub use tessera_core::prelude::*;
}
