//! Backend-provided element factories and element-wise routines.
//!
//! Both traits are object safe so a [`Backend`](super::Backend) can hand
//! them out as `&dyn` references. Every method of [`ElementwiseRoutines`]
//! has a portable default built on [`NdArray`] views; a backend only
//! overrides what it can do faster.

use core::fmt;

use crate::array::NdArray;
use crate::dtype::ElementKind;
use crate::error::{CoreError, Result};
use crate::layout::{Order, DEFAULT_ORDER};

// ======================================================================
// Element factory
// ======================================================================

/// What a backend can allocate.
pub trait ElementFactory: Send + Sync + fmt::Debug {
    /// Whether arrays of `kind` can be created on this backend.
    fn supports(&self, kind: ElementKind) -> bool;

    /// Memory order of freshly allocated arrays.
    fn default_order(&self) -> Order {
        DEFAULT_ORDER
    }
}

/// Host-memory factory supporting every element kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostFactory;

impl ElementFactory for HostFactory {
    fn supports(&self, _kind: ElementKind) -> bool {
        true
    }
}

// ======================================================================
// Element-wise routines
// ======================================================================

/// Unary functions applied element by element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Abs,
    Sqrt,
    Exp,
    Log,
    Sin,
    Cos,
    Tan,
    Sinh,
    Cosh,
    Tanh,
    Floor,
    Ceil,
    Round,
    Signum,
}

impl UnaryOp {
    /// Evaluate on one value.
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Abs => x.abs(),
            Self::Sqrt => x.sqrt(),
            Self::Exp => x.exp(),
            Self::Log => x.ln(),
            Self::Sin => x.sin(),
            Self::Cos => x.cos(),
            Self::Tan => x.tan(),
            Self::Sinh => x.sinh(),
            Self::Cosh => x.cosh(),
            Self::Tanh => x.tanh(),
            Self::Floor => x.floor(),
            Self::Ceil => x.ceil(),
            Self::Round => x.round(),
            Self::Signum => {
                if x == 0.0 {
                    0.0
                } else {
                    x.signum()
                }
            }
        }
    }
}

/// Reductions, BLAS level-1 operations and element-wise math on `f64`
/// arrays.
///
/// Operands may be arbitrary views; element order is always the logical
/// row-major order. `*_dim` variants fold each vector along `dim` (see
/// [`NdArray::reduce_vectors`]).
pub trait ElementwiseRoutines: Send + Sync + fmt::Debug {
    fn sum(&self, x: &NdArray<f64>) -> f64 {
        x.sum()
    }

    fn sum_dim(&self, dim: usize, x: &NdArray<f64>) -> Result<NdArray<f64>> {
        x.reduce_vectors(dim, |v| self.sum(v))
    }

    fn prod(&self, x: &NdArray<f64>) -> f64 {
        x.product()
    }

    fn prod_dim(&self, dim: usize, x: &NdArray<f64>) -> Result<NdArray<f64>> {
        x.reduce_vectors(dim, |v| self.prod(v))
    }

    /// `None` for an empty array.
    fn mean(&self, x: &NdArray<f64>) -> Option<f64> {
        x.mean()
    }

    fn mean_dim(&self, dim: usize, x: &NdArray<f64>) -> Result<NdArray<f64>> {
        x.reduce_vectors(dim, |v| self.mean(v).unwrap_or(f64::NAN))
    }

    /// Sample variance (`n - 1` denominator). `None` for fewer than two
    /// elements.
    fn var(&self, x: &NdArray<f64>) -> Option<f64> {
        x.var()
    }

    fn var_dim(&self, dim: usize, x: &NdArray<f64>) -> Result<NdArray<f64>> {
        x.reduce_vectors(dim, |v| self.var(v).unwrap_or(f64::NAN))
    }

    fn std(&self, x: &NdArray<f64>) -> Option<f64> {
        self.var(x).map(f64::sqrt)
    }

    fn std_dim(&self, dim: usize, x: &NdArray<f64>) -> Result<NdArray<f64>> {
        x.reduce_vectors(dim, |v| self.std(v).unwrap_or(f64::NAN))
    }

    fn min(&self, x: &NdArray<f64>) -> Option<f64> {
        x.iter().reduce(f64::min)
    }

    fn min_dim(&self, dim: usize, x: &NdArray<f64>) -> Result<NdArray<f64>> {
        x.reduce_vectors(dim, |v| self.min(v).unwrap_or(f64::NAN))
    }

    fn max(&self, x: &NdArray<f64>) -> Option<f64> {
        x.iter().reduce(f64::max)
    }

    fn max_dim(&self, dim: usize, x: &NdArray<f64>) -> Result<NdArray<f64>> {
        x.reduce_vectors(dim, |v| self.max(v).unwrap_or(f64::NAN))
    }

    /// Running sum in logical order; same shape as `x`.
    fn cumsum(&self, x: &NdArray<f64>) -> NdArray<f64> {
        x.cumsum()
    }

    /// Running sum along each vector of `dim`.
    fn cumsum_dim(&self, dim: usize, x: &NdArray<f64>) -> Result<NdArray<f64>> {
        x.cumsum_axis(dim)
    }

    /// Inner product of two equally sized arrays.
    fn dot(&self, a: &NdArray<f64>, b: &NdArray<f64>) -> Result<f64> {
        check_size(a, b)?;
        Ok(a.iter().zip(b.iter()).map(|(x, y)| x * y).sum())
    }

    /// Euclidean norm, accumulated with `hypot` to avoid overflow.
    fn norm2(&self, x: &NdArray<f64>) -> f64 {
        x.iter().fold(0.0_f64, f64::hypot)
    }

    fn asum(&self, x: &NdArray<f64>) -> f64 {
        x.iter().map(f64::abs).sum()
    }

    /// Position (logical order) of the first largest `|x|`; `None` when
    /// empty.
    fn iamax(&self, x: &NdArray<f64>) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, v) in x.iter().enumerate() {
            let a = v.abs();
            if best.map_or(true, |(_, m)| a > m) {
                best = Some((i, a));
            }
        }
        best.map(|(i, _)| i)
    }

    /// `x *= alpha`, in place.
    fn scal(&self, alpha: f64, x: &NdArray<f64>) {
        x.apply(|v| v * alpha);
    }

    /// `y += alpha * x`, in place.
    fn axpy(&self, alpha: f64, x: &NdArray<f64>, y: &NdArray<f64>) -> Result<()> {
        check_size(x, y)?;
        if alpha == 0.0 {
            return Ok(());
        }
        let xs = x.to_vec();
        let mut i = 0;
        y.apply(|v| {
            let out = v + alpha * xs[i];
            i += 1;
            out
        });
        Ok(())
    }

    /// Sum of the main diagonal of a matrix (rectangular allowed).
    fn trace(&self, x: &NdArray<f64>) -> Result<f64> {
        x.trace()
    }

    /// Outer product of the flattened operands, `x.size() x y.size()`.
    fn outer(&self, x: &NdArray<f64>, y: &NdArray<f64>) -> NdArray<f64> {
        x.outer(y)
    }

    /// Rank-one update `A += alpha * x * yᵗ`, in place.
    fn ger(&self, alpha: f64, x: &NdArray<f64>, y: &NdArray<f64>, a: &NdArray<f64>) -> Result<()> {
        if x.ndim() != 1 || y.ndim() != 1 || a.shape() != [x.size(), y.size()] {
            return Err(CoreError::ShapeMismatch {
                expected: vec![x.size(), y.size()],
                got: a.shape().to_vec(),
            });
        }
        let ys = y.to_vec();
        for (i, xi) in x.iter().enumerate() {
            let row = a.row(i)?;
            let mut j = 0;
            row.apply(|v| {
                let out = v + alpha * xi * ys[j];
                j += 1;
                out
            });
        }
        Ok(())
    }

    /// Fresh array with `op` applied to every element.
    fn unary(&self, op: UnaryOp, x: &NdArray<f64>) -> NdArray<f64> {
        x.map(|v| op.apply(v))
    }
}

fn check_size(a: &NdArray<f64>, b: &NdArray<f64>) -> Result<()> {
    if a.size() != b.size() {
        return Err(CoreError::ShapeMismatch {
            expected: a.shape().to_vec(),
            got: b.shape().to_vec(),
        });
    }
    Ok(())
}

/// The portable default routines.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostRoutines;

impl ElementwiseRoutines for HostRoutines {}
