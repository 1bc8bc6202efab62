//! Element kinds and the numeric trait hierarchy.
//!
//! Every array stores elements of exactly one [`ElementKind`]:
//! ```text
//! Element            (Double, Int, Long, Boolean, Complex, Generic)
//!   └── Scalar       (f64, i32, i64, Complex64): ring arithmetic
//!         └── Float  (f64): ordered reals
//! ```
//!
//! Views, copies and assignment only need [`Element`]. Arithmetic needs
//! [`Scalar`], and the decomposition layer works on [`Float`] data.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use num_complex::Complex64;

/// The closed set of storage kinds an array buffer can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Double,
    Int,
    Long,
    Boolean,
    Complex,
    /// Any other cloneable value, stored boxed-free in the buffer.
    Generic,
}

impl ElementKind {
    /// Whether values of this kind support arithmetic.
    pub fn is_numeric(self) -> bool {
        !matches!(self, Self::Boolean | Self::Generic)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Double => "double",
            Self::Int => "int",
            Self::Long => "long",
            Self::Boolean => "boolean",
            Self::Complex => "complex",
            Self::Generic => "generic",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Element: anything storable in an array buffer
// ---------------------------------------------------------------------------

/// Base trait for every type storable in an [`NdArray`](crate::array::NdArray).
pub trait Element: Clone + Default + fmt::Debug + 'static {
    /// The storage kind this type maps to.
    const KIND: ElementKind;
}

/// Register a user type as a [`ElementKind::Generic`] element.
///
/// ```
/// # use tessera_core::impl_generic_element;
/// #[derive(Clone, Default, Debug)]
/// struct Label(&'static str);
/// impl_generic_element!(Label);
/// ```
#[macro_export]
macro_rules! impl_generic_element {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::dtype::Element for $ty {
                const KIND: $crate::dtype::ElementKind = $crate::dtype::ElementKind::Generic;
            }
        )+
    };
}

impl Element for f64 {
    const KIND: ElementKind = ElementKind::Double;
}
impl Element for f32 {
    const KIND: ElementKind = ElementKind::Double;
}
impl Element for i32 {
    const KIND: ElementKind = ElementKind::Int;
}
impl Element for i64 {
    const KIND: ElementKind = ElementKind::Long;
}
impl Element for bool {
    const KIND: ElementKind = ElementKind::Boolean;
}
impl Element for Complex64 {
    const KIND: ElementKind = ElementKind::Complex;
}

impl_generic_element!(String);

// ---------------------------------------------------------------------------
// Scalar: element types with ring arithmetic
// ---------------------------------------------------------------------------

/// Numeric element types.
///
/// Ordering is intentionally not required so that complex arrays support the
/// same arithmetic as real ones.
pub trait Scalar:
    Element
    + Copy
    + fmt::Display
    + PartialEq
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
    + DivAssign
    + Sum
{
    /// The additive identity (`0`).
    fn zero() -> Self;

    /// The multiplicative identity (`1`).
    fn one() -> Self;

    /// Convert from `usize` (used for ranges and means).
    fn from_usize(v: usize) -> Self;
}

// ---------------------------------------------------------------------------
// Float: ordered real numbers used by the decomposition layer
// ---------------------------------------------------------------------------

/// Real floating-point element types.
pub trait Float: Scalar + PartialOrd + Neg<Output = Self> {
    /// Machine epsilon.
    fn epsilon() -> Self;

    fn abs(self) -> Self;
    fn sqrt(self) -> Self;
    fn hypot(self, other: Self) -> Self;
    fn is_finite(self) -> bool;
    fn min(self, other: Self) -> Self;
    fn max(self, other: Self) -> Self;

    /// Convert from an `f64` literal (used for constants).
    fn from_f64(v: f64) -> Self;

    /// Widen to `f64` for the numeric kernel.
    fn to_f64(self) -> f64;
}

macro_rules! impl_scalar_int {
    ($ty:ty) => {
        impl Scalar for $ty {
            #[inline]
            fn zero() -> Self {
                0
            }
            #[inline]
            fn one() -> Self {
                1
            }
            #[inline]
            #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
            fn from_usize(v: usize) -> Self {
                v as Self
            }
        }
    };
}

impl_scalar_int!(i32);
impl_scalar_int!(i64);

impl Scalar for f64 {
    #[inline]
    fn zero() -> Self {
        0.0
    }
    #[inline]
    fn one() -> Self {
        1.0
    }
    #[inline]
    #[allow(clippy::cast_precision_loss)]
    fn from_usize(v: usize) -> Self {
        v as Self
    }
}

impl Float for f64 {
    #[inline]
    fn epsilon() -> Self {
        f64::EPSILON
    }
    #[inline]
    fn abs(self) -> Self {
        f64::abs(self)
    }
    #[inline]
    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }
    #[inline]
    fn hypot(self, other: Self) -> Self {
        f64::hypot(self, other)
    }
    #[inline]
    fn is_finite(self) -> bool {
        f64::is_finite(self)
    }
    #[inline]
    fn min(self, other: Self) -> Self {
        f64::min(self, other)
    }
    #[inline]
    fn max(self, other: Self) -> Self {
        f64::max(self, other)
    }
    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }
    #[inline]
    fn to_f64(self) -> f64 {
        self
    }
}

impl Scalar for Complex64 {
    #[inline]
    fn zero() -> Self {
        Complex64::new(0.0, 0.0)
    }
    #[inline]
    fn one() -> Self {
        Complex64::new(1.0, 0.0)
    }
    #[inline]
    #[allow(clippy::cast_precision_loss)]
    fn from_usize(v: usize) -> Self {
        Complex64::new(v as f64, 0.0)
    }
}
