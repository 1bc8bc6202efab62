use thiserror::Error;

/// All errors returned by `tessera-core`.
///
/// Every failure is reported to the immediate caller; nothing is retried and
/// no failure is turned into a sentinel value such as NaN or zero.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Operand shapes are incompatible, including a non-square operand where
    /// a square one is required.
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    /// A multi-index or range lies outside the declared shape.
    #[error("index {index:?} out of bounds for shape {shape:?}")]
    IndexOutOfBounds {
        index: Vec<usize>,
        shape: Vec<usize>,
    },

    /// Reshape requested on a non-contiguous view without an explicit copy.
    #[error("cannot reshape view with shape {shape:?} and stride {stride:?} into {target:?} without copying")]
    IllegalReshape {
        shape: Vec<usize>,
        stride: Vec<usize>,
        target: Vec<usize>,
    },

    /// Inverse or solve attempted on an operand proven singular.
    #[error("singular matrix")]
    SingularMatrix,

    /// The numeric kernel returned a nonzero status.
    #[error("numeric kernel routine `{routine}` failed with status {code}")]
    NumericKernelFailure { routine: &'static str, code: i32 },

    /// The selected backend has no implementation for the requested routine
    /// or element kind.
    #[error("backend `{backend}` does not support {operation}")]
    UnsupportedBackendOperation { backend: String, operation: String },

    /// An axis index is out of bounds for the array's rank.
    #[error("axis {axis} out of bounds for array with {ndim} dimensions")]
    AxisOutOfBounds { axis: usize, ndim: usize },

    /// The operation is not defined for the given arguments.
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: &'static str },

    /// A device scope closed while buffers allocated inside it were still live.
    #[error("device scope closed with {outstanding} bytes still allocated")]
    DeviceResourceLeak { outstanding: usize },
}

impl CoreError {
    /// Shorthand for a kernel status failure.
    pub(crate) fn kernel(routine: &'static str, code: i32) -> Self {
        Self::NumericKernelFailure { routine, code }
    }

    /// Shorthand for an unsupported backend operation.
    pub(crate) fn unsupported(backend: &str, operation: impl Into<String>) -> Self {
        Self::UnsupportedBackendOperation {
            backend: backend.to_owned(),
            operation: operation.into(),
        }
    }
}

/// Convenience alias used throughout `tessera-core`.
pub type Result<T> = std::result::Result<T, CoreError>;
