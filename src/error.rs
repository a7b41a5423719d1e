//! Error types for cootensor

use crate::dtype::DType;
use thiserror::Error;

/// Result type alias using cootensor's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sparse and dense tensor operations
///
/// Every failure is reported synchronously to the immediate caller. Operations
/// are deterministic functions of their inputs, so none of these are retryable
/// without the caller first changing the input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Operand shapes or sparse/dense dimension splits disagree
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape
        expected: Vec<usize>,
        /// Actual shape
        got: Vec<usize>,
    },

    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// A stored coordinate exceeds the extent it indexes into
    #[error("Index {index} out of bounds for dimension of size {size}")]
    IndexOutOfBounds {
        /// The invalid index
        index: i64,
        /// Size of the dimension
        size: usize,
    },

    /// Operation invoked on an operand kind it is not defined for
    #[error("Unsupported operation '{op}': {reason}")]
    UnsupportedOperation {
        /// The operation name
        op: &'static str,
        /// Why the operand was rejected
        reason: String,
    },

    /// Unsupported dtype for an operation
    #[error("Unsupported dtype {dtype:?} for operation '{op}'")]
    UnsupportedDType {
        /// The unsupported dtype
        dtype: DType,
        /// The operation name
        op: &'static str,
    },

    /// DType mismatch between operands
    #[error("DType mismatch: {lhs:?} vs {rhs:?}")]
    DTypeMismatch {
        /// Left-hand side dtype
        lhs: DType,
        /// Right-hand side dtype
        rhs: DType,
    },

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a shape mismatch error
    pub fn shape_mismatch(expected: &[usize], got: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }

    /// Create an unsupported dtype error
    pub fn unsupported_dtype(dtype: DType, op: &'static str) -> Self {
        Self::UnsupportedDType { dtype, op }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }

    /// Create an unsupported operation error
    pub fn unsupported_operation(op: &'static str, reason: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            op,
            reason: reason.into(),
        }
    }

    /// Fail with a dtype mismatch unless both sides agree
    pub(crate) fn check_dtype(lhs: DType, rhs: DType) -> Result<()> {
        if lhs != rhs {
            return Err(Self::DTypeMismatch { lhs, rhs });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_message() {
        let err = Error::shape_mismatch(&[2, 3], &[3, 2]);
        assert_eq!(
            err.to_string(),
            "Shape mismatch: expected [2, 3], got [3, 2]"
        );
    }

    #[test]
    fn test_index_out_of_bounds_message() {
        let err = Error::IndexOutOfBounds { index: 7, size: 4 };
        assert_eq!(
            err.to_string(),
            "Index 7 out of bounds for dimension of size 4"
        );
    }

    #[test]
    fn test_check_dtype() {
        assert!(Error::check_dtype(DType::F32, DType::F32).is_ok());
        assert_eq!(
            Error::check_dtype(DType::F32, DType::F64),
            Err(Error::DTypeMismatch {
                lhs: DType::F32,
                rhs: DType::F64
            })
        );
    }
}
