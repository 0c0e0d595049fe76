//! Error types for the ssf-linalg crate.

/// Error type for the fallible kernels of the ssf-linalg crate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LinalgError {
    /// Returned when a square matrix was required.
    #[error("matrix is not square ({rows}x{cols})")]
    NotSquare {
        /// Number of rows.
        rows: usize,
        /// Number of columns.
        cols: usize,
    },

    /// Returned when operand dimensions do not conform.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        got: usize,
    },

    /// Returned when a pivot is zero (or numerically zero).
    #[error("matrix is singular at pivot {index}")]
    Singular {
        /// Index of the offending pivot.
        index: usize,
    },

    /// Returned when a matrix expected to be positive semidefinite has a
    /// significantly negative pivot.
    #[error("matrix is not positive semidefinite (pivot {index} = {pivot:e})")]
    NotPositiveSemidefinite {
        /// Index of the offending pivot.
        index: usize,
        /// Value of the pivot.
        pivot: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_not_square() {
        let err = LinalgError::NotSquare { rows: 2, cols: 3 };
        assert_eq!(err.to_string(), "matrix is not square (2x3)");
    }

    #[test]
    fn error_singular() {
        let err = LinalgError::Singular { index: 1 };
        assert_eq!(err.to_string(), "matrix is singular at pivot 1");
    }

    #[test]
    fn error_dimension_mismatch() {
        let err = LinalgError::DimensionMismatch {
            expected: 3,
            got: 2,
        };
        assert_eq!(err.to_string(), "dimension mismatch: expected 3, got 2");
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_impl<T: Send + Sync + std::error::Error>() {}
        assert_impl::<LinalgError>();
    }
}
