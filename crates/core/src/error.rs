//! Error types for the ssf-core crate.

use ssf_linalg::LinalgError;

/// Error type for model construction and state container validation.
///
/// All variants describe structural problems: the model is malformed and no
/// filter run over it can succeed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// Returned when the state dimension is zero.
    #[error("state dimension must be at least 1")]
    EmptyState,

    /// Returned when two components disagree on a dimension.
    #[error("dimension mismatch in {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Component whose dimension is wrong.
        what: &'static str,
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        got: usize,
    },

    /// Returned when a variance is negative or non-finite.
    #[error("invalid variance {value} in {what}")]
    InvalidVariance {
        /// Component holding the variance.
        what: &'static str,
        /// The offending value.
        value: f64,
    },

    /// Returned when a time-varying component holds no periods.
    #[error("time-varying {what} has no periods")]
    EmptyHorizon {
        /// Component that is empty.
        what: &'static str,
    },

    /// Returned when a component is not defined up to the requested position.
    #[error("{what} is defined for {horizon} periods, but position {pos} was requested")]
    HorizonExceeded {
        /// Component that is too short.
        what: &'static str,
        /// Number of periods the component covers.
        horizon: usize,
        /// Requested (exclusive) end position.
        pos: usize,
    },

    /// Returned when the stationary covariance cannot be computed because the
    /// dynamics have a root on or outside the unit circle.
    #[error("dynamics are not stationary")]
    NonStationary,

    /// Returned by the diffuse state containers when the diffuse dimension
    /// would grow.
    #[error("diffuse dimension can only decrease (from {from} to {to})")]
    DiffuseGrowth {
        /// Current diffuse dimension.
        from: usize,
        /// Requested diffuse dimension.
        to: usize,
    },

    /// Wraps a linear algebra failure (for example a covariance matrix that
    /// is not positive semidefinite).
    #[error(transparent)]
    Linalg(#[from] LinalgError),
}
