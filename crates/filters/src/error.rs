//! Error types for the ssf-filters crate.

use ssf_core::ModelError;
use ssf_likelihood::LikelihoodError;
use ssf_linalg::LinalgError;

/// Coarse classification of a failed run.
///
/// A numerical failure means "this parameter point is infeasible" and a
/// caller searching over parameters should move on; a structural failure
/// means the model or the call is malformed and no parameter point will
/// succeed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Singular variances, unresolved diffuse parts, degenerate likelihoods.
    Numerical,
    /// Dimension mismatches, invalid settings, inapplicable algorithms.
    Structural,
}

/// Error type for all fallible operations in the ssf-filters crate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    /// Returned when the model is malformed or too short for the data.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Returned when the accumulated statistics do not define a likelihood.
    #[error(transparent)]
    Likelihood(#[from] LikelihoodError),

    /// Returned when a factorisation fails during the run.
    #[error(transparent)]
    Linalg(#[from] LinalgError),

    /// Returned when the data do not identify every diffuse direction.
    #[error("diffuse part not resolved: {remaining} diffuse directions left at the end of the data")]
    DiffuseNotResolved {
        /// Unresolved diffuse directions.
        remaining: usize,
    },

    /// Returned when a prediction error variance is not positive and the
    /// singularity policy is [`SingularityPolicy::Fail`](crate::SingularityPolicy::Fail).
    #[error("singular prediction error variance {variance} at position {pos}")]
    SingularVariance {
        /// Model position.
        pos: usize,
        /// The offending variance.
        variance: f64,
    },

    /// Returned when the Chandrasekhar recursions are requested for a
    /// time-varying model.
    #[error("fast filter requires a time-invariant model")]
    NotTimeInvariant,

    /// Returned when a step is requested before `initialize`.
    #[error("filter stepped before initialisation")]
    NotInitialized,

    /// Returned when the Chandrasekhar recursions meet a missing value after
    /// the warm-up planned for the data.
    #[error("missing observation at position {pos} after the Chandrasekhar warm-up")]
    MissingAfterWarmUp {
        /// Model position.
        pos: usize,
    },

    /// Returned when a setting is out of range.
    #[error("invalid filter setting {name}: {value}")]
    InvalidSetting {
        /// Name of the setting.
        name: &'static str,
        /// The offending value.
        value: f64,
    },
}

impl FilterError {
    /// Whether the failure is numerical or structural.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Model(_)
            | Self::NotTimeInvariant
            | Self::NotInitialized
            | Self::MissingAfterWarmUp { .. }
            | Self::InvalidSetting { .. } => FailureKind::Structural,
            Self::Likelihood(LikelihoodError::DiffuseCorrectionWithoutDiffuse { .. })
            | Self::Likelihood(LikelihoodError::LegacyMismatch) => FailureKind::Structural,
            Self::Likelihood(_)
            | Self::Linalg(_)
            | Self::DiffuseNotResolved { .. }
            | Self::SingularVariance { .. } => FailureKind::Numerical,
        }
    }
}
