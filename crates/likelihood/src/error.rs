//! Error types for the ssf-likelihood crate.

/// Error type for the construction and combination of likelihoods.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LikelihoodError {
    /// Returned when a diffuse correction is supplied for a model without
    /// diffuse part.
    #[error("diffuse correction {dcorr} given with no diffuse elements")]
    DiffuseCorrectionWithoutDiffuse {
        /// The offending correction.
        dcorr: f64,
    },

    /// Returned when no observation is left once the diffuse elements are
    /// accounted for.
    #[error("no degrees of freedom: {n} observations, {d} diffuse elements")]
    NoDegreesOfFreedom {
        /// Number of observations.
        n: usize,
        /// Diffuse dimension.
        d: usize,
    },

    /// Returned when the sum of squared residuals cannot be concentrated out
    /// (zero, negative or non-finite).
    #[error("degenerate sum of squared residuals {ssq}")]
    DegenerateScale {
        /// The offending sum.
        ssq: f64,
    },

    /// Returned when a rescaling factor is not positive and finite.
    #[error("invalid rescaling factor {factor}")]
    InvalidScale {
        /// The offending factor.
        factor: f64,
    },

    /// Returned when likelihoods computed with different degree-of-freedom
    /// conventions are combined.
    #[error("cannot combine legacy and non-legacy likelihoods")]
    LegacyMismatch,

    /// Returned when a statistic handed to the likelihood is not finite.
    #[error("non-finite {what}: {value}")]
    NonFinite {
        /// Name of the statistic.
        what: &'static str,
        /// The offending value.
        value: f64,
    },
}
