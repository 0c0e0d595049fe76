//! Numerical settings shared by all filters.

use crate::error::FilterError;

/// What to do with an observation whose prediction error variance is not
/// above the zero tolerance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SingularityPolicy {
    /// Drop the observation and continue (time update only).
    #[default]
    Exclude,
    /// Abort the run with [`FilterError::SingularVariance`].
    Fail,
}

/// Tolerances and policies of a filter run.
///
/// # Example
///
/// ```
/// use ssf_filters::{FilterSettings, SingularityPolicy};
///
/// let settings = FilterSettings::new()
///     .with_zero_tolerance(1e-10)
///     .with_singularity_policy(SingularityPolicy::Fail);
///
/// assert!(settings.validate().is_ok());
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterSettings {
    zero_tolerance: f64,
    diffuse_tolerance: f64,
    collapse_tolerance: f64,
    steady_state_epsilon: f64,
    singularity_policy: SingularityPolicy,
}

impl FilterSettings {
    /// Default settings.
    ///
    /// Defaults: `zero_tolerance = 1e-12`, `diffuse_tolerance = 1e-9`,
    /// `collapse_tolerance = 1e-9`, `steady_state_epsilon = 1e-10`,
    /// `singularity_policy = Exclude`.
    pub fn new() -> Self {
        Self {
            zero_tolerance: 1e-12,
            diffuse_tolerance: 1e-9,
            collapse_tolerance: 1e-9,
            steady_state_epsilon: 1e-10,
            singularity_policy: SingularityPolicy::Exclude,
        }
    }

    /// Sets the threshold below which a prediction error variance is
    /// singular.
    pub fn with_zero_tolerance(mut self, tol: f64) -> Self {
        self.zero_tolerance = tol;
        self
    }

    /// Sets the threshold above which `Z P∞ Zᵀ` makes a step diffuse.
    pub fn with_diffuse_tolerance(mut self, tol: f64) -> Self {
        self.diffuse_tolerance = tol;
        self
    }

    /// Sets the relative threshold on the diagonal of the augmented
    /// accumulator above which the diffuse part collapses.
    pub fn with_collapse_tolerance(mut self, tol: f64) -> Self {
        self.collapse_tolerance = tol;
        self
    }

    /// Sets the relative threshold on `Z L` below which the Chandrasekhar
    /// recursions stop.
    pub fn with_steady_state_epsilon(mut self, eps: f64) -> Self {
        self.steady_state_epsilon = eps;
        self
    }

    /// Sets the singularity policy.
    pub fn with_singularity_policy(mut self, policy: SingularityPolicy) -> Self {
        self.singularity_policy = policy;
        self
    }

    /// Returns the zero tolerance.
    pub fn zero_tolerance(&self) -> f64 {
        self.zero_tolerance
    }

    /// Returns the diffuse tolerance.
    pub fn diffuse_tolerance(&self) -> f64 {
        self.diffuse_tolerance
    }

    /// Returns the collapse tolerance.
    pub fn collapse_tolerance(&self) -> f64 {
        self.collapse_tolerance
    }

    /// Returns the steady-state epsilon.
    pub fn steady_state_epsilon(&self) -> f64 {
        self.steady_state_epsilon
    }

    /// Returns the singularity policy.
    pub fn singularity_policy(&self) -> SingularityPolicy {
        self.singularity_policy
    }

    /// Validates this configuration.
    ///
    /// Every tolerance must be finite and non-negative; the collapse
    /// tolerance must also be below 1.
    pub fn validate(&self) -> Result<(), FilterError> {
        let checks = [
            ("zero_tolerance", self.zero_tolerance),
            ("diffuse_tolerance", self.diffuse_tolerance),
            ("collapse_tolerance", self.collapse_tolerance),
            ("steady_state_epsilon", self.steady_state_epsilon),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(FilterError::InvalidSetting { name, value });
            }
        }
        if self.collapse_tolerance >= 1.0 {
            return Err(FilterError::InvalidSetting {
                name: "collapse_tolerance",
                value: self.collapse_tolerance,
            });
        }
        Ok(())
    }
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self::new()
    }
}
