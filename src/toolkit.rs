//! Likelihood evaluation with a filter chosen from a small set of options.

use ssf_core::{Ssf, SsfData};
use ssf_filters::{Filter, FilterError, FilterSettings, FilterStrategy, SingularityPolicy};
use ssf_likelihood::{DiffuseLikelihood, MarginalLikelihood, PredictionErrorDecomposition};
use tracing::{debug, warn};

/// Options of [`likelihood_computer`].
///
/// Filter selection, first match wins:
///
/// | Option | Filter |
/// |--------|--------|
/// | `fast` and a time-invariant model | Chandrasekhar recursions |
/// | `collapse_diffuse` | augmented filter with collapsing |
/// | `square_root_form` | square-root diffuse filter |
/// | none | covariance-form diffuse filter |
///
/// # Example
///
/// ```
/// use ssf::LikelihoodOptions;
///
/// let options = LikelihoodOptions::new()
///     .with_collapse_diffuse(true)
///     .with_robust_standard_errors(true);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LikelihoodOptions {
    square_root_form: bool,
    collapse_diffuse: bool,
    robust_standard_errors: bool,
    fast: bool,
    legacy: bool,
    settings: FilterSettings,
}

impl LikelihoodOptions {
    /// Covariance-form diffuse filter with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the square-root diffuse filter.
    pub fn with_square_root_form(mut self, on: bool) -> Self {
        self.square_root_form = on;
        self
    }

    /// Uses the augmented filter with collapsing.
    pub fn with_collapse_diffuse(mut self, on: bool) -> Self {
        self.collapse_diffuse = on;
        self
    }

    /// Keeps the standardized residuals in the returned likelihood.
    pub fn with_robust_standard_errors(mut self, on: bool) -> Self {
        self.robust_standard_errors = on;
        self
    }

    /// Uses the Chandrasekhar recursions when the model is time-invariant.
    pub fn with_fast(mut self, on: bool) -> Self {
        self.fast = on;
        self
    }

    /// Counts the diffuse elements in the degrees of freedom (`m = n`).
    pub fn with_legacy(mut self, on: bool) -> Self {
        self.legacy = on;
        self
    }

    /// Replaces the filter settings.
    pub fn with_settings(mut self, settings: FilterSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Shorthand for changing only the singularity policy.
    pub fn with_singularity_policy(mut self, policy: SingularityPolicy) -> Self {
        self.settings = self.settings.with_singularity_policy(policy);
        self
    }

    /// Whether the square-root diffuse filter is requested.
    pub fn square_root_form(&self) -> bool {
        self.square_root_form
    }

    /// Whether the augmented filter with collapsing is requested.
    pub fn collapse_diffuse(&self) -> bool {
        self.collapse_diffuse
    }

    /// Whether standardized residuals are kept.
    pub fn robust_standard_errors(&self) -> bool {
        self.robust_standard_errors
    }

    /// Whether the Chandrasekhar recursions are requested.
    pub fn fast(&self) -> bool {
        self.fast
    }

    /// Whether diffuse elements count in the degrees of freedom.
    pub fn legacy(&self) -> bool {
        self.legacy
    }

    /// Filter settings.
    pub fn settings(&self) -> &FilterSettings {
        &self.settings
    }

    /// Validates the filter settings.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidSetting`] for an out-of-range tolerance.
    pub fn validate(&self) -> Result<(), FilterError> {
        self.settings.validate()
    }

    /// The filter these options select for `ssf`.
    pub fn strategy_for(&self, ssf: &Ssf) -> FilterStrategy {
        let s = self.settings;
        if self.fast {
            if ssf.is_time_invariant() {
                return FilterStrategy::chandrasekhar(s);
            }
            warn!("fast filter requested for a time-varying model, using a diffuse filter instead");
        }
        if self.collapse_diffuse {
            FilterStrategy::augmented(s)
        } else if self.square_root_form {
            FilterStrategy::square_root(s)
        } else {
            FilterStrategy::diffuse(s)
        }
    }

    fn accumulator(&self) -> PredictionErrorDecomposition {
        PredictionErrorDecomposition::new()
            .with_residuals(self.robust_standard_errors)
            .with_legacy_dof(self.legacy)
    }
}

/// Runs the filter selected by `options` and returns the concentrated
/// diffuse likelihood.
///
/// # Errors
///
/// | Variant | Trigger |
/// |---------|---------|
/// | [`FilterError::InvalidSetting`] | `options` fail validation |
/// | [`FilterError::Likelihood`] | the accumulated statistics do not define a likelihood (e.g. `n <= d`) |
/// | other | any error of the selected filter |
#[tracing::instrument(skip_all, fields(n = data.len(), state_dim = ssf.state_dim(), d = ssf.diffuse_dim()))]
pub fn compute_likelihood(
    options: &LikelihoodOptions,
    ssf: &Ssf,
    data: &SsfData<'_>,
) -> Result<DiffuseLikelihood, FilterError> {
    options.validate()?;
    let mut filter = options.strategy_for(ssf);
    debug!(filter = filter.name(), "filtering");
    let mut ped = options.accumulator();
    filter.process(ssf, data, &mut ped)?;
    Ok(ped.into_likelihood()?)
}

/// Returns a reusable function `(model, data) -> likelihood` bound to
/// `options`.
///
/// # Example
///
/// ```
/// use ssf::{LikelihoodOptions, likelihood_computer};
/// use ssf_core::{SsfData, models::local_level};
///
/// let compute = likelihood_computer(LikelihoodOptions::new().with_square_root_form(true));
/// let ssf = local_level(0.0, 1.0).unwrap();
/// let ll = compute(&ssf, &SsfData::new(&[1.0, 2.0, 1.5, f64::NAN, 1.8])).unwrap();
/// assert_eq!((ll.n(), ll.d()), (4, 1));
/// ```
pub fn likelihood_computer(
    options: LikelihoodOptions,
) -> impl Fn(&Ssf, &SsfData<'_>) -> Result<DiffuseLikelihood, FilterError> {
    move |ssf: &Ssf, data: &SsfData<'_>| compute_likelihood(&options, ssf, data)
}

/// Like [`likelihood_computer`], adding the basis correction of the
/// model's diffuse initialisation.
pub fn marginal_likelihood_computer(
    options: LikelihoodOptions,
) -> impl Fn(&Ssf, &SsfData<'_>) -> Result<MarginalLikelihood, FilterError> {
    move |ssf: &Ssf, data: &SsfData<'_>| {
        let diffuse = compute_likelihood(&options, ssf, data)?;
        match ssf.initialization().basis() {
            Some(basis) => Ok(MarginalLikelihood::from_basis(diffuse, basis.view())?),
            None => Ok(MarginalLikelihood::new(diffuse, 0.0)),
        }
    }
}
