//! The filter capability and the closed set of algorithms implementing it.

use ssf_core::{FilteringResults, Ssf, SsfData, State};

use crate::augmented::AugmentedFilter;
use crate::ckms::CkmsFilter;
use crate::diffuse::DiffuseFilter;
use crate::error::FilterError;
use crate::settings::FilterSettings;
use crate::sqrt::SqrtDiffuseFilter;

/// One pass of a Kalman-type recursion over a sequence of observations.
///
/// A run is `initialize`, one `step` per position in time order, then
/// `finalize`. All working storage belongs to the filter value and is
/// rebuilt by `initialize`, so a filter can be reused for several runs but
/// not shared between concurrent ones.
pub trait Filter {
    /// Allocates the working storage for a run over `data`.
    ///
    /// # Errors
    ///
    /// Structural errors (invalid settings, inapplicable model).
    fn initialize(&mut self, ssf: &Ssf, data: &SsfData<'_>) -> Result<(), FilterError>;

    /// Processes the observation at model position `pos` (`None` = missing)
    /// and propagates the state to `pos + 1`.
    ///
    /// # Errors
    ///
    /// Numerical errors of the step, or [`FilterError::NotInitialized`].
    fn step(
        &mut self,
        ssf: &Ssf,
        pos: usize,
        y: Option<f64>,
        sink: &mut dyn FilteringResults,
    ) -> Result<(), FilterError>;

    /// Ends the run at the exclusive position `end`.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::DiffuseNotResolved`] when diffuse directions
    /// are left.
    fn finalize(&mut self, ssf: &Ssf, end: usize, sink: &mut dyn FilteringResults) -> Result<(), FilterError>;

    /// One-step-ahead state after the last processed position, when the
    /// algorithm carries a covariance.
    fn final_state(&self) -> Option<State>;

    /// Runs the filter over `data`, reporting to `sink`.
    ///
    /// # Errors
    ///
    /// | Variant | Trigger |
    /// |---------|---------|
    /// | [`FilterError::Model`] | a time-varying component does not cover the data |
    /// | other | see [`Filter::initialize`], [`Filter::step`], [`Filter::finalize`] |
    fn process(&mut self, ssf: &Ssf, data: &SsfData<'_>, sink: &mut dyn FilteringResults) -> Result<(), FilterError> {
        ssf.check_horizon(data.end())?;
        self.initialize(ssf, data)?;
        for i in 0..data.len() {
            self.step(ssf, data.position(i), data.get(i), sink)?;
        }
        self.finalize(ssf, data.end(), sink)
    }
}

/// The available algorithms, selected at construction time.
#[derive(Clone, Debug)]
pub enum FilterStrategy {
    /// Exact diffuse filter in covariance form.
    Diffuse(DiffuseFilter),
    /// Exact diffuse filter in square-root form.
    SquareRoot(SqrtDiffuseFilter),
    /// Augmented filter with collapsing.
    Augmented(AugmentedFilter),
    /// Chandrasekhar recursions (time-invariant models).
    Chandrasekhar(CkmsFilter),
}

impl FilterStrategy {
    /// Covariance-form diffuse filter.
    pub fn diffuse(settings: FilterSettings) -> Self {
        Self::Diffuse(DiffuseFilter::new(settings))
    }

    /// Square-root diffuse filter.
    pub fn square_root(settings: FilterSettings) -> Self {
        Self::SquareRoot(SqrtDiffuseFilter::new(settings))
    }

    /// Collapsing augmented filter.
    pub fn augmented(settings: FilterSettings) -> Self {
        Self::Augmented(AugmentedFilter::new(settings))
    }

    /// Chandrasekhar filter.
    pub fn chandrasekhar(settings: FilterSettings) -> Self {
        Self::Chandrasekhar(CkmsFilter::new(settings))
    }

    /// Short name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Diffuse(_) => "diffuse",
            Self::SquareRoot(_) => "square_root",
            Self::Augmented(_) => "augmented",
            Self::Chandrasekhar(_) => "chandrasekhar",
        }
    }

    fn inner(&mut self) -> &mut dyn Filter {
        match self {
            Self::Diffuse(f) => f,
            Self::SquareRoot(f) => f,
            Self::Augmented(f) => f,
            Self::Chandrasekhar(f) => f,
        }
    }
}

impl Filter for FilterStrategy {
    fn initialize(&mut self, ssf: &Ssf, data: &SsfData<'_>) -> Result<(), FilterError> {
        self.inner().initialize(ssf, data)
    }

    fn step(
        &mut self,
        ssf: &Ssf,
        pos: usize,
        y: Option<f64>,
        sink: &mut dyn FilteringResults,
    ) -> Result<(), FilterError> {
        self.inner().step(ssf, pos, y, sink)
    }

    fn finalize(&mut self, ssf: &Ssf, end: usize, sink: &mut dyn FilteringResults) -> Result<(), FilterError> {
        self.inner().finalize(ssf, end, sink)
    }

    fn final_state(&self) -> Option<State> {
        match self {
            Self::Diffuse(f) => f.final_state(),
            Self::SquareRoot(f) => f.final_state(),
            Self::Augmented(f) => f.final_state(),
            Self::Chandrasekhar(f) => f.final_state(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssf_core::models::local_level;
    use ssf_likelihood::PredictionErrorDecomposition;

    #[test]
    fn names() {
        let s = FilterSettings::new();
        assert_eq!(FilterStrategy::diffuse(s).name(), "diffuse");
        assert_eq!(FilterStrategy::square_root(s).name(), "square_root");
        assert_eq!(FilterStrategy::augmented(s).name(), "augmented");
        assert_eq!(FilterStrategy::chandrasekhar(s).name(), "chandrasekhar");
    }

    #[test]
    fn strategy_dispatches_to_inner_filter() {
        let ssf = local_level(1.0, 1.0).unwrap();
        let y = [1.0, 2.0, 3.0];
        let mut filter = FilterStrategy::diffuse(FilterSettings::new());
        let mut ped = PredictionErrorDecomposition::new();
        filter.process(&ssf, &SsfData::new(&y), &mut ped).unwrap();
        assert_eq!(ped.n(), 3);
        assert_eq!(ped.d(), 1);
        assert!(filter.final_state().is_some());
    }

    #[test]
    fn step_before_initialize_fails() {
        let ssf = local_level(1.0, 1.0).unwrap();
        let mut filter = FilterStrategy::augmented(FilterSettings::new());
        let err = filter.step(&ssf, 0, Some(1.0), &mut ()).unwrap_err();
        assert_eq!(err, FilterError::NotInitialized);
    }

    #[test]
    fn horizon_is_checked_before_running() {
        use ndarray::array;
        use ssf_core::{ConstantLoading, Initialization, VaryingDynamics};
        let ssf = Ssf::new(
            VaryingDynamics::new(vec![array![[1.0]]; 2], vec![array![[1.0]]; 2]).unwrap(),
            ConstantLoading::new(array![1.0]).unwrap(),
            Initialization::fully_diffuse(1),
        )
        .unwrap();
        let y = [1.0, 2.0, 3.0];
        let err = FilterStrategy::diffuse(FilterSettings::new())
            .process(&ssf, &SsfData::new(&y), &mut ())
            .unwrap_err();
        assert!(matches!(err, FilterError::Model(_)));
    }
}
