//! The state-space form handed to every filter.

use std::sync::Arc;

use crate::dynamics::Dynamics;
use crate::error::ModelError;
use crate::initialization::Initialization;
use crate::loading::Loading;
use crate::measurement::MeasurementError;

/// A linear Gaussian state-space model with univariate observations.
///
/// Components are held behind `Arc`, so cloning an `Ssf` is cheap and the
/// same model can be filtered from several threads at once.
#[derive(Clone, Debug)]
pub struct Ssf {
    dynamics: Arc<dyn Dynamics>,
    loading: Arc<dyn Loading>,
    measurement: Option<Arc<dyn MeasurementError>>,
    initialization: Initialization,
}

impl Ssf {
    /// Assembles a model without measurement error.
    ///
    /// # Errors
    ///
    /// | Variant | Trigger |
    /// |---------|---------|
    /// | [`ModelError::EmptyState`] | the dynamics have no state |
    /// | [`ModelError::DimensionMismatch`] | loading or initialisation disagree with the dynamics on `state_dim` |
    pub fn new(
        dynamics: impl Dynamics + 'static,
        loading: impl Loading + 'static,
        initialization: Initialization,
    ) -> Result<Self, ModelError> {
        Self::from_parts(Arc::new(dynamics), Arc::new(loading), None, initialization)
    }

    /// Assembles a model from shared components.
    ///
    /// # Errors
    ///
    /// Same as [`Ssf::new`].
    pub fn from_parts(
        dynamics: Arc<dyn Dynamics>,
        loading: Arc<dyn Loading>,
        measurement: Option<Arc<dyn MeasurementError>>,
        initialization: Initialization,
    ) -> Result<Self, ModelError> {
        let dim = dynamics.state_dim();
        if dim == 0 {
            return Err(ModelError::EmptyState);
        }
        if loading.state_dim() != dim {
            return Err(ModelError::DimensionMismatch {
                what: "loading",
                expected: dim,
                got: loading.state_dim(),
            });
        }
        initialization.validate(dim)?;
        Ok(Self {
            dynamics,
            loading,
            measurement,
            initialization,
        })
    }

    /// Adds a measurement error.
    pub fn with_measurement_error(mut self, error: impl MeasurementError + 'static) -> Self {
        self.measurement = Some(Arc::new(error));
        self
    }

    /// Replaces the initialisation.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DimensionMismatch`] when the initialisation does
    /// not match the state dimension.
    pub fn with_initialization(mut self, initialization: Initialization) -> Result<Self, ModelError> {
        initialization.validate(self.state_dim())?;
        self.initialization = initialization;
        Ok(self)
    }

    /// Dimension of the state vector.
    pub fn state_dim(&self) -> usize {
        self.dynamics.state_dim()
    }

    /// Number of diffuse directions of the initial state.
    pub fn diffuse_dim(&self) -> usize {
        self.initialization.diffuse_dim()
    }

    /// Transition part.
    pub fn dynamics(&self) -> &dyn Dynamics {
        self.dynamics.as_ref()
    }

    /// Loading part.
    pub fn loading(&self) -> &dyn Loading {
        self.loading.as_ref()
    }

    /// Measurement error, if any.
    pub fn measurement(&self) -> Option<&dyn MeasurementError> {
        self.measurement.as_deref()
    }

    /// Initial conditions.
    pub fn initialization(&self) -> &Initialization {
        &self.initialization
    }

    /// `H(pos)`, zero when the model has no measurement error.
    pub fn error_variance(&self, pos: usize) -> f64 {
        self.measurement.as_ref().map_or(0.0, |m| m.variance(pos))
    }

    /// Whether every component is time invariant.
    pub fn is_time_invariant(&self) -> bool {
        self.dynamics.is_time_invariant()
            && self.loading.is_time_invariant()
            && self.measurement.as_ref().is_none_or(|m| m.is_time_invariant())
    }

    /// Checks that every time-varying component covers positions `[0, end)`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::HorizonExceeded`] naming the first component
    /// that is too short.
    pub fn check_horizon(&self, end: usize) -> Result<(), ModelError> {
        let horizons = [
            ("dynamics", self.dynamics.horizon()),
            ("loading", self.loading.horizon()),
            ("measurement error", self.measurement.as_ref().and_then(|m| m.horizon())),
        ];
        for (what, horizon) in horizons {
            match horizon {
                Some(horizon) if horizon < end => {
                    return Err(ModelError::HorizonExceeded {
                        what,
                        horizon,
                        pos: end,
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::{ConstantDynamics, VaryingDynamics};
    use crate::loading::ConstantLoading;
    use crate::measurement::{ConstantError, VaryingError};
    use ndarray::{Array2, array};

    fn level() -> Ssf {
        Ssf::new(
            ConstantDynamics::new(array![[1.0]], array![[0.5]]).unwrap(),
            ConstantLoading::new(array![1.0]).unwrap(),
            Initialization::fully_diffuse(1),
        )
        .unwrap()
        .with_measurement_error(ConstantError::new(2.0).unwrap())
    }

    #[test]
    fn assembles_model() {
        let ssf = level();
        assert_eq!(ssf.state_dim(), 1);
        assert_eq!(ssf.diffuse_dim(), 1);
        assert_eq!(ssf.error_variance(3), 2.0);
        assert!(ssf.is_time_invariant());
        assert!(ssf.check_horizon(1_000).is_ok());
    }

    #[test]
    fn rejects_loading_of_wrong_size() {
        let err = Ssf::new(
            ConstantDynamics::new(Array2::eye(2), Array2::eye(2)).unwrap(),
            ConstantLoading::new(array![1.0]).unwrap(),
            Initialization::fully_diffuse(2),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ModelError::DimensionMismatch {
                what: "loading",
                expected: 2,
                got: 1,
            }
        );
    }

    #[test]
    fn rejects_initialization_of_wrong_size() {
        assert!(level().with_initialization(Initialization::fully_diffuse(3)).is_err());
    }

    #[test]
    fn varying_components_bound_horizon() {
        let ssf = Ssf::new(
            VaryingDynamics::new(vec![array![[1.0]]; 3], vec![array![[1.0]]; 3]).unwrap(),
            ConstantLoading::new(array![1.0]).unwrap(),
            Initialization::fully_diffuse(1),
        )
        .unwrap()
        .with_measurement_error(VaryingError::new(vec![1.0; 5]).unwrap());
        assert!(!ssf.is_time_invariant());
        assert!(ssf.check_horizon(3).is_ok());
        assert_eq!(
            ssf.check_horizon(4).unwrap_err(),
            ModelError::HorizonExceeded {
                what: "dynamics",
                horizon: 3,
                pos: 4,
            }
        );
    }

    #[test]
    fn no_measurement_error_means_zero_variance() {
        let ssf = Ssf::new(
            ConstantDynamics::new(array![[0.5]], array![[1.0]]).unwrap(),
            ConstantLoading::new(array![1.0]).unwrap(),
            Initialization::stationary(array![0.0], array![[1.0]]).unwrap(),
        )
        .unwrap();
        assert_eq!(ssf.error_variance(0), 0.0);
        assert!(ssf.measurement().is_none());
    }
}
