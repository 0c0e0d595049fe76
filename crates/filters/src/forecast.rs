//! Out-of-sample forecasts from the final filtered state.

use ndarray::Array1;
use ssf_core::{FilteringResults, ModelError, Ssf, SsfData, StatePhase};
use ssf_likelihood::{DiffuseLikelihood, PredictionErrorDecomposition};
use tracing::debug;

use crate::diffuse::DiffuseFilter;
use crate::error::FilterError;
use crate::recursion::{emit_state, time_update};
use crate::settings::FilterSettings;
use crate::strategy::Filter;

/// Point forecasts and their variances for the positions following the data.
#[derive(Clone, Debug, PartialEq)]
pub struct Forecasts {
    /// Start position of the forecasts (the end of the data).
    pub start: usize,
    /// `Z a(t)` for each forecast position.
    pub means: Array1<f64>,
    /// `σ² (Z P(t) Zᵀ + H)` for each forecast position.
    pub variances: Array1<f64>,
    /// Likelihood of the data, which supplies `σ²`.
    pub likelihood: DiffuseLikelihood,
}

impl Forecasts {
    /// Number of forecast positions.
    pub fn horizon(&self) -> usize {
        self.means.len()
    }

    /// Standard errors of the forecasts.
    pub fn standard_errors(&self) -> Array1<f64> {
        self.variances.mapv(f64::sqrt)
    }
}

/// Filters `data` and projects the final state `horizon` steps ahead.
///
/// Forecast states are reported to `sink` with [`StatePhase::Forecast`],
/// unscaled (their covariances are relative to `σ²`).
///
/// # Errors
///
/// | Variant | Trigger |
/// |---------|---------|
/// | [`FilterError::Model`] | `horizon == 0`, or a time-varying component does not cover the forecast positions |
/// | other | any error of the diffuse filter or of the likelihood |
pub fn forecast(
    ssf: &Ssf,
    data: &SsfData<'_>,
    horizon: usize,
    settings: FilterSettings,
    sink: &mut dyn FilteringResults,
) -> Result<Forecasts, FilterError> {
    if horizon == 0 {
        return Err(ModelError::EmptyHorizon { what: "forecast" }.into());
    }
    let start = data.end();
    ssf.check_horizon(start + horizon)?;

    let mut filter = DiffuseFilter::new(settings);
    let mut ped = PredictionErrorDecomposition::new();
    filter.process(ssf, data, &mut ped)?;
    let likelihood = ped.into_likelihood()?;
    let sigma2 = likelihood.sigma2();
    let mut state = filter.final_state().ok_or(FilterError::NotInitialized)?;

    let loading = ssf.loading();
    let mut means = Array1::zeros(horizon);
    let mut variances = Array1::zeros(horizon);
    for h in 0..horizon {
        let pos = start + h;
        means[h] = loading.zx(pos, state.a().view());
        variances[h] = (loading.zvz(pos, state.p().view()) + ssf.error_variance(pos)) * sigma2;
        emit_state(sink, pos, &state, StatePhase::Forecast);
        time_update(ssf, pos, &mut state);
    }
    debug!(start, horizon, sigma2, "forecasts computed");

    Ok(Forecasts {
        start,
        means,
        variances,
        likelihood,
    })
}
