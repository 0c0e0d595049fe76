//! Exact diffuse Kalman filter in covariance form.
//!
//! The initial covariance is `P* + κ P∞` with `κ → ∞`. While `P∞` is
//! carried, each observation either has a positive diffuse variance
//! `fi = Z P∞ Zᵀ` (a diffuse step, which removes one diffuse direction) or
//! not (an ordinary step on `P*`). After `d` diffuse steps `P∞` vanishes and
//! the recursion is the ordinary Kalman filter.

use ndarray::{Array1, Array2, ArrayView1};
use ssf_core::{FilteringResults, Ssf, SsfData, State, StatePhase, UpdateInformation, UpdateStatus};
use ssf_linalg::{rank_one_update, symmetrize};
use tracing::debug;

use crate::error::FilterError;
use crate::recursion::{emit_state, is_singular, measurement_update, prediction_error, time_update};
use crate::settings::FilterSettings;
use crate::strategy::Filter;

/// Working storage of one covariance-form run.
#[derive(Clone, Debug)]
pub(crate) struct CovarianceRecursion {
    state: State,
    pinf: Option<Array2<f64>>,
    remaining: usize,
    info: UpdateInformation,
    mi: Array1<f64>,
    resolved_at: Option<usize>,
}

impl CovarianceRecursion {
    pub(crate) fn new(ssf: &Ssf) -> Self {
        let init = ssf.initialization();
        let dim = ssf.state_dim();
        let d = init.diffuse_dim();
        Self {
            state: State::from_initialization(init),
            pinf: (d > 0).then(|| init.pinf()),
            remaining: d,
            info: UpdateInformation::new(dim),
            mi: Array1::zeros(dim),
            resolved_at: None,
        }
    }

    /// Diffuse directions not yet resolved.
    pub(crate) fn remaining(&self) -> usize {
        self.remaining
    }

    pub(crate) fn state(&self) -> &State {
        &self.state
    }

    pub(crate) fn resolved_at(&self) -> Option<usize> {
        self.resolved_at
    }

    pub(crate) fn step(
        &mut self,
        ssf: &Ssf,
        settings: &FilterSettings,
        pos: usize,
        y: Option<f64>,
        sink: &mut dyn FilteringResults,
    ) -> Result<(), FilterError> {
        emit_state(sink, pos, &self.state, StatePhase::Prediction);
        if let Some(y) = y {
            self.update(ssf, settings, pos, y, sink)?;
            emit_state(sink, pos, &self.state, StatePhase::Concurrent);
        }
        time_update(ssf, pos, &mut self.state);
        if let Some(pinf) = self.pinf.as_mut() {
            ssf.dynamics().tvt(pos, pinf);
        }
        Ok(())
    }

    fn update(
        &mut self,
        ssf: &Ssf,
        settings: &FilterSettings,
        pos: usize,
        y: f64,
        sink: &mut dyn FilteringResults,
    ) -> Result<(), FilterError> {
        let (e, f) = prediction_error(ssf, pos, &self.state, y, self.info.m_mut());

        if let Some(pinf) = self.pinf.as_mut() {
            let loading = ssf.loading();
            loading.zm(pos, pinf.view(), self.mi.view_mut());
            let fi = loading.zx(pos, self.mi.view());
            if fi > settings.diffuse_tolerance() {
                diffuse_update(&mut self.state, pinf, self.mi.view(), self.info.m().view(), e, f, fi);
                self.info.set(e, f, fi, UpdateStatus::Diffuse);
                sink.save(pos, &self.info);
                self.remaining -= 1;
                if self.remaining == 0 {
                    self.pinf = None;
                    self.resolved_at = Some(pos);
                    debug!(pos, "diffuse part resolved");
                }
                return Ok(());
            }
        }

        if is_singular(settings, pos, f)? {
            self.info.set(e, f, 0.0, UpdateStatus::Excluded);
            sink.save(pos, &self.info);
            return Ok(());
        }
        measurement_update(&mut self.state, self.info.m().view(), e, f);
        self.info.set(e, f, 0.0, UpdateStatus::Ordinary);
        sink.save(pos, &self.info);
        Ok(())
    }
}

/// Diffuse step with `Mi = P∞ Zᵀ`, `M = P* Zᵀ`:
///
/// ```text
/// a  += Mi e / fi
/// P* += Mi Miᵀ f / fi² − (Mi Mᵀ + M Miᵀ) / fi
/// P∞ −= Mi Miᵀ / fi
/// ```
fn diffuse_update(
    state: &mut State,
    pinf: &mut Array2<f64>,
    mi: ArrayView1<'_, f64>,
    m: ArrayView1<'_, f64>,
    e: f64,
    f: f64,
    fi: f64,
) {
    let (a, p) = state.parts_mut();
    a.scaled_add(e / fi, &mi);
    rank_one_update(p.view_mut(), f / (fi * fi), mi, mi);
    rank_one_update(p.view_mut(), -1.0 / fi, mi, m);
    rank_one_update(p.view_mut(), -1.0 / fi, m, mi);
    symmetrize(p.view_mut());
    rank_one_update(pinf.view_mut(), -1.0 / fi, mi, mi);
}

/// Exact diffuse filter (covariance form).
///
/// # Example
///
/// ```
/// use ssf_core::{SsfData, models::local_level};
/// use ssf_filters::{DiffuseFilter, Filter, FilterSettings};
/// use ssf_likelihood::PredictionErrorDecomposition;
///
/// let ssf = local_level(0.5, 1.0).unwrap();
/// let y = [1.0, 2.0, 1.5, f64::NAN, 1.8];
/// let mut ped = PredictionErrorDecomposition::new();
/// DiffuseFilter::new(FilterSettings::new())
///     .process(&ssf, &SsfData::new(&y), &mut ped)
///     .unwrap();
/// let ll = ped.likelihood().unwrap();
/// assert_eq!(ll.n(), 4);
/// ```
#[derive(Clone, Debug, Default)]
pub struct DiffuseFilter {
    settings: FilterSettings,
    run: Option<CovarianceRecursion>,
}

impl DiffuseFilter {
    /// Creates the filter.
    pub fn new(settings: FilterSettings) -> Self {
        Self { settings, run: None }
    }

    /// Settings of the filter.
    pub fn settings(&self) -> &FilterSettings {
        &self.settings
    }

    /// Position of the last diffuse step of the latest run, if the diffuse
    /// part was resolved.
    pub fn resolved_position(&self) -> Option<usize> {
        self.run.as_ref().and_then(CovarianceRecursion::resolved_at)
    }
}

impl Filter for DiffuseFilter {
    fn initialize(&mut self, ssf: &Ssf, _data: &SsfData<'_>) -> Result<(), FilterError> {
        self.settings.validate()?;
        self.run = Some(CovarianceRecursion::new(ssf));
        Ok(())
    }

    fn step(
        &mut self,
        ssf: &Ssf,
        pos: usize,
        y: Option<f64>,
        sink: &mut dyn FilteringResults,
    ) -> Result<(), FilterError> {
        let Some(run) = self.run.as_mut() else {
            return Err(FilterError::NotInitialized);
        };
        run.step(ssf, &self.settings, pos, y, sink)
    }

    fn finalize(&mut self, _ssf: &Ssf, end: usize, sink: &mut dyn FilteringResults) -> Result<(), FilterError> {
        let Some(run) = self.run.as_ref() else {
            return Err(FilterError::NotInitialized);
        };
        if run.remaining() > 0 {
            return Err(FilterError::DiffuseNotResolved {
                remaining: run.remaining(),
            });
        }
        emit_state(sink, end, run.state(), StatePhase::Final);
        sink.close(end);
        Ok(())
    }

    fn final_state(&self) -> Option<State> {
        self.run
            .as_ref()
            .filter(|run| run.remaining() == 0)
            .map(|run| run.state().clone())
    }
}
