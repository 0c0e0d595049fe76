//! Numeric steps shared by the covariance-form filters.

use ndarray::{Array1, ArrayView1};
use ssf_core::{FilteringResults, Ssf, State, StatePhase};
use ssf_linalg::rank_one_update;

use crate::error::FilterError;
use crate::settings::{FilterSettings, SingularityPolicy};

/// Prediction error and its variance at `pos`; fills `m` with `P Zᵀ`.
pub(crate) fn prediction_error(ssf: &Ssf, pos: usize, state: &State, y: f64, m: &mut Array1<f64>) -> (f64, f64) {
    let loading = ssf.loading();
    loading.zm(pos, state.p().view(), m.view_mut());
    let f = loading.zx(pos, m.view()) + ssf.error_variance(pos);
    let e = y - loading.zx(pos, state.a().view());
    (e, f)
}

/// Whether a variance is singular. `Ok(true)` means the observation must be
/// excluded.
pub(crate) fn is_singular(settings: &FilterSettings, pos: usize, f: f64) -> Result<bool, FilterError> {
    if f > settings.zero_tolerance() {
        return Ok(false);
    }
    match settings.singularity_policy() {
        SingularityPolicy::Exclude => Ok(true),
        SingularityPolicy::Fail => Err(FilterError::SingularVariance { pos, variance: f }),
    }
}

/// `a += M e / f`, `P −= M Mᵀ / f`.
pub(crate) fn measurement_update(state: &mut State, m: ArrayView1<'_, f64>, e: f64, f: f64) {
    let (a, p) = state.parts_mut();
    a.scaled_add(e / f, &m);
    rank_one_update(p.view_mut(), -1.0 / f, m, m);
}

/// `a = T a`, `P = T P Tᵀ + V`.
pub(crate) fn time_update(ssf: &Ssf, pos: usize, state: &mut State) {
    let dynamics = ssf.dynamics();
    let (a, p) = state.parts_mut();
    dynamics.tx(pos, a.view_mut());
    dynamics.tvt(pos, p);
    dynamics.add_v(pos, p.view_mut());
}

pub(crate) fn emit_state(sink: &mut dyn FilteringResults, pos: usize, state: &State, phase: StatePhase) {
    if sink.wants_states() {
        sink.save_state(pos, state, phase);
    }
}
