//! Chandrasekhar (CKMS) recursions for time-invariant models.
//!
//! Instead of the `n×n` covariance, the filter propagates `f`, `M = P Zᵀ`
//! and a low-rank factorisation `ΔP = L W Lᵀ` of the covariance increment:
//!
//! ```text
//! zl     = Z L
//! f'     = f + zl W zlᵀ
//! M'     = M + L W zlᵀ
//! L'     = T (L − M zl / f)
//! W'     = W − W zlᵀ zl W / f'
//! ```
//!
//! When `P0` solves the Lyapunov equation and no observation is missing, the
//! recursion starts at the first observation with `L = T M`, `W = −1/f`.
//! Otherwise the covariance-form diffuse filter runs first, until the
//! diffuse part is resolved and the last missing observation is passed,
//! and the first increment is factored with a pivoted LDLᵀ.
//!
//! Once `Z L` vanishes the gain is constant and only the mean is updated.

use ndarray::{Array1, Array2, Axis};
use ssf_core::{FilteringResults, Ssf, SsfData, State, StatePhase, UpdateInformation, UpdateStatus};
use ssf_linalg::{ldl_pivoted, max_abs, rank_one_update, symmetrize};
use tracing::debug;

use crate::diffuse::CovarianceRecursion;
use crate::error::FilterError;
use crate::recursion::emit_state;
use crate::settings::FilterSettings;
use crate::strategy::Filter;

/// Relative residual under which `P0` is taken to solve `P = T P Tᵀ + V`.
const LYAPUNOV_TOL: f64 = 1e-9;

/// Relative pivot tolerance of the increment factorisation.
const LDL_TOL: f64 = 1e-12;

#[derive(Clone, Debug)]
struct FastState {
    a: Array1<f64>,
    f: f64,
    m: Array1<f64>,
    l: Array2<f64>,
    w: Array2<f64>,
    /// Variance at the start of the fast phase, the scale of the
    /// steady-state test.
    f0: f64,
    zl: Array1<f64>,
    frozen: bool,
    info: UpdateInformation,
}

impl FastState {
    fn new(a: Array1<f64>, f: f64, m: Array1<f64>, l: Array2<f64>, w: Array2<f64>) -> Self {
        let dim = a.len();
        Self {
            zl: Array1::zeros(l.ncols()),
            a,
            f,
            m,
            l,
            w,
            f0: f,
            frozen: false,
            info: UpdateInformation::new(dim),
        }
    }

    /// Closed-form start for a stationary initialisation.
    fn closed_form(ssf: &Ssf, settings: &FilterSettings, pos: usize) -> Option<Self> {
        let init = ssf.initialization();
        if init.is_diffuse() {
            return None;
        }
        let p0 = init.pstar();
        let dynamics = ssf.dynamics();
        let mut residual = p0.clone();
        dynamics.tvt(pos, &mut residual);
        dynamics.add_v(pos, residual.view_mut());
        residual -= p0;
        if max_abs(residual.view()) > LYAPUNOV_TOL * max_abs(p0.view()).max(1.0) {
            return None;
        }

        let loading = ssf.loading();
        let mut m = Array1::zeros(ssf.state_dim());
        loading.zm(pos, p0.view(), m.view_mut());
        let f = loading.zx(pos, m.view()) + ssf.error_variance(pos);
        if f <= settings.zero_tolerance() {
            return None;
        }
        let mut l = m.clone().insert_axis(Axis(1));
        dynamics.tm(pos, l.view_mut());
        let w = Array2::from_elem((1, 1), -1.0 / f);
        Some(Self::new(init.a0().clone(), f, m, l, w))
    }

    /// Start from the predicted state of a covariance-form run: one Riccati
    /// step gives the first increment, which is then factored.
    fn from_covariance(ssf: &Ssf, settings: &FilterSettings, pos: usize, state: &State) -> Option<Self> {
        let loading = ssf.loading();
        let dynamics = ssf.dynamics();
        let dim = state.dim();
        let mut m = Array1::zeros(dim);
        loading.zm(pos, state.p().view(), m.view_mut());
        let f = loading.zx(pos, m.view()) + ssf.error_variance(pos);
        if f <= settings.zero_tolerance() {
            return None;
        }

        let mut next = state.p().clone();
        rank_one_update(next.view_mut(), -1.0 / f, m.view(), m.view());
        dynamics.tvt(pos, &mut next);
        dynamics.add_v(pos, next.view_mut());
        let mut delta = next - state.p();
        symmetrize(delta.view_mut());

        let (l, w) = match ldl_pivoted(delta.view(), LDL_TOL) {
            Some((mut cols, pivots)) => {
                let mut w = Array2::zeros((pivots.len(), pivots.len()));
                for (j, d) in pivots.iter().enumerate() {
                    cols.column_mut(j).mapv_inplace(|x| x * (d.abs() * f).sqrt());
                    w[[j, j]] = d.signum() / f;
                }
                (cols, w)
            }
            None => (Array2::eye(dim) * f, delta / (f * f)),
        };
        Some(Self::new(state.a().clone(), f, m, l, w))
    }

    /// Returns `true` when the step detected the steady state.
    fn step(
        &mut self,
        ssf: &Ssf,
        settings: &FilterSettings,
        pos: usize,
        y: Option<f64>,
        sink: &mut dyn FilteringResults,
    ) -> Result<bool, FilterError> {
        let Some(y) = y else {
            return Err(FilterError::MissingAfterWarmUp { pos });
        };
        if self.f <= settings.zero_tolerance() {
            return Err(FilterError::SingularVariance { pos, variance: self.f });
        }
        let loading = ssf.loading();
        let dynamics = ssf.dynamics();

        let e = y - loading.zx(pos, self.a.view());
        self.info.m_mut().assign(&self.m);
        self.info.set(e, self.f, 0.0, UpdateStatus::Ordinary);
        sink.save(pos, &self.info);
        self.a.scaled_add(e / self.f, &self.m);
        dynamics.tx(pos, self.a.view_mut());

        if self.frozen {
            return Ok(false);
        }
        loading.zm(pos, self.l.view(), self.zl.view_mut());
        let largest = self.zl.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
        if largest < settings.steady_state_epsilon() * self.f0 {
            self.frozen = true;
            return Ok(true);
        }

        let wzl = self.w.dot(&self.zl);
        let lwz = self.l.dot(&wzl);
        let f_next = self.f + self.zl.dot(&wzl);
        rank_one_update(self.l.view_mut(), -1.0 / self.f, self.m.view(), self.zl.view());
        dynamics.tm(pos, self.l.view_mut());
        self.m += &lwz;
        rank_one_update(self.w.view_mut(), -1.0 / f_next, wzl.view(), wzl.view());
        self.f = f_next;
        Ok(false)
    }
}

#[derive(Clone, Debug)]
enum Phase {
    WarmUp(CovarianceRecursion),
    Fast(FastState),
}

#[derive(Clone, Debug)]
struct CkmsRun {
    phase: Phase,
    /// Position of the last missing observation.
    warm_until: Option<usize>,
    steady: Option<usize>,
}

impl CkmsRun {
    fn switch_if_ready(&mut self, ssf: &Ssf, settings: &FilterSettings, pos: usize) {
        let Phase::WarmUp(cov) = &self.phase else {
            return;
        };
        if cov.remaining() > 0 || self.warm_until.is_some_and(|w| pos <= w) {
            return;
        }
        if let Some(fast) = FastState::from_covariance(ssf, settings, pos, cov.state()) {
            debug!(pos, rank = fast.l.ncols(), "switching to Chandrasekhar recursions");
            self.phase = Phase::Fast(fast);
        }
    }
}

/// Chandrasekhar-type fast filter.
///
/// Requires a time-invariant model. Only the mean is propagated in the fast
/// phase, so no state snapshots are emitted there and
/// [`Filter::final_state`] returns `None` once the recursion has switched.
///
/// # Example
///
/// ```
/// use ssf_core::{SsfData, models::arma};
/// use ssf_filters::{CkmsFilter, Filter, FilterSettings};
/// use ssf_likelihood::PredictionErrorDecomposition;
///
/// let ssf = arma(&[0.5], &[], 1.0).unwrap();
/// let mut filter = CkmsFilter::new(FilterSettings::new());
/// let mut ped = PredictionErrorDecomposition::new();
/// filter
///     .process(&ssf, &SsfData::new(&[0.3, -0.2, 0.8, 0.1]), &mut ped)
///     .unwrap();
/// assert_eq!(filter.steady_state_position(), Some(1));
/// ```
#[derive(Clone, Debug, Default)]
pub struct CkmsFilter {
    settings: FilterSettings,
    run: Option<CkmsRun>,
}

impl CkmsFilter {
    /// Creates the filter.
    pub fn new(settings: FilterSettings) -> Self {
        Self { settings, run: None }
    }

    /// Position at which the latest run reached its steady state.
    pub fn steady_state_position(&self) -> Option<usize> {
        self.run.as_ref().and_then(|run| run.steady)
    }

    /// Whether the latest run is past its warm-up.
    pub fn is_fast(&self) -> bool {
        matches!(
            self.run,
            Some(CkmsRun {
                phase: Phase::Fast(_),
                ..
            })
        )
    }
}

impl Filter for CkmsFilter {
    fn initialize(&mut self, ssf: &Ssf, data: &SsfData<'_>) -> Result<(), FilterError> {
        self.settings.validate()?;
        if !ssf.is_time_invariant() {
            return Err(FilterError::NotTimeInvariant);
        }
        let warm_until = data.last_missing().map(|i| data.position(i));
        let closed = match warm_until {
            None => FastState::closed_form(ssf, &self.settings, data.start()),
            Some(_) => None,
        };
        let phase = match closed {
            Some(fast) => Phase::Fast(fast),
            None => Phase::WarmUp(CovarianceRecursion::new(ssf)),
        };
        self.run = Some(CkmsRun {
            phase,
            warm_until,
            steady: None,
        });
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
        run.switch_if_ready(ssf, &self.settings, pos);
        match &mut run.phase {
            Phase::WarmUp(cov) => cov.step(ssf, &self.settings, pos, y, sink),
            Phase::Fast(fast) => {
                if fast.step(ssf, &self.settings, pos, y, sink)? {
                    debug!(pos, "steady state reached");
                    run.steady = Some(pos);
                }
                Ok(())
            }
        }
    }

    fn finalize(&mut self, _ssf: &Ssf, end: usize, sink: &mut dyn FilteringResults) -> Result<(), FilterError> {
        let Some(run) = self.run.as_ref() else {
            return Err(FilterError::NotInitialized);
        };
        if let Phase::WarmUp(cov) = &run.phase {
            if cov.remaining() > 0 {
                return Err(FilterError::DiffuseNotResolved {
                    remaining: cov.remaining(),
                });
            }
            emit_state(sink, end, cov.state(), StatePhase::Final);
        }
        sink.close(end);
        Ok(())
    }

    fn final_state(&self) -> Option<State> {
        match &self.run.as_ref()?.phase {
            Phase::WarmUp(cov) if cov.remaining() == 0 => Some(cov.state().clone()),
            _ => None,
        }
    }
}
