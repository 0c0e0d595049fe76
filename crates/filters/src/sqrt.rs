//! Exact diffuse Kalman filter in square-root (array) form.
//!
//! `P*` is carried as a factor `L` with `P* = L Lᵀ` and `P∞` as the
//! constraint basis `B` with `P∞ = B Bᵀ`. Every update is an orthogonal
//! transformation of a pre-array, so the covariances stay positive
//! semidefinite by construction.
//!
//! | Update | Pre-array | Post-array |
//! |--------|-----------|------------|
//! | diffuse step | `[Z B ; B]` | `[(‖Z B‖, 0) ; (b₀, B')]`, `B'` keeps `d − 1` columns |
//! | diffuse step (`P*`) | `[(I − k Z) L │ k √h]` | triangularised `L'` |
//! | ordinary step | `[(√h, Z L) ; (0, L)]` | `[(√f, 0) ; (M/√f, L')]` |
//! | time update | `[T L │ V^½]` | triangularised `L'` |

use ndarray::{Array1, Array2, Axis, concatenate, s};
use ssf_core::{FilteringResults, ModelError, Ssf, SsfData, State, StatePhase, UpdateInformation, UpdateStatus};
use ssf_linalg::{cholesky_semidefinite, rank_one_update, triangularize, zero_row_in_place};
use tracing::debug;

use crate::error::FilterError;
use crate::recursion::is_singular;
use crate::settings::FilterSettings;
use crate::strategy::Filter;

#[derive(Clone, Debug)]
struct SqrtRecursion {
    a: Array1<f64>,
    l: Array2<f64>,
    b: Array2<f64>,
    zl: Array1<f64>,
    info: UpdateInformation,
    resolved_at: Option<usize>,
}

impl SqrtRecursion {
    fn new(ssf: &Ssf) -> Result<Self, FilterError> {
        let init = ssf.initialization();
        let dim = ssf.state_dim();
        let l = cholesky_semidefinite(init.pstar().view())?;
        let b = init
            .basis()
            .cloned()
            .unwrap_or_else(|| Array2::zeros((dim, 0)));
        Ok(Self {
            a: init.a0().clone(),
            zl: Array1::zeros(l.ncols()),
            l,
            b,
            info: UpdateInformation::new(dim),
            resolved_at: None,
        })
    }

    fn state(&self) -> Result<State, FilterError> {
        Ok(State::from_parts(self.a.clone(), self.l.dot(&self.l.t()))?)
    }

    fn emit(&self, sink: &mut dyn FilteringResults, pos: usize, phase: StatePhase) -> Result<(), FilterError> {
        if sink.wants_states() {
            sink.save_state(pos, &self.state()?, phase);
        }
        Ok(())
    }

    fn step(
        &mut self,
        ssf: &Ssf,
        settings: &FilterSettings,
        pos: usize,
        y: Option<f64>,
        sink: &mut dyn FilteringResults,
    ) -> Result<(), FilterError> {
        self.emit(sink, pos, StatePhase::Prediction)?;
        if let Some(y) = y {
            self.update(ssf, settings, pos, y, sink)?;
            self.emit(sink, pos, StatePhase::Concurrent)?;
        }
        self.time_update(ssf, pos)
    }

    fn update(
        &mut self,
        ssf: &Ssf,
        settings: &FilterSettings,
        pos: usize,
        y: f64,
        sink: &mut dyn FilteringResults,
    ) -> Result<(), FilterError> {
        let loading = ssf.loading();
        let h = ssf.error_variance(pos);
        loading.zm(pos, self.l.view(), self.zl.view_mut());
        let e = y - loading.zx(pos, self.a.view());
        let f = self.zl.dot(&self.zl) + h;

        if self.b.ncols() > 0 {
            let mut zb = Array1::zeros(self.b.ncols());
            loading.zm(pos, self.b.view(), zb.view_mut());
            let fi = zb.dot(&zb);
            if fi > settings.diffuse_tolerance() {
                self.diffuse_update(zb, e, h);
                self.info.set(e, f, fi, UpdateStatus::Diffuse);
                sink.save(pos, &self.info);
                if self.b.ncols() == 0 {
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
        self.ordinary_update(e, h);
        self.info.set(e, f, 0.0, UpdateStatus::Ordinary);
        sink.save(pos, &self.info);
        Ok(())
    }

    /// Rotates `B` so that `Z B = (‖Z B‖, 0, …)`, consumes its first column
    /// and applies the Joseph form to `L`.
    fn diffuse_update(&mut self, zb: Array1<f64>, e: f64, h: f64) {
        let n = self.a.len();
        let d = self.b.ncols();
        let mut w = Array2::zeros((n + 1, d));
        w.row_mut(0).assign(&zb);
        w.slice_mut(s![1.., ..]).assign(&self.b);
        zero_row_in_place(w.view_mut(), 0, 0);
        let norm = w[[0, 0]];
        let k = w.slice(s![1.., 0]).mapv(|x| x / norm);

        *self.info.m_mut() = self.l.dot(&self.zl);
        self.a.scaled_add(e, &k);

        let cols = self.l.ncols();
        let mut joseph = Array2::zeros((n, cols + 1));
        joseph.slice_mut(s![.., ..cols]).assign(&self.l);
        rank_one_update(joseph.slice_mut(s![.., ..cols]), -1.0, k.view(), self.zl.view());
        joseph.column_mut(cols).assign(&k.mapv(|x| x * h.sqrt()));
        self.l = triangularize(&joseph);
        self.zl = Array1::zeros(self.l.ncols());

        self.b = w.slice(s![1.., 1..]).to_owned();
    }

    /// Zeroes the first row of `[(√h, Z L) ; (0, L)]` against its first
    /// column.
    fn ordinary_update(&mut self, e: f64, h: f64) {
        let n = self.a.len();
        let cols = self.l.ncols();
        let mut x = Array2::zeros((n + 1, cols + 1));
        x[[0, 0]] = h.sqrt();
        x.slice_mut(s![0, 1..]).assign(&self.zl);
        x.slice_mut(s![1.., 1..]).assign(&self.l);
        zero_row_in_place(x.view_mut(), 0, 0);

        let sf = x[[0, 0]];
        let g = x.slice(s![1.., 0]);
        self.a.scaled_add(e / sf, &g);
        *self.info.m_mut() = g.mapv(|v| v * sf);
        self.l = x.slice(s![1.., 1..]).to_owned();
    }

    fn time_update(&mut self, ssf: &Ssf, pos: usize) -> Result<(), FilterError> {
        let dynamics = ssf.dynamics();
        dynamics.tx(pos, self.a.view_mut());
        dynamics.tm(pos, self.b.view_mut());
        dynamics.tm(pos, self.l.view_mut());
        let sv = dynamics.v_factor(pos)?;
        let pre = concatenate(Axis(1), &[self.l.view(), sv.view()]).map_err(|_| {
            ModelError::DimensionMismatch {
                what: "innovation factor",
                expected: self.a.len(),
                got: sv.nrows(),
            }
        })?;
        self.l = triangularize(&pre);
        if self.zl.len() != self.l.ncols() {
            self.zl = Array1::zeros(self.l.ncols());
        }
        Ok(())
    }
}

/// Exact diffuse filter (square-root form).
#[derive(Clone, Debug, Default)]
pub struct SqrtDiffuseFilter {
    settings: FilterSettings,
    run: Option<SqrtRecursion>,
}

impl SqrtDiffuseFilter {
    /// Creates the filter.
    pub fn new(settings: FilterSettings) -> Self {
        Self { settings, run: None }
    }

    /// Position of the last diffuse step of the latest run, if the diffuse
    /// part was resolved.
    pub fn resolved_position(&self) -> Option<usize> {
        self.run.as_ref().and_then(|run| run.resolved_at)
    }
}

impl Filter for SqrtDiffuseFilter {
    fn initialize(&mut self, ssf: &Ssf, _data: &SsfData<'_>) -> Result<(), FilterError> {
        self.settings.validate()?;
        self.run = Some(SqrtRecursion::new(ssf)?);
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
        if run.b.ncols() > 0 {
            return Err(FilterError::DiffuseNotResolved {
                remaining: run.b.ncols(),
            });
        }
        run.emit(sink, end, StatePhase::Final)?;
        sink.close(end);
        Ok(())
    }

    fn final_state(&self) -> Option<State> {
        self.run
            .as_ref()
            .filter(|run| run.b.ncols() == 0)
            .and_then(|run| run.state().ok())
    }
}
