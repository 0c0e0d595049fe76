//! Augmented Kalman filter with collapsing.
//!
//! The diffuse part of the initial state is treated as an unknown vector
//! `δ` with state `a + B δ`. Each observation contributes the row
//! `[−Z B, e] / √f` to a triangular accumulator `R`; once the leading
//! `d×d` block of `R` is well conditioned, `δ` is estimated by generalised
//! least squares and folded into `a` and `P`, after which the recursion is
//! the ordinary Kalman filter.
//!
//! An observation with no ordinary variance but a diffuse loading carries
//! no noise at all and fixes one diffuse direction exactly. It is handled
//! as a diffuse step that drops a column of `B`.

use ndarray::{Array1, Array2, s};
use ssf_core::{
    AugmentedState, AugmentedUpdateInformation, CollapseInformation, FilteringResults, Ssf, SsfData, State,
    StatePhase, UpdateStatus,
};
use ssf_linalg::{accumulate_row, max_abs, rank_one_update, right_solve_upper, symmetrize, zero_row_in_place};
use tracing::debug;

use crate::error::FilterError;
use crate::recursion::{emit_state, is_singular, measurement_update, prediction_error, time_update};
use crate::settings::FilterSettings;
use crate::strategy::Filter;

#[derive(Clone, Debug)]
struct AugmentedRun {
    state: AugmentedState,
    /// Upper-triangular accumulator, `(d+1)×(d+1)`, dropped at collapse.
    q: Option<Array2<f64>>,
    info: AugmentedUpdateInformation,
    row: Array1<f64>,
    collapsed_at: Option<usize>,
}

impl AugmentedRun {
    fn new(ssf: &Ssf) -> Self {
        let state = AugmentedState::from_initialization(ssf.initialization());
        let d = state.diffuse_dim();
        Self {
            q: (d > 0).then(|| Array2::zeros((d + 1, d + 1))),
            info: AugmentedUpdateInformation::new(ssf.state_dim(), d),
            row: Array1::zeros(d + 1),
            state,
            collapsed_at: None,
        }
    }

    fn step(
        &mut self,
        ssf: &Ssf,
        settings: &FilterSettings,
        pos: usize,
        y: Option<f64>,
        sink: &mut dyn FilteringResults,
    ) -> Result<(), FilterError> {
        // a and P are conditional on δ = 0 until the collapse
        if self.state.diffuse_dim() == 0 {
            emit_state(sink, pos, self.state.state(), StatePhase::Prediction);
        }
        if let Some(y) = y {
            self.update(ssf, settings, pos, y, sink)?;
            if self.state.diffuse_dim() == 0 {
                emit_state(sink, pos, self.state.state(), StatePhase::Concurrent);
            }
        }
        let (state, b) = self.state.parts_mut();
        time_update(ssf, pos, state);
        if b.ncols() > 0 {
            ssf.dynamics().tm(pos, b.view_mut());
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
        let d = self.state.diffuse_dim();
        let (e, f) = prediction_error(ssf, pos, self.state.state(), y, self.info.update_mut().m_mut());

        if d > 0 {
            let e_diffuse = self.info.e_diffuse_mut();
            ssf.loading().zm(pos, self.state.b().view(), e_diffuse.view_mut());
            e_diffuse.mapv_inplace(|x| -x);
            let fi = self.info.e_diffuse().dot(self.info.e_diffuse());
            if f <= settings.zero_tolerance() && fi > settings.diffuse_tolerance() {
                return self.reduce(settings, pos, e, f, fi, sink);
            }
        }

        if is_singular(settings, pos, f)? {
            self.info.update_mut().set(e, f, 0.0, UpdateStatus::Excluded);
            sink.save_augmented(pos, &self.info);
            return Ok(());
        }

        if d == 0 {
            measurement_update(self.state.state_mut(), self.info.update().m().view(), e, f);
            self.info.update_mut().set(e, f, 0.0, UpdateStatus::Ordinary);
            sink.save_augmented(pos, &self.info);
            return Ok(());
        }

        {
            let (info, e_diffuse) = self.info.parts_mut();
            let (state, b) = self.state.parts_mut();

            let sf = f.sqrt();
            self.row.slice_mut(s![..d]).assign(&e_diffuse.mapv(|x| x / sf));
            self.row[d] = e / sf;
            if let Some(q) = self.q.as_mut() {
                accumulate_row(q.view_mut(), self.row.view_mut());
            }

            rank_one_update(b.view_mut(), 1.0 / f, info.m().view(), e_diffuse.view());
            measurement_update(state, info.m().view(), e, f);
            info.set(e, f, 0.0, UpdateStatus::Augmented);
        }
        sink.save_augmented(pos, &self.info);
        self.try_collapse(settings, pos, sink)
    }

    /// Observation without ordinary variance but with a diffuse loading
    /// `g = Z B ≠ 0`: it fixes `g δ = e` exactly.
    ///
    /// `B` is rotated so that `g` becomes `(‖g‖, 0, …)`, the first rotated
    /// coefficient is substituted into the state and into the accumulated
    /// rows, and its column is dropped. Reported as a diffuse step with
    /// `fi = ‖g‖²`.
    fn reduce(
        &mut self,
        settings: &FilterSettings,
        pos: usize,
        e: f64,
        f: f64,
        fi: f64,
        sink: &mut dyn FilteringResults,
    ) -> Result<(), FilterError> {
        let d = self.state.diffuse_dim();
        let dim = self.state.state().dim();
        let q = self.q.take().unwrap_or_else(|| Array2::zeros((d + 1, d + 1)));

        // rows: g, then B, then the coefficient columns of the accumulator
        let mut w = Array2::zeros((1 + dim + d + 1, d));
        w.row_mut(0).assign(&self.info.e_diffuse().mapv(|x| -x));
        w.slice_mut(s![1..=dim, ..]).assign(self.state.b());
        w.slice_mut(s![dim + 1.., ..]).assign(&q.slice(s![.., ..d]));
        zero_row_in_place(w.view_mut(), 0, 0);
        let delta = e / w[[0, 0]];

        let b = w.slice(s![1..=dim, ..]);
        self.state.state_mut().a_mut().scaled_add(delta, &b.column(0));
        let rest = b.slice(s![.., 1..]).to_owned();

        let x = w.slice(s![dim + 1.., ..]);
        let mut known = q.column(d).to_owned();
        known.scaled_add(delta, &x.column(0));
        let mut r = Array2::zeros((d, d));
        let mut row = Array1::zeros(d);
        for i in 0..=d {
            row.slice_mut(s![..d - 1]).assign(&x.slice(s![i, 1..]));
            row[d - 1] = known[i];
            accumulate_row(r.view_mut(), row.view_mut());
        }

        self.state.replace_diffuse(rest)?;
        self.q = Some(r);
        self.row = Array1::zeros(d);
        self.info.update_mut().set(e, f, fi, UpdateStatus::Diffuse);
        sink.save_augmented(pos, &self.info);
        self.info.truncate_diffuse(d - 1);
        debug!(pos, remaining = d - 1, "diffuse direction fixed by an exact observation");
        self.try_collapse(settings, pos, sink)
    }

    /// Folds the diffuse columns into the state once `R₁₁` is well
    /// conditioned relative to its largest entry.
    fn try_collapse(
        &mut self,
        settings: &FilterSettings,
        pos: usize,
        sink: &mut dyn FilteringResults,
    ) -> Result<(), FilterError> {
        let Some(q) = self.q.as_ref() else {
            return Ok(());
        };
        let d = self.state.diffuse_dim();
        if d > 0 {
            let r11 = q.slice(s![..d, ..d]);
            let scale = max_abs(r11);
            if scale == 0.0 {
                return Ok(());
            }
            let tol = settings.collapse_tolerance() * scale;
            if (0..d).any(|i| q[[i, i]].abs() <= tol) {
                return Ok(());
            }

            let c = right_solve_upper(self.state.b().view(), r11)?;
            let shift = c.dot(&q.slice(s![..d, d]));
            let (a, p) = self.state.state_mut().parts_mut();
            a.scaled_add(-1.0, &shift);
            *p += &c.dot(&c.t());
            symmetrize(p.view_mut());
        }
        let dcorr: f64 = (0..d).map(|i| 2.0 * q[[i, i]].abs().ln()).sum();
        let ssq = q[[d, d]] * q[[d, d]];

        self.state.clear_diffuse();
        self.info.truncate_diffuse(0);
        self.q = None;
        self.collapsed_at = Some(pos);
        debug!(pos, d, ssq, dcorr, "diffuse part collapsed");
        sink.collapse(&CollapseInformation {
            position: pos,
            d,
            ssq,
            dcorr,
        });
        Ok(())
    }
}

/// Augmented filter with collapsing (de Jong).
///
/// Equivalent to [`DiffuseFilter`](crate::DiffuseFilter) in likelihood, with
/// a different split between the determinant and the diffuse correction.
///
/// # Example
///
/// ```
/// use ssf_core::{FilteredRecords, SsfData, models::local_linear_trend};
/// use ssf_filters::{AugmentedFilter, Filter, FilterSettings};
///
/// let ssf = local_linear_trend(0.2, 0.01, 1.0).unwrap();
/// let mut filter = AugmentedFilter::new(FilterSettings::new());
/// let mut records = FilteredRecords::new();
/// filter
///     .process(&ssf, &SsfData::new(&[1.0, 2.0, 3.5, 4.0]), &mut records)
///     .unwrap();
/// assert_eq!(filter.collapsing_position(), Some(1));
/// assert_eq!(records.collapse_info().map(|c| c.d), Some(2));
/// ```
#[derive(Clone, Debug, Default)]
pub struct AugmentedFilter {
    settings: FilterSettings,
    run: Option<AugmentedRun>,
}

impl AugmentedFilter {
    /// Creates the filter.
    pub fn new(settings: FilterSettings) -> Self {
        Self { settings, run: None }
    }

    /// Position of the observation after which the latest run collapsed.
    pub fn collapsing_position(&self) -> Option<usize> {
        self.run.as_ref().and_then(|run| run.collapsed_at)
    }
}

impl Filter for AugmentedFilter {
    fn initialize(&mut self, ssf: &Ssf, _data: &SsfData<'_>) -> Result<(), FilterError> {
        self.settings.validate()?;
        self.run = Some(AugmentedRun::new(ssf));
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
        let remaining = run.state.diffuse_dim();
        if remaining > 0 {
            return Err(FilterError::DiffuseNotResolved { remaining });
        }
        emit_state(sink, end, run.state.state(), StatePhase::Final);
        sink.close(end);
        Ok(())
    }

    fn final_state(&self) -> Option<State> {
        self.run
            .as_ref()
            .filter(|run| run.state.diffuse_dim() == 0)
            .map(|run| run.state.state().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diffuse::DiffuseFilter;
    use approx::assert_abs_diff_eq;
    use ssf_core::FilteredRecords;
    use ssf_core::models::{local_level, local_linear_trend};
    use ssf_likelihood::{DiffuseLikelihood, PredictionErrorDecomposition};

    #[test]
    fn local_level_collapses_after_first_observation() {
        let ssf = local_level(1.0, 1.0).unwrap();
        let mut filter = AugmentedFilter::new(FilterSettings::new());
        let mut records = FilteredRecords::new();
        filter
            .process(&ssf, &SsfData::new(&[1.0, 3.0]), &mut records)
            .unwrap();
        assert_eq!(filter.collapsing_position(), Some(0));
        let info = records.collapse_info().unwrap();
        assert_eq!(info.d, 1);
        assert_abs_diff_eq!(info.ssq, 0.0, epsilon = 1e-14);
        assert_abs_diff_eq!(info.dcorr, 0.0, epsilon = 1e-14);
        let state = filter.final_state().unwrap();
        assert_abs_diff_eq!(state.a()[0], 1.0 + 4.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(state.p()[[0, 0]], 2.0 - 4.0 / 3.0 + 1.0, epsilon = 1e-12);
    }

    #[test]
    fn trend_matches_covariance_form() {
        let ssf = local_linear_trend(0.3, 0.05, 1.0).unwrap();
        let y = [1.0, 2.2, f64::NAN, 2.9, 5.1, 5.8];
        let data = SsfData::new(&y);

        let mut aug = AugmentedFilter::new(FilterSettings::new());
        let mut aug_ll = PredictionErrorDecomposition::new();
        aug.process(&ssf, &data, &mut aug_ll).unwrap();
        let mut dk = DiffuseFilter::new(FilterSettings::new());
        let mut dk_ll = PredictionErrorDecomposition::new();
        dk.process(&ssf, &data, &mut dk_ll).unwrap();

        assert_eq!(aug.collapsing_position(), Some(1));
        let (a, b) = (aug_ll.likelihood().unwrap(), dk_ll.likelihood().unwrap());
        assert_eq!(a.n(), b.n());
        assert_eq!(a.d(), b.d());
        assert_abs_diff_eq!(a.log_likelihood(), b.log_likelihood(), epsilon = 1e-9);
        assert_abs_diff_eq!(a.ssq_err(), b.ssq_err(), epsilon = 1e-9);

        let (sa, sb) = (aug.final_state().unwrap(), dk.final_state().unwrap());
        for (x, z) in sa.a().iter().zip(sb.a().iter()) {
            assert_abs_diff_eq!(*x, *z, epsilon = 1e-9);
        }
        for (x, z) in sa.p().iter().zip(sb.p().iter()) {
            assert_abs_diff_eq!(*x, *z, epsilon = 1e-9);
        }
    }

    #[test]
    fn steps_report_diffuse_dimension() {
        let ssf = local_linear_trend(0.3, 0.05, 1.0).unwrap();
        let mut records = FilteredRecords::new();
        AugmentedFilter::new(FilterSettings::new())
            .process(&ssf, &SsfData::new(&[1.0, 2.0, 3.0]), &mut records)
            .unwrap();
        let dims: Vec<_> = records.steps().iter().map(|s| s.diffuse_dim).collect();
        assert_eq!(dims, vec![Some(2), Some(2), Some(0)]);
        let statuses: Vec<_> = records.steps().iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            vec![UpdateStatus::Augmented, UpdateStatus::Augmented, UpdateStatus::Ordinary]
        );
    }

    fn both_likelihoods(ssf: &Ssf, y: &[f64]) -> (DiffuseLikelihood, DiffuseLikelihood) {
        let data = SsfData::new(y);
        let mut aug_ll = PredictionErrorDecomposition::new();
        AugmentedFilter::new(FilterSettings::new())
            .process(ssf, &data, &mut aug_ll)
            .unwrap();
        let mut dk_ll = PredictionErrorDecomposition::new();
        DiffuseFilter::new(FilterSettings::new())
            .process(ssf, &data, &mut dk_ll)
            .unwrap();
        (aug_ll.likelihood().unwrap(), dk_ll.likelihood().unwrap())
    }

    #[test]
    fn noiseless_random_walk_fixes_level_exactly() {
        let ssf = local_level(1.0, 0.0).unwrap();
        let y = [1.0, 2.0, 3.5, 4.0, 4.2, 5.1];
        let mut records = FilteredRecords::new();
        let mut filter = AugmentedFilter::new(FilterSettings::new());
        filter.process(&ssf, &SsfData::new(&y), &mut records).unwrap();
        assert_eq!(records.steps()[0].status, UpdateStatus::Diffuse);
        assert_eq!(records.steps()[0].fi, 1.0);
        assert_eq!(records.steps()[0].diffuse_dim, Some(1));
        assert_eq!(filter.collapsing_position(), Some(0));

        let (aug, dk) = both_likelihoods(&ssf, &y);
        assert_eq!((aug.n(), aug.d()), (6, 1));
        assert_abs_diff_eq!(aug.ssq_err(), 4.35, epsilon = 1e-12);
        assert_abs_diff_eq!(aug.log_likelihood(), dk.log_likelihood(), epsilon = 1e-9);
    }

    #[test]
    fn noiseless_trend_matches_covariance_form() {
        let ssf = local_linear_trend(1.0, 0.5, 0.0).unwrap();
        let y = [1.0, 2.0, 3.5, 4.0, 4.2, 5.1];
        let (aug, dk) = both_likelihoods(&ssf, &y);
        assert_eq!((aug.n(), aug.d()), (dk.n(), dk.d()));
        assert_eq!((aug.n(), aug.d()), (6, 2));
        assert_abs_diff_eq!(aug.ssq_err(), dk.ssq_err(), epsilon = 1e-9);
        assert_abs_diff_eq!(
            aug.log_determinant() + aug.diffuse_correction(),
            dk.log_determinant() + dk.diffuse_correction(),
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(aug.log_likelihood(), dk.log_likelihood(), epsilon = 1e-9);
    }

    #[test]
    fn unresolved_diffuse_part_fails() {
        let ssf = local_linear_trend(0.1, 0.01, 1.0).unwrap();
        let err = AugmentedFilter::new(FilterSettings::new())
            .process(&ssf, &SsfData::new(&[1.0]), &mut ())
            .unwrap_err();
        assert_eq!(err, FilterError::DiffuseNotResolved { remaining: 2 });
    }

    #[test]
    fn step_before_initialize_fails() {
        let ssf = local_level(1.0, 1.0).unwrap();
        let err = AugmentedFilter::new(FilterSettings::new())
            .step(&ssf, 0, Some(1.0), &mut ())
            .unwrap_err();
        assert_eq!(err, FilterError::NotInitialized);
    }
}
