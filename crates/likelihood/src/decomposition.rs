//! Results sink accumulating the prediction error decomposition.

use ssf_core::{CollapseInformation, FilteringResults, UpdateInformation, UpdateStatus};

use crate::diffuse::DiffuseLikelihood;
use crate::error::LikelihoodError;

/// Accumulates `ssq`, `ldet`, `dcorr`, `n` and `d` from any filter.
///
/// | Status | Contribution |
/// |--------|--------------|
/// | `Ordinary` | `ssq += e²/f`, `ldet += ln f`, `n += 1` |
/// | `Diffuse` | `dcorr += ln fi`, `n += 1`, `d += 1` |
/// | `Augmented` | `ldet += ln f`, `n += 1` (residual released at collapse) |
/// | `Excluded` | nothing |
#[derive(Clone, Debug, Default)]
pub struct PredictionErrorDecomposition {
    ssq: f64,
    ldet: f64,
    dcorr: f64,
    n: usize,
    d: usize,
    legacy: bool,
    residuals: Option<Vec<f64>>,
}

impl PredictionErrorDecomposition {
    /// Empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the standardized residuals of the ordinary steps.
    pub fn with_residuals(mut self, keep: bool) -> Self {
        self.residuals = keep.then(Vec::new);
        self
    }

    /// Uses `m = n` instead of `m = n − d` in the final likelihood.
    pub fn with_legacy_dof(mut self, legacy: bool) -> Self {
        self.legacy = legacy;
        self
    }

    /// Observations accumulated so far.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Diffuse elements accumulated so far.
    pub fn d(&self) -> usize {
        self.d
    }

    /// Builds the likelihood from the accumulated statistics.
    ///
    /// # Errors
    ///
    /// See [`DiffuseLikelihood::set`].
    pub fn likelihood(&self) -> Result<DiffuseLikelihood, LikelihoodError> {
        self.build(self.residuals.clone())
    }

    /// Consumes the accumulator; see [`Self::likelihood`].
    ///
    /// # Errors
    ///
    /// See [`DiffuseLikelihood::set`].
    pub fn into_likelihood(mut self) -> Result<DiffuseLikelihood, LikelihoodError> {
        let residuals = self.residuals.take();
        self.build(residuals)
    }

    fn build(&self, residuals: Option<Vec<f64>>) -> Result<DiffuseLikelihood, LikelihoodError> {
        let mut ll = DiffuseLikelihood::set(self.ssq, self.ldet, self.dcorr, self.n, self.d)?;
        if self.legacy {
            ll = ll.with_legacy_dof(true)?;
        }
        Ok(match residuals {
            Some(r) => ll.with_residuals(r),
            None => ll,
        })
    }
}

impl FilteringResults for PredictionErrorDecomposition {
    fn save(&mut self, _pos: usize, info: &UpdateInformation) {
        match info.status() {
            UpdateStatus::Ordinary => {
                let (e, f) = (info.e(), info.f());
                self.ssq += e * e / f;
                self.ldet += f.ln();
                self.n += 1;
                if let Some(residuals) = self.residuals.as_mut() {
                    residuals.push(e / f.sqrt());
                }
            }
            UpdateStatus::Diffuse => {
                self.dcorr += info.fi().ln();
                self.n += 1;
                self.d += 1;
            }
            UpdateStatus::Augmented => {
                self.ldet += info.f().ln();
                self.n += 1;
            }
            UpdateStatus::Excluded => {}
        }
    }

    fn collapse(&mut self, info: &CollapseInformation) {
        self.ssq += info.ssq;
        self.dcorr += info.dcorr;
        self.d += info.d;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn info(e: f64, f: f64, fi: f64, status: UpdateStatus) -> UpdateInformation {
        let mut info = UpdateInformation::new(1);
        info.set(e, f, fi, status);
        info
    }

    #[test]
    fn accumulates_by_status() {
        let mut ped = PredictionErrorDecomposition::new().with_residuals(true);
        ped.save(0, &info(1.0, 2.0, 1.0, UpdateStatus::Diffuse));
        ped.save(1, &info(2.0, 4.0, 0.0, UpdateStatus::Ordinary));
        ped.save(2, &info(9.0, 0.0, 0.0, UpdateStatus::Excluded));
        ped.save(3, &info(-1.0, 1.0, 0.0, UpdateStatus::Ordinary));
        assert_eq!(ped.n(), 3);
        assert_eq!(ped.d(), 1);

        let ll = ped.likelihood().unwrap();
        assert_abs_diff_eq!(ll.ssq_err(), 2.0, epsilon = 1e-15);
        assert_abs_diff_eq!(ll.log_determinant(), 4.0_f64.ln(), epsilon = 1e-15);
        assert_abs_diff_eq!(ll.diffuse_correction(), 0.0, epsilon = 1e-15);
        assert_eq!(ll.residuals(), Some(&[1.0, -1.0][..]));
    }

    #[test]
    fn collapse_releases_statistics() {
        let mut ped = PredictionErrorDecomposition::new();
        ped.save(0, &info(1.0, 2.0, 0.0, UpdateStatus::Augmented));
        ped.save(1, &info(1.0, 3.0, 0.0, UpdateStatus::Augmented));
        ped.collapse(&CollapseInformation {
            position: 1,
            d: 1,
            ssq: 0.5,
            dcorr: 0.7,
        });
        let ll = ped.into_likelihood().unwrap();
        assert_eq!(ll.n(), 2);
        assert_eq!(ll.d(), 1);
        assert_abs_diff_eq!(ll.ssq_err(), 0.5, epsilon = 1e-15);
        assert_abs_diff_eq!(ll.log_determinant(), 6.0_f64.ln(), epsilon = 1e-15);
        assert_abs_diff_eq!(ll.diffuse_correction(), 0.7, epsilon = 1e-15);
        assert!(ll.residuals().is_none());
    }

    #[test]
    fn legacy_flag_reaches_likelihood() {
        let mut ped = PredictionErrorDecomposition::new().with_legacy_dof(true);
        ped.save(0, &info(1.0, 1.0, 0.0, UpdateStatus::Ordinary));
        assert!(ped.likelihood().unwrap().is_legacy());
    }
}
