//! Concentrated diffuse log-likelihood.

use std::f64::consts::PI;

use crate::error::LikelihoodError;

/// Gaussian log-likelihood with the scale concentrated out and the diffuse
/// initial conditions integrated out.
///
/// Built from five statistics of a prediction error decomposition:
///
/// | Statistic | Accessor | Meaning |
/// |-----------|----------|---------|
/// | ssq | [`Self::ssq_err`] | `Σ e²/f` |
/// | ldet | [`Self::log_determinant`] | `Σ ln f` |
/// | dcorr | [`Self::diffuse_correction`] | log-determinant of the diffuse information |
/// | n | [`Self::n`] | number of observations used |
/// | d | [`Self::d`] | diffuse dimension |
///
/// With `m = n − d` (or `m = n` in legacy mode):
///
/// ```text
/// ll = −½ (m ln 2π + m (1 + ln(ssq/m)) + ldet + dcorr)
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct DiffuseLikelihood {
    ssq: f64,
    ldet: f64,
    dcorr: f64,
    n: usize,
    d: usize,
    legacy: bool,
    ll: f64,
    residuals: Option<Vec<f64>>,
}

fn check_finite(what: &'static str, value: f64) -> Result<(), LikelihoodError> {
    if !value.is_finite() {
        return Err(LikelihoodError::NonFinite { what, value });
    }
    Ok(())
}

impl DiffuseLikelihood {
    /// Computes the likelihood from the raw statistics.
    ///
    /// # Errors
    ///
    /// | Variant | Trigger |
    /// |---------|---------|
    /// | [`LikelihoodError::DiffuseCorrectionWithoutDiffuse`] | `d == 0` and `dcorr != 0` |
    /// | [`LikelihoodError::NoDegreesOfFreedom`] | `n <= d` |
    /// | [`LikelihoodError::DegenerateScale`] | `ssq <= 0` |
    /// | [`LikelihoodError::NonFinite`] | a statistic is `NaN` or infinite |
    pub fn set(ssq: f64, ldet: f64, dcorr: f64, n: usize, d: usize) -> Result<Self, LikelihoodError> {
        Self::compute(ssq, ldet, dcorr, n, d, false, None)
    }

    fn compute(
        ssq: f64,
        ldet: f64,
        dcorr: f64,
        n: usize,
        d: usize,
        legacy: bool,
        residuals: Option<Vec<f64>>,
    ) -> Result<Self, LikelihoodError> {
        check_finite("sum of squares", ssq)?;
        check_finite("log-determinant", ldet)?;
        check_finite("diffuse correction", dcorr)?;
        if d == 0 && dcorr != 0.0 {
            return Err(LikelihoodError::DiffuseCorrectionWithoutDiffuse { dcorr });
        }
        if n <= d {
            return Err(LikelihoodError::NoDegreesOfFreedom { n, d });
        }
        if ssq <= 0.0 {
            return Err(LikelihoodError::DegenerateScale { ssq });
        }
        let m = if legacy { n } else { n - d } as f64;
        let ll = -0.5 * (m * (2.0 * PI).ln() + m * (1.0 + (ssq / m).ln()) + ldet + dcorr);
        Ok(Self {
            ssq,
            ldet,
            dcorr,
            n,
            d,
            legacy,
            ll,
            residuals,
        })
    }

    /// Recomputes the likelihood with `m = n` (legacy) or `m = n − d`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::set`].
    pub fn with_legacy_dof(self, legacy: bool) -> Result<Self, LikelihoodError> {
        Self::compute(self.ssq, self.ldet, self.dcorr, self.n, self.d, legacy, self.residuals)
    }

    /// Attaches standardized residuals `e/√f` of the ordinary steps.
    pub fn with_residuals(mut self, residuals: Vec<f64>) -> Self {
        self.residuals = Some(residuals);
        self
    }

    /// Likelihood of the data divided by `factor`: `ssq / factor²` and
    /// `ll + m ln factor`.
    ///
    /// # Errors
    ///
    /// Returns [`LikelihoodError::InvalidScale`] unless `factor` is positive
    /// and finite.
    pub fn rescale(&self, factor: f64) -> Result<Self, LikelihoodError> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(LikelihoodError::InvalidScale { factor });
        }
        let m = self.degrees_of_freedom() as f64;
        let mut out = self.clone();
        out.ssq /= factor * factor;
        out.ll += m * factor.ln();
        if let Some(residuals) = out.residuals.as_mut() {
            residuals.iter_mut().for_each(|x| *x /= factor);
        }
        Ok(out)
    }

    /// Likelihood of two disjoint sets of observations: statistics are
    /// summed and the likelihood recomputed.
    ///
    /// # Errors
    ///
    /// | Variant | Trigger |
    /// |---------|---------|
    /// | [`LikelihoodError::LegacyMismatch`] | the two use different conventions |
    /// | other | see [`Self::set`] |
    pub fn add(&self, other: &Self) -> Result<Self, LikelihoodError> {
        if self.legacy != other.legacy {
            return Err(LikelihoodError::LegacyMismatch);
        }
        let residuals = match (&self.residuals, &other.residuals) {
            (Some(a), Some(b)) => Some(a.iter().chain(b).copied().collect()),
            _ => None,
        };
        Self::compute(
            self.ssq + other.ssq,
            self.ldet + other.ldet,
            self.dcorr + other.dcorr,
            self.n + other.n,
            self.d + other.d,
            self.legacy,
            residuals,
        )
    }

    /// Log-likelihood.
    pub fn log_likelihood(&self) -> f64 {
        self.ll
    }

    /// Sum of squared standardized prediction errors.
    pub fn ssq_err(&self) -> f64 {
        self.ssq
    }

    /// Sum of the log prediction error variances.
    pub fn log_determinant(&self) -> f64 {
        self.ldet
    }

    /// Diffuse correction.
    pub fn diffuse_correction(&self) -> f64 {
        self.dcorr
    }

    /// Number of observations used.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Diffuse dimension.
    pub fn d(&self) -> usize {
        self.d
    }

    /// Whether `m = n` is used instead of `m = n − d`.
    pub fn is_legacy(&self) -> bool {
        self.legacy
    }

    /// Effective number of observations `m`.
    pub fn degrees_of_freedom(&self) -> usize {
        if self.legacy { self.n } else { self.n - self.d }
    }

    /// Maximum likelihood estimate of the scale, `ssq / m`.
    pub fn sigma2(&self) -> f64 {
        self.ssq / self.degrees_of_freedom() as f64
    }

    /// `√sigma2`.
    pub fn sigma(&self) -> f64 {
        self.sigma2().sqrt()
    }

    /// Determinantal factor `exp((ldet + dcorr) / m)`, the geometric mean of
    /// the prediction error variances.
    pub fn factor(&self) -> f64 {
        ((self.ldet + self.dcorr) / self.degrees_of_freedom() as f64).exp()
    }

    /// Akaike Information Criterion `2k − 2 ll` for `k` estimated parameters
    /// (the concentrated scale included by the caller if wanted).
    pub fn aic(&self, k: usize) -> f64 {
        2.0 * k as f64 - 2.0 * self.ll
    }

    /// Bayesian Information Criterion `k ln m − 2 ll`.
    pub fn bic(&self, k: usize) -> f64 {
        k as f64 * (self.degrees_of_freedom() as f64).ln() - 2.0 * self.ll
    }

    /// Standardized residuals, when they were retained.
    pub fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }
}
