//! Marginal likelihood: the diffuse likelihood corrected for the scaling of
//! the diffuse constraint basis.

use ndarray::ArrayView2;
use ssf_linalg::cholesky_semidefinite;

use crate::diffuse::DiffuseLikelihood;
use crate::error::LikelihoodError;

/// Diffuse likelihood plus the correction `mcorr = ln |Bᵀ B|`.
///
/// The diffuse correction `dcorr` shifts by `ln |A|²` when the constraint
/// basis `B` is replaced by `B A`; `mcorr` shifts by the same amount, so
/// `ll + ½ mcorr` does not depend on how the diffuse directions are
/// parameterised.
#[derive(Clone, Debug, PartialEq)]
pub struct MarginalLikelihood {
    diffuse: DiffuseLikelihood,
    mcorr: f64,
}

impl MarginalLikelihood {
    /// Combines a diffuse likelihood with a known correction.
    pub fn new(diffuse: DiffuseLikelihood, mcorr: f64) -> Self {
        Self { diffuse, mcorr }
    }

    /// Computes `mcorr` from the constraint basis (`state_dim × d`).
    ///
    /// # Errors
    ///
    /// Returns [`LikelihoodError::NonFinite`] when `Bᵀ B` is singular (the
    /// basis is rank deficient).
    pub fn from_basis(diffuse: DiffuseLikelihood, basis: ArrayView2<'_, f64>) -> Result<Self, LikelihoodError> {
        let btb = basis.t().dot(&basis);
        let l = cholesky_semidefinite(btb.view()).map_err(|_| LikelihoodError::NonFinite {
            what: "basis correction",
            value: f64::NAN,
        })?;
        let mcorr: f64 = (0..l.nrows()).map(|i| 2.0 * l[[i, i]].ln()).sum();
        if !mcorr.is_finite() {
            return Err(LikelihoodError::NonFinite {
                what: "basis correction",
                value: mcorr,
            });
        }
        Ok(Self { diffuse, mcorr })
    }

    /// Marginal log-likelihood `ll + ½ mcorr`.
    pub fn log_likelihood(&self) -> f64 {
        self.diffuse.log_likelihood() + 0.5 * self.mcorr
    }

    /// Basis correction `ln |Bᵀ B|`.
    pub fn marginal_correction(&self) -> f64 {
        self.mcorr
    }

    /// The underlying diffuse likelihood.
    pub fn diffuse(&self) -> &DiffuseLikelihood {
        &self.diffuse
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array2, array};

    #[test]
    fn identity_basis_has_no_correction() {
        let ll = DiffuseLikelihood::set(3.0, 1.0, 0.4, 5, 2).unwrap();
        let marginal = MarginalLikelihood::from_basis(ll.clone(), Array2::<f64>::eye(2).view()).unwrap();
        assert_abs_diff_eq!(marginal.marginal_correction(), 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(marginal.log_likelihood(), ll.log_likelihood(), epsilon = 1e-15);
    }

    #[test]
    fn scaled_basis_correction() {
        let ll = DiffuseLikelihood::set(3.0, 1.0, 0.4, 5, 1).unwrap();
        let marginal = MarginalLikelihood::from_basis(ll, array![[2.0], [0.0]].view()).unwrap();
        assert_abs_diff_eq!(marginal.marginal_correction(), 4.0_f64.ln(), epsilon = 1e-14);
    }

    #[test]
    fn rank_deficient_basis_fails() {
        let ll = DiffuseLikelihood::set(3.0, 1.0, 0.4, 5, 2).unwrap();
        assert!(MarginalLikelihood::from_basis(ll, array![[1.0, 1.0], [0.0, 0.0]].view()).is_err());
    }
}
