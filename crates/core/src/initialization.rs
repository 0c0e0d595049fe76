//! Initial conditions of the state vector.

use ndarray::{Array1, Array2, ArrayView2};
use ssf_linalg::{LinalgError, solve_lu, symmetrize};

use crate::dynamics::Dynamics;
use crate::error::ModelError;

/// Distribution of the initial state `a[0]`.
///
/// A diffuse initialisation writes the initial state as
/// `a[0] = a0 + B δ + η`, with `η ~ N(0, P*)` and `δ` an unknown vector of
/// dimension `d` (flat prior). `B` is the *constraint basis*; the diffuse
/// covariance is `P∞ = B Bᵀ`.
#[derive(Clone, Debug, PartialEq)]
pub enum Initialization {
    /// Fully specified mean and covariance.
    Stationary {
        /// Initial mean.
        a0: Array1<f64>,
        /// Initial covariance.
        p0: Array2<f64>,
    },
    /// Partially or fully unknown initial state.
    Diffuse {
        /// Mean of the known part.
        a0: Array1<f64>,
        /// Covariance of the known part (`P*`).
        pstar: Array2<f64>,
        /// Constraint basis `B` (state_dim × d).
        basis: Array2<f64>,
    },
}

impl Initialization {
    /// Stationary initialisation from an explicit mean and covariance.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DimensionMismatch`] when `p0` is not `n×n`.
    pub fn stationary(a0: Array1<f64>, p0: Array2<f64>) -> Result<Self, ModelError> {
        let init = Self::Stationary { a0, p0 };
        init.validate(init.state_dim())?;
        Ok(init)
    }

    /// Diffuse initialisation. A basis with no columns yields a stationary
    /// initialisation.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DimensionMismatch`] when `pstar` or `basis` do
    /// not have `a0.len()` rows, or when the basis has more columns than rows.
    pub fn diffuse(
        a0: Array1<f64>,
        pstar: Array2<f64>,
        basis: Array2<f64>,
    ) -> Result<Self, ModelError> {
        let init = if basis.ncols() == 0 {
            Self::Stationary { a0, p0: pstar }
        } else {
            Self::Diffuse { a0, pstar, basis }
        };
        init.validate(init.state_dim())?;
        Ok(init)
    }

    /// Every state component diffuse: `a0 = 0`, `P* = 0`, `B = I`.
    pub fn fully_diffuse(dim: usize) -> Self {
        Self::Diffuse {
            a0: Array1::zeros(dim),
            pstar: Array2::zeros((dim, dim)),
            basis: Array2::eye(dim),
        }
    }

    /// Stationary initialisation with zero mean and the unconditional
    /// covariance of the dynamics at position 0.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NonStationary`] when the dynamics have a root on
    /// or outside the unit circle.
    pub fn stationary_for(dynamics: &dyn Dynamics) -> Result<Self, ModelError> {
        let t = dynamics.t_matrix(0);
        let v = dynamics.v(0);
        let p0 = solve_lyapunov(t.view(), v.view())?;
        Ok(Self::Stationary {
            a0: Array1::zeros(t.nrows()),
            p0,
        })
    }

    /// Dimension of the state vector.
    pub fn state_dim(&self) -> usize {
        self.a0().len()
    }

    /// Number of diffuse directions `d`.
    pub fn diffuse_dim(&self) -> usize {
        match self {
            Self::Stationary { .. } => 0,
            Self::Diffuse { basis, .. } => basis.ncols(),
        }
    }

    /// Whether the initialisation has a diffuse part.
    pub fn is_diffuse(&self) -> bool {
        self.diffuse_dim() > 0
    }

    /// Initial mean.
    pub fn a0(&self) -> &Array1<f64> {
        match self {
            Self::Stationary { a0, .. } | Self::Diffuse { a0, .. } => a0,
        }
    }

    /// Covariance of the non-diffuse part (`P0` or `P*`).
    pub fn pstar(&self) -> &Array2<f64> {
        match self {
            Self::Stationary { p0, .. } => p0,
            Self::Diffuse { pstar, .. } => pstar,
        }
    }

    /// Constraint basis `B`, if any.
    pub fn basis(&self) -> Option<&Array2<f64>> {
        match self {
            Self::Stationary { .. } => None,
            Self::Diffuse { basis, .. } => Some(basis),
        }
    }

    /// Diffuse covariance `P∞ = B Bᵀ` (zero when stationary).
    pub fn pinf(&self) -> Array2<f64> {
        match self.basis() {
            Some(b) => b.dot(&b.t()),
            None => {
                let n = self.state_dim();
                Array2::zeros((n, n))
            }
        }
    }

    pub(crate) fn validate(&self, dim: usize) -> Result<(), ModelError> {
        if dim == 0 {
            return Err(ModelError::EmptyState);
        }
        if self.a0().len() != dim {
            return Err(ModelError::DimensionMismatch {
                what: "initial mean",
                expected: dim,
                got: self.a0().len(),
            });
        }
        let p = self.pstar();
        if p.dim() != (dim, dim) {
            return Err(ModelError::DimensionMismatch {
                what: "initial covariance",
                expected: dim,
                got: if p.nrows() != dim { p.nrows() } else { p.ncols() },
            });
        }
        if let Some(b) = self.basis() {
            if b.nrows() != dim {
                return Err(ModelError::DimensionMismatch {
                    what: "diffuse basis",
                    expected: dim,
                    got: b.nrows(),
                });
            }
            if b.ncols() > dim {
                return Err(ModelError::DimensionMismatch {
                    what: "diffuse basis columns",
                    expected: dim,
                    got: b.ncols(),
                });
            }
        }
        Ok(())
    }
}

/// Solves the discrete Lyapunov equation `P = T P Tᵀ + V`.
///
/// Uses the Kronecker form `vec(P) = (I − T ⊗ T)⁻¹ vec(V)`, which is
/// adequate for the small state dimensions of stationary components.
///
/// # Errors
///
/// | Variant | Trigger |
/// |---------|---------|
/// | [`ModelError::DimensionMismatch`] | `t` and `v` are not both `n×n` |
/// | [`ModelError::NonStationary`] | `I − T ⊗ T` is singular, or the solution is not a covariance |
pub fn solve_lyapunov(t: ArrayView2<'_, f64>, v: ArrayView2<'_, f64>) -> Result<Array2<f64>, ModelError> {
    let k = t.nrows();
    if t.ncols() != k || v.dim() != (k, k) {
        return Err(ModelError::DimensionMismatch {
            what: "lyapunov operands",
            expected: k,
            got: v.nrows(),
        });
    }
    let kk = k * k;
    let mut lhs = Array2::<f64>::eye(kk);
    for i in 0..k {
        for j in 0..k {
            for a in 0..k {
                let t_ia = t[[i, a]];
                if t_ia == 0.0 {
                    continue;
                }
                for b in 0..k {
                    lhs[[i * k + j, a * k + b]] -= t_ia * t[[j, b]];
                }
            }
        }
    }
    let rhs = Array1::from_iter(v.iter().copied());
    let sol = solve_lu(lhs.view(), rhs.view()).map_err(|e| match e {
        LinalgError::Singular { .. } => ModelError::NonStationary,
        other => ModelError::Linalg(other),
    })?;

    let mut p = Array2::from_shape_vec((k, k), sol.to_vec())
        .map_err(|_| ModelError::DimensionMismatch {
            what: "lyapunov solution",
            expected: kk,
            got: sol.len(),
        })?;
    symmetrize(p.view_mut());
    if p.iter().any(|x| !x.is_finite()) || (0..k).any(|i| p[[i, i]] < -1e-10) {
        return Err(ModelError::NonStationary);
    }
    Ok(p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::ConstantDynamics;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn lyapunov_ar1() {
        let p = solve_lyapunov(array![[0.5]].view(), array![[1.0]].view()).unwrap();
        assert_abs_diff_eq!(p[[0, 0]], 1.0 / 0.75, epsilon = 1e-12);
    }

    #[test]
    fn lyapunov_satisfies_equation() {
        let t = array![[0.5, 1.0], [-0.3, 0.0]];
        let v = array![[1.0, 0.4], [0.4, 0.16]];
        let p = solve_lyapunov(t.view(), v.view()).unwrap();
        let back = t.dot(&p).dot(&t.t()) + &v;
        for (a, b) in back.iter().zip(p.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn lyapunov_unit_root_fails() {
        let err = solve_lyapunov(array![[1.0]].view(), array![[1.0]].view()).unwrap_err();
        assert_eq!(err, ModelError::NonStationary);
    }

    #[test]
    fn stationary_for_dynamics() {
        let dyn_ = ConstantDynamics::new(array![[0.8]], array![[0.36]]).unwrap();
        let init = Initialization::stationary_for(&dyn_).unwrap();
        assert_eq!(init.diffuse_dim(), 0);
        assert_abs_diff_eq!(init.pstar()[[0, 0]], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn fully_diffuse_layout() {
        let init = Initialization::fully_diffuse(2);
        assert_eq!(init.diffuse_dim(), 2);
        assert!(init.is_diffuse());
        assert_eq!(init.pinf(), Array2::<f64>::eye(2));
        assert_eq!(init.pstar(), &Array2::<f64>::zeros((2, 2)));
    }

    #[test]
    fn empty_basis_is_stationary() {
        let init =
            Initialization::diffuse(Array1::zeros(2), Array2::eye(2), Array2::zeros((2, 0))).unwrap();
        assert!(matches!(init, Initialization::Stationary { .. }));
    }

    #[test]
    fn rejects_mismatched_basis() {
        let err = Initialization::diffuse(Array1::zeros(2), Array2::eye(2), Array2::eye(3))
            .unwrap_err();
        assert!(matches!(
            err,
            ModelError::DimensionMismatch { what: "diffuse basis", .. }
        ));
    }

    #[test]
    fn rejects_mismatched_covariance() {
        assert!(Initialization::stationary(Array1::zeros(2), Array2::eye(3)).is_err());
    }
}
