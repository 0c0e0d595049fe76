//! Canonical state-space forms.
//!
//! The ARMA(p,q) form is the companion representation
//!
//! ```text
//! x[t+1] = T * x[t] + R * e[t]
//! y[t]   = x[t][0]
//! ```
//!
//! with `T` holding the AR coefficients in its first column and ones on the
//! super-diagonal, and `R = [1, θ₁, …, θ_q, 0, …]`.

use ndarray::{Array1, Array2, Axis, array};

use crate::dynamics::ConstantDynamics;
use crate::error::ModelError;
use crate::initialization::{Initialization, solve_lyapunov};
use crate::loading::ConstantLoading;
use crate::measurement::ConstantError;
use crate::ssf::Ssf;

fn check_variance(what: &'static str, value: f64) -> Result<(), ModelError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ModelError::InvalidVariance { what, value });
    }
    Ok(())
}

/// Random walk plus noise: `T = 1`, `Z = 1`, `V = level_var`,
/// `H = noise_var`, with a diffuse initial level.
///
/// # Errors
///
/// Returns [`ModelError::InvalidVariance`] for a negative or non-finite
/// variance.
pub fn local_level(level_var: f64, noise_var: f64) -> Result<Ssf, ModelError> {
    check_variance("level variance", level_var)?;
    let ssf = Ssf::new(
        ConstantDynamics::new(array![[1.0]], array![[level_var]])?,
        ConstantLoading::unit(1, 0)?,
        Initialization::fully_diffuse(1),
    )?;
    Ok(ssf.with_measurement_error(ConstantError::new(noise_var)?))
}

/// Level and slope random walks plus noise, both diffuse.
///
/// # Errors
///
/// Returns [`ModelError::InvalidVariance`] for a negative or non-finite
/// variance.
pub fn local_linear_trend(level_var: f64, slope_var: f64, noise_var: f64) -> Result<Ssf, ModelError> {
    check_variance("level variance", level_var)?;
    check_variance("slope variance", slope_var)?;
    let ssf = Ssf::new(
        ConstantDynamics::new(
            array![[1.0, 1.0], [0.0, 1.0]],
            array![[level_var, 0.0], [0.0, slope_var]],
        )?,
        ConstantLoading::unit(2, 0)?,
        Initialization::fully_diffuse(2),
    )?;
    Ok(ssf.with_measurement_error(ConstantError::new(noise_var)?))
}

/// Companion matrices `(T, R)` of an ARMA(p,q) process, with state dimension
/// `r = max(p, q+1)`.
pub fn arma_companion(ar: &[f64], ma: &[f64]) -> (Array2<f64>, Array1<f64>) {
    let p = ar.len();
    let q = ma.len();
    let r = p.max(q + 1);

    let mut t = Array2::zeros((r, r));
    for (i, &phi) in ar.iter().enumerate() {
        t[[i, 0]] = phi;
    }
    for i in 0..r - 1 {
        t[[i, i + 1]] = 1.0;
    }

    let mut r_vec = Array1::zeros(r);
    r_vec[0] = 1.0;
    for (j, &theta) in ma.iter().enumerate() {
        r_vec[j + 1] = theta;
    }
    (t, r_vec)
}

/// Stationary ARMA(p,q) with innovation variance `sigma2`, initialised with
/// its unconditional covariance.
///
/// # Errors
///
/// | Variant | Trigger |
/// |---------|---------|
/// | [`ModelError::InvalidVariance`] | `sigma2` is negative or non-finite |
/// | [`ModelError::NonStationary`] | the AR polynomial has a root on or inside the unit circle |
pub fn arma(ar: &[f64], ma: &[f64], sigma2: f64) -> Result<Ssf, ModelError> {
    check_variance("innovation variance", sigma2)?;
    let (t, r_vec) = arma_companion(ar, ma);
    let r_col = r_vec.view().insert_axis(Axis(1));
    let v = r_col.dot(&r_col.t()) * sigma2;
    let p0 = solve_lyapunov(t.view(), v.view())?;
    let dim = t.nrows();
    Ssf::new(
        ConstantDynamics::new(t, v)?,
        ConstantLoading::unit(dim, 0)?,
        Initialization::stationary(Array1::zeros(dim), p0)?,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn companion_ar1() {
        let (t, r) = arma_companion(&[0.5], &[]);
        assert_eq!(t, array![[0.5]]);
        assert_eq!(r, array![1.0]);
    }

    #[test]
    fn companion_ma1() {
        let (t, r) = arma_companion(&[], &[0.8]);
        assert_eq!(t, array![[0.0, 1.0], [0.0, 0.0]]);
        assert_eq!(r, array![1.0, 0.8]);
    }

    #[test]
    fn companion_arma22() {
        let (t, r) = arma_companion(&[0.5, -0.3], &[0.4, 0.2]);
        assert_eq!(
            t,
            array![[0.5, 1.0, 0.0], [-0.3, 0.0, 1.0], [0.0, 0.0, 0.0]]
        );
        assert_eq!(r, array![1.0, 0.4, 0.2]);
    }

    #[test]
    fn companion_arma00() {
        let (t, r) = arma_companion(&[], &[]);
        assert_eq!(t, array![[0.0]]);
        assert_eq!(r, array![1.0]);
    }

    #[test]
    fn ar1_unconditional_variance() {
        let ssf = arma(&[0.6], &[], 2.0).unwrap();
        assert_eq!(ssf.diffuse_dim(), 0);
        assert_abs_diff_eq!(
            ssf.initialization().pstar()[[0, 0]],
            2.0 / (1.0 - 0.36),
            epsilon = 1e-12
        );
    }

    #[test]
    fn ma1_unconditional_variance() {
        // Var(y) = σ²(1 + θ²)
        let ssf = arma(&[], &[0.4], 1.0).unwrap();
        assert_abs_diff_eq!(ssf.initialization().pstar()[[0, 0]], 1.16, epsilon = 1e-12);
    }

    #[test]
    fn arma_rejects_unit_root() {
        assert_eq!(arma(&[1.0], &[], 1.0).unwrap_err(), ModelError::NonStationary);
    }

    #[test]
    fn structural_models() {
        let ll = local_level(0.5, 1.0).unwrap();
        assert_eq!(ll.state_dim(), 1);
        assert_eq!(ll.diffuse_dim(), 1);
        assert!(ll.is_time_invariant());

        let llt = local_linear_trend(0.1, 0.01, 1.0).unwrap();
        assert_eq!(llt.state_dim(), 2);
        assert_eq!(llt.diffuse_dim(), 2);
        assert_eq!(llt.error_variance(0), 1.0);
    }

    #[test]
    fn rejects_negative_variance() {
        assert!(matches!(
            local_level(-1.0, 1.0),
            Err(ModelError::InvalidVariance { .. })
        ));
        assert!(matches!(
            local_linear_trend(1.0, 1.0, -1.0),
            Err(ModelError::InvalidVariance { .. })
        ));
    }
}
