//! Transition equation `a[t+1] = T(t) a[t] + u[t]`, `u[t] ~ N(0, V(t))`.

use std::fmt;

use ndarray::{Array2, ArrayViewMut1, ArrayViewMut2};
use ssf_linalg::{LinalgError, cholesky_semidefinite, mul_vec_in_place, symmetrize};

use crate::error::ModelError;

/// Transition part of a state-space model.
///
/// Implementations are pure functions of the position and of immutable
/// parameters: a single instance is shared read-only by every filter run
/// over the model, including runs on other threads.
pub trait Dynamics: Send + Sync + fmt::Debug {
    /// Dimension of the state vector.
    fn state_dim(&self) -> usize;

    /// Whether `T` and `V` are the same for every position.
    fn is_time_invariant(&self) -> bool;

    /// Number of positions the dynamics are defined for (`None` = unbounded).
    fn horizon(&self) -> Option<usize> {
        None
    }

    /// `x <- T(pos) x`.
    fn tx(&self, pos: usize, x: ArrayViewMut1<'_, f64>);

    /// Innovation covariance `V(pos)`.
    fn v(&self, pos: usize) -> Array2<f64>;

    /// `m <- T(pos) m`, column by column.
    fn tm(&self, pos: usize, mut m: ArrayViewMut2<'_, f64>) {
        for col in m.columns_mut() {
            self.tx(pos, col);
        }
    }

    /// `m <- T(pos) m T(pos)ᵀ` for a symmetric `m`.
    fn tvt(&self, pos: usize, m: &mut Array2<f64>) {
        self.tm(pos, m.view_mut());
        let mut mt = m.t().to_owned();
        self.tm(pos, mt.view_mut());
        symmetrize(mt.view_mut());
        *m = mt;
    }

    /// `p <- p + V(pos)`.
    fn add_v(&self, pos: usize, mut p: ArrayViewMut2<'_, f64>) {
        p += &self.v(pos);
    }

    /// A factor `S` with `S Sᵀ = V(pos)`, used by square-root filters.
    fn v_factor(&self, pos: usize) -> Result<Array2<f64>, LinalgError> {
        cholesky_semidefinite(self.v(pos).view())
    }

    /// Materialises `T(pos)` by transforming the unit vectors.
    fn t_matrix(&self, pos: usize) -> Array2<f64> {
        let mut t = Array2::eye(self.state_dim());
        self.tm(pos, t.view_mut());
        t
    }
}

fn check_square(what: &'static str, m: &Array2<f64>, dim: usize) -> Result<(), ModelError> {
    if m.nrows() != dim {
        return Err(ModelError::DimensionMismatch {
            what,
            expected: dim,
            got: m.nrows(),
        });
    }
    if m.ncols() != dim {
        return Err(ModelError::DimensionMismatch {
            what,
            expected: dim,
            got: m.ncols(),
        });
    }
    Ok(())
}

/// Time-invariant dynamics with explicit `T` and `V`.
///
/// The factor of `V` is computed once at construction.
#[derive(Clone, Debug)]
pub struct ConstantDynamics {
    t: Array2<f64>,
    v: Array2<f64>,
    v_factor: Array2<f64>,
}

impl ConstantDynamics {
    /// Creates dynamics from a square transition matrix and a symmetric
    /// positive semidefinite innovation covariance of the same size.
    ///
    /// # Errors
    ///
    /// | Variant | Trigger |
    /// |---------|---------|
    /// | [`ModelError::EmptyState`] | `t` is 0×0 |
    /// | [`ModelError::DimensionMismatch`] | `t` or `v` is not `n×n` |
    /// | [`ModelError::Linalg`] | `v` is not positive semidefinite |
    pub fn new(t: Array2<f64>, v: Array2<f64>) -> Result<Self, ModelError> {
        let dim = t.nrows();
        if dim == 0 {
            return Err(ModelError::EmptyState);
        }
        check_square("transition matrix", &t, dim)?;
        check_square("innovation covariance", &v, dim)?;
        let v_factor = cholesky_semidefinite(v.view())?;
        Ok(Self { t, v, v_factor })
    }

    /// Transition matrix `T`.
    pub fn t(&self) -> &Array2<f64> {
        &self.t
    }
}

impl Dynamics for ConstantDynamics {
    fn state_dim(&self) -> usize {
        self.t.nrows()
    }

    fn is_time_invariant(&self) -> bool {
        true
    }

    fn tx(&self, _pos: usize, x: ArrayViewMut1<'_, f64>) {
        mul_vec_in_place(self.t.view(), x);
    }

    fn v(&self, _pos: usize) -> Array2<f64> {
        self.v.clone()
    }

    fn add_v(&self, _pos: usize, mut p: ArrayViewMut2<'_, f64>) {
        p += &self.v;
    }

    fn v_factor(&self, _pos: usize) -> Result<Array2<f64>, LinalgError> {
        Ok(self.v_factor.clone())
    }

    fn t_matrix(&self, _pos: usize) -> Array2<f64> {
        self.t.clone()
    }
}

/// Dynamics with one `(T, V)` pair per position.
#[derive(Clone, Debug)]
pub struct VaryingDynamics {
    periods: Vec<ConstantDynamics>,
}

impl VaryingDynamics {
    /// Creates time-varying dynamics from per-period matrices.
    ///
    /// # Errors
    ///
    /// | Variant | Trigger |
    /// |---------|---------|
    /// | [`ModelError::EmptyHorizon`] | no periods were given |
    /// | [`ModelError::DimensionMismatch`] | `t` and `v` differ in length, or a period has a different size |
    /// | [`ModelError::Linalg`] | some `V` is not positive semidefinite |
    pub fn new(t: Vec<Array2<f64>>, v: Vec<Array2<f64>>) -> Result<Self, ModelError> {
        if t.is_empty() {
            return Err(ModelError::EmptyHorizon { what: "dynamics" });
        }
        if t.len() != v.len() {
            return Err(ModelError::DimensionMismatch {
                what: "innovation covariance periods",
                expected: t.len(),
                got: v.len(),
            });
        }
        let dim = t[0].nrows();
        let periods = t
            .into_iter()
            .zip(v)
            .map(|(t, v)| {
                check_square("transition matrix", &t, dim)?;
                ConstantDynamics::new(t, v)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { periods })
    }

    fn period(&self, pos: usize) -> &ConstantDynamics {
        &self.periods[pos.min(self.periods.len() - 1)]
    }
}

impl Dynamics for VaryingDynamics {
    fn state_dim(&self) -> usize {
        self.periods[0].state_dim()
    }

    fn is_time_invariant(&self) -> bool {
        false
    }

    fn horizon(&self) -> Option<usize> {
        Some(self.periods.len())
    }

    fn tx(&self, pos: usize, x: ArrayViewMut1<'_, f64>) {
        self.period(pos).tx(pos, x);
    }

    fn v(&self, pos: usize) -> Array2<f64> {
        self.period(pos).v(pos)
    }

    fn add_v(&self, pos: usize, p: ArrayViewMut2<'_, f64>) {
        self.period(pos).add_v(pos, p);
    }

    fn v_factor(&self, pos: usize) -> Result<Array2<f64>, LinalgError> {
        self.period(pos).v_factor(pos)
    }

    fn t_matrix(&self, pos: usize) -> Array2<f64> {
        self.period(pos).t_matrix(pos)
    }
}
