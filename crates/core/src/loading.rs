//! Measurement loading `y[t] = Z(t) a[t] + e[t]` for univariate observations.

use std::fmt;

use ndarray::{Array1, ArrayView1, ArrayView2, ArrayViewMut1};

use crate::error::ModelError;

/// Loading (`Z`) part of a state-space model.
///
/// Like [`Dynamics`](crate::Dynamics), implementations must be re-entrant.
pub trait Loading: Send + Sync + fmt::Debug {
    /// Dimension of the state vector.
    fn state_dim(&self) -> usize;

    /// Whether `Z` is the same for every position.
    fn is_time_invariant(&self) -> bool;

    /// Number of positions the loading is defined for (`None` = unbounded).
    fn horizon(&self) -> Option<usize> {
        None
    }

    /// `Z(pos) · x`.
    fn zx(&self, pos: usize, x: ArrayView1<'_, f64>) -> f64;

    /// `out[j] = Z(pos) · m[:, j]`.
    fn zm(&self, pos: usize, m: ArrayView2<'_, f64>, mut out: ArrayViewMut1<'_, f64>) {
        for (j, col) in m.columns().into_iter().enumerate() {
            out[j] = self.zx(pos, col);
        }
    }

    /// `Z(pos) V Z(pos)ᵀ` for a symmetric `v`.
    fn zvz(&self, pos: usize, v: ArrayView2<'_, f64>) -> f64 {
        let mut zv = Array1::zeros(v.ncols());
        self.zm(pos, v, zv.view_mut());
        self.zx(pos, zv.view())
    }
}

/// Time-invariant loading vector.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstantLoading {
    z: Array1<f64>,
}

impl ConstantLoading {
    /// Creates a loading from the row vector `Z`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptyState`] when `z` is empty.
    pub fn new(z: Array1<f64>) -> Result<Self, ModelError> {
        if z.is_empty() {
            return Err(ModelError::EmptyState);
        }
        Ok(Self { z })
    }

    /// Loading that observes the `index`-th state component directly.
    pub fn unit(dim: usize, index: usize) -> Result<Self, ModelError> {
        if index >= dim {
            return Err(ModelError::DimensionMismatch {
                what: "unit loading index",
                expected: dim,
                got: index,
            });
        }
        let mut z = Array1::zeros(dim);
        z[index] = 1.0;
        Self::new(z)
    }

    /// The loading vector.
    pub fn z(&self) -> &Array1<f64> {
        &self.z
    }
}

impl Loading for ConstantLoading {
    fn state_dim(&self) -> usize {
        self.z.len()
    }

    fn is_time_invariant(&self) -> bool {
        true
    }

    fn zx(&self, _pos: usize, x: ArrayView1<'_, f64>) -> f64 {
        self.z.dot(&x)
    }
}

/// Loading with one vector per position (regression-type models).
#[derive(Clone, Debug, PartialEq)]
pub struct VaryingLoading {
    z: Vec<Array1<f64>>,
}

impl VaryingLoading {
    /// Creates a time-varying loading.
    ///
    /// # Errors
    ///
    /// | Variant | Trigger |
    /// |---------|---------|
    /// | [`ModelError::EmptyHorizon`] | `z` is empty |
    /// | [`ModelError::EmptyState`] | the vectors are empty |
    /// | [`ModelError::DimensionMismatch`] | the vectors differ in length |
    pub fn new(z: Vec<Array1<f64>>) -> Result<Self, ModelError> {
        let Some(first) = z.first() else {
            return Err(ModelError::EmptyHorizon { what: "loading" });
        };
        let dim = first.len();
        if dim == 0 {
            return Err(ModelError::EmptyState);
        }
        if let Some(bad) = z.iter().find(|row| row.len() != dim) {
            return Err(ModelError::DimensionMismatch {
                what: "loading",
                expected: dim,
                got: bad.len(),
            });
        }
        Ok(Self { z })
    }

    fn row(&self, pos: usize) -> &Array1<f64> {
        &self.z[pos.min(self.z.len() - 1)]
    }
}

impl Loading for VaryingLoading {
    fn state_dim(&self) -> usize {
        self.z[0].len()
    }

    fn is_time_invariant(&self) -> bool {
        false
    }

    fn horizon(&self) -> Option<usize> {
        Some(self.z.len())
    }

    fn zx(&self, pos: usize, x: ArrayView1<'_, f64>) -> f64 {
        self.row(pos).dot(&x)
    }
}
