//! Mutable state containers owned by one filter run.

use ndarray::{Array1, Array2, s};

use crate::error::ModelError;
use crate::initialization::Initialization;

/// Mean `a` and covariance `P` of the state vector.
#[derive(Clone, Debug, PartialEq)]
pub struct State {
    a: Array1<f64>,
    p: Array2<f64>,
}

impl State {
    /// Builds a state from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DimensionMismatch`] when `p` is not `n×n`.
    pub fn from_parts(a: Array1<f64>, p: Array2<f64>) -> Result<Self, ModelError> {
        let n = a.len();
        if p.dim() != (n, n) {
            return Err(ModelError::DimensionMismatch {
                what: "state covariance",
                expected: n,
                got: p.nrows(),
            });
        }
        Ok(Self { a, p })
    }

    /// Initial state of a run: `a0` and `P0` (or `P*` for diffuse
    /// initialisations).
    pub fn from_initialization(init: &Initialization) -> Self {
        Self {
            a: init.a0().clone(),
            p: init.pstar().clone(),
        }
    }

    /// Dimension of the state vector.
    pub fn dim(&self) -> usize {
        self.a.len()
    }

    /// State mean.
    pub fn a(&self) -> &Array1<f64> {
        &self.a
    }

    /// State covariance.
    pub fn p(&self) -> &Array2<f64> {
        &self.p
    }

    /// Mutable state mean.
    pub fn a_mut(&mut self) -> &mut Array1<f64> {
        &mut self.a
    }

    /// Mutable state covariance.
    pub fn p_mut(&mut self) -> &mut Array2<f64> {
        &mut self.p
    }

    /// Both parts, mutably.
    pub fn parts_mut(&mut self) -> (&mut Array1<f64>, &mut Array2<f64>) {
        (&mut self.a, &mut self.p)
    }

    /// Consumes the state.
    pub fn into_parts(self) -> (Array1<f64>, Array2<f64>) {
        (self.a, self.p)
    }
}

/// A [`State`] extended with the diffuse constraint block `B`.
///
/// The number of columns of `B` (the diffuse dimension) can only decrease.
#[derive(Clone, Debug, PartialEq)]
pub struct AugmentedState {
    state: State,
    b: Array2<f64>,
}

impl AugmentedState {
    /// Initial augmented state of a run.
    pub fn from_initialization(init: &Initialization) -> Self {
        let b = init
            .basis()
            .cloned()
            .unwrap_or_else(|| Array2::zeros((init.state_dim(), 0)));
        Self {
            state: State::from_initialization(init),
            b,
        }
    }

    /// Number of diffuse directions still unresolved.
    pub fn diffuse_dim(&self) -> usize {
        self.b.ncols()
    }

    /// The ordinary part.
    pub fn state(&self) -> &State {
        &self.state
    }

    /// The ordinary part, mutably.
    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    /// Diffuse constraint block.
    pub fn b(&self) -> &Array2<f64> {
        &self.b
    }

    /// Diffuse constraint block, mutably. The shape must not be changed
    /// through this reference.
    pub fn b_mut(&mut self) -> &mut Array2<f64> {
        &mut self.b
    }

    /// All three parts, mutably.
    pub fn parts_mut(&mut self) -> (&mut State, &mut Array2<f64>) {
        (&mut self.state, &mut self.b)
    }

    /// Replaces `B` by a block with at most as many columns.
    ///
    /// # Errors
    ///
    /// | Variant | Trigger |
    /// |---------|---------|
    /// | [`ModelError::DiffuseGrowth`] | `b` has more columns than the current block |
    /// | [`ModelError::DimensionMismatch`] | `b` has the wrong number of rows |
    pub fn replace_diffuse(&mut self, b: Array2<f64>) -> Result<(), ModelError> {
        if b.ncols() > self.b.ncols() {
            return Err(ModelError::DiffuseGrowth {
                from: self.b.ncols(),
                to: b.ncols(),
            });
        }
        if b.nrows() != self.state.dim() {
            return Err(ModelError::DimensionMismatch {
                what: "diffuse block",
                expected: self.state.dim(),
                got: b.nrows(),
            });
        }
        self.b = b;
        Ok(())
    }

    /// Drops the first `k` columns of `B`.
    pub fn remove_leading_diffuse(&mut self, k: usize) {
        let k = k.min(self.b.ncols());
        self.b = self.b.slice(s![.., k..]).to_owned();
    }

    /// Drops the whole diffuse block (`d` becomes 0).
    pub fn clear_diffuse(&mut self) {
        self.b = Array2::zeros((self.state.dim(), 0));
    }

    /// Consumes the augmented state, returning its ordinary part.
    pub fn into_state(self) -> State {
        self.state
    }
}
