//! Givens plane rotations and the triangularisations built on them.
//!
//! Two shapes of problem show up in the filters:
//!
//! - **Column form** (`M Θ`, with `Θ` orthogonal): the product `M Mᵀ` is
//!   preserved. Used by square-root covariance updates, where `M` is a
//!   factor of a covariance matrix.
//! - **Row form** (`Θ M`): the product `Mᵀ M` is preserved. Used to fold
//!   new residual rows into an upper-triangular accumulator.

use ndarray::{Array2, ArrayViewMut1, ArrayViewMut2};

/// A plane rotation `(x, y) -> (c·x + s·y, −s·x + c·y)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Givens {
    c: f64,
    s: f64,
}

impl Givens {
    /// Builds the rotation mapping `(a, b)` to `(r, 0)` with `r = hypot(a, b) >= 0`.
    ///
    /// Returns the rotation together with `r`. When both inputs are zero the
    /// identity rotation is returned.
    pub fn new(a: f64, b: f64) -> (Self, f64) {
        if b == 0.0 {
            if a >= 0.0 {
                return (Self { c: 1.0, s: 0.0 }, a);
            }
            return (Self { c: -1.0, s: 0.0 }, -a);
        }
        let r = a.hypot(b);
        (Self { c: a / r, s: b / r }, r)
    }

    /// Cosine component.
    pub fn c(&self) -> f64 {
        self.c
    }

    /// Sine component.
    pub fn s(&self) -> f64 {
        self.s
    }

    /// Rotates the pair `(x, y)`.
    #[inline(always)]
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (self.c * x + self.s * y, -self.s * x + self.c * y)
    }

    /// Rotates columns `i` and `j` of `m` in place.
    pub fn apply_columns(&self, m: &mut ArrayViewMut2<'_, f64>, i: usize, j: usize) {
        for k in 0..m.nrows() {
            let (x, y) = self.apply(m[[k, i]], m[[k, j]]);
            m[[k, i]] = x;
            m[[k, j]] = y;
        }
    }
}

/// Zeroes every entry of row `row` except the one in column `pivot`, by
/// rotating each other column against the pivot column.
///
/// `M Mᵀ` is preserved. On return `m[[row, pivot]] >= 0` holds the norm of
/// the original row.
pub fn zero_row_in_place(mut m: ArrayViewMut2<'_, f64>, row: usize, pivot: usize) {
    for j in 0..m.ncols() {
        if j == pivot || m[[row, j]] == 0.0 {
            continue;
        }
        let (g, _) = Givens::new(m[[row, pivot]], m[[row, j]]);
        g.apply_columns(&mut m, pivot, j);
        m[[row, j]] = 0.0;
    }
    if m[[row, pivot]] < 0.0 {
        m.column_mut(pivot).mapv_inplace(|x| -x);
    }
}

/// LQ-triangularises `m` (r×k) in place by column rotations.
///
/// On return the leading `min(r, k)` columns are lower triangular and the
/// remaining columns are zero; `M Mᵀ` is unchanged.
pub fn triangularize_in_place(mut m: ArrayViewMut2<'_, f64>) {
    let (r, k) = m.dim();
    for i in 0..r.min(k) {
        for j in (i + 1)..k {
            if m[[i, j]] == 0.0 {
                continue;
            }
            let (g, _) = Givens::new(m[[i, i]], m[[i, j]]);
            g.apply_columns(&mut m, i, j);
            m[[i, j]] = 0.0;
        }
    }
}

/// Returns the lower-triangular factor `L` (r×min(r, k)) with
/// `L Lᵀ = M Mᵀ`.
pub fn triangularize(m: &Array2<f64>) -> Array2<f64> {
    let mut work = m.clone();
    triangularize_in_place(work.view_mut());
    let keep = work.nrows().min(work.ncols());
    work.slice(ndarray::s![.., ..keep]).to_owned()
}

/// Folds `row` into the upper-triangular accumulator `r` (k×k) by row
/// rotations, so that the updated factor satisfies
/// `R'ᵀ R' = Rᵀ R + row rowᵀ`.
///
/// Diagonal entries stay non-negative. `row` is consumed as workspace.
pub fn accumulate_row(mut r: ArrayViewMut2<'_, f64>, mut row: ArrayViewMut1<'_, f64>) {
    let k = r.nrows();
    for j in 0..k {
        if row[j] == 0.0 {
            continue;
        }
        let (g, norm) = Givens::new(r[[j, j]], row[j]);
        r[[j, j]] = norm;
        row[j] = 0.0;
        for c in (j + 1)..k {
            let (x, y) = g.apply(r[[j, c]], row[c]);
            r[[j, c]] = x;
            row[c] = y;
        }
    }
}
