//! Cholesky-type factorisations of symmetric matrices.

use ndarray::{Array2, ArrayView2};

use crate::error::LinalgError;

const SEMIDEFINITE_EPS: f64 = 1e-12;

/// Lower-triangular factor `L` with `L Lᵀ = A` for a symmetric positive
/// *semi*definite `A`.
///
/// Pivots that are zero up to a relative tolerance produce a zero column,
/// so singular covariance matrices (unit roots, deterministic components)
/// are accepted.
///
/// # Errors
///
/// | Variant | Trigger |
/// |---------|---------|
/// | [`LinalgError::NotSquare`] | `a` is not square |
/// | [`LinalgError::NotPositiveSemidefinite`] | a pivot is significantly negative |
pub fn cholesky_semidefinite(a: ArrayView2<'_, f64>) -> Result<Array2<f64>, LinalgError> {
    let (n, m) = a.dim();
    if n != m {
        return Err(LinalgError::NotSquare { rows: n, cols: m });
    }
    let scale = (0..n).map(|i| a[[i, i]].abs()).fold(0.0, f64::max);
    let tol = SEMIDEFINITE_EPS * scale.max(f64::MIN_POSITIVE);

    let mut l = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut pivot = a[[j, j]];
        for k in 0..j {
            pivot -= l[[j, k]] * l[[j, k]];
        }
        if pivot <= tol {
            if pivot < -tol.max(1e-10 * scale) {
                return Err(LinalgError::NotPositiveSemidefinite { index: j, pivot });
            }
            continue;
        }
        let d = pivot.sqrt();
        l[[j, j]] = d;
        for i in (j + 1)..n {
            let mut s = a[[i, j]];
            for k in 0..j {
                s -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = s / d;
        }
    }
    Ok(l)
}

/// Diagonally pivoted `A = Σ dᵢ lᵢ lᵢᵀ` decomposition of a symmetric,
/// possibly indefinite, matrix.
///
/// Returns the factor columns `L` (n×k) and the pivots `d` (length k), where
/// `k` is the numerical rank. Pivots below `rel_tol · max|Aᵢⱼ|` stop the
/// elimination. Returns `None` when the remainder is not negligible, which
/// happens for indefinite matrices whose remaining diagonal vanishes (for
/// example `[[0, 1], [1, 0]]`).
pub fn ldl_pivoted(a: ArrayView2<'_, f64>, rel_tol: f64) -> Option<(Array2<f64>, Vec<f64>)> {
    let n = a.nrows();
    let mut work = a.to_owned();
    let scale = crate::solve::max_abs(work.view());
    if scale == 0.0 {
        return Some((Array2::zeros((n, 0)), Vec::new()));
    }
    let tol = rel_tol * scale;

    let mut cols: Vec<ndarray::Array1<f64>> = Vec::new();
    let mut pivots = Vec::new();
    for _ in 0..n {
        let (idx, pivot) = (0..n)
            .map(|i| (i, work[[i, i]]))
            .fold((0, 0.0_f64), |best, cur| {
                if cur.1.abs() > best.1.abs() { cur } else { best }
            });
        if pivot.abs() <= tol {
            break;
        }
        let l = work.column(idx).mapv(|x| x / pivot);
        for i in 0..n {
            for j in 0..n {
                work[[i, j]] -= pivot * l[i] * l[j];
            }
        }
        cols.push(l);
        pivots.push(pivot);
    }

    if crate::solve::max_abs(work.view()) > tol {
        return None;
    }

    let mut l = Array2::zeros((n, cols.len()));
    for (j, col) in cols.iter().enumerate() {
        l.column_mut(j).assign(col);
    }
    Some((l, pivots))
}
