//! Triangular and general solves plus a few in-place helpers.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut2};

use crate::error::LinalgError;

/// Largest absolute entry of `m` (0 for an empty matrix).
pub fn max_abs(m: ArrayView2<'_, f64>) -> f64 {
    m.iter().fold(0.0, |acc, &x| acc.max(x.abs()))
}

/// Replaces `m` by `(m + mᵀ) / 2`.
pub fn symmetrize(mut m: ArrayViewMut2<'_, f64>) {
    let n = m.nrows();
    for i in 0..n {
        for j in (i + 1)..n {
            let avg = 0.5 * (m[[i, j]] + m[[j, i]]);
            m[[i, j]] = avg;
            m[[j, i]] = avg;
        }
    }
}

/// `m += alpha · u vᵀ`.
pub fn rank_one_update(
    mut m: ArrayViewMut2<'_, f64>,
    alpha: f64,
    u: ArrayView1<'_, f64>,
    v: ArrayView1<'_, f64>,
) {
    if alpha == 0.0 {
        return;
    }
    for i in 0..u.len() {
        let ui = alpha * u[i];
        if ui == 0.0 {
            continue;
        }
        for j in 0..v.len() {
            m[[i, j]] += ui * v[j];
        }
    }
}

/// Solves `R x = b` for upper-triangular `R` by back-substitution.
///
/// # Errors
///
/// | Variant | Trigger |
/// |---------|---------|
/// | [`LinalgError::DimensionMismatch`] | `b.len() != R.nrows()` |
/// | [`LinalgError::Singular`] | a diagonal entry of `R` is zero |
pub fn solve_upper(
    r: ArrayView2<'_, f64>,
    b: ArrayView1<'_, f64>,
) -> Result<Array1<f64>, LinalgError> {
    let n = r.nrows();
    if b.len() != n {
        return Err(LinalgError::DimensionMismatch {
            expected: n,
            got: b.len(),
        });
    }
    let mut x = b.to_owned();
    for i in (0..n).rev() {
        let mut s = x[i];
        for j in (i + 1)..n {
            s -= r[[i, j]] * x[j];
        }
        if r[[i, i]] == 0.0 {
            return Err(LinalgError::Singular { index: i });
        }
        x[i] = s / r[[i, i]];
    }
    Ok(x)
}

/// Solves `X R = B` for upper-triangular `R` (k×k), with `B` of shape n×k.
///
/// # Errors
///
/// | Variant | Trigger |
/// |---------|---------|
/// | [`LinalgError::DimensionMismatch`] | `B.ncols() != R.nrows()` |
/// | [`LinalgError::Singular`] | a diagonal entry of `R` is zero |
pub fn right_solve_upper(
    b: ArrayView2<'_, f64>,
    r: ArrayView2<'_, f64>,
) -> Result<Array2<f64>, LinalgError> {
    let k = r.nrows();
    if b.ncols() != k {
        return Err(LinalgError::DimensionMismatch {
            expected: k,
            got: b.ncols(),
        });
    }
    if let Some(index) = (0..k).find(|&j| r[[j, j]] == 0.0) {
        return Err(LinalgError::Singular { index });
    }
    let mut x = b.to_owned();
    for mut row in x.rows_mut() {
        for j in 0..k {
            let mut s = row[j];
            for i in 0..j {
                s -= row[i] * r[[i, j]];
            }
            row[j] = s / r[[j, j]];
        }
    }
    Ok(x)
}

/// Solves the square system `A x = b` by LU with partial pivoting.
///
/// # Errors
///
/// | Variant | Trigger |
/// |---------|---------|
/// | [`LinalgError::NotSquare`] | `A` is not square |
/// | [`LinalgError::DimensionMismatch`] | `b.len() != A.nrows()` |
/// | [`LinalgError::Singular`] | a pivot is numerically zero |
pub fn solve_lu(a: ArrayView2<'_, f64>, b: ArrayView1<'_, f64>) -> Result<Array1<f64>, LinalgError> {
    let (n, m) = a.dim();
    if n != m {
        return Err(LinalgError::NotSquare { rows: n, cols: m });
    }
    if b.len() != n {
        return Err(LinalgError::DimensionMismatch {
            expected: n,
            got: b.len(),
        });
    }
    let scale = max_abs(a).max(f64::MIN_POSITIVE);
    let mut lu = a.to_owned();
    let mut x = b.to_owned();

    for col in 0..n {
        let (piv, piv_val) = (col..n)
            .map(|i| (i, lu[[i, col]].abs()))
            .fold((col, -1.0_f64), |best, cur| if cur.1 > best.1 { cur } else { best });
        if piv_val <= f64::EPSILON * scale {
            return Err(LinalgError::Singular { index: col });
        }
        if piv != col {
            for j in 0..n {
                lu.swap([col, j], [piv, j]);
            }
            x.swap(col, piv);
        }
        for i in (col + 1)..n {
            let factor = lu[[i, col]] / lu[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for j in col..n {
                lu[[i, j]] -= factor * lu[[col, j]];
            }
            x[i] -= factor * x[col];
        }
    }
    solve_upper(lu.view(), x.view())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn back_substitution() {
        let r = array![[2.0, 1.0, -1.0], [0.0, 3.0, 0.5], [0.0, 0.0, 4.0]];
        let x_true = array![1.0, -2.0, 0.5];
        let b = r.dot(&x_true);
        let x = solve_upper(r.view(), b.view()).unwrap();
        for (a, e) in x.iter().zip(x_true.iter()) {
            assert_abs_diff_eq!(*a, *e, epsilon = 1e-14);
        }
    }

    #[test]
    fn back_substitution_singular() {
        let r = array![[1.0, 1.0], [0.0, 0.0]];
        let err = solve_upper(r.view(), array![1.0, 1.0].view()).unwrap_err();
        assert_eq!(err, LinalgError::Singular { index: 1 });
    }

    #[test]
    fn right_solve_matches_product() {
        let r = array![[2.0, 1.0], [0.0, 0.5]];
        let x_true = array![[1.0, 2.0], [-1.0, 0.0], [0.5, 3.0]];
        let b = x_true.dot(&r);
        let x = right_solve_upper(b.view(), r.view()).unwrap();
        for (a, e) in x.iter().zip(x_true.iter()) {
            assert_abs_diff_eq!(*a, *e, epsilon = 1e-14);
        }
    }

    #[test]
    fn lu_solve_with_pivoting() {
        let a = array![[0.0, 2.0, 1.0], [1.0, 1.0, 0.0], [3.0, 0.0, 1.0]];
        let x_true = array![0.5, -1.0, 2.0];
        let b = a.dot(&x_true);
        let x = solve_lu(a.view(), b.view()).unwrap();
        for (v, e) in x.iter().zip(x_true.iter()) {
            assert_abs_diff_eq!(*v, *e, epsilon = 1e-13);
        }
    }

    #[test]
    fn lu_solve_singular() {
        let a = array![[1.0, 2.0], [2.0, 4.0]];
        assert!(matches!(
            solve_lu(a.view(), array![1.0, 2.0].view()),
            Err(LinalgError::Singular { .. })
        ));
    }

    #[test]
    fn symmetrize_averages() {
        let mut m = array![[1.0, 2.0], [4.0, 3.0]];
        symmetrize(m.view_mut());
        assert_eq!(m, array![[1.0, 3.0], [3.0, 3.0]]);
    }

    #[test]
    fn rank_one_update_adds_outer_product() {
        let mut m = Array2::<f64>::zeros((2, 2));
        rank_one_update(m.view_mut(), 2.0, array![1.0, 2.0].view(), array![3.0, -1.0].view());
        assert_eq!(m, array![[6.0, -2.0], [12.0, -4.0]]);
    }
}
