//! # ssf-linalg
//!
//! Small dense linear algebra kernels used by the state-space filters.
//!
//! Everything here works on `ndarray` arrays of modest size (state
//! dimensions of a few dozen at most), so the routines are written as plain
//! loops rather than calls into BLAS/LAPACK.
//!
//! ## Contents
//!
//! | Module | Kernels |
//! |--------|---------|
//! | `givens` | plane rotations, LQ triangularisation, row accumulation into an upper-triangular factor |
//! | `cholesky` | semidefinite Cholesky, diagonally pivoted LDLᵀ |
//! | `small` | allocation-free `x <- T x` for small states |
//! | `solve` | triangular solves, LU solve, symmetrisation, rank-one updates |

mod cholesky;
mod error;
mod givens;
mod small;
mod solve;

pub use cholesky::{cholesky_semidefinite, ldl_pivoted};
pub use error::LinalgError;
pub use givens::{
    Givens, accumulate_row, triangularize, triangularize_in_place, zero_row_in_place,
};
pub use small::{STACK_DIM, mul_vec_in_place};
pub use solve::{
    max_abs, rank_one_update, right_solve_upper, solve_lu, solve_upper, symmetrize,
};
