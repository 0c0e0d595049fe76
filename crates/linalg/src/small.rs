//! Allocation-free matrix-vector products for small state dimensions.
//!
//! Transition matrices of practical state-space models are small (a few
//! dozen states at most), so the in-place product `x <- T x` runs through a
//! stack buffer and only falls back to the heap for larger states.

use ndarray::{ArrayView2, ArrayViewMut1};

/// Largest dimension handled without a heap allocation.
pub const STACK_DIM: usize = 32;

/// Computes `x <- m x` in place.
///
/// # Panics
///
/// Panics if `m` is not `x.len()` × `x.len()`.
#[inline]
pub fn mul_vec_in_place(m: ArrayView2<'_, f64>, mut x: ArrayViewMut1<'_, f64>) {
    let n = x.len();
    assert_eq!(m.dim(), (n, n), "mul_vec_in_place: dimension mismatch");
    if n <= STACK_DIM {
        let mut buf = [0.0; STACK_DIM];
        product_into(m, &x, &mut buf[..n]);
        for (xi, bi) in x.iter_mut().zip(buf[..n].iter()) {
            *xi = *bi;
        }
    } else {
        let mut buf = vec![0.0; n];
        product_into(m, &x, &mut buf);
        for (xi, bi) in x.iter_mut().zip(buf.iter()) {
            *xi = *bi;
        }
    }
}

#[inline(always)]
fn product_into(m: ArrayView2<'_, f64>, x: &ArrayViewMut1<'_, f64>, out: &mut [f64]) {
    for (i, o) in out.iter_mut().enumerate() {
        let mut sum = 0.0;
        for (k, &mik) in m.row(i).iter().enumerate() {
            if mik != 0.0 {
                sum += mik * x[k];
            }
        }
        *o = sum;
    }
}
