//! Integer relation search layered on the reducer
//!
//! A Z-dependence of a vector z is an integer vector a with z^T a nearly
//! zero. Relations are found by reducing the quadratic-form basis
//!
//!   B = [I; sqrt(N) z^T],
//!
//! whose columns score Q(a) = ||a||^2 + N |z^T a|^2, so short reduced
//! columns are near-relations once N is large enough.

use crate::core::error::Result;
use crate::core::field::{Field, RealField};
use crate::core::matrix::Matrix;
use crate::lll::{LLLParams, LLLReducer};
use num_traits::Float;

/// Search for integer relations of `z` with penalty weight `n_sqrt`
/// (the square root of Cohen's N parameter).
///
/// B and U are overwritten with the reduced quadratic-form basis and the
/// unimodular transform; the first `z.len()` rows of a reduced column are
/// the integer coefficients of its relation. Returns how many columns
/// have a near-exact residual.
pub fn z_dependence_search<F: Field>(
    z: &[F],
    n_sqrt: F::Real,
    b: &mut Matrix<F>,
    u: &mut Matrix<F>,
    params: &LLLParams<F::Real>,
) -> Result<usize> {
    let n = z.len();
    *b = Matrix::zeros(n + 1, n);
    for (j, &zj) in z.iter().enumerate() {
        b[(j, j)] = F::one();
        b[(n, j)] = zj * F::from_real(n_sqrt);
    }

    let reducer = LLLReducer::with_params(params.clone());
    let mut u_inv = Matrix::zeros(0, 0);
    let mut r = Matrix::zeros(0, 0);
    reducer.reduce_full(b, u, &mut u_inv, &mut r)?;

    let tol = relation_tolerance(z, n_sqrt);
    let mut num_exact = 0;
    for j in 0..n {
        if b[(n, j)].modulus() <= tol {
            num_exact += 1;
        }
    }
    Ok(num_exact)
}

/// Residual threshold below which a reduced column counts as an exact
/// relation. Scales with the penalty weight, the dimension, and the
/// magnitude of z, so accumulated round-off in the bottom row stays well
/// inside it while genuine non-relations stay orders of magnitude above.
pub fn relation_tolerance<F: Field>(z: &[F], n_sqrt: F::Real) -> F::Real {
    let one = <F::Real as num_traits::One>::one();
    let z_max = z
        .iter()
        .map(|v| v.modulus())
        .fold(one, |acc, v| if v > acc { v } else { acc });
    n_sqrt
        * <F::Real>::epsilon().powf(<F::Real as RealField>::from_f64(0.75))
        * <F::Real as RealField>::from_f64(z.len() as f64)
        * z_max
}

/// Search for the Gaussian-integer coefficients of a degree-n polynomial
/// of `alpha` that is nearly zero, through the powers column
/// [1, alpha, ..., alpha^n].
pub fn algebraic_relation_search<F: Field>(
    alpha: F,
    n: usize,
    n_sqrt: F::Real,
    b: &mut Matrix<F>,
    u: &mut Matrix<F>,
    params: &LLLParams<F::Real>,
) -> Result<usize> {
    let mut z = Vec::with_capacity(n + 1);
    let mut pow = F::one();
    for _ in 0..=n {
        z.push(pow);
        pow *= alpha;
    }
    z_dependence_search(&z, n_sqrt, b, u, params)
}
