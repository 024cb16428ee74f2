//! LLL (Lenstra-Lenstra-Lovász) lattice basis reduction
//!
//! A reduced basis D is an LLL(delta) reduction of an m x n matrix B when
//! B U = D = Q R with U unimodular and the floating-point QR factorization
//! of D satisfying three properties: R has a non-negative diagonal, R is
//! eta size-reduced, and R is delta Lovász reduced. Linearly dependent
//! columns are tolerated in the manner of the MLLL variant: they are
//! driven to zero and counted in the reported nullity.

use crate::core::blas;
use crate::core::error::{LatticeError, Result};
use crate::core::field::{Field, RealField};
use crate::core::matrix::Matrix;
use crate::unblocked;
use serde::{Deserialize, Serialize};

pub use crate::unblocked::log_potential;

/// Parameters for LLL reduction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLLParams<R: RealField> {
    /// Lovász parameter, in (1/4, 1]; larger values demand more reduction
    pub delta: R,
    /// Size-reduction bound, at least 1/2
    pub eta: R,
    /// Only size-reduce against the nearest-neighbor column
    pub weak: bool,
    /// Use deep insertion instead of adjacent swaps
    pub deep: bool,
    /// Pre-order the columns by two-norm before reducing
    pub presort: bool,
    /// Place the smallest column first when presorting
    pub smallest_first: bool,
    /// Re-run orthogonalization when the size-reduced column norm drops to
    /// at most this fraction of the old norm; zero disables the retry
    pub reorthog_tol: R,
    /// How many times to apply the accumulated reflectors per expansion
    pub num_orthog: usize,
    /// Columns with two-norm at most this are forced to zero
    pub zero_tol: R,
    /// Emit progress diagnostics through the log facade
    pub progress: bool,
    /// Accumulate and report timing aggregates
    pub time: bool,
}

impl<R: RealField> Default for LLLParams<R> {
    fn default() -> Self {
        let eps_pow = R::epsilon().powf(R::from_f64(0.9));
        LLLParams {
            delta: R::from_f64(0.75),
            eta: R::from_f64(0.5) + eps_pow,
            weak: false,
            deep: false,
            presort: true,
            smallest_first: true,
            reorthog_tol: R::zero(),
            num_orthog: 1,
            zero_tol: eps_pow,
            progress: false,
            time: false,
        }
    }
}

impl<R: RealField> LLLParams<R> {
    /// Create new LLL parameters with custom delta and eta
    pub fn new(delta: R, eta: R) -> Self {
        LLLParams {
            delta,
            eta,
            ..Default::default()
        }
    }

    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        if !(self.delta > R::from_f64(0.25) && self.delta <= R::one()) {
            return Err(LatticeError::invalid_parameters(format!(
                "Delta must be in (0.25, 1.0], got {}",
                self.delta
            )));
        }
        if self.eta < R::from_f64(0.5) {
            return Err(LatticeError::invalid_parameters(format!(
                "Eta must be at least 0.5, got {}",
                self.eta
            )));
        }
        if self.reorthog_tol < R::zero() {
            return Err(LatticeError::invalid_parameters(format!(
                "Reorthogonalization tolerance must be non-negative, got {}",
                self.reorthog_tol
            )));
        }
        if self.num_orthog < 1 {
            return Err(LatticeError::invalid_parameters(
                "At least one orthogonalization pass is required",
            ));
        }
        if self.zero_tol < R::zero() {
            return Err(LatticeError::invalid_parameters(format!(
                "Zero tolerance must be non-negative, got {}",
                self.zero_tol
            )));
        }
        Ok(())
    }
}

/// Summary of an LLL reduction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LLLInfo<R> {
    /// Achieved Lovász parameter
    pub delta: R,
    /// Achieved size-reduction bound
    pub eta: R,
    /// Number of non-zero columns in the reduced basis
    pub rank: usize,
    /// Number of zero columns
    pub nullity: usize,
    /// Number of swaps or deep insertions performed
    pub num_swaps: usize,
    /// Twice the log of the product of non-zero diagonal entries of R
    pub log_vol: R,
}

/// LLL reducer implementation
pub struct LLLReducer<R: RealField> {
    params: LLLParams<R>,
}

impl<R: RealField> LLLReducer<R> {
    /// Create new LLL reducer with default parameters
    pub fn new() -> Self {
        Self::with_params(LLLParams::default())
    }

    /// Create new LLL reducer with custom parameters
    pub fn with_params(params: LLLParams<R>) -> Self {
        LLLReducer { params }
    }

    /// Borrow the parameters
    pub fn params(&self) -> &LLLParams<R> {
        &self.params
    }

    /// Reduce B in place.
    ///
    /// On `PrecisionOverflow` the matrices are left in a partially
    /// updated state; the same holds for the other entry points.
    pub fn reduce<F: Field<Real = R>>(&self, b: &mut Matrix<F>) -> Result<LLLInfo<R>> {
        self.prepare(b)?;
        self.presort(b, None, None);
        let (info, _qr) = unblocked::reduce(b, None, None, &self.params)?;
        Ok(info)
    }

    /// Reduce B in place and fill R with the upper-trapezoidal factor
    pub fn reduce_form_r<F: Field<Real = R>>(
        &self,
        b: &mut Matrix<F>,
        r: &mut Matrix<F>,
    ) -> Result<LLLInfo<R>> {
        self.prepare(b)?;
        self.presort(b, None, None);
        let (info, qr) = unblocked::reduce(b, None, None, &self.params)?;
        *r = qr;
        Ok(info)
    }

    /// Reduce B in place, maintaining the unimodular transform U, its
    /// inverse, and the R factor. U and UInv are overwritten.
    pub fn reduce_full<F: Field<Real = R>>(
        &self,
        b: &mut Matrix<F>,
        u: &mut Matrix<F>,
        u_inv: &mut Matrix<F>,
        r: &mut Matrix<F>,
    ) -> Result<LLLInfo<R>> {
        self.prepare(b)?;
        let n = b.cols();
        *u = Matrix::identity(n);
        *u_inv = Matrix::identity(n);
        self.presort(b, Some(u), Some(u_inv));
        let (info, qr) = unblocked::reduce(b, Some(u), Some(u_inv), &self.params)?;
        *r = qr;
        #[cfg(debug_assertions)]
        self.check_unimodular(u, u_inv)?;
        Ok(info)
    }

    // Debug-build invariant: U and UInv must stay exact integer inverses.
    #[cfg(debug_assertions)]
    fn check_unimodular<F: Field<Real = R>>(
        &self,
        u: &Matrix<F>,
        u_inv: &Matrix<F>,
    ) -> Result<()> {
        let n = u.cols();
        let id = u.matmul(u_inv)?;
        let tol = R::from_f64(1e-6);
        for i in 0..n {
            for j in 0..n {
                let expected = if i == j { F::one() } else { F::zero() };
                if (id[(i, j)] - expected).modulus() > tol {
                    return Err(LatticeError::internal(format!(
                        "unimodularity violated: (U * UInv)({}, {}) = {}",
                        i,
                        j,
                        id[(i, j)]
                    )));
                }
            }
        }
        Ok(())
    }

    /// Overwrite B with its reduction; the non-zero columns of the reduced
    /// basis fill `image` and the transform columns of the zero columns
    /// fill `kernel` (a basis for the kernel of B).
    pub fn lattice_image_and_kernel<F: Field<Real = R>>(
        &self,
        b: &mut Matrix<F>,
        image: &mut Matrix<F>,
        kernel: &mut Matrix<F>,
    ) -> Result<LLLInfo<R>> {
        let mut u = Matrix::zeros(0, 0);
        let mut u_inv = Matrix::zeros(0, 0);
        let mut r = Matrix::zeros(0, 0);
        let info = self.reduce_full(b, &mut u, &mut u_inv, &mut r)?;

        let mut img_idx = Vec::new();
        let mut ker_idx = Vec::new();
        for j in 0..b.cols() {
            if blas::nrm2(b.col(j)) > self.params.zero_tol {
                img_idx.push(j);
            } else {
                ker_idx.push(j);
            }
        }
        *image = b.select_cols(&img_idx);
        *kernel = u.select_cols(&ker_idx);
        Ok(info)
    }

    /// As `lattice_image_and_kernel`, discarding the image
    pub fn lattice_kernel<F: Field<Real = R>>(
        &self,
        b: &mut Matrix<F>,
        kernel: &mut Matrix<F>,
    ) -> Result<LLLInfo<R>> {
        let mut image = Matrix::zeros(0, 0);
        self.lattice_image_and_kernel(b, &mut image, kernel)
    }

    fn prepare<F: Field<Real = R>>(&self, b: &Matrix<F>) -> Result<()> {
        self.params.validate()?;
        if b.rows() == 0 || b.cols() == 0 {
            return Err(LatticeError::invalid_dimensions((1, 1), b.dimension()));
        }
        Ok(())
    }

    // Stable two-norm column pre-order. The permutation is folded into the
    // initial U and UInv so B_in * U = B_out keeps holding for the caller's
    // original matrix.
    fn presort<F: Field<Real = R>>(
        &self,
        b: &mut Matrix<F>,
        u: Option<&mut Matrix<F>>,
        u_inv: Option<&mut Matrix<F>>,
    ) {
        if !self.params.presort {
            return;
        }
        let n = b.cols();
        let norms: Vec<R> = (0..n).map(|j| blas::nrm2(b.col(j))).collect();
        let mut order: Vec<usize> = (0..n).collect();
        if self.params.smallest_first {
            order.sort_by(|&a, &c| norms[a].partial_cmp(&norms[c]).unwrap_or(std::cmp::Ordering::Equal));
        } else {
            order.sort_by(|&a, &c| norms[c].partial_cmp(&norms[a]).unwrap_or(std::cmp::Ordering::Equal));
        }
        if order.iter().enumerate().all(|(j, &p)| j == p) {
            return;
        }

        *b = b.select_cols(&order);
        if let Some(u) = u {
            let mut perm = Matrix::zeros(n, n);
            for (j, &p) in order.iter().enumerate() {
                perm[(p, j)] = F::one();
            }
            *u = perm;
        }
        if let Some(ui) = u_inv {
            let mut perm_inv = Matrix::zeros(n, n);
            for (j, &p) in order.iter().enumerate() {
                perm_inv[(j, p)] = F::one();
            }
            *ui = perm_inv;
        }
    }
}

impl<R: RealField> Default for LLLReducer<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Gaussian estimate of the shortest-vector length of a rank-n lattice,
/// given the log of its determinant:
///
///   GH(L) = exp((ln Gamma(n/2 + 1) + log_det) / n) / sqrt(pi)
pub fn gaussian_heuristic<R: RealField>(rank: usize, log_det: R) -> R {
    if rank == 0 {
        return R::zero();
    }
    // ln Gamma(rank/2 + 1) by the recurrence Gamma(x + 1) = x Gamma(x)
    let mut ln_gamma;
    let mut x;
    if rank % 2 == 0 {
        ln_gamma = R::zero();
        x = R::one();
    } else {
        ln_gamma = R::PI().sqrt().ln();
        x = R::from_f64(0.5);
    }
    let target = R::from_f64(rank as f64 / 2.0 + 1.0);
    while x < target - R::from_f64(0.25) {
        ln_gamma = ln_gamma + x.ln();
        x = x + R::one();
    }
    ((ln_gamma + log_det) / R::from_f64(rank as f64)).exp() / R::PI().sqrt()
}
