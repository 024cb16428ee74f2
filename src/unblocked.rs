//! Unblocked LLL reduction engine with Householder orthogonalization
//!
//! The engine mutates the basis in place, carrying an implicit QR
//! factorization: the upper-trapezoidal part of the workspace holds R and
//! the strictly lower part holds the reflectors that reconstruct Q.
//! Linearly dependent columns are detected through a zero tolerance and
//! forced to exact zero, so rank-deficient bases reduce like any other.

use crate::core::blas;
use crate::core::error::{LatticeError, Result};
use crate::core::field::{Field, RealField};
use crate::core::matrix::Matrix;
use crate::lll::{LLLInfo, LLLParams};
use num_traits::{Float, One, Zero};
use std::time::{Duration, Instant};

// Recompute deep-insertion running norms instead of trusting the downdate.
const ALWAYS_RECOMPUTE_NORMS: bool = true;

#[derive(Default)]
struct Timers {
    apply_house: Duration,
    round: Duration,
}

pub(crate) struct Unblocked<'a, F: Field> {
    b: &'a mut Matrix<F>,
    u: Option<&'a mut Matrix<F>>,
    u_inv: Option<&'a mut Matrix<F>>,
    qr: Matrix<F>,
    t: Vec<F>,
    d: Vec<F::Real>,
    x: Vec<F>,
    row_scratch: Vec<F>,
    params: &'a LLLParams<F::Real>,
    num_swaps: usize,
    nullity: usize,
    timers: Timers,
}

/// Run the reduction, returning the summary and the QR workspace with R
/// forced upper-trapezoidal.
pub(crate) fn reduce<'a, F: Field>(
    b: &'a mut Matrix<F>,
    u: Option<&'a mut Matrix<F>>,
    u_inv: Option<&'a mut Matrix<F>>,
    params: &'a LLLParams<F::Real>,
) -> Result<(LLLInfo<F::Real>, Matrix<F>)> {
    let m = b.rows();
    let n = b.cols();
    let min_dim = m.min(n);

    let mut engine = Unblocked {
        qr: Matrix::zeros(m, n),
        t: vec![F::zero(); min_dim],
        d: vec![<F::Real>::zero(); min_dim],
        x: vec![F::zero(); n],
        row_scratch: Vec::with_capacity(n),
        b,
        u,
        u_inv,
        params,
        num_swaps: 0,
        nullity: 0,
        timers: Timers::default(),
    };

    let info = if params.deep {
        engine.run_deep()?
    } else {
        engine.run()?
    };
    Ok((info, engine.qr))
}

impl<'a, F: Field> Unblocked<'a, F> {
    fn min_dim(&self) -> usize {
        self.b.rows().min(self.b.cols())
    }

    /// R(i,i) as a real value; zero where the diagonal does not exist
    fn diag_real(&self, i: usize) -> F::Real {
        if i < self.min_dim() {
            self.qr[(i, i)].real()
        } else {
            <F::Real>::zero()
        }
    }

    /// R(i,j); zero where row i does not exist
    fn upper_entry(&self, i: usize, j: usize) -> F {
        if i < self.b.rows() {
            self.qr[(i, j)]
        } else {
            F::zero()
        }
    }

    /// Put column k of B into column k of QR and rotate it with the
    /// accumulated scaled reflectors.
    fn expand_qr(&mut self, k: usize) {
        let m = self.b.rows();
        let start = self.params.time.then(Instant::now);

        {
            let src = self.b.col(k);
            let dst = self.qr.col_mut(k);
            dst.copy_from_slice(src);
        }

        let nrefl = k.min(self.min_dim());
        for _ in 0..self.params.num_orthog {
            for i in 0..nrefl {
                let tau = self.t[i];
                let sign = self.d[i];
                let (vcol, ycol) = self.qr.col_pair_mut(i, k);
                // v(i) is implicitly one; the stored diagonal is R(i,i)
                let v = &vcol[i..m];
                let y = &mut ycol[i..m];
                let inner = y[0] + blas::dotc(&v[1..], &y[1..]);
                let coeff = -(tau * inner);
                y[0] += coeff;
                blas::axpy(coeff, &v[1..], &mut y[1..]);
                // undo the sign that normalized R(i,i)
                y[0] *= F::from_real(sign);
            }
        }

        if let Some(s) = start {
            self.timers.apply_house += s.elapsed();
        }
    }

    /// Reflect out the sub-diagonal of column k and sign-normalize the
    /// new diagonal entry.
    fn householder_step(&mut self, k: usize) {
        if k >= self.min_dim() {
            return;
        }
        let col = self.qr.col_mut(k);
        let (head, tail) = col[k..].split_at_mut(1);
        let tau = blas::left_reflector(&mut head[0], tail);
        self.t[k] = tau;
        if head[0].real() < <F::Real>::zero() {
            self.d[k] = -<F::Real>::one();
            head[0] = -head[0];
        } else {
            self.d[k] = <F::Real>::one();
        }
    }

    /// Expand and reflect the head column, forcing it to zero if its norm
    /// is inside the zero tolerance.
    fn reset_head_column(&mut self) {
        self.expand_qr(0);
        self.householder_step(0);
        if blas::nrm2(self.b.col(0)) <= self.params.zero_tol {
            self.b.zero_col(0);
            self.qr.zero_col(0);
            self.nullity = 1;
        } else {
            self.nullity = 0;
        }
    }

    /// Size-reduce column k, leaving QR consistent. Returns true if the
    /// column collapsed to the zero vector.
    fn step(&mut self, k: usize) -> Result<bool> {
        let big = <F::Real>::one() / <F::Real>::epsilon();

        loop {
            self.expand_qr(k);

            let old_norm = blas::nrm2(self.b.col(k));
            check_norm(old_norm, big)?;

            if old_norm <= self.params.zero_tol {
                self.b.zero_col(k);
                self.qr.zero_col(k);
                if k < self.min_dim() {
                    self.t[k] = F::from_real(<F::Real as RealField>::from_f64(0.5));
                    self.d[k] = <F::Real>::one();
                }
                return Ok(true);
            }

            let round_start = self.params.time.then(Instant::now);
            if self.params.weak {
                self.size_reduce_weak(k);
            } else {
                self.size_reduce_full(k);
            }
            if let Some(s) = round_start {
                self.timers.round += s.elapsed();
            }

            let new_norm = blas::nrm2(self.b.col(k));
            check_norm(new_norm, big)?;

            if new_norm > self.params.reorthog_tol * old_norm {
                break;
            } else if self.params.progress {
                log::info!(
                    "Reorthogonalizing with k={} since old_norm={} and new_norm={}",
                    k,
                    old_norm,
                    new_norm
                );
            }
        }

        self.householder_step(k);
        Ok(false)
    }

    /// Reduce column k against its nearest neighbor only
    fn size_reduce_weak(&mut self, k: usize) {
        let rho = self.diag_real(k - 1);
        if rho <= self.params.zero_tol {
            return;
        }
        let chi = self.qr[(k - 1, k)] / F::from_real(rho);
        if chi.real().abs() > self.params.eta || chi.imag().abs() > self.params.eta {
            let chi = chi.round_nearest();
            let m = self.b.rows();
            let len = k.min(m);
            {
                let (src, dst) = self.qr.col_pair_mut(k - 1, k);
                blas::axpy(-chi, &src[..len], &mut dst[..len]);
            }
            {
                let (src, dst) = self.b.col_pair_mut(k - 1, k);
                blas::axpy(-chi, src, dst);
            }
            if let Some(u) = self.u.as_deref_mut() {
                let (src, dst) = u.col_pair_mut(k - 1, k);
                blas::axpy(-chi, src, dst);
            }
            if let Some(ui) = self.u_inv.as_deref_mut() {
                ui.row_axpy(chi, k, k - 1);
            }
        }
    }

    /// Full back-substitution against every earlier column, applied to B
    /// and the transforms through one matrix-vector update
    fn size_reduce_full(&mut self, k: usize) {
        let min_dim = self.min_dim();
        for i in (0..k).rev() {
            if i >= min_dim || self.qr[(i, i)].modulus() <= self.params.zero_tol {
                self.x[i] = F::zero();
                continue;
            }
            let mut chi = self.qr[(i, k)] / self.qr[(i, i)];
            if chi.real().abs() > self.params.eta || chi.imag().abs() > self.params.eta {
                chi = chi.round_nearest();
                let (src, dst) = self.qr.col_pair_mut(i, k);
                blas::axpy(-chi, &src[..i + 1], &mut dst[..i + 1]);
            } else {
                chi = F::zero();
            }
            self.x[i] = chi;
        }

        let m = self.b.rows();
        {
            let (block, colk) = self.b.split_at_col(k);
            blas::gemv(-F::one(), block, m, k, &self.x[..k], colk);
        }
        if let Some(u) = self.u.as_deref_mut() {
            let n = u.rows();
            let (block, colk) = u.split_at_col(k);
            blas::gemv(-F::one(), block, n, k, &self.x[..k], colk);
        }
        if let Some(ui) = self.u_inv.as_deref_mut() {
            ui.copy_row_into(k, &mut self.row_scratch);
            let ld = ui.ld();
            blas::geru(F::one(), &self.x[..k], &self.row_scratch, ui.as_mut_slice(), ld);
        }
    }

    fn swap_adjacent(&mut self, k: usize) {
        self.b.swap_cols(k - 1, k);
        if let Some(u) = self.u.as_deref_mut() {
            u.swap_cols(k - 1, k);
        }
        if let Some(ui) = self.u_inv.as_deref_mut() {
            ui.swap_rows(k - 1, k);
        }
    }

    /// Classic adjacent-swap driver
    fn run(&mut self) -> Result<LLLInfo<F::Real>> {
        let n = self.b.cols();
        self.reset_head_column();

        let mut k = 1usize;
        while k < n {
            let zero_vector = self.step(k)?;
            if zero_vector {
                self.nullity = k + 1;
            } else {
                self.nullity = self.nullity.min(k);
            }

            let rho_km1_km1 = self.diag_real(k - 1);
            let rho_km1_k = self.upper_entry(k - 1, k);
            let rho_k_k = self.diag_real(k);

            let left_term = self.params.delta.sqrt() * rho_km1_km1;
            let right_term = blas::safe_hypot(rho_k_k, rho_km1_k.modulus());
            if left_term <= right_term {
                k += 1;
            } else {
                self.num_swaps += 1;
                if self.params.progress {
                    log::info!(
                        "Dropping from k={} to {} since sqrt(delta)*R(k-1,k-1)={} > {}",
                        k,
                        (k - 1).max(1),
                        left_term,
                        right_term
                    );
                }
                self.swap_adjacent(k);
                if k == 1 {
                    // the head column was replaced
                    self.reset_head_column();
                } else {
                    k -= 1;
                }
            }
        }

        self.finish()
    }

    /// Deep-insertion driver: rotate the candidate column into the first
    /// position where it beats the Lovasz bound
    fn run_deep(&mut self) -> Result<LLLInfo<F::Real>> {
        let zero = <F::Real>::zero();
        let one = <F::Real>::one();
        let n = self.b.cols();
        let m = self.b.rows();
        let update_tol = <F::Real>::epsilon().sqrt();

        self.reset_head_column();

        let mut k = 1usize;
        while k < n {
            let zero_vector = self.step(k)?;
            if zero_vector {
                self.nullity = k + 1;
            } else {
                self.nullity = self.nullity.min(k);
            }

            let mut swapped = false;
            // the running norm starts from the full column, norm(R[0..k+1, k])
            let col_len = (k + 1).min(m);
            let mut orig_norm = blas::nrm2(&self.qr.col(k)[..col_len]);
            let mut partial_norm = orig_norm;
            for i in 0..k {
                let left_term = self.params.delta.sqrt() * self.diag_real(i);
                if left_term > partial_norm {
                    self.num_swaps += 1;
                    if self.params.progress {
                        log::info!(
                            "Deep inserting k={} into position i={} since sqrt(delta)*R(i,i)={} > {}",
                            k,
                            i,
                            left_term,
                            partial_norm
                        );
                    }
                    deep_col_swap(self.b, i, k);
                    if let Some(u) = self.u.as_deref_mut() {
                        deep_col_swap(u, i, k);
                    }
                    if let Some(ui) = self.u_inv.as_deref_mut() {
                        deep_row_swap(ui, i, k);
                    }
                    if i == 0 {
                        self.reset_head_column();
                        k = 1;
                    } else {
                        k = i;
                    }
                    swapped = true;
                    break;
                }

                // downdate the running norm, recomputing when cancellation
                // would poison it
                let abs_rik = self.upper_entry(i, k).modulus();
                let gamma = if partial_norm > zero {
                    let g = abs_rik / partial_norm;
                    ((one - g) * (one + g)).max(zero)
                } else {
                    zero
                };
                let ratio = if orig_norm > zero {
                    partial_norm / orig_norm
                } else {
                    zero
                };
                let phi = gamma * (ratio * ratio);
                if phi <= update_tol || ALWAYS_RECOMPUTE_NORMS {
                    let lo = (i + 1).min(col_len);
                    partial_norm = blas::nrm2(&self.qr.col(k)[lo..col_len]);
                    orig_norm = partial_norm;
                } else {
                    partial_norm = partial_norm * gamma.sqrt();
                }
            }
            if !swapped {
                k += 1;
            }
        }

        self.finish()
    }

    fn finish(&mut self) -> Result<LLLInfo<F::Real>> {
        if self.params.time {
            log::info!("Apply Householder time: {:?}", self.timers.apply_house);
            log::info!("Round time:             {:?}", self.timers.round);
        }

        self.qr.make_upper_trapezoidal();

        let (delta, eta) = achieved(&self.qr);
        let log_vol = log_volume(&self.qr);
        if self.params.progress {
            log::debug!("Final log potential: {}", log_potential(&self.qr));
        }

        let n = self.b.cols();
        Ok(LLLInfo {
            delta,
            eta,
            rank: n - self.nullity,
            nullity: self.nullity,
            num_swaps: self.num_swaps,
            log_vol,
        })
    }
}

fn check_norm<R: RealField>(norm: R, big: R) -> Result<()> {
    if !norm.is_finite() {
        return Err(LatticeError::precision_overflow(
            "encountered an unbounded column norm",
        ));
    }
    if norm > big {
        return Err(LatticeError::precision_overflow(format!(
            "column norm {} exceeds 1/eps",
            norm
        )));
    }
    Ok(())
}

/// Rotate column k into position i, shifting columns i..k one to the right
pub(crate) fn deep_col_swap<F: Field>(mat: &mut Matrix<F>, i: usize, k: usize) {
    let saved = mat.col(k).to_vec();
    for l in (i..k).rev() {
        mat.copy_col(l, l + 1);
    }
    mat.col_mut(i).copy_from_slice(&saved);
}

/// Row-oriented dual of `deep_col_swap`
pub(crate) fn deep_row_swap<F: Field>(mat: &mut Matrix<F>, i: usize, k: usize) {
    let mut saved = Vec::new();
    mat.copy_row_into(k, &mut saved);
    let r = mat.ld();
    let cols = mat.cols();
    let buf = mat.as_mut_slice();
    for l in (i..k).rev() {
        for j in 0..cols {
            buf[(l + 1) + j * r] = buf[l + j * r];
        }
    }
    for (j, &v) in saved.iter().enumerate() {
        buf[i + j * r] = v;
    }
}

/// Achieved (delta, eta) for an upper-trapezoidal R, skipping terms with a
/// zero diagonal; delta is clamped into [0, 1]
pub(crate) fn achieved<F: Field>(r: &Matrix<F>) -> (F::Real, F::Real) {
    let zero = <F::Real>::zero();
    let one = <F::Real>::one();
    let min_dim = r.rows().min(r.cols());

    let mut delta: Option<F::Real> = None;
    for i in 0..min_dim.saturating_sub(1) {
        let rii = r[(i, i)].real();
        if rii == zero {
            continue;
        }
        let rnext = r[(i + 1, i + 1)].real();
        let off = r[(i, i + 1)].modulus();
        let ratio = (rnext * rnext + off * off) / (rii * rii);
        delta = Some(match delta {
            Some(d) if d < ratio => d,
            _ => ratio,
        });
    }
    let delta = delta.unwrap_or(one).min(one).max(zero);

    let mut eta = zero;
    for j in 1..r.cols() {
        for i in 0..j.min(min_dim) {
            let rii = r[(i, i)].real();
            if rii == zero {
                continue;
            }
            let chi = r[(i, j)] / F::from_real(rii);
            eta = eta.max(chi.real().abs()).max(chi.imag().abs());
        }
    }

    (delta, eta)
}

/// Twice the log of the product of non-zero diagonal entries of R
pub(crate) fn log_volume<F: Field>(r: &Matrix<F>) -> F::Real {
    let zero = <F::Real>::zero();
    let two = <F::Real as RealField>::from_f64(2.0);
    let min_dim = r.rows().min(r.cols());
    let mut acc = zero;
    for j in 0..min_dim {
        let rjj = r[(j, j)].modulus();
        if rjj > zero {
            acc = acc + two * rjj.ln();
        }
    }
    acc
}

/// Weighted potential sum 2 (n - j) log |R(j,j)| over non-zero diagonals
pub fn log_potential<F: Field>(r: &Matrix<F>) -> F::Real {
    let zero = <F::Real>::zero();
    let n = r.cols();
    let min_dim = r.rows().min(n);
    let mut acc = zero;
    for j in 0..min_dim {
        let rjj = r[(j, j)].modulus();
        if rjj > zero {
            let weight = <F::Real as RealField>::from_f64(2.0 * (n - j) as f64);
            acc = acc + weight * rjj.ln();
        }
    }
    acc
}
