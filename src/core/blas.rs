//! Level-1/2 kernels and the Householder reflector primitive

use crate::core::field::{Field, RealField};
use num_traits::{Float, Zero};

/// Conjugated dot product `x* . y`
pub fn dotc<F: Field>(x: &[F], y: &[F]) -> F {
    debug_assert_eq!(x.len(), y.len());
    let mut acc = F::zero();
    for (a, b) in x.iter().zip(y.iter()) {
        acc += a.conj() * *b;
    }
    acc
}

/// y += alpha * x
pub fn axpy<F: Field>(alpha: F, x: &[F], y: &mut [F]) {
    debug_assert_eq!(x.len(), y.len());
    if alpha.is_zero() {
        return;
    }
    for (a, b) in x.iter().zip(y.iter_mut()) {
        *b += alpha * *a;
    }
}

/// x *= alpha
pub fn scal<F: Field>(alpha: F, x: &mut [F]) {
    for v in x.iter_mut() {
        *v *= alpha;
    }
}

/// Euclidean norm by scaled sum of squares, safe against overflow
pub fn nrm2<F: Field>(x: &[F]) -> F::Real {
    let zero = <F::Real>::zero();
    let one = <F::Real as num_traits::One>::one();
    let mut scale = zero;
    let mut ssq = one;
    for v in x.iter() {
        for comp in [v.real(), v.imag()] {
            if comp != zero {
                let a = comp.abs();
                if scale < a {
                    let r = scale / a;
                    ssq = one + ssq * r * r;
                    scale = a;
                } else {
                    let r = a / scale;
                    ssq = ssq + r * r;
                }
            }
        }
    }
    if scale == zero {
        zero
    } else {
        scale * ssq.sqrt()
    }
}

/// y += alpha * A x for a column-major m x n block `a` with leading
/// dimension `lda`, where m = y.len()
pub fn gemv<F: Field>(alpha: F, a: &[F], lda: usize, n: usize, x: &[F], y: &mut [F]) {
    let m = y.len();
    debug_assert!(x.len() >= n);
    debug_assert!(n == 0 || a.len() >= (n - 1) * lda + m);
    for j in 0..n {
        let c = alpha * x[j];
        if !c.is_zero() {
            let col = &a[j * lda..j * lda + m];
            for i in 0..m {
                y[i] += c * col[i];
            }
        }
    }
}

/// Rank-one update A += alpha * x * y^T (unconjugated) on the leading
/// x.len() rows of a column-major buffer with leading dimension `lda`
pub fn geru<F: Field>(alpha: F, x: &[F], y: &[F], a: &mut [F], lda: usize) {
    debug_assert!(y.is_empty() || a.len() >= (y.len() - 1) * lda + x.len());
    for (j, &yj) in y.iter().enumerate() {
        let c = alpha * yj;
        if !c.is_zero() {
            let base = j * lda;
            for (i, &xi) in x.iter().enumerate() {
                a[base + i] += xi * c;
            }
        }
    }
}

/// sqrt(a^2 + b^2) without intermediate overflow
pub fn safe_hypot<R: RealField>(a: R, b: R) -> R {
    let aa = a.abs();
    let ab = b.abs();
    let (w, z) = if aa > ab { (aa, ab) } else { (ab, aa) };
    if z == R::zero() {
        w
    } else {
        let r = z / w;
        w * (R::one() + r * r).sqrt()
    }
}

/// Compute a Householder reflector for the column (alpha; x).
///
/// On return `alpha` holds beta (real, sign opposite to Re(alpha)), `x`
/// holds the reflector tail with an implicit unit leading entry, and the
/// returned tau satisfies (I - tau v v*)(alpha; x) = (beta; 0). When the
/// tail is zero and alpha is real, tau = 0 and the input is untouched.
pub fn left_reflector<F: Field>(alpha: &mut F, x: &mut [F]) -> F {
    let zero = <F::Real>::zero();
    let xnorm = nrm2(x);
    let alphr = alpha.real();
    let alphi = alpha.imag();

    if xnorm == zero && alphi == zero {
        return F::zero();
    }

    let mut beta = safe_hypot(safe_hypot(alphr, alphi), xnorm);
    if alphr >= zero {
        beta = -beta;
    }

    let tau = F::from_parts((beta - alphr) / beta, alphi / beta);
    let denom = *alpha - F::from_real(beta);
    scal(F::one() / denom, x);
    *alpha = F::from_real(beta);
    tau
}
