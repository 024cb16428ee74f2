//! Scalar field abstraction over real and complex floating-point types

use num_complex::Complex;
use num_traits::{Float, FloatConst, Num, NumAssign};
use std::fmt::{Debug, Display};
use std::ops::Neg;

/// A real or complex scalar field usable as matrix entries.
///
/// The associated `Real` type is the base field: `f32`/`f64` are their own
/// base, while `Complex<f32>`/`Complex<f64>` sit over the matching float.
pub trait Field:
    Copy + Debug + Display + Num + NumAssign + Neg<Output = Self> + Send + Sync + 'static
{
    /// The underlying real type
    type Real: RealField;

    /// Embed a real value
    fn from_real(re: Self::Real) -> Self;

    /// Build a value from real and imaginary parts.
    ///
    /// The imaginary part is discarded for real scalars.
    fn from_parts(re: Self::Real, im: Self::Real) -> Self;

    /// Real part
    fn real(&self) -> Self::Real;

    /// Imaginary part (zero for real scalars)
    fn imag(&self) -> Self::Real;

    /// Complex conjugate (identity for real scalars)
    fn conj(&self) -> Self;

    /// Absolute value (modulus for complex scalars)
    fn modulus(&self) -> Self::Real;

    /// Round the real and imaginary parts independently to the nearest
    /// integer, halves away from zero.
    fn round_nearest(&self) -> Self;
}

/// The real base field: `f32` or `f64`.
pub trait RealField: Field<Real = Self> + Float + FloatConst {
    /// Convert a literal `f64` (used for defaults and tolerances)
    fn from_f64(v: f64) -> Self;
}

impl Field for f32 {
    type Real = f32;

    fn from_real(re: f32) -> Self {
        re
    }

    fn from_parts(re: f32, _im: f32) -> Self {
        re
    }

    fn real(&self) -> f32 {
        *self
    }

    fn imag(&self) -> f32 {
        0.0
    }

    fn conj(&self) -> Self {
        *self
    }

    fn modulus(&self) -> f32 {
        (*self).abs()
    }

    fn round_nearest(&self) -> Self {
        (*self).round()
    }
}

impl RealField for f32 {
    fn from_f64(v: f64) -> Self {
        v as f32
    }
}

impl Field for f64 {
    type Real = f64;

    fn from_real(re: f64) -> Self {
        re
    }

    fn from_parts(re: f64, _im: f64) -> Self {
        re
    }

    fn real(&self) -> f64 {
        *self
    }

    fn imag(&self) -> f64 {
        0.0
    }

    fn conj(&self) -> Self {
        *self
    }

    fn modulus(&self) -> f64 {
        (*self).abs()
    }

    fn round_nearest(&self) -> Self {
        (*self).round()
    }
}

impl RealField for f64 {
    fn from_f64(v: f64) -> Self {
        v
    }
}

impl Field for Complex<f32> {
    type Real = f32;

    fn from_real(re: f32) -> Self {
        Complex::new(re, 0.0)
    }

    fn from_parts(re: f32, im: f32) -> Self {
        Complex::new(re, im)
    }

    fn real(&self) -> f32 {
        self.re
    }

    fn imag(&self) -> f32 {
        self.im
    }

    fn conj(&self) -> Self {
        Complex::new(self.re, -self.im)
    }

    fn modulus(&self) -> f32 {
        self.norm()
    }

    fn round_nearest(&self) -> Self {
        Complex::new(self.re.round(), self.im.round())
    }
}

impl Field for Complex<f64> {
    type Real = f64;

    fn from_real(re: f64) -> Self {
        Complex::new(re, 0.0)
    }

    fn from_parts(re: f64, im: f64) -> Self {
        Complex::new(re, im)
    }

    fn real(&self) -> f64 {
        self.re
    }

    fn imag(&self) -> f64 {
        self.im
    }

    fn conj(&self) -> Self {
        Complex::new(self.re, -self.im)
    }

    fn modulus(&self) -> f64 {
        self.norm()
    }

    fn round_nearest(&self) -> Self {
        Complex::new(self.re.round(), self.im.round())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_accessors() {
        let x = -2.5f64;
        assert_eq!(x.real(), -2.5);
        assert_eq!(x.imag(), 0.0);
        assert_eq!(Field::conj(&x), -2.5);
        assert_eq!(x.modulus(), 2.5);
    }

    #[test]
    fn test_round_halves_away_from_zero() {
        assert_eq!(1.5f64.round_nearest(), 2.0);
        assert_eq!((-1.5f64).round_nearest(), -2.0);
        assert_eq!(2.5f64.round_nearest(), 3.0);
        assert_eq!(0.49f64.round_nearest(), 0.0);
    }

    #[test]
    fn test_complex_round_is_entrywise() {
        let z = Complex::new(1.5f64, -0.5);
        assert_eq!(z.round_nearest(), Complex::new(2.0, -1.0));
    }

    #[test]
    fn test_complex_conj_and_modulus() {
        let z = Complex::new(3.0f64, -4.0);
        assert_eq!(Field::conj(&z), Complex::new(3.0, 4.0));
        assert!((z.modulus() - 5.0).abs() < 1e-15);
    }
}
