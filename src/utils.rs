//! Utility generators for test and benchmark bases

use crate::core::matrix::Matrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generate a random basis with integer-valued entries in [-bound, bound]
pub fn random_integer_basis(m: usize, n: usize, bound: i64, seed: Option<u64>) -> Matrix<f64> {
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => {
            let mut entropy = rand::rng();
            <StdRng as SeedableRng>::from_rng(&mut entropy)
        }
    };

    let mut b = Matrix::zeros(m, n);
    for j in 0..n {
        for i in 0..m {
            b[(i, j)] = rng.random_range(-bound..=bound) as f64;
        }
    }
    b
}

/// Unit-diagonal upper-triangular basis whose off-diagonal entries span
/// several orders of magnitude, for conditioning stress tests. The result
/// is unimodular with condition number around 10^6.
pub fn random_ill_conditioned_basis(n: usize, seed: u64) -> Matrix<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut b = Matrix::zeros(n, n);
    for j in 0..n {
        b[(j, j)] = 1.0;
        let scale = 10f64.powi((j % 7) as i32);
        for i in 0..j {
            b[(i, j)] = rng.random_range(-scale..scale).round();
        }
    }
    b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_basis_is_seeded() {
        let a = random_integer_basis(4, 4, 50, Some(7));
        let b = random_integer_basis(4, 4, 50, Some(7));
        assert_eq!(a, b);
        for j in 0..4 {
            for i in 0..4 {
                let v = a[(i, j)];
                assert!(v.abs() <= 50.0);
                assert_eq!(v, v.round());
            }
        }
    }

    #[test]
    fn test_ill_conditioned_basis_shape() {
        let b = random_ill_conditioned_basis(8, 3);
        let mut largest = 0.0f64;
        for j in 0..8 {
            assert_eq!(b[(j, j)], 1.0);
            for i in 0..8 {
                if i > j {
                    assert_eq!(b[(i, j)], 0.0);
                }
                largest = largest.max(b[(i, j)].abs());
            }
        }
        // unimodular by construction, with entries spanning many magnitudes
        assert!((b.determinant().unwrap() - 1.0).abs() < 1e-12);
        assert!(largest >= 1.0e4);
    }
}
