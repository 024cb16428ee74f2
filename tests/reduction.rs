//! End-to-end reduction scenarios and invariants

use lattice_reducer::utils::{random_ill_conditioned_basis, random_integer_basis};
use lattice_reducer::{LLLInfo, LLLParams, LLLReducer, Matrix};
use num_complex::Complex;

type C64 = Complex<f64>;

fn max_abs_diff(a: &Matrix<f64>, b: &Matrix<f64>) -> f64 {
    let mut diff = 0.0f64;
    for i in 0..a.rows() {
        for j in 0..a.cols() {
            diff = diff.max((a[(i, j)] - b[(i, j)]).abs());
        }
    }
    diff
}

/// eta size-reduction of R against all earlier columns
fn assert_size_reduced(r: &Matrix<f64>, eta: f64) {
    let slack = eta + f64::EPSILON.sqrt();
    let min_dim = r.rows().min(r.cols());
    for j in 1..r.cols() {
        for i in 0..j.min(min_dim) {
            let rii = r[(i, i)];
            if rii > 0.0 {
                let chi = (r[(i, j)] / rii).abs();
                assert!(chi <= slack, "R({}, {}) / R({}, {}) = {} breaks eta", i, j, i, i, chi);
            }
        }
    }
}

/// Adjacent Lovász at the achieved delta
fn assert_lovasz(r: &Matrix<f64>, delta: f64) {
    let min_dim = r.rows().min(r.cols());
    for i in 0..min_dim.saturating_sub(1) {
        let rii = r[(i, i)];
        let rnext = r[(i + 1, i + 1)];
        if rii > 0.0 && rnext > 0.0 {
            let lhs = delta * rii * rii;
            let rhs = rnext * rnext + r[(i, i + 1)] * r[(i, i + 1)];
            assert!(lhs <= rhs * (1.0 + 1e-10) + 1e-12, "Lovász fails at {}", i);
        }
    }
}

fn assert_consistency(b_in: &Matrix<f64>, u: &Matrix<f64>, b_out: &Matrix<f64>) {
    let product = b_in.matmul(u).unwrap();
    let bound = ((b_in.rows() * b_in.cols()) as f64).sqrt()
        * f64::EPSILON
        * b_in.frobenius_norm()
        * u.frobenius_norm().max(1.0)
        * 100.0;
    assert!(
        max_abs_diff(&product, b_out) <= bound.max(1e-12),
        "B_in * U does not reproduce the reduced basis"
    );
}

fn reduce_full_f64(
    b: &mut Matrix<f64>,
    params: &LLLParams<f64>,
) -> (LLLInfo<f64>, Matrix<f64>, Matrix<f64>, Matrix<f64>) {
    let reducer = LLLReducer::with_params(params.clone());
    let mut u = Matrix::zeros(0, 0);
    let mut u_inv = Matrix::zeros(0, 0);
    let mut r = Matrix::zeros(0, 0);
    let info = reducer.reduce_full(b, &mut u, &mut u_inv, &mut r).unwrap();
    (info, u, u_inv, r)
}

#[test]
fn reduced_triangular_basis_keeps_unit_diagonal() {
    let mut b = Matrix::from_rows(vec![
        vec![1.0, 1.0, 1.0],
        vec![0.0, 1.0, 2.0],
        vec![0.0, 0.0, 1.0],
    ])
    .unwrap();
    let params = LLLParams::default();
    let reducer = LLLReducer::with_params(params.clone());
    let mut r: Matrix<f64> = Matrix::zeros(0, 0);
    let info = reducer.reduce_form_r(&mut b, &mut r).unwrap();

    assert_eq!(info.num_swaps, 0);
    assert!(info.delta >= 0.75);
    for i in 0..3 {
        assert!((r[(i, i)] - 1.0).abs() < 1e-10);
    }
    assert_size_reduced(&r, params.eta);
}

#[test]
fn skewed_2d_basis_swaps_and_stays_unimodular() {
    let b_in = Matrix::from_rows(vec![vec![2.0, 3.0], vec![0.0, 1.0]]).unwrap();
    let mut b = b_in.clone();
    let params = LLLParams::default();
    let (info, u, u_inv, r) = reduce_full_f64(&mut b, &params);

    assert!(info.num_swaps >= 1);
    assert!((u.determinant().unwrap().abs() - 1.0).abs() < 1e-9);
    assert_consistency(&b_in, &u, &b);
    assert_lovasz(&r, info.delta);
    assert_size_reduced(&r, params.eta);

    let id = u.matmul(&u_inv).unwrap();
    let eye = Matrix::identity(2);
    assert!(max_abs_diff(&id, &eye) < 1e-9);
}

#[test]
fn rank_deficient_basis_reports_nullity() {
    let b_in = Matrix::from_rows(vec![vec![3.0, 7.0, 11.0], vec![2.0, 5.0, 8.0]]).unwrap();
    let mut b = b_in.clone();
    let params = LLLParams::default();
    let (info, u, _u_inv, _r) = reduce_full_f64(&mut b, &params);

    assert_eq!(info.nullity, 1);
    assert_eq!(info.rank, 2);
    assert!(info.num_swaps > 0);
    assert_eq!(info.rank + info.nullity, 3);
    assert_consistency(&b_in, &u, &b);

    // zero columns are exactly zero, and sorting them last leaves the
    // trailing column zero
    let mut cols: Vec<Vec<f64>> = (0..3).map(|j| b.col(j).to_vec()).collect();
    cols.sort_by_key(|c| usize::from(c.iter().all(|&v| v == 0.0)));
    assert!(cols[2].iter().all(|&v| v == 0.0));
    assert!(cols[0].iter().any(|&v| v != 0.0));
    assert!(cols[1].iter().any(|&v| v != 0.0));
}

#[test]
fn image_and_kernel_split_the_basis() {
    let b_in: Matrix<f64> =
        Matrix::from_rows(vec![vec![3.0, 7.0, 11.0], vec![2.0, 5.0, 8.0]]).unwrap();
    let mut b = b_in.clone();
    let reducer = LLLReducer::<f64>::new();
    let mut image: Matrix<f64> = Matrix::zeros(0, 0);
    let mut kernel: Matrix<f64> = Matrix::zeros(0, 0);
    let info = reducer
        .lattice_image_and_kernel(&mut b, &mut image, &mut kernel)
        .unwrap();

    assert_eq!(info.nullity, 1);
    assert_eq!(image.cols(), 2);
    assert_eq!(kernel.cols(), 1);

    // the kernel columns are integer null vectors of the input
    let residual = b_in.matmul(&kernel).unwrap();
    assert!(residual.frobenius_norm() < 1e-9);
    let entries = kernel.col(0);
    assert!(entries.iter().any(|&v| v != 0.0));
    for &v in entries {
        assert_eq!(v, v.round());
    }
}

#[test]
fn random_bases_satisfy_reduction_properties() {
    for (seed, m, n) in [(1u64, 5, 5), (2, 8, 8), (3, 6, 4), (4, 10, 10)] {
        let b_in = random_integer_basis(m, n, 30, Some(seed));
        let mut b = b_in.clone();
        let params = LLLParams::default();
        let (info, u, u_inv, r) = reduce_full_f64(&mut b, &params);

        assert_size_reduced(&r, params.eta);
        assert_lovasz(&r, info.delta);
        assert_consistency(&b_in, &u, &b);
        assert!((u.determinant().unwrap().abs() - 1.0).abs() < 1e-4);

        let id = u.matmul(&u_inv).unwrap();
        let eye = Matrix::identity(n);
        assert!(max_abs_diff(&id, &eye) < 1e-6);

        // log_vol matches the product of the non-zero diagonal entries
        let mut prod = 1.0f64;
        for j in 0..m.min(n) {
            if r[(j, j)] > 0.0 {
                prod *= r[(j, j)];
            }
        }
        let tol = 100.0 * (n as f64) * f64::EPSILON * prod.max(1.0);
        assert!(((info.log_vol / 2.0).exp() - prod).abs() <= tol.max(1e-9));
    }
}

#[test]
fn reduction_is_idempotent() {
    let mut params = LLLParams::default();
    params.presort = false;
    let reducer = LLLReducer::with_params(params);

    let mut b = random_integer_basis(6, 6, 40, Some(11));
    reducer.reduce(&mut b).unwrap();
    let once = b.clone();
    let info = reducer.reduce(&mut b).unwrap();

    assert_eq!(info.num_swaps, 0);
    assert!(max_abs_diff(&once, &b) < 1e-9, "a reduced basis is a fixed point");
}

#[test]
fn weak_mode_bounds_the_superdiagonal() {
    let mut params = LLLParams::default();
    params.weak = true;
    let reducer = LLLReducer::with_params(params.clone());

    let mut b = random_integer_basis(6, 6, 25, Some(21));
    let mut r = Matrix::zeros(0, 0);
    let info = reducer.reduce_form_r(&mut b, &mut r).unwrap();

    let slack = params.eta + f64::EPSILON.sqrt();
    for i in 0..5 {
        if r[(i, i)] > 0.0 {
            let chi = (r[(i, i + 1)] / r[(i, i)]).abs();
            assert!(chi <= slack);
        }
    }
    assert_lovasz(&r, info.delta);
}

#[test]
fn reorthogonalization_variants_still_reduce() {
    let mut params = LLLParams::default();
    params.reorthog_tol = 0.5;
    params.num_orthog = 2;
    let reducer = LLLReducer::with_params(params.clone());

    let b_in = random_ill_conditioned_basis(8, 5);
    let mut b = b_in.clone();
    let mut u = Matrix::zeros(0, 0);
    let mut u_inv = Matrix::zeros(0, 0);
    let mut r = Matrix::zeros(0, 0);
    let info = reducer.reduce_full(&mut b, &mut u, &mut u_inv, &mut r).unwrap();

    assert_size_reduced(&r, params.eta);
    assert_lovasz(&r, info.delta);
    assert_consistency(&b_in, &u, &b);
}

#[test]
fn deep_and_adjacent_agree_on_the_lattice() {
    let b_in = random_ill_conditioned_basis(10, 9);

    let mut adjacent = LLLParams::default();
    adjacent.deep = false;
    let mut b_adj = b_in.clone();
    let (info_adj, u_adj, ui_adj, r_adj) = reduce_full_f64(&mut b_adj, &adjacent);

    let mut deep = LLLParams::default();
    deep.deep = true;
    let mut b_deep = b_in.clone();
    let (info_deep, u_deep, ui_deep, r_deep) = reduce_full_f64(&mut b_deep, &deep);

    let eye = Matrix::identity(10);
    for (params, info, u, u_inv, r, b_out) in [
        (&adjacent, &info_adj, &u_adj, &ui_adj, &r_adj, &b_adj),
        (&deep, &info_deep, &u_deep, &ui_deep, &r_deep, &b_deep),
    ] {
        assert_size_reduced(r, params.eta);
        assert_lovasz(r, info.delta);
        assert_consistency(&b_in, u, b_out);
        // U and UInv stay exact integer inverses of one another
        let id = u.matmul(u_inv).unwrap();
        assert!(max_abs_diff(&id, &eye) < 1e-9);
        assert_eq!(info.nullity, 0);
    }

    // both runs reduce the same lattice, so the volumes agree
    let scale = info_adj.log_vol.abs().max(1.0);
    assert!((info_adj.log_vol - info_deep.log_vol).abs() <= 1e-6 * scale);

    // the deep condition holds pairwise for the deep run
    for j in 1..10 {
        for i in 0..j {
            if r_deep[(i, i)] > 0.0 {
                let mut tail = 0.0;
                for l in i..=j {
                    tail += r_deep[(l, j)] * r_deep[(l, j)];
                }
                let lhs = deep.delta * r_deep[(i, i)] * r_deep[(i, i)];
                assert!(lhs <= tail * (1.0 + 1e-9) + 1e-12);
            }
        }
    }
}

#[test]
fn wide_basis_reduces_to_gcd() {
    // one row: the lattice of 2 Z + 3 Z = Z
    let b_in = Matrix::from_rows(vec![vec![2.0, 3.0]]).unwrap();
    let mut b = b_in.clone();
    let params = LLLParams::default();
    let (info, u, _u_inv, _r) = reduce_full_f64(&mut b, &params);

    assert_eq!(info.nullity, 1);
    assert_eq!(info.rank, 1);
    assert_consistency(&b_in, &u, &b);

    let nonzero: Vec<f64> = (0..2)
        .map(|j| b[(0, j)])
        .filter(|v| *v != 0.0)
        .collect();
    assert_eq!(nonzero.len(), 1);
    assert!((nonzero[0].abs() - 1.0).abs() < 1e-12);
}

#[test]
fn single_column_basis_is_trivial() {
    let mut b = Matrix::from_rows(vec![vec![5.0], vec![0.0]]).unwrap();
    let reducer = LLLReducer::<f64>::new();
    let info = reducer.reduce(&mut b).unwrap();
    assert_eq!(info.rank, 1);
    assert_eq!(info.nullity, 0);
    assert_eq!(info.num_swaps, 0);
    assert!((info.delta - 1.0).abs() < 1e-12);
    assert!((info.log_vol - 2.0 * 5.0f64.ln()).abs() < 1e-12);
}

#[test]
fn complex_basis_reduces_over_gaussian_integers() {
    let b_in = Matrix::from_rows(vec![
        vec![C64::new(3.0, 1.0), C64::new(5.0, 2.0)],
        vec![C64::new(0.0, 0.0), C64::new(1.0, -1.0)],
    ])
    .unwrap();
    let mut b = b_in.clone();
    let params = LLLParams::<f64>::default();
    let reducer = LLLReducer::with_params(params.clone());
    let mut u = Matrix::zeros(0, 0);
    let mut u_inv = Matrix::zeros(0, 0);
    let mut r = Matrix::zeros(0, 0);
    let info = reducer.reduce_full(&mut b, &mut u, &mut u_inv, &mut r).unwrap();

    // U is Gaussian-integer with unit-modulus determinant
    for i in 0..2 {
        for j in 0..2 {
            let v = u[(i, j)];
            assert!((v.re - v.re.round()).abs() < 1e-9);
            assert!((v.im - v.im.round()).abs() < 1e-9);
        }
    }
    let det = u.determinant().unwrap();
    assert!((det.norm() - 1.0).abs() < 1e-9);

    // size reduction holds on real and imaginary parts
    let slack = params.eta + f64::EPSILON.sqrt();
    if r[(0, 0)].re > 0.0 {
        let chi = r[(0, 1)] / r[(0, 0)];
        assert!(chi.re.abs() <= slack);
        assert!(chi.im.abs() <= slack);
    }

    // consistency over the complex field
    let product = b_in.matmul(&u).unwrap();
    let mut diff = 0.0f64;
    for i in 0..2 {
        for j in 0..2 {
            diff = diff.max((product[(i, j)] - b[(i, j)]).norm());
        }
    }
    assert!(diff < 1e-9);
    assert!(info.rank == 2 && info.nullity == 0);
}
