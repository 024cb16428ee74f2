//! Lattice basis reduction with the LLL algorithm
//!
//! This crate reduces a real or complex basis B in place so that
//! B U = D = Q R with U unimodular and R eta size-reduced and delta
//! Lovász reduced. The engine is built on Householder QR expansion, with
//! optional weak size-reduction, deep insertions, reorthogonalization
//! retries, and MLLL-style handling of linearly dependent columns. On top
//! of the reducer sit two applications: Z-dependence search and
//! algebraic-relation search.
//!
//! # Examples
//!
//! Basic reduction:
//! ```rust
//! use lattice_reducer::{LLLReducer, Matrix};
//!
//! # fn main() -> Result<(), lattice_reducer::LatticeError> {
//! let mut b = Matrix::from_rows(vec![
//!     vec![1.0, 1.0, 1.0],
//!     vec![0.0, 1.0, 2.0],
//!     vec![0.0, 0.0, 1.0],
//! ])?;
//!
//! let reducer = LLLReducer::new();
//! let info = reducer.reduce(&mut b)?;
//! assert_eq!(info.rank, 3);
//! assert_eq!(info.nullity, 0);
//! # Ok(())
//! # }
//! ```
//!
//! Full reduction with the unimodular transform:
//! ```rust
//! use lattice_reducer::{LLLParams, LLLReducer, Matrix};
//!
//! # fn main() -> Result<(), lattice_reducer::LatticeError> {
//! let mut b = Matrix::from_rows(vec![vec![2.0, 3.0], vec![0.0, 1.0]])?;
//! let mut u = Matrix::zeros(0, 0);
//! let mut u_inv = Matrix::zeros(0, 0);
//! let mut r = Matrix::zeros(0, 0);
//!
//! let reducer = LLLReducer::with_params(LLLParams::new(0.75, 0.51));
//! let info = reducer.reduce_full(&mut b, &mut u, &mut u_inv, &mut r)?;
//! assert!(info.num_swaps >= 1);
//! let det = u.determinant()?;
//! assert!((det.abs() - 1.0).abs() < 1e-9);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod lll;
pub mod relations;
mod unblocked;
pub mod utils;

pub use crate::core::error::{LatticeError, Result};
pub use crate::core::field::{Field, RealField};
pub use crate::core::matrix::Matrix;
pub use crate::lll::{gaussian_heuristic, log_potential, LLLInfo, LLLParams, LLLReducer};
pub use crate::relations::{algebraic_relation_search, z_dependence_search};
