//! Dense column-major matrix container

use crate::core::blas;
use crate::core::error::{LatticeError, Result};
use crate::core::field::Field;
use num_traits::Zero;
use std::ops::{Index, IndexMut};

/// Dense matrix stored column-major, with leading dimension equal to the
/// row count. Columns are contiguous slices of the backing buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T: Field> Matrix<T> {
    /// Create a matrix with given dimensions, filled with zeros
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Matrix {
            data: vec![T::zero(); rows * cols],
            rows,
            cols,
        }
    }

    /// Create an identity matrix
    pub fn identity(n: usize) -> Self {
        let mut m = Matrix::zeros(n, n);
        for i in 0..n {
            m.data[i + i * n] = T::one();
        }
        m
    }

    /// Create a matrix from row-major nested vectors
    pub fn from_rows(rows_data: Vec<Vec<T>>) -> Result<Self> {
        if rows_data.is_empty() {
            return Err(LatticeError::invalid_parameters("Matrix cannot be empty"));
        }

        let rows = rows_data.len();
        let cols = rows_data[0].len();
        for (i, row) in rows_data.iter().enumerate() {
            if row.len() != cols {
                return Err(LatticeError::invalid_dimensions((rows, cols), (i + 1, row.len())));
            }
        }

        let mut m = Matrix::zeros(rows, cols);
        for (i, row) in rows_data.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                m.data[i + j * rows] = v;
            }
        }
        Ok(m)
    }

    /// Get the number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Get the number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Get the dimension of the matrix
    pub fn dimension(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Leading dimension of the backing buffer
    pub fn ld(&self) -> usize {
        self.rows
    }

    /// Get a reference to a specific element
    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row < self.rows && col < self.cols {
            self.data.get(row + col * self.rows)
        } else {
            None
        }
    }

    /// Set a specific element
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows || col >= self.cols {
            return Err(LatticeError::invalid_dimensions(
                (self.rows, self.cols),
                (row + 1, col + 1),
            ));
        }
        self.data[row + col * self.rows] = value;
        Ok(())
    }

    /// Read-only view of the backing buffer
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Mutable view of the backing buffer
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// A column as a contiguous slice
    pub fn col(&self, j: usize) -> &[T] {
        &self.data[j * self.rows..(j + 1) * self.rows]
    }

    /// A column as a mutable contiguous slice
    pub fn col_mut(&mut self, j: usize) -> &mut [T] {
        let r = self.rows;
        &mut self.data[j * r..(j + 1) * r]
    }

    /// Two distinct columns, the earlier read-only and the later mutable.
    /// Requires `a < b`.
    pub fn col_pair_mut(&mut self, a: usize, b: usize) -> (&[T], &mut [T]) {
        assert!(a < b && b < self.cols, "column pair ({}, {}) out of order or bounds", a, b);
        let r = self.rows;
        let (lo, hi) = self.data.split_at_mut(b * r);
        (&lo[a * r..(a + 1) * r], &mut hi[..r])
    }

    /// Split the buffer at column `j`: the block of columns `0..j` read-only
    /// and column `j` mutable
    pub fn split_at_col(&mut self, j: usize) -> (&[T], &mut [T]) {
        assert!(j < self.cols, "column {} out of bounds for {} columns", j, self.cols);
        let r = self.rows;
        let (lo, hi) = self.data.split_at_mut(j * r);
        (lo, &mut hi[..r])
    }

    /// Copy column `src` over column `dst`
    pub fn copy_col(&mut self, src: usize, dst: usize) {
        if src == dst {
            return;
        }
        let r = self.rows;
        self.data.copy_within(src * r..(src + 1) * r, dst * r);
    }

    /// Swap two columns
    pub fn swap_cols(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let r = self.rows;
        for i in 0..r {
            self.data.swap(i + a * r, i + b * r);
        }
    }

    /// Swap two rows
    pub fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let r = self.rows;
        for j in 0..self.cols {
            self.data.swap(a + j * r, b + j * r);
        }
    }

    /// row_dst += alpha * row_src
    pub fn row_axpy(&mut self, alpha: T, src: usize, dst: usize) {
        let r = self.rows;
        for j in 0..self.cols {
            let v = self.data[src + j * r];
            self.data[dst + j * r] += alpha * v;
        }
    }

    /// Copy row `i` into the provided buffer
    pub fn copy_row_into(&self, i: usize, out: &mut Vec<T>) {
        out.clear();
        out.extend((0..self.cols).map(|j| self.data[i + j * self.rows]));
    }

    /// Zero out column `j`
    pub fn zero_col(&mut self, j: usize) {
        self.col_mut(j).fill(T::zero());
    }

    /// Zero out everything strictly below the diagonal
    pub fn make_upper_trapezoidal(&mut self) {
        let r = self.rows;
        for j in 0..self.cols {
            for i in (j + 1)..r {
                self.data[i + j * r] = T::zero();
            }
        }
    }

    /// Frobenius norm
    pub fn frobenius_norm(&self) -> T::Real {
        blas::nrm2(&self.data)
    }

    /// Matrix product `self * other`
    pub fn matmul(&self, other: &Self) -> Result<Self> {
        if self.cols != other.rows {
            return Err(LatticeError::invalid_dimensions(
                (self.rows, self.cols),
                (other.rows, other.cols),
            ));
        }

        let mut out = Matrix::zeros(self.rows, other.cols);
        for j in 0..other.cols {
            for l in 0..self.cols {
                let x = other.data[l + j * other.rows];
                if !x.is_zero() {
                    let src = self.col(l);
                    let dst = out.col_mut(j);
                    for i in 0..src.len() {
                        dst[i] += src[i] * x;
                    }
                }
            }
        }
        Ok(out)
    }

    /// Determinant via LU with partial pivoting
    pub fn determinant(&self) -> Result<T> {
        if self.rows != self.cols {
            return Err(LatticeError::invalid_parameters(
                "Determinant only defined for square matrices",
            ));
        }

        let n = self.rows;
        if n == 0 {
            return Ok(T::one());
        }

        let mut a = self.clone();
        let mut det = T::one();
        for j in 0..n {
            let mut piv = j;
            let mut best = a[(j, j)].modulus();
            for i in (j + 1)..n {
                let v = a[(i, j)].modulus();
                if v > best {
                    best = v;
                    piv = i;
                }
            }
            if best == <T::Real as Zero>::zero() {
                return Ok(T::zero());
            }
            if piv != j {
                a.swap_rows(piv, j);
                det = -det;
            }
            let pivot = a[(j, j)];
            det *= pivot;
            for i in (j + 1)..n {
                let factor = a[(i, j)] / pivot;
                for k in (j + 1)..n {
                    let s = a[(j, k)];
                    a[(i, k)] = a[(i, k)] - factor * s;
                }
            }
        }
        Ok(det)
    }

    /// New matrix made of the selected columns, in the given order
    pub fn select_cols(&self, indices: &[usize]) -> Self {
        let mut out = Matrix::zeros(self.rows, indices.len());
        for (dst, &src) in indices.iter().enumerate() {
            out.col_mut(dst).copy_from_slice(self.col(src));
        }
        out
    }

    /// Convert to row-major nested vectors
    pub fn to_rows(&self) -> Vec<Vec<T>> {
        (0..self.rows)
            .map(|i| (0..self.cols).map(|j| self.data[i + j * self.rows]).collect())
            .collect()
    }
}

impl<T: Field> Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    fn index(&self, (i, j): (usize, usize)) -> &T {
        assert!(i < self.rows && j < self.cols, "index ({}, {}) out of bounds", i, j);
        &self.data[i + j * self.rows]
    }
}

impl<T: Field> IndexMut<(usize, usize)> for Matrix<T> {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        assert!(i < self.rows && j < self.cols, "index ({}, {}) out of bounds", i, j);
        &mut self.data[i + j * self.rows]
    }
}

impl<T: Field> std::fmt::Display for Matrix<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Matrix {}x{}:", self.rows, self.cols)?;
        for row in self.to_rows() {
            writeln!(
                f,
                "[{}]",
                row.iter().map(|x| x.to_string()).collect::<Vec<_>>().join(", ")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_creation() {
        let m = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.cols(), 2);
        assert_eq!(m[(0, 1)], 2.0);
        assert_eq!(m.col(0), &[1.0, 3.0]);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let r = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0]]);
        assert!(r.is_err());
    }

    #[test]
    fn test_identity_and_matmul() {
        let m = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let id = Matrix::identity(2);
        let p = m.matmul(&id).unwrap();
        assert_eq!(p, m);
    }

    #[test]
    fn test_swap_and_copy_cols() {
        let mut m = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        m.swap_cols(0, 1);
        assert_eq!(m.col(0), &[2.0, 4.0]);
        m.copy_col(0, 1);
        assert_eq!(m.col(1), &[2.0, 4.0]);
    }

    #[test]
    fn test_row_axpy() {
        let mut m = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        m.row_axpy(2.0, 0, 1);
        assert_eq!(m.to_rows()[1], vec![5.0, 8.0]);
    }

    #[test]
    fn test_determinant() {
        let m: Matrix<f64> = Matrix::from_rows(vec![vec![2.0, 3.0], vec![1.0, 4.0]]).unwrap();
        assert!((m.determinant().unwrap() - 5.0).abs() < 1e-12);

        let s: Matrix<f64> = Matrix::from_rows(vec![vec![1.0, 2.0], vec![2.0, 4.0]]).unwrap();
        assert_eq!(s.determinant().unwrap(), 0.0);
    }

    #[test]
    fn test_make_upper_trapezoidal() {
        let mut m = Matrix::from_rows(vec![
            vec![1.0, 2.0],
            vec![3.0, 4.0],
            vec![5.0, 6.0],
        ])
        .unwrap();
        m.make_upper_trapezoidal();
        assert_eq!(m.to_rows(), vec![vec![1.0, 2.0], vec![0.0, 4.0], vec![0.0, 0.0]]);
    }

    #[test]
    fn test_col_pair_mut_disjoint() {
        let mut m = Matrix::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        let (a, b) = m.col_pair_mut(0, 2);
        assert_eq!(a, &[1.0, 4.0]);
        b[0] = 9.0;
        assert_eq!(m[(0, 2)], 9.0);
    }
}
