//! Dense row-major matrix used by every decomposition in the crate.
//!
//! `Matrix` stores its entries in a flattened row-major `Vec<f64>` with fixed
//! dimensions. It carries only the operations the QR/eigen/SVD pipeline and the
//! embedding models need: products, transpose, column access, diagonal helpers
//! and Frobenius/off-diagonal norms.
//!
//! Interop:
//! - [`Matrix::to_dense_matrix`] / [`Matrix::from_dense_matrix`] convert to and
//!   from smartcore's `DenseMatrix<f64>`.
//! - [`Matrix::from_sparse`] densifies a sprs CSR/CSC matrix, the form an
//!   external TF-IDF stage usually hands over.
//!
//! # Panics
//!
//! - Indexing panics on out-of-bounds row/column indices.
//! - Products and differences panic on mismatched shapes.

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::arrays::{Array, Array2};
use smartcore::linalg::basic::matrix::DenseMatrix;
use sprs::CsMat;

use crate::error::{LowRankError, Result};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    nrows: usize,
    ncols: usize,
    data: Vec<f64>, // row-major flattened
}

impl Matrix {
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            data: vec![0.0; nrows * ncols],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m[(i, i)] = 1.0;
        }
        m
    }

    /// Builds from flattened row-major data.
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != nrows * ncols`.
    pub fn from_vec(nrows: usize, ncols: usize, data: Vec<f64>) -> Self {
        assert_eq!(
            data.len(),
            nrows * ncols,
            "data length must equal nrows * ncols"
        );
        Self { nrows, ncols, data }
    }

    /// Builds from a vector of equally sized rows.
    ///
    /// Returns `InvalidInput` if rows have differing lengths.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let nrows = rows.len();
        let ncols = rows.first().map(|r| r.len()).unwrap_or(0);
        if let Some(bad) = rows.iter().position(|r| r.len() != ncols) {
            return Err(LowRankError::InvalidInput(format!(
                "row {} has length {}, expected {}",
                bad,
                rows[bad].len(),
                ncols
            )));
        }
        let data = rows.into_iter().flatten().collect();
        Ok(Self { nrows, ncols, data })
    }

    /// Builds an `nrows × columns.len()` matrix from column vectors.
    ///
    /// # Panics
    ///
    /// Panics if any column length differs from `nrows`.
    pub fn from_columns(nrows: usize, columns: &[Vec<f64>]) -> Self {
        let ncols = columns.len();
        let mut m = Self::zeros(nrows, ncols);
        for (j, col) in columns.iter().enumerate() {
            m.set_column(j, col);
        }
        m
    }

    /// Square diagonal matrix with `diagonal` on its main diagonal.
    pub fn from_diagonal(diagonal: &[f64]) -> Self {
        let n = diagonal.len();
        let mut m = Self::zeros(n, n);
        for (i, &d) in diagonal.iter().enumerate() {
            m[(i, i)] = d;
        }
        m
    }

    /// Densifies a sparse matrix; entries not stored are zero.
    pub fn from_sparse(sparse: &CsMat<f64>) -> Self {
        let (nrows, ncols) = sparse.shape();
        let mut m = Self::zeros(nrows, ncols);
        for (&value, (i, j)) in sparse.iter() {
            m[(i, j)] += value;
        }
        m
    }

    pub fn from_dense_matrix(dense: &DenseMatrix<f64>) -> Self {
        let (nrows, ncols) = dense.shape();
        let data = (0..nrows)
            .flat_map(|i| (0..ncols).map(move |j| *dense.get((i, j))))
            .collect();
        Self { nrows, ncols, data }
    }

    pub fn to_dense_matrix(&self) -> DenseMatrix<f64> {
        DenseMatrix::from_iterator(self.data.iter().copied(), self.nrows, self.ncols, 0)
    }

    /// Returns (nrows, ncols).
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Zero-copy view of row `i`.
    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        assert!(i < self.nrows, "Row index out of bounds");
        let start = i * self.ncols;
        &self.data[start..start + self.ncols]
    }

    /// Iterates rows as slices.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.nrows).map(move |i| self.row(i))
    }

    /// Owned copy of column `j`.
    pub fn column(&self, j: usize) -> Vec<f64> {
        assert!(j < self.ncols, "Column index out of bounds");
        (0..self.nrows).map(|i| self.data[i * self.ncols + j]).collect()
    }

    pub fn set_column(&mut self, j: usize, values: &[f64]) {
        assert!(j < self.ncols, "Column index out of bounds");
        assert_eq!(values.len(), self.nrows, "Column length mismatch");
        for (i, &v) in values.iter().enumerate() {
            self.data[i * self.ncols + j] = v;
        }
    }

    /// All columns as owned vectors, in order.
    pub fn columns(&self) -> Vec<Vec<f64>> {
        (0..self.ncols).map(|j| self.column(j)).collect()
    }

    pub fn transpose(&self) -> Self {
        let mut t = Self::zeros(self.ncols, self.nrows);
        for i in 0..self.nrows {
            for j in 0..self.ncols {
                t.data[j * self.nrows + i] = self.data[i * self.ncols + j];
            }
        }
        t
    }

    /// Matrix product `self · other`.
    ///
    /// # Panics
    ///
    /// Panics if `self.ncols() != other.nrows()`.
    pub fn matmul(&self, other: &Matrix) -> Matrix {
        assert_eq!(
            self.ncols, other.nrows,
            "Inner dimensions must agree for matmul"
        );
        let mut out = Self::zeros(self.nrows, other.ncols);
        for i in 0..self.nrows {
            let out_row = &mut out.data[i * other.ncols..(i + 1) * other.ncols];
            for k in 0..self.ncols {
                let a_ik = self.data[i * self.ncols + k];
                if a_ik == 0.0 {
                    continue;
                }
                let other_row = &other.data[k * other.ncols..(k + 1) * other.ncols];
                out_row
                    .iter_mut()
                    .zip(other_row.iter())
                    .for_each(|(o, &b)| *o += a_ik * b);
            }
        }
        out
    }

    /// Matrix-vector product `self · x`.
    pub fn matvec(&self, x: &[f64]) -> Vec<f64> {
        assert_eq!(self.ncols, x.len(), "Dimension mismatch");
        self.rows()
            .map(|row| row.iter().zip(x.iter()).map(|(a, b)| a * b).sum())
            .collect()
    }

    /// Transposed matrix-vector product `selfᵀ · x`, without materialising
    /// the transpose.
    pub fn transpose_matvec(&self, x: &[f64]) -> Vec<f64> {
        assert_eq!(self.nrows, x.len(), "Dimension mismatch");
        let mut out = vec![0.0; self.ncols];
        for (row, &xi) in self.rows().zip(x.iter()) {
            out.iter_mut()
                .zip(row.iter())
                .for_each(|(o, &a)| *o += a * xi);
        }
        out
    }

    /// Gram matrix `selfᵀ · self` (ncols × ncols, symmetric PSD).
    pub fn gram(&self) -> Matrix {
        let n = self.ncols;
        let mut g = Self::zeros(n, n);
        for row in self.rows() {
            for i in 0..n {
                let ri = row[i];
                if ri == 0.0 {
                    continue;
                }
                for j in i..n {
                    g.data[i * n + j] += ri * row[j];
                }
            }
        }
        for i in 0..n {
            for j in 0..i {
                g.data[i * n + j] = g.data[j * n + i];
            }
        }
        g
    }

    /// Element-wise `self - other`.
    pub fn sub(&self, other: &Matrix) -> Matrix {
        assert_eq!(self.shape(), other.shape(), "Shape mismatch");
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a - b)
            .collect();
        Self {
            nrows: self.nrows,
            ncols: self.ncols,
            data,
        }
    }

    /// Main diagonal, length `min(nrows, ncols)`.
    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.nrows.min(self.ncols))
            .map(|i| self.data[i * self.ncols + i])
            .collect()
    }

    /// Sum of absolute values of every entry off the main diagonal.
    pub fn off_diagonal_abs_sum(&self) -> f64 {
        let mut total = 0.0;
        for i in 0..self.nrows {
            for j in 0..self.ncols {
                if i != j {
                    total += self.data[i * self.ncols + j].abs();
                }
            }
        }
        total
    }

    pub fn frobenius_norm(&self) -> f64 {
        self.data.iter().map(|&x| x * x).sum::<f64>().sqrt()
    }

    /// First `k` columns (clamped to `ncols`).
    pub fn leading_columns(&self, k: usize) -> Matrix {
        let k = k.min(self.ncols);
        let mut out = Self::zeros(self.nrows, k);
        for i in 0..self.nrows {
            out.data[i * k..(i + 1) * k].copy_from_slice(&self.row(i)[..k]);
        }
        out
    }

    /// First `k` rows (clamped to `nrows`).
    pub fn leading_rows(&self, k: usize) -> Matrix {
        let k = k.min(self.nrows);
        Self {
            nrows: k,
            ncols: self.ncols,
            data: self.data[..k * self.ncols].to_vec(),
        }
    }

    /// Reorders columns: column `j` of the result is column `order[j]` of self.
    pub fn select_columns(&self, order: &[usize]) -> Matrix {
        let mut out = Self::zeros(self.nrows, order.len());
        for i in 0..self.nrows {
            for (j, &src) in order.iter().enumerate() {
                out.data[i * order.len() + j] = self.data[i * self.ncols + src];
            }
        }
        out
    }

    /// True when every entry is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }

    /// Checks `data.len() == nrows * ncols`; used after deserialisation.
    pub(crate) fn validate_layout(&self) -> Result<()> {
        if self.data.len() != self.nrows * self.ncols {
            return Err(LowRankError::InvalidInput(format!(
                "matrix payload has {} entries, expected {}x{}",
                self.data.len(),
                self.nrows,
                self.ncols
            )));
        }
        Ok(())
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        assert!(i < self.nrows && j < self.ncols, "Index out of bounds");
        &self.data[i * self.ncols + j]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        assert!(i < self.nrows && j < self.ncols, "Index out of bounds");
        &mut self.data[i * self.ncols + j]
    }
}
