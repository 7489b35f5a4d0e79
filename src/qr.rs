//! # QR decomposition by classical Gram-Schmidt
//!
//! Factorises an `m × n` matrix `A` into `Q` (`m × n`, orthonormal columns) and
//! `R` (`n × n`, upper-triangular) column by column:
//!
//! - for column `j`, every projection coefficient `R[i, j] = q_iᵀ a_j` (`i < j`)
//!   is taken against the *original* column `a_j` and subtracted from the
//!   running residual
//! - `R[j, j]` is the residual length; the residual is normalised into `q_j`
//!   when `R[j, j] > QR_EPSILON`, otherwise it is stored as-is
//!
//! There is no pivoting and no re-orthogonalisation pass. Precision lost here is
//! recovered by the eigensolver, which applies the factorisation repeatedly.
//!
//! A rank-deficient input therefore yields a `Q` whose degenerate columns are
//! tiny unnormalised residuals rather than exact zeros or completed basis
//! vectors; `QᵀQ ≈ I` holds only on the non-degenerate columns.

use log::trace;

use crate::matrix::Matrix;
use crate::operators::{dot, norm, scale, sub_scaled_inplace};

/// Residual length at or below which a column is treated as degenerate.
pub const QR_EPSILON: f64 = 1e-10;

/// `(Q, R)` with `A ≈ Q · R`.
#[derive(Clone, Debug)]
pub struct QrResult {
    pub q: Matrix,
    pub r: Matrix,
}

/// Classical Gram-Schmidt QR of `a`.
///
/// Typical inputs are square or tall; a wide input still factorises but its
/// trailing columns are necessarily degenerate.
pub fn qr_decompose(a: &Matrix) -> QrResult {
    let (m, n) = a.shape();
    let a_cols = a.columns();
    let mut q_cols: Vec<Vec<f64>> = Vec::with_capacity(n);
    let mut r = Matrix::zeros(n, n);

    for (j, a_j) in a_cols.iter().enumerate() {
        let mut v = a_j.clone();

        for (i, q_i) in q_cols.iter().enumerate() {
            let r_ij = dot(q_i, a_j);
            r[(i, j)] = r_ij;
            sub_scaled_inplace(&mut v, r_ij, q_i);
        }

        let r_jj = norm(&v);
        r[(j, j)] = r_jj;
        if r_jj > QR_EPSILON {
            q_cols.push(scale(&v, 1.0 / r_jj));
        } else {
            trace!("QR column {} degenerate (residual {:.3e})", j, r_jj);
            q_cols.push(v);
        }
    }

    QrResult {
        q: Matrix::from_columns(m, &q_cols),
        r,
    }
}
