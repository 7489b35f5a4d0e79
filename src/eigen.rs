//! # Eigenvalues by the unshifted QR algorithm
//!
//! Starting from `A₀ = A` and `Q_total = I`, each step factorises
//! `A_k = Q · R`, forms the similar matrix `A_{k+1} = R · Q` and accumulates
//! `Q_total ← Q_total · Q`. Iteration stops as soon as the sum of absolute
//! off-diagonal entries of `A_{k+1}` drops below `tol`, or after `max_iter`
//! steps. Eigenvalues are read off the diagonal of the last `A_k`, eigenvectors
//! are the columns of `Q_total`.
//!
//! The method is only correct for symmetric input. The crate's sole caller
//! passes a Gram matrix `AᵀA`, which is symmetric positive semi-definite by
//! construction, so symmetry is not checked at runtime: a non-symmetric matrix
//! produces unspecified values.
//!
//! Exhausting `max_iter` is not an error. The last iterate is returned as the
//! best available approximation and `EigenResult::converged` is `false`.
//! There is no other cancellation point; callers needing a time budget must
//! lower `max_iter`.

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::matrix::Matrix;
use crate::qr::qr_decompose;

pub const DEFAULT_MAX_ITER: usize = 1000;
pub const DEFAULT_TOL: f64 = 1e-10;

/// Iteration cap and off-diagonal convergence tolerance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EigenParams {
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for EigenParams {
    fn default() -> Self {
        Self {
            max_iter: DEFAULT_MAX_ITER,
            tol: DEFAULT_TOL,
        }
    }
}

/// Eigenpairs in iteration order; no ordering is imposed here.
#[derive(Clone, Debug)]
pub struct EigenResult {
    pub eigenvalues: Vec<f64>,
    /// Column `i` pairs with `eigenvalues[i]`.
    pub eigenvectors: Matrix,
    pub iterations: usize,
    pub converged: bool,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct EigenSolver {
    params: EigenParams,
}

impl EigenSolver {
    pub fn new(params: EigenParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> EigenParams {
        self.params
    }

    /// Runs the QR algorithm on the square matrix `a`.
    ///
    /// # Panics
    ///
    /// Panics if `a` is not square.
    pub fn solve(&self, a: &Matrix) -> EigenResult {
        let (n, ncols) = a.shape();
        assert_eq!(n, ncols, "eigensolver requires a square matrix");

        let mut a_k = a.clone();
        let mut q_total = Matrix::identity(n);
        let mut converged = false;
        let mut iterations = 0;

        while iterations < self.params.max_iter {
            let qr = qr_decompose(&a_k);
            a_k = qr.r.matmul(&qr.q);
            q_total = q_total.matmul(&qr.q);
            iterations += 1;

            let off_diagonal = a_k.off_diagonal_abs_sum();
            trace!(
                "QR iteration {}: off-diagonal mass {:.3e}",
                iterations,
                off_diagonal
            );
            if off_diagonal < self.params.tol {
                converged = true;
                break;
            }
        }

        if converged {
            debug!("Eigensolver converged after {} iterations (n={})", iterations, n);
        } else if n > 0 {
            warn!(
                "Eigensolver reached max_iter={} without converging (off-diagonal {:.3e}); returning approximation",
                self.params.max_iter,
                a_k.off_diagonal_abs_sum()
            );
        }

        EigenResult {
            eigenvalues: a_k.diagonal(),
            eigenvectors: q_total,
            iterations,
            converged,
        }
    }
}
