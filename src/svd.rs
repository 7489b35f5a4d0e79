//! Singular value decomposition derived from the eigenpairs of the Gram matrix.
//!
//! For `A` (`m × n`): eigendecompose `G = AᵀA` with [`EigenSolver`], sort the
//! eigenpairs by eigenvalue descending, clamp negative eigenvalues (numerical
//! noise on a PSD matrix) to zero and take square roots. The rank is the number
//! of singular values strictly above [`RANK_EPSILON`]; only those are kept.
//! Each retained left singular vector is `u_i = A·v_i / σ_i`.
//!
//! Truncation to rank `k` is a slice of the full result taken afterwards, not a
//! separate algorithm.

use std::cmp::Ordering;

use log::{debug, info};

use crate::eigen::{EigenParams, EigenSolver};
use crate::matrix::Matrix;

/// Singular values at or below this are dropped from the result.
pub const RANK_EPSILON: f64 = 1e-7;

/// `A ≈ U · Σ · Vᵀ` restricted to the retained rank.
#[derive(Clone, Debug)]
pub struct SvdResult {
    /// `m × rank`
    pub u: Matrix,
    /// `rank × rank`, diagonal, non-negative, descending
    pub sigma: Matrix,
    /// `rank × n`
    pub vt: Matrix,
    pub rank: usize,
}

impl SvdResult {
    pub fn singular_values(&self) -> Vec<f64> {
        self.sigma.diagonal()
    }

    /// Keeps the leading `min(k, rank)` triplets.
    pub fn truncate(&self, k: usize) -> SvdResult {
        let k = k.min(self.rank);
        SvdResult {
            u: self.u.leading_columns(k),
            sigma: Matrix::from_diagonal(&self.singular_values()[..k]),
            vt: self.vt.leading_rows(k),
            rank: k,
        }
    }

    /// `U · Σ · Vᵀ`
    pub fn reconstruct(&self) -> Matrix {
        self.u.matmul(&self.sigma).matmul(&self.vt)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SvdEngine {
    solver: EigenSolver,
}

impl SvdEngine {
    pub fn new(params: EigenParams) -> Self {
        Self {
            solver: EigenSolver::new(params),
        }
    }

    /// Full SVD of `a`, restricted to its numerical rank.
    pub fn decompose(&self, a: &Matrix) -> SvdResult {
        let (m, n) = a.shape();
        debug!("SVD of {}x{} matrix via {}x{} Gram", m, n, n, n);

        let gram = a.gram();
        let eigen = self.solver.solve(&gram);

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_unstable_by(|&i, &j| {
            eigen.eigenvalues[j]
                .partial_cmp(&eigen.eigenvalues[i])
                .unwrap_or(Ordering::Equal)
        });

        let singular_values: Vec<f64> = order
            .iter()
            .map(|&i| eigen.eigenvalues[i].max(0.0).sqrt())
            .collect();
        let v = eigen.eigenvectors.select_columns(&order);

        // sorted descending, so the retained values form a prefix
        let rank = singular_values.iter().filter(|&&s| s > RANK_EPSILON).count();

        let mut u = Matrix::zeros(m, rank);
        for (i, &s) in singular_values.iter().enumerate().take(rank) {
            let av = a.matvec(&v.column(i));
            let u_i: Vec<f64> = av.iter().map(|x| x / s).collect();
            u.set_column(i, &u_i);
        }

        debug!(
            "SVD rank {} of {} (eigensolver iterations {}, converged {})",
            rank, n, eigen.iterations, eigen.converged
        );

        SvdResult {
            u,
            sigma: Matrix::from_diagonal(&singular_values[..rank]),
            vt: v.leading_columns(rank).transpose(),
            rank,
        }
    }

    /// Rank-`k` restriction of [`SvdEngine::decompose`].
    pub fn truncated(&self, a: &Matrix, k: usize) -> SvdResult {
        let full = self.decompose(a);
        let truncated = full.truncate(k);
        info!(
            "Truncated SVD: requested k={}, achievable rank {}, kept {}",
            k, full.rank, truncated.rank
        );
        truncated
    }
}

/// SVD with default eigensolver parameters.
pub fn svd(a: &Matrix) -> SvdResult {
    SvdEngine::default().decompose(a)
}

/// Rank-`k` SVD with default eigensolver parameters.
pub fn truncated_svd(a: &Matrix, k: usize) -> SvdResult {
    SvdEngine::default().truncated(a, k)
}
