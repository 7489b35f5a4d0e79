mod test_operators;
mod test_storage;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::matrix::Matrix;

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Seeded `m × n` matrix with standard normal entries.
pub fn random_matrix(m: usize, n: usize, seed: u64) -> Matrix {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let data = (0..m * n)
        .map(|_| StandardNormal.sample(&mut rng))
        .collect::<Vec<f64>>();
    Matrix::from_vec(m, n, data)
}

/// 4 terms × 3 documents: docs 0 and 1 share their heavy terms, doc 2 does not.
pub fn toy_term_doc() -> Matrix {
    Matrix::from_rows(vec![
        vec![1.0, 0.9, 0.0],
        vec![0.8, 1.0, 0.1],
        vec![0.0, 0.0, 1.0],
        vec![0.1, 0.0, 0.9],
    ])
    .unwrap()
}

/// Asserts `MᵀM ≈ I` within `tol` (Frobenius).
pub fn assert_orthonormal_columns(m: &Matrix, tol: f64, label: &str) {
    let gram = m.gram();
    let err = gram.sub(&Matrix::identity(m.ncols())).frobenius_norm();
    assert!(err < tol, "{}: ||MᵀM - I|| = {:.3e} >= {:.1e}", label, err, tol);
}
