//! Elementary vector arithmetic over `&[f64]` slices.
//!
//! - Euclidean norm, dot product, difference and scaling
//! - Unit normalisation with a near-zero guard: vectors whose norm is at or
//!   below [`NORM_EPSILON`] are returned unchanged
//! - Euclidean distance used by the appearance model ranking

/// Norm threshold at or below which a vector is left unnormalised.
pub const NORM_EPSILON: f64 = 1e-7;

/// Computes the Euclidean norm (L2) without allocating.
#[inline]
pub fn norm(a: &[f64]) -> f64 {
    a.iter().map(|&x| x * x).sum::<f64>().sqrt()
}

/// Dot product of two equally sized slices.
///
/// # Panics
///
/// Panics if the lengths differ.
#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "Dimension mismatch");
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Element-wise `a - b`.
///
/// # Panics
///
/// Panics if the lengths differ.
#[inline]
pub fn sub(a: &[f64], b: &[f64]) -> Vec<f64> {
    assert_eq!(a.len(), b.len(), "Dimension mismatch");
    a.iter().zip(b.iter()).map(|(x, y)| x - y).collect()
}

#[inline]
pub fn scale(a: &[f64], scalar: f64) -> Vec<f64> {
    a.iter().map(|&x| x * scalar).collect()
}

/// In-place `y -= alpha * x`.
#[inline]
pub fn sub_scaled_inplace(y: &mut [f64], alpha: f64, x: &[f64]) {
    assert_eq!(y.len(), x.len(), "Dimension mismatch");
    y.iter_mut().zip(x.iter()).for_each(|(yi, &xi)| *yi -= alpha * xi);
}

/// Returns `a / ||a||`, or a copy of `a` when its norm is at or below
/// [`NORM_EPSILON`].
#[inline]
pub fn normalise(a: &[f64]) -> Vec<f64> {
    let n = norm(a);
    if n > NORM_EPSILON {
        scale(a, 1.0 / n)
    } else {
        a.to_vec()
    }
}

/// Computes Euclidean distance without allocation.
///
/// # Panics
///
/// Panics if the lengths differ.
#[inline]
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "Dimension mismatch");
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}
