use approx::assert_relative_eq;

use crate::operators::{dot, euclidean_distance, norm, normalise, scale, sub, NORM_EPSILON};

#[test]
fn test_norm_and_dot() {
    assert_relative_eq!(norm(&[3.0, 4.0]), 5.0);
    assert_eq!(dot(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]), 32.0);
    assert_eq!(norm(&[]), 0.0);
}

#[test]
fn test_sub_and_scale() {
    assert_eq!(sub(&[5.0, 1.0], &[2.0, 3.0]), vec![3.0, -2.0]);
    assert_eq!(scale(&[1.0, -2.0], 0.5), vec![0.5, -1.0]);
}

#[test]
fn test_normalise_unit_length() {
    let v = normalise(&[1.0, 2.0, 2.0]);
    assert_relative_eq!(norm(&v), 1.0, epsilon = 1e-12);
    assert_relative_eq!(v[0], 1.0 / 3.0, epsilon = 1e-12);
}

#[test]
fn test_normalise_leaves_near_zero_untouched() {
    let tiny = vec![NORM_EPSILON / 10.0, 0.0];
    assert_eq!(normalise(&tiny), tiny);
    assert_eq!(normalise(&[0.0, 0.0]), vec![0.0, 0.0]);
}

#[test]
fn test_euclidean_distance() {
    assert_relative_eq!(euclidean_distance(&[1.0, 1.0], &[4.0, 5.0]), 5.0);
    assert_eq!(euclidean_distance(&[2.0, 2.0], &[2.0, 2.0]), 0.0);
}

#[test]
#[should_panic(expected = "Dimension mismatch")]
fn test_dot_panics_on_mismatch() {
    dot(&[1.0], &[1.0, 2.0]);
}
