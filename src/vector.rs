//! Elementwise vector kernels used to aggregate per-tree predictions.
//!
//! These mirror the helpers the generated C code relies on (see
//! [`crate::export`]); the FFI layer re-exports them with C linkage.

/// Elementwise sum of `v1` and `v2` into `result`.
///
/// All three slices must have the same length.
pub fn add_vectors(v1: &[f64], v2: &[f64], result: &mut [f64]) {
    assert_eq!(v1.len(), v2.len());
    assert_eq!(v1.len(), result.len());

    for (out, (a, b)) in result.iter_mut().zip(v1.iter().zip(v2.iter())) {
        *out = a + b;
    }
}

/// Scale every element of `v1` by `num` into `result`.
///
/// Both slices must have the same length.
pub fn mul_vector_number(v1: &[f64], num: f64, result: &mut [f64]) {
    assert_eq!(v1.len(), result.len());

    for (out, a) in result.iter_mut().zip(v1.iter()) {
        *out = a * num;
    }
}
