//! C-linkage surface of the classifier.
//!
//! When built as a `cdylib` the crate exports exactly the three symbols the
//! generated C code declares, so embedded callers can link against either the
//! generated model or this library interchangeably. `predict`'s dimensions are
//! fixed: [`NUM_FEATURES`] doubles in, [`NUM_CLASSES`] probabilities out.

use crate::model::{Model, RandomForest};
use crate::parsing::{NUM_CLASSES, NUM_FEATURES};
use ndarray::ArrayView2;
use std::ffi::c_int;
use std::sync::OnceLock;

/// Environment variable naming the model file `predict` loads.
pub const MODEL_PATH_VAR: &str = "GESTURE_MODEL";
/// Model path used when [`MODEL_PATH_VAR`] is unset.
pub const DEFAULT_MODEL_PATH: &str = "forest.json";

static MODEL: OnceLock<Option<RandomForest>> = OnceLock::new();

fn shared_model() -> Option<&'static RandomForest> {
    MODEL
        .get_or_init(|| {
            let path = std::env::var(MODEL_PATH_VAR)
                .unwrap_or_else(|_| DEFAULT_MODEL_PATH.to_string());

            match RandomForest::load(&path) {
                Ok(forest) => {
                    log::info!("loaded model from {path}");
                    Some(forest)
                }
                Err(e) => {
                    log::error!("cannot load model from {path}: {e}");
                    None
                }
            }
        })
        .as_ref()
}

/// Elementwise sum of two buffers of `size` doubles.
///
/// `result` may alias `v1` or `v2`; the generated C accumulates in place.
/// A non-positive `size` is a no-op.
///
/// # Safety
/// `v1`, `v2` and `result` must each point to at least `size` readable
/// (respectively writable) doubles.
#[no_mangle]
pub unsafe extern "C" fn add_vectors(
    v1: *const f64,
    v2: *const f64,
    size: c_int,
    result: *mut f64,
) {
    if size <= 0 {
        return;
    }

    // Raw pointer arithmetic, not slices: the output is allowed to overlap
    // the inputs.
    for i in 0..size as usize {
        let sum = *v1.add(i) + *v2.add(i);
        *result.add(i) = sum;
    }
}

/// Scale a buffer of `size` doubles by `num`.
///
/// `result` may alias `v1`. A non-positive `size` is a no-op.
///
/// # Safety
/// `v1` and `result` must each point to at least `size` readable
/// (respectively writable) doubles.
#[no_mangle]
pub unsafe extern "C" fn mul_vector_number(
    v1: *const f64,
    num: f64,
    size: c_int,
    result: *mut f64,
) {
    if size <= 0 {
        return;
    }

    for i in 0..size as usize {
        let product = *v1.add(i) * num;
        *result.add(i) = product;
    }
}

/// Classify one flattened window.
///
/// Reads [`NUM_FEATURES`] doubles from `input` and writes [`NUM_CLASSES`]
/// class probabilities to `output`. The model is loaded once, lazily, from
/// the path in [`MODEL_PATH_VAR`]. If no model can be loaded, or prediction
/// fails, `output` is filled with NaN.
///
/// # Safety
/// `input` must point to [`NUM_FEATURES`] readable doubles and `output` to
/// [`NUM_CLASSES`] writable doubles, and they must not overlap.
#[no_mangle]
pub unsafe extern "C" fn predict(input: *const f64, output: *mut f64) {
    let input = std::slice::from_raw_parts(input, NUM_FEATURES);
    let output = std::slice::from_raw_parts_mut(output, NUM_CLASSES);

    let Some(forest) = shared_model() else {
        output.fill(f64::NAN);
        return;
    };

    let proba = ArrayView2::from_shape((1, NUM_FEATURES), input)
        .map_err(crate::Error::from)
        .and_then(|inputs| forest.predict_proba(&inputs));

    match proba {
        Ok(proba) if proba.ncols() == NUM_CLASSES => {
            output.copy_from_slice(&proba.row(0).to_vec());
        }
        Ok(proba) => {
            log::error!("model produced {} classes, expected {NUM_CLASSES}", proba.ncols());
            output.fill(f64::NAN);
        }
        Err(e) => {
            log::error!("prediction failed: {e}");
            output.fill(f64::NAN);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_vectors_sums_buffers() {
        let v1 = [1.0, 2.0, 3.0];
        let v2 = [4.0, 5.0, 6.0];
        let mut result = [0.0; 3];

        unsafe { add_vectors(v1.as_ptr(), v2.as_ptr(), 3, result.as_mut_ptr()) };

        assert_eq!(result, [5.0, 7.0, 9.0]);
    }

    #[test]
    fn add_vectors_accumulates_in_place() {
        // The generated C passes the accumulator as both input and output.
        let mut acc = [1.0, 1.0];
        let v2 = [2.0, 3.0];
        let acc_ptr = acc.as_mut_ptr();

        unsafe { add_vectors(acc_ptr, v2.as_ptr(), 2, acc_ptr) };

        assert_eq!(acc, [3.0, 4.0]);
    }

    #[test]
    fn mul_vector_number_scales_in_place() {
        let mut acc = [2.0, -4.0];
        let acc_ptr = acc.as_mut_ptr();

        unsafe { mul_vector_number(acc_ptr, 0.5, 2, acc_ptr) };

        assert_eq!(acc, [1.0, -2.0]);
    }

    #[test]
    fn non_positive_size_is_a_no_op() {
        let v = [1.0];
        let mut result = [7.0];

        unsafe {
            add_vectors(v.as_ptr(), v.as_ptr(), 0, result.as_mut_ptr());
            add_vectors(v.as_ptr(), v.as_ptr(), -3, result.as_mut_ptr());
            mul_vector_number(v.as_ptr(), 2.0, 0, result.as_mut_ptr());
        }

        assert_eq!(result, [7.0]);
    }
}
