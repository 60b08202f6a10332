//! C-surface behavior when no model can be loaded.
//!
//! Kept apart from the other FFI test: the model lookup happens once per
//! process, and this one must observe a path that does not exist.

use gesture_forest::ffi;
use gesture_forest::parsing::{NUM_CLASSES, NUM_FEATURES};

#[test]
fn predict_without_a_model_fills_nan() {
    std::env::set_var(ffi::MODEL_PATH_VAR, "/nonexistent/gesture_forest_missing.json");

    let input = [0f64; NUM_FEATURES];
    let mut output = [1f64; NUM_CLASSES];
    unsafe { ffi::predict(input.as_ptr(), output.as_mut_ptr()) };

    assert!(output.iter().all(|p| p.is_nan()));
}
