//! Hand-position classification from wearable-sensor recordings.
//!
//! The pipeline goes: raw capture CSV -> sliding-window feature CSV ->
//! random-forest training -> a model usable three ways: natively through
//! [`model::RandomForest`], through the C ABI in [`ffi`], or exported as a
//! standalone C source file by [`export`].

pub mod error;
pub mod export;
pub mod ffi;
pub mod model;
pub mod parsing;
pub mod vector;

pub use error::{Error, Result};
