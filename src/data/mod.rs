//! Measurement records and persistence.

pub mod curve;
pub mod storage;

pub use curve::{ErrorCurve, ErrorSample};
pub use storage::{write_curve_csv, write_curve_json};
