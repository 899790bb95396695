//! Error-curve persistence.
//!
//! One scan produces one curve, so the writers here are plain functions
//! rather than streaming storage backends. CSV is the beamline-friendly
//! format; JSON keeps the full record structure for programmatic reuse.

use std::fs::File;
use std::path::Path;

use crate::data::curve::ErrorCurve;
use crate::error::AlignResult;

/// Write a curve as CSV (one row per sample, header included).
pub fn write_curve_csv(path: &Path, curve: &ErrorCurve) -> AlignResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for sample in curve.samples() {
        writer.serialize(sample)?;
    }
    writer.flush()?;
    log::info!(
        "wrote {} error samples to '{}'",
        curve.len(),
        path.display()
    );
    Ok(())
}

/// Write a curve as pretty-printed JSON.
pub fn write_curve_json(path: &Path, curve: &ErrorCurve) -> AlignResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, curve)?;
    log::info!(
        "wrote {} error samples to '{}'",
        curve.len(),
        path.display()
    );
    Ok(())
}
