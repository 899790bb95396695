//! Custom error types for the application.
//!
//! This module defines the primary error type, `OverlapError`, for the entire
//! application. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the failure modes of the overlap procedure, from
//! acquisition problems to fit validation.
//!
//! ## Error Hierarchy
//!
//! `OverlapError` consolidates the following sources:
//!
//! - **`AcquisitionLength`**: a captured waveform holds fewer valid samples
//!   than the requested useful length.
//! - **`OutOfRange`**: the delay actuator sits outside the configured search
//!   range when an optimization starts.
//! - **`RetriesExhausted`**: the orchestrator used up its monitor-optimization
//!   attempt budget without both monitors passing.
//! - **`FitRange`** / **`FitSign`**: the zero-crossing estimate falls outside
//!   the measured delay span, or comes out negative. Both indicate an
//!   unreliable fit and are reported separately.
//! - **`SignalCheck`** / **`MotorCheck`**: precondition health checks failed.
//! - **`Device`**: an underlying device driver failed. Driver code reports
//!   `anyhow::Error`; the conversion below boxes it at the procedure boundary.
//! - **`Config`**: semantic configuration problems that pass parsing but are
//!   logically invalid (e.g. an inverted search range).
//! - **`Processing`**: degenerate data that cannot be analyzed.
//!
//! A failed monitor optimization is deliberately *not* an error: both sweep
//! directions exhausting the range is a recoverable outcome, reported as
//! `Ok(false)` by the optimizer after it restores the starting position.

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AlignResult<T> = std::result::Result<T, OverlapError>;

#[derive(Error, Debug)]
pub enum OverlapError {
    #[error("waveform '{channel}' returned {got} samples, expected at least {need}")]
    AcquisitionLength {
        channel: String,
        need: usize,
        got: usize,
    },

    #[error("delay {position:e} s is outside the search range [{low:e}, {high:e}] s")]
    OutOfRange { position: f64, low: f64, high: f64 },

    #[error("unable to optimize monitor signals after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("zero crossing {estimate:e} s is outside the measured span [{span_low:e}, {span_high:e}] s")]
    FitRange {
        estimate: f64,
        span_low: f64,
        span_high: f64,
    },

    #[error("zero crossing is negative: {estimate:e} s")]
    FitSign { estimate: f64 },

    #[error("signal check failed: {0}")]
    SignalCheck(String),

    #[error("motor check failed: {0}")]
    MotorCheck(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("data processing error: {0}")]
    Processing(String),

    #[error("device error: {0}")]
    Device(Box<dyn std::error::Error + Send + Sync>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<anyhow::Error> for OverlapError {
    fn from(err: anyhow::Error) -> Self {
        OverlapError::Device(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OverlapError::AcquisitionLength {
            channel: "mon1".to_string(),
            need: 200,
            got: 150,
        };
        assert_eq!(
            err.to_string(),
            "waveform 'mon1' returned 150 samples, expected at least 200"
        );
    }

    #[test]
    fn test_device_error_from_anyhow() {
        let err: OverlapError = anyhow::anyhow!("stage timeout").into();
        assert!(err.to_string().contains("stage timeout"));
    }
}
