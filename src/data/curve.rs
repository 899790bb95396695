//! Error-curve record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One integrated error measurement at one delay position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorSample {
    /// UTC timestamp when the measurement was taken.
    pub timestamp: DateTime<Utc>,
    /// Delay-line position read back at measurement time, in seconds.
    pub delay: f64,
    /// Integrated, baseline-subtracted error amplitude.
    pub error: f64,
}

/// An acquisition-ordered sequence of error measurements from one scan.
///
/// Within a single scan the delay increases monotonically; the curve keeps
/// samples in acquisition order and never reorders them.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ErrorCurve {
    samples: Vec<ErrorSample>,
}

impl ErrorCurve {
    /// Create an empty curve.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample in acquisition order.
    pub fn push(&mut self, sample: ErrorSample) {
        self.samples.push(sample);
    }

    /// Number of recorded samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the curve holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// All samples in acquisition order.
    pub fn samples(&self) -> &[ErrorSample] {
        &self.samples
    }

    /// Delay positions in acquisition order.
    pub fn delays(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.delay).collect()
    }

    /// Integrated error values in acquisition order.
    pub fn errors(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.error).collect()
    }

    /// First and last recorded delay, if any samples exist.
    pub fn span(&self) -> Option<(f64, f64)> {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => Some((first.delay, last.delay)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(delay: f64, error: f64) -> ErrorSample {
        ErrorSample {
            timestamp: Utc::now(),
            delay,
            error,
        }
    }

    #[test]
    fn test_span_and_accessors() {
        let mut curve = ErrorCurve::new();
        assert!(curve.is_empty());
        assert_eq!(curve.span(), None);

        curve.push(sample(-1.0e-12, -4.0));
        curve.push(sample(0.0, 0.5));
        curve.push(sample(1.0e-12, 5.0));

        assert_eq!(curve.len(), 3);
        assert_eq!(curve.span(), Some((-1.0e-12, 1.0e-12)));
        assert_eq!(curve.delays(), vec![-1.0e-12, 0.0, 1.0e-12]);
        assert_eq!(curve.errors(), vec![-4.0, 0.5, 5.0]);
    }
}
