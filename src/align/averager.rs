//! Waveform averaging.
//!
//! The digitizer refreshes its process variables at a fixed rate (10 Hz
//! nominal), so back-to-back reads would see the same buffer. The averager
//! pauses for one refresh period between reads to get independently timed
//! snapshots.

use log::debug;
use tokio::time::{sleep, Duration};

use crate::error::{AlignResult, OverlapError};
use crate::hardware::capabilities::WaveformSource;

/// Maximum sample of a trace.
pub fn peak(trace: &[f64]) -> f64 {
    trace.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Whether a trace's peak strictly exceeds the threshold.
pub fn exceeds_threshold(trace: &[f64], threshold: f64) -> bool {
    let max = peak(trace);
    debug!("threshold: {threshold}, max: {max}");
    max > threshold
}

/// Element-wise averager over repeated waveform snapshots.
pub struct WaveformAverager {
    refresh: Duration,
}

impl WaveformAverager {
    /// Create an averager that idles for `refresh` between snapshots.
    pub fn new(refresh: Duration) -> Self {
        Self { refresh }
    }

    /// Take one snapshot and validate it against the useful length.
    ///
    /// The digitizer returns fixed-capacity arrays no matter the buffer
    /// setting; the trailing padding is dropped here. A snapshot shorter
    /// than `length` is an acquisition failure.
    pub async fn capture(
        &self,
        source: &dyn WaveformSource,
        length: usize,
    ) -> AlignResult<Vec<f64>> {
        let trace = source.read().await?;
        if trace.len() < length {
            return Err(OverlapError::AcquisitionLength {
                channel: source.channel().to_string(),
                need: length,
                got: trace.len(),
            });
        }
        Ok(trace[..length].to_vec())
    }

    /// Element-wise mean of `navg` independently timed snapshots, each
    /// validated and truncated to `length` samples.
    pub async fn average(
        &self,
        source: &dyn WaveformSource,
        navg: usize,
        length: usize,
    ) -> AlignResult<Vec<f64>> {
        if navg == 0 {
            return Err(OverlapError::Processing(
                "cannot average zero waveforms".to_string(),
            ));
        }
        debug!(
            "averaging {} snapshots of {} samples from '{}'",
            navg,
            length,
            source.channel()
        );

        let mut sum = vec![0.0; length];
        for _ in 0..navg {
            let trace = self.capture(source, length).await?;
            for (acc, sample) in sum.iter_mut().zip(&trace) {
                *acc += sample;
            }
            sleep(self.refresh).await;
        }

        let n = navg as f64;
        Ok(sum.into_iter().map(|acc| acc / n).collect())
    }
}
