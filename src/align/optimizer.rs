//! Monitor-channel optimization.
//!
//! Searches outward from the current delay for a position where a monitor
//! channel's averaged peak clears its threshold: first sweeping toward the
//! high end of the range, then toward the low end, then giving up and
//! restoring the starting position.

use log::{debug, warn};

use crate::align::averager::{exceeds_threshold, WaveformAverager};
use crate::error::{AlignResult, OverlapError};
use crate::hardware::capabilities::{DelayActuator, SampleCount, WaveformSource};

/// Inclusive delay search range, in seconds.
#[derive(Clone, Copy, Debug)]
pub struct SearchRange {
    pub low: f64,
    pub high: f64,
}

impl SearchRange {
    /// Whether a position lies strictly inside the range.
    pub fn contains_strictly(&self, position: f64) -> bool {
        position > self.low && position < self.high
    }
}

/// Parameters for one optimization sweep.
#[derive(Clone, Debug)]
pub struct OptimizeParams {
    /// Delay step per move, in seconds.
    pub step: f64,
    /// Peak value the averaged waveform must strictly exceed.
    pub threshold: f64,
    /// Waveforms averaged before each threshold test.
    pub navg: usize,
}

/// Search for a delay where the monitor's averaged peak exceeds the
/// threshold.
///
/// The current position is tested before any motion, so an already-passing
/// monitor succeeds without moving. Sweeps run while the *next* prospective
/// position stays strictly inside the bound; on double exhaustion the
/// starting position is restored and the outcome is `Ok(false)`.
///
/// Starting outside the search range is an error, reported before any
/// waveform is acquired.
pub async fn optimize_monitor(
    actuator: &dyn DelayActuator,
    monitor: &dyn WaveformSource,
    buffer: &dyn SampleCount,
    averager: &WaveformAverager,
    range: SearchRange,
    params: &OptimizeParams,
) -> AlignResult<bool> {
    debug!(
        "optimizing '{}': step {:e} s, threshold {}, navg {}",
        monitor.channel(),
        params.step,
        params.threshold,
        params.navg
    );

    let start = actuator.delay().await?;
    if !range.contains_strictly(start) {
        return Err(OverlapError::OutOfRange {
            position: start,
            low: range.low,
            high: range.high,
        });
    }

    // Forward sweep. The test runs before each step, so the starting
    // position is covered here.
    while actuator.delay().await? + params.step < range.high {
        if test_average(monitor, buffer, averager, params).await? {
            return Ok(true);
        }
        actuator.adjust_delay(params.step).await?;
    }

    // Reverse sweep from wherever the forward sweep stopped.
    while actuator.delay().await? - params.step > range.low {
        if test_average(monitor, buffer, averager, params).await? {
            return Ok(true);
        }
        actuator.adjust_delay(-params.step).await?;
    }

    // Both directions exhausted. Return to the start.
    warn!(
        "'{}' never exceeded {} counts; returning to {:e} s",
        monitor.channel(),
        params.threshold,
        start
    );
    actuator.set_delay(start).await?;
    Ok(false)
}

async fn test_average(
    monitor: &dyn WaveformSource,
    buffer: &dyn SampleCount,
    averager: &WaveformAverager,
    params: &OptimizeParams,
) -> AlignResult<bool> {
    let length = buffer.useful_length().await?;
    let avg = averager.average(monitor, params.navg, length).await?;
    Ok(exceeds_threshold(&avg, params.threshold))
}
