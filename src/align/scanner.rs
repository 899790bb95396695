//! Error-curve scanning.
//!
//! The TCBOC error signal (S-curve) has a working range of roughly two
//! picoseconds. Assuming monitor optimization landed close to the center,
//! the scanner backs the delay up by one half-window, then steps forward
//! across the full window, recording one integrated error measurement per
//! position.

use chrono::Utc;
use log::{debug, info};

use crate::align::averager::WaveformAverager;
use crate::data::curve::{ErrorCurve, ErrorSample};
use crate::error::{AlignResult, OverlapError};
use crate::hardware::capabilities::{DelayActuator, SampleCount, WaveformSource};

/// Parameters for one error-curve scan.
#[derive(Clone, Debug)]
pub struct ScanParams {
    /// Half-width of the scan window around the current delay, in seconds.
    pub half_window: f64,
    /// Delay step between measurements, in seconds.
    pub step: f64,
    /// Waveforms averaged per measurement.
    pub navg: usize,
    /// Leading samples used for the baseline estimate.
    pub nbaseline: usize,
}

/// Trapezoidal-rule integral over unit sample spacing.
pub fn trapezoid(samples: &[f64]) -> f64 {
    samples.windows(2).map(|w| 0.5 * (w[0] + w[1])).sum()
}

/// One integrated, baseline-subtracted error measurement at the current
/// delay.
///
/// Averages `navg` error waveforms, estimates the baseline from the first
/// `nbaseline` samples (clamped to the trace length), subtracts it
/// everywhere, and integrates the remainder.
pub async fn integrate_error(
    error_signal: &dyn WaveformSource,
    buffer: &dyn SampleCount,
    averager: &WaveformAverager,
    params: &ScanParams,
) -> AlignResult<f64> {
    let length = buffer.useful_length().await?;
    let avg = averager.average(error_signal, params.navg, length).await?;

    let nbase = params.nbaseline.min(avg.len());
    if nbase == 0 {
        return Err(OverlapError::Processing(format!(
            "no samples available for the baseline of '{}'",
            error_signal.channel()
        )));
    }
    let baseline = avg[..nbase].iter().sum::<f64>() / nbase as f64;
    let signal: Vec<f64> = avg.iter().map(|s| s - baseline).collect();
    Ok(trapezoid(&signal))
}

/// Scan a window around the current delay and record the error curve.
///
/// Moves to `current - half_window`, then loops: record the read-back
/// delay, take one integrated error measurement, advance by `step` — until
/// the read-back delay reaches `current + half_window`.
pub async fn measure_error_curve(
    actuator: &dyn DelayActuator,
    error_signal: &dyn WaveformSource,
    buffer: &dyn SampleCount,
    averager: &WaveformAverager,
    params: &ScanParams,
) -> AlignResult<ErrorCurve> {
    let start = actuator.delay().await?;
    let scan_start = start - params.half_window;
    let scan_end = scan_start + 2.0 * params.half_window;
    info!(
        "scanning '{}' from {:e} to {:e} s in {:e} s steps",
        error_signal.channel(),
        scan_start,
        scan_end,
        params.step
    );

    actuator.set_delay(scan_start).await?;
    let mut curve = ErrorCurve::new();
    loop {
        let delay = actuator.delay().await?;
        if delay >= scan_end {
            break;
        }
        let error = integrate_error(error_signal, buffer, averager, params).await?;
        debug!("delay {delay:e} s -> integrated error {error:e}");
        curve.push(ErrorSample {
            timestamp: Utc::now(),
            delay,
            error,
        });
        actuator.adjust_delay(params.step).await?;
    }

    info!("recorded {} error samples", curve.len());
    Ok(curve)
}
