//! The overlap orchestrator.
//!
//! Sequences the full procedure: health checks, monitor optimization for
//! both channels (with a bounded retry budget), the fine error-curve scan,
//! the zero-crossing fit, and the final move. The orchestrator is the sole
//! writer of the delay position for the duration of a run; every motion and
//! acquisition is awaited to completion before the next begins.

use std::sync::Arc;

use log::{debug, error, info, warn};
use uuid::Uuid;

use crate::align::averager::{exceeds_threshold, WaveformAverager};
use crate::align::fit::find_zero_crossing;
use crate::align::optimizer::{optimize_monitor, OptimizeParams, SearchRange};
use crate::align::scanner::{measure_error_curve, ScanParams};
use crate::config::Settings;
use crate::data::curve::ErrorCurve;
use crate::error::{AlignResult, OverlapError};
use crate::hardware::capabilities::{DelayActuator, SampleCount, WaveformSource};

/// Result of a completed overlap run.
#[derive(Clone, Debug)]
pub struct OverlapOutcome {
    /// Delay the actuator was commanded to, in seconds.
    pub commanded_delay: f64,
    /// The measured error curve, for persistence and inspection.
    pub curve: ErrorCurve,
    /// Monitor-optimization attempts used.
    pub attempts: u32,
}

/// Automatic temporal overlap of the TCBOC monitor and error channels.
pub struct AutoOverlap {
    actuator: Arc<dyn DelayActuator>,
    monitor_a: Arc<dyn WaveformSource>,
    monitor_b: Arc<dyn WaveformSource>,
    error_signal: Arc<dyn WaveformSource>,
    buffer: Arc<dyn SampleCount>,
    settings: Settings,
    averager: WaveformAverager,
    run_id: Uuid,
}

impl AutoOverlap {
    /// Assemble the procedure over its device collaborators.
    pub fn new(
        actuator: Arc<dyn DelayActuator>,
        monitor_a: Arc<dyn WaveformSource>,
        monitor_b: Arc<dyn WaveformSource>,
        error_signal: Arc<dyn WaveformSource>,
        buffer: Arc<dyn SampleCount>,
        settings: Settings,
    ) -> Self {
        let averager = WaveformAverager::new(settings.acquisition.refresh);
        Self {
            actuator,
            monitor_a,
            monitor_b,
            error_signal,
            buffer,
            settings,
            averager,
            run_id: Uuid::new_v4(),
        }
    }

    /// Identifier correlating this run's log lines and artifacts.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Verify that the digitizer channels are delivering data.
    async fn check_signals(&self) -> AlignResult<()> {
        debug!("[{}] checking digitizer signal status", self.run_id);
        let length = self
            .buffer
            .useful_length()
            .await
            .map_err(|err| OverlapError::SignalCheck(err.to_string()))?;
        if length == 0 {
            return Err(OverlapError::SignalCheck(
                "buffer reports zero useful samples".to_string(),
            ));
        }

        for source in [&self.monitor_a, &self.monitor_b, &self.error_signal] {
            let trace = source
                .read()
                .await
                .map_err(|err| OverlapError::SignalCheck(err.to_string()))?;
            if trace.len() < length {
                return Err(OverlapError::SignalCheck(format!(
                    "channel '{}' holds {} samples, buffer reports {}",
                    source.channel(),
                    trace.len(),
                    length
                )));
            }
        }
        info!("[{}] signal status good", self.run_id);
        Ok(())
    }

    /// Verify that the delay motor responds sanely.
    async fn check_motor(&self) -> AlignResult<()> {
        debug!("[{}] checking motor status", self.run_id);
        let position = self
            .actuator
            .delay()
            .await
            .map_err(|err| OverlapError::MotorCheck(err.to_string()))?;
        if !position.is_finite() {
            return Err(OverlapError::MotorCheck(format!(
                "actuator reports non-finite delay {position}"
            )));
        }
        info!("[{}] motor status good, delay {position:e} s", self.run_id);
        Ok(())
    }

    /// Optimize both monitor channels, then re-test their raw snapshots.
    ///
    /// The retest deliberately uses single unaveraged reads of the full
    /// snapshots: passing it means the live signals clear the threshold
    /// right now, not just on average.
    async fn optimize_monitors(&self, range: SearchRange) -> AlignResult<u32> {
        let params = OptimizeParams {
            step: self.settings.monitor.coarse_step,
            threshold: self.settings.monitor.threshold,
            navg: self.settings.monitor.navg,
        };
        let max_attempts = self.settings.monitor.max_attempts;

        // Normally succeeds on the first attempt.
        let mut attempts = 0;
        while attempts < max_attempts {
            attempts += 1;
            info!(
                "[{}] monitor optimization attempt {}/{}",
                self.run_id, attempts, max_attempts
            );

            let found_a = optimize_monitor(
                self.actuator.as_ref(),
                self.monitor_a.as_ref(),
                self.buffer.as_ref(),
                &self.averager,
                range,
                &params,
            )
            .await?;
            let found_b = optimize_monitor(
                self.actuator.as_ref(),
                self.monitor_b.as_ref(),
                self.buffer.as_ref(),
                &self.averager,
                range,
                &params,
            )
            .await?;
            debug!(
                "[{}] optimizer outcomes: {} {}",
                self.run_id, found_a, found_b
            );

            let test_a =
                exceeds_threshold(&self.monitor_a.read().await?, params.threshold);
            let test_b =
                exceeds_threshold(&self.monitor_b.read().await?, params.threshold);
            if test_a && test_b {
                return Ok(attempts);
            }
            warn!(
                "[{}] raw monitor retest failed (a: {}, b: {})",
                self.run_id, test_a, test_b
            );
        }

        error!(
            "[{}] unable to optimize monitor signals in {} attempts",
            self.run_id, max_attempts
        );
        Err(OverlapError::RetriesExhausted {
            attempts: max_attempts,
        })
    }

    /// Run the full overlap procedure.
    ///
    /// On success the delay actuator is parked at the fitted zero crossing.
    pub async fn run(&self) -> AlignResult<OverlapOutcome> {
        info!("[{}] starting automatic overlap", self.run_id);
        self.check_signals().await?;
        self.check_motor().await?;

        let range = SearchRange {
            low: self.settings.search.low,
            high: self.settings.search.high,
        };
        let attempts = self.optimize_monitors(range).await?;

        let scan = ScanParams {
            half_window: self.settings.scan.half_window,
            step: self.settings.scan.fine_step,
            navg: self.settings.scan.navg,
            nbaseline: self.settings.scan.nbaseline,
        };
        let curve = measure_error_curve(
            self.actuator.as_ref(),
            self.error_signal.as_ref(),
            self.buffer.as_ref(),
            &self.averager,
            &scan,
        )
        .await?;

        let zero = find_zero_crossing(&curve)?;
        info!("[{}] commanding delay to {zero:e} s", self.run_id);
        self.actuator.set_delay(zero).await?;

        info!("[{}] automatic overlap complete", self.run_id);
        Ok(OverlapOutcome {
            commanded_delay: zero,
            curve,
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::mock::{MockDelayLine, MockSampleCount, MockWaveformChannel};
    use std::time::Duration;

    fn fast_settings() -> Settings {
        let mut settings = Settings::default();
        settings.acquisition.refresh = Duration::ZERO;
        settings.monitor.navg = 2;
        settings.scan.navg = 2;
        settings
    }

    fn passing_trace() -> Vec<f64> {
        let mut trace = vec![100.0; 256];
        trace[64] = 40000.0;
        trace
    }

    fn failing_trace() -> Vec<f64> {
        vec![100.0; 256]
    }

    #[tokio::test]
    async fn test_empty_channel_fails_signal_check() {
        let line = MockDelayLine::new(0.0);
        let position = line.shared_position();
        let overlap = AutoOverlap::new(
            Arc::new(line),
            Arc::new(MockWaveformChannel::constant("mon1", position.clone(), vec![])),
            Arc::new(MockWaveformChannel::constant(
                "mon2",
                position.clone(),
                passing_trace(),
            )),
            Arc::new(MockWaveformChannel::constant(
                "err",
                position,
                passing_trace(),
            )),
            Arc::new(MockSampleCount::new(200)),
            fast_settings(),
        );

        let err = overlap.run().await.unwrap_err();
        assert!(matches!(err, OverlapError::SignalCheck(_)));
    }

    #[tokio::test]
    async fn test_zero_buffer_length_fails_signal_check() {
        let line = MockDelayLine::new(0.0);
        let position = line.shared_position();
        let overlap = AutoOverlap::new(
            Arc::new(line),
            Arc::new(MockWaveformChannel::constant(
                "mon1",
                position.clone(),
                passing_trace(),
            )),
            Arc::new(MockWaveformChannel::constant(
                "mon2",
                position.clone(),
                passing_trace(),
            )),
            Arc::new(MockWaveformChannel::constant(
                "err",
                position,
                passing_trace(),
            )),
            Arc::new(MockSampleCount::new(0)),
            fast_settings(),
        );

        let err = overlap.run().await.unwrap_err();
        assert!(matches!(err, OverlapError::SignalCheck(_)));
    }

    #[tokio::test]
    async fn test_retry_budget_exhaustion_is_fatal() {
        let line = MockDelayLine::new(0.0);
        let position = line.shared_position();
        let mut settings = fast_settings();
        // Narrow range so the failing sweeps stay short.
        settings.search.low = -2.0e-12;
        settings.search.high = 2.0e-12;

        let overlap = AutoOverlap::new(
            Arc::new(line),
            Arc::new(MockWaveformChannel::constant(
                "mon1",
                position.clone(),
                failing_trace(),
            )),
            Arc::new(MockWaveformChannel::constant(
                "mon2",
                position.clone(),
                passing_trace(),
            )),
            Arc::new(MockWaveformChannel::constant(
                "err",
                position,
                passing_trace(),
            )),
            Arc::new(MockSampleCount::new(200)),
            settings,
        );

        let err = overlap.run().await.unwrap_err();
        assert!(matches!(
            err,
            OverlapError::RetriesExhausted { attempts: 3 }
        ));
    }
}
