//! End-to-end overlap scenarios against mock hardware.

use std::sync::Arc;
use std::time::Duration;

use tcboc_overlap::align::AutoOverlap;
use tcboc_overlap::config::Settings;
use tcboc_overlap::error::OverlapError;
use tcboc_overlap::hardware::{
    DelayActuator, MockDelayLine, MockSampleCount, MockWaveformChannel,
};

const CAPACITY: usize = 256;
const USEFUL_LENGTH: usize = 200;
const NBASELINE: usize = 10;

fn fast_settings() -> Settings {
    let mut settings = Settings::default();
    settings.acquisition.refresh = Duration::ZERO;
    settings.monitor.navg = 2;
    settings.scan.navg = 2;
    settings
}

/// Monitor trace with a peak comfortably above the 35000-count threshold.
fn passing_monitor(_delay: f64) -> Vec<f64> {
    let mut trace = vec![200.0; CAPACITY];
    trace[64] = 42000.0;
    trace
}

/// Error trace whose integrated, baseline-subtracted value is linear in the
/// delay and crosses zero at `crossing`.
fn linear_error(delay: f64, crossing: f64) -> Vec<f64> {
    let baseline = 1000.0;
    let amplitude = 2.0e15 * (delay - crossing);
    (0..CAPACITY)
        .map(|i| {
            if i < NBASELINE {
                baseline
            } else {
                baseline + amplitude
            }
        })
        .collect()
}

fn build_overlap(start: f64, crossing: f64, settings: Settings) -> (Arc<MockDelayLine>, AutoOverlap) {
    let delay_line = Arc::new(MockDelayLine::new(start));
    let position = delay_line.shared_position();

    let overlap = AutoOverlap::new(
        delay_line.clone(),
        Arc::new(MockWaveformChannel::new(
            "mon1",
            position.clone(),
            passing_monitor,
        )),
        Arc::new(MockWaveformChannel::new(
            "mon2",
            position.clone(),
            passing_monitor,
        )),
        Arc::new(MockWaveformChannel::new("err", position, move |delay| {
            linear_error(delay, crossing)
        })),
        Arc::new(MockSampleCount::new(USEFUL_LENGTH)),
        settings,
    );
    (delay_line, overlap)
}

#[tokio::test]
async fn full_procedure_commands_the_zero_crossing() {
    let crossing = 0.9e-12;
    let (delay_line, overlap) = build_overlap(0.0, crossing, fast_settings());

    let outcome = overlap.run().await.unwrap();

    // Both monitors pass at the starting position, so one attempt suffices
    // and the scan covers [-1 ps, +1 ps) in 0.01 ps steps.
    assert_eq!(outcome.attempts, 1);
    assert!(
        (199..=201).contains(&outcome.curve.len()),
        "unexpected curve length {}",
        outcome.curve.len()
    );
    assert!(
        (outcome.commanded_delay - crossing).abs() < 1.0e-15,
        "commanded {:e}",
        outcome.commanded_delay
    );
    // The actuator was parked at the fitted crossing.
    let parked = delay_line.delay().await.unwrap();
    assert_eq!(parked, outcome.commanded_delay);
}

#[tokio::test]
async fn crossing_outside_the_scan_window_is_fatal() {
    // True crossing at 3 ps, scan window only reaches ~1 ps.
    let (_delay_line, overlap) = build_overlap(0.0, 3.0e-12, fast_settings());

    let err = overlap.run().await.unwrap_err();
    match err {
        OverlapError::FitRange { estimate, .. } => {
            assert!((estimate - 3.0e-12).abs() < 1.0e-14);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn start_outside_search_range_aborts() {
    let (delay_line, overlap) = build_overlap(7.0e-12, 0.5e-12, fast_settings());

    let err = overlap.run().await.unwrap_err();
    assert!(matches!(err, OverlapError::OutOfRange { .. }));
    // The procedure never moved the actuator.
    assert_eq!(delay_line.move_count().await, 0);
}

#[tokio::test]
async fn buffer_length_mismatch_fails_signal_check() {
    let delay_line = Arc::new(MockDelayLine::new(0.0));
    let position = delay_line.shared_position();

    // The buffer claims more useful samples than the channels deliver.
    let overlap = AutoOverlap::new(
        delay_line,
        Arc::new(MockWaveformChannel::new(
            "mon1",
            position.clone(),
            passing_monitor,
        )),
        Arc::new(MockWaveformChannel::new(
            "mon2",
            position.clone(),
            passing_monitor,
        )),
        Arc::new(MockWaveformChannel::new("err", position, |delay| {
            linear_error(delay, 0.5e-12)
        })),
        Arc::new(MockSampleCount::new(CAPACITY + 64)),
        fast_settings(),
    );

    let err = overlap.run().await.unwrap_err();
    // The health check catches the mismatch before any optimization.
    assert!(matches!(err, OverlapError::SignalCheck(_)));
}
