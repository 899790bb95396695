//! Device capability traits.
//!
//! Small, orthogonal traits for the external collaborators of the overlap
//! procedure. The procedure only ever sees these traits; the concrete devices
//! (channel-access backed signals on the real beamline, mocks in tests) are
//! injected at construction time.
//!
//! All motion methods block until the underlying device confirms completion:
//! when a move call returns, the axis has settled. The procedure relies on
//! this for its single-writer, fully sequential control flow.

use anyhow::Result;
use async_trait::async_trait;

/// Capability for the motorized optical delay line, in units of time.
///
/// Positions are optical delays in seconds; the translation to physical
/// stage travel (bounce count, lever arms) happens behind this trait.
#[async_trait]
pub trait DelayActuator: Send + Sync {
    /// Current optical delay in seconds.
    async fn delay(&self) -> Result<f64>;

    /// Move to an absolute delay and wait for the motion to complete.
    async fn set_delay(&self, delay: f64) -> Result<()>;

    /// Move by a relative delay offset and wait for the motion to complete.
    async fn adjust_delay(&self, delta: f64) -> Result<()>;
}

/// Capability for a streamed digitizer waveform channel.
#[async_trait]
pub trait WaveformSource: Send + Sync {
    /// Channel identifier for logging and error reporting.
    fn channel(&self) -> &str;

    /// Snapshot of the current waveform buffer.
    ///
    /// The digitizer returns fixed-capacity arrays regardless of its buffer
    /// setting; only a leading prefix is valid data, the remainder is
    /// padding. See [`SampleCount`] for the live prefix length.
    async fn read(&self) -> Result<Vec<f64>>;
}

/// Capability reporting how many leading waveform samples are valid.
#[async_trait]
pub trait SampleCount: Send + Sync {
    /// Number of useful leading samples in the digitizer snapshots.
    async fn useful_length(&self) -> Result<usize>;
}

/// Capability for a plain linear stage, in millimetres.
///
/// Consumed by [`DelayStage`](crate::hardware::DelayStage), which converts
/// between optical delay and stage travel.
#[async_trait]
pub trait Movable: Send + Sync {
    /// Move to an absolute position in millimetres.
    async fn move_abs(&self, target: f64) -> Result<()>;

    /// Move by a relative distance in millimetres.
    async fn move_rel(&self, distance: f64) -> Result<()>;

    /// Current position in millimetres.
    async fn position(&self) -> Result<f64>;

    /// Wait for any in-flight motion to settle.
    async fn wait_settled(&self) -> Result<()>;
}
